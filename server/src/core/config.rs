//! Layered configuration resolution
//!
//! Every knob is a [`ConfigVariable`] carrying its string value, the
//! environment variable that may supply it and the command line flag that may
//! supply it. Resolution is a pure function of three inputs:
//!
//! Priority (lowest to highest):
//! 1. Built-in defaults ([`default_configuration`])
//! 2. Environment variables (an explicit [`EnvSnapshot`])
//! 3. Command line flags (an explicit argument vector)
//!
//! Typed fields are coerced only after the layers are merged. A value that
//! does not parse falls back to the compile-time default and is reported as
//! a [`ConfigWarning`]; it never aborts resolution.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::cli;
use super::constants::{
    BIND_ALL_INTERFACES, DEFAULT_ESCAPE_HTML, DEFAULT_HOST, DEFAULT_JQ_FILTER, DEFAULT_PATH,
    DEFAULT_PORT, DEFAULT_SCHEME, DEFAULT_TRACER_DISABLE, DEFAULT_TRACER_ENDPOINT,
    DEFAULT_TRACER_RATIO, ENV_HOST, ENV_HTML_ESCAPE, ENV_JQ_FILTER, ENV_LOG_LEVEL, ENV_PATH,
    ENV_PORT, ENV_SCHEME, ENV_TRACER_DISABLE, ENV_TRACER_ENDPOINT, ENV_TRACER_RATIO,
    FLAG_ESCAPE_HTML, FLAG_HOST, FLAG_JQ_FILTER, FLAG_LOG_LEVEL, FLAG_PATH, FLAG_PORT,
    FLAG_SCHEME, FLAG_TRACER_DISABLE, FLAG_TRACER_ENDPOINT, FLAG_TRACER_RATIO, KEY_ESCAPE_HTML,
    KEY_HOST, KEY_JQ_FILTER, KEY_LOG_LEVEL, KEY_PATH, KEY_PORT, KEY_SCHEME, KEY_TRACER_DISABLE,
    KEY_TRACER_ENDPOINT, KEY_TRACER_RATIO,
};
use super::error::StartupError;
use crate::domain::filter::CompiledFilter;

// =============================================================================
// Configuration Variables
// =============================================================================

/// One named configuration knob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigVariable {
    pub key: &'static str,
    pub description: &'static str,
    /// Current value; always a string until coerced
    pub value: String,
    pub env_var: &'static str,
    pub flag: &'static str,
}

impl ConfigVariable {
    fn new(
        key: &'static str,
        description: &'static str,
        value: impl Into<String>,
        env_var: &'static str,
        flag: &'static str,
    ) -> Self {
        Self {
            key,
            description,
            value: value.into(),
            env_var,
            flag,
        }
    }
}

/// All knobs, keyed by [`ConfigVariable::key`]
pub type ConfigurationMap = BTreeMap<&'static str, ConfigVariable>;

/// Build the full knob map with built-in defaults
pub fn default_configuration() -> ConfigurationMap {
    [
        ConfigVariable::new(
            KEY_JQ_FILTER,
            "JQ filter string",
            DEFAULT_JQ_FILTER,
            ENV_JQ_FILTER,
            FLAG_JQ_FILTER,
        ),
        ConfigVariable::new(KEY_PATH, "Server path", DEFAULT_PATH, ENV_PATH, FLAG_PATH),
        ConfigVariable::new(KEY_HOST, "Server host", DEFAULT_HOST, ENV_HOST, FLAG_HOST),
        ConfigVariable::new(KEY_PORT, "Server port", DEFAULT_PORT, ENV_PORT, FLAG_PORT),
        ConfigVariable::new(
            KEY_SCHEME,
            "Server scheme",
            DEFAULT_SCHEME,
            ENV_SCHEME,
            FLAG_SCHEME,
        ),
        ConfigVariable::new(
            KEY_ESCAPE_HTML,
            "Escape HTML on return",
            DEFAULT_ESCAPE_HTML.to_string(),
            ENV_HTML_ESCAPE,
            FLAG_ESCAPE_HTML,
        ),
        ConfigVariable::new(
            KEY_LOG_LEVEL,
            "Default log level",
            LogLevel::default().to_string(),
            ENV_LOG_LEVEL,
            FLAG_LOG_LEVEL,
        ),
        ConfigVariable::new(
            KEY_TRACER_DISABLE,
            "Disable tracer",
            DEFAULT_TRACER_DISABLE.to_string(),
            ENV_TRACER_DISABLE,
            FLAG_TRACER_DISABLE,
        ),
        ConfigVariable::new(
            KEY_TRACER_RATIO,
            "Tracer ratio, 0-1",
            DEFAULT_TRACER_RATIO.to_string(),
            ENV_TRACER_RATIO,
            FLAG_TRACER_RATIO,
        ),
        ConfigVariable::new(
            KEY_TRACER_ENDPOINT,
            "Tracer endpoint, url",
            DEFAULT_TRACER_ENDPOINT,
            ENV_TRACER_ENDPOINT,
            FLAG_TRACER_ENDPOINT,
        ),
    ]
    .into_iter()
    .map(|var| (var.key, var))
    .collect()
}

// =============================================================================
// Environment Snapshot
// =============================================================================

/// Immutable copy of the environment used for one resolution
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment (non UTF-8 entries are skipped)
    pub fn capture() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Log Level Enum
// =============================================================================

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
    Disabled,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
            Self::Disabled => "disabled",
        }
    }

    /// `EnvFilter` directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal | Self::Panic => "error",
            Self::Disabled => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "panic" => Ok(Self::Panic),
            "disabled" => Ok(Self::Disabled),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// A recoverable problem found while resolving configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("-{flag} or {env_var} invalid ('{value}'), defaulting to `{fallback}`")]
    InvalidBool {
        key: &'static str,
        flag: &'static str,
        env_var: &'static str,
        value: String,
        fallback: bool,
    },

    #[error("Invalid tracerRatio ('{value}'), expected a number from 0 to 1, defaulting to `{fallback}` (100%)")]
    InvalidRatio { value: String, fallback: f64 },

    #[error("Invalid logLevel ('{value}'), defaulting to {fallback}")]
    InvalidLogLevel { value: String, fallback: LogLevel },

    #[error("Found unused args: {}", .0.join(" "))]
    UnusedArguments(Vec<String>),
}

// =============================================================================
// Typed Config Structs
// =============================================================================

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
    pub scheme: String,
    /// Route of the filter endpoint
    pub path: String,
    /// Escape `<`, `>` and `&` in JSON string output
    pub escape_html: bool,
}

impl ServerConfig {
    /// Socket address to bind; an empty host means all interfaces
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() {
            BIND_ALL_INTERFACES
        } else {
            self.host.as_str()
        };

        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// URL shown to operators
    pub fn listen_url(&self) -> String {
        let scheme = match self.scheme.trim_end_matches("//").trim_end_matches(':') {
            "" => "http",
            s => s,
        };
        let host = if self.host.is_empty() || self.host == BIND_ALL_INTERFACES {
            "localhost"
        } else {
            self.host.as_str()
        };
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

/// Distributed tracing configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    pub enabled: bool,
    /// Sample ratio in `0.0..=1.0`
    pub ratio: f64,
    pub endpoint: String,
}

/// Typed settings before the startup filter is compiled
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerConfig,
    pub tracer: TracerConfig,
    pub log_level: LogLevel,
    /// Startup filter text; empty when none is configured
    pub jq_filter: String,
}

/// Merged settings plus the diagnostics gathered while merging
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub settings: Settings,
    pub warnings: Vec<ConfigWarning>,
    /// `NAME=value` for every environment variable that was applied
    pub applied_env: Vec<String>,
}

/// Final, immutable configuration shared by every request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    pub server: ServerConfig,
    /// Filter compiled once at startup
    pub filter: Option<Arc<CompiledFilter>>,
    pub tracer: TracerConfig,
    pub log_level: LogLevel,
}

impl ResolvedConfiguration {
    /// Compile the startup filter (if any) and freeze the configuration.
    ///
    /// A startup filter that does not compile can never serve a request, so
    /// it is a [`StartupError`].
    pub fn build(settings: Settings) -> Result<Self, StartupError> {
        let filter = if settings.jq_filter.is_empty() {
            None
        } else {
            let compiled =
                CompiledFilter::compile(&settings.jq_filter).map_err(StartupError::Filter)?;
            tracing::info!(filter = %settings.jq_filter, "JQ filter compiled");
            Some(Arc::new(compiled))
        };

        Ok(Self {
            server: settings.server,
            filter,
            tracer: settings.tracer,
            log_level: settings.log_level,
        })
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Overwrite values with environment variables that are set.
///
/// Returns `NAME=value` for every variable applied.
pub fn apply_environment(config: &mut ConfigurationMap, env: &EnvSnapshot) -> Vec<String> {
    let mut applied = Vec::new();
    for var in config.values_mut() {
        if let Some(value) = env.get(var.env_var) {
            tracing::trace!(key = var.key, env_var = var.env_var, "Applying environment override");
            applied.push(format!("{}={}", var.env_var, value));
            var.value = value.to_string();
        }
    }
    applied
}

/// Overwrite values with explicitly passed command line flags.
///
/// `args` includes the program name. Returns positional arguments, which
/// are not consumed.
pub fn apply_arguments<I, T>(
    config: &mut ConfigurationMap,
    args: I,
) -> Result<Vec<String>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let parsed = cli::parse(config, args)?;
    for (key, value) in parsed.overrides {
        if let Some(var) = config.get_mut(key) {
            tracing::trace!(key, flag = var.flag, "Applying command line override");
            var.value = value;
        }
    }
    Ok(parsed.unused)
}

/// Merge defaults, environment and command line into typed settings
pub fn resolve_settings<I, T>(
    mut config: ConfigurationMap,
    env: &EnvSnapshot,
    args: I,
) -> Result<Resolution, StartupError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let applied_env = apply_environment(&mut config, env);
    let unused = apply_arguments(&mut config, args)?;

    let mut warnings = Vec::new();
    if !unused.is_empty() {
        warnings.push(ConfigWarning::UnusedArguments(unused));
    }

    let settings = Settings {
        server: ServerConfig {
            host: value_of(&config, KEY_HOST),
            port: value_of(&config, KEY_PORT),
            scheme: value_of(&config, KEY_SCHEME),
            path: value_of(&config, KEY_PATH),
            escape_html: coerce_bool(&config, KEY_ESCAPE_HTML, DEFAULT_ESCAPE_HTML, &mut warnings),
        },
        tracer: TracerConfig {
            enabled: !coerce_bool(
                &config,
                KEY_TRACER_DISABLE,
                DEFAULT_TRACER_DISABLE,
                &mut warnings,
            ),
            ratio: coerce_ratio(&value_of(&config, KEY_TRACER_RATIO), &mut warnings),
            endpoint: value_of(&config, KEY_TRACER_ENDPOINT),
        },
        log_level: coerce_log_level(&value_of(&config, KEY_LOG_LEVEL), &mut warnings),
        jq_filter: value_of(&config, KEY_JQ_FILTER),
    };

    Ok(Resolution {
        settings,
        warnings,
        applied_env,
    })
}

/// Full resolution: merge all layers, then compile the startup filter
pub fn resolve<I, T>(
    defaults: ConfigurationMap,
    env: &EnvSnapshot,
    args: I,
) -> Result<(ResolvedConfiguration, Vec<ConfigWarning>), StartupError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let resolution = resolve_settings(defaults, env, args)?;
    let config = ResolvedConfiguration::build(resolution.settings)?;
    Ok((config, resolution.warnings))
}

fn value_of(config: &ConfigurationMap, key: &str) -> String {
    config
        .get(key)
        .map(|var| var.value.clone())
        .unwrap_or_default()
}

/// Boolean parsing accepting `1 t T TRUE true True` and `0 f F FALSE false False`
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn coerce_bool(
    config: &ConfigurationMap,
    key: &'static str,
    fallback: bool,
    warnings: &mut Vec<ConfigWarning>,
) -> bool {
    let Some(var) = config.get(key) else {
        return fallback;
    };
    parse_bool(&var.value).unwrap_or_else(|| {
        warnings.push(ConfigWarning::InvalidBool {
            key,
            flag: var.flag,
            env_var: var.env_var,
            value: var.value.clone(),
            fallback,
        });
        fallback
    })
}

fn coerce_ratio(value: &str, warnings: &mut Vec<ConfigWarning>) -> f64 {
    match value.parse::<f64>() {
        Ok(ratio) if (0.0..=1.0).contains(&ratio) => ratio,
        _ => {
            warnings.push(ConfigWarning::InvalidRatio {
                value: value.to_string(),
                fallback: DEFAULT_TRACER_RATIO,
            });
            DEFAULT_TRACER_RATIO
        }
    }
}

fn coerce_log_level(value: &str, warnings: &mut Vec<ConfigWarning>) -> LogLevel {
    value.parse().unwrap_or_else(|_| {
        warnings.push(ConfigWarning::InvalidLogLevel {
            value: value.to_string(),
            fallback: LogLevel::default(),
        });
        LogLevel::default()
    })
}
