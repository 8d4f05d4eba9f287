//! Command line parsing
//!
//! Flags are generated from the knob table, so the command has one option per
//! [`ConfigVariable`](super::config::ConfigVariable). Only flags that were
//! explicitly passed are reported; defaults and environment values are merged
//! by the caller.
//!
//! Flags are accepted with one or two dashes (`-jq .a`, `--jq .a`,
//! `-p=9000`). `-h` is the host flag, so help is only available as `--help`.

use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};

use super::config::ConfigurationMap;
use super::constants::APP_NAME;

/// Positional arguments nobody consumes
const ARG_UNUSED: &str = "unused";

/// Flags explicitly passed on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    /// `(key, value)` for every knob set by a flag, last occurrence wins
    pub overrides: Vec<(&'static str, String)>,
    /// Positional arguments, in order
    pub unused: Vec<String>,
}

/// Build the command for a knob table
pub fn build_command(config: &ConfigurationMap) -> Command {
    let mut command = Command::new(APP_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("HTTP jq processor")
        .disable_help_flag(true)
        .args_override_self(true)
        .arg(
            Arg::new("help")
                .long("help")
                .help("Print help")
                .action(ArgAction::Help),
        )
        .arg(
            Arg::new(ARG_UNUSED)
                .action(ArgAction::Append)
                .num_args(1..)
                .hide(true),
        );

    for var in config.values() {
        let help = if var.value.is_empty() {
            format!("{} (env {})", var.description, var.env_var)
        } else {
            format!(
                "{} (env {}, default {:?})",
                var.description, var.env_var, var.value
            )
        };

        let mut arg = Arg::new(var.key)
            .long(var.flag)
            .value_name(var.key)
            .help(help)
            .allow_hyphen_values(true)
            .action(ArgAction::Set);

        let mut chars = var.flag.chars();
        if let (Some(short), None) = (chars.next(), chars.next()) {
            arg = arg.short(short);
        }

        command = command.arg(arg);
    }

    command
}

/// Rewrite single-dash knob flags to their double-dash form.
///
/// `-jq` would otherwise be read as the short cluster `-j -q`. Tokens that
/// are flag values are left alone, as is everything after `--`.
pub fn normalize_args<I, T>(config: &ConfigurationMap, args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let is_flag = |name: &str| config.values().any(|var| var.flag == name);

    let mut iter = args.into_iter().map(Into::into);
    let mut out: Vec<OsString> = iter.next().into_iter().collect();
    let mut expects_value = false;

    while let Some(arg) = iter.next() {
        if expects_value {
            expects_value = false;
            out.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        if text == "--" {
            out.push(arg);
            out.extend(iter.by_ref());
            break;
        }

        let (dashes, rest) = if let Some(rest) = text.strip_prefix("--") {
            ("--", rest)
        } else if let Some(rest) = text.strip_prefix('-') {
            ("-", rest)
        } else {
            out.push(arg);
            continue;
        };

        let (name, inline_value) = match rest.split_once('=') {
            Some((name, _)) => (name, true),
            None => (rest, false),
        };

        if !is_flag(name) {
            out.push(arg);
            continue;
        }

        expects_value = !inline_value;
        if dashes == "-" {
            out.push(format!("-{text}").into());
        } else {
            out.push(arg);
        }
    }

    out
}

/// Parse `args` (program name first) against the knob table
pub fn parse<I, T>(config: &ConfigurationMap, args: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = normalize_args(config, args);
    let matches = build_command(config).try_get_matches_from(args)?;

    let overrides = config
        .values()
        .filter_map(|var| {
            matches
                .get_one::<String>(var.key)
                .map(|value| (var.key, value.clone()))
        })
        .collect();

    let unused = matches
        .get_many::<String>(ARG_UNUSED)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Ok(ParsedArgs { overrides, unused })
}
