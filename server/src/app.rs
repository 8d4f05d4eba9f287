//! Core application

use std::sync::Arc;

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::config::{
    EnvSnapshot, LogLevel, ResolvedConfiguration, default_configuration, resolve_settings,
};
use crate::core::error::StartupError;
use crate::core::shutdown::ShutdownService;
use crate::core::telemetry::Telemetry;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: Arc<ResolvedConfiguration>,
}

impl CoreApp {
    /// Resolve configuration, then serve until shutdown.
    ///
    /// Runs synchronously: the tracer is installed before the async runtime
    /// starts and flushed after it stops.
    pub fn run() -> Result<(), StartupError> {
        dotenvy::dotenv().ok();

        let resolution = resolve_settings(
            default_configuration(),
            &EnvSnapshot::capture(),
            std::env::args_os(),
        )?;

        Self::init_logging(resolution.settings.log_level);
        tracing::debug!("Application starting");

        for warning in &resolution.warnings {
            tracing::warn!("{}", warning);
        }
        if !resolution.applied_env.is_empty() {
            tracing::debug!(set_envs = %resolution.applied_env.join(" "), "Applied environment");
        }
        tracing::debug!(settings = ?resolution.settings, "Resolved configuration");

        let telemetry = Telemetry::init(&resolution.settings.tracer)?;
        let tracer_enabled = telemetry.is_enabled();

        let result = ResolvedConfiguration::build(resolution.settings)
            .and_then(|config| Self::serve(config, tracer_enabled));

        telemetry.shutdown();
        result
    }

    fn serve(config: ResolvedConfiguration, tracer_enabled: bool) -> Result<(), StartupError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let app = Self {
            shutdown: ShutdownService::new(),
            config: Arc::new(config),
        };
        runtime.block_on(app.start_server(tracer_enabled))
    }

    fn init_logging(level: LogLevel) {
        let filter = match level {
            LogLevel::Trace | LogLevel::Debug => format!(
                "{},hyper=info,h2=info,reqwest=info,opentelemetry_sdk=info",
                level.filter_directive()
            ),
            _ => level.filter_directive().to_string(),
        };

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(self, tracer_enabled: bool) -> Result<(), StartupError> {
        // Install signal handlers FIRST (before binding)
        self.shutdown.install_signal_handlers();

        banner::print_banner(&self.config, tracer_enabled);

        ApiServer::new(self.config, self.shutdown.clone()).start().await?;

        tracing::debug!("Shutdown complete");
        Ok(())
    }
}
