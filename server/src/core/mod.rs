//! Core application infrastructure

pub(crate) mod banner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod shutdown;
pub mod telemetry;

pub use crate::app::CoreApp;
pub use config::{
    ConfigWarning, EnvSnapshot, LogLevel, ResolvedConfiguration, ServerConfig, TracerConfig,
};
pub use error::StartupError;
pub use shutdown::ShutdownService;
pub use telemetry::Telemetry;
