//! Configuration for the impbot runtime.
//!
//! Settings are layered with figment: built-in defaults, then an
//! `impbot.toml` (or `.yaml` with the `yaml-config` feature), then
//! `IMPBOT_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, ConnectionsConfig, ImpbotConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, RetryConfig, SpanEventConfig, StdioConfig,
};
pub use validation::validate_config;
