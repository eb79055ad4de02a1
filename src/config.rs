pub use self::parser::{Config, DatabaseConfig, EngineConfig, EngineKind, LoggingConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
