use super::ConfigError;
use super::validator::{LOG_FORMATS, require_non_empty};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "bootstrap.yaml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database file created by the bootstrap.
    #[serde(default = "default_filename")]
    pub filename: PathBuf,
    /// SQL script holding the schema and the seed rows.
    #[serde(default = "default_seed_script")]
    pub seed_script: PathBuf,
    /// Switch a freshly seeded database to WAL journal mode.
    #[serde(default)]
    pub wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            seed_script: default_seed_script(),
            wal: false,
        }
    }
}

impl DatabaseConfig {
    fn resolve_relative_to(&mut self, base: &Path) {
        if self.filename.is_relative() {
            self.filename = base.join(&self.filename);
        }
        if self.seed_script.is_relative() {
            self.seed_script = base.join(&self.seed_script);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Pipe the script into the `sqlite3` command line shell.
    #[default]
    External,
    /// Execute the script through the linked SQLite library.
    Embedded,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    #[serde(default = "default_sqlite_bin")]
    pub sqlite_bin: String,
    /// Extra arguments placed before the database path.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            sqlite_bin: default_sqlite_bin(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads the explicit config file, or `bootstrap.yaml` when present, or
    /// falls back to defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load_from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.database.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("database.filename", &self.database.filename.to_string_lossy())?;
        require_non_empty(
            "database.seed_script",
            &self.database.seed_script.to_string_lossy(),
        )?;

        if self.engine.kind == EngineKind::External {
            require_non_empty("engine.sqlite_bin", &self.engine.sqlite_bin)?;
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "logging.format must be one of {}, got \"{}\"",
                LOG_FORMATS.join(", "),
                self.logging.format
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BOOTSTRAP_DATABASE_FILE") {
            self.database.filename = PathBuf::from(value);
        }
        if let Some(value) = lookup("BOOTSTRAP_SEED_SCRIPT") {
            self.database.seed_script = PathBuf::from(value);
        }
        if let Some(value) = lookup("BOOTSTRAP_SQLITE_BIN") {
            self.engine.sqlite_bin = value;
        }
    }
}

fn default_filename() -> PathBuf {
    PathBuf::from("data/demo.db")
}

fn default_seed_script() -> PathBuf {
    PathBuf::from("sql/seed.sql")
}

fn default_sqlite_bin() -> String {
    "sqlite3".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
