use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, EngineKind};

#[derive(Debug, Parser)]
#[command(name = "demo-db-bootstrap", version, about = "Create the demo SQLite database once")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(short, long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Database file to create.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// SQL script applied to a fresh database.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Switch the new database to WAL journal mode.
    #[arg(long)]
    pub wal: bool,

    #[arg(long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Program used by the external engine.
    #[arg(long)]
    pub sqlite_bin: Option<String>,

    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create the database from the seed script unless it already exists.
    Init,
    /// Print row counts and the first rows of an existing database.
    Status {
        /// Rows listed per table.
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Init)
    }

    /// Flags win over both the config file and the environment.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref database) = self.database {
            config.database.filename = database.clone();
        }
        if let Some(ref script) = self.script {
            config.database.seed_script = script.clone();
        }
        if self.wal {
            config.database.wal = true;
        }
        if let Some(engine) = self.engine {
            config.engine.kind = engine;
        }
        if let Some(ref bin) = self.sqlite_bin {
            config.engine.sqlite_bin = bin.clone();
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_init() {
        let cli = Cli::try_parse_from(["demo-db-bootstrap"]).expect("parse");
        assert_eq!(cli.command(), Command::Init);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "demo-db-bootstrap",
            "--database",
            "/tmp/x.db",
            "--engine",
            "embedded",
            "--wal",
            "-l",
            "debug",
            "status",
            "--offset",
            "2",
        ])
        .expect("parse");
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(cli.command(), Command::Status { limit: 20, offset: 2 });
        assert_eq!(config.database.filename, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.database.seed_script, PathBuf::from("sql/seed.sql"));
        assert_eq!(config.engine.kind, EngineKind::Embedded);
        assert!(config.database.wal);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_unknown_engine() {
        assert!(Cli::try_parse_from(["demo-db-bootstrap", "--engine", "postgres"]).is_err());
    }
}
