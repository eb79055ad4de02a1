//! One-shot database bootstrap.
//!
//! The target file's existence is the only state consulted: when it is
//! present nothing is touched, otherwise the seed script is handed to a
//! [`SeedRunner`] once. Engine failures are not retried or rolled back.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::DatabaseError;
use super::runner::{ExternalSqliteRunner, RunnerError, SeedRunner};
use crate::config::{DatabaseConfig, EngineConfig, EngineKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyExists,
    Created,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("can't check {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't read seed script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("can't write status line: {0}")]
    Output(#[from] io::Error),

    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

impl BootstrapError {
    /// Process exit status for this error. An engine's own non-zero status
    /// is passed through as-is; death by signal maps to 128 + signal like a
    /// shell reports it.
    pub fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::Runner(RunnerError::Exited {
                code: Some(code), ..
            }) => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            BootstrapError::Runner(RunnerError::Exited {
                code: None,
                signal: Some(signal),
                ..
            }) => u8::try_from(128 + *signal).unwrap_or(1),
            _ => 1,
        }
    }
}

pub struct Bootstrap {
    db_path: PathBuf,
    script_path: PathBuf,
    runner: Arc<dyn SeedRunner>,
    wal: bool,
}

impl Bootstrap {
    pub fn new(
        db_path: impl Into<PathBuf>,
        script_path: impl Into<PathBuf>,
        runner: Arc<dyn SeedRunner>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            script_path: script_path.into(),
            runner,
            wal: false,
        }
    }

    /// Switch the fresh database to WAL journal mode after seeding.
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    pub fn from_config(
        database: &DatabaseConfig,
        engine: &EngineConfig,
    ) -> Result<Self, BootstrapError> {
        if database.wal && !cfg!(feature = "sqlite") {
            return Err(BootstrapError::Unsupported(
                "database.wal requires the sqlite feature".to_string(),
            ));
        }
        Ok(Self::new(
            &database.filename,
            &database.seed_script,
            runner_from_config(engine)?,
        )
        .with_wal(database.wal))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates the database from the seed script unless the file already
    /// exists. Status lines are written to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<BootstrapOutcome, BootstrapError> {
        if self.target_exists().await? {
            info!(db = %self.db_path.display(), "database already present, skipping seed");
            writeln!(out, "{} already exists, nothing to do", self.db_path.display())?;
            return Ok(BootstrapOutcome::AlreadyExists);
        }

        writeln!(
            out,
            "creating {} from {}",
            self.db_path.display(),
            self.script_path.display()
        )?;
        out.flush()?;

        let script = tokio::fs::read_to_string(&self.script_path)
            .await
            .map_err(|source| BootstrapError::Script {
                path: self.script_path.clone(),
                source,
            })?;

        self.ensure_parent_dir().await?;

        info!(
            db = %self.db_path.display(),
            script = %self.script_path.display(),
            engine = self.runner.name(),
            "applying seed script"
        );
        self.runner.apply(&self.db_path, &script).await?;

        if self.wal {
            self.enable_wal().await?;
        }

        writeln!(out, "done")?;
        Ok(BootstrapOutcome::Created)
    }

    /// Any directory entry counts, including a symlink whose target is gone.
    async fn target_exists(&self) -> Result<bool, BootstrapError> {
        match tokio::fs::symlink_metadata(&self.db_path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(BootstrapError::Stat {
                path: self.db_path.clone(),
                source,
            }),
        }
    }

    #[cfg(feature = "sqlite")]
    async fn enable_wal(&self) -> Result<(), BootstrapError> {
        let mode = super::sqlite::set_journal_mode(&self.db_path, "WAL").await?;
        debug!(db = %self.db_path.display(), mode = %mode, "journal mode set");
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    async fn enable_wal(&self) -> Result<(), BootstrapError> {
        Err(BootstrapError::Unsupported(
            "database.wal requires the sqlite feature".to_string(),
        ))
    }

    async fn ensure_parent_dir(&self) -> Result<(), BootstrapError> {
        let Some(parent) = self.db_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        debug!("creating directory {}", parent.display());
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BootstrapError::Directory {
                path: parent.to_path_buf(),
                source,
            })
    }
}

pub fn runner_from_config(engine: &EngineConfig) -> Result<Arc<dyn SeedRunner>, BootstrapError> {
    match engine.kind {
        EngineKind::External => Ok(Arc::new(ExternalSqliteRunner::new(
            engine.sqlite_bin.clone(),
            engine.args.clone(),
        ))),
        #[cfg(feature = "sqlite")]
        EngineKind::Embedded => Ok(Arc::new(super::runner::EmbeddedSqliteRunner)),
        #[cfg(not(feature = "sqlite"))]
        EngineKind::Embedded => Err(BootstrapError::Unsupported(
            "embedded engine requires the sqlite feature".to_string(),
        )),
    }
}
