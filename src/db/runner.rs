//! Engines able to apply a seed script to a database file.
//!
//! The external runner mirrors `sqlite3 <db> < seed.sql`: the tool owns its
//! stdout and stderr, and its exit status is handed back untouched.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::DatabaseError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("can't start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("can't feed script to {program}: {source}")]
    Stdin {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    /// `code` is `None` when the process was terminated by a signal.
    #[error("{program} exited with {}", describe_exit(.code, .signal))]
    Exited {
        program: String,
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("status {code}"),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "unknown status".to_string(),
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[async_trait]
pub trait SeedRunner: Send + Sync {
    /// Runs `script` against the database at `db_path`.
    async fn apply(&self, db_path: &Path, script: &str) -> Result<(), RunnerError>;

    fn name(&self) -> &str;
}

/// Spawns the SQLite command line shell with the script on stdin.
#[derive(Debug, Clone)]
pub struct ExternalSqliteRunner {
    program: String,
    args: Vec<String>,
}

impl ExternalSqliteRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, db_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(db_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ExternalSqliteRunner {
    fn default() -> Self {
        Self::new("sqlite3", Vec::new())
    }
}

#[async_trait]
impl SeedRunner for ExternalSqliteRunner {
    async fn apply(&self, db_path: &Path, script: &str) -> Result<(), RunnerError> {
        debug!(program = %self.program, args = ?self.args, db = %db_path.display(), "spawning engine");

        let mut child = self
            .command(db_path)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(script.as_bytes()).await {
                Ok(()) => {}
                // The engine stopped reading; its exit status tells the story.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    warn!("{} closed its input early", self.program);
                }
                Err(source) => {
                    return Err(RunnerError::Stdin {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
            // Dropping stdin sends EOF.
        }

        let status = child.wait().await.map_err(|source| RunnerError::Wait {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::Exited {
                program: self.program.clone(),
                code: status.code(),
                signal: exit_signal(&status),
            })
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Applies the script through the SQLite library linked into this binary.
#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSqliteRunner;

#[cfg(feature = "sqlite")]
#[async_trait]
impl SeedRunner for EmbeddedSqliteRunner {
    async fn apply(&self, db_path: &Path, script: &str) -> Result<(), RunnerError> {
        use diesel::connection::SimpleConnection;

        let db_path = db_path.to_path_buf();
        let script = script.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = super::sqlite::establish_connection(&db_path)?;
            conn.batch_execute(&script)
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))??;

        Ok(())
    }

    fn name(&self) -> &str {
        "embedded sqlite"
    }
}
