use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors. Any of these aborts the current invocation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Label table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{what} not found: {}", path.display())]
    MissingPath { what: String, path: PathBuf },

    #[error("No work items for stage '{stage}' under {}", root.display())]
    NoWorkItems { stage: String, root: PathBuf },
}

impl Error {
    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::MissingPath {
            what: what.into(),
            path: path.into(),
        }
    }
}

/// Failure of a single work item. Recorded by the batch driver, never
/// propagated past it.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("{what} missing: {}", path.display())]
    PrerequisiteMissing { what: String, path: PathBuf },

    #[error("tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("tool exited with {}", code.map_or_else(|| "signal".to_string(), |c| format!("code {}", c)))]
    ToolFailed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ItemError {
    pub fn prerequisite(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ItemError::PrerequisiteMissing {
            what: what.into(),
            path: path.into(),
        }
    }
}
