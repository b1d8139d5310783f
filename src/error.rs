use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Cannot access repository {}: {message}", .path.display())]
    RepositoryAccess { path: PathBuf, message: String },
    #[error("Failed to write report for {repository}: {message}")]
    SinkWrite { repository: String, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    pub fn repository_access<P: Into<PathBuf>>(path: P, err: impl std::fmt::Display) -> Self {
        AuditError::RepositoryAccess {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn sink_write(repository: &str, err: impl std::fmt::Display) -> Self {
        AuditError::SinkWrite {
            repository: repository.to_string(),
            message: err.to_string(),
        }
    }
}
