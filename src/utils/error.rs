use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZipWorkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create archive {path}: {reason}")]
    ArchiveCreateFailed { path: PathBuf, reason: String },

    #[error("Failed to open archive {path}: {reason}")]
    ArchiveOpenFailed { path: PathBuf, reason: String },

    #[error("Failed to extract from {path}: {reason}")]
    ArchiveExtractFailed { path: PathBuf, reason: String },

    #[error("Entry not found in {path}: {name}")]
    EntryNotFound { path: PathBuf, name: String },

    #[error("Entry escapes the destination directory: {name}")]
    UnsafeEntryPath { name: String },

    #[error("Copy failed for {path}")]
    CopyFailed { path: PathBuf },

    #[error("Source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("A job is running; configuration is locked")]
    JobRunning,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ZipWorkerError>;
