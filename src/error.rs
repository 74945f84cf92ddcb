use std::path::PathBuf;
use thiserror::Error;

/// Any failure between loading configuration and printing the deployed address.
///
/// The variants exist for the log line only. Callers treat every one of them
/// the same way: report it and exit with code 1.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Failed to load env file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
    #[error("Artifact for contract {0} not found")]
    ArtifactNotFound(String),
    #[error("Multiple artifacts match contract {name}, use a fully qualified name: {}", .candidates.join(", "))]
    AmbiguousArtifact {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Invalid artifact {path}: {message}")]
    InvalidArtifact { path: PathBuf, message: String },
    #[error("Failed to search artifacts: {0}")]
    ArtifactWalk(#[from] walkdir::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Signer error: {0}")]
    Signer(String),
    #[error("Constructor arguments error: {0}")]
    ConstructorArguments(String),
    #[error("Deployment error: {0}")]
    Deployment(String),
}

pub type Result<T, E = DeployError> = std::result::Result<T, E>;
