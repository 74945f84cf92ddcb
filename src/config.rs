use crate::error::{DeployError, Result};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONTRACT_NAME: &str = "Lock";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_CONFIRMATIONS: i64 = 1;
/// A successful run writes nothing to stderr.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Environment variable names and the [`Settings`] field each one fills.
/// Names match exactly; everything else in the source is ignored.
const KEYS: [(&str, &str); 6] = [
    ("WALLET_ADDRESS", "wallet_address"),
    ("CONTRACT_NAME", "contract_name"),
    ("ARTIFACTS_DIR", "artifacts_dir"),
    ("ETHEREUM_RPC_URL", "ethereum_rpc_url"),
    ("PRIVATE_KEY", "private_key"),
    ("DEPLOY_CONFIRMATIONS", "deploy_confirmations"),
];

/// Deployment configuration, loaded once and read-only afterwards.
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Constructor argument. Absent stays absent; nothing here checks it.
    #[serde(default)]
    pub wallet_address: Option<String>,
    pub contract_name: String,
    pub artifacts_dir: PathBuf,
    pub ethereum_rpc_url: String,
    #[serde(default)]
    pub private_key: Option<String>,
    pub deploy_confirmations: usize,
}

impl Settings {
    /// Reads the process environment. Call after the `.env` file, if any, has
    /// been loaded into it.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Builds settings from an explicit key/value source, keyed by the
    /// environment variable names.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("contract_name", DEFAULT_CONTRACT_NAME)?
            .set_default("artifacts_dir", DEFAULT_ARTIFACTS_DIR)?
            .set_default("ethereum_rpc_url", DEFAULT_RPC_URL)?
            .set_default("deploy_confirmations", DEFAULT_CONFIRMATIONS)?;

        for (key, value) in vars {
            if let Some((_, field)) = KEYS.iter().find(|(name, _)| *name == key.as_ref()) {
                builder = builder.set_override(*field, value.into())?;
            }
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}

/// What happened to the env file. Reported once logging is up.
#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    Missing,
    /// The default `.env` exists but could not be parsed; variables after the
    /// bad line are not set.
    Malformed(dotenv::Error),
}

impl EnvFile {
    fn from_default(result: std::result::Result<PathBuf, dotenv::Error>) -> Self {
        match result {
            Ok(path) => EnvFile::Loaded(path),
            Err(dotenv::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => EnvFile::Missing,
            Err(e) => EnvFile::Malformed(e),
        }
    }

    pub fn report(&self) {
        match self {
            EnvFile::Loaded(path) => debug!(path = %path.display(), "loaded env file"),
            EnvFile::Missing => debug!("no .env file"),
            EnvFile::Malformed(e) => warn!(error = %e, "ignoring malformed .env file"),
        }
    }
}

/// Loads an env file into the process environment. Without an explicit path
/// `.env` is tried and skipped when absent; an explicit path must load.
/// Variables already set in the environment win.
pub fn load_env_file(path: Option<&Path>) -> Result<EnvFile> {
    match path {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| DeployError::EnvFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            Ok(EnvFile::Loaded(path.to_path_buf()))
        }
        None => Ok(EnvFile::from_default(dotenv::dotenv())),
    }
}

/// `explicit` wins over `from_env` (usually `RUST_LOG`), which wins over
/// [`DEFAULT_LOG_FILTER`].
pub fn log_filter(explicit: Option<&str>, from_env: Option<&str>) -> EnvFilter {
    EnvFilter::new(explicit.or(from_env).unwrap_or(DEFAULT_LOG_FILTER))
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("wallet_address", &self.wallet_address)
            .field("contract_name", &self.contract_name)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("ethereum_rpc_url", &self.ethereum_rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "SECRET"))
            .field("deploy_confirmations", &self.deploy_confirmations)
            .finish()
    }
}
