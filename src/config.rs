use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DB_FILE: &str = "reviews.db";

/// How long a write waits for the store-wide lock before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_file: DEFAULT_DB_FILE.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// - BILL_REVIEW_DATA_DIR: directory holding the database (default "data")
    /// - BILL_REVIEW_DB_FILE: database file name (default "reviews.db")
    /// - BILL_REVIEW_LOCK_TIMEOUT_MS: write lock wait in ms (default 1000)
    ///
    /// Call `dotenv::dotenv().ok()` first to pick up a .env file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = lookup("BILL_REVIEW_DATA_DIR").filter(|s| !s.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(file) = lookup("BILL_REVIEW_DB_FILE").filter(|s| !s.trim().is_empty()) {
            config.db_file = file.trim().to_string();
        }

        if let Some(raw) = lookup("BILL_REVIEW_LOCK_TIMEOUT_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("BILL_REVIEW_LOCK_TIMEOUT_MS is not a number: {:?}", raw)
                })?;
            if millis == 0 {
                bail!("BILL_REVIEW_LOCK_TIMEOUT_MS must be greater than zero");
            }
            config.lock_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Default config rooted at `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Config {
            data_dir: dir.as_ref().to_path_buf(),
            ..Config::default()
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}
