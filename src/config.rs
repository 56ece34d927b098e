//! Runtime configuration resolved from the environment.

use std::path::PathBuf;

use anyhow::Result;

pub const DATA_ENV: &str = "UNIALLOC_DATA";
pub const PORT_ENV: &str = "UNIALLOC_PORT";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Where the snapshot is loaded from and saved to.
    pub data_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_path = match lookup(DATA_ENV).filter(|s| !s.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_data_path()?,
        };

        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("{PORT_ENV} must be a port number, got '{raw}'"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { data_path, port })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, data_path: Option<PathBuf>, port: Option<u16>) -> Self {
        if let Some(path) = data_path {
            self.data_path = path;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

pub fn default_data_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "unialloc")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("allocations.db"))
}
