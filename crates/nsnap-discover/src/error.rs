//! Error types for the nsnap-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Nmap not found at path: {path}")]
    NmapNotFound { path: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Ndiff not found at path: {path}")]
    NdiffNotFound { path: String },

    #[error("Ndiff exited with code {code}: {stderr}")]
    NdiffFailed { code: i32, stderr: String },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Store error: {0}")]
    Store(#[from] nsnap_store::StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot write {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<config::ConfigError> for DiscoverError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
