//! Configuration for the nsnap scanner.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Top-level discover configuration.
///
/// Loaded from the `[discover]` section of `nsnap.toml` and overlaid by
/// `NSNAP__DISCOVER__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Path to the ndiff binary (default: "ndiff").
    #[serde(default = "default_ndiff_path")]
    pub ndiff_path: String,

    /// Target expressions passed to nmap (hosts, ranges, CIDRs).
    #[serde(default)]
    pub targets: Vec<String>,

    /// Scan profile for every run.
    #[serde(default)]
    pub profile: ScanProfile,

    /// Extra nmap flags appended after the profile flags.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Directory holding raw XML scans, diff reports and the `last` link.
    #[serde(default = "default_scan_dir")]
    pub scan_dir: String,

    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

/// Predefined scan profiles mapping to nmap flag sets.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanProfile {
    /// TCP connect scan, no privileges needed: `-sT`
    #[default]
    Connect,
    /// SYN scan: `-sS`
    Syn,
    /// Connect scan with service detection: `-sT -sV`
    Version,
}

impl ScanProfile {
    /// Return the nmap flags for this profile.
    pub fn nmap_flags(&self) -> Vec<&'static str> {
        match self {
            Self::Connect => vec!["-sT"],
            Self::Syn => vec!["-sS"],
            Self::Version => vec!["-sT", "-sV"],
        }
    }
}

impl FromStr for ScanProfile {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "syn" => Ok(Self::Syn),
            "version" => Ok(Self::Version),
            _ => Err(DiscoverError::Config(format!(
                "Invalid profile: {s}. Choose: connect, syn, version"
            ))),
        }
    }
}

impl DiscoverConfig {
    /// Load `[discover]` from `<file_prefix>.toml` (optional) and the
    /// environment. A missing section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("NSNAP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("discover.targets")
                    .with_list_parse_key("discover.extra_args")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<DiscoverConfig>("discover") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(DiscoverConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_ndiff_path() -> String {
    "ndiff".to_string()
}

fn default_scan_dir() -> String {
    "/var/lib/nsnap/scans".to_string()
}

fn default_db_path() -> String {
    "/var/lib/nsnap/nsnap.sqlite3".to_string()
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            ndiff_path: default_ndiff_path(),
            targets: Vec::new(),
            profile: ScanProfile::default(),
            extra_args: Vec::new(),
            scan_dir: default_scan_dir(),
            db_path: default_db_path(),
        }
    }
}
