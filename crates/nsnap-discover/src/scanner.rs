//! Nmap and ndiff process wrappers.
//!
//! Both tools run as child processes via `tokio::process::Command`. Nmap
//! writes XML to stdout; ndiff compares two XML files and reports through
//! its exit status whether anything changed.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::ScanProfile;
use crate::error::{DiscoverError, Result};
use crate::nmap_xml::{self, NmapRun};

/// Result of a single nmap scan execution.
pub struct ScanResult {
    /// Unique ID for this scan, used to correlate log lines.
    pub scan_id: Uuid,
    /// Raw XML as written by nmap, archived for the next diff.
    pub xml: Vec<u8>,
    /// Parsed nmap XML output.
    pub nmap_run: NmapRun,
    /// Wall-clock duration of the scan.
    pub duration: std::time::Duration,
}

/// Wrapper around the nmap binary.
pub struct NmapScanner {
    nmap_path: String,
}

impl NmapScanner {
    pub fn new(nmap_path: &str) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
        }
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|_| DiscoverError::NmapNotFound {
                path: self.nmap_path.clone(),
            })?;

        String::from_utf8(output.stdout).map_err(|e| DiscoverError::XmlParse(e.to_string()))
    }

    /// Build the argument list for a scan.
    ///
    /// Host discovery is skipped (`-Pn`) so every target gets a port scan,
    /// and console output is silenced (`-v0`) with XML going to stdout.
    pub fn scan_args(targets: &[String], profile: &ScanProfile, extra_args: &[String]) -> Vec<String> {
        let mut args: Vec<String> = ["-Pn", "-v0", "-oX", "-"]
            .iter()
            .chain(profile.nmap_flags().iter())
            .map(|s| s.to_string())
            .collect();
        args.extend(extra_args.iter().cloned());
        args.extend(targets.iter().cloned());
        args
    }

    /// Execute an nmap scan against the given targets.
    pub async fn scan(
        &self,
        targets: &[String],
        profile: &ScanProfile,
        extra_args: &[String],
    ) -> Result<ScanResult> {
        let scan_id = Uuid::new_v4();
        let start = Instant::now();
        let args = Self::scan_args(targets, profile, extra_args);

        tracing::info!(
            scan_id = %scan_id,
            targets = ?targets,
            profile = ?profile,
            "Starting nmap scan"
        );

        let output = Command::new(&self.nmap_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| DiscoverError::NmapNotFound {
                path: format!("{}: {e}", self.nmap_path),
            })?;

        let duration = start.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DiscoverError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let nmap_run = nmap_xml::parse_nmap_xml(&output.stdout)?;

        tracing::info!(
            scan_id = %scan_id,
            args = nmap_run.args.as_deref().unwrap_or_default(),
            host_entries = nmap_run.hosts.len(),
            hosts_up = ?nmap_run.hosts_up(),
            duration_ms = duration.as_millis(),
            "Nmap scan complete"
        );

        Ok(ScanResult {
            scan_id,
            xml: output.stdout,
            nmap_run,
            duration,
        })
    }
}

/// What ndiff concluded about two scans, from its exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOutcome {
    /// Exit 0.
    NoDifferences,
    /// Exit 1.
    Differences,
    /// Any other status, including termination by a signal.
    Failed,
}

impl DiffOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::NoDifferences,
            Some(1) => Self::Differences,
            _ => Self::Failed,
        }
    }
}

/// Captured output of one ndiff run.
#[derive(Debug, Clone)]
pub struct NdiffReport {
    pub exit_code: Option<i32>,
    /// The text report (stdout).
    pub text: String,
    pub stderr: String,
}

impl NdiffReport {
    pub fn outcome(&self) -> DiffOutcome {
        DiffOutcome::from_exit_code(self.exit_code)
    }
}

/// Wrapper around the ndiff binary.
pub struct NdiffRunner {
    ndiff_path: String,
}

impl NdiffRunner {
    pub fn new(ndiff_path: &str) -> Self {
        Self {
            ndiff_path: ndiff_path.to_string(),
        }
    }

    /// Compare the previous scan archive against the current one.
    ///
    /// Only a failure to start ndiff is an error here; its exit status is
    /// returned in the report for the caller to interpret.
    pub async fn compare(&self, previous: &Path, current: &Path) -> Result<NdiffReport> {
        let output = Command::new(&self.ndiff_path)
            .arg(previous)
            .arg(current)
            .output()
            .await
            .map_err(|e| DiscoverError::NdiffNotFound {
                path: format!("{}: {e}", self.ndiff_path),
            })?;

        let report = NdiffReport {
            exit_code: output.status.code(),
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            previous = %previous.display(),
            current = %current.display(),
            exit_code = ?report.exit_code,
            outcome = ?report.outcome(),
            "Ndiff finished"
        );

        Ok(report)
    }
}
