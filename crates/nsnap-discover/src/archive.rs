//! On-disk archive of raw scans and diff reports.
//!
//! Layout of the scan directory:
//! ```text
//! {scan_dir}/
//!   scan_20260224-100000.xml   raw nmap output of one run
//!   diff_20260224-100000.out   ndiff report for that run
//!   last -> scan_20260224-100000.xml
//! ```
//! `last` is the previous run's scan and the first input to ndiff.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{DiscoverError, Result};

const LAST_LINK: &str = "last";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

pub struct ScanArchive {
    dir: PathBuf,
}

impl ScanArchive {
    /// Open the archive, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| DiscoverError::Archive {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn scan_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("scan_{}.xml", at.format(STAMP_FORMAT)))
    }

    pub fn diff_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("diff_{}.out", at.format(STAMP_FORMAT)))
    }

    fn last_path(&self) -> PathBuf {
        self.dir.join(LAST_LINK)
    }

    pub fn write_scan(&self, at: DateTime<Utc>, xml: &[u8]) -> Result<PathBuf> {
        write_file(self.scan_path(at), xml)
    }

    pub fn write_diff(&self, at: DateTime<Utc>, report: &str) -> Result<PathBuf> {
        write_file(self.diff_path(at), report.as_bytes())
    }

    /// The previous scan, if `last` resolves to an existing file.
    pub fn previous(&self) -> Option<PathBuf> {
        let last = self.last_path();
        last.exists().then_some(last)
    }

    /// Point `last` at `current`, replacing any previous (even dangling) link.
    pub fn promote(&self, current: &Path) -> std::io::Result<()> {
        let last = self.last_path();
        if fs::symlink_metadata(&last).is_ok() {
            fs::remove_file(&last)?;
        }
        link_or_copy(current, &last)
    }
}

fn write_file(path: PathBuf, contents: &[u8]) -> Result<PathBuf> {
    match fs::write(&path, contents) {
        Ok(()) => Ok(path),
        Err(source) => Err(DiscoverError::Archive {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(unix)]
fn link_or_copy(current: &Path, last: &Path) -> std::io::Result<()> {
    // Relative target, so the archive directory can be moved as a whole.
    let target = current.file_name().map_or(current, Path::new);
    std::os::unix::fs::symlink(target, last)
}

#[cfg(not(unix))]
fn link_or_copy(current: &Path, last: &Path) -> std::io::Result<()> {
    fs::copy(current, last).map(|_| ())
}
