//! nsnap-discover: Scan ingestion and diff extraction.
//!
//! Runs nmap, records every host's services under a single run timestamp,
//! then runs ndiff against the previous scan and stores the per-host
//! changed lines.

pub mod archive;
pub mod config;
pub mod cycle;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod nmap_xml;
pub mod persist;
pub mod scanner;
