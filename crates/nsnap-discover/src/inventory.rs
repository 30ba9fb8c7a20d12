//! Scan result normalization: nmap hosts into per-run service records.
//!
//! Hosts without any port to report are dropped here, so a filtered or
//! partial scan never puts empty hosts into the inventory.

use nsnap_core::ServiceRecord;

use crate::nmap_xml::{NmapHost, NmapPort, NmapRun};

/// Stand-in address for a host entry without a usable address attribute.
pub const UNKNOWN_ADDRESS: &str = "n/a";

/// Stand-in display name for a host nmap could not name.
pub const NO_HOSTNAME: &str = "-";

/// State recorded for a `<port>` without a `<state>` child.
const UNKNOWN_STATE: &str = "unknown";

/// A host with at least one service to record for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedHost {
    pub address: String,
    pub display_name: String,
    pub services: Vec<ServiceRecord>,
}

/// Normalized content of one nmap run.
#[derive(Debug, Default)]
pub struct ScanInventory {
    pub hosts: Vec<ScannedHost>,
    /// Host entries dropped for having no ports.
    pub skipped_hosts: usize,
    /// Port entries dropped for an unusable port number or protocol.
    pub skipped_ports: usize,
}

/// Convert raw nmap output into the hosts and services to persist.
pub fn parse_scan_results(nmap_run: &NmapRun) -> ScanInventory {
    let mut inventory = ScanInventory::default();

    for nmap_host in &nmap_run.hosts {
        let address = nmap_host.address().unwrap_or(UNKNOWN_ADDRESS);
        let (services, bad_ports) = convert_ports(address, nmap_host.port_entries());
        inventory.skipped_ports += bad_ports;

        if services.is_empty() {
            tracing::debug!(address = %address, "No ports reported, skipping host");
            inventory.skipped_hosts += 1;
            continue;
        }

        inventory.hosts.push(scanned_host(nmap_host, address, services));
    }

    inventory
}

fn scanned_host(nmap_host: &NmapHost, address: &str, services: Vec<ServiceRecord>) -> ScannedHost {
    ScannedHost {
        address: address.to_string(),
        display_name: nmap_host.hostname().unwrap_or(NO_HOSTNAME).to_string(),
        services,
    }
}

fn convert_ports(address: &str, ports: &[NmapPort]) -> (Vec<ServiceRecord>, usize) {
    let mut services = Vec::with_capacity(ports.len());
    let mut skipped = 0;

    for np in ports {
        let port = match parse_port_id(np.port_id.as_deref()) {
            Ok(p) => p,
            Err(reason) => {
                tracing::warn!(
                    address = %address,
                    portid = ?np.port_id,
                    error = %reason,
                    "Skipping port with invalid number"
                );
                skipped += 1;
                continue;
            }
        };

        let Some(protocol) = np.protocol.as_deref().filter(|p| !p.trim().is_empty()) else {
            tracing::warn!(address = %address, port, "Skipping port without protocol");
            skipped += 1;
            continue;
        };

        services.push(ServiceRecord {
            port,
            protocol: protocol.to_string(),
            state: np
                .state
                .as_ref()
                .and_then(|s| s.state.as_deref())
                .unwrap_or(UNKNOWN_STATE)
                .to_string(),
            service_name: np.service.as_ref().and_then(|s| s.name.clone()),
        });
    }

    (services, skipped)
}

fn parse_port_id(port_id: Option<&str>) -> Result<u16, String> {
    let raw = port_id.ok_or_else(|| "missing portid".to_string())?;
    raw.trim().parse::<u16>().map_err(|e| e.to_string())
}
