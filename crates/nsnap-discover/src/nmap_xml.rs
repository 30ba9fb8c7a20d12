//! Nmap XML output deserialization.
//!
//! Nmap's `-oX -` flag outputs structured XML to stdout.
//! This module provides typed Rust structs that deserialize from that XML
//! using `quick-xml` with serde. Repeated elements (`<host>`, `<address>`,
//! `<port>`) always land in a `Vec`, so one port and many ports come out in
//! the same shape.

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
    pub runstats: Option<RunStats>,
}

/// A single host from scan results.
#[derive(Debug, Clone, Deserialize)]
pub struct NmapHost {
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: Option<String>,
    #[serde(rename = "@addrtype")]
    pub addr_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

/// One `<port>` element. Attributes stay optional text so that a single bad
/// port can be skipped without rejecting the whole document.
#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: Option<String>,
    #[serde(rename = "@portid")]
    pub port_id: Option<String>,
    pub state: Option<PortState>,
    pub service: Option<NmapService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStats {
    pub hosts: Option<RunStatsHosts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStatsHosts {
    #[serde(rename = "@up")]
    pub up: Option<String>,
}

impl NmapHost {
    /// The address used as host identity: IPv4 first, then IPv6, then any
    /// other non-MAC address element.
    pub fn address(&self) -> Option<&str> {
        self.address_of_type("ipv4")
            .or_else(|| self.address_of_type("ipv6"))
            .or_else(|| {
                self.addresses
                    .iter()
                    .filter(|a| a.addr_type.as_deref() != Some("mac"))
                    .find_map(|a| a.addr.as_deref())
            })
    }

    fn address_of_type(&self, addr_type: &str) -> Option<&str> {
        self.addresses
            .iter()
            .filter(|a| a.addr_type.as_deref() == Some(addr_type))
            .find_map(|a| a.addr.as_deref())
    }

    /// The first non-empty hostname, if any.
    pub fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()?
            .hostnames
            .iter()
            .filter_map(|h| h.name.as_deref())
            .find(|name| !name.trim().is_empty())
    }

    /// Port elements reported for this host; empty when `<ports>` is absent.
    pub fn port_entries(&self) -> &[NmapPort] {
        self.ports
            .as_ref()
            .map(|p| p.ports.as_slice())
            .unwrap_or_default()
    }
}

impl NmapRun {
    /// `up` count from `<runstats>`, when nmap reported one.
    pub fn hosts_up(&self) -> Option<u32> {
        self.runstats
            .as_ref()
            .and_then(|s| s.hosts.as_ref())
            .and_then(|h| h.up.as_deref())
            .and_then(|up| up.parse().ok())
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    quick_xml::de::from_reader(xml).map_err(|e| DiscoverError::XmlParse(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECT_SCAN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<?xml-stylesheet href="file:///usr/bin/../share/nmap/nmap.xsl" type="text/xsl"?>
<nmaprun scanner="nmap" args="nmap -Pn -v0 -oX - -sT 192.168.201.22-24" startstr="Mon Feb 24 10:00:00 2026">
  <scaninfo type="connect" protocol="tcp" numservices="1000" services="1-1000"/>
  <verbose level="0"/>
  <debugging level="0"/>
  <host>
    <status state="up" reason="user-set"/>
    <address addr="192.168.201.22" addrtype="ipv4"/>
    <address addr="AA:BB:CC:DD:EE:01" addrtype="mac" vendor="TestVendor"/>
    <hostnames>
      <hostname name="gateway.local" type="PTR"/>
    </hostnames>
    <ports>
      <extraports state="closed" count="999"/>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack"/>
        <service name="ssh" method="table" conf="3"/>
      </port>
    </ports>
  </host>
  <host>
    <status state="up" reason="user-set"/>
    <address addr="192.168.201.23" addrtype="ipv4"/>
    <hostnames/>
    <ports>
      <port protocol="tcp" portid="80">
        <state state="open" reason="syn-ack"/>
        <service name="http" method="table" conf="3"/>
      </port>
      <port protocol="tcp" portid="443">
        <state state="open" reason="syn-ack"/>
        <service name="https" method="table" conf="3"/>
      </port>
      <port protocol="tcp" portid="3306">
        <state state="filtered" reason="no-response"/>
      </port>
    </ports>
  </host>
  <host>
    <status state="up" reason="user-set"/>
    <address addr="192.168.201.24" addrtype="ipv4"/>
    <ports>
      <extraports state="filtered" count="1000"/>
    </ports>
  </host>
  <runstats>
    <finished time="1740400000" elapsed="2.50"/>
    <hosts up="3" down="0" total="3"/>
  </runstats>
</nmaprun>"#;

    #[test]
    fn test_parse_connect_scan() {
        let result = parse_nmap_xml(CONNECT_SCAN_XML.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 3);
        assert_eq!(result.hosts_up(), Some(3));

        let gateway = &result.hosts[0];
        assert_eq!(gateway.address(), Some("192.168.201.22"));
        assert_eq!(gateway.hostname(), Some("gateway.local"));
        assert_eq!(gateway.port_entries().len(), 1);
        let ssh = &gateway.port_entries()[0];
        assert_eq!(ssh.port_id.as_deref(), Some("22"));
        assert_eq!(ssh.protocol.as_deref(), Some("tcp"));
        assert_eq!(ssh.state.as_ref().unwrap().state.as_deref(), Some("open"));

        let web = &result.hosts[1];
        assert_eq!(web.hostname(), None);
        assert_eq!(web.port_entries().len(), 3);
        let filtered = &web.port_entries()[2];
        assert_eq!(filtered.port_id.as_deref(), Some("3306"));
        assert!(filtered.service.is_none());

        assert!(result.hosts[2].port_entries().is_empty());
    }

    #[test]
    fn test_parse_empty_scan() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sT 192.168.99.0/24">
  <runstats>
    <finished elapsed="1.00"/>
    <hosts up="0" down="256" total="256"/>
  </runstats>
</nmaprun>"#;

        let result = parse_nmap_xml(xml.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 0);
        assert_eq!(result.hosts_up(), Some(0));
    }

    #[test]
    fn test_address_preference() {
        let host = NmapHost {
            addresses: vec![
                Address {
                    addr: Some("AA:BB:CC:DD:EE:10".to_string()),
                    addr_type: Some("mac".to_string()),
                },
                Address {
                    addr: Some("fe80::1".to_string()),
                    addr_type: Some("ipv6".to_string()),
                },
            ],
            hostnames: None,
            ports: None,
        };
        assert_eq!(host.address(), Some("fe80::1"));

        let mac_only = NmapHost {
            addresses: vec![Address {
                addr: Some("AA:BB:CC:DD:EE:10".to_string()),
                addr_type: Some("mac".to_string()),
            }],
            hostnames: None,
            ports: None,
        };
        assert_eq!(mac_only.address(), None);
    }

    #[test]
    fn test_address_attribute_missing() {
        let xml = r#"<nmaprun scanner="nmap">
  <host>
    <address addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="22"><state state="open"/></port>
    </ports>
  </host>
</nmaprun>"#;

        let result = parse_nmap_xml(xml.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].address(), None);
        assert_eq!(result.hosts[0].port_entries().len(), 1);
    }

    #[test]
    fn test_missing_attributes_do_not_reject_document() {
        let xml = r#"<nmaprun scanner="nmap">
  <host>
    <address addr="10.0.0.1" addrtype="ipv4"/>
    <hostnames><hostname type="PTR"/><hostname name="web.local" type="user"/></hostnames>
    <ports>
      <port portid="80"><state/></port>
    </ports>
  </host>
</nmaprun>"#;

        let result = parse_nmap_xml(xml.as_bytes()).unwrap();
        let host = &result.hosts[0];
        assert_eq!(host.hostname(), Some("web.local"));
        let port = &host.port_entries()[0];
        assert_eq!(port.protocol, None);
        assert_eq!(port.state.as_ref().unwrap().state, None);
    }

    #[test]
    fn test_malformed_document() {
        let err = parse_nmap_xml(b"<nmaprun><host>").unwrap_err();
        assert!(matches!(err, DiscoverError::XmlParse(_)));
    }
}
