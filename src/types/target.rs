//! Target specification types with CIDR and hostname support.
//!
//! Provides flexible target parsing supporting:
//! - Single IP addresses (IPv4 and IPv6)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com), resolved when the probe connects
//! - Host files with one target per line

use crate::error::{ConfigError, ConfigResult};
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// A single target specification.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// A hostname, left for the connector to resolve.
    Hostname(String),
}

impl TargetSpec {
    /// Maximum number of hosts allowed in a CIDR range.
    pub const MAX_CIDR_HOSTS: u128 = 65536; // /16 for IPv4

    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> ConfigResult<Self> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| ConfigError::InvalidTarget(format!("invalid CIDR notation: {}", s)))?;

            let host_count = cidr_size(&network);
            if host_count > Self::MAX_CIDR_HOSTS {
                return Err(ConfigError::InvalidTarget(format!(
                    "CIDR range too large: {} addresses (max: {})",
                    host_count,
                    Self::MAX_CIDR_HOSTS
                )));
            }

            return Ok(Self::Cidr(network));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(ConfigError::InvalidTarget(s.to_string()))
    }

    /// Expand into the host strings handed to the enumerator.
    ///
    /// IPv4 networks shorter than /31 skip their network and broadcast addresses.
    pub fn hosts(&self) -> Vec<String> {
        match self {
            Self::Single(ip) => vec![ip.to_string()],
            Self::Hostname(hostname) => vec![hostname.clone()],
            Self::Cidr(network) => network
                .iter()
                .filter(|ip| {
                    if let (IpNetwork::V4(net), IpAddr::V4(addr)) = (network, ip) {
                        if net.prefix() < 31 {
                            return *addr != net.network() && *addr != net.broadcast();
                        }
                    }
                    true
                })
                .map(|ip| ip.to_string())
                .collect(),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

fn cidr_size(network: &IpNetwork) -> u128 {
    match network {
        IpNetwork::V4(net) => net.size() as u128,
        IpNetwork::V6(net) => {
            let prefix = net.prefix() as u32;
            1u128.checked_shl(128 - prefix).unwrap_or(u128::MAX)
        }
    }
}

/// Ordered, duplicate-free list of hosts to scan.
///
/// Order is the order targets were given in; it is also the order
/// summaries are reported in.
#[derive(Debug, Clone, Default)]
pub struct HostList {
    hosts: Vec<Arc<str>>,
    seen: HashSet<Arc<str>>,
}

impl PartialEq for HostList {
    fn eq(&self, other: &Self) -> bool {
        self.hosts == other.hosts
    }
}

impl Eq for HostList {}

impl HostList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from target specifications, expanding each one.
    pub fn from_targets<I, S>(targets: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for target in targets {
            list.add_target(target.as_ref())?;
        }
        Ok(list)
    }

    /// Read targets from a file, one per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_targets(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Parse and append one target specification.
    pub fn add_target(&mut self, target: &str) -> ConfigResult<()> {
        let spec = TargetSpec::parse(target)?;
        self.extend(spec.hosts());
        Ok(())
    }

    /// Append hosts verbatim, skipping duplicates.
    pub fn extend<I, S>(&mut self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        for host in hosts {
            let host = host.into();
            if self.seen.insert(Arc::clone(&host)) {
                self.hosts.push(host);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
        self.hosts.iter()
    }

    pub(crate) fn as_slice(&self) -> &[Arc<str>] {
        &self.hosts
    }
}

impl<S: Into<Arc<str>>> FromIterator<S> for HostList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    for label in s.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        if !label.chars().last().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V4(_))));
    }

    #[test]
    fn test_parse_ipv6() {
        let spec = TargetSpec::parse("::1").unwrap();
        assert!(matches!(spec, TargetSpec::Single(IpAddr::V6(_))));
    }

    #[test]
    fn test_parse_hostname() {
        let spec = TargetSpec::parse("example.com").unwrap();
        assert!(matches!(spec, TargetSpec::Hostname(_)));
        assert_eq!(spec.hosts(), vec!["example.com".to_string()]);
    }

    #[test]
    fn test_cidr_expansion_skips_network_and_broadcast() {
        let spec = TargetSpec::parse("10.0.0.0/30").unwrap();
        assert_eq!(spec.hosts(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_cidr_too_large() {
        assert!(matches!(
            TargetSpec::parse("10.0.0.0/8"),
            Err(ConfigError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_invalid_target() {
        assert!(TargetSpec::parse("-bad-.com").is_err());
        assert!(TargetSpec::parse("").is_err());
    }

    #[test]
    fn test_host_list_dedups_in_order() {
        let list = HostList::from_targets(["10.0.0.2", "10.0.0.1", "10.0.0.2"]).unwrap();
        let hosts: Vec<&str> = list.iter().map(|h| h.as_ref()).collect();
        assert_eq!(hosts, vec!["10.0.0.2", "10.0.0.1"]);
    }

    #[test]
    fn test_large_host_list_builds_quickly() {
        let targets: Vec<String> = (0..50_000u32)
            .map(|i| format!("10.{}.{}.{}", i >> 16, (i >> 8) & 0xff, i & 0xff))
            .collect();

        let started = std::time::Instant::now();
        let mut list = HostList::from_targets(&targets).unwrap();
        list.extend(targets.iter().take(100).map(String::as_str));

        assert_eq!(list.len(), 50_000);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_equality_ignores_lookup_set() {
        let a = HostList::from_targets(["10.0.0.1", "10.0.0.2"]).unwrap();
        let b: HostList = ["10.0.0.1", "10.0.0.2", "10.0.0.1"].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_list_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# lab hosts").unwrap();
        writeln!(file, "  127.0.0.1  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "localhost").unwrap();

        let list = HostList::from_file(file.path()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].as_ref(), "127.0.0.1");
    }

    #[test]
    fn test_host_list_missing_file() {
        let result = HostList::from_file(Path::new("/nonexistent/hosts.txt"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("my-server"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-invalid.com"));
    }
}
