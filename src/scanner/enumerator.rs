//! Expansion of hosts × ports into scan units.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{HostList, Port, PortRange};
use std::fmt;
use std::sync::Arc;

/// One `(host, port)` pair awaiting a probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanUnit {
    pub host: Arc<str>,
    pub port: Port,
}

impl ScanUnit {
    pub fn new(host: impl Into<Arc<str>>, port: Port) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ScanUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Lazily yields every port of the range for each host in turn.
///
/// All units of one host come out before the next host starts, which keeps
/// per-host results clustered in time.
#[derive(Debug, Clone)]
pub struct Enumerator {
    hosts: Vec<Arc<str>>,
    range: PortRange,
    host_index: usize,
    next_port: u32,
}

impl Enumerator {
    /// Create an enumerator, rejecting an empty host list.
    pub fn new(hosts: &HostList, range: PortRange) -> ConfigResult<Self> {
        if hosts.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        Ok(Self {
            hosts: hosts.as_slice().to_vec(),
            range,
            host_index: 0,
            next_port: u32::from(range.start().as_u16()),
        })
    }

    /// Create an enumerator from raw port bounds.
    pub fn from_bounds(hosts: &HostList, start: u32, end: u32) -> ConfigResult<Self> {
        let range = PortRange::new(start, end)?;
        Self::new(hosts, range)
    }

    /// Total number of units this enumerator produces from the start.
    pub fn total(&self) -> usize {
        self.hosts.len() * self.range.len()
    }

    fn remaining(&self) -> usize {
        if self.host_index >= self.hosts.len() {
            return 0;
        }
        let end = u32::from(self.range.end().as_u16());
        let in_current = (end + 1 - self.next_port) as usize;
        in_current + (self.hosts.len() - self.host_index - 1) * self.range.len()
    }
}

impl Iterator for Enumerator {
    type Item = ScanUnit;

    fn next(&mut self) -> Option<Self::Item> {
        let host = self.hosts.get(self.host_index)?;
        // next_port always lies within the range, so it fits a valid Port
        let port = Port::try_from(self.next_port).ok()?;
        let unit = ScanUnit::new(Arc::clone(host), port);

        if port == self.range.end() {
            self.host_index += 1;
            self.next_port = u32::from(self.range.start().as_u16());
        } else {
            self.next_port += 1;
        }

        Some(unit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Enumerator {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hosts(list: &[&str]) -> HostList {
        list.iter().copied().collect()
    }

    #[test]
    fn test_units_per_host_match_range() {
        let hosts = hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let units: Vec<ScanUnit> = Enumerator::from_bounds(&hosts, 20, 29).unwrap().collect();

        assert_eq!(units.len(), 30);
        for host in hosts.iter() {
            assert_eq!(units.iter().filter(|u| &u.host == host).count(), 10);
        }

        let unique: HashSet<_> = units.iter().collect();
        assert_eq!(unique.len(), units.len());
    }

    #[test]
    fn test_hosts_are_grouped_in_order() {
        let hosts = hosts(&["b", "a"]);
        let units: Vec<String> = Enumerator::from_bounds(&hosts, 1, 2)
            .unwrap()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(units, vec!["b:1", "b:2", "a:1", "a:2"]);
    }

    #[test]
    fn test_full_range_ends_cleanly() {
        let hosts = hosts(&["h"]);
        let mut enumerator = Enumerator::new(&hosts, PortRange::full()).unwrap();
        assert_eq!(enumerator.len(), 65535);

        let last = enumerator.by_ref().last().unwrap();
        assert_eq!(last.port.as_u16(), 65535);
        assert!(enumerator.next().is_none());
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let hosts = hosts(&["a", "b"]);
        let mut enumerator = Enumerator::from_bounds(&hosts, 1, 5).unwrap();
        assert_eq!(enumerator.total(), 10);
        enumerator.next();
        enumerator.next();
        assert_eq!(enumerator.len(), 8);
        enumerator.by_ref().take(3).for_each(drop);
        assert_eq!(enumerator.len(), 5);
    }

    #[test]
    fn test_empty_hosts_rejected() {
        let result = Enumerator::from_bounds(&HostList::new(), 1, 10);
        assert!(matches!(result, Err(ConfigError::NoTargets)));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let hosts = hosts(&["h"]);
        assert!(matches!(
            Enumerator::from_bounds(&hosts, 10, 1),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            Enumerator::from_bounds(&hosts, 0, 1),
            Err(ConfigError::PortOutOfRange(0))
        ));
    }

    #[test]
    fn test_ipv6_display() {
        let unit = ScanUnit::new("::1", Port::new(22).unwrap());
        assert_eq!(unit.to_string(), "[::1]:22");
    }
}
