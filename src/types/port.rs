//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` is the closed interval a scan sweeps over every host.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Port {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(ConfigError::PortOutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// A closed range of ports, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a range from raw bounds.
    ///
    /// Bounds are checked against 1-65535 before their order, so `0-10`
    /// reports the bad port rather than a range error.
    pub fn new(start: u32, end: u32) -> Result<Self, ConfigError> {
        let start_port = Port::try_from(start)?;
        let end_port = Port::try_from(end)?;
        if start_port > end_port {
            return Err(ConfigError::InvalidRange { start, end });
        }
        Ok(Self {
            start: start_port,
            end: end_port,
        })
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// The whole port space.
    pub const fn full() -> Self {
        Self {
            start: Port(Port::MIN),
            end: Port(Port::MAX),
        }
    }

    pub const fn start(&self) -> Port {
        self.start
    }

    pub const fn end(&self) -> Port {
        self.end
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Check whether a port falls inside the range.
    pub fn contains(&self, port: Port) -> bool {
        self.start <= port && port <= self.end
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parses `"start-end"` or a single `"port"`.
impl FromStr for PortRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidFormat("empty port range".to_string()));
        }

        let parse_bound = |bound: &str| -> Result<u32, ConfigError> {
            bound
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidFormat(format!("invalid port number: {}", bound)))
        };

        match s.split_once('-') {
            Some((start, end)) => Self::new(parse_bound(start)?, parse_bound(end)?),
            None => {
                let port = parse_bound(s)?;
                Self::new(port, port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
        assert!(matches!(
            Port::try_from(70000u32),
            Err(ConfigError::PortOutOfRange(70000))
        ));
    }

    #[test]
    fn test_port_range_len() {
        let range = PortRange::new(1, 100).unwrap();
        assert_eq!(range.len(), 100);
        assert_eq!(range.iter().count(), 100);
        assert_eq!(PortRange::full().len(), 65535);
    }

    #[test]
    fn test_port_range_rejects_reversed_bounds() {
        assert!(matches!(
            PortRange::new(10, 5),
            Err(ConfigError::InvalidRange { start: 10, end: 5 })
        ));
    }

    #[test]
    fn test_port_range_rejects_out_of_bounds() {
        assert!(matches!(
            PortRange::new(0, 10),
            Err(ConfigError::PortOutOfRange(0))
        ));
        assert!(matches!(
            PortRange::new(1, 65536),
            Err(ConfigError::PortOutOfRange(65536))
        ));
    }

    #[test]
    fn test_port_range_parsing() {
        let range: PortRange = "1-1024".parse().unwrap();
        assert_eq!(range.len(), 1024);
        assert_eq!(range.to_string(), "1-1024");

        let single: PortRange = " 443 ".parse().unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.to_string(), "443");

        assert!(matches!(
            "80-abc".parse::<PortRange>(),
            Err(ConfigError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1024-1".parse::<PortRange>(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let range = PortRange::new(20, 25).unwrap();
        assert!(range.contains(Port::new(20).unwrap()));
        assert!(range.contains(Port::new(25).unwrap()));
        assert!(!range.contains(Port::new(26).unwrap()));
    }
}
