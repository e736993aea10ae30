//! Configuration management for portsweep.
//!
//! Provides XDG-compliant settings storage; command-line flags layer on top.

mod settings;

pub use settings::{AppSettings, Paths};
