//! murmur application settings
use std::net::{Ipv4Addr, SocketAddrV4};

use serde::Serialize;

use crate::config_error;
use crate::error::Result;
use crate::node::NodeId;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_UDP: u16 = 8412;
pub const DEFAULT_PORT_UDP: &str = "8412";

/// Time units of silence before a peer is dropped from the view
pub const DEFAULT_REMOVE_TIMEOUT: u64 = 20;
/// Reserved for a suspect-then-remove detector; not consulted by merge or sweep
pub const DEFAULT_FAIL_TIMEOUT: u64 = 5;

/// Knobs of the membership protocol itself
#[derive(Clone, Debug, Serialize)]
pub struct ProtocolSettings {
    // Well-known endpoint joining nodes contact
    pub introducer: NodeId,

    pub remove_timeout: u64,

    pub fail_timeout: u64,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            introducer: NodeId::INTRODUCER,
            remove_timeout: DEFAULT_REMOVE_TIMEOUT,
            fail_timeout: DEFAULT_FAIL_TIMEOUT,
        }
    }
}

impl ProtocolSettings {
    pub fn validate(&self) -> Result<()> {
        if self.introducer.is_null() {
            return Err(config_error!("Introducer address must not be null"));
        }
        if self.remove_timeout == 0 {
            return Err(config_error!("Remove timeout must be at least 1"));
        }
        if self.fail_timeout > self.remove_timeout {
            return Err(config_error!(
                "Fail timeout {} exceeds remove timeout {}",
                self.fail_timeout,
                self.remove_timeout
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunMode {
    Node,
    Simulate,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Node => write!(f, "node"),
            RunMode::Simulate => write!(f, "simulate"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "node" => Ok(RunMode::Node),
            "simulate" => Ok(RunMode::Simulate),
            _ => Err(format!("Invalid run-mode: {}", s)),
        }
    }
}

/// Shape of an in-process simulated group
#[derive(Clone, Debug, Serialize)]
pub struct SimulationSettings {
    pub peers: usize,
    pub total_ticks: u64,
    // Ticks between consecutive node starts
    pub start_stagger: u64,
    pub fail_at: u64,
    // Fail half the group instead of a single node
    pub multi_failure: bool,
    pub seed: u64,
    pub reorder: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            peers: 10,
            total_ticks: 700,
            start_stagger: 1,
            fail_at: 100,
            multi_failure: false,
            seed: 0,
            reorder: true,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.peers == 0 {
            return Err(config_error!("A simulation needs at least one peer"));
        }
        if self.peers > u32::MAX as usize {
            return Err(config_error!("Too many peers: {}", self.peers));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Settings {
    // UDP listen address; also the node's identity
    pub listen_address: String,

    pub listen_port_udp: u16,

    pub run_mode: RunMode,

    // Milliseconds per tick: one drain plus one gossip round
    pub gossip_interval_ms: u64,

    // Log the membership view every this many ticks (0 disables)
    pub status_every: u64,

    pub protocol: ProtocolSettings,

    pub simulation: SimulationSettings,
}

impl Settings {
    /// Address the node binds and advertises
    pub fn listen_socket_addr(&self) -> Result<SocketAddrV4> {
        let ip: Ipv4Addr = self
            .listen_address
            .parse()
            .map_err(|e| config_error!("Invalid listen address {}: {}", self.listen_address, e))?;
        if ip.is_unspecified() {
            return Err(config_error!(
                "Listen address {} cannot be advertised to peers",
                ip
            ));
        }
        Ok(SocketAddrV4::new(ip, self.listen_port_udp))
    }

    pub fn validate(&self) -> Result<()> {
        self.protocol.validate()?;
        match self.run_mode {
            RunMode::Node => {
                self.listen_socket_addr()?;
                if self.gossip_interval_ms == 0 {
                    return Err(config_error!("Gossip interval must be at least 1ms"));
                }
                Ok(())
            }
            RunMode::Simulate => self.simulation.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MurmurError;

    fn node_settings() -> Settings {
        Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port_udp: STANDARD_PORT_UDP,
            run_mode: RunMode::Node,
            gossip_interval_ms: 100,
            status_every: 0,
            protocol: ProtocolSettings::default(),
            simulation: SimulationSettings::default(),
        }
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("node".parse::<RunMode>().unwrap(), RunMode::Node);
        assert_eq!("SIMULATE".parse::<RunMode>().unwrap(), RunMode::Simulate);
        assert!("gossip".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Simulate.to_string(), "simulate");
    }

    #[test]
    fn test_protocol_defaults_are_valid() {
        let protocol = ProtocolSettings::default();
        assert_eq!(protocol.introducer, NodeId::INTRODUCER);
        assert!(protocol.validate().is_ok());
    }

    #[test]
    fn test_fail_timeout_bounded_by_remove_timeout() {
        let protocol = ProtocolSettings {
            fail_timeout: 30,
            ..ProtocolSettings::default()
        };
        assert!(matches!(protocol.validate(), Err(MurmurError::Config(_))));

        let protocol = ProtocolSettings {
            remove_timeout: 0,
            fail_timeout: 0,
            ..ProtocolSettings::default()
        };
        assert!(protocol.validate().is_err());
    }

    #[test]
    fn test_listen_address() {
        let settings = node_settings();
        assert_eq!(
            settings.listen_socket_addr().unwrap(),
            "127.0.0.1:8412".parse::<SocketAddrV4>().unwrap()
        );
        assert!(settings.validate().is_ok());

        let unspecified = Settings {
            listen_address: "0.0.0.0".to_string(),
            ..node_settings()
        };
        assert!(unspecified.validate().is_err());

        let v6 = Settings {
            listen_address: "::1".to_string(),
            ..node_settings()
        };
        assert!(v6.listen_socket_addr().is_err());
    }

    #[test]
    fn test_simulation_needs_peers() {
        let settings = Settings {
            run_mode: RunMode::Simulate,
            simulation: SimulationSettings {
                peers: 0,
                ..SimulationSettings::default()
            },
            ..node_settings()
        };
        assert!(settings.validate().is_err());
    }
}
