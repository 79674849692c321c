use std::future::Future;

use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{info, warn};

use super::clock::LogicalClock;
use super::events::TracingEvents;
use super::gossip_node::{GossipNode, NodeStatus};
use super::NodeId;
use crate::error::Result;
use crate::settings::Settings;
use crate::transport::UdpTransport;

type UdpGossipNode = GossipNode<UdpTransport, LogicalClock, TracingEvents>;

/// Runs one membership node over UDP, ticking it on the gossip interval.
///
/// The node is owned by this task alone: the timer is the only thing that touches it,
/// so a drain and a gossip round never overlap.
pub struct Controller {
    settings: Settings,
    node: UdpGossipNode,
    clock: LogicalClock,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("node", &self.node)
            .field("gossip_interval_ms", &self.settings.gossip_interval_ms)
            .finish()
    }
}

impl Controller {
    /// Bind the node's socket. Errors here are fatal for the process.
    pub async fn bind(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let transport = UdpTransport::bind(settings.listen_socket_addr()?).await?;
        Self::with_transport(settings, transport)
    }

    /// Drive a node over an already bound socket; its bound address is the node's identity
    pub fn with_transport(settings: Settings, transport: UdpTransport) -> Result<Self> {
        settings.protocol.validate()?;
        let node_id = transport.local_id();
        let clock = LogicalClock::new();
        let node = GossipNode::new(
            node_id,
            settings.protocol.clone(),
            transport,
            clock.clone(),
            TracingEvents,
        );

        Ok(Self {
            settings,
            node,
            clock,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node.node_id()
    }

    /// Run until ctrl-c
    pub async fn run(self) -> Result<NodeStatus> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Start the node and tick it until `shutdown` resolves; returns the final view
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<NodeStatus>
    where
        F: Future<Output = ()>,
    {
        let node_id = self.node_id();
        // The join request goes out inside start() and is never retried
        self.node.transport().writable().await?;
        self.node.start()?;
        info!(
            "[{}] Starting gossip loop with {}ms interval",
            node_id, self.settings.gossip_interval_ms
        );

        let mut gossip_timer =
            time::interval(Duration::from_millis(self.settings.gossip_interval_ms));
        gossip_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = gossip_timer.tick() => {
                    let tick = self.clock.advance();
                    self.node.tick();
                    if self.settings.status_every > 0 && tick % self.settings.status_every == 0 {
                        self.log_status()?;
                    }
                }
                _ = &mut shutdown => {
                    info!("[{}] Shutdown requested", node_id);
                    break;
                }
            }
        }

        let status = self.node.status();
        self.node.finish();
        Ok(status)
    }

    fn log_status(&self) -> Result<()> {
        let status = serde_json::to_string(&self.node.status())?;
        let stats = serde_json::to_string(&self.node.transport().stats())?;
        info!("[{}] Status: {} transport: {}", self.node_id(), status, stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ProtocolSettings, RunMode, SimulationSettings};

    fn test_settings(port: u16, introducer: NodeId) -> Settings {
        Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port_udp: port,
            run_mode: RunMode::Node,
            gossip_interval_ms: 10,
            status_every: 5,
            protocol: ProtocolSettings {
                introducer,
                ..ProtocolSettings::default()
            },
            simulation: SimulationSettings::default(),
        }
    }

    async fn bind_introducer() -> Controller {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let settings = test_settings(transport.local_id().port(), transport.local_id());
        Controller::with_transport(settings, transport).unwrap()
    }

    #[tokio::test]
    async fn test_two_udp_nodes_see_each_other() {
        let introducer = bind_introducer().await;
        let introducer_id = introducer.node_id();
        assert_eq!(introducer.settings.protocol.introducer, introducer_id);
        let joiner = Controller::bind(test_settings(0, introducer_id))
            .await
            .unwrap();
        let joiner_id = joiner.node_id();

        let (introducer_status, joiner_status) = tokio::join!(
            introducer.run_until(time::sleep(Duration::from_millis(400))),
            joiner.run_until(time::sleep(Duration::from_millis(400))),
        );
        let introducer_status = introducer_status.unwrap();
        let joiner_status = joiner_status.unwrap();

        assert!(introducer_status
            .members
            .iter()
            .any(|entry| entry.node_id == joiner_id));
        assert!(joiner_status
            .members
            .iter()
            .any(|entry| entry.node_id == introducer_id));
        assert!(joiner_status.heartbeat > 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_unspecified_address() {
        let mut settings = test_settings(0, NodeId::INTRODUCER);
        settings.listen_address = "0.0.0.0".to_string();
        assert!(Controller::bind(settings).await.is_err());
    }
}
