//! CLI for this application
//!
use crate::node::NodeId;
use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[clap(name = settings::APP_NAME, version = settings::APP_VERSION)]
pub struct Cli {
    // Listen address; peers reach this node here, so it must be routable
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("MURMUR_LISTEN_ADDRESS"),
        help = "IPv4 address to listen on and advertise to peers"
    )]
    pub listen_address: String,

    // UDP listen port for gossip
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_UDP,
        env("MURMUR_UDP_LISTEN_PORT"),
        help = "Port to bind the gossip UDP socket to"
    )]
    pub listen_port_udp: u16,

    #[clap(
        long,
        default_value = "node",
        env("MURMUR_RUN_MODE"),
        help = "run-mode: 'node' or 'simulate'"
    )]
    pub run_mode: settings::RunMode,

    #[clap(
        long,
        default_value = "1000",
        env("MURMUR_GOSSIP_INTERVAL_MS"),
        help = "Milliseconds between gossip rounds"
    )]
    pub gossip_interval_ms: u64,

    #[clap(
        long,
        default_value = "10",
        env("MURMUR_STATUS_EVERY"),
        help = "Log the membership view every N rounds (0 disables)"
    )]
    pub status_every: u64,

    // Bootstrap endpoint; a node listening here becomes the group's first member
    #[clap(
        long,
        default_value = "127.0.0.1:8412",
        env("MURMUR_INTRODUCER"),
        help = "Introducer address (ip:port) joining nodes contact"
    )]
    pub introducer: NodeId,

    #[clap(
        long,
        default_value_t = settings::DEFAULT_REMOVE_TIMEOUT,
        env("MURMUR_REMOVE_TIMEOUT"),
        help = "Rounds of silence before a peer is removed"
    )]
    pub remove_timeout: u64,

    #[clap(
        long,
        default_value_t = settings::DEFAULT_FAIL_TIMEOUT,
        env("MURMUR_FAIL_TIMEOUT"),
        help = "Rounds of silence before a peer is suspected (must not exceed remove timeout)"
    )]
    pub fail_timeout: u64,

    // Simulation settings: only read in simulate mode
    #[clap(
        long,
        default_value = "10",
        env("MURMUR_SIM_PEERS"),
        help = "Number of simulated nodes"
    )]
    pub sim_peers: usize,

    #[clap(
        long,
        default_value = "700",
        env("MURMUR_SIM_TOTAL_TICKS"),
        help = "Length of the simulation in ticks"
    )]
    pub sim_total_ticks: u64,

    #[clap(
        long,
        default_value = "1",
        env("MURMUR_SIM_START_STAGGER"),
        help = "Ticks between consecutive node starts"
    )]
    pub sim_start_stagger: u64,

    #[clap(
        long,
        default_value = "100",
        env("MURMUR_SIM_FAIL_AT"),
        help = "Tick at which nodes are crashed"
    )]
    pub sim_fail_at: u64,

    #[clap(
        long,
        env("MURMUR_SIM_MULTI_FAILURE"),
        help = "Crash half the group instead of a single node"
    )]
    pub sim_multi_failure: bool,

    #[clap(
        long,
        default_value = "0",
        env("MURMUR_SIM_SEED"),
        help = "Seed for failure selection and delivery order"
    )]
    pub sim_seed: u64,

    #[clap(
        long,
        env("MURMUR_SIM_IN_ORDER"),
        help = "Deliver simulated messages in send order"
    )]
    pub sim_in_order: bool,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port_udp: self.listen_port_udp,
            run_mode: self.run_mode,
            gossip_interval_ms: self.gossip_interval_ms,
            status_every: self.status_every,
            protocol: settings::ProtocolSettings {
                introducer: self.introducer,
                remove_timeout: self.remove_timeout,
                fail_timeout: self.fail_timeout,
            },
            simulation: settings::SimulationSettings {
                peers: self.sim_peers,
                total_ticks: self.sim_total_ticks,
                start_stagger: self.sim_start_stagger,
                fail_at: self.sim_fail_at,
                multi_failure: self.sim_multi_failure,
                seed: self.sim_seed,
                reorder: !self.sim_in_order,
            },
        }
    }
}
