use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use missiond::bus::MqttBus;
use missiond::cluster::generate_node_id;
use missiond::config::{BusConfig, NodeConfig};
use missiond::node::Node;
use missiond::shutdown::install_shutdown_handler;
use missiond::store::EtcdStore;

#[derive(Parser, Debug)]
#[command(name = "missiond")]
#[command(version)]
#[command(about = "A self-electing cluster node that schedules recurring missions")]
struct Args {
    /// Project name; root prefix for all coordination keys
    #[arg(long, default_value = "missiond")]
    project: String,

    /// Heartbeat / scheduling tick period in seconds
    #[arg(long, default_value = "5")]
    heartbeat_secs: u64,

    /// Coordination store endpoints (comma-separated host:port)
    #[arg(long, default_value = "127.0.0.1:2379")]
    store_endpoints: String,

    /// Message bus broker host
    #[arg(long, default_value = "127.0.0.1")]
    bus_host: String,

    /// Message bus broker port
    #[arg(long, default_value = "1883")]
    bus_port: u16,

    /// Topic trigger events are published to
    #[arg(long, default_value = "missiond/trigger")]
    bus_topic: String,

    /// Admin API port (omit to disable the admin API)
    #[arg(long)]
    http_port: Option<u16>,
}

fn parse_endpoints(endpoints: &str) -> Vec<String> {
    endpoints
        .split(',')
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let http_addr: Option<SocketAddr> = match args.http_port {
        Some(port) => Some(format!("0.0.0.0:{}", port).parse()?),
        None => None,
    };
    let config = NodeConfig {
        project: args.project,
        heartbeat_period_secs: args.heartbeat_secs,
        store_endpoints: parse_endpoints(&args.store_endpoints),
        bus: BusConfig {
            host: args.bus_host,
            port: args.bus_port,
            topic: args.bus_topic,
        },
        http_addr,
    };

    let node_id = generate_node_id();
    tracing::info!(
        node_id,
        project = %config.project,
        heartbeat_secs = config.heartbeat_period_secs,
        store_endpoints = ?config.store_endpoints,
        http_addr = ?config.http_addr,
        "starting missiond node"
    );

    let shutdown = install_shutdown_handler();

    // A store connection failure here is fatal: no useful coordination is
    // possible without it.
    let store = Arc::new(EtcdStore::connect(&config.store_endpoints).await?);
    let bus = Arc::new(MqttBus::connect(
        &config.bus,
        &format!("missiond-{}", node_id),
        shutdown.clone(),
    ));

    let node = Node::new(config, node_id, store, bus);
    node.run(shutdown).await?;

    Ok(())
}
