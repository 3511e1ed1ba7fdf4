use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use colored::*;
use dialoguer::{Input, Select};
use relaymesh_node::{
    DEFAULT_CAPACITY, DirectPayload, IceServerConfig, Node, NodeBehavior, NodeConfig, NodeContext,
    NodeHandle, PeerId, RelayLink, RoomId, TransportConfig, WebRtcConnector, command_channel,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relaymesh")]
#[command(about = "Join a room on a relay and chat with its members over direct connections")]
struct Cli {
    /// Relay host, prompted for when missing.
    #[arg(long)]
    host: Option<String>,

    /// Relay port, prompted for when missing.
    #[arg(long)]
    port: Option<u16>,

    /// Room code, prompted for when missing.
    #[arg(short, long)]
    room: Option<String>,

    /// Maximum simultaneous direct connections.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// STUN server used for candidate gathering.
    #[arg(long, default_value = "stun:stun.l.google.com:19302")]
    stun: String,
}

struct ChatBehavior;

#[async_trait]
impl NodeBehavior for ChatBehavior {
    async fn on_open(&self, _ctx: &NodeContext, peer_id: PeerId) {
        println!("{}", format!("[{peer_id}]: Data channel opened").green());
    }

    async fn on_message(&self, _ctx: &NodeContext, _peer_id: PeerId, message: DirectPayload) {
        println!("{} {}", format!("[{}]:", message.sender).cyan().bold(), message.payload);
    }

    async fn on_close(&self, _ctx: &NodeContext, peer_id: PeerId) {
        println!("{}", format!("[{peer_id}]: Data channel closed").yellow());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let host = match cli.host {
        Some(host) => host,
        None => Input::new().with_prompt("Host").interact_text()?,
    };
    let port: u16 = match cli.port {
        Some(port) => port,
        None => Input::new().with_prompt("Port").interact_text()?,
    };
    let room = match cli.room {
        Some(room) => room,
        None => Input::new()
            .with_prompt("Room")
            .allow_empty(true)
            .interact_text()?,
    };

    let peer_id = PeerId::generate();
    let room = RoomId::new(room);
    println!("{} {}", "Your id:".bold(), peer_id);

    let (command_tx, command_rx) = command_channel();
    let base = format!("ws://{host}:{port}");
    let relay = match RelayLink::connect(&base, &peer_id, &room, command_tx.clone()).await {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            error!("Could not join relay {}: {}", base, e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };

    let transport = TransportConfig {
        ice_servers: vec![IceServerConfig::stun(cli.stun)],
        ..Default::default()
    };
    let config = NodeConfig::new(peer_id, room)
        .with_capacity(cli.capacity)
        .with_transport(transport.clone());

    let node = Node::new(
        config,
        Box::new(ChatBehavior),
        Arc::new(WebRtcConnector::new(transport)),
        relay.clone(),
        command_rx,
    );
    let handle = node.spawn(command_tx);

    if let Err(e) = handle.announce().await {
        error!("Announcement failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
    }

    tokio::select! {
        result = prompt_loop(handle.clone()) => {
            result?;
            handle.shutdown().await?;
            info!("Left room");
            Ok(())
        }

        _ = relay.closed() => {
            error!("Lost connection to relay {}", relay.url());
            eprintln!("{} {}", "Error:".red().bold(), "Lost connection to the relay");
            handle.shutdown().await?;
            // The prompt thread blocks on stdin.
            std::process::exit(1);
        }
    }
}

/// `0: Exit`, `1: Send message`, until the user exits.
async fn prompt_loop(handle: NodeHandle) -> Result<()> {
    loop {
        let choice = tokio::task::spawn_blocking(|| {
            Select::new()
                .items(&["Exit", "Send message"])
                .default(1)
                .interact()
        })
        .await??;

        match choice {
            0 => return Ok(()),
            _ => {
                let text: String = tokio::task::spawn_blocking(|| {
                    Input::new()
                        .with_prompt("Message")
                        .allow_empty(true)
                        .interact_text()
                })
                .await??;

                let report = handle.broadcast(&text).await?;
                if report.is_empty() {
                    println!("{}", "No open connections".yellow());
                } else if !report.failed.is_empty() {
                    println!(
                        "{} {}",
                        "Not delivered to:".red(),
                        report
                            .failed
                            .iter()
                            .map(PeerId::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        }
    }
}
