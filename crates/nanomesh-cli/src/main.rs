//! nanomesh CLI
//!
//! Runs routing-socket meshes over in-memory pipes.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{EXAMPLE_CONFIG, MeshConfig};
use nanomesh_core::{MemoryPipe, Mesh, Message, NodeId, Router, Socket};

/// nanomesh - brokerless named routing
#[derive(Parser)]
#[command(name = "nanomesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mesh described by a configuration file
    Simulate {
        /// Mesh configuration (TOML)
        #[arg(required = true)]
        config: PathBuf,
    },

    /// Validate a configuration file without running it
    Check {
        /// Mesh configuration (TOML)
        #[arg(required = true)]
        config: PathBuf,
    },

    /// Print a sample configuration
    ExampleConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { config } => {
            let config = load_config(&config)?;
            init_logging(cli.verbose, &config.logging.level);
            simulate(&config)?;
        }
        Commands::Check { config } => {
            let config = load_config(&config)?;
            println!(
                "Configuration OK: {} nodes, {} links, {} messages",
                config.nodes.len(),
                config.links.len(),
                config.messages.len()
            );
        }
        Commands::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(if verbose { "debug" } else { level })
        .init();
}

fn load_config(path: &Path) -> anyhow::Result<MeshConfig> {
    let config = MeshConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Build the mesh, settle the handshake, then send every message in turn
fn simulate(config: &MeshConfig) -> anyhow::Result<()> {
    let mut mesh: Mesh<Router<MemoryPipe>> = Mesh::new();
    let mut ids: HashMap<&str, NodeId> = HashMap::new();

    for node in &config.nodes {
        let router = Router::with_config(&node.router)
            .with_context(|| format!("Failed to configure node {}", node.name))?;
        let id = mesh.add_node(router);
        ids.insert(node.name.as_str(), id);
    }

    for link in &config.links {
        let (a, b) = (ids[link.from.as_str()], ids[link.to.as_str()]);
        let (end_a, end_b) = MemoryPipe::pair();
        mesh.connect_with(
            a,
            b,
            end_a.with_priority(link.priority),
            end_b.with_priority(link.priority),
        )
        .with_context(|| format!("Failed to link {} -> {}", link.from, link.to))?;
    }

    println!(
        "nanomesh simulation: {} nodes, {} links",
        mesh.node_count(),
        mesh.link_count()
    );

    let rounds = mesh.settle();
    // Receiving consumes the peer announcements.
    for node in &config.nodes {
        for early in mesh.drain(ids[node.name.as_str()]) {
            tracing::warn!("Unexpected message on {}: {}", node.name, printable(&early));
        }
    }
    println!("Handshake settled in {rounds} rounds");
    println!();

    for msg in &config.messages {
        let from = ids[msg.from.as_str()];
        println!("{} -> {}", msg.from, msg.body.escape_default());

        if let Err(err) = mesh.node_mut(from).send(Message::from(msg.body.clone().into_bytes())) {
            anyhow::bail!("Send from {} rejected: {}", msg.from, err);
        }
        mesh.settle();

        let mut delivered = 0;
        for node in &config.nodes {
            for got in mesh.drain(ids[node.name.as_str()]) {
                println!("  {} <- {}", node.name, printable(&got));
                delivered += 1;
            }
        }
        if delivered == 0 {
            println!("  (no recipient)");
        }
    }

    println!();
    println!("Statistics:");
    for node in &config.nodes {
        let stats = mesh.node(ids[node.name.as_str()]).stats();
        println!(
            "  {:<12} announced={} named={} delivered={} unroutable={} released={}",
            node.name,
            stats.announcements_sent,
            stats.names_registered,
            stats.delivered,
            stats.unroutable,
            stats.released
        );
    }

    Ok(())
}

fn printable(msg: &Message) -> String {
    msg.body().escape_ascii().to_string()
}
