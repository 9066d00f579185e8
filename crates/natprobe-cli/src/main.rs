//! natprobe CLI
//!
//! Classifies the NAT between this host and the Internet using STUN.

mod config;
mod progress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use natprobe::{DiscoveryResult, NatClassifier, NatType};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{Config, validate_host_port};
use progress::ProbeProgress;

/// natprobe - discover what kind of NAT you are behind
#[derive(Parser)]
#[command(name = "natprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run NAT classification against a STUN server
    Classify {
        /// STUN server as host:port (overrides config)
        #[arg(short, long)]
        server: Option<String>,

        /// Local address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output path (defaults to the per-user config directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Classification result as printed by `classify --json`
#[derive(Serialize)]
struct Report<'a> {
    server: &'a str,
    nat_type: NatType,
    description: &'static str,
    public_ip: Option<Ipv4Addr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { server, bind, json } => {
            let config = load_config(cli.config.as_ref())?;
            init_logging(cli.verbose, &config);

            // Validate configuration
            config.validate()?;

            run_classify(server, bind, json, &config).await?;
        }
        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

/// Load the explicit config file, or the per-user default
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load_or_default(),
    }
}

/// `RUST_LOG` wins over `--verbose`, which wins over the config file
fn init_logging(verbose: bool, config: &Config) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

/// Classify the local NAT and print the result
async fn run_classify(
    server: Option<String>,
    bind: Option<String>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let server = server.unwrap_or_else(|| config.stun.server.clone());
    let bind = bind.unwrap_or_else(|| config.stun.bind_addr.clone());
    validate_host_port(&server, "STUN server")?;

    let classifier = NatClassifier::with_config(config.probe.to_probe_config());
    tracing::debug!(?server, ?bind, config = ?classifier.config(), "starting classification");

    let progress = if json {
        ProbeProgress::hidden()
    } else {
        ProbeProgress::start(&server)
    };
    let outcome = natprobe::query_with(&classifier, &server, &bind).await;
    progress.finish();

    let result = outcome.with_context(|| format!("NAT classification via {server} failed"))?;

    if json {
        print_json(&server, &result)?;
    } else {
        print_text(&server, &result);
    }

    Ok(())
}

fn print_text(server: &str, result: &DiscoveryResult) {
    let nat_type = result.nat_type();
    println!("STUN server: {server}");
    println!("NAT type:    {nat_type}");
    println!("             {}", nat_type.description());
    match result.public_ip() {
        Some(ip) => println!("Public IP:   {ip}"),
        None => println!("Public IP:   unknown"),
    }
}

fn print_json(server: &str, result: &DiscoveryResult) -> anyhow::Result<()> {
    let report = Report {
        server,
        nat_type: result.nat_type(),
        description: result.nat_type().description(),
        public_ip: result.public_ip(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write the default configuration
fn init_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(Config::default_path);
    if path.exists() {
        anyhow::bail!("{} already exists, refusing to overwrite", path.display());
    }

    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
