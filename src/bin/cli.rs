use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::{json, Value};
use vcu_relay::sdk::{self, ClientConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Relay address, host:port [env: VCU_RELAY_ADDR]
    #[arg(short, long)]
    addr: Option<String>,

    /// CA or self-signed certificate to trust [env: VCU_RELAY_CA_CERT]
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Server name to verify [env: VCU_RELAY_DOMAIN]
    #[arg(long)]
    domain: Option<String>,

    #[arg(long)]
    no_tls: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Submit one command envelope
    Send {
        #[arg(long)]
        source: String,
        #[arg(long)]
        dest: String,
        /// JSON payload; anything that is not JSON is sent as a string
        #[arg(long)]
        data: Option<String>,
    },
    /// Print deliveries as JSON lines, optionally only for the given tags
    Listen { tags: Vec<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    if let Some(ca) = cli.ca {
        config.ca_cert = ca;
    }
    if let Some(domain) = cli.domain {
        config.domain = domain;
    }
    if cli.no_tls {
        config.tls = false;
    }

    let client = sdk::connect(&config).await?;

    match cli.command {
        Commands::Send { source, dest, data } => {
            let data = match data {
                Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                None => json!({}),
            };
            client.send(&source, &dest, data).await?;
            println!("OK");
        }
        Commands::Listen { tags } => {
            let events = client.into_events();
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let frame = match event {
                    Ok(frame) => frame,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                if !tags.is_empty() && !tags.iter().any(|t| frame.is_tagged(t)) {
                    continue;
                }
                println!("{}", serde_json::to_string(&frame)?);
            }
        }
    }

    Ok(())
}
