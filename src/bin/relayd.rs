use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use vcu_relay::relay::RelayRouter;
use vcu_relay::server::listener::DEFAULT_MAX_CONNECTIONS;
use vcu_relay::server::RelayServer;
use vcu_relay::{tls, DEFAULT_CERT_PATH, DEFAULT_KEY_PATH, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PEM private key [env: VCU_RELAY_TLS_KEY]
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// PEM certificate chain [env: VCU_RELAY_TLS_CERT]
    #[arg(short, long)]
    cert: Option<PathBuf>,

    /// [env: VCU_RELAY_PORT]
    #[arg(short, long)]
    port: Option<u16>,

    /// [env: VCU_RELAY_BIND]
    #[arg(short, long)]
    bind: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,

    /// Serve plain TCP [env: VCU_RELAY_DISABLE_TLS=true]
    #[arg(long)]
    no_tls: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let key = args.key
        .or_else(|| env::var("VCU_RELAY_TLS_KEY").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_PATH));

    let cert = args.cert
        .or_else(|| env::var("VCU_RELAY_TLS_CERT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CERT_PATH));

    let port = match args.port {
        Some(port) => port,
        None => match env::var("VCU_RELAY_PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => DEFAULT_PORT,
        },
    };

    let bind = args.bind
        .or_else(|| env::var("VCU_RELAY_BIND").ok())
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let no_tls = args.no_tls || env::var("VCU_RELAY_DISABLE_TLS").unwrap_or_default() == "true";

    let router = Arc::new(RelayRouter::new());
    let mut server = RelayServer::new(router, args.max_connections);
    if no_tls {
        log::warn!("TLS disabled; commands travel in clear text.");
    } else {
        server = server.with_tls(tls::acceptor(&cert, &key)?);
    }

    let addr = format!("{}:{}", bind, port);
    println!("Starting VCU relay...");
    println!("Relay listening on {} ({})", addr, if no_tls { "TCP" } else { "TLS" });

    tokio::select! {
        res = server.listen(&addr) => {
            if let Err(e) = res {
                eprintln!("Relay server failed: {}", e);
            }
        }
        _ = signal::ctrl_c() => {
            println!("\nShutdown signal received. Exiting.");
        }
    }

    Ok(())
}
