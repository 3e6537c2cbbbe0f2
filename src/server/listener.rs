use std::sync::Arc;

use log::{error, info};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;

use super::handle_connection;
use crate::{CommandRelay, Result};

pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

pub struct RelayServer {
    relay: Arc<dyn CommandRelay>,
    semaphore: Arc<Semaphore>,
    tls: Option<TlsAcceptor>,
}

impl RelayServer {
    /// A plain-TCP server. Call [`RelayServer::with_tls`] to terminate TLS.
    pub fn new(relay: Arc<dyn CommandRelay>, max_connections: usize) -> Self {
        Self {
            relay,
            semaphore: Arc::new(Semaphore::new(max_connections)),
            tls: None,
        }
    }

    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "VCU relay listening on {} ({})",
            listener.local_addr()?,
            if self.tls.is_some() { "TLS" } else { "plain TCP" }
        );
        self.serve(listener).await
    }

    /// Accept loop over an already bound listener. Only returns on an accept error.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (socket, peer) = listener.accept().await?;
            let relay = self.relay.clone();
            let sem = self.semaphore.clone();
            let tls = self.tls.clone();

            tokio::spawn(async move {
                let _permit = match sem.try_acquire() {
                    Ok(p) => p,
                    Err(_) => {
                        error!("Relay busy: too many concurrent connections. Rejecting {}", peer);
                        let mut socket = socket;
                        let _ = socket.shutdown().await;
                        return;
                    }
                };

                let result = match tls {
                    Some(acceptor) => match acceptor.accept(socket).await {
                        Ok(stream) => handle_connection(stream, relay).await,
                        Err(e) => {
                            error!("TLS handshake with {} failed: {}", peer, e);
                            return;
                        }
                    },
                    None => handle_connection(socket, relay).await,
                };

                if let Err(e) = result {
                    error!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}
