use super::{ServerConfig, connection::handle_connection};
use crate::Result;
use crate::service::CaptureService;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::{signal, sync::broadcast};
use tracing::{Instrument, error, info, warn};

/// Common interface of capture servers
#[async_trait]
pub trait CaptureServerTrait {
    /// Binds the configured address and serves until shut down
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> broadcast::Sender<()>;
}

/// HTTP request-capture server
///
/// # Examples
///
/// ```no_run
/// use capturesrv::server::{CaptureServer, CaptureServerTrait, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new("127.0.0.1:3000".parse()?).with_max_body_size(None);
///     let server = CaptureServer::new(config);
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct CaptureServer {
    config: ServerConfig,
    service: Arc<CaptureService>,
    shutdown_signal: Arc<broadcast::Sender<()>>,
}

impl CaptureServer {
    /// Creates a server with the default routing table
    pub fn new(config: ServerConfig) -> Self {
        Self::with_service(config, CaptureService::default())
    }

    /// Creates a server with a custom service
    pub fn with_service(config: ServerConfig, service: CaptureService) -> Self {
        let (shutdown_signal, _) = broadcast::channel(1);
        Self {
            config,
            service: Arc::new(service),
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            max_body_size = ?self.config.max_body_size,
            "Capture server listening"
        );

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let limit = self.config.max_connections;
                            let admitted = connection_count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                                (current < limit).then_some(current + 1)
                            });
                            let new_count = match admitted {
                                Ok(previous) => previous + 1,
                                Err(current) => {
                                    warn!(%addr, current, limit, "Connection rejected: limit reached");
                                    continue;
                                }
                            };
                            info!(%addr, current = new_count, "Accepted connection");

                            let config = self.config.clone();
                            let service = Arc::clone(&self.service);
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                let result = handle_connection(stream, addr, &config, &service)
                                    .instrument(span)
                                    .await;
                                if let Err(e) = result {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                info!(%addr, current = final_count, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("Capture server stopped");
        Ok(())
    }
}

#[async_trait]
impl CaptureServerTrait for CaptureServer {
    async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
