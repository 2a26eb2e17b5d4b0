use super::{CaptureServer, CaptureServerTrait, ServerConfig};
use crate::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle to a capture server running on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<()>>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Stops the server and waits for the accept loop to finish
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .unwrap_or_else(|e| Err(crate::CaptureError::Config(format!("server task failed: {e}"))))
    }
}

/// Starts a capture server on `127.0.0.1:0` for integration tests
///
/// The listener is bound before the server task starts, so the returned
/// address accepts connections immediately.
pub async fn spawn_test_server(config: ServerConfig) -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = CaptureServer::new(ServerConfig {
        bind_addr: addr,
        ..config
    });
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok(TestServer {
        addr,
        handle,
        shutdown,
    })
}
