use super::ServerConfig;
use crate::capture::{CaptureConfig, Continue, HttpCodec, Inbound};
use crate::service::{CaptureService, error_response};
use crate::{CaptureError, Result};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

async fn write_with_timeout(
    limit: Option<Duration>,
    write: impl Future<Output = Result<()>>,
) -> Result<()> {
    match limit {
        Some(limit) => timeout(limit, write)
            .await
            .map_err(|_| CaptureError::Timeout("Write timeout".to_string()))?,
        None => write.await,
    }
}

/// Serves requests on one connection until the client leaves, a response
/// asks for the connection to close, or the request cannot be captured.
///
/// A client that disconnects mid-request gets no response at all.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    config: &ServerConfig,
    service: &CaptureService,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, HttpCodec::new(CaptureConfig::from(config)));

    loop {
        let next = match config.read_timeout {
            Some(limit) => match timeout(limit, framed.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(%addr, "Read timeout");
                    break;
                }
            },
            None => framed.next().await,
        };

        let inbound = match next {
            None => {
                info!(%addr, "Client closed connection");
                break;
            }
            Some(Ok(inbound)) => inbound,
            Some(Err(CaptureError::IncompleteBody)) => {
                warn!(%addr, "Client disconnected before the request was complete");
                break;
            }
            Some(Err(err)) => {
                let Some(response) = error_response(&err) else {
                    return Err(err);
                };
                warn!(%addr, error = %err, status = %response.status, "Rejecting request");
                write_with_timeout(config.write_timeout, framed.send(response.with_close())).await?;
                break;
            }
        };

        match inbound {
            Inbound::ContinueRequested => {
                debug!(%addr, "Sending 100 Continue");
                write_with_timeout(config.write_timeout, framed.send(Continue)).await?;
            }
            Inbound::Request(request) => {
                info!(
                    %addr,
                    method = %request.method,
                    target = %request.target,
                    headers = request.headers.len(),
                    body_size = request.body_len(),
                    "Captured request"
                );

                let response = service.handle(request);
                let close = response.close;

                info!(%addr, status = %response.status, size = response.body.len(), "Sending response");
                write_with_timeout(config.write_timeout, framed.send(response)).await?;

                if close {
                    break;
                }
            }
        }
    }

    Ok(())
}
