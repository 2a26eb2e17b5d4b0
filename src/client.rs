//! Raw HTTP/1.1 client for exercising the capture server
//!
//! Requests are written byte-for-byte as given, so tests can send duplicate
//! headers, odd casing or half-finished bodies that higher-level clients
//! would normalize away.

use crate::headers::RawHeaders;
use crate::{CaptureError, Result};
use bytes::{Buf, Bytes, BytesMut};
use httparse::Status;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Configuration for capture clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read timeout for operations
    pub read_timeout: Duration,
    /// Write timeout for operations
    pub write_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_response_size: 64 * 1024 * 1024,
        }
    }
}

/// A response as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: RawHeaders,
    pub body: Bytes,
    /// Status line, headers and body exactly as received
    pub raw: Bytes,
}

impl RawResponse {
    /// Last value of a header, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get_ignore_case(name)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Client holding one keep-alive connection
pub struct CaptureClient {
    stream: TcpStream,
    config: ClientConfig,
    buffer: BytesMut,
}

impl CaptureClient {
    /// Connect to a server with custom configuration
    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| CaptureError::Timeout("Connection timeout".to_string()))??;

        Ok(Self {
            stream,
            config,
            buffer: BytesMut::with_capacity(8 * 1024),
        })
    }

    /// Connect with default configuration
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Writes raw bytes without waiting for a response
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        timeout(self.config.write_timeout, self.stream.write_all(data))
            .await
            .map_err(|_| CaptureError::Timeout("Write timeout".to_string()))??;
        timeout(self.config.write_timeout, self.stream.flush())
            .await
            .map_err(|_| CaptureError::Timeout("Flush timeout".to_string()))??;
        Ok(())
    }

    /// Closes the write half, leaving the connection open for reading
    pub async fn shutdown_write(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Writes a raw request and reads the next response
    pub async fn send_raw(&mut self, request: &[u8]) -> Result<RawResponse> {
        self.write_raw(request).await?;
        self.read_response().await
    }

    /// Sends a request with the given headers in order, adding `Content-Length`
    /// when a body is present
    pub async fn request(
        &mut self,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<RawResponse> {
        let request = build_request(method, target, headers, body);
        if method.eq_ignore_ascii_case("HEAD") {
            self.write_raw(&request).await?;
            self.read_head_response().await
        } else {
            self.send_raw(&request).await
        }
    }

    /// Reads one response, including interim `1xx` responses
    pub async fn read_response(&mut self) -> Result<RawResponse> {
        self.read_framed(false).await
    }

    /// Reads the answer to a `HEAD` request, which carries no body whatever
    /// its `Content-Length` says
    pub async fn read_head_response(&mut self) -> Result<RawResponse> {
        self.read_framed(true).await
    }

    async fn read_framed(&mut self, head: bool) -> Result<RawResponse> {
        loop {
            if let Some(response) = self.try_parse(head)? {
                return Ok(response);
            }

            if self.buffer.len() > self.config.max_response_size {
                return Err(CaptureError::PayloadTooLarge {
                    size: self.buffer.len() as u64,
                    limit: self.config.max_response_size as u64,
                });
            }

            let n = timeout(self.config.read_timeout, self.stream.read_buf(&mut self.buffer))
                .await
                .map_err(|_| CaptureError::Timeout("Read timeout".to_string()))??;
            if n == 0 {
                return Err(CaptureError::IncompleteBody);
            }
        }
    }

    /// Reads until the server closes the connection, returning whatever arrived
    pub async fn read_to_close(&mut self) -> Result<Bytes> {
        let mut received = std::mem::take(&mut self.buffer).to_vec();
        let read = timeout(self.config.read_timeout, self.stream.read_to_end(&mut received))
            .await
            .map_err(|_| CaptureError::Timeout("Read timeout".to_string()))?;

        match read {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Bytes::from(received))
    }

    fn try_parse(&mut self, head: bool) -> Result<Option<RawResponse>> {
        let mut header_buf = [httparse::EMPTY_HEADER; 64];
        let mut response = httparse::Response::new(&mut header_buf);

        let head_len = match response.parse(&self.buffer) {
            Ok(Status::Complete(len)) => len,
            Ok(Status::Partial) => return Ok(None),
            Err(e) => return Err(CaptureError::HttpParse(e.to_string())),
        };

        let status = response.code.unwrap_or_default();
        let mut headers = RawHeaders::new();
        for header in response.headers.iter() {
            headers.push(header.name, Bytes::copy_from_slice(header.value));
        }

        let body_len = if head {
            0
        } else {
            headers
                .get_ignore_case("content-length")
                .and_then(|value| std::str::from_utf8(value).ok()?.trim().parse::<usize>().ok())
                .unwrap_or(0)
        };

        if self.buffer.len() < head_len + body_len {
            return Ok(None);
        }

        let raw = self.buffer.split_to(head_len + body_len).freeze();
        let mut body = raw.clone();
        body.advance(head_len);

        Ok(Some(RawResponse {
            status,
            headers,
            body,
            raw,
        }))
    }

    /// Get client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Serializes a request with headers in the given order
pub fn build_request(
    method: &str,
    target: &str,
    headers: &[(&str, &str)],
    body: Option<&[u8]>,
) -> Vec<u8> {
    let mut request = format!("{method} {target} HTTP/1.1\r\n").into_bytes();
    for (name, value) in headers {
        request.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    if let Some(body) = body {
        request.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    request.extend_from_slice(b"\r\n");
    if let Some(body) = body {
        request.extend_from_slice(body);
    }
    request
}

/// Builder for client configuration
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfigBuilder::new()
            .read_timeout(Duration::from_secs(60))
            .write_timeout(Duration::from_secs(5))
            .max_response_size(1024)
            .build();

        assert_eq!(config.read_timeout, Duration::from_secs(60));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_size, 1024);
    }

    #[test]
    fn test_build_request_keeps_header_order() {
        let request = build_request(
            "POST",
            "/echo",
            &[("X-B", "2"), ("X-A", "1"), ("X-B", "3")],
            Some(b"hi"),
        );

        assert_eq!(
            request,
            b"POST /echo HTTP/1.1\r\nX-B: 2\r\nX-A: 1\r\nX-B: 3\r\nContent-Length: 2\r\n\r\nhi"
        );
    }

    #[test]
    fn test_build_request_without_body() {
        let request = build_request("GET", "/", &[("Host", "x")], None);
        assert_eq!(request, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }
}
