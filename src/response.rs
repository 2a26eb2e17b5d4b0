//! Outgoing responses
//!
//! Every response carries `Date: [REDACTED]` in place of a real timestamp so
//! identical requests produce byte-identical responses.

use crate::Result;
use bytes::{BufMut, Bytes, BytesMut};
use http::StatusCode;
use serde::Serialize;

/// Literal written in the `Date` header of every response
pub const REDACTED_DATE: &str = "[REDACTED]";

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// A complete response, written with an explicit `Content-Length`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
    /// Close the connection once this response is written
    pub close: bool,
    /// Answer to a `HEAD` request: `Content-Length` of the full body, no body bytes
    pub head_only: bool,
}

impl Response {
    pub fn new(status: StatusCode, content_type: Option<&'static str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            close: false,
            head_only: false,
        }
    }

    /// Serializes `value` as compact JSON
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::OK, Some(CONTENT_TYPE_JSON), body))
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, Some(CONTENT_TYPE_TEXT), body)
    }

    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, Some(CONTENT_TYPE_HTML), body)
    }

    /// A response with no body at all
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, None, Bytes::new())
    }

    pub fn with_close(mut self) -> Self {
        self.close = true;
        self
    }

    pub fn with_head_only(mut self) -> Self {
        self.head_only = true;
        self
    }

    /// Writes the status line, headers and body in wire format
    pub fn write_to(&self, dst: &mut BytesMut) {
        let reason = self.status.canonical_reason().unwrap_or("");
        dst.reserve(128 + self.body.len());

        dst.put_slice(format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), reason).as_bytes());
        dst.put_slice(format!("Date: {REDACTED_DATE}\r\n").as_bytes());
        if let Some(content_type) = self.content_type {
            dst.put_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        dst.put_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        dst.put_slice(if self.close {
            b"Connection: close\r\n\r\n".as_slice()
        } else {
            b"Connection: keep-alive\r\n\r\n".as_slice()
        });
        if !self.head_only {
            dst.put_slice(&self.body);
        }
    }

    /// Wire format as a standalone buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.write_to(&mut dst);
        dst.freeze()
    }
}
