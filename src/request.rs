//! Request normalization
//!
//! Pairs the captured request-target, headers and body into the descriptor
//! every encoder works from.

use crate::capture::CapturedRequest;
use crate::headers::{HeaderMap, RawHeaders};
use crate::{CaptureError, Result};
use bytes::Bytes;
use http::Method;
use std::borrow::Cow;

/// Canonical view of one captured request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Request-target as delivered, still percent-encoded
    pub url: String,
    /// `url` with percent-escapes decoded
    pub url_decoded: String,
    /// Last-wins header map
    pub headers: HeaderMap,
    /// Duplicate-preserving header sequence
    pub raw_headers: RawHeaders,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Builds the descriptor, failing with [`CaptureError::MalformedUrl`]
    /// when the target cannot be percent-decoded.
    pub fn from_captured(request: CapturedRequest) -> Result<Self> {
        let url_decoded = percent_decode(&request.target)?;

        Ok(Self {
            method: request.method,
            headers: request.headers.to_map(),
            raw_headers: request.headers,
            url: request.target,
            url_decoded,
            body: request.body,
        })
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }
}

/// Decodes `%XY` escapes; `+` is left untouched.
///
/// Every `%` must start a two-digit hex escape and the decoded bytes must be
/// valid UTF-8.
pub fn percent_decode(url: &str) -> Result<String> {
    for (offset, _) in url.match_indices('%') {
        let escape = url.get(offset + 1..offset + 3);
        if !escape.is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit())) {
            return Err(CaptureError::MalformedUrl(format!(
                "invalid percent-escape at offset {offset}"
            )));
        }
    }

    urlencoding::decode(url)
        .map(Cow::into_owned)
        .map_err(|e| CaptureError::MalformedUrl(e.to_string()))
}
