use crate::request::RequestDescriptor;
use crate::response::Response;
use bytes::{BufMut, BytesMut};
use http::StatusCode;

/// Dumps every raw header occurrence in wire order, then the exact body bytes.
///
/// ```text
/// HEADERS:
/// Host: localhost
/// X-Dup: 1
/// X-Dup: 2
/// BODY:
/// <body bytes>
/// ```
pub fn encode(descriptor: &RequestDescriptor) -> Response {
    let body_len = descriptor.body.as_ref().map_or(0, |body| body.len());
    let mut out = BytesMut::with_capacity(64 + body_len);

    out.put_slice(b"HEADERS:\n");
    for pair in descriptor.raw_headers.pairs() {
        out.put_slice(pair.name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(&pair.value);
        out.put_u8(b'\n');
    }

    out.put_slice(b"BODY:\n");
    if let Some(body) = &descriptor.body {
        out.put_slice(body);
    }

    Response::text(StatusCode::OK, out.freeze())
}
