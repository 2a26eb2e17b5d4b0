use crate::Result;
use crate::request::RequestDescriptor;
use crate::response::Response;
use base64::{Engine, engine::general_purpose::STANDARD};
use http::StatusCode;

const TEMPLATE_HEAD: &[u8] = b"Received in base64:\n-----\n";
const TEMPLATE_TAIL: &[u8] = b"\n-----";

/// Wraps decoded plaintext in the fixed acknowledgement template
pub fn wrap(plaintext: &[u8]) -> Vec<u8> {
    [TEMPLATE_HEAD, plaintext, TEMPLATE_TAIL].concat()
}

/// Decodes a base64 body, wraps it and re-encodes the result.
///
/// ASCII whitespace anywhere in the input is ignored, so line-wrapped
/// base64 (as produced by the `base64` tool) is accepted.
pub fn roundtrip(body: &[u8]) -> Result<String> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let plaintext = STANDARD.decode(compact)?;
    Ok(STANDARD.encode(wrap(&plaintext)))
}

pub fn encode(descriptor: &RequestDescriptor) -> Result<Response> {
    let body = descriptor.body.as_deref().unwrap_or_default();
    Ok(Response::text(StatusCode::OK, roundtrip(body)?))
}
