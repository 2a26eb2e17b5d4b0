use crate::Result;
use crate::headers::HeaderMap;
use crate::request::RequestDescriptor;
use crate::response::Response;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StructuredEcho<'a, B: Serialize> {
    url: &'a str,
    url_decoded: &'a str,
    headers: &'a HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<B>,
}

/// Structured echo of the request, body rendered as text.
///
/// The `body` key is omitted when the request declared no body.
pub fn encode(descriptor: &RequestDescriptor) -> Result<Response> {
    encode_with_body(descriptor, descriptor.body_text())
}

/// Structured echo with a caller-provided `body` value
pub fn encode_with_body<B: Serialize>(
    descriptor: &RequestDescriptor,
    body: Option<B>,
) -> Result<Response> {
    Response::json(&StructuredEcho {
        url: &descriptor.url,
        url_decoded: &descriptor.url_decoded,
        headers: &descriptor.headers,
        body,
    })
}
