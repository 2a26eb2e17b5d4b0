//! Request handling
//!
//! A pure function from a captured request to a response: normalize, pick
//! the route, run its encoder, and turn failures into client errors.

use crate::capture::CapturedRequest;
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::routing::RouteTable;
use crate::{CaptureError, Result, encoders};
use http::Method;
use tracing::debug;

/// Stateless request handler shared by every connection
#[derive(Debug, Clone, Default)]
pub struct CaptureService {
    routes: RouteTable,
}

impl CaptureService {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Produces the response for one request
    pub fn handle(&self, request: CapturedRequest) -> Response {
        let keep_alive = request.keep_alive();
        let head = request.method == Method::HEAD;

        let response = self.dispatch(request).unwrap_or_else(|err| {
            debug!(error = %err, "Request rejected");
            // Errors reaching this point always carry a status
            error_response(&err).unwrap_or_else(|| Response::empty(http::StatusCode::BAD_REQUEST))
        });

        let response = if head { response.with_head_only() } else { response };
        if keep_alive {
            response
        } else {
            response.with_close()
        }
    }

    fn dispatch(&self, request: CapturedRequest) -> Result<Response> {
        let route = self.routes.resolve(&request.method, &request.target);
        let descriptor = RequestDescriptor::from_captured(request)?;
        debug!(?route, url = %descriptor.url, "Dispatching request");
        encoders::encode(route, &descriptor)
    }
}

/// Response sent for an error, or `None` when the connection should simply
/// be dropped.
///
/// Error bodies never echo the request: oversized payloads get an empty
/// body, other client errors get the status reason phrase.
pub fn error_response(err: &CaptureError) -> Option<Response> {
    let status = err.status()?;
    Some(match err {
        CaptureError::PayloadTooLarge { .. } => Response::empty(status),
        _ => Response::text(status, status.canonical_reason().unwrap_or("Error")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::RawHeaders;
    use bytes::Bytes;
    use http::StatusCode;

    fn request(method: Method, target: &str, tokens: &[&str], body: Option<&'static [u8]>) -> CapturedRequest {
        CapturedRequest {
            method,
            target: target.to_string(),
            version: 1,
            headers: RawHeaders::from_tokens(tokens),
            body: body.map(Bytes::from_static),
        }
    }

    #[test]
    fn test_handle_routes_to_encoders() {
        let service = CaptureService::default();

        let echo = service.handle(request(Method::POST, "/echo", &["A", "1"], Some(b"x")));
        assert_eq!(echo.body, Bytes::from_static(b"HEADERS:\nA: 1\nBODY:\nx"));

        let form = service.handle(request(Method::GET, "/upload", &[], None));
        assert!(String::from_utf8_lossy(&form.body).contains("file2"));

        let json = service.handle(request(Method::GET, "/nowhere", &[], None));
        assert!(json.body.starts_with(br#"{"url":"/nowhere""#));
    }

    #[test]
    fn test_malformed_url_is_client_error() {
        let service = CaptureService::default();
        let response = service.handle(request(Method::GET, "/json?q=%zz", &[], None));

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(!response.close);
    }

    #[test]
    fn test_invalid_base64_has_no_body_echo() {
        let service = CaptureService::default();
        let response = service.handle(request(Method::POST, "/base64", &[], Some(b"secret???")));

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(!String::from_utf8_lossy(&response.body).contains("secret"));
    }

    #[test]
    fn test_head_request_gets_headers_only() {
        let service = CaptureService::default();
        let get = service.handle(request(Method::GET, "/json", &[], None));
        let head = service.handle(request(Method::HEAD, "/json", &[], None));

        assert!(head.head_only);
        assert!(!get.head_only);
        assert_eq!(head.body, get.body);
    }

    #[test]
    fn test_connection_close_is_honoured() {
        let service = CaptureService::default();
        let response = service.handle(request(Method::GET, "/", &["Connection", "close"], None));
        assert!(response.close);
    }

    #[test]
    fn test_error_response_mapping() {
        let too_large = error_response(&CaptureError::PayloadTooLarge { size: 2, limit: 1 }).unwrap();
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(too_large.body.is_empty());

        assert!(error_response(&CaptureError::IncompleteBody).is_none());
        assert_eq!(
            error_response(&CaptureError::HeadTooLarge { limit: 1 }).unwrap().status,
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        );
    }
}
