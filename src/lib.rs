use http::StatusCode;
use thiserror::Error;

/// Error types for the capturesrv library
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Socket errors (bind, accept, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request head could not be parsed
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),

    /// Request head exceeded the configured size
    #[error("Request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    /// Request body exceeded the capture ceiling
    #[error("Payload too large: {size} bytes, maximum allowed: {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Connection closed before the full request arrived
    #[error("Connection closed before the request body was complete")]
    IncompleteBody,

    /// Request target is not valid percent-encoded UTF-8
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    /// Body is not valid base64
    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Structured echo could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Body is not a well-formed multipart/form-data submission
    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl CaptureError {
    /// Status code of the response sent for this error.
    ///
    /// `None` means the connection is dropped without any response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CaptureError::HttpParse(_) => Some(StatusCode::BAD_REQUEST),
            CaptureError::HeadTooLarge { .. } => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            CaptureError::PayloadTooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            CaptureError::MalformedUrl(_) => Some(StatusCode::BAD_REQUEST),
            CaptureError::InvalidBase64(_) => Some(StatusCode::BAD_REQUEST),
            CaptureError::InvalidMultipart(_) => Some(StatusCode::BAD_REQUEST),
            CaptureError::Serialize(_) => Some(StatusCode::INTERNAL_SERVER_ERROR),
            CaptureError::Io(_)
            | CaptureError::IncompleteBody
            | CaptureError::Config(_)
            | CaptureError::Timeout(_) => None,
        }
    }
}

/// Result type for the capturesrv library
pub type Result<T> = std::result::Result<T, CaptureError>;

pub mod capture;
pub mod client;
pub mod crypto;
pub mod encoders;
pub mod headers;
pub mod request;
pub mod response;
pub mod routing;
pub mod server;
pub mod service;

// Re-export main types for convenience
pub use capture::{CapturedRequest, HttpCodec, Inbound};
pub use client::{CaptureClient, RawResponse};
pub use crypto::{DecryptionError, decrypt, encrypt};
pub use headers::{HeaderMap, RawHeaders};
pub use request::RequestDescriptor;
pub use response::Response;
pub use routing::{Route, RouteTable};
pub use server::{CaptureServer, CaptureServerTrait, ServerConfig};
