//! Response encoders
//!
//! Each encoder turns a [`RequestDescriptor`] into a [`Response`] with its own
//! framing. Exactly one runs per request, chosen by the routing table.

pub mod base64_roundtrip;
pub mod multipart;
pub mod raw_dump;
pub mod structured;

#[cfg(test)]
mod tests;

use crate::Result;
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::routing::Route;

/// Runs the encoder for `route`
pub fn encode(route: Route, descriptor: &RequestDescriptor) -> Result<Response> {
    match route {
        Route::StructuredEcho => structured::encode(descriptor),
        Route::RawDump => Ok(raw_dump::encode(descriptor)),
        Route::Base64RoundTrip => base64_roundtrip::encode(descriptor),
        Route::UploadForm => Ok(multipart::form()),
        Route::UploadSubmit => multipart::encode(descriptor),
    }
}
