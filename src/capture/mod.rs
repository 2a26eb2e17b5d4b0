//! Body capture pipeline
//!
//! This module reads HTTP/1.1 requests off a byte stream. The body is kept as
//! opaque bytes no matter what `Content-Type` says, and a configurable
//! ceiling rejects oversized payloads before the excess is buffered.

pub mod codec;
pub mod config;


pub use codec::{CapturedRequest, Continue, HttpCodec, Inbound};
pub use config::{CaptureConfig, DEFAULT_MAX_HEAD_SIZE, ONE_GIB, parse_body_limit};
