//! Capture server
//!
//! Accepts TCP connections and serves each one in its own task. Requests on
//! a connection are handled one after another; nothing is shared between
//! connections beyond the connection counter.

pub mod config;
pub mod connection;
#[allow(clippy::module_inception)]
pub mod server;
pub mod test_utils;


pub use config::ServerConfig;
pub use server::{CaptureServer, CaptureServerTrait};
pub use test_utils::{TestServer, spawn_test_server};
