//! Spark provider - signed WebSocket client
//!
//! Spark authenticates connections with a time-limited HMAC-signed URL and
//! streams its answer as incremental frames over the socket.

mod client;
mod protocol;
mod signer;

pub use client::{SparkClient, SparkConfig};
pub use signer::{SignError, signed_ws_url};
