//! Remote control protocol: framing, messages, server and client.
//!
//! Transport is TCP carrying one JSON object per line. Every request names
//! its method (`StartRun`, `PollProgress`, `KeyCommand`) and gets exactly
//! one response.

pub mod client;
pub mod codec;
pub mod protocol;
pub mod server;

pub use client::RemoteClient;
