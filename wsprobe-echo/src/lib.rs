//! `wsprobe-echo` library.
//!
//! Exposes the echo server for use in tests and embedding. Every text frame
//! a client sends is sent straight back, optionally wrapped in a JSON
//! envelope.

pub mod config;
pub mod server;
