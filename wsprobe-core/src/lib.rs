//! Core logic for `wsprobe`: message pipeline, persistence, tabs and the
//! connection session, independent of any terminal or async runtime.

pub mod connection;
pub mod history;
pub mod markers;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod tabs;
pub mod transport;
