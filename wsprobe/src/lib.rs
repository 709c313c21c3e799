//! `wsprobe`: terminal-native WebSocket testing tool library.

pub mod app;
pub mod config;
pub mod editor;
pub mod net;
pub mod ui;
