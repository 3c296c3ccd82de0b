// Library root: re-exports the server modules so integration tests can build
// the router and WebSocket hub directly.

pub mod config;
pub mod http;
pub mod pages;
pub mod ws_server;
