//! alabanza-server: HTTP and WebSocket surface
//!
//! Serves the song catalog as JSON and relays director alerts to every
//! connected screen.

pub mod http;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
