//! UI layer: axum routes for the WebSocket and HTTP surfaces.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{RunningServer, Server, ServerOptions};
pub use signal::shutdown_signal;
