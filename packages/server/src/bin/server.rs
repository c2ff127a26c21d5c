//! Mock chat backend.
//!
//! Issues session ids over WebSocket and answers `POST /api/chat` and
//! `POST /api/talk` by pushing a reply on the session's socket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin vgtalk-mock-server
//! cargo run --bin vgtalk-mock-server -- --port 5287 --reply "hello"
//! cargo run --bin vgtalk-mock-server -- --silent
//! ```

use std::time::Duration;

use clap::Parser;

use vgtalk_mock_server::{ReplyMode, Server, ServerOptions};
use vgtalk_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "vgtalk-mock-server")]
#[command(about = "Mock chat backend with WebSocket session handshake", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "VGTALK_MOCK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "VGTALK_MOCK_PORT", default_value = "5287")]
    port: u16,

    /// Always answer with this text instead of echoing
    #[arg(long, conflicts_with = "silent")]
    reply: Option<String>,

    /// Accept requests but never push a reply
    #[arg(long)]
    silent: bool,

    /// Milliseconds to wait before pushing each reply
    #[arg(long, default_value_t = 0)]
    reply_delay_ms: u64,
}

impl Args {
    fn options(&self) -> ServerOptions {
        let reply_mode = match (&self.reply, self.silent) {
            (_, true) => ReplyMode::Silent,
            (Some(text), false) => ReplyMode::Fixed(text.clone()),
            (None, false) => ReplyMode::Echo,
        };
        ServerOptions {
            reply_mode,
            reply_delay: Duration::from_millis(self.reply_delay_ms),
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let server = Server::new(args.options());
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
