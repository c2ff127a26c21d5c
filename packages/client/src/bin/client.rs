//! Interactive chat test client.
//!
//! Opens a WebSocket session, then sends each typed line as an HTTP chat
//! request and prints the reply pushed back over the socket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin vgtalk
//! cargo run --bin vgtalk -- --actor alice --action talk --endpoint talk
//! cargo run --bin vgtalk -- --session-id session_1700000000_abcd1234
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use vgtalk_client::{
    ClientConfig,
    config::{DEFAULT_ACTOR, DEFAULT_AUDIO_DIR, DEFAULT_HTTP_URL, DEFAULT_WS_URL},
    protocol::{ChatAction, Endpoint},
    run_client,
};
use vgtalk_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "vgtalk")]
#[command(about = "Interactive WebSocket + HTTP chat test client", long_about = None)]
struct Args {
    /// Base URL for chat requests
    #[arg(long, env = "VGTALK_HTTP_URL", default_value = DEFAULT_HTTP_URL)]
    http_url: String,

    /// WebSocket endpoint for server pushes
    #[arg(long, env = "VGTALK_WS_URL", default_value = DEFAULT_WS_URL)]
    ws_url: String,

    /// Actor name sent with every request
    #[arg(short = 'a', long, env = "VGTALK_ACTOR", default_value = DEFAULT_ACTOR)]
    actor: String,

    /// Reply modality to ask for
    #[arg(long, value_enum, default_value_t = ChatAction::Chat)]
    action: ChatAction,

    /// HTTP endpoint to post to
    #[arg(long, value_enum, default_value_t = Endpoint::Chat)]
    endpoint: Endpoint,

    /// Resume an existing session instead of starting a new one
    #[arg(short = 's', long, env = "VGTALK_SESSION_ID")]
    session_id: Option<String>,

    /// Directory for received audio
    #[arg(long, env = "VGTALK_AUDIO_DIR", default_value = DEFAULT_AUDIO_DIR)]
    audio_dir: PathBuf,

    /// Command used to play received audio (the file path is appended)
    #[arg(long, env = "VGTALK_PLAYER")]
    player: Option<String>,

    /// Seconds to wait for a reply after each request
    #[arg(long, default_value_t = 5)]
    listen_timeout: u64,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            http_url: args.http_url,
            ws_url: args.ws_url,
            actor: args.actor,
            action: args.action,
            endpoint: args.endpoint,
            session_id: args.session_id,
            audio_dir: args.audio_dir,
            player: args.player,
            listen_timeout: Duration::from_secs(args.listen_timeout),
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    match run_client(args.into()).await {
        Ok(report) => {
            tracing::info!(
                "Session finished: {} turns, {} failed",
                report.turns,
                report.failures
            );
        }
        Err(e) => {
            tracing::error!("Client error: {}", e);
            std::process::exit(1);
        }
    }
}
