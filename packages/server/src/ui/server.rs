//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::trace::TraceLayer;
use vgtalk_shared::time::{Clock, SystemClock};

use crate::{
    domain::MessagePusher,
    infrastructure::message_pusher::WebSocketMessagePusher,
    reply::ReplyMode,
    usecase::{ConnectSessionUseCase, DisconnectSessionUseCase, SendChatUseCase},
};

use super::{
    handler::{health_check, post_chat, post_talk, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Reply behaviour of the mock backend
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub reply_mode: ReplyMode,
    /// Pause between answering HTTP and pushing the reply
    pub reply_delay: Duration,
}

/// Mock chat backend
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerOptions::default());
/// server.run("127.0.0.1".to_string(), 5287).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(options: ServerOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: ServerOptions, clock: Arc<dyn Clock>) -> Self {
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        let state = Arc::new(AppState {
            connect_session_usecase: ConnectSessionUseCase::new(message_pusher.clone(), clock),
            disconnect_session_usecase: DisconnectSessionUseCase::new(message_pusher.clone()),
            send_chat_usecase: SendChatUseCase::new(
                message_pusher.clone(),
                options.reply_mode,
                options.reply_delay,
            ),
            message_pusher,
        });

        Self { state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/chat", post(post_chat))
            .route("/api/talk", post(post_talk))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Bind `addr` and serve in a background task.
    ///
    /// Use port 0 to get an ephemeral port; the bound address is reported
    /// by [`RunningServer::addr`].
    pub async fn start(self, addr: &str) -> std::io::Result<RunningServer> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(self.serve(listener, async move {
            let _ = shutdown_rx.await;
        }));
        tracing::info!("Mock chat server listening on {}", addr);

        Ok(RunningServer {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Run the mock server until Ctrl+C
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Mock chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Handle to a server started with [`Server::start`]
pub struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Stop accepting connections and wait for the server task.
    ///
    /// Open WebSocket connections are dropped along with the task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
        match (&mut self.handle).await {
            Ok(Err(e)) => tracing::warn!("Server stopped with error: {}", e),
            Ok(Ok(())) => tracing::info!("Server shutdown complete"),
            Err(_) => tracing::debug!("Server task cancelled"),
        }
    }
}
