//! HTTP chat request sender.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    error::ClientError,
    protocol::{ChatRequest, ChatResponse, Endpoint},
};

/// HTTP seam for posting chat requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post one chat request and decode the `200 OK` body.
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;
}

/// `ChatApi` over reqwest
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    url: String,
}

impl HttpChatApi {
    /// # Arguments
    ///
    /// * `base_url` - Server base URL (e.g., "http://localhost:5287")
    /// * `endpoint` - Which `/api/...` path to post to
    /// * `timeout` - Upper bound for the whole request
    pub fn new(base_url: &str, endpoint: Endpoint, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::send_transport(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: endpoint.url(base_url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        tracing::debug!("POST {} (action: {:?})", self.url, request.action());

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::send_transport("request timed out")
                } else {
                    ClientError::send_transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::send_status(
                status.as_u16(),
                format!("{} - {}", status, body),
            ));
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            ClientError::send_status(status.as_u16(), format!("invalid response body: {}", e))
        })
    }
}

/// Sends chat requests and resolves the session id to continue with
#[derive(Clone)]
pub struct RequestSender {
    api: Arc<dyn ChatApi>,
}

impl RequestSender {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }

    /// Send `request` once.
    ///
    /// Returns the renewed session id from the response, or the request's own
    /// id when the response carries none.
    pub async fn send(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let response = self.api.post_chat(request).await?;

        let session_id = response
            .renewed_session_id()
            .unwrap_or(request.session_id())
            .to_string();
        tracing::info!("Request accepted (session: {})", session_id);

        Ok(session_id)
    }
}
