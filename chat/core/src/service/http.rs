//! HTTP Chat Service
//!
//! [`ChatService`] implementation for the chat REST API.
//!
//! # Endpoints
//!
//! - `POST {base}/chats/` - create a session, answers `{"id": ...}`
//! - `POST {base}/chats/{id}/stream_message/` - streamed reply (`text/event-stream`)
//! - `POST {base}/chats/{id}/send_message/` - complete reply, answers `{"response": "..."}`
//!
//! Message endpoints take `{"message": "..."}` as the JSON body.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use super::traits::{ChatService, ResponseStream, ServiceError};
use crate::config::ClientConfig;
use crate::messages::SessionId;

/// Chat service client over HTTP
#[derive(Clone, Debug)]
pub struct HttpChatService {
    /// API base URL without trailing slash
    base_url: String,
    /// Timeout for requests that return a complete body
    request_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpChatService {
    /// Create a client for the API at `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let mut config = ClientConfig::default();
        config.base_url = base_url.into();
        Self::from_config(&config)
    }

    /// Create from [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get session creation endpoint URL
    fn sessions_url(&self) -> String {
        format!("{}/chats/", self.base_url)
    }

    /// Get streamed message endpoint URL
    fn stream_url(&self, session: &SessionId) -> String {
        format!("{}/chats/{}/stream_message/", self.base_url, session)
    }

    /// Get complete message endpoint URL
    fn send_url(&self, session: &SessionId) -> String {
        format!("{}/chats/{}/send_message/", self.base_url, session)
    }
}

/// Turn a non-success response into [`ServiceError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status { status, body })
}

/// Read the session id from a create-session response body
fn parse_session_id(data: &Value) -> Result<SessionId, ServiceError> {
    match data.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(SessionId::new(id.clone())),
        Some(Value::Number(id)) => Ok(SessionId::new(id.to_string())),
        Some(other) => Err(ServiceError::InvalidResponse(format!(
            "unsupported session id: {other}"
        ))),
        None => Err(ServiceError::InvalidResponse(
            "session response has no id".to_string(),
        )),
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn create_session(&self) -> Result<SessionId, ServiceError> {
        let response = self
            .http_client
            .post(self.sessions_url())
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let data: Value = response.json().await?;
        parse_session_id(&data)
    }

    async fn open_stream(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<ResponseStream, ServiceError> {
        // No overall timeout; the controller bounds the wait for each chunk
        let response = self
            .http_client
            .post(self.stream_url(session))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        let response = check_status(response).await?;

        tracing::debug!(
            session_id = %session,
            status = response.status().as_u16(),
            "Opened response stream"
        );

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ServiceError::Interrupted(e.to_string()))
        });
        Ok(stream.boxed())
    }

    async fn send_message(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<String, ServiceError> {
        let response = self
            .http_client
            .post(self.send_url(session))
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let data: Value = response.json().await?;
        data.get("response")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ServiceError::InvalidResponse("reply has no response text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let service = HttpChatService::new("http://localhost:8000/api/").unwrap();
        let session = SessionId::new("7");

        assert_eq!(service.base_url(), "http://localhost:8000/api");
        assert_eq!(service.sessions_url(), "http://localhost:8000/api/chats/");
        assert_eq!(
            service.stream_url(&session),
            "http://localhost:8000/api/chats/7/stream_message/"
        );
        assert_eq!(
            service.send_url(&session),
            "http://localhost:8000/api/chats/7/send_message/"
        );
    }

    #[test]
    fn test_new_uses_default_timeouts() {
        let service = HttpChatService::new("https://chat.example.com/api").unwrap();
        let defaults = ClientConfig::default();

        assert_eq!(service.base_url(), "https://chat.example.com/api");
        assert_eq!(
            service.request_timeout,
            Duration::from_millis(defaults.request_timeout_ms)
        );
    }

    #[test]
    fn test_parse_session_id_accepts_numbers_and_strings() {
        let numeric = serde_json::json!({ "id": 42, "messages": [] });
        assert_eq!(parse_session_id(&numeric).unwrap(), SessionId::new("42"));

        let text = serde_json::json!({ "id": "c0ffee" });
        assert_eq!(parse_session_id(&text).unwrap(), SessionId::new("c0ffee"));
    }

    #[test]
    fn test_parse_session_id_rejects_missing_or_odd_ids() {
        assert!(matches!(
            parse_session_id(&serde_json::json!({})),
            Err(ServiceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_session_id(&serde_json::json!({ "id": "" })),
            Err(ServiceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_session_id(&serde_json::json!({ "id": [1] })),
            Err(ServiceError::InvalidResponse(_))
        ));
    }
}
