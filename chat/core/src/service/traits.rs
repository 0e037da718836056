//! Chat Service Traits
//!
//! Trait definitions for the remote chat service. The controller only talks
//! to the service through [`ChatService`], so tests and alternative
//! transports can stand in for the HTTP implementation.
//!
//! # Design Philosophy
//!
//! The service exposes transport, not policy:
//! - creating a conversation session
//! - opening a streamed reply as a raw byte stream
//! - fetching a complete reply in one request
//!
//! Decoding the stream and deciding what a failure means for the current
//! turn belong to the controller.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::messages::SessionId;

/// Raw response body chunks, in arrival order
///
/// Dropping the stream releases the underlying connection.
pub type ResponseStream = BoxStream<'static, Result<Vec<u8>, ServiceError>>;

/// Errors reported by a chat service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The HTTP request could not be completed
    #[error("Request to chat service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Chat service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// The service answered with a body the client does not understand
    #[error("Invalid response from chat service: {0}")]
    InvalidResponse(String),

    /// The response stream broke after it was opened
    #[error("Response stream interrupted: {0}")]
    Interrupted(String),
}

/// Remote chat service
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Get the service name (for logging)
    fn name(&self) -> &str;

    /// Create a new conversation session and return its id
    async fn create_session(&self) -> Result<SessionId, ServiceError>;

    /// Submit a message and open the streamed reply
    ///
    /// Succeeds once the service has accepted the request; the reply body is
    /// then read from the returned stream.
    async fn open_stream(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<ResponseStream, ServiceError>;

    /// Submit a message and wait for the complete reply
    async fn send_message(&self, session: &SessionId, message: &str)
        -> Result<String, ServiceError>;
}

#[async_trait]
impl<T: ChatService + ?Sized> ChatService for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn create_session(&self) -> Result<SessionId, ServiceError> {
        (**self).create_session().await
    }

    async fn open_stream(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<ResponseStream, ServiceError> {
        (**self).open_stream(session, message).await
    }

    async fn send_message(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<String, ServiceError> {
        (**self).send_message(session, message).await
    }
}
