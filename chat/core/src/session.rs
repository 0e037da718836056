//! Session Management
//!
//! Owns the conversation identity. The session is created lazily on the
//! first send and reused for every later turn of the conversation.
//!
//! # Single Flight
//!
//! [`SessionManager::ensure_session`] holds an async lock across the create
//! call, so callers racing before the id exists wait for the one request in
//! flight instead of starting their own. A failed creation stores nothing,
//! and the next call tries again.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::messages::SessionId;
use crate::service::{ChatService, ServiceError};

/// Errors from the session lifecycle
#[derive(Debug, Error)]
pub enum SessionError {
    /// The chat service could not create a session
    #[error("Failed to create chat session: {0}")]
    CreationFailed(#[source] ServiceError),
}

/// Lazily created, memoized conversation session
pub struct SessionManager<S: ChatService> {
    /// Chat service used to create the session
    service: Arc<S>,
    /// Session id once assigned
    current: Mutex<Option<SessionId>>,
}

impl<S: ChatService> SessionManager<S> {
    /// Create a manager with no session yet
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            current: Mutex::new(None),
        }
    }

    /// Return the session id, creating the session on first use
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CreationFailed`] if the service rejects the
    /// create call. No id is stored in that case.
    pub async fn ensure_session(&self) -> Result<SessionId, SessionError> {
        let mut current = self.current.lock().await;
        if let Some(id) = current.as_ref() {
            return Ok(id.clone());
        }

        let id = self
            .service
            .create_session()
            .await
            .map_err(SessionError::CreationFailed)?;

        tracing::info!(
            session_id = %id,
            service = self.service.name(),
            "Created chat session"
        );
        *current = Some(id.clone());
        Ok(id)
    }
}
