//! Scripted chat service for controller tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use streamchat_core::{ChatService, ResponseStream, ServiceError, SessionId};
use tokio::sync::mpsc;

/// One scripted reply, consumed per message request
pub enum Reply {
    /// Stream these chunks, then close normally
    Chunks(Vec<Vec<u8>>),
    /// Stream these chunks, then fail the stream
    ChunksThenError(Vec<Vec<u8>>),
    /// Refuse to open the stream
    OpenError,
    /// Stream whatever the test pushes into the channel
    Channel(mpsc::UnboundedReceiver<Result<Vec<u8>, ServiceError>>),
    /// Complete reply for non-streamed requests
    Complete(String),
}

/// In-memory [`ChatService`] driven by a script
#[derive(Default)]
pub struct ScriptedService {
    creates: AtomicUsize,
    failing_creates: AtomicUsize,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(SessionId, String)>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Make the next `n` create-session calls fail
    pub fn failing_creates(self, n: usize) -> Self {
        self.failing_creates.store(n, Ordering::SeqCst);
        self
    }

    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }

    /// Number of create-session calls
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Message requests in arrival order
    pub fn requests(&self) -> Vec<(SessionId, String)> {
        self.requests.lock().clone()
    }

    fn next_reply(&self, session: &SessionId, message: &str) -> Option<Reply> {
        self.requests
            .lock()
            .push((session.clone(), message.to_string()));
        self.replies.lock().pop_front()
    }
}

fn interrupted() -> ServiceError {
    ServiceError::Interrupted("connection reset by peer".to_string())
}

#[async_trait]
impl ChatService for ScriptedService {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn create_session(&self) -> Result<SessionId, ServiceError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let failing = self.failing_creates.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_creates.store(failing - 1, Ordering::SeqCst);
            return Err(ServiceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(SessionId::new(format!("session-{n}")))
    }

    async fn open_stream(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<ResponseStream, ServiceError> {
        match self.next_reply(session, message) {
            Some(Reply::Chunks(chunks)) => {
                Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
            }
            Some(Reply::ChunksThenError(chunks)) => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(interrupted())));
                Ok(futures::stream::iter(items).boxed())
            }
            Some(Reply::Channel(rx)) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            Some(Reply::OpenError) => Err(ServiceError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
            Some(Reply::Complete(_)) | None => Err(ServiceError::InvalidResponse(
                "no streamed reply scripted".to_string(),
            )),
        }
    }

    async fn send_message(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<String, ServiceError> {
        match self.next_reply(session, message) {
            Some(Reply::Complete(text)) => Ok(text),
            _ => Err(interrupted()),
        }
    }
}

/// Encode `{"response": text}` events as one SSE body
pub fn sse_body(texts: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for text in texts {
        body.push_str("data: ");
        body.push_str(&serde_json::json!({ "response": text }).to_string());
        body.push_str("\n\n");
    }
    body.into_bytes()
}

/// Split bytes into chunks of `size`
pub fn split_every(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}
