//! Streaming Session Controller
//!
//! The controller owns the single source of truth for a conversation: the
//! [`MessageLog`], the [`ControllerState`], and the session id. Presentation
//! surfaces read it through [`ChatSnapshot`]s and drive it through
//! [`ChatController::submit`]; they never hold a writable reference.
//!
//! # Turn Lifecycle
//!
//! ```text
//! Idle ──submit──▶ AwaitingSession ──session──▶ Sending ──opened──▶ Streaming
//!   │                     │                        │                   │
//!   └──submit (session)──────────────────────────▶ │                   │
//!                         └──────────failed────────┴───────┬───────────┤
//!                                                          ▼           │
//!                                          Idle ◀──────── Error     finished
//!                                           ▲                          │
//!                                           └──────────────────────────┘
//! ```
//!
//! Exactly one turn is active at a time. Submissions while a turn is running
//! are rejected, not queued. Every failure is local to the current turn and
//! returns the controller to `Idle`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::messages::{Message, MessageLog, SessionId};
use crate::protocol::{interpret, Delta, Frame, SseFrameDecoder};
use crate::service::ChatService;
use crate::session::SessionManager;

// ============================================================================
// State Machine
// ============================================================================

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Ready for the next submission
    #[default]
    Idle,
    /// Waiting for the chat service to create the session
    AwaitingSession,
    /// Request submitted, waiting for the reply to open
    Sending,
    /// Reply text is arriving
    Streaming,
    /// The current turn failed
    Error,
}

/// Something that happened during a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnEvent {
    /// Non-empty input was accepted
    Submit {
        /// Whether a session already exists
        has_session: bool,
    },
    /// The session id became available
    SessionReady,
    /// The streamed reply opened
    StreamOpened,
    /// The assistant reply was finalized
    Finished,
    /// The turn failed
    Failed,
    /// The failure was recorded and the controller may accept input again
    Recovered,
}

impl ControllerState {
    /// Whether a turn is running
    ///
    /// The `Error` state is not busy: it only lasts until the failure has been
    /// recorded in the log.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::AwaitingSession | Self::Sending | Self::Streaming)
    }

    /// Short human-readable label
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingSession => "connecting",
            Self::Sending => "sending",
            Self::Streaming => "receiving",
            Self::Error => "error",
        }
    }

    /// Next state for `event`, or `None` if the event is not valid here
    #[must_use]
    pub fn on(self, event: TurnEvent) -> Option<Self> {
        use ControllerState::{AwaitingSession, Error, Idle, Sending, Streaming};

        match (self, event) {
            (Idle, TurnEvent::Submit { has_session: false }) => Some(AwaitingSession),
            (Idle, TurnEvent::Submit { has_session: true }) => Some(Sending),
            (AwaitingSession, TurnEvent::SessionReady) => Some(Sending),
            (Sending, TurnEvent::StreamOpened) => Some(Streaming),
            (Sending | Streaming, TurnEvent::Finished) => Some(Idle),
            (AwaitingSession | Sending | Streaming, TurnEvent::Failed) => Some(Error),
            (Error, TurnEvent::Recovered) => Some(Idle),
            _ => None,
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Why a turn failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The conversation session could not be created
    #[error("could not create a chat session")]
    SessionCreation,
    /// The request failed before any reply bytes arrived
    #[error("could not open the reply stream")]
    StreamOpen,
    /// The reply stream failed after some bytes arrived
    #[error("the reply stream was interrupted")]
    StreamInterrupted,
}

// ============================================================================
// Observable State
// ============================================================================

/// Read-only view of the conversation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    /// Messages in conversation order
    pub messages: Vec<Message>,
    /// Controller state
    pub state: ControllerState,
    /// Whether a turn is running
    pub busy: bool,
    /// Session id once established
    pub session_id: Option<SessionId>,
    /// Error of the most recent turn, cleared by the next accepted submit
    pub last_error: Option<TurnError>,
}

/// Result of [`ChatController::submit`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The assistant reply was finalized
    Completed,
    /// The turn failed and the controller is idle again
    Failed(TurnError),
    /// Input was empty or whitespace-only
    RejectedEmpty,
    /// Another turn is running
    RejectedBusy,
}

impl SubmitOutcome {
    /// Whether the input was accepted as a turn
    #[must_use]
    pub fn was_accepted(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// State mutated only by the controller
#[derive(Debug, Default)]
struct Shared {
    state: ControllerState,
    log: MessageLog,
    session_id: Option<SessionId>,
    last_error: Option<TurnError>,
}

impl Shared {
    fn advance(&mut self, event: TurnEvent) {
        match self.state.on(event) {
            Some(next) => {
                tracing::trace!(from = ?self.state, to = ?next, ?event, "State transition");
                self.state = next;
            }
            None => {
                tracing::warn!(state = ?self.state, ?event, "Ignoring invalid state transition");
            }
        }
    }

    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.log.messages().to_vec(),
            state: self.state,
            busy: self.state.is_busy(),
            session_id: self.session_id.clone(),
            last_error: self.last_error,
        }
    }
}

/// Counters for one completed turn
#[derive(Debug, Default)]
struct TurnStats {
    bytes: usize,
    frames: usize,
    deltas: usize,
}

// ============================================================================
// Controller
// ============================================================================

struct Inner<S: ChatService> {
    service: Arc<S>,
    sessions: SessionManager<S>,
    config: ClientConfig,
    shared: Mutex<Shared>,
    updates: watch::Sender<ChatSnapshot>,
}

/// Drives conversation turns against a [`ChatService`]
///
/// Cloning is cheap; clones share the same conversation.
pub struct ChatController<S: ChatService> {
    inner: Arc<Inner<S>>,
}

impl<S: ChatService> Clone for ChatController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ChatService> ChatController<S> {
    /// Create a controller with an empty conversation
    pub fn new(service: S, config: ClientConfig) -> Self {
        let service = Arc::new(service);
        let (updates, _) = watch::channel(ChatSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                sessions: SessionManager::new(Arc::clone(&service)),
                service,
                config,
                shared: Mutex::new(Shared::default()),
                updates,
            }),
        }
    }

    /// Current view of the conversation
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.shared.lock().snapshot()
    }

    /// Subscribe to snapshots published on every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.inner.shared.lock().state
    }

    /// Whether a turn is running
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Session id once established
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.shared.lock().session_id.clone()
    }

    /// Submit user input and run the turn to completion
    ///
    /// Blank input and input arriving while another turn runs are rejected
    /// without touching the log, the session, or the network.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        if input.trim().is_empty() {
            tracing::debug!("Ignoring empty submission");
            return SubmitOutcome::RejectedEmpty;
        }

        {
            let mut shared = self.inner.shared.lock();
            if shared.state != ControllerState::Idle {
                tracing::debug!(state = %shared.state, "Rejecting submission while busy");
                return SubmitOutcome::RejectedBusy;
            }
            let has_session = shared.session_id.is_some();
            shared.last_error = None;
            shared.advance(TurnEvent::Submit { has_session });
            self.publish(&shared);
        }

        let started = Instant::now();
        match self.run_turn(input).await {
            Ok(stats) => {
                tracing::info!(
                    bytes = stats.bytes,
                    frames = stats.frames,
                    deltas = stats.deltas,
                    duration_ms = duration_ms(started.elapsed()),
                    "Turn completed"
                );
                SubmitOutcome::Completed
            }
            Err(error) => {
                self.fail(error);
                SubmitOutcome::Failed(error)
            }
        }
    }

    async fn run_turn(&self, input: &str) -> Result<TurnStats, TurnError> {
        let session = match self.inner.sessions.ensure_session().await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Session creation failed");
                return Err(TurnError::SessionCreation);
            }
        };

        self.update(|shared| {
            if shared.session_id.is_none() {
                shared.session_id = Some(session.clone());
            }
            if shared.state == ControllerState::AwaitingSession {
                shared.advance(TurnEvent::SessionReady);
            }
            shared.log.push_user(input);
        });

        if self.inner.config.streaming {
            self.stream_reply(&session, input).await
        } else {
            self.fetch_reply(&session, input).await
        }
    }

    /// Consume the streamed reply into the in-progress assistant message
    ///
    /// The stream is owned by this call and dropped on every return path.
    async fn stream_reply(&self, session: &SessionId, input: &str) -> Result<TurnStats, TurnError> {
        let mut stream = match self.inner.service.open_stream(session, input).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session_id = %session, error = %e, "Failed to open reply stream");
                return Err(TurnError::StreamOpen);
            }
        };

        self.update(|shared| {
            shared.advance(TurnEvent::StreamOpened);
            shared.log.begin_assistant();
        });

        let mut decoder = SseFrameDecoder::new();
        let mut stats = TurnStats::default();
        let mut ended = false;
        let idle = Duration::from_millis(self.inner.config.stream_idle_timeout_ms);

        loop {
            let chunk = match tokio::time::timeout(idle, stream.next()).await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        session_id = %session,
                        bytes = stats.bytes,
                        idle_ms = duration_ms(idle),
                        "Reply stream stalled"
                    );
                    return Err(TurnError::StreamInterrupted);
                }
            };
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let error = if stats.bytes == 0 {
                        TurnError::StreamOpen
                    } else {
                        TurnError::StreamInterrupted
                    };
                    tracing::warn!(
                        session_id = %session,
                        bytes = stats.bytes,
                        error = %e,
                        "Reply stream failed"
                    );
                    return Err(error);
                }
            };

            stats.bytes += bytes.len();
            let frames = match decoder.push(&bytes) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session,
                        bytes = stats.bytes,
                        error = %e,
                        "Reply stream framing failed"
                    );
                    return Err(TurnError::StreamInterrupted);
                }
            };
            for frame in frames {
                stats.frames += 1;
                if self.apply_frame(&frame, &mut stats) {
                    ended = true;
                    break;
                }
            }
            if ended {
                break;
            }
        }
        drop(stream);

        if ended {
            tracing::debug!(session_id = %session, "Reply ended by terminal event");
        } else if let Some(frame) = decoder.finish() {
            stats.frames += 1;
            self.apply_frame(&frame, &mut stats);
        }

        self.update(|shared| {
            shared.log.finalize_in_progress();
            shared.advance(TurnEvent::Finished);
        });
        Ok(stats)
    }

    /// Fetch a complete reply in one request
    async fn fetch_reply(&self, session: &SessionId, input: &str) -> Result<TurnStats, TurnError> {
        let reply = match self.inner.service.send_message(session, input).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(session_id = %session, error = %e, "Failed to fetch reply");
                return Err(TurnError::StreamOpen);
            }
        };

        let stats = TurnStats {
            bytes: reply.len(),
            ..TurnStats::default()
        };
        self.update(|shared| {
            shared.log.push_assistant(reply);
            shared.advance(TurnEvent::Finished);
        });
        Ok(stats)
    }

    /// Apply one frame, returning `true` if it ends the reply
    fn apply_frame(&self, frame: &Frame, stats: &mut TurnStats) -> bool {
        match interpret(frame) {
            Delta::Append(text) => {
                tracing::trace!(len = text.len(), "Appending delta");
                stats.deltas += 1;
                self.update(|shared| {
                    shared.log.append_to_in_progress(&text);
                });
                false
            }
            Delta::End => true,
            Delta::Ignore => false,
        }
    }

    /// Record a failed turn and return to `Idle`
    fn fail(&self, error: TurnError) {
        tracing::warn!(error = %error, "Turn failed");
        let message = self.inner.config.error_message.clone();

        self.update(|shared| {
            shared.advance(TurnEvent::Failed);
            shared.last_error = Some(error);
            // Session failures happen before the user message is logged
            if error != TurnError::SessionCreation {
                shared.log.discard_in_progress();
                shared.log.push_assistant(message);
            }
        });
        self.update(|shared| shared.advance(TurnEvent::Recovered));
    }

    /// Mutate shared state and publish the result
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Shared),
    {
        let mut shared = self.inner.shared.lock();
        f(&mut *shared);
        self.publish(&shared);
    }

    fn publish(&self, shared: &Shared) {
        self.inner.updates.send_replace(shared.snapshot());
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
