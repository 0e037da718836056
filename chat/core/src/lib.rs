//! Streamchat Core - Headless Streaming Chat Client
//!
//! This crate holds everything a chat surface needs to hold a conversation
//! with a remote assistant service whose replies arrive as an event stream.
//! It has no terminal or UI dependencies; surfaces observe it through
//! snapshots.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Presentation Surface                    │
//! │        submit(text)  ▼                 ▲  ChatSnapshot        │
//! └──────────────────────┼─────────────────┼─────────────────────┘
//!                        │                 │
//! ┌──────────────────────┼─────────────────┼─────────────────────┐
//! │                 ChatController (state + MessageLog)           │
//! │   ┌────────────────┐   ┌────────────────┐   ┌──────────────┐  │
//! │   │ SessionManager │   │ SseFrameDecoder│──▶│  interpret   │  │
//! │   └───────┬────────┘   └───────▲────────┘   └──────────────┘  │
//! └───────────┼────────────────────┼──────────────────────────────┘
//!             ▼                    │ bytes
//!      ┌──────────────────────────────────────┐
//!      │       ChatService (HttpChatService)   │
//!      └──────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatController`]: runs turns and owns the conversation state
//! - [`ChatSnapshot`]: read-only view published on every change
//! - [`MessageLog`]: ordered messages with one streaming tail
//! - [`ChatService`]: the remote service seam, implemented by [`HttpChatService`]
//! - [`ClientConfig`]: layered configuration (CLI, environment, TOML, defaults)
//!
//! # Quick Start
//!
//! ```ignore
//! use streamchat_core::{config, ChatController, HttpChatService};
//!
//! let config = config::load_config()?;
//! let service = HttpChatService::from_config(&config)?;
//! let controller = ChatController::new(service, config);
//!
//! let mut updates = controller.subscribe();
//! controller.submit("Hello").await;
//! println!("{:?}", updates.borrow_and_update().messages);
//! ```

pub mod config;
pub mod controller;
pub mod messages;
pub mod protocol;
pub mod service;
pub mod session;

pub use config::{ClientConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use controller::{
    ChatController, ChatSnapshot, ControllerState, SubmitOutcome, TurnError, TurnEvent,
};
pub use messages::{Message, MessageLog, MessageRole, SessionId, ERROR_MESSAGE, PENDING_GLYPH};
pub use protocol::{interpret, Delta, Frame, FrameError, SseFrameDecoder, MAX_FRAME_SIZE};
pub use service::{ChatService, HttpChatService, ResponseStream, ServiceError};
pub use session::{SessionError, SessionManager};
