//! Chat Service Integration
//!
//! Access to the remote chat service through a common trait interface.
//!
//! # Usage
//!
//! ```ignore
//! use streamchat_core::service::{ChatService, HttpChatService};
//!
//! let service = HttpChatService::new("http://localhost:8000/api")?;
//! let session = service.create_session().await?;
//! let stream = service.open_stream(&session, "Hello!").await?;
//! ```

mod http;
mod traits;

pub use http::HttpChatService;
pub use traits::{ChatService, ResponseStream, ServiceError};
