//! Streamed Response Protocol
//!
//! Client side of the chat service's event stream, in two stages:
//!
//! 1. [`SseFrameDecoder`] turns raw response bytes into complete [`Frame`]s.
//! 2. [`interpret`] turns each frame into a [`Delta`] for the controller.
//!
//! Neither stage touches the message log; the controller applies deltas in
//! the order frames were decoded.

pub mod event;
pub mod frame;

pub use event::{interpret, Delta, DATA_MARKER, DONE_SENTINEL};
pub use frame::{Frame, FrameError, SseFrameDecoder, MAX_FRAME_SIZE};
