//! cirrus-api: Wire layer for the cirrus agent backend
//!
//! This crate provides the data model shared with the backend, the
//! server-sent-event frame parser, and the HTTP client that opens the
//! chat event stream.

pub mod client;
pub mod error;
pub mod sse;
pub mod stream;
pub mod types;

pub use client::{ApiClient, HealthStatus};
pub use error::{Error, Result};
pub use sse::decode_frames;
pub use stream::{ByteStream, EventStream, StreamEvent};
pub use types::*;
