//! cirrus-session: Client-side state for agent conversations
//!
//! This crate turns the backend's event stream into three consistent views
//! (transcript, agent registry, architecture/deployment snapshot) and drives
//! one request/response cycle at a time.

pub mod error;
pub mod events;
pub mod handle;
pub mod reducer;
pub mod registry;
pub mod session;
pub mod transcript;
pub mod transport;

pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use reducer::{SessionView, StreamReducer, Update};
pub use registry::AgentRegistry;
pub use session::{Session, SessionOutcome};
pub use transcript::Transcript;
pub use transport::{HttpTransport, Transport};
