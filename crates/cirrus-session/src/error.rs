//! Error types for cirrus-session

use thiserror::Error;

/// Result type alias using cirrus-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Api(#[from] cirrus_api::Error),

    /// A submission arrived while a previous one is still streaming
    #[error("A request is already being processed")]
    AlreadyProcessing,

    /// The agent registry was built with a repeated id
    #[error("Duplicate agent id: {0}")]
    DuplicateAgent(String),
}
