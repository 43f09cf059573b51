use std::fmt;

use thiserror::Error;

use crate::descriptor::Descriptor;
use crate::registry::EventType;

/// Errors surfaced by the request context and the combining formatter.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The definition registry has no definition for the descriptor.
    #[error("definition not found: {0}")]
    DefinitionNotFound(Descriptor),

    /// The definition exists but could not be compiled or validated.
    #[error("invalid definition {descriptor}: {message}")]
    InvalidDefinition {
        descriptor: Descriptor,
        message: String,
    },

    /// A client event was dispatched whose definition is not an application event.
    #[error("event {descriptor} is a {found} event, only application events may be fired at the client")]
    InvalidEventType {
        descriptor: Descriptor,
        found: EventType,
    },

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// The minification transform rejected its input.
    #[error("minification failed: {0}")]
    Minify(String),

    /// The output sink refused a write.
    #[error("failed to write formatted output")]
    Output(#[from] fmt::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
