//! Error handling for layoutstream-rs
//!
//! This module defines the crate-wide error type and a Result alias.
//! A frame the channel could not accept is not an error; it is reported
//! through [`crate::channel::SendResult`].

use crate::codec::CodecError;
use crate::session::SessionState;
use thiserror::Error;

/// Main error type for layoutstream-rs operations
#[derive(Error, Debug)]
pub enum StreamError {
    /// A position batch or static table does not match the session schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Frame encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// An operation was attempted outside the state that permits it
    #[error("Invalid state: cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to transport setup
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StreamError>,
    },
}

impl StreamError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StreamError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a schema mismatch with a formatted message
    pub fn schema(message: impl Into<String>) -> Self {
        StreamError::SchemaMismatch(message.into())
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root(&self) -> &StreamError {
        match self {
            StreamError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is a schema mismatch (possibly wrapped in context)
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self.root(), StreamError::SchemaMismatch(_))
    }

    /// Whether this error is an invalid-state error (possibly wrapped in context)
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.root(), StreamError::InvalidState { .. })
    }
}

/// Result type alias for layoutstream-rs operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, CodecError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| StreamError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StreamError::from(e).with_context(f()))
    }
}
