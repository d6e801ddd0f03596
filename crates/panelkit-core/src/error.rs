//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Command '{command}' is not valid in this direction ({expected})")]
    WrongDirection { command: String, expected: String },

    #[error("Malformed payload for '{command}': {message}")]
    Payload { command: String, message: String },

    #[error("Request '{command}' timed out after {elapsed_ms}ms")]
    Timeout { command: String, elapsed_ms: u64 },

    // ─────────────────────────────────────────────────────────────
    // Host Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Host error: {message}")]
    Host { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Change request error: {message}")]
    ChangeRequest { message: String },

    #[error("Path not found in model: {path}")]
    PathNotFound { path: String },

    #[error("Unknown view: {name}")]
    UnknownView { name: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn wrong_direction(command: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongDirection {
            command: command.into(),
            expected: expected.into(),
        }
    }

    pub fn payload(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Payload {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn timeout(command: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            command: command.into(),
            elapsed_ms,
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn change_request(message: impl Into<String>) -> Self {
        Self::ChangeRequest {
            message: message.into(),
        }
    }

    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn unknown_view(name: impl Into<String>) -> Self {
        Self::UnknownView { name: name.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors are reported inside the panel and leave it usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Protocol { .. }
                | Error::WrongDirection { .. }
                | Error::Payload { .. }
                | Error::Timeout { .. }
                | Error::Host { .. }
                | Error::Validation { .. }
                | Error::ChangeRequest { .. }
                | Error::PathNotFound { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should tear the panel down
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ChannelClosed | Error::UnknownView { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
