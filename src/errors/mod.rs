/// Structured error types for logcast
///
/// Each subsystem owns one enum. Parse errors are recovered locally by the
/// feed, transport errors are recovered by the hub (the subscriber is
/// deregistered), feed errors are fatal to the process.
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// RECORD PARSING
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Line has {found} fields before ': ', expected at least 6")]
    TooFewFields { found: usize },

    #[error("Invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },
}

// =============================================================================
// SUBSCRIBER TRANSPORT
// =============================================================================

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Subscriber is closed")]
    Closed,

    #[error("Send timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),
}

// =============================================================================
// HUB
// =============================================================================

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Hub is stopped and no longer accepts payloads")]
    Stopped,

    #[error("Hub fan-out loop is already running")]
    AlreadyRunning,

    #[error("Hub already initialized")]
    AlreadyInitialized,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// PRODUCER FEED
// =============================================================================

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to spawn producer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Producer stdout is not available")]
    NoStdout,

    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Producer stream ended")]
    Ended,
}
