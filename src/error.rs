//! Error types for the EventKit MCP server.

/// Top-level error type for server startup and the stdio transport.
#[derive(Debug, thiserror::Error)]
pub enum EventKitError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON-RPC framing or serialization error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// TCC database access error.
    #[error("TCC error: {0}")]
    Tcc(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EventKitError>;
