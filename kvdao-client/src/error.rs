//! Errors surfaced by the wire client.

use thiserror::Error;

/// Result type for the wire client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the wire client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Pool is at capacity and no idle connections are available.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Address could not be resolved into a socket address.
    #[error("invalid address")]
    InvalidAddress,
    /// The server rejected the configured password.
    #[error("authentication failed: {}", String::from_utf8_lossy(.message))]
    Auth { message: Vec<u8> },
    /// The connection was closed or reported a pending socket error.
    #[error("connection unhealthy: {0}")]
    Unhealthy(String),
}
