//! Error types for theaterlink.

use thiserror::Error;

/// Main error type for theaterlink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote API call failed.
    #[error("API error: {0}")]
    Api(String),

    /// Event socket error.
    #[error("socket error: {0}")]
    Socket(String),

    /// Server discovery error.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Local player invocation failed.
    #[error("player error: {0}")]
    Player(String),

    /// Invalid configuration supplied at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation attempted on a disposed component.
    #[error("component disposed")]
    Disposed,
}
