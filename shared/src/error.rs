//! Crate-wide error type.
//!
//! This workspace has never depended on `thiserror`/`anyhow`; errors are a
//! plain enum implementing `std::error::Error` and `Display` by hand, the
//! same way the predecessor server/client reported failures as
//! `Box<dyn std::error::Error>`.

use std::fmt;

/// The error kinds named by the protocol's error handling design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Malformed or out-of-state message (wrong field count, unknown type).
    Protocol(String),
    /// Invalid name/descriptor/coordinate supplied by a peer.
    Validation(String),
    /// Would-block or interrupted syscall; caller should retry.
    TransientIo(String),
    /// Socket closed or a fatal OS error; the owning session is dropped.
    PermanentIo(String),
    /// Invalid configuration; fatal at startup.
    Config(String),
    /// Game/state-machine misuse that should never happen in correct code.
    InvalidState(String),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            GameError::Validation(msg) => write!(f, "validation error: {msg}"),
            GameError::TransientIo(msg) => write!(f, "transient io error: {msg}"),
            GameError::PermanentIo(msg) => write!(f, "permanent io error: {msg}"),
            GameError::Config(msg) => write!(f, "configuration error: {msg}"),
            GameError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<std::io::Error> for GameError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::Interrupted => {
                GameError::TransientIo(err.to_string())
            }
            _ => GameError::PermanentIo(err.to_string()),
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_human_readable_text() {
        let err = GameError::Validation("invalid board descriptor".to_string());
        assert_eq!(err.to_string(), "validation error: invalid board descriptor");
    }

    #[test]
    fn io_error_would_block_is_transient() {
        let io_err = std::io::Error::from(std::io::ErrorKind::WouldBlock);
        assert!(matches!(GameError::from(io_err), GameError::TransientIo(_)));
    }

    #[test]
    fn io_error_other_is_permanent() {
        let io_err = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(matches!(GameError::from(io_err), GameError::PermanentIo(_)));
    }
}
