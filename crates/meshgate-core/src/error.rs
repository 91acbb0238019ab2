// Core error type. Consumers of the session facade see transport
// outcomes wrapped here rather than raw `meshgate-proto` internals.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A capability call failed at the transport layer.
    #[error("cloud transport error: {0}")]
    Transport(#[from] meshgate_proto::Error),

    /// The session was shut down; its endpoint set is gone and no
    /// further capability calls are accepted.
    #[error("session already shut down")]
    SessionClosed,
}

impl CoreError {
    /// Returns `true` if the remote rejected the device's credential.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_auth_rejected())
    }

    /// Returns `true` if the device record does not exist in the registry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_not_found())
    }
}
