use thiserror::Error;

/// Top-level error type for the `meshgate-proto` crate.
///
/// A small, closed set of outcome kinds. Callers branch on these variants
/// (the watch scheduler in particular decides "retry next tick" versus
/// "tear down" from them), so the set must not grow without revisiting
/// every caller's match.
#[derive(Debug, Error)]
pub enum Error {
    // ── Caller errors ───────────────────────────────────────────────
    /// Malformed or missing required parameter (unsupported verb,
    /// wrong-width credential, unparsable host).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ── Resource limits ─────────────────────────────────────────────
    /// Response body outgrew the per-exchange cap. Fatal to the call,
    /// never to the process.
    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, TLS, etc.)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Host resolution or connection establishment failed outside an
    /// exchange (probe / connect).
    #[error("cannot reach {host}: {reason}")]
    Unreachable { host: String, reason: String },

    // ── Remote status mapping ───────────────────────────────────────
    /// Remote service returned 401 or 403.
    #[error("authentication rejected (HTTP {status})")]
    AuthRejected { status: u16 },

    /// Remote service returned 404.
    #[error("resource not found")]
    NotFound,

    /// Any other non-success status.
    #[error("remote error (HTTP {status})")]
    Remote { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body failed envelope validation.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl Error {
    /// Returns `true` for any exchange-level transport fault (DNS,
    /// connect, timeout, TLS), regardless of which variant carries it.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unreachable { .. })
    }

    /// Returns `true` when the failure indicates the underlying
    /// connection itself is gone — the terminal condition for a watch.
    ///
    /// A slow or erroring remote (timeout, 5xx) is NOT terminal: the
    /// next tick simply retries.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect(),
            Self::Unreachable { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the remote rejected the device's credential.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }

    /// Returns `true` if this is a "not found" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
