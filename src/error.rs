use thiserror::Error;

/// Raised while building the middleware. A layer is never constructed from an invalid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("secret must be 16, 24 or 32 bytes long, got {0}")]
    InvalidSecretLength(usize),

    #[error("cookie name {0:?} is not a valid cookie token")]
    InvalidCookieName(String),

    #[error("max chunk size must be at least 1 byte")]
    ZeroChunkSize,

    #[error("max chunks must be at least 1")]
    ZeroMaxChunks,

    #[error("invalid exclusion pattern {pattern:?}: {reason}")]
    InvalidExclusionPattern { pattern: String, reason: String },
}

/// Reasons a session could not be read from, or written to, the cookie jar.
///
/// The middleware recovers from every variant locally: a request carrying an
/// absent or invalid session is simply unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no session cookie present")]
    NoSessionCookie,

    #[error("session cookie chunk {index} is missing")]
    MissingChunk { index: usize },

    #[error("both single and indexed session cookies are present")]
    ConflictingChunks,

    #[error("malformed session payload: {0}")]
    MalformedPayload(String),

    #[error("session payload failed authentication")]
    TamperedOrCorrupt,

    #[error("session has expired")]
    Expired,

    #[error("failed to encode session: {0}")]
    Encode(String),

    #[error("session needs {chunks} cookies, at most {max} are allowed")]
    TooLarge { chunks: usize, max: usize },
}

impl SessionError {
    /// `true` when the client simply did not send a session, as opposed to sending a broken one.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NoSessionCookie)
    }
}
