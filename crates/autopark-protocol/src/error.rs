/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised by the gate link protocol.
///
/// Malformed inbound lines are not errors: the codec reports them as
/// [`Inbound::Unrecognized`](crate::Inbound::Unrecognized) or drops them.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Token that is not part of the command or notification set.
    #[error("Unknown token: {token:?}")]
    UnknownToken { token: String },

    /// Transport failure underneath the codec.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub fn unknown_token(token: impl Into<String>) -> Self {
        Self::UnknownToken {
            token: token.into(),
        }
    }
}
