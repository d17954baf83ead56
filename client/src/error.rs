use shared::ProtocolError;
use std::fmt;

/// Failures that escape the client session to the host.
///
/// Per-tick faults (a snapshot without the local player, a regressed
/// acknowledgement) are not represented here; they are reported as
/// [`crate::reconcile::SkipReason`] and never stop the session.
#[derive(Debug)]
pub enum ClientError {
    /// A server payload could not be decoded.
    Protocol(ProtocolError),
    /// The server reported a fatal error; the session is terminated.
    Server(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Server(reason) => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::Server(_) => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}
