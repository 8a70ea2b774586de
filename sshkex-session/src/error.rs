use core::fmt;

use sshkex::ErrorKind;

use crate::dispatch::HandlerPending;
use crate::framing::InvalidPacket;

/// Errors surfaced to the transport driving a [`KexSession`](crate::KexSession).
///
/// Exchange failures are reported abstractly: the caller learns the class
/// and diagnostic code, never which secret-dependent check tripped beyond
/// that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The key exchange itself failed.
    ExchangeFailed { kind: ErrorKind, code: u16 },
    /// A packet could not be framed.
    InvalidPacket,
    /// A message arrived that no pending handler was waiting for.
    UnexpectedMessage(u8),
    /// A handler was already registered for this session.
    HandlerPending,
    /// Operation not valid in the current session state.
    WrongState,
    /// The configuration is incomplete for the requested role.
    Config(&'static str),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ExchangeFailed { kind, code } => {
                write!(f, "key exchange failed ({kind:?}, code {code})")
            }
            SessionError::InvalidPacket => write!(f, "invalid packet framing"),
            SessionError::UnexpectedMessage(t) => write!(f, "unexpected message type {t}"),
            SessionError::HandlerPending => write!(f, "a message handler is already pending"),
            SessionError::WrongState => write!(f, "operation not valid in current state"),
            SessionError::Config(what) => write!(f, "invalid configuration: {what}"),
        }
    }
}

impl core::error::Error for SessionError {}

impl From<sshkex::Error> for SessionError {
    fn from(err: sshkex::Error) -> Self {
        SessionError::ExchangeFailed {
            kind: err.kind(),
            code: err.diagnostic_code(),
        }
    }
}

impl From<InvalidPacket> for SessionError {
    fn from(_: InvalidPacket) -> Self {
        SessionError::InvalidPacket
    }
}

impl From<HandlerPending> for SessionError {
    fn from(_: HandlerPending) -> Self {
        SessionError::HandlerPending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_errors_keep_only_class_and_code() {
        let err = SessionError::from(sshkex::Error::SignatureInvalid);
        assert_eq!(
            err,
            SessionError::ExchangeFailed {
                kind: ErrorKind::Crypto,
                code: 203,
            }
        );
        assert_eq!(err.to_string(), "key exchange failed (Crypto, code 203)");
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            SessionError::UnexpectedMessage(94).to_string(),
            "unexpected message type 94"
        );
        assert_eq!(
            SessionError::Config("missing host key").to_string(),
            "invalid configuration: missing host key"
        );
    }
}
