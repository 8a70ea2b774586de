/// Errors produced by a key-agreement primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementError {
    /// The shared value is the all-zero string (low-order or identity input).
    DegenerateValue,
    /// The peer's public value is outside the group's valid range.
    InvalidPublicValue,
    /// The peer's public value has the wrong width for this primitive.
    BadLength { expected: usize, actual: usize },
}

impl core::fmt::Display for AgreementError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DegenerateValue => write!(f, "degenerate shared secret"),
            Self::InvalidPublicValue => write!(f, "peer public value out of range"),
            Self::BadLength { expected, actual } => {
                write!(f, "public value is {actual} bytes, expected {expected}")
            }
        }
    }
}

impl core::error::Error for AgreementError {}

/// Coarse classification of an [`Error`].
///
/// The transport layer treats every kind as fatal to the connection; the
/// kind only distinguishes an attack or malformed peer from a local
/// configuration mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or truncated wire data.
    Format,
    /// Degenerate shared secret, bad signature, rejected host key.
    Crypto,
    /// Allocation failure while building the transcript or key material.
    Resource,
    /// Negotiation or programming mismatch (key length, wrong state).
    Policy,
}

/// Errors that can occur during a key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A KEX message is malformed, truncated, or has trailing bytes.
    BadMessage,
    /// The key-agreement primitive rejected its input or output.
    Agreement(AgreementError),
    /// The host-key verifier did not accept the responder's identity.
    HostKeyRejected,
    /// The signature over the exchange hash did not verify.
    SignatureInvalid,
    /// The host-key signer failed to produce a signature.
    SigningFailed,
    /// More key material was requested than one digest can supply.
    KeyLengthExceeded { requested: usize, max: usize },
    /// Allocation failed while building the transcript or key material.
    OutOfMemory,
    /// An operation was attempted in the wrong exchange state.
    WrongState,
    /// The KEX method name is not supported.
    UnknownMethod,
    /// Finite-field group parameters are unusable.
    BadGroup,
}

impl Error {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadMessage | Self::Agreement(AgreementError::BadLength { .. }) => {
                ErrorKind::Format
            }
            Self::Agreement(_)
            | Self::HostKeyRejected
            | Self::SignatureInvalid
            | Self::SigningFailed => ErrorKind::Crypto,
            Self::OutOfMemory => ErrorKind::Resource,
            Self::KeyLengthExceeded { .. }
            | Self::WrongState
            | Self::UnknownMethod
            | Self::BadGroup => ErrorKind::Policy,
        }
    }

    /// Stable numeric code reported alongside an abstract "exchange failed".
    pub fn diagnostic_code(&self) -> u16 {
        match self {
            Self::BadMessage => 100,
            Self::Agreement(AgreementError::BadLength { .. }) => 101,
            Self::Agreement(AgreementError::DegenerateValue) => 200,
            Self::Agreement(AgreementError::InvalidPublicValue) => 201,
            Self::HostKeyRejected => 202,
            Self::SignatureInvalid => 203,
            Self::SigningFailed => 204,
            Self::OutOfMemory => 300,
            Self::KeyLengthExceeded { .. } => 400,
            Self::WrongState => 401,
            Self::UnknownMethod => 402,
            Self::BadGroup => 403,
        }
    }
}

impl From<AgreementError> for Error {
    fn from(err: AgreementError) -> Self {
        Self::Agreement(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadMessage => write!(f, "malformed key exchange message"),
            Self::Agreement(e) => write!(f, "key agreement failed: {e}"),
            Self::HostKeyRejected => write!(f, "host key rejected"),
            Self::SignatureInvalid => write!(f, "exchange hash signature invalid"),
            Self::SigningFailed => write!(f, "failed to sign exchange hash"),
            Self::KeyLengthExceeded { requested, max } => {
                write!(f, "requested {requested} bytes of key material, digest supplies {max}")
            }
            Self::OutOfMemory => write!(f, "allocation failed"),
            Self::WrongState => write!(f, "operation not valid in current state"),
            Self::UnknownMethod => write!(f, "unsupported key exchange method"),
            Self::BadGroup => write!(f, "invalid group parameters"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Agreement(e) => Some(e),
            _ => None,
        }
    }
}
