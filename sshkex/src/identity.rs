//! Capabilities the exchange needs from the host-key layer.
//!
//! The exchange never inspects key or signature formats; it hands opaque
//! blobs to these traits and honors their answers.

use crate::error::Error;

/// Decides whether the responder's long-term identity is acceptable.
///
/// Initiator only. Trust policy lives entirely behind this trait.
pub trait HostKeyVerifier {
    fn verify_host_key(&mut self, host_key: &[u8]) -> bool;
}

impl<F> HostKeyVerifier for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn verify_host_key(&mut self, host_key: &[u8]) -> bool {
        self(host_key)
    }
}

/// Checks a signature over the exchange hash. Initiator only.
pub trait SignatureVerifier {
    fn verify(&self, host_key: &[u8], signature: &[u8], message: &[u8]) -> bool;
}

/// The responder's long-term private identity. Responder only.
pub trait HostKeySigner {
    /// The public host key blob sent as `K_S`.
    fn public_blob(&self) -> Result<Vec<u8>, Error>;

    /// Sign `message` (the exchange hash), returning the signature blob.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error>;
}
