//! The key-agreement capability shared by both sides of the exchange.
//!
//! The exchange state machines only call [`KeyAgreement::generate`] and
//! [`KeyAgreement::compute_shared`]; they never branch on which primitive
//! is active.

use rand_core::CryptoRngCore;

use crate::crypto::ffdh::GroupParams;
use crate::crypto::x25519;
use crate::error::Error;
use crate::secret::SecretBuf;
use crate::wire::PublicEncoding;

/// The Diffie-Hellman primitive selected by negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAgreement {
    /// Finite-field DH over a MODP group.
    FiniteFieldDh(GroupParams),
    /// X25519.
    CurveDh,
}

impl KeyAgreement {
    /// Produce a fresh ephemeral key pair.
    pub fn generate(&self, rng: &mut impl CryptoRngCore) -> Result<EphemeralKeyPair, Error> {
        let (private, public) = match self {
            Self::FiniteFieldDh(group) => group.generate_keypair(rng)?,
            Self::CurveDh => {
                let (private, public) = x25519::generate_keypair(rng)?;
                (private, public.to_vec())
            }
        };
        Ok(EphemeralKeyPair { private, public })
    }

    /// Combine the local private half with the peer's public value.
    ///
    /// Fails with `Error::Agreement` when the peer value is malformed or
    /// out of range, or when the result is degenerate.
    pub fn compute_shared(
        &self,
        private: &SecretBuf,
        peer_public: &[u8],
    ) -> Result<SharedSecret, Error> {
        let shared = match self {
            Self::FiniteFieldDh(group) => group.compute_shared(private.as_bytes(), peer_public)?,
            Self::CurveDh => x25519::dh(private.as_bytes(), peer_public)?,
        };
        Ok(SharedSecret(shared))
    }

    /// How this primitive's public values appear on the wire.
    pub fn public_encoding(&self) -> PublicEncoding {
        match self {
            Self::FiniteFieldDh(_) => PublicEncoding::Mpint,
            Self::CurveDh => PublicEncoding::String,
        }
    }
}

/// An ephemeral key pair, generated once per exchange and never reused.
pub struct EphemeralKeyPair {
    private: SecretBuf,
    public: Vec<u8>,
}

impl EphemeralKeyPair {
    pub fn public(&self) -> &[u8] {
        &self.public
    }

    pub(crate) fn private(&self) -> &SecretBuf {
        &self.private
    }

    /// Erase the private half, keeping the public value.
    pub fn wipe_private(&mut self) {
        self.private.wipe();
    }

    pub fn is_private_wiped(&self) -> bool {
        self.private.is_wiped()
    }
}

impl core::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let head = &self.public[..self.public.len().min(4)];
        write!(f, "EphemeralKeyPair(public: {head:02x?}.., private: [REDACTED])")
    }
}

/// The raw shared secret K, as an unsigned big-endian integer.
///
/// Zeroized on drop.
pub struct SharedSecret(SecretBuf);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn wipe(&mut self) {
        self.0.wipe();
    }

    pub fn is_wiped(&self) -> bool {
        self.0.is_wiped()
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}
