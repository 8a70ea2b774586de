use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::Zeroizing;

use crate::error::{AgreementError, Error};
use crate::secret::SecretBuf;

/// Scalar, public value and DH output length in bytes (X25519 = 32).
pub const X25519_LEN: usize = 32;

/// Generate a new random X25519 ephemeral key.
///
/// Returns (private_scalar, public_key_bytes).
pub fn generate_keypair(
    rng: &mut impl CryptoRngCore,
) -> Result<(SecretBuf, [u8; X25519_LEN]), Error> {
    let secret = DalekStaticSecret::random_from_rng(rng);
    let public = DalekPublicKey::from(&secret);
    let scalar = Zeroizing::new(secret.to_bytes());
    Ok((SecretBuf::try_copy_from(scalar.as_slice())?, public.to_bytes()))
}

/// Perform X25519 between a local scalar and the peer's public value.
///
/// Returns the 32-byte shared secret, or
/// `AgreementError::DegenerateValue` if the result is the all-zeros point
/// (low-order or identity input), as required by RFC 7748 Section 6.1 and
/// RFC 8731 Section 3.
pub fn dh(private: &[u8], peer_public: &[u8]) -> Result<SecretBuf, Error> {
    let scalar: Zeroizing<[u8; X25519_LEN]> = Zeroizing::new(
        private
            .try_into()
            .map_err(|_| AgreementError::BadLength {
                expected: X25519_LEN,
                actual: private.len(),
            })?,
    );
    let peer: [u8; X25519_LEN] = peer_public
        .try_into()
        .map_err(|_| AgreementError::BadLength {
            expected: X25519_LEN,
            actual: peer_public.len(),
        })?;

    let local = DalekStaticSecret::from(*scalar);
    let shared = local.diffie_hellman(&DalekPublicKey::from(peer));
    validate_shared_secret(shared.as_bytes())
}

/// Reject the all-zeros shared secret, which indicates a low-order public key.
fn validate_shared_secret(bytes: &[u8; X25519_LEN]) -> Result<SecretBuf, Error> {
    let is_zero = bytes.ct_eq(&[0u8; X25519_LEN]);
    if bool::from(is_zero) {
        Err(AgreementError::DegenerateValue.into())
    } else {
        SecretBuf::try_copy_from(bytes)
    }
}
