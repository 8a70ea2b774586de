//! `ssh-ed25519` host keys (RFC 8709).
//!
//! ```text
//! public key blob:  string "ssh-ed25519" || string key (32 bytes)
//! signature blob:   string "ssh-ed25519" || string sig (64 bytes)
//! ```

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use sshkex::wire::{self, Reader};
use sshkex::{Error, HostKeySigner, HostKeyVerifier, SignatureVerifier};
use subtle::ConstantTimeEq;

/// Algorithm name carried in both blobs.
pub const SSH_ED25519: &[u8] = b"ssh-ed25519";

/// Public key length.
pub const ED25519_PUBLIC_LEN: usize = 32;

/// Signature length.
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// A server's Ed25519 host key.
pub struct Ed25519HostKey {
    signing: SigningKey,
}

impl Ed25519HostKey {
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        Self {
            signing: SigningKey::generate(rng),
        }
    }

    /// Load from the 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> [u8; ED25519_PUBLIC_LEN] {
        self.signing.verifying_key().to_bytes()
    }
}

impl core::fmt::Debug for Ed25519HostKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ed25519HostKey")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl HostKeySigner for Ed25519HostKey {
    fn public_blob(&self) -> Result<Vec<u8>, Error> {
        public_blob(&self.public_key())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let signature = self
            .signing
            .try_sign(message)
            .map_err(|_| Error::SigningFailed)?;
        let mut blob = Vec::new();
        wire::put_string(&mut blob, SSH_ED25519)?;
        wire::put_string(&mut blob, &signature.to_bytes())?;
        Ok(blob)
    }
}

/// Encode a raw Ed25519 public key as an SSH public key blob.
pub fn public_blob(public_key: &[u8; ED25519_PUBLIC_LEN]) -> Result<Vec<u8>, Error> {
    let mut blob = Vec::with_capacity(
        wire::string_len(SSH_ED25519) + wire::string_len(public_key),
    );
    wire::put_string(&mut blob, SSH_ED25519)?;
    wire::put_string(&mut blob, public_key)?;
    Ok(blob)
}

/// Read `string "ssh-ed25519" || string body` where body must be `N` bytes.
fn parse_blob<const N: usize>(blob: &[u8]) -> Option<[u8; N]> {
    let mut reader = Reader::new(blob);
    if reader.get_string().ok()? != SSH_ED25519 {
        return None;
    }
    let body = reader.get_string().ok()?;
    reader.finish().ok()?;
    body.try_into().ok()
}

/// Verifies `ssh-ed25519` signatures over the exchange hash.
///
/// Uses strict verification: small-order keys and non-canonical `R` are
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519SignatureVerifier;

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(&self, host_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
        let Some(key_bytes) = parse_blob::<ED25519_PUBLIC_LEN>(host_key) else {
            return false;
        };
        let Some(sig_bytes) = parse_blob::<ED25519_SIGNATURE_LEN>(signature) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        key.verify_strict(message, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

/// Accepts exactly one host key blob.
#[derive(Debug, Clone)]
pub struct PinnedHostKey {
    blob: Vec<u8>,
}

impl PinnedHostKey {
    /// Pin a full public key blob as sent in KEXDH_REPLY.
    pub fn from_blob(blob: &[u8]) -> Self {
        Self {
            blob: blob.to_vec(),
        }
    }

    pub fn ed25519(public_key: &[u8; ED25519_PUBLIC_LEN]) -> Result<Self, Error> {
        Ok(Self {
            blob: public_blob(public_key)?,
        })
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn matches(&self, host_key: &[u8]) -> bool {
        self.blob.as_slice().ct_eq(host_key).into()
    }
}

impl HostKeyVerifier for PinnedHostKey {
    fn verify_host_key(&mut self, host_key: &[u8]) -> bool {
        let accepted = self.matches(host_key);
        if !accepted {
            tracing::warn!(len = host_key.len(), "host key does not match pinned key");
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn public_blob_layout() {
        let key = Ed25519HostKey::from_seed(&[7; 32]);
        let blob = key.public_blob().unwrap();

        assert_eq!(blob.len(), 4 + 11 + 4 + 32);
        assert_eq!(&blob[..4], &[0, 0, 0, 11]);
        assert_eq!(&blob[4..15], SSH_ED25519);
        assert_eq!(&blob[15..19], &[0, 0, 0, 32]);
        assert_eq!(&blob[19..], &key.public_key());
    }

    #[test]
    fn sign_and_verify() {
        let key = Ed25519HostKey::generate(&mut OsRng);
        let message = [0x42u8; 32];
        let signature = key.sign(&message).unwrap();

        assert_eq!(signature.len(), 4 + 11 + 4 + 64);
        let blob = key.public_blob().unwrap();
        assert!(Ed25519SignatureVerifier.verify(&blob, &signature, &message));
    }

    #[test]
    fn verify_rejects_other_message() {
        let key = Ed25519HostKey::generate(&mut OsRng);
        let signature = key.sign(b"exchange hash one").unwrap();
        assert!(!Ed25519SignatureVerifier.verify(
            &key.public_blob().unwrap(),
            &signature,
            b"exchange hash two"
        ));
    }

    #[test]
    fn verify_rejects_other_key() {
        let key = Ed25519HostKey::generate(&mut OsRng);
        let other = Ed25519HostKey::generate(&mut OsRng);
        let signature = key.sign(b"h").unwrap();
        let blob = other.public_blob().unwrap();
        assert!(!Ed25519SignatureVerifier.verify(&blob, &signature, b"h"));
    }

    #[test]
    fn verify_rejects_malformed_blobs() {
        let key = Ed25519HostKey::generate(&mut OsRng);
        let signature = key.sign(b"h").unwrap();
        let blob = key.public_blob().unwrap();

        // Raw key without the blob wrapper.
        assert!(!Ed25519SignatureVerifier.verify(&key.public_key(), &signature, b"h"));
        // Truncated signature blob.
        assert!(!Ed25519SignatureVerifier.verify(&blob, &signature[..signature.len() - 1], b"h"));
        // Trailing garbage.
        let mut long = signature.clone();
        long.push(0);
        assert!(!Ed25519SignatureVerifier.verify(&blob, &long, b"h"));
        // Wrong algorithm name.
        let mut renamed = blob.clone();
        renamed[4] = b'x';
        assert!(!Ed25519SignatureVerifier.verify(&renamed, &signature, b"h"));
    }

    #[test]
    fn pinned_key_matches_only_itself() {
        let key = Ed25519HostKey::from_seed(&[1; 32]);
        let other = Ed25519HostKey::from_seed(&[2; 32]);
        let mut pinned = PinnedHostKey::ed25519(&key.public_key()).unwrap();

        assert_eq!(pinned.blob(), key.public_blob().unwrap().as_slice());
        assert!(pinned.verify_host_key(&key.public_blob().unwrap()));
        assert!(!pinned.verify_host_key(&other.public_blob().unwrap()));
        assert!(!pinned.verify_host_key(&key.public_blob().unwrap()[..20]));
        assert!(!pinned.verify_host_key(b""));

        let mut from_blob = PinnedHostKey::from_blob(&key.public_blob().unwrap());
        assert_eq!(from_blob.blob(), pinned.blob());
        assert!(from_blob.verify_host_key(&key.public_blob().unwrap()));
        assert!(!from_blob.verify_host_key(&other.public_blob().unwrap()));
    }
}
