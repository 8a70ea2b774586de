use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroize;

use crate::error::Error;
use crate::secret::SecretBuf;

/// Digest used for the exchange hash and for key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Output length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Hash the concatenation of `parts` without building it first.
    ///
    /// The result lands in a [`SecretBuf`] because callers feed the shared
    /// secret through here during key derivation.
    pub fn digest(self, parts: &[&[u8]]) -> Result<SecretBuf, Error> {
        match self {
            Self::Sha256 => digest_with::<Sha256>(parts),
            Self::Sha384 => digest_with::<Sha384>(parts),
            Self::Sha512 => digest_with::<Sha512>(parts),
        }
    }
}

fn digest_with<D: Digest>(parts: &[&[u8]]) -> Result<SecretBuf, Error> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = hasher.finalize();
    let result = SecretBuf::try_copy_from(&output);
    output.as_mut_slice().zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths_match_algorithm() {
        for alg in [HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512] {
            assert_eq!(alg.digest(&[b"abc".as_slice()]).unwrap().len(), alg.digest_len());
        }
    }

    #[test]
    fn sha256_known_answer() {
        // FIPS 180-2 "abc"
        let out = HashAlg::Sha256.digest(&[b"abc".as_slice()]).unwrap();
        assert_eq!(
            hex::encode(out.as_bytes()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn parts_equal_concatenation() {
        let split = HashAlg::Sha384.digest(&[b"hello".as_slice(), b" ", b"world"]).unwrap();
        let whole = HashAlg::Sha384.digest(&[b"hello world".as_slice()]).unwrap();
        assert_eq!(split.as_bytes(), whole.as_bytes());
    }

    #[test]
    fn different_inputs_differ() {
        let a = HashAlg::Sha512.digest(&[b"hello".as_slice()]).unwrap();
        let b = HashAlg::Sha512.digest(&[b"world".as_slice()]).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
