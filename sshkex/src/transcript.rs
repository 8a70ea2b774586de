//! The exchange hash H (RFC 4253 Section 8, RFC 5656 Section 4).
//!
//! ```text
//! string  V_C      client identification string
//! string  V_S      server identification string
//! string  I_C      SSH_MSG_KEXINIT || client KEXINIT payload
//! string  I_S      SSH_MSG_KEXINIT || server KEXINIT payload
//! string  K_S      server host key blob
//! mpint   e / string Q_C   client ephemeral public value
//! mpint   f / string Q_S   server ephemeral public value
//! mpint   K        shared secret
//! ```
//!
//! Both sides build this from values they each hold, so the field order,
//! every length prefix and the synthetic KEXINIT tag must be byte-identical.

use crate::crypto::hash::HashAlg;
use crate::error::Error;
use crate::secret::SecretBuf;
use crate::state::{ExchangeHash, NegotiationContext};
use crate::wire::{self, PublicEncoding, SSH_MSG_KEXINIT};

/// The ordered fields of one exchange, always in client/server order
/// regardless of which side is hashing.
#[derive(Clone, Copy)]
pub struct ExchangeTranscript<'a> {
    pub client_version: &'a [u8],
    pub server_version: &'a [u8],
    pub client_kexinit: &'a [u8],
    pub server_kexinit: &'a [u8],
    pub host_key: &'a [u8],
    pub public_encoding: PublicEncoding,
    pub client_public: &'a [u8],
    pub server_public: &'a [u8],
    pub shared_secret: &'a [u8],
}

impl<'a> ExchangeTranscript<'a> {
    /// Start from the negotiation context; the remaining fields are filled
    /// in by the exchange.
    pub fn from_context(
        ctx: &NegotiationContext<'a>,
        host_key: &'a [u8],
        public_encoding: PublicEncoding,
        client_public: &'a [u8],
        server_public: &'a [u8],
        shared_secret: &'a [u8],
    ) -> Self {
        Self {
            client_version: ctx.client_version,
            server_version: ctx.server_version,
            client_kexinit: ctx.client_kexinit,
            server_kexinit: ctx.server_kexinit,
            host_key,
            public_encoding,
            client_public,
            server_public,
            shared_secret,
        }
    }

    fn encoded_len(&self) -> Option<usize> {
        let kexinit_len = |payload: &[u8]| 4 + 1 + payload.len();
        [
            wire::string_len(self.client_version),
            wire::string_len(self.server_version),
            kexinit_len(self.client_kexinit),
            kexinit_len(self.server_kexinit),
            wire::string_len(self.host_key),
            wire::public_len(self.public_encoding, self.client_public),
            wire::public_len(self.public_encoding, self.server_public),
            wire::mpint_len(self.shared_secret),
        ]
        .into_iter()
        .try_fold(0usize, usize::checked_add)
    }

    /// Serialize the transcript into a secret buffer (it contains K).
    ///
    /// The buffer is sized up front with a fallible reservation, so an
    /// allocation failure surfaces as `Error::OutOfMemory`.
    pub fn encode(&self) -> Result<SecretBuf, Error> {
        let len = self.encoded_len().ok_or(Error::OutOfMemory)?;
        let mut out = SecretBuf::try_with_capacity(len)?;

        wire::put_string(&mut out, self.client_version)?;
        wire::put_string(&mut out, self.server_version)?;
        put_kexinit(&mut out, self.client_kexinit)?;
        put_kexinit(&mut out, self.server_kexinit)?;
        wire::put_string(&mut out, self.host_key)?;
        wire::put_public(&mut out, self.public_encoding, self.client_public)?;
        wire::put_public(&mut out, self.public_encoding, self.server_public)?;
        wire::put_mpint(&mut out, self.shared_secret)?;

        debug_assert_eq!(out.len(), len);
        Ok(out)
    }

    /// Compute H. Output length is `hash_alg.digest_len()`.
    pub fn hash(&self, hash_alg: HashAlg) -> Result<ExchangeHash, Error> {
        let encoded = self.encode()?;
        let digest = hash_alg.digest(&[encoded.as_bytes()])?;
        Ok(ExchangeHash::new(digest.as_bytes().to_vec()))
    }
}

/// `string (SSH_MSG_KEXINIT || payload)`; the tag byte never appeared in
/// the stored payload and is synthesized here.
fn put_kexinit(out: &mut SecretBuf, payload: &[u8]) -> Result<(), Error> {
    let len = payload
        .len()
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(Error::BadMessage)?;
    wire::put_u32(out, len)?;
    wire::put_u8(out, SSH_MSG_KEXINIT)?;
    out.extend_from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExchangeTranscript<'static> {
        ExchangeTranscript {
            client_version: b"SSH-2.0-client",
            server_version: b"SSH-2.0-server",
            client_kexinit: b"client kexinit",
            server_kexinit: b"server kexinit",
            host_key: b"host key",
            public_encoding: PublicEncoding::String,
            client_public: &[0x11; 32],
            server_public: &[0x22; 32],
            shared_secret: &[0x83, 0x01],
        }
    }

    #[test]
    fn encoding_layout() {
        let t = ExchangeTranscript {
            client_version: b"C",
            server_version: b"S",
            client_kexinit: b"ic",
            server_kexinit: b"",
            host_key: b"k",
            public_encoding: PublicEncoding::Mpint,
            client_public: &[0x05],
            server_public: &[0x00, 0x90],
            shared_secret: &[0x80],
        };
        let encoded = t.encode().unwrap();
        let expected: &[u8] = &[
            0, 0, 0, 1, b'C', //
            0, 0, 0, 1, b'S', //
            0, 0, 0, 3, 20, b'i', b'c', //
            0, 0, 0, 1, 20, //
            0, 0, 0, 1, b'k', //
            0, 0, 0, 1, 0x05, //
            0, 0, 0, 2, 0x00, 0x90, //
            0, 0, 0, 2, 0x00, 0x80,
        ];
        assert_eq!(encoded.as_bytes(), expected);
    }

    #[test]
    fn hash_length_matches_digest() {
        for alg in [HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512] {
            assert_eq!(sample().hash(alg).unwrap().as_bytes().len(), alg.digest_len());
        }
    }

    #[test]
    fn deterministic() {
        let h1 = sample().hash(HashAlg::Sha256).unwrap();
        let h2 = sample().hash(HashAlg::Sha256).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn swapping_publics_changes_hash() {
        let t = sample();
        let swapped = ExchangeTranscript {
            client_public: t.server_public,
            server_public: t.client_public,
            ..t
        };
        assert_ne!(
            t.hash(HashAlg::Sha256).unwrap(),
            swapped.hash(HashAlg::Sha256).unwrap()
        );
    }

    #[test]
    fn encoding_choice_changes_hash() {
        let t = ExchangeTranscript {
            client_public: &[0x91; 32],
            ..sample()
        };
        let as_mpint = ExchangeTranscript {
            public_encoding: PublicEncoding::Mpint,
            ..t
        };
        assert_ne!(
            t.hash(HashAlg::Sha256).unwrap(),
            as_mpint.hash(HashAlg::Sha256).unwrap()
        );
    }
}
