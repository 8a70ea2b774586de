//! Session key derivation (RFC 4253 Section 7.2).
//!
//! ```text
//! key = HASH(mpint K || H || purpose || session_id)
//! ```
//!
//! One hash application per stream. Requests longer than the digest are
//! rejected rather than extended.

use crate::crypto::hash::HashAlg;
use crate::error::Error;
use crate::secret::SecretBuf;
use crate::state::{ExchangeHash, Role, SessionId};
use crate::wire;

/// Purpose tag: initial IV, client to server.
pub const IV_CLIENT_TO_SERVER: u8 = b'A';
/// Purpose tag: initial IV, server to client.
pub const IV_SERVER_TO_CLIENT: u8 = b'B';
/// Purpose tag: encryption key, client to server.
pub const ENCRYPTION_CLIENT_TO_SERVER: u8 = b'C';
/// Purpose tag: encryption key, server to client.
pub const ENCRYPTION_SERVER_TO_CLIENT: u8 = b'D';
/// Purpose tag: integrity key, client to server.
pub const INTEGRITY_CLIENT_TO_SERVER: u8 = b'E';
/// Purpose tag: integrity key, server to client.
pub const INTEGRITY_SERVER_TO_CLIENT: u8 = b'F';

/// Everything key derivation needs from a finished exchange, borrowed.
///
/// The shared secret is the raw, not yet wiped value; the exchange wipes
/// it as soon as the deriver returns.
pub struct KeyMaterial<'a> {
    hash_alg: HashAlg,
    shared_secret: &'a [u8],
    exchange_hash: &'a [u8],
    session_id: &'a [u8],
}

impl<'a> KeyMaterial<'a> {
    pub fn new(
        hash_alg: HashAlg,
        shared_secret: &'a [u8],
        exchange_hash: &'a [u8],
        session_id: &'a [u8],
    ) -> Self {
        Self {
            hash_alg,
            shared_secret,
            exchange_hash,
            session_id,
        }
    }

    pub(crate) fn from_exchange(
        hash_alg: HashAlg,
        shared_secret: &'a [u8],
        exchange_hash: &'a ExchangeHash,
        session_id: &'a SessionId,
    ) -> Self {
        Self::new(
            hash_alg,
            shared_secret,
            exchange_hash.as_bytes(),
            session_id.as_bytes(),
        )
    }

    pub fn hash_alg(&self) -> HashAlg {
        self.hash_alg
    }

    /// The shared secret K as an unsigned big-endian integer.
    pub fn shared_secret(&self) -> &[u8] {
        self.shared_secret
    }

    pub fn exchange_hash(&self) -> &[u8] {
        self.exchange_hash
    }

    pub fn session_id(&self) -> &[u8] {
        self.session_id
    }

    /// Derive `len` bytes for the stream tagged `purpose`.
    ///
    /// Fails with `Error::KeyLengthExceeded` if `len` is larger than the
    /// digest output.
    pub fn derive(&self, purpose: u8, len: usize) -> Result<SecretBuf, Error> {
        let max = self.hash_alg.digest_len();
        if len > max {
            return Err(Error::KeyLengthExceeded {
                requested: len,
                max,
            });
        }

        let mut encoded_k = SecretBuf::try_with_capacity(wire::mpint_len(self.shared_secret))?;
        wire::put_mpint(&mut encoded_k, self.shared_secret)?;

        let mut key = self.hash_alg.digest(&[
            encoded_k.as_bytes(),
            self.exchange_hash,
            core::slice::from_ref(&purpose),
            self.session_id,
        ])?;
        key.truncate(len);
        Ok(key)
    }
}

/// Turns the output of a successful exchange into traffic keys.
///
/// Called exactly once per successful exchange.
pub trait KeyDeriver {
    type Keys;

    fn derive_keys(&mut self, material: &KeyMaterial<'_>) -> Result<Self::Keys, Error>;
}

/// Byte lengths of the three streams per direction, fixed by the
/// negotiated cipher and MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLengths {
    pub iv: usize,
    pub encryption: usize,
    pub integrity: usize,
}

impl Default for KeyLengths {
    /// `aes256-ctr` with `hmac-sha2-256`.
    fn default() -> Self {
        Self {
            iv: 16,
            encryption: 32,
            integrity: 32,
        }
    }
}

/// Keys for one direction of traffic.
#[derive(Debug)]
pub struct DirectionalKeys {
    pub iv: SecretBuf,
    pub encryption: SecretBuf,
    pub integrity: SecretBuf,
}

/// All six streams of RFC 4253 Section 7.2.
#[derive(Debug)]
pub struct TrafficKeys {
    pub client_to_server: DirectionalKeys,
    pub server_to_client: DirectionalKeys,
}

impl TrafficKeys {
    /// Assign the directions to (send, recv) for the given side:
    /// - Initiator: client_to_server = send, server_to_client = recv
    /// - Responder: client_to_server = recv, server_to_client = send
    pub fn split(self, role: Role) -> (DirectionalKeys, DirectionalKeys) {
        if role.is_initiator() {
            (self.client_to_server, self.server_to_client)
        } else {
            (self.server_to_client, self.client_to_server)
        }
    }
}

/// The standard [`KeyDeriver`] producing [`TrafficKeys`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficKeyDeriver {
    lengths: KeyLengths,
}

impl TrafficKeyDeriver {
    pub fn new(lengths: KeyLengths) -> Self {
        Self { lengths }
    }
}

impl KeyDeriver for TrafficKeyDeriver {
    type Keys = TrafficKeys;

    fn derive_keys(&mut self, material: &KeyMaterial<'_>) -> Result<TrafficKeys, Error> {
        let lengths = self.lengths;
        Ok(TrafficKeys {
            client_to_server: DirectionalKeys {
                iv: material.derive(IV_CLIENT_TO_SERVER, lengths.iv)?,
                encryption: material.derive(ENCRYPTION_CLIENT_TO_SERVER, lengths.encryption)?,
                integrity: material.derive(INTEGRITY_CLIENT_TO_SERVER, lengths.integrity)?,
            },
            server_to_client: DirectionalKeys {
                iv: material.derive(IV_SERVER_TO_CLIENT, lengths.iv)?,
                encryption: material.derive(ENCRYPTION_SERVER_TO_CLIENT, lengths.encryption)?,
                integrity: material.derive(INTEGRITY_SERVER_TO_CLIENT, lengths.integrity)?,
            },
        })
    }
}
