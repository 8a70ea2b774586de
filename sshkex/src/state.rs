use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::agreement::{EphemeralKeyPair, KeyAgreement, SharedSecret};
use crate::crypto::ffdh::GroupParams;
use crate::crypto::hash::HashAlg;
use crate::error::Error;

/// `curve25519-sha256` (RFC 8731).
pub const CURVE25519_SHA256: &str = "curve25519-sha256";
/// Pre-standard alias of [`CURVE25519_SHA256`].
pub const CURVE25519_SHA256_LIBSSH: &str = "curve25519-sha256@libssh.com";
/// `diffie-hellman-group14-sha256` (RFC 8268).
pub const DH_GROUP14_SHA256: &str = "diffie-hellman-group14-sha256";

/// Which side of the exchange this party plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The client; sends KEXDH_INIT.
    Initiator,
    /// The server; holds the host key and sends KEXDH_REPLY.
    Responder,
}

impl Role {
    pub fn is_initiator(self) -> bool {
        matches!(self, Self::Initiator)
    }
}

/// A negotiated key exchange method: agreement primitive plus digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KexMethod {
    pub(crate) agreement: KeyAgreement,
    pub(crate) hash_alg: HashAlg,
}

impl KexMethod {
    /// Pair an arbitrary agreement primitive with a digest.
    pub fn new(agreement: KeyAgreement, hash_alg: HashAlg) -> Self {
        Self {
            agreement,
            hash_alg,
        }
    }

    /// Look up a method by its SSH name.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            CURVE25519_SHA256 | CURVE25519_SHA256_LIBSSH => {
                Ok(Self::new(KeyAgreement::CurveDh, HashAlg::Sha256))
            }
            DH_GROUP14_SHA256 => Ok(Self::new(
                KeyAgreement::FiniteFieldDh(GroupParams::group14()),
                HashAlg::Sha256,
            )),
            _ => Err(Error::UnknownMethod),
        }
    }

    pub fn agreement(&self) -> &KeyAgreement {
        &self.agreement
    }

    pub fn hash_alg(&self) -> HashAlg {
        self.hash_alg
    }
}

/// The exchange hash H of one exchange.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExchangeHash(Vec<u8>);

impl ExchangeHash {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ExchangeHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for ExchangeHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ExchangeHash({:02x?}..)", &self.0[..self.0.len().min(4)])
    }
}

/// The exchange hash of the first exchange on a connection.
///
/// Persists across rekeys as an input to key derivation.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SessionId({:02x?}..)", &self.0[..self.0.len().min(4)])
    }
}

/// Whether this is the first exchange on the connection or a rekey.
///
/// Carried explicitly: the first exchange's H becomes the session id,
/// while a rekey derives keys from its own H and the original session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeRound {
    First,
    Rekey(SessionId),
}

impl ExchangeRound {
    pub fn is_first(&self) -> bool {
        matches!(self, Self::First)
    }

    /// The session id key derivation must use, given this exchange's H.
    pub fn session_id_for(&self, exchange_hash: &ExchangeHash) -> SessionId {
        match self {
            Self::First => SessionId::from_bytes(exchange_hash.as_bytes()),
            Self::Rekey(id) => id.clone(),
        }
    }
}

/// Values exchanged before the KEX starts, borrowed read-only.
///
/// Version strings exclude the trailing CR LF. KEXINIT payloads exclude
/// the message-type byte; the transcript synthesizes it.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationContext<'a> {
    pub client_version: &'a [u8],
    pub server_version: &'a [u8],
    pub client_kexinit: &'a [u8],
    pub server_kexinit: &'a [u8],
}

impl<'a> NegotiationContext<'a> {
    pub fn new(
        client_version: &'a [u8],
        server_version: &'a [u8],
        client_kexinit: &'a [u8],
        server_kexinit: &'a [u8],
    ) -> Self {
        Self {
            client_version,
            server_version,
            client_kexinit,
            server_kexinit,
        }
    }
}

/// Per-exchange context owned by one side of one exchange.
///
/// Holds every secret the exchange produces. Secrets are wiped in place by
/// the state machines on every terminal transition and again on drop.
pub struct KexState {
    pub(crate) role: Role,
    pub(crate) method: KexMethod,
    pub(crate) round: ExchangeRound,
    pub(crate) local_ephemeral: Option<EphemeralKeyPair>,
    pub(crate) peer_public: Option<Vec<u8>>,
    pub(crate) shared_secret: Option<SharedSecret>,
    pub(crate) exchange_hash: Option<ExchangeHash>,
}

impl Drop for KexState {
    fn drop(&mut self) {
        self.wipe_secrets();
    }
}

impl KexState {
    pub fn new(role: Role, method: KexMethod, round: ExchangeRound) -> Self {
        Self {
            role,
            method,
            round,
            local_ephemeral: None,
            peer_public: None,
            shared_secret: None,
            exchange_hash: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn method(&self) -> &KexMethod {
        &self.method
    }

    pub fn round(&self) -> &ExchangeRound {
        &self.round
    }

    /// Erase the ephemeral private half, the shared secret, and H.
    pub(crate) fn wipe_secrets(&mut self) {
        if let Some(pair) = self.local_ephemeral.as_mut() {
            pair.wipe_private();
        }
        if let Some(shared) = self.shared_secret.as_mut() {
            shared.wipe();
        }
        self.exchange_hash = None;
    }

    /// Whether every secret buffer this state ever held is now zero.
    pub fn secrets_wiped(&self) -> bool {
        let private_wiped = self
            .local_ephemeral
            .as_ref()
            .is_none_or(EphemeralKeyPair::is_private_wiped);
        let shared_wiped = self
            .shared_secret
            .as_ref()
            .is_none_or(SharedSecret::is_wiped);
        private_wiped && shared_wiped && self.exchange_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        let curve = KexMethod::from_name(CURVE25519_SHA256).unwrap();
        assert_eq!(curve.agreement(), &KeyAgreement::CurveDh);
        assert_eq!(curve.hash_alg(), HashAlg::Sha256);
        assert_eq!(KexMethod::from_name(CURVE25519_SHA256_LIBSSH).unwrap(), curve);

        let dh = KexMethod::from_name(DH_GROUP14_SHA256).unwrap();
        assert!(matches!(dh.agreement(), KeyAgreement::FiniteFieldDh(_)));

        assert_eq!(
            KexMethod::from_name("diffie-hellman-group1-sha1"),
            Err(Error::UnknownMethod)
        );
    }

    #[test]
    fn first_round_uses_exchange_hash_as_session_id() {
        let h = ExchangeHash::new(vec![1, 2, 3]);
        assert_eq!(ExchangeRound::First.session_id_for(&h).as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn rekey_round_keeps_original_session_id() {
        let original = SessionId::from_bytes(&[9; 32]);
        let h = ExchangeHash::new(vec![1; 32]);
        let round = ExchangeRound::Rekey(original.clone());
        assert!(!round.is_first());
        assert_eq!(round.session_id_for(&h), original);
    }

    #[test]
    fn fresh_state_reports_wiped() {
        let state = KexState::new(
            Role::Initiator,
            KexMethod::new(KeyAgreement::CurveDh, HashAlg::Sha256),
            ExchangeRound::First,
        );
        assert!(state.secrets_wiped());
        assert!(state.role().is_initiator());
    }
}
