#![deny(unsafe_code)]

//! # sshkex
//!
//! A pure, sans-IO implementation of the SSH transport key exchange
//! (RFC 4253 Sections 7–8, RFC 8731, RFC 8268): the two-message
//! Diffie-Hellman exchange, the exchange hash H, and session key
//! derivation.
//!
//! ## Methods
//!
//! - `curve25519-sha256` / `curve25519-sha256@libssh.com`
//! - `diffie-hellman-group14-sha256`
//! - any [`GroupParams`] / [`HashAlg`] pairing via [`KexMethod::new`]
//!
//! ## Security Properties
//!
//! - X25519 all-zero shared secret rejection (constant-time)
//! - Finite-field public values range-checked before use
//! - Ephemeral private keys wiped as soon as K is computed
//! - K, H and all derived key material zeroized on every exit path
//! - Signature over H verified before any key is derived
//! - No panics on network input
//!
//! ## Example
//!
//! ```rust,no_run
//! use sshkex::{
//!     ExchangeRound, InitiatorExchange, KexMethod, NegotiationContext, ResponderExchange,
//!     TrafficKeyDeriver,
//! };
//! # use sshkex::{HostKeySigner, SignatureVerifier, Error};
//! # struct Signer; impl HostKeySigner for Signer {
//! #     fn public_blob(&self) -> Result<Vec<u8>, Error> { Ok(Vec::new()) }
//! #     fn sign(&self, _: &[u8]) -> Result<Vec<u8>, Error> { Ok(Vec::new()) } }
//! # struct Verifier; impl SignatureVerifier for Verifier {
//! #     fn verify(&self, _: &[u8], _: &[u8], _: &[u8]) -> bool { true } }
//! # let (signer, verifier) = (Signer, Verifier);
//!
//! let method = KexMethod::from_name("curve25519-sha256").unwrap();
//! let ctx = NegotiationContext::new(b"SSH-2.0-c", b"SSH-2.0-s", b"kexinit c", b"kexinit s");
//!
//! let mut client = InitiatorExchange::new(method.clone(), ExchangeRound::First);
//! let mut server = ResponderExchange::new(method, ExchangeRound::First).unwrap();
//!
//! let init = client.start().unwrap();
//! let reply = server
//!     .on_init(&ctx, &init, &signer, &mut TrafficKeyDeriver::default())
//!     .unwrap();
//! let output = client
//!     .on_reply(
//!         &ctx,
//!         &reply.message,
//!         &mut |_: &[u8]| true,
//!         &verifier,
//!         &mut TrafficKeyDeriver::default(),
//!     )
//!     .unwrap();
//! assert_eq!(output.exchange_hash, reply.output.exchange_hash);
//! ```

pub mod agreement;
pub mod crypto;
pub mod derive;
pub mod error;
pub mod identity;
pub mod secret;
pub mod state;
pub mod transcript;
pub mod wire;

mod exchange;

// Re-export the primary public API
pub use agreement::{EphemeralKeyPair, KeyAgreement, SharedSecret};
pub use crypto::ffdh::GroupParams;
pub use crypto::hash::HashAlg;
pub use derive::{DirectionalKeys, KeyDeriver, KeyLengths, KeyMaterial, TrafficKeyDeriver, TrafficKeys};
pub use error::{AgreementError, Error, ErrorKind};
pub use exchange::{
    ExchangeOutput, InitiatorExchange, InitiatorState, ResponderExchange, ResponderReply,
    ResponderState,
};
pub use identity::{HostKeySigner, HostKeyVerifier, SignatureVerifier};
pub use secret::SecretBuf;
pub use state::{ExchangeHash, ExchangeRound, KexMethod, KexState, NegotiationContext, Role, SessionId};
pub use transcript::ExchangeTranscript;
