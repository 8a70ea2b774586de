//! The two halves of the key exchange.
//!
//! ```text
//! initiator                              responder
//!   Start
//!     -- KEXDH_INIT (e / Q_C) -------------> AwaitInit
//!   AwaitResponse                              compute K, H, sign H
//!     <-- KEXDH_REPLY (K_S, f / Q_S, sig) -- Replied
//!   verify K_S, compute K, H, verify sig
//!   Done
//! ```
//!
//! Both machines share the steps below on [`KexState`] so that the
//! transcript is built by one piece of code for both roles.

mod initiator;
mod responder;

pub use initiator::{InitiatorExchange, InitiatorState};
pub use responder::{ResponderExchange, ResponderReply, ResponderState};

use crate::derive::{KeyDeriver, KeyMaterial};
use crate::error::Error;
use crate::state::{ExchangeHash, KexState, NegotiationContext, Role, SessionId};
use crate::transcript::ExchangeTranscript;

/// What a successful exchange hands to the transport.
#[derive(Debug)]
pub struct ExchangeOutput<K> {
    /// The deriver's output.
    pub keys: K,
    /// H of this exchange.
    pub exchange_hash: ExchangeHash,
    /// The connection's session id: this H on the first exchange, the
    /// original one on a rekey.
    pub session_id: SessionId,
}

impl KexState {
    /// Run the agreement against the peer's public value.
    ///
    /// The ephemeral private half is wiped before this returns, whether or
    /// not the agreement succeeded.
    pub(crate) fn agree(&mut self, peer_public: &[u8]) -> Result<(), Error> {
        let pair = self.local_ephemeral.as_mut().ok_or(Error::WrongState)?;
        let result = self
            .method
            .agreement
            .compute_shared(pair.private(), peer_public);
        pair.wipe_private();

        self.peer_public = Some(peer_public.to_vec());
        self.shared_secret = Some(result?);
        Ok(())
    }

    /// Compute H from the negotiation context, the host key, both public
    /// values and K, ordering the publics client-first for either role.
    pub(crate) fn compute_exchange_hash(
        &mut self,
        ctx: &NegotiationContext<'_>,
        host_key: &[u8],
    ) -> Result<(), Error> {
        let local = self
            .local_ephemeral
            .as_ref()
            .ok_or(Error::WrongState)?
            .public();
        let peer = self.peer_public.as_deref().ok_or(Error::WrongState)?;
        let shared = self.shared_secret.as_ref().ok_or(Error::WrongState)?;

        let (client_public, server_public) = match self.role {
            Role::Initiator => (local, peer),
            Role::Responder => (peer, local),
        };
        let transcript = ExchangeTranscript::from_context(
            ctx,
            host_key,
            self.method.agreement.public_encoding(),
            client_public,
            server_public,
            shared.as_bytes(),
        );
        let exchange_hash = transcript.hash(self.method.hash_alg)?;
        self.exchange_hash = Some(exchange_hash);
        Ok(())
    }

    pub(crate) fn exchange_hash(&self) -> Result<&ExchangeHash, Error> {
        self.exchange_hash.as_ref().ok_or(Error::WrongState)
    }

    /// Hand `(K, H, session_id)` to the deriver. Called once per exchange.
    pub(crate) fn derive_output<D: KeyDeriver>(
        &self,
        deriver: &mut D,
    ) -> Result<ExchangeOutput<D::Keys>, Error> {
        let exchange_hash = self.exchange_hash()?;
        let shared = self.shared_secret.as_ref().ok_or(Error::WrongState)?;
        let session_id = self.round.session_id_for(exchange_hash);

        let material = KeyMaterial::from_exchange(
            self.method.hash_alg,
            shared.as_bytes(),
            exchange_hash,
            &session_id,
        );
        let keys = deriver.derive_keys(&material)?;

        Ok(ExchangeOutput {
            keys,
            exchange_hash: exchange_hash.clone(),
            session_id,
        })
    }
}
