use rand_core::{CryptoRngCore, OsRng};

use crate::derive::KeyDeriver;
use crate::error::Error;
use crate::exchange::ExchangeOutput;
use crate::identity::HostKeySigner;
use crate::state::{ExchangeRound, KexMethod, KexState, NegotiationContext, Role};
use crate::wire::{KexDhInit, KexDhReply, SSH_MSG_KEXDH_INIT};

/// Where the server-side exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    /// Waiting for KEXDH_INIT; feed it to `on_init()`.
    AwaitInit,
    /// Reply produced and keys derived. Terminal.
    Replied,
    /// Exchange aborted. Terminal.
    Failed,
}

/// The reply to send and the keys to switch to.
#[derive(Debug)]
pub struct ResponderReply<K> {
    /// KEXDH_REPLY payload.
    pub message: Vec<u8>,
    pub output: ExchangeOutput<K>,
}

/// The server side of the exchange.
///
/// The ephemeral key pair is generated at construction, before the
/// initiator's message arrives.
pub struct ResponderExchange {
    kex: KexState,
    state: ResponderState,
}

impl ResponderExchange {
    pub fn new(method: KexMethod, round: ExchangeRound) -> Result<Self, Error> {
        Self::with_rng(method, round, &mut OsRng)
    }

    /// `new()` with a specific RNG (useful for testing).
    pub fn with_rng(
        method: KexMethod,
        round: ExchangeRound,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Self, Error> {
        let mut kex = KexState::new(Role::Responder, method, round);
        let pair = kex.method.agreement.generate(rng)?;
        kex.local_ephemeral = Some(pair);

        Ok(Self {
            kex,
            state: ResponderState::AwaitInit,
        })
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    pub fn kex_state(&self) -> &KexState {
        &self.kex
    }

    /// The one message type this machine is waiting for, if any.
    pub fn expected_message(&self) -> Option<u8> {
        match self.state {
            ResponderState::AwaitInit => Some(SSH_MSG_KEXDH_INIT),
            _ => None,
        }
    }

    pub fn ephemeral_public(&self) -> Option<&[u8]> {
        self.kex.local_ephemeral.as_ref().map(|pair| pair.public())
    }

    /// Whether the ephemeral private half, K and H have all been erased.
    pub fn secrets_wiped(&self) -> bool {
        self.kex.secrets_wiped()
    }

    /// Process KEXDH_INIT, producing KEXDH_REPLY and the derived keys.
    ///
    /// In order: parse, key agreement, host key blob, exchange hash, sign,
    /// build reply, key derivation. On any error the machine moves to
    /// `Failed` and nothing is sent.
    pub fn on_init<D: KeyDeriver>(
        &mut self,
        ctx: &NegotiationContext<'_>,
        payload: &[u8],
        signer: &impl HostKeySigner,
        deriver: &mut D,
    ) -> Result<ResponderReply<D::Keys>, Error> {
        if self.state != ResponderState::AwaitInit {
            return Err(Error::WrongState);
        }

        match self.read_init(ctx, payload, signer, deriver) {
            Ok(reply) => {
                self.kex.wipe_secrets();
                self.state = ResponderState::Replied;
                tracing::debug!(
                    exchange_hash = ?reply.output.exchange_hash,
                    round_first = self.kex.round().is_first(),
                    "sent KEXDH_REPLY"
                );
                Ok(reply)
            }
            Err(err) => {
                self.kex.wipe_secrets();
                self.state = ResponderState::Failed;
                tracing::warn!(
                    code = err.diagnostic_code(),
                    kind = ?err.kind(),
                    "key exchange failed: {err}"
                );
                Err(err)
            }
        }
    }

    /// Abandon the exchange (connection closed or timed out).
    pub fn abandon(&mut self) {
        self.kex.wipe_secrets();
        if self.state == ResponderState::AwaitInit {
            self.state = ResponderState::Failed;
        }
    }

    fn read_init<D: KeyDeriver>(
        &mut self,
        ctx: &NegotiationContext<'_>,
        payload: &[u8],
        signer: &impl HostKeySigner,
        deriver: &mut D,
    ) -> Result<ResponderReply<D::Keys>, Error> {
        let encoding = self.kex.method.agreement.public_encoding();
        let init = KexDhInit::decode(payload, encoding)?;

        self.kex.agree(init.ephemeral_public)?;

        let host_key = signer.public_blob()?;
        self.kex.compute_exchange_hash(ctx, &host_key)?;

        let signature = signer.sign(self.kex.exchange_hash()?.as_bytes())?;
        let message = KexDhReply {
            host_key: &host_key,
            ephemeral_public: self.ephemeral_public().ok_or(Error::WrongState)?,
            signature: &signature,
        }
        .encode(encoding)?;

        let output = self.kex.derive_output(deriver)?;
        Ok(ResponderReply { message, output })
    }
}
