use rand_core::{CryptoRngCore, OsRng};

use crate::derive::KeyDeriver;
use crate::error::Error;
use crate::exchange::ExchangeOutput;
use crate::identity::{HostKeyVerifier, SignatureVerifier};
use crate::state::{ExchangeRound, KexMethod, KexState, NegotiationContext, Role};
use crate::wire::{KexDhInit, KexDhReply, SSH_MSG_KEXDH_REPLY};

/// Where the client-side exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    /// Call `start()` to generate the ephemeral key and the init message.
    Start,
    /// Waiting for KEXDH_REPLY; feed it to `on_reply()`.
    AwaitResponse,
    /// Keys derived. Terminal.
    Done,
    /// Exchange aborted. Terminal.
    Failed,
}

/// The client side of the exchange.
///
/// Owns the [`KexState`] for one exchange. Every secret it holds is wiped
/// when the machine reaches `Done` or `Failed`, on `abandon()`, and on drop.
pub struct InitiatorExchange {
    kex: KexState,
    state: InitiatorState,
}

impl InitiatorExchange {
    pub fn new(method: KexMethod, round: ExchangeRound) -> Self {
        Self {
            kex: KexState::new(Role::Initiator, method, round),
            state: InitiatorState::Start,
        }
    }

    pub fn state(&self) -> InitiatorState {
        self.state
    }

    pub fn kex_state(&self) -> &KexState {
        &self.kex
    }

    /// The one message type this machine is waiting for, if any.
    pub fn expected_message(&self) -> Option<u8> {
        match self.state {
            InitiatorState::AwaitResponse => Some(SSH_MSG_KEXDH_REPLY),
            _ => None,
        }
    }

    /// This side's ephemeral public value, once generated.
    pub fn ephemeral_public(&self) -> Option<&[u8]> {
        self.kex.local_ephemeral.as_ref().map(|pair| pair.public())
    }

    /// Whether the ephemeral private half, K and H have all been erased.
    pub fn secrets_wiped(&self) -> bool {
        self.kex.secrets_wiped()
    }

    /// Generate the ephemeral key pair and produce the KEXDH_INIT payload.
    pub fn start(&mut self) -> Result<Vec<u8>, Error> {
        self.start_with_rng(&mut OsRng)
    }

    /// `start()` with a specific RNG (useful for testing).
    pub fn start_with_rng(&mut self, rng: &mut impl CryptoRngCore) -> Result<Vec<u8>, Error> {
        if self.state != InitiatorState::Start {
            return Err(Error::WrongState);
        }

        match self.write_init(rng) {
            Ok(message) => {
                self.state = InitiatorState::AwaitResponse;
                tracing::debug!(
                    round_first = self.kex.round().is_first(),
                    "sent KEXDH_INIT, awaiting reply"
                );
                Ok(message)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Process KEXDH_REPLY and finish the exchange.
    ///
    /// In order: parse, host-key check, key agreement, exchange hash,
    /// signature check, key derivation. The deriver is only reached once
    /// the signature has verified. On any error the machine moves to
    /// `Failed` and the error is returned unchanged.
    pub fn on_reply<D: KeyDeriver>(
        &mut self,
        ctx: &NegotiationContext<'_>,
        payload: &[u8],
        host_keys: &mut impl HostKeyVerifier,
        verifier: &impl SignatureVerifier,
        deriver: &mut D,
    ) -> Result<ExchangeOutput<D::Keys>, Error> {
        if self.state != InitiatorState::AwaitResponse {
            return Err(Error::WrongState);
        }

        match self.read_reply(ctx, payload, host_keys, verifier, deriver) {
            Ok(output) => {
                self.kex.wipe_secrets();
                self.state = InitiatorState::Done;
                tracing::debug!(
                    exchange_hash = ?output.exchange_hash,
                    "key exchange complete"
                );
                Ok(output)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Abandon the exchange (connection closed or timed out).
    pub fn abandon(&mut self) {
        self.kex.wipe_secrets();
        if self.state != InitiatorState::Done {
            self.state = InitiatorState::Failed;
        }
    }

    fn write_init(&mut self, rng: &mut impl CryptoRngCore) -> Result<Vec<u8>, Error> {
        let agreement = &self.kex.method.agreement;
        let pair = agreement.generate(rng)?;
        let message = KexDhInit {
            ephemeral_public: pair.public(),
        }
        .encode(agreement.public_encoding())?;

        self.kex.local_ephemeral = Some(pair);
        Ok(message)
    }

    fn read_reply<D: KeyDeriver>(
        &mut self,
        ctx: &NegotiationContext<'_>,
        payload: &[u8],
        host_keys: &mut impl HostKeyVerifier,
        verifier: &impl SignatureVerifier,
        deriver: &mut D,
    ) -> Result<ExchangeOutput<D::Keys>, Error> {
        let encoding = self.kex.method.agreement.public_encoding();
        let reply = KexDhReply::decode(payload, encoding)?;

        if !host_keys.verify_host_key(reply.host_key) {
            return Err(Error::HostKeyRejected);
        }

        self.kex.agree(reply.ephemeral_public)?;
        self.kex.compute_exchange_hash(ctx, reply.host_key)?;

        let exchange_hash = self.kex.exchange_hash()?;
        if !verifier.verify(reply.host_key, reply.signature, exchange_hash.as_bytes()) {
            return Err(Error::SignatureInvalid);
        }

        self.kex.derive_output(deriver)
    }

    fn fail(&mut self, err: Error) -> Error {
        self.kex.wipe_secrets();
        self.state = InitiatorState::Failed;
        tracing::warn!(
            code = err.diagnostic_code(),
            kind = ?err.kind(),
            "key exchange failed: {err}"
        );
        err
    }
}
