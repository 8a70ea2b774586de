//! Per-connection key exchange driver.
//!
//! `KexSession` owns the packet framer, the one-shot dispatcher and the
//! pending exchange. The caller moves bytes in with `read_packets()` and
//! out with `write_packets()`; once an exchange completes the traffic keys
//! are collected with `take_keys()`.

use std::collections::VecDeque;
use std::sync::Arc;

use sshkex::{
    ExchangeHash, ExchangeOutput, ExchangeRound, InitiatorExchange, NegotiationContext,
    ResponderExchange, Role, SessionId, TrafficKeyDeriver, TrafficKeys,
};

use crate::dispatch::Dispatcher;
use crate::error::SessionError;
use crate::framing::PacketFramer;
use crate::hostkey::Ed25519SignatureVerifier;
use crate::KexConfig;

/// The four values both sides must agree on before the exchange, owned.
///
/// KEXINIT payloads are stored as received, starting at the first byte
/// after the message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub client_version: Vec<u8>,
    pub server_version: Vec<u8>,
    pub client_kexinit: Vec<u8>,
    pub server_kexinit: Vec<u8>,
}

impl Negotiation {
    pub fn new(
        client_version: impl Into<Vec<u8>>,
        server_version: impl Into<Vec<u8>>,
        client_kexinit: impl Into<Vec<u8>>,
        server_kexinit: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            client_version: client_version.into(),
            server_version: server_version.into(),
            client_kexinit: client_kexinit.into(),
            server_kexinit: server_kexinit.into(),
        }
    }

    pub fn context(&self) -> NegotiationContext<'_> {
        NegotiationContext::new(
            &self.client_version,
            &self.server_version,
            &self.client_kexinit,
            &self.server_kexinit,
        )
    }
}

/// The exchange waiting on its next message, registered with the dispatcher.
enum Continuation {
    AwaitReply(Box<InitiatorExchange>),
    AwaitInit(Box<ResponderExchange>),
}

impl Continuation {
    fn abandon(mut self) {
        match &mut self {
            Continuation::AwaitReply(exchange) => exchange.abandon(),
            Continuation::AwaitInit(exchange) => exchange.abandon(),
        }
    }
}

/// Internal session state.
pub(crate) enum SessionState {
    /// Created or rekey requested; `start()` not yet called.
    Idle,
    /// An exchange is pending in the dispatcher.
    InProgress,
    /// The last exchange finished. `keys` is `None` once taken.
    Completed {
        keys: Option<TrafficKeys>,
        exchange_hash: ExchangeHash,
    },
    /// Session is dead.
    Failed,
}

/// Drives one side of the key exchange over a byte stream.
pub struct KexSession {
    role: Role,
    config: Arc<KexConfig>,
    negotiation: Negotiation,
    state: SessionState,
    framer: PacketFramer,
    dispatcher: Dispatcher<Continuation>,
    /// Payloads waiting for `write_packets()`.
    outgoing: VecDeque<Vec<u8>>,
    session_id: Option<SessionId>,
}

impl KexSession {
    pub(crate) fn new(role: Role, config: Arc<KexConfig>, negotiation: Negotiation) -> Self {
        Self {
            role,
            config,
            negotiation,
            state: SessionState::Idle,
            framer: PacketFramer::default(),
            dispatcher: Dispatcher::new(),
            outgoing: VecDeque::new(),
            session_id: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether an exchange is pending.
    pub fn is_exchanging(&self) -> bool {
        matches!(self.state, SessionState::InProgress)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, SessionState::Failed)
    }

    /// The message type the session is waiting for, if any.
    pub fn expected_message(&self) -> Option<u8> {
        self.dispatcher.pending()
    }

    /// The session id, fixed by the first completed exchange.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// H of the most recently completed exchange.
    pub fn exchange_hash(&self) -> Option<&ExchangeHash> {
        match &self.state {
            SessionState::Completed { exchange_hash, .. } => Some(exchange_hash),
            _ => None,
        }
    }

    /// Begin an exchange: the client queues KEXDH_INIT, the server
    /// generates its ephemeral key and waits.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(SessionError::WrongState);
        }

        match self.start_inner() {
            Ok(()) => {
                self.state = SessionState::InProgress;
                tracing::debug!(
                    role = ?self.role,
                    expected = self.dispatcher.pending(),
                    rekey = self.session_id.is_some(),
                    "key exchange started"
                );
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Feed bytes received from the peer.
    ///
    /// Returns `true` if an exchange completed while processing them.
    /// Packets that arrive while no exchange is pending are not
    /// dispatched; collect them with `pop_packet()`.
    pub fn read_packets(&mut self, buf: &[u8]) -> Result<bool, SessionError> {
        if matches!(self.state, SessionState::Failed) {
            return Err(SessionError::WrongState);
        }

        match self.read_packets_inner(buf) {
            Ok(completed) => Ok(completed),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Append queued outgoing packets to `buf`, framed.
    ///
    /// Returns the number of packets written.
    pub fn write_packets(&mut self, buf: &mut Vec<u8>) -> Result<usize, SessionError> {
        let mut written = 0;
        while let Some(payload) = self.outgoing.pop_front() {
            PacketFramer::write_frame(buf, &payload)?;
            written += 1;
        }
        Ok(written)
    }

    /// Take the next packet that arrived while no exchange was pending,
    /// such as the peer's NEWKEYS following its reply.
    ///
    /// Returns `None` while an exchange is pending or after failure. At
    /// most `PacketFramer::PACKET_READY_MAX` packets are held; the caller
    /// drains them before feeding more bytes.
    pub fn pop_packet(&mut self) -> Option<Vec<u8>> {
        match self.state {
            SessionState::Idle | SessionState::Completed { .. } => self.framer.pop_packet(),
            SessionState::InProgress | SessionState::Failed => None,
        }
    }

    /// Take the keys of the most recently completed exchange.
    pub fn take_keys(&mut self) -> Option<TrafficKeys> {
        match &mut self.state {
            SessionState::Completed { keys, .. } => keys.take(),
            _ => None,
        }
    }

    /// Start a fresh exchange on an established session.
    ///
    /// New ephemeral keys are generated; the session id stays that of the
    /// first exchange. Keys of the previous exchange not yet taken are
    /// discarded.
    pub fn rekey(&mut self, negotiation: Negotiation) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Completed { .. }) {
            return Err(SessionError::WrongState);
        }
        self.negotiation = negotiation;
        self.state = SessionState::Idle;
        self.start()
    }

    /// Tear the session down, wiping any pending exchange.
    pub fn abort(&mut self) {
        if let Some(continuation) = self.dispatcher.clear() {
            continuation.abandon();
        }
        self.outgoing.clear();
        self.framer.reset();
        self.state = SessionState::Failed;
    }

    fn round(&self) -> ExchangeRound {
        match &self.session_id {
            Some(session_id) => ExchangeRound::Rekey(session_id.clone()),
            None => ExchangeRound::First,
        }
    }

    fn deriver(&self) -> TrafficKeyDeriver {
        TrafficKeyDeriver::new(self.config.key_lengths)
    }

    fn start_inner(&mut self) -> Result<(), SessionError> {
        let method = self.config.method.clone();
        let continuation = match self.role {
            Role::Initiator => {
                let mut exchange = InitiatorExchange::new(method, self.round());
                let init = exchange.start()?;
                self.outgoing.push_back(init);
                Continuation::AwaitReply(Box::new(exchange))
            }
            Role::Responder => {
                let exchange = ResponderExchange::new(method, self.round())?;
                Continuation::AwaitInit(Box::new(exchange))
            }
        };
        self.register(continuation)
    }

    fn register(&mut self, continuation: Continuation) -> Result<(), SessionError> {
        let expected = match &continuation {
            Continuation::AwaitReply(exchange) => exchange.expected_message(),
            Continuation::AwaitInit(exchange) => exchange.expected_message(),
        };
        let Some(message_type) = expected else {
            continuation.abandon();
            return Err(SessionError::WrongState);
        };

        self.dispatcher
            .register(message_type, continuation)
            .map_err(|(err, rejected)| {
                rejected.abandon();
                SessionError::from(err)
            })
    }

    fn read_packets_inner(&mut self, buf: &[u8]) -> Result<bool, SessionError> {
        self.framer.ingest_bytes(buf)?;

        // Only the awaited packet is consumed; anything behind it stays
        // queued for `pop_packet()`.
        if self.dispatcher.pending().is_none() {
            return Ok(false);
        }
        let Some(packet) = self.framer.pop_packet() else {
            return Ok(false);
        };

        let message_type = *packet.first().ok_or(SessionError::InvalidPacket)?;
        let continuation = self
            .dispatcher
            .take_for(message_type)
            .ok_or(SessionError::UnexpectedMessage(message_type))?;

        let output = self.run(continuation, &packet)?;
        self.complete(output);
        Ok(true)
    }

    /// Resume the pending exchange with its awaited message.
    fn run(
        &mut self,
        continuation: Continuation,
        packet: &[u8],
    ) -> Result<ExchangeOutput<TrafficKeys>, SessionError> {
        let ctx = self.negotiation.context();
        let mut deriver = self.deriver();

        match continuation {
            Continuation::AwaitReply(mut exchange) => {
                let mut host_keys = self
                    .config
                    .pinned_host_key
                    .clone()
                    .ok_or(SessionError::Config("client needs a pinned host key"))?;
                let output = exchange.on_reply(
                    &ctx,
                    packet,
                    &mut host_keys,
                    &Ed25519SignatureVerifier,
                    &mut deriver,
                )?;
                Ok(output)
            }
            Continuation::AwaitInit(mut exchange) => {
                let host_key = self
                    .config
                    .host_key
                    .as_ref()
                    .ok_or(SessionError::Config("server needs a host key"))?;
                let reply = exchange.on_init(&ctx, packet, host_key, &mut deriver)?;
                self.outgoing.push_back(reply.message);
                Ok(reply.output)
            }
        }
    }

    fn complete(&mut self, output: ExchangeOutput<TrafficKeys>) {
        let ExchangeOutput {
            keys,
            exchange_hash,
            session_id,
        } = output;

        if self.session_id.is_none() {
            self.session_id = Some(session_id);
        }
        tracing::debug!(
            role = ?self.role,
            ?exchange_hash,
            session_id = ?self.session_id,
            "key exchange complete"
        );
        self.state = SessionState::Completed {
            keys: Some(keys),
            exchange_hash,
        };
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        if let Some(continuation) = self.dispatcher.clear() {
            continuation.abandon();
        }
        self.state = SessionState::Failed;
        tracing::warn!(role = ?self.role, "session failed: {err}");
        err
    }
}
