#![deny(unsafe_code)]

//! # sshkex-session
//!
//! Drives the [`sshkex`] key exchange over a byte stream: packet framing,
//! one-shot message dispatch, `ssh-ed25519` host keys, and a per-connection
//! [`KexSession`] that runs the first exchange and any rekeys.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rand_core::OsRng;
//! use sshkex_session::{Ed25519HostKey, KexConfigBuilder, Negotiation, PinnedHostKey};
//!
//! let host_key = Ed25519HostKey::generate(&mut OsRng);
//! let pinned = PinnedHostKey::ed25519(&host_key.public_key()).unwrap();
//!
//! // Server config
//! let server_config = KexConfigBuilder::from_method_name("curve25519-sha256")
//!     .unwrap()
//!     .with_host_key(host_key)
//!     .build_server_config()
//!     .unwrap();
//!
//! // Client config (needs the server's host key)
//! let client_config = KexConfigBuilder::from_method_name("curve25519-sha256")
//!     .unwrap()
//!     .with_pinned_host_key(pinned)
//!     .build_client_config()
//!     .unwrap();
//!
//! let negotiation = Negotiation::new("SSH-2.0-c", "SSH-2.0-s", b"ic".to_vec(), b"is".to_vec());
//! let mut client = client_config.start_session(negotiation.clone());
//! let mut server = server_config.start_session(negotiation);
//! client.start().unwrap();
//! server.start().unwrap();
//! ```

pub mod dispatch;
pub mod error;
pub mod framing;
pub mod hostkey;
pub mod session;

pub use error::SessionError;
pub use hostkey::{Ed25519HostKey, Ed25519SignatureVerifier, PinnedHostKey};
pub use session::{KexSession, Negotiation};

// Re-export the exchange types callers need alongside a session.
pub use sshkex::{
    DirectionalKeys, Error, ErrorKind, ExchangeHash, KeyLengths, KexMethod, Role, SessionId,
    TrafficKeys,
};

use std::sync::Arc;

/// Shared configuration for both client and server sessions.
pub(crate) struct KexConfig {
    pub(crate) method: KexMethod,
    pub(crate) host_key: Option<Ed25519HostKey>,
    pub(crate) pinned_host_key: Option<PinnedHostKey>,
    pub(crate) key_lengths: KeyLengths,
}

/// Client (initiator) configuration.
#[derive(Clone)]
pub struct KexClientConfig {
    inner: Arc<KexConfig>,
}

impl KexClientConfig {
    /// Create an initiator session for one connection. Call
    /// [`KexSession::start`] to send KEXDH_INIT.
    pub fn start_session(&self, negotiation: Negotiation) -> KexSession {
        KexSession::new(Role::Initiator, Arc::clone(&self.inner), negotiation)
    }

    pub fn method(&self) -> &KexMethod {
        &self.inner.method
    }
}

/// Server (responder) configuration.
#[derive(Clone)]
pub struct KexServerConfig {
    inner: Arc<KexConfig>,
}

impl KexServerConfig {
    /// Create a responder session for one connection.
    pub fn start_session(&self, negotiation: Negotiation) -> KexSession {
        KexSession::new(Role::Responder, Arc::clone(&self.inner), negotiation)
    }

    pub fn method(&self) -> &KexMethod {
        &self.inner.method
    }
}

/// Builder for creating [`KexClientConfig`] and [`KexServerConfig`].
pub struct KexConfigBuilder {
    method: KexMethod,
    host_key: Option<Ed25519HostKey>,
    pinned_host_key: Option<PinnedHostKey>,
    key_lengths: KeyLengths,
}

impl KexConfigBuilder {
    pub fn new(method: KexMethod) -> Self {
        Self {
            method,
            host_key: None,
            pinned_host_key: None,
            key_lengths: KeyLengths::default(),
        }
    }

    /// Start from a negotiated method name such as `curve25519-sha256`.
    pub fn from_method_name(name: &str) -> Result<Self, Error> {
        Ok(Self::new(KexMethod::from_name(name)?))
    }

    /// Set the server's host key. Required for server configurations.
    pub fn with_host_key(mut self, host_key: Ed25519HostKey) -> Self {
        self.host_key = Some(host_key);
        self
    }

    /// Pin the host key the server must present. Required for client
    /// configurations.
    pub fn with_pinned_host_key(mut self, pinned: PinnedHostKey) -> Self {
        self.pinned_host_key = Some(pinned);
        self
    }

    /// Override the derived key lengths. Defaults to
    /// [`KeyLengths::default`].
    pub fn with_key_lengths(mut self, key_lengths: KeyLengths) -> Self {
        self.key_lengths = key_lengths;
        self
    }

    fn build_inner(self) -> KexConfig {
        KexConfig {
            method: self.method,
            host_key: self.host_key,
            pinned_host_key: self.pinned_host_key,
            key_lengths: self.key_lengths,
        }
    }

    /// Build a client (initiator) configuration.
    ///
    /// Returns an error if no pinned host key was provided.
    pub fn build_client_config(self) -> Result<KexClientConfig, SessionError> {
        if self.pinned_host_key.is_none() {
            return Err(SessionError::Config("client needs a pinned host key"));
        }
        self.check_key_lengths()?;
        Ok(KexClientConfig {
            inner: Arc::new(self.build_inner()),
        })
    }

    /// Build a server (responder) configuration.
    ///
    /// Returns an error if no host key was provided.
    pub fn build_server_config(self) -> Result<KexServerConfig, SessionError> {
        if self.host_key.is_none() {
            return Err(SessionError::Config("server needs a host key"));
        }
        self.check_key_lengths()?;
        Ok(KexServerConfig {
            inner: Arc::new(self.build_inner()),
        })
    }

    fn check_key_lengths(&self) -> Result<(), SessionError> {
        let max = self.method.hash_alg().digest_len();
        let KeyLengths {
            iv,
            encryption,
            integrity,
        } = self.key_lengths;
        if iv.max(encryption).max(integrity) > max {
            return Err(SessionError::Config("key length exceeds digest length"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn client_requires_pinned_key() {
        let builder = KexConfigBuilder::from_method_name("curve25519-sha256").unwrap();
        assert!(matches!(
            builder.build_client_config(),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn server_requires_host_key() {
        let builder = KexConfigBuilder::from_method_name("diffie-hellman-group14-sha256").unwrap();
        assert!(matches!(
            builder.build_server_config(),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(matches!(
            KexConfigBuilder::from_method_name("diffie-hellman-group1-sha1"),
            Err(Error::UnknownMethod)
        ));
    }

    #[test]
    fn oversized_key_lengths_rejected() {
        let host_key = Ed25519HostKey::generate(&mut OsRng);
        let result = KexConfigBuilder::from_method_name("curve25519-sha256")
            .unwrap()
            .with_host_key(host_key)
            .with_key_lengths(KeyLengths {
                iv: 16,
                encryption: 64,
                integrity: 32,
            })
            .build_server_config();
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn configs_share_one_inner() {
        let host_key = Ed25519HostKey::generate(&mut OsRng);
        let config = KexConfigBuilder::from_method_name("curve25519-sha256")
            .unwrap()
            .with_host_key(host_key)
            .build_server_config()
            .unwrap();
        let copy = config.clone();
        assert!(Arc::ptr_eq(&config.inner, &copy.inner));
        assert_eq!(copy.method(), &KexMethod::from_name("curve25519-sha256").unwrap());
    }
}
