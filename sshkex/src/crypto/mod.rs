//! Cryptographic primitives for the key exchange.
//!
//! - [`ffdh`]: finite-field Diffie-Hellman over MODP groups
//! - [`hash`]: SHA-2 digests for the exchange hash and key derivation
//! - [`x25519`]: X25519 Diffie-Hellman with all-zero output rejection

pub mod ffdh;
pub mod hash;
pub mod x25519;
