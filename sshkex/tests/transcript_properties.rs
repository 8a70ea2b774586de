//! Property tests for the exchange hash transcript.

use proptest::prelude::*;
use sshkex::wire::{self, PublicEncoding};
use sshkex::{ExchangeTranscript, HashAlg};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Fields {
    client_version: Vec<u8>,
    server_version: Vec<u8>,
    client_kexinit: Vec<u8>,
    server_kexinit: Vec<u8>,
    host_key: Vec<u8>,
    client_public: Vec<u8>,
    server_public: Vec<u8>,
    shared_secret: Vec<u8>,
}

impl Fields {
    fn transcript(&self, public_encoding: PublicEncoding) -> ExchangeTranscript<'_> {
        ExchangeTranscript {
            client_version: &self.client_version,
            server_version: &self.server_version,
            client_kexinit: &self.client_kexinit,
            server_kexinit: &self.server_kexinit,
            host_key: &self.host_key,
            public_encoding,
            client_public: &self.client_public,
            server_public: &self.server_public,
            shared_secret: &self.shared_secret,
        }
    }

    /// Change exactly one field so that its encoding differs.
    fn mutate(&mut self, field: usize) {
        match field {
            0 => self.client_version.push(b'x'),
            1 => self.server_version.push(b'x'),
            2 => self.client_kexinit.push(0),
            3 => self.server_kexinit.push(0),
            4 => self.host_key.push(0),
            5 => self.client_public.push(0),
            6 => self.server_public.push(0),
            // A new non-zero leading byte always changes the mpint value.
            _ => self.shared_secret.insert(0, 0x01),
        }
    }
}

fn bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..max)
}

fn fields() -> impl Strategy<Value = Fields> {
    (
        bytes(48),
        bytes(48),
        bytes(128),
        bytes(128),
        bytes(64),
        bytes(40),
        bytes(40),
        bytes(40),
    )
        .prop_map(
            |(
                client_version,
                server_version,
                client_kexinit,
                server_kexinit,
                host_key,
                client_public,
                server_public,
                shared_secret,
            )| Fields {
                client_version,
                server_version,
                client_kexinit,
                server_kexinit,
                host_key,
                client_public,
                server_public,
                shared_secret,
            },
        )
}

/// Same layout as the real transcript but with the KEXINIT payloads
/// written as plain strings.
fn hash_without_kexinit_tag(f: &Fields) -> Vec<u8> {
    let mut out = Vec::new();
    wire::put_string(&mut out, &f.client_version).unwrap();
    wire::put_string(&mut out, &f.server_version).unwrap();
    wire::put_string(&mut out, &f.client_kexinit).unwrap();
    wire::put_string(&mut out, &f.server_kexinit).unwrap();
    wire::put_string(&mut out, &f.host_key).unwrap();
    wire::put_string(&mut out, &f.client_public).unwrap();
    wire::put_string(&mut out, &f.server_public).unwrap();
    wire::put_mpint(&mut out, &f.shared_secret).unwrap();
    HashAlg::Sha256
        .digest(&[out.as_slice()])
        .unwrap()
        .as_bytes()
        .to_vec()
}

fn h(f: &Fields) -> Vec<u8> {
    f.transcript(PublicEncoding::String)
        .hash(HashAlg::Sha256)
        .unwrap()
        .as_bytes()
        .to_vec()
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn hash_is_deterministic(f in fields()) {
        prop_assert_eq!(h(&f), h(&f.clone()));
    }

    #[test]
    fn encoding_length_matches_fields(f in fields()) {
        let encoded = f.transcript(PublicEncoding::String).encode().unwrap();
        let expected = wire::string_len(&f.client_version)
            + wire::string_len(&f.server_version)
            + 5 + f.client_kexinit.len()
            + 5 + f.server_kexinit.len()
            + wire::string_len(&f.host_key)
            + wire::string_len(&f.client_public)
            + wire::string_len(&f.server_public)
            + wire::mpint_len(&f.shared_secret);
        prop_assert_eq!(encoded.len(), expected);
    }

    #[test]
    fn any_single_field_change_changes_hash(f in fields(), field in 0usize..8) {
        let mut changed = f.clone();
        changed.mutate(field);
        prop_assert_ne!(h(&f), h(&changed));
    }

    #[test]
    fn swapping_public_values_changes_hash(f in fields()) {
        prop_assume!(f.client_public != f.server_public);
        let mut swapped = f.clone();
        core::mem::swap(&mut swapped.client_public, &mut swapped.server_public);
        prop_assert_ne!(h(&f), h(&swapped));
    }

    #[test]
    fn swapping_versions_changes_hash(f in fields()) {
        prop_assume!(f.client_version != f.server_version);
        let mut swapped = f.clone();
        core::mem::swap(&mut swapped.client_version, &mut swapped.server_version);
        prop_assert_ne!(h(&f), h(&swapped));
    }

    #[test]
    fn kexinit_tag_is_part_of_hash(f in fields()) {
        prop_assert_ne!(h(&f), hash_without_kexinit_tag(&f));
    }

    #[test]
    fn hash_width_follows_algorithm(f in fields()) {
        for alg in [HashAlg::Sha256, HashAlg::Sha384, HashAlg::Sha512] {
            let hash = f.transcript(PublicEncoding::Mpint).hash(alg).unwrap();
            prop_assert_eq!(hash.as_bytes().len(), alg.digest_len());
        }
    }
}
