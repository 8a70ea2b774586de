use num_bigint::BigUint;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::{AgreementError, Error};
use crate::secret::SecretBuf;

/// RFC 3526 Section 3, 2048-bit MODP group (SSH "group14"), generator 2.
const GROUP14_P: [u8; 256] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2,
    0x21, 0x68, 0xc2, 0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1,
    0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6,
    0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45,
    0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9,
    0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11,
    0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe4, 0x5b, 0x3d,
    0xc2, 0x00, 0x7c, 0xb8, 0xa1, 0x63, 0xbf, 0x05, 0x98, 0xda, 0x48, 0x36,
    0x1c, 0x55, 0xd3, 0x9a, 0x69, 0x16, 0x3f, 0xa8, 0xfd, 0x24, 0xcf, 0x5f,
    0x83, 0x65, 0x5d, 0x23, 0xdc, 0xa3, 0xad, 0x96, 0x1c, 0x62, 0xf3, 0x56,
    0x20, 0x85, 0x52, 0xbb, 0x9e, 0xd5, 0x29, 0x07, 0x70, 0x96, 0x96, 0x6d,
    0x67, 0x0c, 0x35, 0x4e, 0x4a, 0xbc, 0x98, 0x04, 0xf1, 0x74, 0x6c, 0x08,
    0xca, 0x18, 0x21, 0x7c, 0x32, 0x90, 0x5e, 0x46, 0x2e, 0x36, 0xce, 0x3b,
    0xe3, 0x9e, 0x77, 0x2c, 0x18, 0x0e, 0x86, 0x03, 0x9b, 0x27, 0x83, 0xa2,
    0xec, 0x07, 0xa2, 0x8f, 0xb5, 0xc5, 0x5d, 0xf0, 0x6f, 0x4c, 0x52, 0xc9,
    0xde, 0x2b, 0xcb, 0xf6, 0x95, 0x58, 0x17, 0x18, 0x39, 0x95, 0x49, 0x7c,
    0xea, 0x95, 0x6a, 0xe5, 0x15, 0xd2, 0x26, 0x18, 0x98, 0xfa, 0x05, 0x10,
    0x15, 0x72, 0x8e, 0x5a, 0x8a, 0xac, 0xaa, 0x68, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff,];

/// Extra random bytes drawn beyond the prime width so that reducing modulo
/// the exponent range leaves a negligible bias.
const EXPONENT_OVERSAMPLE: usize = 8;

/// Minimum number of set bits in an acceptable public value.
///
/// With g = 2 a value with a single set bit has a trivial discrete log;
/// anything below four is rejected outright.
const MIN_PUBLIC_BITS_SET: u64 = 4;

/// Finite-field Diffie-Hellman group parameters `(p, g)`.
#[derive(Clone, PartialEq, Eq)]
pub struct GroupParams {
    p: BigUint,
    g: BigUint,
    p_len: usize,
}

impl core::fmt::Debug for GroupParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GroupParams({} bits, g={})", self.p.bits(), self.g)
    }
}

impl GroupParams {
    /// Build a group from big-endian `p` and `g`.
    ///
    /// `p` must be odd and at least 7, and `g` must lie in `[2, p-2]`.
    /// Primality is not checked; callers supply well-known groups or test
    /// groups they trust.
    pub fn new(p: &[u8], g: &[u8]) -> Result<Self, Error> {
        let p = BigUint::from_bytes_be(p);
        let g = BigUint::from_bytes_be(g);
        let two = BigUint::from(2u32);

        if p < BigUint::from(7u32) || !p.bit(0) {
            return Err(Error::BadGroup);
        }
        if g < two || g > &p - &two {
            return Err(Error::BadGroup);
        }

        let p_len = p.bits().div_ceil(8) as usize;
        Ok(Self { p, g, p_len })
    }

    /// The 2048-bit MODP group from RFC 3526 with generator 2.
    pub fn group14() -> Self {
        let p = BigUint::from_bytes_be(&GROUP14_P);
        Self {
            p,
            g: BigUint::from(2u32),
            p_len: GROUP14_P.len(),
        }
    }

    /// Width of the prime in bytes.
    pub fn prime_len(&self) -> usize {
        self.p_len
    }

    /// Generate a private exponent uniform in `[2, p-2]` and its public value.
    ///
    /// Returns (private_exponent, public_value), both unsigned big-endian.
    pub fn generate_keypair(
        &self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(SecretBuf, Vec<u8>), Error> {
        let mut random = Zeroizing::new(vec![0u8; self.p_len + EXPONENT_OVERSAMPLE]);
        rng.fill_bytes(random.as_mut_slice());

        // x = 2 + (r mod (p - 3)) lands in [2, p-2]
        let range = &self.p - BigUint::from(3u32);
        let x = BigUint::from_bytes_be(&random) % &range + BigUint::from(2u32);
        let private = Zeroizing::new(x.to_bytes_be());
        let public = self.g.modpow(&x, &self.p);

        Ok((SecretBuf::try_copy_from(&private)?, public.to_bytes_be()))
    }

    /// Raise the peer's public value to the local private exponent.
    ///
    /// The peer value is range-checked first. The result is the shared
    /// secret as an unsigned big-endian integer without padding.
    pub fn compute_shared(&self, private: &[u8], peer_public: &[u8]) -> Result<SecretBuf, Error> {
        let y = BigUint::from_bytes_be(peer_public);
        self.validate_public(&y)?;

        let x = BigUint::from_bytes_be(private);
        let k = y.modpow(&x, &self.p);
        if k <= BigUint::from(1u32) {
            return Err(AgreementError::DegenerateValue.into());
        }

        let shared = Zeroizing::new(k.to_bytes_be());
        SecretBuf::try_copy_from(&shared)
    }

    /// Reject public values outside `(1, p-1)` or with too few bits set.
    pub fn validate_public(&self, y: &BigUint) -> Result<(), AgreementError> {
        let one = BigUint::from(1u32);
        if *y <= one || *y >= &self.p - &one {
            return Err(AgreementError::InvalidPublicValue);
        }
        if y.count_ones() < MIN_PUBLIC_BITS_SET {
            return Err(AgreementError::InvalidPublicValue);
        }
        Ok(())
    }
}
