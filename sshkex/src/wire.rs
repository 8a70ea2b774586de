//! SSH wire encodings (RFC 4251 Section 5) and the two KEX messages.
//!
//! Decoding borrows from the input buffer and never panics on malformed
//! input: every length is checked against the remaining bytes, and
//! trailing garbage after a message is rejected.

use crate::error::Error;
use crate::secret::SecretBuf;

/// SSH_MSG_KEXINIT, prepended to the negotiation payloads in the transcript.
pub const SSH_MSG_KEXINIT: u8 = 20;
/// SSH_MSG_KEXDH_INIT / SSH_MSG_KEX_ECDH_INIT.
pub const SSH_MSG_KEXDH_INIT: u8 = 30;
/// SSH_MSG_KEXDH_REPLY / SSH_MSG_KEX_ECDH_REPLY.
pub const SSH_MSG_KEXDH_REPLY: u8 = 31;

/// Largest accepted mpint body: a 16384-bit magnitude plus a sign byte.
pub const MPINT_MAX_LEN: usize = 16384 / 8 + 1;

/// How an ephemeral public value is carried on the wire and in the
/// exchange hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicEncoding {
    /// `mpint e` / `mpint f` (finite-field DH).
    Mpint,
    /// `string Q_C` / `string Q_S` (Curve25519, RFC 8731).
    String,
}

/// A byte sink that reports allocation failure instead of aborting.
pub trait Sink {
    fn put(&mut self, data: &[u8]) -> Result<(), Error>;
}

impl Sink for Vec<u8> {
    fn put(&mut self, data: &[u8]) -> Result<(), Error> {
        self.try_reserve(data.len()).map_err(|_| Error::OutOfMemory)?;
        self.extend_from_slice(data);
        Ok(())
    }
}

impl Sink for SecretBuf {
    fn put(&mut self, data: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(data)
    }
}

fn strip_leading_zeros(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    &value[start..]
}

fn len_u32(len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::BadMessage)
}

pub fn put_u8(out: &mut impl Sink, value: u8) -> Result<(), Error> {
    out.put(&[value])
}

pub fn put_u32(out: &mut impl Sink, value: u32) -> Result<(), Error> {
    out.put(&value.to_be_bytes())
}

/// `string`: uint32 length followed by the bytes.
pub fn put_string(out: &mut impl Sink, data: &[u8]) -> Result<(), Error> {
    put_u32(out, len_u32(data.len())?)?;
    out.put(data)
}

/// `mpint` from an unsigned big-endian magnitude.
///
/// Leading zeros are stripped, zero encodes as an empty body, and a zero
/// byte is prepended when the high bit is set so the value stays positive.
pub fn put_mpint(out: &mut impl Sink, unsigned: &[u8]) -> Result<(), Error> {
    let magnitude = strip_leading_zeros(unsigned);
    match magnitude.first() {
        None => put_u32(out, 0),
        Some(first) if first & 0x80 != 0 => {
            put_u32(out, len_u32(magnitude.len() + 1)?)?;
            out.put(&[0])?;
            out.put(magnitude)
        }
        Some(_) => put_string(out, magnitude),
    }
}

/// Encoded size of `put_string(data)`.
pub fn string_len(data: &[u8]) -> usize {
    4 + data.len()
}

/// Encoded size of `put_mpint(unsigned)`.
pub fn mpint_len(unsigned: &[u8]) -> usize {
    let magnitude = strip_leading_zeros(unsigned);
    match magnitude.first() {
        Some(first) if first & 0x80 != 0 => 4 + magnitude.len() + 1,
        _ => 4 + magnitude.len(),
    }
}

/// Write an ephemeral public value in the given encoding.
pub fn put_public(
    out: &mut impl Sink,
    encoding: PublicEncoding,
    public: &[u8],
) -> Result<(), Error> {
    match encoding {
        PublicEncoding::Mpint => put_mpint(out, public),
        PublicEncoding::String => put_string(out, public),
    }
}

/// Encoded size of `put_public(encoding, public)`.
pub fn public_len(encoding: PublicEncoding, public: &[u8]) -> usize {
    match encoding {
        PublicEncoding::Mpint => mpint_len(public),
        PublicEncoding::String => string_len(public),
    }
}

/// Cursor over a received message.
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() < len {
            return Err(Error::BadMessage);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    pub fn get_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_string(&mut self) -> Result<&'a [u8], Error> {
        let len = self.get_u32()? as usize;
        self.take(len)
    }

    /// Read an `mpint`, returning its unsigned magnitude without leading zeros.
    ///
    /// Negative values and oversized bodies are rejected.
    pub fn get_mpint(&mut self) -> Result<&'a [u8], Error> {
        let body = self.get_string()?;
        if body.len() > MPINT_MAX_LEN {
            return Err(Error::BadMessage);
        }
        if body.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(Error::BadMessage);
        }
        Ok(strip_leading_zeros(body))
    }

    pub fn get_public(&mut self, encoding: PublicEncoding) -> Result<&'a [u8], Error> {
        match encoding {
            PublicEncoding::Mpint => self.get_mpint(),
            PublicEncoding::String => self.get_string(),
        }
    }

    /// Succeed only if every byte has been consumed.
    pub fn finish(self) -> Result<(), Error> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::BadMessage)
        }
    }
}

/// SSH_MSG_KEXDH_INIT: the initiator's ephemeral public value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KexDhInit<'a> {
    pub ephemeral_public: &'a [u8],
}

impl<'a> KexDhInit<'a> {
    pub fn encode(&self, encoding: PublicEncoding) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        out.try_reserve_exact(1 + public_len(encoding, self.ephemeral_public))
            .map_err(|_| Error::OutOfMemory)?;
        put_u8(&mut out, SSH_MSG_KEXDH_INIT)?;
        put_public(&mut out, encoding, self.ephemeral_public)?;
        Ok(out)
    }

    pub fn decode(payload: &'a [u8], encoding: PublicEncoding) -> Result<Self, Error> {
        let mut reader = Reader::new(payload);
        if reader.get_u8()? != SSH_MSG_KEXDH_INIT {
            return Err(Error::BadMessage);
        }
        let ephemeral_public = reader.get_public(encoding)?;
        reader.finish()?;
        Ok(Self { ephemeral_public })
    }
}

/// SSH_MSG_KEXDH_REPLY: host key blob, responder ephemeral public value,
/// and the signature over the exchange hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KexDhReply<'a> {
    pub host_key: &'a [u8],
    pub ephemeral_public: &'a [u8],
    pub signature: &'a [u8],
}

impl<'a> KexDhReply<'a> {
    pub fn encode(&self, encoding: PublicEncoding) -> Result<Vec<u8>, Error> {
        let len = 1
            + string_len(self.host_key)
            + public_len(encoding, self.ephemeral_public)
            + string_len(self.signature);
        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
        put_u8(&mut out, SSH_MSG_KEXDH_REPLY)?;
        put_string(&mut out, self.host_key)?;
        put_public(&mut out, encoding, self.ephemeral_public)?;
        put_string(&mut out, self.signature)?;
        Ok(out)
    }

    pub fn decode(payload: &'a [u8], encoding: PublicEncoding) -> Result<Self, Error> {
        let mut reader = Reader::new(payload);
        if reader.get_u8()? != SSH_MSG_KEXDH_REPLY {
            return Err(Error::BadMessage);
        }
        let host_key = reader.get_string()?;
        let ephemeral_public = reader.get_public(encoding)?;
        let signature = reader.get_string()?;
        reader.finish()?;
        Ok(Self {
            host_key,
            ephemeral_public,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mpint(value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        put_mpint(&mut out, value).unwrap();
        assert_eq!(out.len(), mpint_len(value));
        out
    }

    /// Examples from RFC 4251 Section 5.
    #[test]
    fn mpint_rfc4251_examples() {
        assert_eq!(mpint(&[]), [0, 0, 0, 0]);
        assert_eq!(mpint(&[0, 0]), [0, 0, 0, 0]);
        assert_eq!(
            mpint(&[0x09, 0xa3, 0x78, 0xf9, 0xb2, 0xe3, 0x32, 0xa7]),
            [0, 0, 0, 8, 0x09, 0xa3, 0x78, 0xf9, 0xb2, 0xe3, 0x32, 0xa7]
        );
        assert_eq!(mpint(&[0x80]), [0, 0, 0, 2, 0x00, 0x80]);
    }

    #[test]
    fn mpint_decode_strips_sign_byte() {
        let encoded = mpint(&[0x80, 0x01]);
        let mut reader = Reader::new(&encoded);
        assert_eq!(reader.get_mpint().unwrap(), &[0x80, 0x01]);
        reader.finish().unwrap();
    }

    #[test]
    fn mpint_decode_rejects_negative() {
        let encoded = [0, 0, 0, 2, 0xed, 0xcc];
        assert_eq!(Reader::new(&encoded).get_mpint(), Err(Error::BadMessage));
    }

    #[test]
    fn string_length_beyond_buffer_rejected() {
        let encoded = [0, 0, 0, 9, 1, 2, 3];
        assert_eq!(Reader::new(&encoded).get_string(), Err(Error::BadMessage));
    }

    #[test]
    fn reply_round_trip_curve() {
        let reply = KexDhReply {
            host_key: b"host key blob",
            ephemeral_public: &[7u8; 32],
            signature: b"sig",
        };
        let encoded = reply.encode(PublicEncoding::String).unwrap();
        assert_eq!(encoded[0], SSH_MSG_KEXDH_REPLY);
        let decoded = KexDhReply::decode(&encoded, PublicEncoding::String).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn init_mpint_high_bit_round_trip() {
        let init = KexDhInit {
            ephemeral_public: &[0xF0, 0x00, 0x01],
        };
        let encoded = init.encode(PublicEncoding::Mpint).unwrap();
        assert_eq!(encoded, [SSH_MSG_KEXDH_INIT, 0, 0, 0, 4, 0, 0xF0, 0x00, 0x01]);
        let decoded = KexDhInit::decode(&encoded, PublicEncoding::Mpint).unwrap();
        assert_eq!(decoded, init);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut encoded = KexDhInit {
            ephemeral_public: &[1; 32],
        }
        .encode(PublicEncoding::String)
        .unwrap();
        encoded.push(0);
        assert_eq!(
            KexDhInit::decode(&encoded, PublicEncoding::String),
            Err(Error::BadMessage)
        );
    }

    #[test]
    fn wrong_message_type_rejected() {
        let encoded = KexDhInit {
            ephemeral_public: &[1; 32],
        }
        .encode(PublicEncoding::String)
        .unwrap();
        assert_eq!(
            KexDhReply::decode(&encoded, PublicEncoding::String),
            Err(Error::BadMessage)
        );
    }

    #[test]
    fn truncated_reply_rejected() {
        let encoded = KexDhReply {
            host_key: b"k",
            ephemeral_public: &[1; 32],
            signature: b"s",
        }
        .encode(PublicEncoding::String)
        .unwrap();
        for cut in 0..encoded.len() {
            assert!(KexDhReply::decode(&encoded[..cut], PublicEncoding::String).is_err());
        }
    }
}
