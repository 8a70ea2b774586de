//! `uint32`-length-prefixed packet framing for the key exchange messages.
//!
//! Each packet is a big-endian `uint32` length followed by that many bytes
//! of payload, the first of which is the SSH message type. Bytes may arrive
//! split at any point, including inside the length prefix, so the framer
//! accumulates partial data until a complete packet is available.

use std::collections::VecDeque;

/// A packet could not be framed or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPacket;

/// Accumulates incoming bytes and yields complete packets.
#[derive(Default)]
pub struct PacketFramer {
    /// Partial length prefix.
    len_buf: [u8; 4],
    /// Number of valid bytes in `len_buf`.
    len_have: usize,
    /// In-progress packet: (remaining_bytes, accumulated_data).
    packet_in_progress: Option<(usize, Vec<u8>)>,
    packets_ready: VecDeque<Vec<u8>>,
}

impl PacketFramer {
    /// Maximum length of a single packet (RFC 4253 Section 6.1).
    ///
    /// Bounds what an unauthenticated peer can make us buffer.
    pub const PACKET_LEN_MAX: usize = 35000;

    /// Maximum number of buffered ready packets before rejecting input.
    pub const PACKET_READY_MAX: usize = 8;

    /// Ingest incoming bytes.
    ///
    /// Returns `true` if at least one complete packet is now available.
    pub fn ingest_bytes(&mut self, mut buffer: &[u8]) -> Result<bool, InvalidPacket> {
        while !buffer.is_empty() {
            match self.packet_in_progress.as_mut() {
                None => {
                    let take = (4 - self.len_have).min(buffer.len());
                    self.len_buf[self.len_have..self.len_have + take]
                        .copy_from_slice(&buffer[..take]);
                    self.len_have += take;
                    buffer = &buffer[take..];

                    if self.len_have < 4 {
                        continue;
                    }
                    self.len_have = 0;

                    let len = u32::from_be_bytes(self.len_buf) as usize;
                    // Every packet carries at least its message type.
                    if len == 0
                        || len > Self::PACKET_LEN_MAX
                        || self.packets_ready.len() >= Self::PACKET_READY_MAX
                    {
                        return Err(InvalidPacket);
                    }
                    self.packet_in_progress = Some((len, Vec::with_capacity(len)));
                }
                Some((bytes_remaining, packet)) => {
                    let take_amt = (*bytes_remaining).min(buffer.len());
                    let (take, rem) = buffer.split_at(take_amt);
                    packet.extend_from_slice(take);
                    *bytes_remaining -= take_amt;
                    buffer = rem;

                    if *bytes_remaining == 0 {
                        if let Some((_, packet)) = self.packet_in_progress.take() {
                            self.packets_ready.push_back(packet);
                        }
                    }
                }
            }
        }

        Ok(self.ready())
    }

    /// Whether at least one complete packet is available.
    pub fn ready(&self) -> bool {
        !self.packets_ready.is_empty()
    }

    /// Pop the next complete packet, if any.
    pub fn pop_packet(&mut self) -> Option<Vec<u8>> {
        self.packets_ready.pop_front()
    }

    /// Drop all buffered input.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write a length-prefixed packet into `buffer`.
    pub fn write_frame(buffer: &mut Vec<u8>, packet: &[u8]) -> Result<(), InvalidPacket> {
        if packet.is_empty() || packet.len() > Self::PACKET_LEN_MAX {
            return Err(InvalidPacket);
        }
        let len = u32::try_from(packet.len()).map_err(|_| InvalidPacket)?;
        buffer.extend_from_slice(&len.to_be_bytes());
        buffer.extend_from_slice(packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_packet() {
        let packet = b"\x1ehello kex";
        let mut buf = Vec::new();
        PacketFramer::write_frame(&mut buf, packet).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 10]);

        let mut framer = PacketFramer::default();
        assert!(!framer.ready());
        assert!(framer.ingest_bytes(&buf).unwrap());

        assert_eq!(framer.pop_packet().unwrap(), packet);
        assert!(!framer.ready());
    }

    #[test]
    fn round_trip_multiple_packets() {
        let packets: &[&[u8]] = &[b"\x14first", b"\x1esecond", b"\x1fthird"];
        let mut buf = Vec::new();
        for packet in packets {
            PacketFramer::write_frame(&mut buf, packet).unwrap();
        }

        let mut framer = PacketFramer::default();
        framer.ingest_bytes(&buf).unwrap();

        for packet in packets {
            assert_eq!(framer.pop_packet().unwrap(), *packet);
        }
        assert!(framer.pop_packet().is_none());
    }

    #[test]
    fn byte_by_byte_delivery() {
        let packet = vec![0x1f; 300];
        let mut buf = Vec::new();
        PacketFramer::write_frame(&mut buf, &packet).unwrap();

        let mut framer = PacketFramer::default();
        for (i, &byte) in buf.iter().enumerate() {
            let has_data = framer.ingest_bytes(&[byte]).unwrap();
            if i < buf.len() - 1 {
                assert!(!has_data, "should not be ready at byte {i}");
            } else {
                assert!(has_data, "should be ready after last byte");
            }
        }

        assert_eq!(framer.pop_packet().unwrap(), packet);
    }

    #[test]
    fn split_inside_length_prefix() {
        let packet = b"\x1esplit";
        let mut buf = Vec::new();
        PacketFramer::write_frame(&mut buf, packet).unwrap();
        PacketFramer::write_frame(&mut buf, packet).unwrap();

        let mut framer = PacketFramer::default();
        // First packet plus two bytes of the second prefix.
        let cut = 4 + packet.len() + 2;
        assert!(framer.ingest_bytes(&buf[..cut]).unwrap());
        assert_eq!(framer.pop_packet().unwrap(), packet);
        assert!(!framer.ingest_bytes(&buf[cut..cut + 3]).unwrap());
        assert!(framer.ingest_bytes(&buf[cut + 3..]).unwrap());
        assert_eq!(framer.pop_packet().unwrap(), packet);
    }

    #[test]
    fn empty_packet_rejected() {
        let mut buf = Vec::new();
        assert_eq!(PacketFramer::write_frame(&mut buf, b""), Err(InvalidPacket));

        let mut framer = PacketFramer::default();
        assert_eq!(framer.ingest_bytes(&[0, 0, 0, 0]), Err(InvalidPacket));
    }

    #[test]
    fn queue_limit_enforced() {
        let mut framer = PacketFramer::default();
        let mut buf = Vec::new();
        for _ in 0..=PacketFramer::PACKET_READY_MAX {
            PacketFramer::write_frame(&mut buf, b"x").unwrap();
        }
        assert!(framer.ingest_bytes(&buf).is_err());
    }

    #[test]
    fn packet_too_large() {
        let large = vec![0u8; PacketFramer::PACKET_LEN_MAX + 1];
        let mut buf = Vec::new();
        assert!(PacketFramer::write_frame(&mut buf, &large).is_err());

        let mut framer = PacketFramer::default();
        let prefix = (PacketFramer::PACKET_LEN_MAX as u32 + 1).to_be_bytes();
        assert!(framer.ingest_bytes(&prefix).is_err());
    }

    #[test]
    fn reset_discards_partial_input() {
        let mut framer = PacketFramer::default();
        framer.ingest_bytes(&[0, 0, 0, 5, 0x1e]).unwrap();
        framer.reset();

        let mut buf = Vec::new();
        PacketFramer::write_frame(&mut buf, b"\x1fok").unwrap();
        framer.ingest_bytes(&buf).unwrap();
        assert_eq!(framer.pop_packet().unwrap(), b"\x1fok");
    }
}
