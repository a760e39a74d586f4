//! Six-bit ASCII decoding for SCIP2.0 data payloads.
//!
//! Distances and timestamps arrive packed 6 bits per byte, offset into the
//! printable range by 0x30. A distance is one 3-byte unit (18 bits), the
//! capture timestamp one 4-byte unit (24 bits). Units do not respect line
//! boundaries; [`Carry`] holds the leftover bytes of a unit that straddles
//! two data lines.

use crate::internals::DISTANCE_UNIT_WIDTH;
use std::cmp::min;

/// Decodes one complete encoding unit, left to right.
///
/// Each byte contributes its low 6 bits after the 0x30 offset is removed;
/// a 3-byte unit yields an 18-bit value, a 4-byte unit a 24-bit one.
pub fn decode(unit: &[u8]) -> i64 {
    let mut value: i64 = 0;
    for byte in unit {
        value = (value << 6) | i64::from(byte.wrapping_sub(0x30) & 0x3f);
    }
    value
}

/// Leftover bytes of a distance unit that did not complete within one data
/// line.
///
/// Owned by exactly one in-progress capture decode; a new capture always
/// starts with an empty carry, so a failed exchange can never bleed bytes
/// into the next one.
#[derive(Debug, Default)]
pub struct Carry {
    bytes: [u8; DISTANCE_UNIT_WIDTH],
    len: usize,
}

impl Carry {
    /// Creates an empty carry.
    pub fn new() -> Carry {
        Carry::default()
    }

    /// Returns `true` if no partial unit is pending.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Feeds one data-line payload through the carry.
    ///
    /// A pending partial unit is completed from the head of the payload
    /// first; then every whole unit in the remainder is decoded; whatever
    /// is left (0..2 bytes) becomes the new carry. `sink` is invoked once
    /// per decoded value, in order. A payload too short to complete the
    /// pending unit is absorbed whole and decoding resumes on the next
    /// line.
    pub fn feed(&mut self, payload: &[u8], mut sink: impl FnMut(i64)) {
        let mut rest = payload;

        if self.len > 0 {
            let take = min(DISTANCE_UNIT_WIDTH - self.len, rest.len());
            self.bytes[self.len..self.len + take].copy_from_slice(&rest[..take]);
            self.len += take;
            rest = &rest[take..];

            if self.len < DISTANCE_UNIT_WIDTH {
                return;
            }
            sink(decode(&self.bytes));
            self.len = 0;
        }

        let mut units = rest.chunks_exact(DISTANCE_UNIT_WIDTH);
        for unit in &mut units {
            sink(decode(unit));
        }

        let remainder = units.remainder();
        self.bytes[..remainder.len()].copy_from_slice(remainder);
        self.len = remainder.len();
    }
}
