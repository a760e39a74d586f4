/// Calculates the 6-bit sum checksum appended to SCIP2.0 response lines.
///
/// The sensor sums the payload bytes, keeps the low 6 bits and maps the
/// result into the printable range by adding 0x30. The algorithm is
/// reverse-engineered from observed behavior rather than documented, and a
/// corrupted payload has a 1-in-64 chance of producing the same checksum;
/// validation failure is reliable evidence of corruption, validation
/// success is not proof of integrity.
pub struct Checksum {
    current: u8,
}

impl Checksum {
    /// Creates a new `Checksum` instance, initialized to 0.
    #[inline]
    pub fn new() -> Checksum {
        Checksum { current: 0 }
    }

    /// Includes a slice of bytes in the checksum calculation.
    #[inline]
    pub fn push_slice(&mut self, data: &[u8]) {
        for d in data {
            self.current = self.current.wrapping_add(*d);
        }
    }

    /// Returns the checksum byte for the bytes pushed so far.
    #[inline]
    pub fn checksum(&self) -> u8 {
        (self.current & 0x3f) + 0x30
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a response line payload against its claimed checksum byte.
///
/// The payload is every byte of the framed line except the trailing
/// checksum byte itself. The device does not checksum command echo or
/// initial status lines, so callers apply this only to lines past the
/// third of an exchange.
pub fn validate(payload: &[u8], claimed: u8) -> bool {
    let mut checksum = Checksum::new();
    checksum.push_slice(payload);
    checksum.checksum() == claimed
}
