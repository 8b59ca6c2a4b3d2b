/// Rebuilds the ASCII message the transmitter clocks out one MOSI bit per
/// bus cycle.
///
/// Bits accumulate MSB-first; every 8th bit completes a byte which is
/// mapped to a display character and appended to the materialized text.
/// Printable ASCII (32-126) maps to itself, everything else to `'.'`.
///
/// Fewer than 8 leftover bits stay buffered until more bits arrive, until
/// [`MessageAssembler::flush`] zero-pads them into a final character (the
/// fixed-window end-of-cycle rule), or until [`MessageAssembler::reset`]
/// discards them (the target-match rule). The two policies intentionally
/// disagree about leftover bits; both behaviors are kept.
#[derive(Debug, Default, Clone)]
pub struct MessageAssembler {
    acc: u8,
    nbits: u8,
    text: String,
}

/// Display mapping for a decoded message byte.
#[must_use]
pub fn display_char(byte: u8) -> char {
    if (32..=126).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

impl MessageAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit (any non-zero `bit` counts as 1). Returns the
    /// completed character when this bit was the 8th of a byte.
    pub fn push_bit(&mut self, bit: u8) -> Option<char> {
        self.acc = (self.acc << 1) | u8::from(bit != 0);
        self.nbits += 1;
        if self.nbits < 8 {
            return None;
        }
        let c = display_char(self.acc);
        self.text.push(c);
        self.acc = 0;
        self.nbits = 0;
        Some(c)
    }

    /// The message materialized so far. Read-only; leftover bits are not
    /// included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of buffered bits not yet forming a byte (0-7).
    #[must_use]
    pub fn pending_bits(&self) -> u8 {
        self.nbits
    }

    /// Substring test against the materialized text.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.text.contains(target)
    }

    /// Zero-pad any leftover bits into one final character. Returns the
    /// character, or `None` if no bits were pending.
    pub fn flush(&mut self) -> Option<char> {
        if self.nbits == 0 {
            return None;
        }
        let byte = self.acc << (8 - self.nbits);
        let c = display_char(byte);
        self.text.push(c);
        self.acc = 0;
        self.nbits = 0;
        Some(c)
    }

    /// Clear leftover bits and materialized text. Idempotent.
    pub fn reset(&mut self) {
        self.acc = 0;
        self.nbits = 0;
        self.text.clear();
    }
}
