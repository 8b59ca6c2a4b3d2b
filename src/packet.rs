use serde::{Deserialize, Serialize};

/// Frequency represented by one tick of the tap's 13-bit counter, per the
/// FPGA design (2^17 Hz).
pub const FREQ_HZ_PER_TICK: u64 = 131_072;

/// One 48-bit big-endian sample record produced by the bus tap.
///
/// Bit layout (bit 47 = MSB):
///
/// | bits  | field    |
/// |-------|----------|
/// | 47    | MISO     |
/// | 46    | MOSI     |
/// | 45    | CS       |
/// | 44-32 | FREQ13   |
/// | 31-0  | reserved |
///
/// # Example
/// ```
/// use spitap::Packet;
///
/// let packet = Packet::decode(&[0xff; 6]).unwrap();
/// let sample = packet.sample();
/// assert_eq!(sample.mosi, 1);
/// assert_eq!(sample.freq_hz, 1_073_610_752);
/// ```
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: [u8; Packet::LEN],
}

impl Packet {
    /// Size of a tap packet in bytes.
    pub const LEN: usize = 6;

    /// Construct from the provided bytes, or `None` if there are not enough
    /// bytes. Extra bytes past [`Packet::LEN`] are ignored.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        let mut data = [0u8; Self::LEN];
        data.copy_from_slice(&dat[..Self::LEN]);
        Some(Packet { data })
    }

    /// The packet as an unsigned 48-bit big-endian integer.
    #[must_use]
    pub fn value(&self) -> u64 {
        let d = &self.data;
        u64::from_be_bytes([0, 0, d[0], d[1], d[2], d[3], d[4], d[5]])
    }

    /// Extract the line states and frequency field. Infallible; any 6-byte
    /// value is a valid bit pattern.
    #[must_use]
    pub fn sample(&self) -> Sample {
        let value = self.value();
        Sample {
            miso: ((value >> 47) & 0x1) as u8,
            mosi: ((value >> 46) & 0x1) as u8,
            cs: ((value >> 45) & 0x1) as u8,
            freq_hz: ((value >> 32) & 0x1fff) * FREQ_HZ_PER_TICK,
        }
    }
}

/// Decoded per-cycle line states and clock frequency.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Sample {
    pub miso: u8,
    pub mosi: u8,
    pub cs: u8,
    /// Sampled clock frequency in Hz, already scaled by
    /// [`FREQ_HZ_PER_TICK`]. Integer until display.
    pub freq_hz: u64,
}

impl Sample {
    /// Frequency in MHz, for presentation only.
    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_hz as f64 / 1e6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_requires_six_bytes() {
        assert!(Packet::decode(&[0u8; 5]).is_none());
        assert!(Packet::decode(&[0u8; 6]).is_some());
    }

    #[test]
    fn all_ones_packet() {
        let packet = Packet::decode(&[0xff; 6]).unwrap();
        let sample = packet.sample();
        assert_eq!(sample.miso, 1);
        assert_eq!(sample.mosi, 1);
        assert_eq!(sample.cs, 1);
        // FREQ13 = 0x1fff = 8191 ticks
        assert_eq!(sample.freq_hz, 8191 * FREQ_HZ_PER_TICK);
        assert_eq!(sample.freq_hz, 1_073_610_752);
    }

    #[test]
    fn all_zeros_packet() {
        let sample = Packet::decode(&[0u8; 6]).unwrap().sample();
        assert_eq!(sample.miso, 0);
        assert_eq!(sample.mosi, 0);
        assert_eq!(sample.cs, 0);
        assert_eq!(sample.freq_hz, 0);
        assert_eq!(sample.freq_mhz(), 0.0);
    }

    #[test]
    fn line_bits_are_distinct() {
        // bit 47
        let s = Packet::decode(&[0x80, 0, 0, 0, 0, 0]).unwrap().sample();
        assert_eq!((s.miso, s.mosi, s.cs), (1, 0, 0));
        // bit 46
        let s = Packet::decode(&[0x40, 0, 0, 0, 0, 0]).unwrap().sample();
        assert_eq!((s.miso, s.mosi, s.cs), (0, 1, 0));
        // bit 45
        let s = Packet::decode(&[0x20, 0, 0, 0, 0, 0]).unwrap().sample();
        assert_eq!((s.miso, s.mosi, s.cs), (0, 0, 1));
    }

    #[test]
    fn reserved_bits_ignored() {
        let sample = Packet::decode(&[0, 0, 0xff, 0xff, 0xff, 0xff])
            .unwrap()
            .sample();
        assert_eq!(sample.freq_hz, 0);
        assert_eq!((sample.miso, sample.mosi, sample.cs), (0, 0, 0));
    }
}
