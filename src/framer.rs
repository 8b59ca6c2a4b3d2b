use crate::packet::Packet;

/// Reassembles fixed-size tap packets from arbitrarily sized byte chunks.
///
/// The tap transport delivers whatever happens to be buffered, so chunk
/// boundaries land anywhere. `Framer` buffers the 0-5 trailing bytes that do
/// not yet form a full packet and prepends them to the next [`Framer::feed`]
/// call. No byte is ever skipped or reordered and no short packet is ever
/// emitted.
///
/// The framer validates only length alignment, not content. There is no
/// resynchronization marker in the stream: if the transport drops a byte,
/// every subsequent packet is misframed and the framer cannot detect it.
///
/// # Example
/// ```
/// use spitap::Framer;
///
/// let mut framer = Framer::default();
/// assert_eq!(framer.feed(&[1, 2, 3, 4]).count(), 0);
/// let packets: Vec<_> = framer.feed(&[5, 6, 7]).collect();
/// assert_eq!(packets[0].data, [1, 2, 3, 4, 5, 6]);
/// assert_eq!(framer.pending(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Framer {
    buf: Vec<u8>,
    pos: usize,
}

impl Framer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and iterate over the complete packets now available.
    ///
    /// The iterator is lazy and finite; dropping it early leaves the
    /// remaining packets buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> PacketIter<'_> {
        // Discard bytes consumed by previous iterations before growing.
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
        PacketIter { framer: self }
    }

    /// Number of carried-over bytes (0-5, or more if a previous `feed`
    /// iterator was dropped before being exhausted).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Iterator over the complete packets currently buffered in a [`Framer`].
/// Created by [`Framer::feed`].
pub struct PacketIter<'a> {
    framer: &'a mut Framer,
}

impl Iterator for PacketIter<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Self::Item> {
        let framer = &mut self.framer;
        let packet = Packet::decode(&framer.buf[framer.pos..])?;
        framer.pos += Packet::LEN;
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn whole_packets_in_one_chunk() {
        let dat = seq(Packet::LEN * 3);
        let mut framer = Framer::new();
        let packets: Vec<Packet> = framer.feed(&dat).collect();
        assert_eq!(packets.len(), 3);
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.data, dat[i * Packet::LEN..(i + 1) * Packet::LEN]);
        }
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn carry_across_feeds() {
        let dat = seq(Packet::LEN * 2);
        let mut framer = Framer::new();
        assert_eq!(framer.feed(&dat[..5]).count(), 0);
        assert_eq!(framer.pending(), 5);
        let packets: Vec<Packet> = framer.feed(&dat[5..]).collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data, dat[..Packet::LEN]);
        assert_eq!(packets[1].data, dat[Packet::LEN..]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn byte_at_a_time() {
        let dat = seq(Packet::LEN * 4);
        let mut framer = Framer::new();
        let mut packets: Vec<Packet> = Vec::new();
        for b in &dat {
            packets.extend(framer.feed(std::slice::from_ref(b)));
        }
        assert_eq!(packets.len(), 4);
        let joined: Vec<u8> = packets.iter().flat_map(|p| p.data).collect();
        assert_eq!(joined, dat);
    }

    #[test]
    fn every_split_point_of_two_packets() {
        let dat = seq(Packet::LEN * 2);
        for split in 0..=dat.len() {
            let mut framer = Framer::new();
            let mut packets: Vec<Packet> = framer.feed(&dat[..split]).collect();
            packets.extend(framer.feed(&dat[split..]));
            let joined: Vec<u8> = packets.iter().flat_map(|p| p.data).collect();
            assert_eq!(joined, dat, "split at {split}");
            assert_eq!(framer.pending(), 0);
        }
    }

    #[test]
    fn random_chunking_preserves_stream() {
        use rand::Rng;
        let dat = seq(Packet::LEN * 64);
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let mut framer = Framer::new();
            let mut packets: Vec<Packet> = Vec::new();
            let mut rest = &dat[..];
            while !rest.is_empty() {
                let n = rng.gen_range(1..=rest.len());
                packets.extend(framer.feed(&rest[..n]));
                rest = &rest[n..];
            }
            assert_eq!(packets.len(), 64);
            let joined: Vec<u8> = packets.iter().flat_map(|p| p.data).collect();
            assert_eq!(joined, dat);
        }
    }

    #[test]
    fn dropped_iterator_keeps_remainder() {
        let dat = seq(Packet::LEN * 3);
        let mut framer = Framer::new();
        {
            let mut iter = framer.feed(&dat);
            let first = iter.next().unwrap();
            assert_eq!(first.data, dat[..Packet::LEN]);
        }
        let rest: Vec<Packet> = framer.feed(&[]).collect();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].data, dat[Packet::LEN..2 * Packet::LEN]);
    }
}
