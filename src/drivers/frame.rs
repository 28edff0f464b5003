use log::debug;
/// Number of float channels carried by one frame.
pub const CHANNEL_COUNT: usize = 16;
/// Marker closing every frame on the wire.
pub const TERMINATOR: [u8; 2] = [0xAA, 0xBB];
const PAYLOAD_SIZE: usize = CHANNEL_COUNT * 4;
/// 16 little-endian f32 values followed by the terminator.
pub const FRAME_SIZE: usize = PAYLOAD_SIZE + TERMINATOR.len();
/// One measurement instant across all channels.
pub type SampleSet = [f32; CHANNEL_COUNT];
/// Splits `buffer` into whole 66-byte blocks and decodes the ones ending in
/// [`TERMINATOR`]. Blocks with a bad terminator are dropped as a unit; there is
/// no byte-level realignment. Returns the decoded sets, the number of dropped
/// blocks and the unconsumed tail (always shorter than [`FRAME_SIZE`]).
pub fn decode_frames(buffer: &[u8]) -> (Vec<SampleSet>, usize, &[u8]) {
    let mut frames = Vec::with_capacity(buffer.len() / FRAME_SIZE);
    let mut dropped = 0;
    let mut chunks = buffer.chunks_exact(FRAME_SIZE);
    for chunk in &mut chunks {
        match decode_frame(chunk) {
            Some(set) => frames.push(set),
            None => dropped += 1,
        }
    }
    (frames, dropped, chunks.remainder())
}
fn decode_frame(chunk: &[u8]) -> Option<SampleSet> {
    let (payload, marker) = chunk.split_at(PAYLOAD_SIZE);
    if marker != TERMINATOR {
        return None;
    }
    let mut set = [0.0f32; CHANNEL_COUNT];
    for (value, bytes) in set.iter_mut().zip(payload.chunks_exact(4)) {
        *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    Some(set)
}
/// Append-only receive buffer that hands out complete frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    dropped: u64,
}
impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }
    /// Decodes every complete block currently buffered and keeps the remainder.
    pub fn drain_frames(&mut self) -> Vec<SampleSet> {
        if self.pending.len() < FRAME_SIZE {
            return Vec::new();
        }
        let (frames, dropped, rest) = decode_frames(&self.pending);
        let consumed = self.pending.len() - rest.len();
        if dropped > 0 {
            self.dropped += dropped as u64;
            debug!(
                "discarded {dropped} malformed frame(s), {} total",
                self.dropped
            );
        }
        self.pending.drain(..consumed);
        frames
    }
    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    /// Total number of blocks discarded for a bad terminator.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }
}
/// Serializes one sample set into the wire format.
#[cfg(test)]
pub fn encode_frame(set: &SampleSet) -> [u8; FRAME_SIZE] {
    let mut out = [0u8; FRAME_SIZE];
    for (bytes, value) in out.chunks_exact_mut(4).zip(set.iter()) {
        bytes.copy_from_slice(&value.to_le_bytes());
    }
    out[PAYLOAD_SIZE..].copy_from_slice(&TERMINATOR);
    out
}
#[cfg(test)]
mod tests {
    use super::*;
    fn ramp(offset: f32) -> SampleSet {
        let mut set = [0.0; CHANNEL_COUNT];
        for (i, v) in set.iter_mut().enumerate() {
            *v = offset + i as f32 * 0.5;
        }
        set
    }
    #[test]
    fn valid_frame_decodes_bit_for_bit() {
        let mut set = ramp(-3.25);
        set[3] = f32::MIN_POSITIVE;
        set[7] = -0.0;
        set[15] = f32::MAX;
        let bytes = encode_frame(&set);
        let (frames, dropped, rest) = decode_frames(&bytes);
        assert_eq!(dropped, 0);
        assert!(rest.is_empty());
        assert_eq!(frames.len(), 1);
        for (got, want) in frames[0].iter().zip(set.iter()) {
            assert_eq!(got.to_bits(), want.to_bits());
        }
    }
    #[test]
    fn bad_terminator_consumes_exactly_one_block() {
        let mut bytes = encode_frame(&ramp(1.0)).to_vec();
        bytes[FRAME_SIZE - 1] = 0x00;
        bytes.extend_from_slice(&[1, 2, 3]);
        let (frames, dropped, rest) = decode_frames(&bytes);
        assert!(frames.is_empty());
        assert_eq!(dropped, 1);
        assert_eq!(rest, &[1, 2, 3]);
    }
    #[test]
    fn concatenated_frames_come_out_in_order() {
        let sets: Vec<SampleSet> = (0..5).map(|k| ramp(k as f32 * 10.0)).collect();
        let stream: Vec<u8> = sets.iter().flat_map(|s| encode_frame(s)).collect();
        let (frames, dropped, rest) = decode_frames(&stream);
        assert_eq!(dropped, 0);
        assert!(rest.is_empty());
        assert_eq!(frames, sets);
    }
    #[test]
    fn short_input_is_left_untouched() {
        let bytes = encode_frame(&ramp(0.0));
        let (frames, dropped, rest) = decode_frames(&bytes[..FRAME_SIZE - 1]);
        assert!(frames.is_empty());
        assert_eq!(dropped, 0);
        assert_eq!(rest.len(), FRAME_SIZE - 1);
    }
    #[test]
    fn decoder_reassembles_frames_split_across_reads() {
        let a = encode_frame(&ramp(1.0));
        let b = encode_frame(&ramp(2.0));
        let mut decoder = FrameDecoder::new();
        decoder.extend(&a[..40]);
        assert!(decoder.drain_frames().is_empty());
        decoder.extend(&a[40..]);
        decoder.extend(&b[..10]);
        assert_eq!(decoder.drain_frames(), vec![ramp(1.0)]);
        assert_eq!(decoder.pending_len(), 10);
        decoder.extend(&b[10..]);
        assert_eq!(decoder.drain_frames(), vec![ramp(2.0)]);
        assert_eq!(decoder.pending_len(), 0);
    }
    #[test]
    fn single_lost_byte_keeps_decoder_misaligned() {
        // Dropping one byte shifts every later block; they are all discarded.
        let mut stream: Vec<u8> = Vec::new();
        for k in 0..3 {
            stream.extend_from_slice(&encode_frame(&ramp(k as f32)));
        }
        stream.remove(0);
        let mut decoder = FrameDecoder::new();
        decoder.extend(&stream);
        assert!(decoder.drain_frames().is_empty());
        assert_eq!(decoder.dropped_frames(), 2);
        assert_eq!(decoder.pending_len(), FRAME_SIZE - 1);
    }
}
