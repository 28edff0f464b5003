#[cfg(test)]
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::error::SourceError;
use crate::drivers::frame::{FrameDecoder, SampleSet, CHANNEL_COUNT, FRAME_SIZE};
/// Upper bound for a single blocking transport read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Cadence of the synthetic generator.
pub const SYNTHETIC_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Something that produces sample sets when polled from a worker thread.
///
/// `poll` may block, but never longer than [`READ_TIMEOUT`], so the caller can
/// check its stop flag between calls.
pub trait SampleSource: Send {
    fn poll(&mut self, out: &mut Vec<SampleSet>) -> Result<(), SourceError>;
    fn describe(&self) -> String;
    /// Frames thrown away so far for a bad terminator.
    fn dropped_frames(&self) -> u64 {
        0
    }
}
/// What the user asked for when pressing start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceConfig {
    pub port: String,
    pub baud_rate: u32,
    pub dummy: bool,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            dummy: true,
        }
    }
}
pub fn parse_baud_rate(raw: &str) -> Result<u32, SourceError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|baud| *baud > 0)
        .ok_or_else(|| SourceError::InvalidBaudRate(raw.to_string()))
}
/// Whether this build can talk to a real serial port.
pub fn transport_available() -> bool {
    cfg!(feature = "serial")
}
#[cfg(feature = "serial")]
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
#[cfg(not(feature = "serial"))]
pub fn available_ports() -> Vec<String> {
    Vec::new()
}
/// Picks the synthetic generator when dummy mode is on or no transport is
/// compiled in; otherwise opens the serial port.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn SampleSource>, SourceError> {
    if config.dummy || !transport_available() {
        info!("using synthetic source");
        return Ok(Box::new(SyntheticSource::new(SYNTHETIC_PERIOD)));
    }
    open_transport(config)
}
#[cfg(feature = "serial")]
fn open_transport(config: &SourceConfig) -> Result<Box<dyn SampleSource>, SourceError> {
    let port = serialport::new(config.port.as_str(), config.baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| SourceError::Open {
            port: config.port.clone(),
            source,
        })?;
    info!("opened {} at {} baud", config.port, config.baud_rate);
    Ok(Box::new(TransportSource::new(port, config.port.clone())))
}
#[cfg(not(feature = "serial"))]
fn open_transport(_config: &SourceConfig) -> Result<Box<dyn SampleSource>, SourceError> {
    Ok(Box::new(SyntheticSource::new(SYNTHETIC_PERIOD)))
}
/// Reads raw bytes from a transport and decodes them into frames.
/// The transport is released when the source is dropped.
#[cfg_attr(not(feature = "serial"), allow(dead_code))]
pub struct TransportSource<R> {
    reader: R,
    name: String,
    decoder: FrameDecoder,
    scratch: [u8; FRAME_SIZE],
}
#[cfg_attr(not(feature = "serial"), allow(dead_code))]
impl<R: Read + Send> TransportSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            decoder: FrameDecoder::new(),
            scratch: [0u8; FRAME_SIZE],
        }
    }
}
impl<R: Read + Send> SampleSource for TransportSource<R> {
    fn poll(&mut self, out: &mut Vec<SampleSet>) -> Result<(), SourceError> {
        match self.reader.read(&mut self.scratch) {
            Ok(0) => return Ok(()),
            Ok(n) => self.decoder.extend(&self.scratch[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                return Ok(())
            }
            Err(e) => return Err(SourceError::Read(e)),
        }
        out.extend(self.decoder.drain_frames());
        Ok(())
    }
    fn describe(&self) -> String {
        format!("serial {}", self.name)
    }
    fn dropped_frames(&self) -> u64 {
        self.decoder.dropped_frames()
    }
}
/// Emits uniformly random values in `[0, 10)` once per period.
pub struct SyntheticSource {
    rng: StdRng,
    period: Duration,
}
impl SyntheticSource {
    pub fn new(period: Duration) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            period,
        }
    }
    #[cfg(test)]
    pub fn with_seed(period: Duration, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            period,
        }
    }
    fn next_set(&mut self) -> SampleSet {
        let mut set = [0.0f32; CHANNEL_COUNT];
        for value in set.iter_mut() {
            *value = self.rng.gen_range(0.0..10.0);
        }
        set
    }
}
impl SampleSource for SyntheticSource {
    fn poll(&mut self, out: &mut Vec<SampleSet>) -> Result<(), SourceError> {
        out.push(self.next_set());
        thread::sleep(self.period);
        Ok(())
    }
    fn describe(&self) -> String {
        "synthetic".to_string()
    }
}
/// In-memory source for deterministic playback in tests.
#[cfg(test)]
pub struct ManualSource {
    queue: VecDeque<SampleSet>,
    idle: Duration,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(sets: impl IntoIterator<Item = SampleSet>) -> Self {
        Self {
            queue: sets.into_iter().collect(),
            idle: Duration::from_millis(5),
        }
    }
}
#[cfg(test)]
impl SampleSource for ManualSource {
    fn poll(&mut self, out: &mut Vec<SampleSet>) -> Result<(), SourceError> {
        match self.queue.pop_front() {
            Some(set) => out.push(set),
            None => thread::sleep(self.idle),
        }
        Ok(())
    }
    fn describe(&self) -> String {
        "manual".to_string()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::frame::encode_frame;
    use std::io;
    /// Hands out its bytes in fixed-size pieces, then reports timeouts.
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }
    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(io::Error::new(ErrorKind::TimedOut, "timeout"));
            }
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
    struct BrokenReader;
    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
        }
    }
    #[test]
    fn transport_decodes_frames_across_partial_reads() {
        let a = [1.5f32; CHANNEL_COUNT];
        let b = [-2.0f32; CHANNEL_COUNT];
        let mut data = encode_frame(&a).to_vec();
        data.extend_from_slice(&encode_frame(&b));
        let reader = ChunkedReader {
            data,
            pos: 0,
            chunk: 7,
        };
        let mut source = TransportSource::new(reader, "mock");
        let mut out = Vec::new();
        for _ in 0..40 {
            source.poll(&mut out).unwrap();
        }
        assert_eq!(out, vec![a, b]);
        assert_eq!(source.dropped_frames(), 0);
    }
    #[test]
    fn transport_timeout_is_not_an_error() {
        let reader = ChunkedReader {
            data: Vec::new(),
            pos: 0,
            chunk: 1,
        };
        let mut source = TransportSource::new(reader, "mock");
        let mut out = Vec::new();
        source.poll(&mut out).unwrap();
        assert!(out.is_empty());
    }
    #[test]
    fn transport_surfaces_hard_read_errors() {
        let mut source = TransportSource::new(BrokenReader, "mock");
        let mut out = Vec::new();
        assert!(matches!(source.poll(&mut out), Err(SourceError::Read(_))));
    }
    #[test]
    fn synthetic_values_stay_in_range() {
        let mut source = SyntheticSource::with_seed(Duration::ZERO, 7);
        let mut out = Vec::new();
        for _ in 0..200 {
            source.poll(&mut out).unwrap();
        }
        assert_eq!(out.len(), 200);
        assert!(out
            .iter()
            .flat_map(|set| set.iter())
            .all(|v| (0.0..10.0).contains(v)));
    }
    #[test]
    fn dummy_flag_selects_synthetic_source() {
        let config = SourceConfig {
            port: "/dev/does-not-exist".into(),
            baud_rate: 9600,
            dummy: true,
        };
        let source = open_source(&config).unwrap();
        assert_eq!(source.describe(), "synthetic");
    }
    #[cfg(feature = "serial")]
    #[test]
    fn missing_port_is_an_open_error() {
        let config = SourceConfig {
            port: "/dev/does-not-exist-uart-visualizer".into(),
            baud_rate: 9600,
            dummy: false,
        };
        assert!(matches!(
            open_source(&config),
            Err(SourceError::Open { .. })
        ));
    }
    #[test]
    fn baud_rate_must_be_a_positive_integer() {
        assert_eq!(parse_baud_rate(" 115200 ").unwrap(), 115_200);
        assert!(matches!(
            parse_baud_rate("fast"),
            Err(SourceError::InvalidBaudRate(_))
        ));
        assert!(parse_baud_rate("0").is_err());
    }
}
