//! Block pump: read a block, convert it if needed, write it, repeat.
//!
//! One block is in flight at a time. The pump owns no memory of its own; it
//! borrows a read block and a conversion scratch buffer from the caller, which
//! on the board are leaked once at boot next to the framebuffer.

use log::trace;

use crate::convert::{convert_into, converted_len};
use crate::error::PumpError;
use crate::format::{ChannelOrder, PixelEncoding};

/// Result of one read request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// `n` bytes were placed at the start of the buffer. `Data(0)` is a
    /// misbehaving source and stops the stream.
    Data(usize),
    End,
}

pub trait BlockSource {
    type Error;
    fn read_block(&mut self, buf: &mut [u8]) -> Result<Block, Self::Error>;
}

pub trait BlockSink {
    type Error;
    fn write_block(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Per-block conversion, picked once per stream from the source encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Send bytes as they are, trimming a trailing partial pixel.
    Passthrough { bytes_per_pixel: usize },
    Rgb565ToRgb888(ChannelOrder),
}

impl Transform {
    pub fn for_encoding(encoding: PixelEncoding) -> Option<Self> {
        match encoding {
            PixelEncoding::Rgb565Le { order } => Some(Transform::Rgb565ToRgb888(order)),
            PixelEncoding::Rgb888 => Some(Transform::Passthrough { bytes_per_pixel: 3 }),
            PixelEncoding::Unknown => None,
        }
    }

    #[inline]
    pub fn output_len(&self, input_len: usize) -> usize {
        match *self {
            Transform::Passthrough { bytes_per_pixel } => {
                input_len - input_len % bytes_per_pixel.max(1)
            }
            Transform::Rgb565ToRgb888(_) => converted_len(input_len),
        }
    }

    /// Source bytes per pixel. Every block except the last must be a whole
    /// number of these.
    #[inline]
    pub fn input_stride(&self) -> usize {
        match *self {
            Transform::Passthrough { bytes_per_pixel } => bytes_per_pixel.max(1),
            Transform::Rgb565ToRgb888(_) => 2,
        }
    }

    /// Scratch bytes needed to transform a block of `input_len` bytes.
    #[inline]
    pub fn scratch_len(&self, input_len: usize) -> usize {
        match self {
            Transform::Passthrough { .. } => 0,
            Transform::Rgb565ToRgb888(_) => converted_len(input_len),
        }
    }

    fn apply<'a>(&self, input: &'a [u8], scratch: &'a mut [u8]) -> &'a [u8] {
        match *self {
            Transform::Passthrough { .. } => &input[..self.output_len(input.len())],
            Transform::Rgb565ToRgb888(order) => {
                let n = convert_into(input, order, scratch);
                &scratch[..n]
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StreamOutcome<R, W> {
    Completed,
    /// The source ended before `expected` bytes were read.
    ShortRead { expected: u64, received: u64 },
    IoError(PumpError<R, W>),
}

#[derive(Debug, PartialEq, Eq)]
pub struct StreamResult<R, W> {
    /// Bytes accepted by the sink, after transformation.
    pub bytes_transferred: u64,
    pub outcome: StreamOutcome<R, W>,
}

impl<R, W> StreamResult<R, W> {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, StreamOutcome::Completed)
    }
}

pub struct StreamPump<'b> {
    block: &'b mut [u8],
    scratch: &'b mut [u8],
}

impl<'b> StreamPump<'b> {
    /// `block` bounds the read size; `scratch` receives converted pixels and
    /// may be empty when only passthrough streams are pumped.
    pub fn new(block: &'b mut [u8], scratch: &'b mut [u8]) -> Self {
        Self { block, scratch }
    }

    /// Pump until the source reports end of stream.
    pub fn pump<S, K>(
        &mut self,
        source: &mut S,
        chunk_size_bytes: usize,
        transform: Transform,
        sink: &mut K,
    ) -> StreamResult<S::Error, K::Error>
    where
        S: BlockSource,
        K: BlockSink,
    {
        self.run(source, chunk_size_bytes, transform, sink, None)
    }

    /// Pump exactly `expected_bytes` source bytes. Reads never ask for more,
    /// and an early end of stream is reported as a short read.
    pub fn pump_exact<S, K>(
        &mut self,
        source: &mut S,
        expected_bytes: u64,
        chunk_size_bytes: usize,
        transform: Transform,
        sink: &mut K,
    ) -> StreamResult<S::Error, K::Error>
    where
        S: BlockSource,
        K: BlockSink,
    {
        self.run(source, chunk_size_bytes, transform, sink, Some(expected_bytes))
    }

    fn run<S, K>(
        &mut self,
        source: &mut S,
        chunk_size_bytes: usize,
        transform: Transform,
        sink: &mut K,
        limit: Option<u64>,
    ) -> StreamResult<S::Error, K::Error>
    where
        S: BlockSource,
        K: BlockSink,
    {
        let Self { block, scratch } = self;
        let mut written = 0u64;
        let mut received = 0u64;

        let done = |written: u64, outcome: StreamOutcome<S::Error, K::Error>| StreamResult {
            bytes_transferred: written,
            outcome,
        };

        if chunk_size_bytes == 0 || chunk_size_bytes > block.len() {
            return done(
                0,
                StreamOutcome::IoError(PumpError::BufferTooSmall {
                    needed: chunk_size_bytes.max(1),
                    available: block.len(),
                }),
            );
        }
        // a block boundary inside a pixel would shift every later pixel
        let stride = transform.input_stride();
        if chunk_size_bytes % stride != 0 {
            return done(
                0,
                StreamOutcome::IoError(PumpError::MisalignedChunk { chunk_size_bytes, stride }),
            );
        }
        let need_scratch = transform.scratch_len(chunk_size_bytes);
        if need_scratch > scratch.len() {
            return done(
                0,
                StreamOutcome::IoError(PumpError::BufferTooSmall {
                    needed: need_scratch,
                    available: scratch.len(),
                }),
            );
        }

        loop {
            let want = match limit {
                Some(l) => (l - received).min(chunk_size_bytes as u64) as usize,
                None => chunk_size_bytes,
            };
            if want == 0 {
                return done(written, StreamOutcome::Completed);
            }

            // READING
            let mut filled = 0usize;
            let mut ended = false;
            while filled < want {
                match source.read_block(&mut block[filled..want]) {
                    Ok(Block::Data(0)) => {
                        return done(written, StreamOutcome::IoError(PumpError::EmptyRead));
                    }
                    Ok(Block::Data(n)) => filled += n.min(want - filled),
                    Ok(Block::End) => {
                        ended = true;
                        break;
                    }
                    Err(e) => {
                        return done(written, StreamOutcome::IoError(PumpError::Read(e)));
                    }
                }
            }
            received += filled as u64;

            // TRANSFORMING + WRITING
            if filled > 0 {
                let out = transform.apply(&block[..filled], scratch);
                if !out.is_empty() {
                    if let Err(e) = sink.write_block(out) {
                        return done(written, StreamOutcome::IoError(PumpError::Write(e)));
                    }
                    written += out.len() as u64;
                    trace!("pump: {} in, {} out, {} total", filled, out.len(), written);
                }
            }

            if ended {
                return match limit {
                    Some(expected) if received < expected => {
                        done(written, StreamOutcome::ShortRead { expected, received })
                    }
                    _ => done(written, StreamOutcome::Completed),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves `data` in pieces of at most `step` bytes, optionally failing
    /// once `fail_at` bytes have been served.
    struct Script {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        fail_at: Option<usize>,
        reads: usize,
    }

    impl Script {
        fn new(data: Vec<u8>) -> Self {
            Self { data, pos: 0, step: usize::MAX, fail_at: None, reads: 0 }
        }
    }

    impl BlockSource for Script {
        type Error = &'static str;
        fn read_block(&mut self, buf: &mut [u8]) -> Result<Block, Self::Error> {
            self.reads += 1;
            if self.fail_at == Some(self.pos) {
                return Err("card removed");
            }
            let left = self.data.len() - self.pos;
            if left == 0 {
                return Ok(Block::End);
            }
            let mut n = buf.len().min(left).min(self.step);
            if let Some(f) = self.fail_at {
                if f > self.pos {
                    n = n.min(f - self.pos);
                }
            }
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(Block::Data(n))
        }
    }

    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        fail_on: Option<usize>,
    }

    impl BlockSink for Recorder {
        type Error = u8;
        fn write_block(&mut self, bytes: &[u8]) -> Result<(), u8> {
            if self.fail_on == Some(self.writes.len()) {
                return Err(0xEE);
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    fn rgb565_source(pixels: usize) -> Vec<u8> {
        (0..pixels).flat_map(|i| (0xF800u16 >> (i % 3)).to_le_bytes()).collect()
    }

    #[test]
    fn twelve_bytes_in_eight_byte_chunks() {
        let mut src = Script::new(rgb565_source(6));
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 8], [0u8; 12]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 8, Transform::Rgb565ToRgb888(ChannelOrder::Rgb), &mut sink);

        assert_eq!(res.outcome, StreamOutcome::Completed);
        assert_eq!(sink.writes.len(), 2);
        assert_eq!(sink.writes[0].len(), 12);
        assert_eq!(sink.writes[1].len(), 6);
        assert_eq!(res.bytes_transferred, 18);
        let expected = crate::convert::convert(&rgb565_source(6), ChannelOrder::Rgb);
        assert_eq!(sink.writes.concat(), expected);
    }

    #[test]
    fn passthrough_forwards_blocks_unchanged() {
        let data: Vec<u8> = (0..30u8).collect();
        let mut src = Script::new(data.clone());
        let mut sink = Recorder::default();
        let mut block = [0u8; 12];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump(&mut src, 12, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);

        assert!(res.is_completed());
        assert_eq!(sink.writes.iter().map(Vec::len).collect::<Vec<_>>(), [12, 12, 6]);
        assert_eq!(sink.writes.concat(), data);
        assert_eq!(res.bytes_transferred, 30);
    }

    #[test]
    fn trickling_source_still_fills_whole_blocks() {
        let mut src = Script::new(rgb565_source(8));
        src.step = 3;
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 8], [0u8; 12]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 8, Transform::Rgb565ToRgb888(ChannelOrder::Bgr), &mut sink);

        assert!(res.is_completed());
        assert!(sink.writes.iter().all(|w| w.len() == 12));
        assert_eq!(res.bytes_transferred, 24);
    }

    #[test]
    fn read_error_counts_only_written_bytes() {
        let mut src = Script::new(rgb565_source(8));
        src.fail_at = Some(12);
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 8], [0u8; 12]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 8, Transform::Rgb565ToRgb888(ChannelOrder::Rgb), &mut sink);

        // first block written, second block half-read then failed
        assert_eq!(res.outcome, StreamOutcome::IoError(PumpError::Read("card removed")));
        assert_eq!(res.bytes_transferred, 12);
        assert_eq!(sink.writes.len(), 1);
    }

    #[test]
    fn write_error_stops_the_stream() {
        let mut src = Script::new(vec![0u8; 36]);
        let mut sink = Recorder { fail_on: Some(1), ..Default::default() };
        let mut block = [0u8; 12];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump(&mut src, 12, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);

        assert_eq!(res.outcome, StreamOutcome::IoError(PumpError::Write(0xEE)));
        assert_eq!(res.bytes_transferred, 12);
        assert_eq!(src.pos, 24, "no reads after the failed write");
    }

    #[test]
    fn empty_read_is_an_error() {
        struct Stalled;
        impl BlockSource for Stalled {
            type Error = ();
            fn read_block(&mut self, _: &mut [u8]) -> Result<Block, ()> {
                Ok(Block::Data(0))
            }
        }
        let mut sink = Recorder::default();
        let mut block = [0u8; 4];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);
        let res = pump.pump(&mut Stalled, 3, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);
        assert_eq!(res.outcome, StreamOutcome::IoError(PumpError::EmptyRead));
        assert_eq!(res.bytes_transferred, 0);
    }

    #[test]
    fn exact_pump_reports_short_source() {
        let mut src = Script::new(vec![7u8; 20]);
        let mut sink = Recorder::default();
        let mut block = [0u8; 9];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump_exact(&mut src, 27, 9, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);

        assert_eq!(res.outcome, StreamOutcome::ShortRead { expected: 27, received: 20 });
        // 9 + 9 + trimmed 2-byte tail
        assert_eq!(res.bytes_transferred, 18);
    }

    #[test]
    fn exact_pump_never_reads_past_the_frame() {
        let mut src = Script::new(vec![1u8; 40]);
        let mut sink = Recorder::default();
        let mut block = [0u8; 8];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump_exact(&mut src, 20, 8, Transform::Passthrough { bytes_per_pixel: 2 }, &mut sink);

        assert!(res.is_completed());
        assert_eq!(src.pos, 20);
        assert_eq!(res.bytes_transferred, 20);
        assert_eq!(sink.writes.iter().map(Vec::len).collect::<Vec<_>>(), [8, 8, 4]);
    }

    #[test]
    fn chunks_that_split_a_pixel_are_rejected() {
        let mut src = Script::new((0..24u8).collect());
        let mut sink = Recorder::default();
        let mut block = [0u8; 8];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump(&mut src, 8, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);

        assert_eq!(
            res.outcome,
            StreamOutcome::IoError(PumpError::MisalignedChunk { chunk_size_bytes: 8, stride: 3 })
        );
        assert_eq!(res.bytes_transferred, 0);
        assert_eq!(src.reads, 0);
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn odd_chunks_are_rejected_for_rgb565() {
        let mut src = Script::new([0x1F, 0x00].repeat(4));
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 3], [0u8; 3]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 3, Transform::Rgb565ToRgb888(ChannelOrder::Rgb), &mut sink);

        assert_eq!(
            res.outcome,
            StreamOutcome::IoError(PumpError::MisalignedChunk { chunk_size_bytes: 3, stride: 2 })
        );
        assert_eq!(src.reads, 0);
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn only_the_final_partial_pixel_is_dropped() {
        // 8 whole pixels plus 2 stray bytes, delivered one byte at a time
        let data: Vec<u8> = (0..26u8).collect();
        let mut src = Script::new(data.clone());
        src.step = 1;
        let mut sink = Recorder::default();
        let mut block = [0u8; 9];
        let mut none = [0u8; 0];
        let mut pump = StreamPump::new(&mut block, &mut none);

        let res = pump.pump(&mut src, 9, Transform::Passthrough { bytes_per_pixel: 3 }, &mut sink);

        assert!(res.is_completed());
        assert_eq!(sink.writes.concat(), &data[..24]);
        assert_eq!(res.bytes_transferred, 24);

        let mut src = Script::new([0x1F, 0x00].repeat(4));
        src.step = 1;
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 4], [0u8; 6]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 4, Transform::Rgb565ToRgb888(ChannelOrder::Rgb), &mut sink);

        assert!(res.is_completed());
        assert_eq!(sink.writes.concat(), [0u8, 0, 255].repeat(4));
    }

    #[test]
    fn undersized_buffers_are_rejected_up_front() {
        let mut src = Script::new(vec![0u8; 16]);
        let mut sink = Recorder::default();
        let (mut block, mut scratch) = ([0u8; 8], [0u8; 6]);
        let mut pump = StreamPump::new(&mut block, &mut scratch);

        let res = pump.pump(&mut src, 16, Transform::Passthrough { bytes_per_pixel: 2 }, &mut sink);
        assert_eq!(
            res.outcome,
            StreamOutcome::IoError(PumpError::BufferTooSmall { needed: 16, available: 8 })
        );

        let res = pump.pump(&mut src, 8, Transform::Rgb565ToRgb888(ChannelOrder::Rgb), &mut sink);
        assert_eq!(
            res.outcome,
            StreamOutcome::IoError(PumpError::BufferTooSmall { needed: 12, available: 6 })
        );
        assert_eq!(src.reads, 0);
    }
}
