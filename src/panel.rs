//! Display transport: address window + chunked RAM writes.
//!
//! `PixelSink` is what the frame driver talks to. `SpiPanel` implements it for
//! the usual MIPI-DCS controllers wired with a D/C pin (ILI9341, ST7789 and
//! friends) in 18-bit mode, where every pixel is three bytes on the wire.
//! Init sequences are the caller's business; the panel is assumed to be awake
//! and in RGB666 (COLMOD 0x66) when handed over.

use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::{digital::OutputPin, spi::SpiDevice};

use crate::config::{PanelConfig, TransferLimits};
use crate::error::PlanError;
use crate::plan::plan;
use crate::pump::BlockSink;
use crate::quantize::{fill_pattern, repeat_pattern};

const CASET: u8 = 0x2A;
const PASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;

// Stack buffer for solid fills, 256 pixels of RGB666.
const FILL_BUF: usize = 3 * 256;

pub trait PixelSink {
    type Error;

    /// Panel size in pixels.
    fn size(&self) -> (u16, u16);

    fn limits(&self) -> TransferLimits;

    /// Prime the controller for writes into the inclusive rectangle.
    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error>;

    fn begin_write(&mut self) -> Result<(), Self::Error>;

    /// Write one chunk of raster-order pixel bytes into the open window.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    fn fill_solid(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb888) -> Result<(), Self::Error>;
}

/// Borrow a sink as a pump destination.
pub struct SinkWriter<'p, P>(pub &'p mut P);

impl<P: PixelSink> BlockSink for SinkWriter<'_, P> {
    type Error = P::Error;

    #[inline]
    fn write_block(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write(bytes)
    }
}

/// Inclusive corners of a `w` x `h` rectangle at `(x, y)`, or `None` if it
/// does not fit on a `pw` x `ph` panel. Overflow-safe.
pub(crate) fn rect_corners(x: u16, y: u16, w: u16, h: u16, pw: u16, ph: u16) -> Option<(u16, u16)> {
    let (x0, y0, w32, h32) = (x as u32, y as u32, w as u32, h as u32);
    if w == 0 || h == 0 || x0 + w32 > pw as u32 || y0 + h32 > ph as u32 {
        return None;
    }
    Some(((x0 + w32 - 1) as u16, (y0 + h32 - 1) as u16))
}

/// Repeat the quantized `color` over `pixels` pixels of an already open
/// window, in planner-sized chunks.
pub(crate) fn stream_fill<P>(sink: &mut P, pixels: usize, color: Rgb888) -> Result<(), P::Error>
where
    P: PixelSink,
    P::Error: From<PlanError>,
{
    let limits = sink.limits();
    let stride = limits.alignment_bytes.saturating_mul(3);
    // alignments wider than the stack buffer get exactly one stride per write
    let ceiling = if stride <= FILL_BUF {
        limits.max_chunk_bytes.min(FILL_BUF)
    } else {
        limits.max_chunk_bytes.min(stride)
    };
    let p = plan(pixels, 3, ceiling, limits.alignment_bytes)?;

    let mut stack = [0u8; FILL_BUF];
    let mut heap: Vec<u8> = Vec::new();
    let buf: &mut [u8] = if p.chunk_size_bytes <= FILL_BUF {
        &mut stack[..p.chunk_size_bytes]
    } else {
        heap.resize(p.chunk_size_bytes, 0);
        &mut heap
    };
    repeat_pattern(buf, fill_pattern(color));
    for px in p.chunks() {
        sink.write(&buf[..px * 3])?;
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum PanelError<SpiE, PinE> {
    Spi(SpiE),
    Pin(PinE),
    OutOfBounds,
    /// `write` before `begin_write`, or after the window moved.
    NotWriting,
    ChunkTooLarge { len: usize, max: usize },
    Plan(PlanError),
}

impl<SpiE, PinE> From<PlanError> for PanelError<SpiE, PinE> {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

pub struct SpiPanel<SPI, DC> {
    spi: SPI,
    dc: DC,
    cfg: PanelConfig,
    writing: bool,
}

impl<SPI, DC> SpiPanel<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, cfg: PanelConfig) -> Self {
        Self { spi, dc, cfg, writing: false }
    }

    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    fn cmd(&mut self, cmd: u8, data: &[u8]) -> Result<(), PanelError<SPI::Error, DC::Error>> {
        self.dc.set_low().map_err(PanelError::Pin)?;
        self.spi.write(&[cmd]).map_err(PanelError::Spi)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(PanelError::Pin)?;
            self.spi.write(data).map_err(PanelError::Spi)?;
        }
        Ok(())
    }
}

impl<SPI, DC> PixelSink for SpiPanel<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    type Error = PanelError<SPI::Error, DC::Error>;

    fn size(&self) -> (u16, u16) {
        (self.cfg.width, self.cfg.height)
    }

    fn limits(&self) -> TransferLimits {
        self.cfg.limits()
    }

    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error> {
        if x0 > x1 || y0 > y1 || x1 >= self.cfg.width || y1 >= self.cfg.height {
            return Err(PanelError::OutOfBounds);
        }
        self.writing = false;

        let (x0, x1) = (x0 + self.cfg.x_offset, x1 + self.cfg.x_offset);
        let (y0, y1) = (y0 + self.cfg.y_offset, y1 + self.cfg.y_offset);
        let [a, b] = x0.to_be_bytes();
        let [c, d] = x1.to_be_bytes();
        self.cmd(CASET, &[a, b, c, d])?;
        let [a, b] = y0.to_be_bytes();
        let [c, d] = y1.to_be_bytes();
        self.cmd(PASET, &[a, b, c, d])
    }

    fn begin_write(&mut self) -> Result<(), Self::Error> {
        self.cmd(RAMWR, &[])?;
        // data phase from here on
        self.dc.set_high().map_err(PanelError::Pin)?;
        self.writing = true;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if !self.writing {
            return Err(PanelError::NotWriting);
        }
        let max = self.cfg.max_chunk_bytes;
        if bytes.len() > max {
            return Err(PanelError::ChunkTooLarge { len: bytes.len(), max });
        }
        self.spi.write(bytes).map_err(PanelError::Spi)
    }

    fn fill_solid(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb888) -> Result<(), Self::Error> {
        let (pw, ph) = self.size();
        let (x1, y1) = rect_corners(x, y, w, h, pw, ph).ok_or(PanelError::OutOfBounds)?;
        self.set_window(x, y, x1, y1)?;
        self.begin_write()?;
        stream_fill(self, (w as usize) * (h as usize), color)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{Bus, Wire};
    use super::*;

    fn panel(bus: &Bus) -> SpiPanel<mock::MockSpi, mock::MockDc> {
        SpiPanel::new(bus.spi(), bus.dc(), PanelConfig::ILI9341_320X240)
    }

    #[test]
    fn window_is_sent_big_endian() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        p.set_window(0, 0, 319, 239).unwrap();
        assert_eq!(
            bus.take(),
            [
                Wire::Cmd(CASET),
                Wire::Data(vec![0x00, 0x00, 0x01, 0x3F]),
                Wire::Cmd(PASET),
                Wire::Data(vec![0x00, 0x00, 0x00, 0xEF]),
            ]
        );
    }

    #[test]
    fn window_applies_offsets() {
        let bus = Bus::default();
        let cfg = PanelConfig { x_offset: 6, y_offset: 2, ..PanelConfig::ILI9341_320X240 };
        let mut p = SpiPanel::new(bus.spi(), bus.dc(), cfg);
        p.set_window(1, 1, 2, 2).unwrap();
        let log = bus.take();
        assert_eq!(log[1], Wire::Data(vec![0, 7, 0, 8]));
        assert_eq!(log[3], Wire::Data(vec![0, 3, 0, 4]));
    }

    #[test]
    fn bad_windows_are_rejected() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        assert_eq!(p.set_window(0, 0, 320, 10), Err(PanelError::OutOfBounds));
        assert_eq!(p.set_window(5, 0, 4, 10), Err(PanelError::OutOfBounds));
        assert!(bus.take().is_empty());
    }

    #[test]
    fn writes_need_an_open_ram_write() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        assert_eq!(p.write(&[1, 2, 3]), Err(PanelError::NotWriting));
        p.set_window(0, 0, 0, 0).unwrap();
        p.begin_write().unwrap();
        p.write(&[1, 2, 3]).unwrap();
        assert_eq!(bus.ram(), [1, 2, 3]);
        // moving the window closes the write
        p.set_window(0, 0, 0, 0).unwrap();
        assert_eq!(p.write(&[1, 2, 3]), Err(PanelError::NotWriting));
    }

    #[test]
    fn oversize_chunks_are_refused() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        p.set_window(0, 0, 319, 239).unwrap();
        p.begin_write().unwrap();
        let big = vec![0u8; 4097];
        assert_eq!(
            p.write(&big),
            Err(PanelError::ChunkTooLarge { len: 4097, max: 4096 })
        );
    }

    #[test]
    fn fill_is_quantized_and_chunked() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        p.fill_solid(10, 10, 20, 20, Rgb888::new(0xFF, 0x81, 0x02)).unwrap();

        let ram = bus.ram();
        assert_eq!(ram.len(), 20 * 20 * 3);
        assert!(ram.chunks(3).all(|px| px == [0xFC, 0x80, 0x00]));

        let writes: Vec<usize> = bus
            .take()
            .into_iter()
            .skip_while(|w| *w != Wire::Cmd(RAMWR))
            .filter_map(|w| match w {
                Wire::Data(d) => Some(d.len()),
                Wire::Cmd(_) => None,
            })
            .collect();
        // 768-byte chunks floored to 12-byte stride, then the tail
        assert!(writes.iter().all(|&n| n <= 768));
        assert!(writes[..writes.len() - 1].iter().all(|&n| n % 12 == 0));
        assert_eq!(writes.iter().sum::<usize>(), 1200);
    }

    #[test]
    fn fill_with_wide_alignment_writes_whole_strides() {
        let bus = Bus::default();
        // 900-byte stride does not fit the stack buffer
        let cfg = PanelConfig { max_chunk_bytes: 1800, alignment_bytes: 300, ..PanelConfig::ILI9341_320X240 };
        cfg.validate(3).unwrap();
        let mut p = SpiPanel::new(bus.spi(), bus.dc(), cfg);
        p.fill_solid(0, 0, 20, 20, Rgb888::new(0xFF, 0x81, 0x02)).unwrap();

        let ram = bus.ram();
        assert_eq!(ram.len(), 1200);
        assert!(ram.chunks(3).all(|px| px == [0xFC, 0x80, 0x00]));

        let writes: Vec<usize> = bus
            .take()
            .into_iter()
            .skip_while(|w| *w != Wire::Cmd(RAMWR))
            .filter_map(|w| match w {
                Wire::Data(d) => Some(d.len()),
                Wire::Cmd(_) => None,
            })
            .collect();
        assert_eq!(writes, [900, 300]);
    }

    #[test]
    fn fill_outside_the_panel_is_rejected() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        assert_eq!(
            p.fill_solid(300, 0, 21, 1, Rgb888::new(0, 0, 0)),
            Err(PanelError::OutOfBounds)
        );
        assert_eq!(p.fill_solid(0, 0, 0, 1, Rgb888::new(0, 0, 0)), Err(PanelError::OutOfBounds));
    }

    #[test]
    fn sink_writer_forwards_to_the_panel() {
        let bus = Bus::default();
        let mut p = panel(&bus);
        p.set_window(0, 0, 1, 0).unwrap();
        p.begin_write().unwrap();
        SinkWriter(&mut p).write_block(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(bus.ram(), [1, 2, 3, 4, 5, 6]);
    }
}
