// CO5300 AMOLED panel as a streaming pixel sink (Standard SPI mode, no D/C pin).
//
// Wiring on Waveshare ESP32-S3 Touch AMOLED 1.43" (CO5300):
//   CS  = GPIO9
//   SCK = GPIO10
//   IO0/MOSI = GPIO11
//   (IO1..IO3 unused in Standard SPI mode)
//   RST = GPIO21
//
// Protocol (Standard SPI):
//   Every write begins with 0x02, then one byte CMD, then N data bytes.
//   Example: [0x02, 0x11] -> Sleep Out
//            [0x02, 0x3A, 0x77] -> Pixel Format = 24bpp (RGB888)
//
// Pixel data goes out in chunks: the first chunk of a window with RAMWR,
// every following one with RAMWRC so the controller keeps its GRAM address.
// No framebuffer is kept; frames are streamed straight from storage.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::{
    digital::OutputPin,
    spi::{Operation, SpiDevice},
};

use crate::config::{PanelConfig, TransferLimits};
use crate::error::PlanError;
use crate::panel::{rect_corners, stream_fill, PixelSink};

const RAMWR_OPCODE: u8 = 0x2C;
const RAMWRC_OPCODE: u8 = 0x3C;
const COLMOD_RGB888: u8 = 0x77;

/// Error type that wraps SPI and GPIO errors.
#[derive(Debug)]
pub enum Co5300Error<SpiE, GpioE> {
    Spi(SpiE),
    Gpio(GpioE),
    /// SPI bus or DMA buffers could not be configured.
    Setup,
    OutOfBounds,
    ChunkTooLarge { len: usize, max: usize },
    Plan(PlanError),
}

impl<SpiE, GpioE> From<PlanError> for Co5300Error<SpiE, GpioE> {
    fn from(e: PlanError) -> Self { Self::Plan(e) }
}

pub struct Co5300Display<SPI, RST> {
    spi: SPI,
    rst: Option<RST>,
    cfg: PanelConfig,
    // next pixel write opens the window (RAMWR) instead of continuing it
    first: bool,
}

impl<SPI, RST> Co5300Display<SPI, RST>
where
    // embedded-hal 1.0 `SpiDevice<u8>` so we can do atomic CS-asserted transfers.
    SPI: SpiDevice<u8>,
    RST: OutputPin,
{
    /// Create + init the panel. Call once at startup.
    ///
    /// * `spi` - an SPI device with CS control (e.g., `embedded_hal_bus::spi::ExclusiveDevice`)
    /// * `rst` - optional reset pin (recommended to wire)
    /// * `delay` - any `DelayNs` impl (spin delay is fine)
    /// * `cfg` - geometry, RAM offsets and DMA limits, normally `PanelConfig::CO5300_466X466`
    pub fn new(
        spi: SPI,
        rst: Option<RST>,
        delay: &mut impl embedded_hal::delay::DelayNs,
        cfg: PanelConfig,
    ) -> Result<Self, Co5300Error<SPI::Error, RST::Error>> {
        // Refuse a config the planner can't chunk before touching the bus
        cfg.validate(3)?;

        let mut this = Self { spi, rst, cfg, first: true };

        // Hard reset sequence
        if let Some(r) = this.rst.as_mut() {
            r.set_high().map_err(Co5300Error::Gpio)?;
            delay.delay_ms(2);
            r.set_low().map_err(Co5300Error::Gpio)?;
            delay.delay_ms(80);
            r.set_high().map_err(Co5300Error::Gpio)?;
            delay.delay_ms(200);
        }

        // SW reset + settle
        this.cmd(0x01, &[])?; // SWRESET
        delay.delay_ms(150);

        // Sleep out + settle
        this.cmd(0x11, &[])?;
        delay.delay_ms(180);

        // 24-bit pixels, the panel keeps the top 6 bits of each channel
        this.cmd(0x3A, &[COLMOD_RGB888])?;
        delay.delay_ms(2);

        this.cmd(0xC4, &[0x80])?;
        this.cmd(0x13, &[])?; // NORMAL DISPLAY MODE

        this.cmd(0x53, &[0x20])?; // BCTRL
        delay.delay_ms(1);
        this.cmd(0x63, &[0xFF])?; // vendor enable
        delay.delay_ms(1);
        this.cmd(0x51, &[0x00])?; // brightness 0 while turning on
        delay.delay_ms(1);

        // Display ON + longer settle before any RAMWR
        this.cmd(0x29, &[])?;
        delay.delay_ms(200);

        this.cmd(0x51, &[0xFF])?;
        this.cmd(0x36, &[0x00])?; // MADCTL

        let (w, h) = (this.cfg.width, this.cfg.height);
        this.set_window(0, 0, w - 1, h - 1)?;
        Ok(this)
    }

    pub fn set_brightness(&mut self, bright: u8) -> Result<(), Co5300Error<SPI::Error, RST::Error>> {
        self.cmd(0x51, &[bright])
    }

    pub fn display_off(&mut self) -> Result<(), Co5300Error<SPI::Error, RST::Error>> {
        self.cmd(0x28, &[])
    }

    pub fn display_on(&mut self) -> Result<(), Co5300Error<SPI::Error, RST::Error>> {
        self.cmd(0x29, &[])
    }

    // ---- Low-level helpers ----

    #[esp_hal::ram] // run from IRAM
    fn cmd(&mut self, cmd: u8, data: &[u8]) -> Result<(), Co5300Error<SPI::Error, RST::Error>> {
        let hdr: [u8; 4] = [0x02, 0x00, cmd, 0x00];
        if data.is_empty() {
            self.spi.write(&hdr).map_err(Co5300Error::Spi)
        } else {
            self.spi
                .transaction(&mut [Operation::Write(&hdr), Operation::Write(data)])
                .map_err(Co5300Error::Spi)
        }
    }
}

impl<SPI, RST> PixelSink for Co5300Display<SPI, RST>
where
    SPI: SpiDevice<u8>,
    RST: OutputPin,
{
    type Error = Co5300Error<SPI::Error, RST::Error>;

    fn size(&self) -> (u16, u16) {
        (self.cfg.width, self.cfg.height)
    }

    fn limits(&self) -> TransferLimits {
        self.cfg.limits()
    }

    #[esp_hal::ram]
    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error> {
        if x0 > x1 || y0 > y1 || x1 >= self.cfg.width || y1 >= self.cfg.height {
            return Err(Co5300Error::OutOfBounds);
        }

        // Apply panel offsets
        let x0p = x0 + self.cfg.x_offset;
        let x1p = x1 + self.cfg.x_offset;
        let y0p = y0 + self.cfg.y_offset;
        let y1p = y1 + self.cfg.y_offset;

        let ca = [(x0p >> 8) as u8, (x0p & 0xFF) as u8, (x1p >> 8) as u8, (x1p & 0xFF) as u8];
        let ra = [(y0p >> 8) as u8, (y0p & 0xFF) as u8, (y1p >> 8) as u8, (y1p & 0xFF) as u8];

        self.cmd(0x2A, &ca)?;
        self.cmd(0x2B, &ra)?;
        self.first = true;
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), Self::Error> {
        self.first = true;
        Ok(())
    }

    #[esp_hal::ram]
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let max = self.cfg.max_chunk_bytes;
        if bytes.len() > max {
            return Err(Co5300Error::ChunkTooLarge { len: bytes.len(), max });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let cmd = if self.first { RAMWR_OPCODE } else { RAMWRC_OPCODE };
        let hdr: [u8; 4] = [0x02, 0x00, cmd, 0x00];

        let mut ops: heapless::Vec<Operation<'_, u8>, 2> = heapless::Vec::new();
        ops.push(Operation::Write(&hdr)).ok();
        ops.push(Operation::Write(bytes)).ok();
        self.spi.transaction(&mut ops).map_err(Co5300Error::Spi)?;

        self.first = false;
        Ok(())
    }

    fn fill_solid(&mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb888) -> Result<(), Self::Error> {
        let (pw, ph) = self.size();
        let (x1, y1) = rect_corners(x, y, w, h, pw, ph).ok_or(Co5300Error::OutOfBounds)?;
        self.set_window(x, y, x1, y1)?;
        self.begin_write()?;
        stream_fill(self, (w as usize) * (h as usize), color)
    }
}
