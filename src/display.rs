//! Display bring-up for the CO5300 board.
//
// - `setup_display` powers the panel, builds the DMA SPI bus and inits the
//   controller in 24-bit mode.
// - The DMA TX buffer is larger than one planned chunk, so every pixel write
//   is a single transfer.

use esp_backtrace as _;

use esp_hal::{
    dma::{DmaRxBuf, DmaTxBuf},
    dma_buffers,
    gpio::Output,
    spi::master::{Config, Spi, SpiDmaBus},
    spi::Mode,
    time::Rate,
    Blocking,
};

use embedded_hal::delay::DelayNs;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};

use crate::co5300::{Co5300Display, Co5300Error};
use crate::config::PanelConfig;
use crate::wiring::DisplayPins;

// A tiny busy-wait delay that satisfies embedded-hal 1.0 DelayNs.
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    #[inline]
    fn delay_ns(&mut self, ns: u32) {
        let mut n = ns / 50 + 1;
        while n != 0 { core::hint::spin_loop(); n -= 1; }
    }
    #[inline]
    fn delay_us(&mut self, us: u32) { for _ in 0..us { self.delay_ns(1_000); } }
    #[inline]
    fn delay_ms(&mut self, ms: u32) { for _ in 0..ms { self.delay_us(1_000); } }
}

pub type SpiDev<'a> = ExclusiveDevice<SpiDmaBus<'a, Blocking>, Output<'a>, NoDelay>;

pub type DisplayType<'a> = Co5300Display<SpiDev<'a>, Output<'a>>;

pub type DisplayError<'a> = Co5300Error<
    <SpiDev<'a> as embedded_hal::spi::ErrorType>::Error,
    core::convert::Infallible,
>;

pub fn setup_display<'a>(
    display_pins: DisplayPins<'a>,
    cfg: PanelConfig,
) -> Result<DisplayType<'a>, DisplayError<'a>> {
    let DisplayPins { spi2, cs, clk, do0, rst, mut en, dma_ch0 } = display_pins;

    let mut delay = SpinDelay;

    // quick toggle EN pin so the panel rails come up clean
    en.set_low();
    delay.delay_ms(10);
    en.set_high();
    delay.delay_ms(100);

    // 60 MHz, Mode 0; 40 MHz is the known-stable fallback
    let spi = Spi::new(
        spi2,
        Config::default()
            .with_frequency(Rate::from_hz(60_000_000))
            .with_mode(Mode::_0),
    )
    .map_err(|_| Co5300Error::Setup)?
    .with_sck(clk)
    .with_mosi(do0)
    .with_dma(dma_ch0);

    let (rx_buf, rx_desc, tx_buf, tx_desc) = dma_buffers!(4096, 65536);
    let rx = DmaRxBuf::new(rx_desc, rx_buf).map_err(|_| Co5300Error::Setup)?;
    let tx = DmaTxBuf::new(tx_desc, tx_buf).map_err(|_| Co5300Error::Setup)?;

    let spi_bus: SpiDmaBus<'_, Blocking> = spi.with_buffers(rx, tx);
    let spi_dev = ExclusiveDevice::new(spi_bus, cs, NoDelay).map_err(Co5300Error::Gpio)?;

    Co5300Display::new(spi_dev, Some(rst), &mut delay, cfg)
}
