// Board-specific pin mappings for the Waveshare ESP32-S3 Touch AMOLED 1.43".
//! The following wiring is assumed:
//! - LCD CS   => GPIO9
//! - LCD SCK  => GPIO10
//! - LCD MOSI => GPIO11 (IO0, Standard SPI mode)
//! - LCD RST  => GPIO21
//! - LCD EN   => GPIO42 (panel power enable)

use esp_hal::{
    gpio::{Level, Output, OutputConfig},
    peripherals::{Peripherals, DMA_CH0, GPIO10, GPIO11, SPI2},
};

pub struct DisplayPins<'a> {
    pub spi2: SPI2<'a>,
    pub cs: Output<'a>,
    pub clk: GPIO10<'a>,
    pub do0: GPIO11<'a>,
    pub rst: Output<'a>,
    pub en: Output<'a>,
    pub dma_ch0: DMA_CH0<'a>,
}

pub struct BoardPins<'a> {
    pub display_pins: DisplayPins<'a>,
}

pub fn init_board_pins<'a>(p: Peripherals) -> BoardPins<'a> {
    // LCD control pins; GPIO10/11 stay raw for the SPI SCK/MOSI
    let cs  = Output::new(p.GPIO9,  Level::High, OutputConfig::default());
    let rst = Output::new(p.GPIO21, Level::High, OutputConfig::default());
    let en  = Output::new(p.GPIO42, Level::Low,  OutputConfig::default());

    BoardPins {
        display_pins: DisplayPins {
            spi2: p.SPI2,
            cs,
            clk: p.GPIO10,
            do0: p.GPIO11,
            rst,
            en,
            dma_ch0: p.DMA_CH0,
        },
    }
}
