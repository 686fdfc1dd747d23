//! SD Frame Stream
//! ========================================
//! needs to be run in WSL2 terminal
//! source ~/export-esp.sh
//! cargo run --release --features esp32s3-disp143Oled
//! ========================================
//!
//! Cycles full-screen raw frames onto the CO5300 panel, one every few
//! seconds. Frames are streamed in DMA-sized chunks; nothing the size of a
//! frame is ever buffered on the display side.

//% CHIPS: esp32s3
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of the binary.
// This is used by the bootloader to verify the application.
// The macro automatically fills in the fields.
esp_bootloader_esp_idf::esp_app_desc!();

use sd_frame_stream::{
    display::setup_display,
    frame::{FrameCycler, PANEL_BYTES_PER_PIXEL},
    panel::PixelSink,
    storage::SliceStorage,
    wiring::{init_board_pins, BoardPins},
    PanelConfig, StreamPump,
};

use esp_backtrace as _;
use esp_hal::{delay::Delay, main, psram, Config};

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::IntoStorage;
use log::{error, info, LevelFilter};

// Allocator for PSRAM
extern crate alloc;
use alloc::{boxed::Box, vec, vec::Vec};

const FRAME_PERIOD_MS: u32 = 3000;

const FRAME_PATHS: [&str; 2] = ["FRAMES/GRAD565.RAW", "FRAMES/BARS888.RAW"];

// Diagonal RGB565 gradient, little-endian words.
fn gradient_rgb565(w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h * 2);
    for y in 0..h {
        for x in 0..w {
            let r = (x * 31 / (w - 1)) as u8;
            let g = ((x + y) * 63 / (w + h - 2)) as u8;
            let b = (y * 31 / (h - 1)) as u8;
            out.extend_from_slice(&Rgb565::new(r, g, b).into_storage().to_le_bytes());
        }
    }
    out
}

// Eight vertical color bars, RGB888.
fn bars_rgb888(w: usize, h: usize) -> Vec<u8> {
    const BARS: [[u8; 3]; 8] = [
        [255, 255, 255], [255, 255, 0], [0, 255, 255], [0, 255, 0],
        [255, 0, 255], [255, 0, 0], [0, 0, 255], [0, 0, 0],
    ];
    let mut out = Vec::with_capacity(w * h * 3);
    for _ in 0..h {
        for x in 0..w {
            out.extend_from_slice(&BARS[x * BARS.len() / w]);
        }
    }
    out
}

#[main]
fn main() -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);

    // Initialize peripherals
    let peripherals = esp_hal::init(Config::default());

    esp_alloc::psram_allocator!(&peripherals.PSRAM, psram);

    let cfg = PanelConfig::board();
    // Bad limits are fatal here, never mid-stream
    let full = match cfg.validate(PANEL_BYTES_PER_PIXEL) {
        Ok(p) => p,
        Err(e) => panic!("panel config rejected: {e}"),
    };
    info!(
        "panel {}x{}: {} chunks of {} bytes per frame",
        cfg.width, cfg.height, full.total_chunks(), full.chunk_size_bytes
    );

    let BoardPins { display_pins } = init_board_pins(peripherals);

    let mut display = match setup_display(display_pins, cfg) {
        Ok(d) => d,
        Err(e) => panic!("CO5300 init failed: {e:?}"),
    };
    if let Err(e) = display.fill_solid(0, 0, cfg.width, cfg.height, Rgb888::new(0, 0, 0)) {
        error!("clear failed: {e:?}");
    }

    // Demo frames in PSRAM, named like the files on the card
    let (w, h) = (cfg.width as usize, cfg.height as usize);
    let grad: &'static [u8] = Box::leak(gradient_rgb565(w, h).into_boxed_slice());
    let bars: &'static [u8] = Box::leak(bars_rgb888(w, h).into_boxed_slice());
    let files: &'static [(&'static str, &'static [u8])] =
        Box::leak(Box::new([(FRAME_PATHS[0], grad), (FRAME_PATHS[1], bars)]));
    let mut storage = SliceStorage::new(files);

    // One read block and one conversion block, both sized to the transfer ceiling
    let block: &'static mut [u8] = Box::leak(vec![0u8; cfg.max_chunk_bytes].into_boxed_slice());
    let scratch: &'static mut [u8] = Box::leak(vec![0u8; cfg.max_chunk_bytes].into_boxed_slice());
    let mut pump = StreamPump::new(block, scratch);

    let mut cycler = FrameCycler::new(&FRAME_PATHS);
    let delay = Delay::new();

    loop {
        match cycler.show_next(&mut storage, &mut display, &cfg, &mut pump) {
            Ok(Some((path, bytes))) => info!("showing {path} ({bytes} bytes)"),
            Ok(None) => {
                error!("no displayable frames");
                if let Err(e) = display.fill_solid(0, 0, cfg.width, cfg.height, Rgb888::new(255, 0, 0)) {
                    error!("red fill failed: {e:?}");
                }
            }
            Err(e) => error!("frame failed: {e:?}"),
        }
        delay.delay_millis(FRAME_PERIOD_MS);
    }
}
