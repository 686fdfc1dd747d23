#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod frame;
pub mod panel;
pub mod plan;
pub mod pump;
pub mod quantize;
pub mod storage;

#[cfg(feature = "esp32s3-disp143Oled")]
pub mod co5300;
#[cfg(feature = "esp32s3-disp143Oled")]
pub mod display;
#[cfg(feature = "esp32s3-disp143Oled")]
pub mod wiring;

pub use config::PanelConfig;
pub use error::{FrameError, PlanError, PumpError};
pub use format::{detect, BytesPerPixel, ChannelOrder, PixelEncoding};
pub use plan::{plan, TransferPlan};
pub use pump::{StreamOutcome, StreamPump, StreamResult, Transform};
