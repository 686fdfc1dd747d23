//! Panel geometry and transport limits.
//!
//! Everything that used to be a loose constant (panel size, offsets, transfer
//! ceiling) lives here and is handed to the planner and the transport when
//! they are built. Pick a preset with Cargo features, see `PanelConfig::board`.

use crate::error::PlanError;
use crate::format::ChannelOrder;
use crate::plan::{plan, TransferPlan};

/// Largest single write a transport accepts and the boundary it must be
/// aligned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferLimits {
    pub max_chunk_bytes: usize,
    pub alignment_bytes: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PanelConfig {
    pub width: u16,
    pub height: u16,
    /// Controller RAM offset of column 0 / row 0.
    pub x_offset: u16,
    pub y_offset: u16,
    pub max_chunk_bytes: usize,
    pub alignment_bytes: usize,
    /// Channel order of 16-bit source files.
    pub source_order: ChannelOrder,
}

// 32736 = 32 * 1023
const CO5300_DMA_CHUNK: usize = 32 * 1023;

cfg_if::cfg_if! {
    if #[cfg(feature = "esp32s3-disp143Oled")] {
        const BOARD: PanelConfig = PanelConfig::CO5300_466X466;
    } else if #[cfg(feature = "ili9341-fixed")] {
        const BOARD: PanelConfig = PanelConfig::ILI9341_FIXED_4092;
    } else {
        const BOARD: PanelConfig = PanelConfig::ILI9341_320X240;
    }
}

impl PanelConfig {
    /// 320x240 ILI9341-class panel, word-aligned DMA up to 4 KiB.
    pub const ILI9341_320X240: PanelConfig = PanelConfig {
        width: 320,
        height: 240,
        x_offset: 0,
        y_offset: 0,
        max_chunk_bytes: 4096,
        alignment_bytes: 4,
        source_order: ChannelOrder::Rgb,
    };

    /// Same panel with the old fixed 4092-byte transfers.
    pub const ILI9341_FIXED_4092: PanelConfig = PanelConfig {
        max_chunk_bytes: 4092,
        alignment_bytes: 1,
        ..PanelConfig::ILI9341_320X240
    };

    /// Waveshare 1.43" AMOLED, CO5300 controller. Column RAM starts at 6.
    pub const CO5300_466X466: PanelConfig = PanelConfig {
        width: 466,
        height: 466,
        x_offset: 0x0006,
        y_offset: 0x0000,
        max_chunk_bytes: CO5300_DMA_CHUNK,
        alignment_bytes: 32,
        source_order: ChannelOrder::Rgb,
    };

    /// Preset for the board selected at build time.
    pub const fn board() -> PanelConfig {
        BOARD
    }

    #[inline]
    pub const fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub const fn limits(&self) -> TransferLimits {
        TransferLimits {
            max_chunk_bytes: self.max_chunk_bytes,
            alignment_bytes: self.alignment_bytes,
        }
    }

    pub const fn with_source_order(mut self, order: ChannelOrder) -> Self {
        self.source_order = order;
        self
    }

    /// Plan a full-frame transfer of `bytes_per_pixel` output pixels. Call
    /// once at startup so a bad preset fails before any frame is touched.
    pub fn validate(&self, bytes_per_pixel: usize) -> Result<TransferPlan, PlanError> {
        plan(
            self.pixel_count(),
            bytes_per_pixel,
            self.max_chunk_bytes,
            self.alignment_bytes,
        )
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig::board()
    }
}
