//! Pixel encodings and size-based format detection.
//!
//! Source files carry no header, so the only thing we can go on is the file
//! length. A file must be exactly `pixels * 2` or `pixels * 3` bytes long;
//! anything else is rejected rather than cropped or padded.

/// Bytes per pixel inferred from a file size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BytesPerPixel {
    Two,
    Three,
    Unknown,
}

impl BytesPerPixel {
    #[inline]
    pub fn as_usize(self) -> Option<usize> {
        match self {
            BytesPerPixel::Two => Some(2),
            BytesPerPixel::Three => Some(3),
            BytesPerPixel::Unknown => None,
        }
    }
}

/// Channel order inside a packed 16-bit word.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Encoding of a whole source, decided once when the stream starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelEncoding {
    /// 16-bit little-endian 5-6-5 words.
    Rgb565Le { order: ChannelOrder },
    /// One byte per channel, R then G then B.
    Rgb888,
    Unknown,
}

impl PixelEncoding {
    /// Map a detection result onto an encoding. `order` only matters for
    /// 16-bit sources; it comes from the panel configuration.
    pub fn from_bpp(bpp: BytesPerPixel, order: ChannelOrder) -> Self {
        match bpp {
            BytesPerPixel::Two => PixelEncoding::Rgb565Le { order },
            BytesPerPixel::Three => PixelEncoding::Rgb888,
            BytesPerPixel::Unknown => PixelEncoding::Unknown,
        }
    }

    /// Stride of one pixel in the source, `None` for `Unknown`.
    #[inline]
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelEncoding::Rgb565Le { .. } => Some(2),
            PixelEncoding::Rgb888 => Some(3),
            PixelEncoding::Unknown => None,
        }
    }
}

/// Infer bytes-per-pixel from `size_bytes` for a frame of `pixel_count` pixels.
///
/// Exact match only. Overflowing products and a zero pixel count both give
/// `Unknown`.
pub fn detect(size_bytes: u64, pixel_count: u64) -> BytesPerPixel {
    if pixel_count == 0 {
        return BytesPerPixel::Unknown;
    }
    if pixel_count.checked_mul(2) == Some(size_bytes) {
        BytesPerPixel::Two
    } else if pixel_count.checked_mul(3) == Some(size_bytes) {
        BytesPerPixel::Three
    } else {
        BytesPerPixel::Unknown
    }
}
