//! 8-bit to 6-bit channel quantization for solid fills.
//!
//! Streamed RGB888 data is sent untouched and the controller drops the low
//! bits itself; fills are quantized up front so the repeated pattern matches
//! what the panel will actually show.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

const RGB666_MASK: u8 = 0xFC;

/// Keep the top six bits of each channel.
#[inline]
pub const fn quantize(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    (r & RGB666_MASK, g & RGB666_MASK, b & RGB666_MASK)
}

/// Quantized 3-byte wire pattern for one pixel of `color`.
#[inline]
pub fn fill_pattern(color: Rgb888) -> [u8; 3] {
    let (r, g, b) = quantize(color.r(), color.g(), color.b());
    [r, g, b]
}

/// Fill `buf` with as many whole copies of `pattern` as fit, returning the
/// number of bytes filled.
pub fn repeat_pattern(buf: &mut [u8], pattern: [u8; 3]) -> usize {
    let mut filled = 0usize;
    for px in buf.chunks_exact_mut(3) {
        px.copy_from_slice(&pattern);
        filled += 3;
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_low_two_bits() {
        assert_eq!(quantize(0xFF, 0x80, 0x03), (0xFC, 0x80, 0x00));
        assert_eq!(quantize(0x07, 0x0B, 0xFE), (0x04, 0x08, 0xFC));
    }

    #[test]
    fn is_idempotent() {
        for c in 0..=u8::MAX {
            let (q, _, _) = quantize(c, 0, 0);
            assert_eq!(quantize(q, q, q), (q, q, q));
            assert!(q <= c);
        }
    }

    #[test]
    fn pattern_repeats_whole_pixels_only() {
        let mut buf = [0u8; 8];
        let n = repeat_pattern(&mut buf, fill_pattern(Rgb888::new(0x13, 0x57, 0x9B)));
        assert_eq!(n, 6);
        assert_eq!(buf, [0x10, 0x54, 0x98, 0x10, 0x54, 0x98, 0, 0]);
    }
}
