//! RGB565 (little-endian) to RGB888 expansion.
//!
//! Channels are widened by bit replication: the top bits of each channel are
//! copied into the freed low bits, so 0x1F becomes 0xFF rather than 0xF8.

use alloc::vec::Vec;

use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

use crate::format::ChannelOrder;

/// Output bytes produced for `input_len` input bytes. A trailing odd byte is
/// not a pixel and produces nothing.
#[inline]
pub const fn converted_len(input_len: usize) -> usize {
    input_len / 2 * 3
}

#[inline(always)]
const fn expand5(c: u8) -> u8 {
    (c << 3) | (c >> 2)
}

#[inline(always)]
const fn expand6(c: u8) -> u8 {
    (c << 2) | (c >> 4)
}

/// Expand one 16-bit word to three bytes in the requested order.
#[inline]
pub fn expand_rgb565(v: u16, order: ChannelOrder) -> [u8; 3] {
    let c = Rgb565::from(RawU16::new(v));
    let (r, g, b) = (expand5(c.r()), expand6(c.g()), expand5(c.b()));
    match order {
        ChannelOrder::Rgb => [r, g, b],
        ChannelOrder::Bgr => [b, g, r],
    }
}

/// Convert `src` into `dst`, returning the number of bytes written.
///
/// Stops at whichever runs out first: input pixels or room for a whole
/// output pixel in `dst`.
pub fn convert_into(src: &[u8], order: ChannelOrder, dst: &mut [u8]) -> usize {
    let mut written = 0usize;
    for (px, out) in src.chunks_exact(2).zip(dst.chunks_exact_mut(3)) {
        let v = u16::from_le_bytes([px[0], px[1]]);
        out.copy_from_slice(&expand_rgb565(v, order));
        written += 3;
    }
    written
}

/// Allocating variant of [`convert_into`].
pub fn convert(src: &[u8], order: ChannelOrder) -> Vec<u8> {
    let mut out = alloc::vec![0u8; converted_len(src.len())];
    let n = convert_into(src, order, &mut out);
    out.truncate(n);
    out
}
