//! Chunk planning against a transfer ceiling and alignment.
//!
//! Every full chunk is both within `max_chunk_bytes` and a multiple of
//! `bytes_per_pixel * alignment_bytes`. The remainder goes out last as one
//! shorter, possibly unaligned chunk.

use crate::error::PlanError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferPlan {
    pub chunk_size_bytes: usize,
    pub chunk_size_pixels: usize,
    pub full_chunk_count: usize,
    pub remainder_pixels: usize,
}

impl TransferPlan {
    /// Number of writes needed, counting the remainder chunk.
    #[inline]
    pub fn total_chunks(&self) -> usize {
        self.full_chunk_count + usize::from(self.remainder_pixels != 0)
    }

    /// Pixel count of each chunk in transfer order.
    pub fn chunks(&self) -> impl Iterator<Item = usize> {
        let full = core::iter::repeat(self.chunk_size_pixels).take(self.full_chunk_count);
        let tail = (self.remainder_pixels != 0).then_some(self.remainder_pixels);
        full.chain(tail)
    }
}

pub fn plan(
    total_pixels: usize,
    bytes_per_pixel: usize,
    max_chunk_bytes: usize,
    alignment_bytes: usize,
) -> Result<TransferPlan, PlanError> {
    if bytes_per_pixel == 0 || alignment_bytes == 0 {
        return Err(PlanError::ZeroParameter);
    }
    let stride = bytes_per_pixel
        .checked_mul(alignment_bytes)
        .ok_or(PlanError::StrideExceedsCeiling { stride: usize::MAX, max_chunk_bytes })?;
    if stride > max_chunk_bytes {
        return Err(PlanError::StrideExceedsCeiling { stride, max_chunk_bytes });
    }

    // floor to a whole number of strides
    let chunk_size_bytes = max_chunk_bytes - (max_chunk_bytes % stride);
    let chunk_size_pixels = chunk_size_bytes / bytes_per_pixel;

    Ok(TransferPlan {
        chunk_size_bytes,
        chunk_size_pixels,
        full_chunk_count: total_pixels / chunk_size_pixels,
        remainder_pixels: total_pixels % chunk_size_pixels,
    })
}
