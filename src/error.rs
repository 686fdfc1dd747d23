//! Error types for planning, streaming and whole-frame display.
//!
//! Collaborator errors (storage, SPI) stay generic so the same pipeline runs
//! against the board drivers and the in-memory test doubles.

/// The planner found no nonzero aligned chunk size. Fatal at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("aligned stride {stride} exceeds transfer ceiling {max_chunk_bytes}")]
    StrideExceedsCeiling { stride: usize, max_chunk_bytes: usize },

    #[error("bytes per pixel and alignment must be nonzero")]
    ZeroParameter,
}

/// Why a pump run stopped early.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PumpError<R, W> {
    #[error("source read failed: {0:?}")]
    Read(R),

    #[error("transport write failed: {0:?}")]
    Write(W),

    #[error("source returned an empty block before end of stream")]
    EmptyRead,

    #[error("bounce buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("chunk of {chunk_size_bytes} bytes splits a {stride}-byte pixel")]
    MisalignedChunk { chunk_size_bytes: usize, stride: usize },
}

/// Failure to put one file on the panel.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError<S, W> {
    /// Size matches no supported encoding; the caller should skip the file.
    #[error("{size} bytes is not a 2 or 3 byte/pixel frame of {pixels} pixels")]
    FormatMismatch { size: u64, pixels: u64 },

    #[error("transfer planning failed: {0}")]
    Configuration(#[from] PlanError),

    #[error("source ended after {received} of {expected} bytes ({transferred} written)")]
    ShortRead {
        expected: u64,
        received: u64,
        transferred: u64,
    },

    #[error("storage error: {0:?}")]
    Storage(S),

    #[error("source returned an empty block before end of stream")]
    EmptyRead,

    #[error("transport write failed: {0:?}")]
    TransportWrite(W),

    #[error("bounce buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("chunk of {chunk_size_bytes} bytes splits a {stride}-byte pixel")]
    MisalignedChunk { chunk_size_bytes: usize, stride: usize },
}

impl<S, W> From<PumpError<S, W>> for FrameError<S, W> {
    fn from(e: PumpError<S, W>) -> Self {
        match e {
            PumpError::Read(e) => FrameError::Storage(e),
            PumpError::Write(e) => FrameError::TransportWrite(e),
            PumpError::EmptyRead => FrameError::EmptyRead,
            PumpError::BufferTooSmall { needed, available } => {
                FrameError::BufferTooSmall { needed, available }
            }
            PumpError::MisalignedChunk { chunk_size_bytes, stride } => {
                FrameError::MisalignedChunk { chunk_size_bytes, stride }
            }
        }
    }
}
