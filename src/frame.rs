//! Put whole files on the panel.
//!
//! One frame: size the file, pick the encoding, plan chunks against the
//! panel's transfer limits, open the full-screen window and pump. The panel
//! always receives three bytes per pixel, so chunks are planned on the output
//! side and the read size follows from the source stride.

use log::{debug, error, info, warn};

use crate::config::PanelConfig;
use crate::error::FrameError;
use crate::format::{detect, PixelEncoding};
use crate::panel::{PixelSink, SinkWriter};
use crate::plan::plan;
use crate::pump::{StreamOutcome, StreamPump, Transform};
use crate::storage::{FrameSource, Storage};

/// Bytes per pixel on the wire to the controller.
pub const PANEL_BYTES_PER_PIXEL: usize = 3;

/// Stream the file at `path` into the full panel window. Returns the number
/// of bytes written to the panel.
///
/// Nothing is retried: on error the frame is abandoned mid-window and the
/// caller may start it again from pixel zero.
pub fn show_frame<S, P>(
    storage: &mut S,
    path: &str,
    sink: &mut P,
    cfg: &PanelConfig,
    pump: &mut StreamPump<'_>,
) -> Result<u64, FrameError<S::Error, P::Error>>
where
    S: Storage,
    P: PixelSink,
{
    let pixels = cfg.pixel_count();
    let size = storage.size(path).map_err(FrameError::Storage)?;

    let encoding = PixelEncoding::from_bpp(detect(size, pixels as u64), cfg.source_order);
    let (transform, src_bpp) = match (Transform::for_encoding(encoding), encoding.bytes_per_pixel()) {
        (Some(t), Some(bpp)) => (t, bpp),
        _ => {
            warn!("{}: {} bytes is not a {}x{} frame", path, size, cfg.width, cfg.height);
            return Err(FrameError::FormatMismatch { size, pixels: pixels as u64 });
        }
    };

    let limits = sink.limits();
    let p = plan(pixels, PANEL_BYTES_PER_PIXEL, limits.max_chunk_bytes, limits.alignment_bytes)?;
    let read_chunk = p.chunk_size_pixels * src_bpp;
    debug!(
        "{}: {:?}, {} chunks of {} px (+{} px), reading {} bytes at a time",
        path, encoding, p.full_chunk_count, p.chunk_size_pixels, p.remainder_pixels, read_chunk
    );

    // the window is only primed once there is a file to fill it from
    let mut source = FrameSource::open(storage, path).map_err(FrameError::Storage)?;
    sink.set_window(0, 0, cfg.width - 1, cfg.height - 1)
        .map_err(FrameError::TransportWrite)?;
    sink.begin_write().map_err(FrameError::TransportWrite)?;

    let res = pump.pump_exact(&mut source, size, read_chunk, transform, &mut SinkWriter(sink));
    source.close();

    match res.outcome {
        StreamOutcome::Completed => {
            info!("{}: {} bytes to panel", path, res.bytes_transferred);
            Ok(res.bytes_transferred)
        }
        StreamOutcome::ShortRead { expected, received } => {
            error!("{}: short read, {} of {} bytes", path, received, expected);
            Err(FrameError::ShortRead {
                expected,
                received,
                transferred: res.bytes_transferred,
            })
        }
        StreamOutcome::IoError(e) => {
            error!("{}: aborted after {} bytes", path, res.bytes_transferred);
            Err(e.into())
        }
    }
}

/// Walks a fixed list of frame paths, wrapping at the end. Files whose size
/// matches no encoding are skipped.
pub struct FrameCycler<'a> {
    paths: &'a [&'a str],
    next: usize,
}

impl<'a> FrameCycler<'a> {
    pub fn new(paths: &'a [&'a str]) -> Self {
        Self { paths, next: 0 }
    }

    /// Index of the frame the next call will try first.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Show the next displayable frame. `Ok(None)` when no path in the list
    /// has a usable size. Any other error aborts this frame; the following
    /// call moves on to the next path.
    pub fn show_next<S, P>(
        &mut self,
        storage: &mut S,
        sink: &mut P,
        cfg: &PanelConfig,
        pump: &mut StreamPump<'_>,
    ) -> Result<Option<(&'a str, u64)>, FrameError<S::Error, P::Error>>
    where
        S: Storage,
        P: PixelSink,
    {
        for _ in 0..self.paths.len() {
            let path = self.paths[self.next];
            self.next = (self.next + 1) % self.paths.len();
            match show_frame(storage, path, sink, cfg, pump) {
                Ok(n) => return Ok(Some((path, n))),
                Err(FrameError::FormatMismatch { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
