//! Storage collaborator: the four file operations the pipeline needs.
//!
//! Mounting and directory listing happen elsewhere. `FrameSource` is the
//! handle the frame driver owns for the life of one stream; it closes the
//! file when released, so a card stays usable for the next frame.

use embedded_io::{ErrorType, Read};

use crate::pump::{Block, BlockSource};

pub trait Storage {
    type File;
    type Error;

    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error>;
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<Block, Self::Error>;
    fn close(&mut self, file: Self::File);
    fn size(&mut self, path: &str) -> Result<u64, Self::Error>;
}

/// An open file borrowed out of a [`Storage`]. Closed by [`FrameSource::close`]
/// or, failing that, on drop.
pub struct FrameSource<'s, S: Storage> {
    storage: &'s mut S,
    file: Option<S::File>,
}

impl<'s, S: Storage> FrameSource<'s, S> {
    pub fn open(storage: &'s mut S, path: &str) -> Result<Self, S::Error> {
        let file = storage.open(path)?;
        Ok(Self { storage, file: Some(file) })
    }

    pub fn close(mut self) {
        if let Some(f) = self.file.take() {
            self.storage.close(f);
        }
    }
}

impl<S: Storage> Drop for FrameSource<'_, S> {
    fn drop(&mut self) {
        if let Some(f) = self.file.take() {
            self.storage.close(f);
        }
    }
}

impl<S: Storage> BlockSource for FrameSource<'_, S> {
    type Error = S::Error;

    fn read_block(&mut self, buf: &mut [u8]) -> Result<Block, Self::Error> {
        match self.file.as_mut() {
            Some(f) => self.storage.read(f, buf),
            None => Ok(Block::End),
        }
    }
}

/// Any `embedded_io::Read` as a block source. `Ok(0)` on a non-empty buffer
/// is end of file.
pub struct IoSource<R> {
    inner: R,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> BlockSource for IoSource<R> {
    type Error = <R as ErrorType>::Error;

    fn read_block(&mut self, buf: &mut [u8]) -> Result<Block, Self::Error> {
        match self.inner.read(buf)? {
            0 => Ok(Block::End),
            n => Ok(Block::Data(n)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SliceStorageError {
    #[error("no such file")]
    NotFound,
}

/// Named in-memory blobs. Used for host tests and for frames generated at
/// boot when no card is present.
pub struct SliceStorage<'d> {
    files: &'d [(&'d str, &'d [u8])],
    open_files: usize,
}

pub struct SliceFile<'d> {
    data: &'d [u8],
    pos: usize,
}

impl<'d> SliceStorage<'d> {
    pub fn new(files: &'d [(&'d str, &'d [u8])]) -> Self {
        Self { files, open_files: 0 }
    }

    /// Files opened and not yet closed.
    pub fn open_files(&self) -> usize {
        self.open_files
    }

    fn lookup(&self, path: &str) -> Result<&'d [u8], SliceStorageError> {
        let path = path.trim_start_matches('/');
        self.files
            .iter()
            .find(|(name, _)| name.trim_start_matches('/').eq_ignore_ascii_case(path))
            .map(|(_, data)| *data)
            .ok_or(SliceStorageError::NotFound)
    }
}

impl<'d> Storage for SliceStorage<'d> {
    type File = SliceFile<'d>;
    type Error = SliceStorageError;

    fn open(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let data = self.lookup(path)?;
        self.open_files += 1;
        Ok(SliceFile { data, pos: 0 })
    }

    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<Block, Self::Error> {
        let left = &file.data[file.pos..];
        if left.is_empty() {
            return Ok(Block::End);
        }
        let n = left.len().min(buf.len());
        buf[..n].copy_from_slice(&left[..n]);
        file.pos += n;
        Ok(Block::Data(n))
    }

    fn close(&mut self, _file: Self::File) {
        self.open_files -= 1;
    }

    fn size(&mut self, path: &str) -> Result<u64, Self::Error> {
        self.lookup(path).map(|d| d.len() as u64)
    }
}
