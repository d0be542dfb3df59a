//! Decompression of packaged resource files.
//!
//! The scratch buffer is owned by the caller and lent to every call.

use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use rootcause::Report;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecompressError {
    #[error("I/O error while decompressing")]
    Io(#[from] std::io::Error),
    #[error("scratch buffer is empty")]
    NoScratchSpace,
}

/// Work memory lent to a [`Decompressor`] for the duration of one call.
#[derive(Debug)]
pub struct ScratchBuffer {
    data: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

pub trait Decompressor {
    fn decompress(
        &self,
        input: &[u8],
        scratch: &mut ScratchBuffer,
    ) -> Result<Vec<u8>, Report<DecompressError>>;
}

/// zlib streams, as produced by `flate2`/`zlib` with the default header.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibDecompressor;

impl Decompressor for ZlibDecompressor {
    fn decompress(
        &self,
        input: &[u8],
        scratch: &mut ScratchBuffer,
    ) -> Result<Vec<u8>, Report<DecompressError>> {
        if scratch.is_empty() {
            return Err(Report::new(DecompressError::NoScratchSpace));
        }

        let mut decoder = ZlibDecoder::new(Cursor::new(input));
        let mut output = Vec::with_capacity(input.len() * 2);
        let chunk = scratch.as_mut_slice();
        loop {
            let read = decoder.read(chunk).map_err(DecompressError::from)?;
            if read == 0 {
                break;
            }
            output.extend_from_slice(&chunk[..read]);
        }

        Ok(output)
    }
}
