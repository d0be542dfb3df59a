//! Reading resource files from disk into [`ResBuffer`]s.

use std::fs::File;
use std::path::Path;

use bon::Builder;
use memmap2::MmapOptions;
use rootcause::Report;
use tracing::debug;

use crate::data::buffer::ResBuffer;
use crate::data::decompress::{Decompressor, ScratchBuffer};
use crate::error::{ResError, ResResult};

pub const DEFAULT_SCRATCH_SIZE: usize = 0x1000_0000;

#[derive(Builder, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderConfig {
    /// Size of the work memory handed to the decompressor.
    #[builder(default = DEFAULT_SCRATCH_SIZE)]
    scratch_size: usize,
    /// File extensions (without the dot) that are decompressed on load.
    #[builder(default = vec!["mc".to_owned(), "zlib".to_owned()])]
    compressed_extensions: Vec<String>,
    /// Map uncompressed files copy-on-write instead of reading them into the heap.
    #[builder(default = true)]
    use_mmap: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LoaderConfig {
    pub fn scratch_size(&self) -> usize {
        self.scratch_size
    }

    pub fn compressed_extensions(&self) -> &[String] {
        &self.compressed_extensions
    }

    pub fn use_mmap(&self) -> bool {
        self.use_mmap
    }
}

pub struct Loader {
    config: LoaderConfig,
    decompressor: Option<Box<dyn Decompressor>>,
    scratch: Option<ScratchBuffer>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("has_decompressor", &self.decompressor.is_some())
            .finish()
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ResError {
    ResError::Io {
        path: path.display().to_string(),
        err,
    }
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            decompressor: None,
            scratch: None,
        }
    }

    pub fn with_decompressor(mut self, decompressor: impl Decompressor + 'static) -> Self {
        self.decompressor = Some(Box::new(decompressor));
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn is_compressed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.config
                    .compressed_extensions
                    .iter()
                    .any(|configured| configured.eq_ignore_ascii_case(ext))
            })
    }

    /// Read a whole file.
    pub fn read_all(path: &Path) -> ResResult<Vec<u8>> {
        Ok(std::fs::read(path).map_err(|err| io_error(path, err))?)
    }

    /// Map a file copy-on-write so relocation never writes through to disk.
    pub fn map(path: &Path) -> ResResult<ResBuffer> {
        let file = File::open(path).map_err(|err| io_error(path, err))?;
        // Safety: the mapping is private; concurrent modification of the file by another
        // process is outside what this tool supports.
        let map = unsafe { MmapOptions::new().map_copy(&file) }.map_err(|err| io_error(path, err))?;
        Ok(ResBuffer::from_mmap(map))
    }

    /// Load a file, decompressing it when its extension is configured as compressed.
    pub fn load(&mut self, path: &Path) -> ResResult<ResBuffer> {
        if !self.is_compressed(path) {
            debug!("loading {}", path.display());
            if self.config.use_mmap {
                return Self::map(path);
            }
            return Ok(ResBuffer::new(Self::read_all(path)?));
        }

        let Some(decompressor) = self.decompressor.as_deref() else {
            return Err(Report::new(ResError::Decompress {
                path: path.display().to_string(),
                detail: "no decompressor installed".to_owned(),
            }));
        };

        let compressed = Self::read_all(path)?;
        let scratch_size = self.config.scratch_size;
        let scratch = self
            .scratch
            .get_or_insert_with(|| ScratchBuffer::new(scratch_size));
        let data = decompressor
            .decompress(&compressed, scratch)
            .map_err(|err| ResError::Decompress {
                path: path.display().to_string(),
                detail: err.to_string(),
            })?;
        debug!(
            "decompressed {} (0x{:X} -> 0x{:X} bytes)",
            path.display(),
            compressed.len(),
            data.len()
        );
        Ok(ResBuffer::new(data))
    }
}
