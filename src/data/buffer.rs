//! Owned byte store and the address space views read through.
//!
//! Relocation turns every stored pointer into `offset + base_address`, where the base
//! address is the address of the buffer's heap allocation (or mapping). The number is never
//! dereferenced: [`Memory`] translates it back into a bounds-checked slice of whichever
//! loaded buffer contains it, which is what lets a model file's name fields point into a
//! separately loaded external strings file.

use memmap2::MmapMut;
use rootcause::Report;
use winnow::Parser;
use winnow::binary::{le_f32, le_i8, le_i32, le_u8, le_u16, le_u32, le_u64};
use winnow::error::{ContextError, ErrMode};

use crate::data::parser_utils::parse_bin_string;
use crate::error::{ResError, ResResult};

enum Storage {
    Owned(Box<[u8]>),
    Mapped(MmapMut),
}

/// An immutable-length byte buffer holding one (possibly relocated) resource file.
pub struct ResBuffer {
    storage: Storage,
}

impl std::fmt::Debug for ResBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResBuffer")
            .field("base_address", &format_args!("0x{:X}", self.base_address()))
            .field("len", &self.len())
            .field("mapped", &matches!(self.storage, Storage::Mapped(_)))
            .finish()
    }
}

impl ResBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            storage: Storage::Owned(data.into_boxed_slice()),
        }
    }

    /// Wrap a writable mapping. Callers normally pass a copy-on-write mapping so relocation
    /// never reaches the file on disk.
    pub fn from_mmap(map: MmapMut) -> Self {
        Self {
            storage: Storage::Mapped(map),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(data) => data,
            Storage::Mapped(map) => map,
        }
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Owned(data) => data,
            Storage::Mapped(map) => map,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The address relocated pointers into this buffer are based on.
    pub fn base_address(&self) -> u64 {
        self.as_bytes().as_ptr() as usize as u64
    }

    pub fn address_of(&self, offset: usize) -> u64 {
        self.base_address() + offset as u64
    }

    /// Translate an address back into an offset, if it lies inside this buffer.
    ///
    /// The one-past-the-end address is accepted so zero-length reads at the end succeed.
    pub fn offset_of(&self, address: u64) -> Option<usize> {
        let offset = address.checked_sub(self.base_address())?;
        if offset <= self.len() as u64 {
            Some(offset as usize)
        } else {
            None
        }
    }

    pub(crate) fn read_u64_at(&self, offset: usize) -> ResResult<u64> {
        let bytes = self
            .as_bytes()
            .get(offset..offset + 8)
            .ok_or_else(|| ResError::OutOfBounds {
                address: self.address_of(offset),
                len: 8,
            })?;
        let mut input = bytes;
        Ok(le_u64::<_, ErrMode<ContextError>>
            .parse_next(&mut input)
            .map_err(ResError::from)?)
    }

    pub(crate) fn write_u64_at(&mut self, offset: usize, value: u64) -> ResResult<()> {
        let address = self.address_of(offset);
        let slot = self
            .as_bytes_mut()
            .get_mut(offset..offset + 8)
            .ok_or(ResError::OutOfBounds { address, len: 8 })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub(crate) fn write_u8_at(&mut self, offset: usize, value: u8) -> ResResult<()> {
        let address = self.address_of(offset);
        let slot = self
            .as_bytes_mut()
            .get_mut(offset)
            .ok_or(ResError::OutOfBounds { address, len: 1 })?;
        *slot = value;
        Ok(())
    }

    pub(crate) fn write_u16_at(&mut self, offset: usize, value: u16) -> ResResult<()> {
        let address = self.address_of(offset);
        let slot = self
            .as_bytes_mut()
            .get_mut(offset..offset + 2)
            .ok_or(ResError::OutOfBounds { address, len: 2 })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

/// The set of buffers relocated addresses may point into.
///
/// A model file that had its external strings resolved holds addresses into the external
/// strings file, so reading it needs both buffers.
#[derive(Clone, Copy, Debug)]
pub struct Memory<'a> {
    primary: &'a ResBuffer,
    external: Option<&'a ResBuffer>,
}

impl<'a> Memory<'a> {
    pub fn new(primary: &'a ResBuffer) -> Self {
        Self {
            primary,
            external: None,
        }
    }

    pub fn with_external(self, external: &'a ResBuffer) -> Self {
        Self {
            primary: self.primary,
            external: Some(external),
        }
    }

    pub fn primary(&self) -> &'a ResBuffer {
        self.primary
    }

    pub fn external(&self) -> Option<&'a ResBuffer> {
        self.external
    }

    /// All bytes from `address` to the end of the buffer containing it.
    pub fn tail(&self, address: u64) -> ResResult<&'a [u8]> {
        for buffer in std::iter::once(self.primary).chain(self.external) {
            if let Some(offset) = buffer.offset_of(address) {
                return Ok(&buffer.as_bytes()[offset..]);
            }
        }
        Err(Report::new(ResError::OutOfBounds { address, len: 0 }))
    }

    pub fn bytes(&self, address: u64, len: usize) -> ResResult<&'a [u8]> {
        let tail = self.tail(address)?;
        tail.get(..len)
            .ok_or_else(|| Report::new(ResError::OutOfBounds { address, len }))
    }

    fn parse_at<T>(
        &self,
        address: u64,
        len: usize,
        mut parser: impl Parser<&'a [u8], T, ErrMode<ContextError>>,
    ) -> ResResult<T> {
        let mut input = self.bytes(address, len)?;
        Ok(parser.parse_next(&mut input).map_err(ResError::from)?)
    }

    pub fn u8(&self, address: u64) -> ResResult<u8> {
        self.parse_at(address, 1, le_u8)
    }

    pub fn i8(&self, address: u64) -> ResResult<i8> {
        self.parse_at(address, 1, le_i8)
    }

    pub fn u16(&self, address: u64) -> ResResult<u16> {
        self.parse_at(address, 2, le_u16)
    }

    pub fn u32(&self, address: u64) -> ResResult<u32> {
        self.parse_at(address, 4, le_u32)
    }

    pub fn i32(&self, address: u64) -> ResResult<i32> {
        self.parse_at(address, 4, le_i32)
    }

    pub fn u64(&self, address: u64) -> ResResult<u64> {
        self.parse_at(address, 8, le_u64)
    }

    pub fn f32(&self, address: u64) -> ResResult<f32> {
        self.parse_at(address, 4, le_f32)
    }

    /// Read a pointer field. Zero is the null pointer.
    pub fn pointer(&self, address: u64) -> ResResult<Option<u64>> {
        let value = self.u64(address)?;
        Ok((value != 0).then_some(value))
    }

    /// Read the `BinString` record at `address`.
    pub fn bin_string(&self, address: u64) -> ResResult<&'a str> {
        let mut input = self.tail(address)?;
        let bytes = parse_bin_string(&mut input)
            .map_err(|_| ResError::OutOfBounds { address, len: 2 })?;
        Ok(std::str::from_utf8(bytes).map_err(|err| ResError::InvalidUtf8 { address, err })?)
    }

    /// Follow the string pointer stored at `field`. A null pointer reads as `None`.
    pub fn string_at(&self, field: u64) -> ResResult<Option<&'a str>> {
        match self.pointer(field)? {
            Some(address) => Ok(Some(self.bin_string(address)?)),
            None => Ok(None),
        }
    }

    /// Read `count` little-endian `u16`s starting at `address`.
    pub fn u16_array(&self, address: u64, count: usize) -> ResResult<Vec<u16>> {
        let bytes = self.bytes(address, count * 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read `count` little-endian `u32`s starting at `address`.
    pub fn u32_array(&self, address: u64, count: usize) -> ResResult<Vec<u32>> {
        let bytes = self.bytes(address, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}
