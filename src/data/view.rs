//! Fixed-layout record views over relocated memory.

use std::marker::PhantomData;

use rootcause::Report;

use crate::data::buffer::Memory;
use crate::data::dict::ResDic;
use crate::error::{ResError, ResResult};

/// A `Copy` handle to one on-disk record: the memory it lives in plus its address.
///
/// Field readers take the byte offset of the field inside the record.
pub trait View<'a>: Copy {
    /// Size of one record, which is also the stride of arrays of it.
    const SIZE: usize;

    fn from_address(memory: Memory<'a>, address: u64) -> Self;

    fn memory(&self) -> Memory<'a>;

    fn address(&self) -> u64;

    fn field(&self, offset: usize) -> u64 {
        self.address() + offset as u64
    }

    fn read_u8(&self, offset: usize) -> ResResult<u8> {
        self.memory().u8(self.field(offset))
    }

    fn read_i8(&self, offset: usize) -> ResResult<i8> {
        self.memory().i8(self.field(offset))
    }

    fn read_u16(&self, offset: usize) -> ResResult<u16> {
        self.memory().u16(self.field(offset))
    }

    fn read_u32(&self, offset: usize) -> ResResult<u32> {
        self.memory().u32(self.field(offset))
    }

    fn read_i32(&self, offset: usize) -> ResResult<i32> {
        self.memory().i32(self.field(offset))
    }

    fn read_u64(&self, offset: usize) -> ResResult<u64> {
        self.memory().u64(self.field(offset))
    }

    fn read_f32(&self, offset: usize) -> ResResult<f32> {
        self.memory().f32(self.field(offset))
    }

    fn read_f32s<const N: usize>(&self, offset: usize) -> ResResult<[f32; N]> {
        let mut values = [0f32; N];
        for (i, value) in values.iter_mut().enumerate() {
            *value = self.read_f32(offset + i * 4)?;
        }
        Ok(values)
    }

    fn read_ptr(&self, offset: usize) -> ResResult<Option<u64>> {
        self.memory().pointer(self.field(offset))
    }

    fn read_string(&self, offset: usize) -> ResResult<Option<&'a str>> {
        self.memory().string_at(self.field(offset))
    }

    /// A string field that must be present; a null pointer reads as the empty string.
    fn read_name(&self, offset: usize) -> ResResult<&'a str> {
        Ok(self.read_string(offset)?.unwrap_or_default())
    }

    fn read_view<V: View<'a>>(&self, offset: usize) -> ResResult<Option<V>> {
        Ok(self
            .read_ptr(offset)?
            .map(|address| V::from_address(self.memory(), address)))
    }

    fn read_array<V: View<'a>>(&self, offset: usize, count: usize) -> ResResult<ResArray<'a, V>> {
        ResArray::new(self.memory(), self.read_ptr(offset)?, count)
    }

    fn read_dict(&self, offset: usize) -> ResResult<Option<ResDic<'a>>> {
        Ok(self
            .read_ptr(offset)?
            .map(|address| ResDic::new(self.memory(), address)))
    }

    /// An array of `count` string pointers.
    fn read_string_array(&self, offset: usize, count: usize) -> ResResult<Vec<Option<&'a str>>> {
        let strings: ResArray<'a, StringRef<'a>> = self.read_array(offset, count)?;
        strings.iter().map(|string| string.get()).collect()
    }

    fn read_u16_array(&self, offset: usize, count: usize) -> ResResult<Vec<u16>> {
        match self.read_ptr(offset)? {
            Some(address) => self.memory().u16_array(address, count),
            None => Ok(Vec::new()),
        }
    }
}

/// Declare a view type with the standard `{ memory, address }` layout.
macro_rules! res_view {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a> {
            memory: $crate::data::buffer::Memory<'a>,
            address: u64,
        }

        impl<'a> $crate::data::view::View<'a> for $name<'a> {
            const SIZE: usize = $size;

            fn from_address(memory: $crate::data::buffer::Memory<'a>, address: u64) -> Self {
                Self { memory, address }
            }

            fn memory(&self) -> $crate::data::buffer::Memory<'a> {
                self.memory
            }

            fn address(&self) -> u64 {
                self.address
            }
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "@0x{:X}"), self.address)
            }
        }
    };
}
pub(crate) use res_view;

res_view!(
    /// A single pointer to a `BinString`.
    StringRef,
    0x8
);

impl<'a> StringRef<'a> {
    pub fn get(&self) -> ResResult<Option<&'a str>> {
        self.read_string(0)
    }
}

/// `count` consecutive records of `T` starting at a relocated address.
#[derive(Clone, Copy)]
pub struct ResArray<'a, T> {
    memory: Memory<'a>,
    address: Option<u64>,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T> std::fmt::Debug for ResArray<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResArray")
            .field("address", &self.address.map(|a| format!("0x{a:X}")))
            .field("count", &self.count)
            .finish()
    }
}

impl<'a, T: View<'a>> ResArray<'a, T> {
    /// A null array pointer is only valid for an empty array.
    pub fn new(memory: Memory<'a>, address: Option<u64>, count: usize) -> ResResult<Self> {
        if address.is_none() && count != 0 {
            return Err(Report::new(ResError::corrupt(format!(
                "null array pointer with {count} elements"
            ))));
        }
        Ok(Self {
            memory,
            address,
            count,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.count {
            return None;
        }
        let address = self.address?;
        Some(T::from_address(self.memory, address + (index * T::SIZE) as u64))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + use<'a, T> {
        let array = *self;
        (0..array.count).filter_map(move |index| array.get(index))
    }
}
