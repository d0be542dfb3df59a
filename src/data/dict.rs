//! `ResDic`: the binary-trie dictionary every named collection is indexed by.
//!
//! Layout: signature (u32), node count (u32, the root is not counted), then
//! `node_count + 1` entries of `{ ref_bit: i32, children: [u16; 2], key: *BinString }`.
//! Entry 0 is the root; entry `i + 1` names element `i` of the array the dictionary sits
//! beside.

use rootcause::Report;

use crate::data::buffer::Memory;
use crate::data::parser_utils::parse_dic_entry_fields;
use crate::error::{ResError, ResResult};

pub const DIC_HEADER_SIZE: usize = 0x8;
pub const DIC_ENTRY_SIZE: usize = 0x10;

/// Bit `bit` of `key`, counting from the last byte. Bits past the start of the key, and
/// negative bit numbers, read as 0.
pub fn key_bit(key: &[u8], bit: i32) -> usize {
    if bit < 0 {
        return 0;
    }
    let byte = (bit >> 3) as usize;
    if byte >= key.len() {
        return 0;
    }
    ((key[key.len() - 1 - byte] >> (bit & 7)) & 1) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DicEntry {
    pub ref_bit: i32,
    pub children: [u16; 2],
    pub key: u64,
}

#[derive(Clone, Copy)]
pub struct ResDic<'a> {
    memory: Memory<'a>,
    address: u64,
}

impl std::fmt::Debug for ResDic<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResDic")
            .field("address", &format_args!("0x{:X}", self.address))
            .field("keys", &self.keys().unwrap_or_default())
            .finish()
    }
}

impl<'a> ResDic<'a> {
    pub fn new(memory: Memory<'a>, address: u64) -> Self {
        Self { memory, address }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Number of named elements (the root is excluded).
    pub fn len(&self) -> ResResult<usize> {
        Ok(self.memory.u32(self.address + 4)? as usize)
    }

    pub fn is_empty(&self) -> ResResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Address of raw entry `index`, where 0 is the root.
    pub fn entry_address(&self, index: usize) -> u64 {
        self.address + (DIC_HEADER_SIZE + index * DIC_ENTRY_SIZE) as u64
    }

    /// Address of the key pointer of raw entry `index`.
    pub fn key_field(&self, index: usize) -> u64 {
        self.entry_address(index) + 8
    }

    /// Raw entry `index`, where 0 is the root.
    pub fn entry(&self, index: usize) -> ResResult<DicEntry> {
        let node_count = self.len()?;
        if index > node_count {
            return Err(Report::new(ResError::corrupt(format!(
                "dictionary child {index} exceeds node count {node_count}"
            ))));
        }
        let mut input = self.memory.bytes(self.entry_address(index), DIC_ENTRY_SIZE)?;
        let (ref_bit, children, key) =
            parse_dic_entry_fields(&mut input).map_err(ResError::from)?;
        Ok(DicEntry {
            ref_bit,
            children,
            key,
        })
    }

    fn entry_key(&self, entry: &DicEntry) -> ResResult<&'a str> {
        if entry.key == 0 {
            return Ok("");
        }
        self.memory.bin_string(entry.key)
    }

    /// Key of element `index`.
    pub fn key(&self, index: usize) -> ResResult<&'a str> {
        let entry = self.entry(index + 1)?;
        self.entry_key(&entry)
    }

    /// Every key, in element order.
    pub fn keys(&self) -> ResResult<Vec<&'a str>> {
        (0..self.len()?).map(|index| self.key(index)).collect()
    }

    /// Index of the element named `key`, if present.
    pub fn find_index(&self, key: &str) -> ResResult<Option<usize>> {
        let key_bytes = key.as_bytes();
        let mut parent = self.entry(0)?;
        let mut child_index = parent.children[0] as usize;
        let mut child = self.entry(child_index)?;

        // ref_bit strictly increases down the trie; a non-increasing step is a back edge
        // to the only candidate.
        while parent.ref_bit < child.ref_bit {
            parent = child;
            child_index = child.children[key_bit(key_bytes, child.ref_bit)] as usize;
            child = self.entry(child_index)?;
        }

        if child_index == 0 {
            return Ok(None);
        }
        if self.entry_key(&child)? == key {
            Ok(Some(child_index - 1))
        } else {
            Ok(None)
        }
    }
}
