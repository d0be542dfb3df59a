//! Hand-built relocatable files for unit tests.

use crate::data::dict::{DIC_ENTRY_SIZE, DIC_HEADER_SIZE, key_bit};
use crate::data::relocation::{ENTRY_SIZE, RelocationEntry, SECTION_SIZE, TABLE_HEADER_SIZE};

pub mod fixtures;

#[derive(Debug, Clone, Copy)]
pub struct TrieNode {
    pub ref_bit: i32,
    pub children: [u16; 2],
}

fn first_differing_bit(a: &[u8], b: &[u8]) -> Option<i32> {
    let bits = (a.len().max(b.len()) * 8) as i32;
    (0..bits).find(|&bit| key_bit(a, bit) != key_bit(b, bit))
}

/// Lay out a trie over `keys` by Patricia insertion. Node 0 is the root with an empty key;
/// node `i + 1` holds `keys[i]`.
pub fn build_trie(keys: &[&[u8]]) -> Vec<TrieNode> {
    let mut nodes = vec![TrieNode {
        ref_bit: -1,
        children: [0, 0],
    }];
    let key_of = |index: usize| if index == 0 { &b""[..] } else { keys[index - 1] };

    for (i, &key) in keys.iter().enumerate() {
        let new_index = i + 1;

        let mut parent = 0usize;
        let mut child = nodes[0].children[0] as usize;
        while nodes[parent].ref_bit < nodes[child].ref_bit {
            parent = child;
            child = nodes[child].children[key_bit(key, nodes[child].ref_bit)] as usize;
        }
        let diff = first_differing_bit(key, key_of(child)).expect("keys must be distinct");

        let mut parent = 0usize;
        let mut child = nodes[0].children[0] as usize;
        while nodes[parent].ref_bit < nodes[child].ref_bit && nodes[child].ref_bit < diff {
            parent = child;
            child = nodes[child].children[key_bit(key, nodes[child].ref_bit)] as usize;
        }

        let direction = key_bit(key, diff);
        let mut node = TrieNode {
            ref_bit: diff,
            children: [0, 0],
        };
        node.children[direction] = new_index as u16;
        node.children[1 - direction] = child as u16;
        nodes.push(node);

        let parent_direction = key_bit(key, nodes[parent].ref_bit);
        nodes[parent].children[parent_direction] = new_index as u16;
    }
    nodes
}

/// Builds a single relocatable file: header, body, then the `_RLT` table.
pub struct FileBuilder {
    data: Vec<u8>,
    signature: [u8; 8],
    entries: Vec<RelocationEntry>,
    section_pointer: (u64, u32),
    first_block_offset: u16,
}

impl FileBuilder {
    pub fn new(signature: &[u8; 8]) -> Self {
        Self::with_header_size(signature, 0x20)
    }

    /// Reserve `header_size` bytes for a file header that extends the common 0x20 bytes.
    pub fn with_header_size(signature: &[u8; 8], header_size: usize) -> Self {
        Self {
            data: vec![0; header_size],
            signature: *signature,
            entries: Vec::new(),
            section_pointer: (0, 0),
            first_block_offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn align(&mut self, align: usize) {
        let padded = self.data.len().next_multiple_of(align);
        self.data.resize(padded, 0);
    }

    /// Append `size` zeroed bytes aligned to `align` and return their offset.
    pub fn alloc(&mut self, size: usize, align: usize) -> usize {
        self.align(align);
        let offset = self.data.len();
        self.data.resize(offset + size, 0);
        offset
    }

    pub fn write_bytes(&mut self, at: usize, bytes: &[u8]) {
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn write_u8(&mut self, at: usize, value: u8) {
        self.data[at] = value;
    }

    pub fn write_i8(&mut self, at: usize, value: i8) {
        self.data[at] = value as u8;
    }

    pub fn write_u16(&mut self, at: usize, value: u16) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    pub fn write_u32(&mut self, at: usize, value: u32) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    pub fn write_i32(&mut self, at: usize, value: i32) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, at: usize, value: u64) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    pub fn write_f32(&mut self, at: usize, value: f32) {
        self.write_bytes(at, &value.to_le_bytes());
    }

    pub fn record_relocation(&mut self, at: usize) {
        self.push_relocation_entry(RelocationEntry {
            position: at as u32,
            array_count: 1,
            relocation_count: 1,
            stride: 0,
        });
    }

    pub fn push_relocation_entry(&mut self, entry: RelocationEntry) {
        self.entries.push(entry);
    }

    pub fn set_section_pointer(&mut self, pointer: u64, position: u32) {
        self.section_pointer = (pointer, position);
    }

    pub fn set_first_block_offset(&mut self, offset: u16) {
        self.first_block_offset = offset;
    }

    /// Store a file offset at `at` and list it in the relocation table.
    pub fn write_ptr(&mut self, at: usize, target: usize) {
        self.write_u64(at, target as u64);
        self.record_relocation(at);
    }

    pub fn write_bin_string(&mut self, value: &str) -> usize {
        let at = self.alloc(2 + value.len() + 1, 8);
        self.write_u16(at, value.len() as u16);
        self.write_bytes(at + 2, value.as_bytes());
        at
    }

    /// Write a string and point `at` to it.
    pub fn write_string_ptr(&mut self, at: usize, value: &str) -> usize {
        let string = self.write_bin_string(value);
        self.write_ptr(at, string);
        string
    }

    /// An array of string pointers.
    pub fn write_string_array(&mut self, values: &[&str]) -> usize {
        let array = self.alloc(values.len().max(1) * 8, 8);
        for (i, value) in values.iter().enumerate() {
            self.write_string_ptr(array + i * 8, value);
        }
        array
    }

    fn write_dict_nodes(&mut self, names: &[&str]) -> usize {
        let keys: Vec<&[u8]> = names.iter().map(|name| name.as_bytes()).collect();
        let nodes = build_trie(&keys);
        let dict = self.alloc(DIC_HEADER_SIZE + nodes.len() * DIC_ENTRY_SIZE, 8);
        self.write_bytes(dict, b"_DIC");
        self.write_u32(dict + 4, names.len() as u32);
        for (i, node) in nodes.iter().enumerate() {
            let entry = dict + DIC_HEADER_SIZE + i * DIC_ENTRY_SIZE;
            self.write_i32(entry, node.ref_bit);
            self.write_u16(entry + 4, node.children[0]);
            self.write_u16(entry + 6, node.children[1]);
        }
        dict
    }

    /// A dictionary over `names` with a null root key.
    pub fn write_dict(&mut self, names: &[&str]) -> usize {
        let dict = self.write_dict_nodes(names);
        for (i, name) in names.iter().enumerate() {
            let key_field = dict + DIC_HEADER_SIZE + (i + 1) * DIC_ENTRY_SIZE + 8;
            self.write_string_ptr(key_field, name);
        }
        dict
    }

    /// A dictionary shaped for `names` whose key fields hold unrelocated raw values.
    pub fn write_dict_raw(&mut self, names: &[&str], raw_keys: &[u64]) -> usize {
        let dict = self.write_dict_nodes(names);
        for (i, raw) in raw_keys.iter().enumerate() {
            let key_field = dict + DIC_HEADER_SIZE + (i + 1) * DIC_ENTRY_SIZE + 8;
            self.write_u64(key_field, *raw);
        }
        dict
    }

    /// Copy a finished file in, aligned so it can be relocated in place.
    pub fn embed(&mut self, file: &[u8]) -> usize {
        let at = self.alloc(file.len(), 0x100);
        self.write_bytes(at, file);
        at
    }

    pub fn finish(mut self) -> Vec<u8> {
        let table = self.alloc(
            TABLE_HEADER_SIZE + SECTION_SIZE + self.entries.len() * ENTRY_SIZE,
            8,
        );
        self.write_bytes(table, b"_RLT");
        self.write_u32(table + 4, table as u32);
        self.write_i32(table + 8, 1);

        let section = table + TABLE_HEADER_SIZE;
        let (pointer, position) = self.section_pointer;
        self.write_u64(section, pointer);
        self.write_u32(section + 8, position);
        self.write_u32(section + 0xC, table as u32);
        self.write_i32(section + 0x10, 0);
        self.write_i32(section + 0x14, self.entries.len() as i32);

        let entries = std::mem::take(&mut self.entries);
        for (i, entry) in entries.iter().enumerate() {
            let at = section + SECTION_SIZE + i * ENTRY_SIZE;
            self.write_u32(at, entry.position);
            self.write_u16(at + 4, entry.array_count);
            self.write_u8(at + 6, entry.relocation_count);
            self.write_u8(at + 7, entry.stride);
        }

        let file_size = self.data.len() as u32;
        let signature = self.signature;
        let first_block_offset = self.first_block_offset;
        self.write_bytes(0, &signature);
        // version 10.0.0
        self.write_u16(0x0A, 10);
        self.write_u16(0x0C, 0xFEFF);
        self.write_u8(0x0E, 3);
        self.write_u16(0x16, first_block_offset);
        self.write_u32(0x18, table as u32);
        self.write_u32(0x1C, file_size);
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trie_has_a_node_per_key_plus_root() {
        let names = ["alpha", "beta", "gamma", "delta", "a", "b"];
        let keys: Vec<&[u8]> = names.iter().map(|n| n.as_bytes()).collect();
        let nodes = build_trie(&keys);
        assert_eq!(nodes.len(), names.len() + 1);
        for node in &nodes[1..] {
            assert!(node.ref_bit >= 0);
        }
    }
}
