//! The `_RLT` relocation table and the pass that turns stored offsets into addresses.

use std::ops::Range;

use rootcause::Report;
use tracing::{debug, trace};
use winnow::Parser;
use winnow::binary::{le_i32, le_u32};
use winnow::combinator::repeat;

use crate::data::binary_file::{BinaryFileHeader, FLAGS_OFFSET};
use crate::data::buffer::ResBuffer;
use crate::data::parser_utils::{
    WResult, parse_block_signature, parse_relocation_entry_fields, parse_relocation_section_fields,
};
use crate::error::{ResError, ResResult};

const TABLE_SIGNATURE: &[u8; 4] = b"_RLT";
pub const TABLE_HEADER_SIZE: usize = 0x10;
pub const SECTION_SIZE: usize = 0x18;
pub const ENTRY_SIZE: usize = 0x8;
const WORD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationSection {
    /// Where the section's data lives when it was placed outside the file; zero otherwise.
    pub pointer: u64,
    pub position: u32,
    pub size: u32,
    pub base_entry_index: i32,
    pub entry_count: i32,
}

impl RelocationSection {
    fn parse(input: &mut &[u8]) -> WResult<Self> {
        let (pointer, position, size, base_entry_index, entry_count) =
            parse_relocation_section_fields(input)?;
        Ok(Self {
            pointer,
            position,
            size,
            base_entry_index,
            entry_count,
        })
    }

    fn entry_range(&self) -> ResResult<Range<usize>> {
        if self.base_entry_index < 0 || self.entry_count < 0 {
            return Err(Report::new(ResError::corrupt(format!(
                "relocation section has negative entry range {}+{}",
                self.base_entry_index, self.entry_count
            ))));
        }
        let start = self.base_entry_index as usize;
        Ok(start..start + self.entry_count as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    /// Offset of the first patched word, relative to the file start.
    pub position: u32,
    pub array_count: u16,
    pub relocation_count: u8,
    /// Words skipped after each run of `relocation_count` patched words.
    pub stride: u8,
}

impl RelocationEntry {
    fn parse(input: &mut &[u8]) -> WResult<Self> {
        let (position, array_count, relocation_count, stride) =
            parse_relocation_entry_fields(input)?;
        Ok(Self {
            position,
            array_count,
            relocation_count,
            stride,
        })
    }

    /// File-relative offsets of every word this entry patches.
    pub fn word_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let run = self.relocation_count as usize;
        let step = (run + self.stride as usize) * WORD_SIZE;
        (0..self.array_count as usize).flat_map(move |element| {
            let start = self.position as usize + element * step;
            (0..run).map(move |word| start + word * WORD_SIZE)
        })
    }

    /// One past the last byte this entry may touch.
    fn end_offset(&self) -> usize {
        if self.array_count == 0 || self.relocation_count == 0 {
            return self.position as usize;
        }
        let step = (self.relocation_count as usize + self.stride as usize) * WORD_SIZE;
        self.position as usize
            + (self.array_count as usize - 1) * step
            + self.relocation_count as usize * WORD_SIZE
    }
}

#[derive(Debug, Clone)]
pub struct RelocationTable {
    /// Offset of the table from the start of the file it belongs to.
    pub this_offset: u32,
    pub sections: Vec<RelocationSection>,
    pub entries: Vec<RelocationEntry>,
}

fn parse_table_header(input: &mut &[u8]) -> WResult<([u8; 4], u32, i32)> {
    let signature = parse_block_signature(input)?;
    let this_offset = le_u32.parse_next(input)?;
    let section_count = le_i32.parse_next(input)?;
    let _padding = le_u32.parse_next(input)?;
    Ok((signature, this_offset, section_count))
}

impl RelocationTable {
    /// Parse the table starting at `table_data[0]`.
    pub fn parse(table_data: &[u8]) -> ResResult<Self> {
        let input = &mut &table_data[..];
        let (signature, this_offset, section_count) =
            parse_table_header(input).map_err(|_| ResError::Truncated {
                need: TABLE_HEADER_SIZE,
                have: table_data.len(),
            })?;

        if &signature != TABLE_SIGNATURE {
            return Err(Report::new(ResError::InvalidSignature {
                actual: String::from_utf8_lossy(&signature).into_owned(),
                expected: String::from_utf8_lossy(TABLE_SIGNATURE).into_owned(),
            }));
        }
        if section_count < 0 {
            return Err(Report::new(ResError::corrupt(format!(
                "negative relocation section count {section_count}"
            ))));
        }

        let sections: Vec<RelocationSection> = repeat(section_count as usize, RelocationSection::parse)
            .parse_next(input)
            .map_err(|_| ResError::corrupt("relocation sections run past the end of the file"))?;

        let mut entry_count = 0;
        for section in &sections {
            entry_count = entry_count.max(section.entry_range()?.end);
        }

        let entries: Vec<RelocationEntry> = repeat(entry_count, RelocationEntry::parse)
            .parse_next(input)
            .map_err(|_| ResError::corrupt("relocation entries run past the end of the file"))?;

        Ok(Self {
            this_offset,
            sections,
            entries,
        })
    }

    /// Offset of the file start within the buffer, given where the table was found.
    fn file_start(&self, table_offset: usize) -> ResResult<usize> {
        table_offset
            .checked_sub(self.this_offset as usize)
            .ok_or_else(|| {
                Report::new(ResError::corrupt(format!(
                    "relocation table at 0x{table_offset:X} claims offset 0x{:X}",
                    self.this_offset
                )))
            })
    }

    /// Check every entry of every section lands inside `file_len` bytes of file data.
    pub fn validate(&self, file_len: usize) -> ResResult<()> {
        for section in &self.sections {
            let range = section.entry_range()?;
            let entries = self.entries.get(range.clone()).ok_or_else(|| {
                Report::new(ResError::corrupt(format!(
                    "relocation entries {range:?} exceed the {} entries in the table",
                    self.entries.len()
                )))
            })?;
            for entry in entries {
                if entry.end_offset() > file_len {
                    return Err(Report::new(ResError::OutOfBounds {
                        address: entry.position as u64,
                        len: entry.end_offset() - entry.position as usize,
                    }));
                }
            }
        }
        Ok(())
    }

    /// Add each section's patch base to every non-null word its entries name.
    ///
    /// `table_offset` is where this table sits inside `buffer`, and `file_size` is the size
    /// the file's header declares. Nothing is written unless the whole table validates.
    pub fn apply(
        &self,
        buffer: &mut ResBuffer,
        table_offset: usize,
        file_size: usize,
    ) -> ResResult<()> {
        let file_start = self.file_start(table_offset)?;
        let file_len = file_size.min(buffer.len().saturating_sub(file_start));
        self.validate(file_len)?;

        let file_base = buffer.address_of(file_start);
        for (index, section) in self.sections.iter().enumerate() {
            let patch_base = if section.pointer != 0 {
                section.pointer.wrapping_sub(section.position as u64)
            } else {
                file_base
            };
            trace!(
                "relocation section {index}: {} entries, base 0x{patch_base:X}",
                section.entry_count
            );

            for entry in &self.entries[section.entry_range()?] {
                for offset in entry.word_offsets() {
                    let offset = file_start + offset;
                    let value = buffer.read_u64_at(offset)?;
                    if value != 0 {
                        buffer.write_u64_at(offset, value.wrapping_add(patch_base))?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Relocate the file starting at `file_offset` inside `buffer`.
///
/// Returns `false` when the file was already relocated; the buffer is left untouched in
/// that case.
pub fn relocate(buffer: &mut ResBuffer, file_offset: usize) -> ResResult<bool> {
    let file_data = buffer.as_bytes().get(file_offset..).ok_or_else(|| {
        Report::new(ResError::Truncated {
            need: file_offset,
            have: buffer.len(),
        })
    })?;
    let header = BinaryFileHeader::read(file_data)?;
    if header.is_relocated() {
        trace!("file at 0x{file_offset:X} already relocated");
        return Ok(false);
    }

    let table_offset = file_offset + header.rel_table_offset as usize;
    let table_data = buffer.as_bytes().get(table_offset..).ok_or_else(|| {
        Report::new(ResError::Truncated {
            need: table_offset + TABLE_HEADER_SIZE,
            have: buffer.len(),
        })
    })?;
    let table = RelocationTable::parse(table_data)?;
    debug!(
        "relocating {} at 0x{file_offset:X}: {} sections, {} entries",
        String::from_utf8_lossy(&header.signature).trim_end_matches(['\0', ' ']),
        table.sections.len(),
        table.entries.len()
    );
    table.apply(buffer, table_offset, header.file_size as usize)?;

    buffer.write_u16_at(file_offset + FLAGS_OFFSET, header.flags | 1)?;
    Ok(true)
}
