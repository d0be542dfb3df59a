//! Shared winnow-based parsing utilities used by the header, relocation table, and view readers.

use winnow::Parser;
use winnow::binary::{le_i32, le_u8, le_u16, le_u32, le_u64};
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Parse a `BinString` record: `u16` length followed by that many bytes.
///
/// The trailing NUL the format stores after every string is not part of the length and is
/// left unconsumed.
pub fn parse_bin_string<'a>(input: &mut &'a [u8]) -> WResult<&'a [u8]> {
    let length = le_u16.parse_next(input)?;
    take(length as usize).parse_next(input)
}

/// Parse the fixed 8-byte signature used by every relocatable file.
pub fn parse_file_signature(input: &mut &[u8]) -> WResult<[u8; 8]> {
    let bytes: &[u8] = take(8usize).parse_next(input)?;
    let mut signature = [0u8; 8];
    signature.copy_from_slice(bytes);
    Ok(signature)
}

/// Parse a 4-byte block signature (`_RLT`, `_DIC`, ...).
pub fn parse_block_signature(input: &mut &[u8]) -> WResult<[u8; 4]> {
    let bytes: &[u8] = take(4usize).parse_next(input)?;
    let mut signature = [0u8; 4];
    signature.copy_from_slice(bytes);
    Ok(signature)
}

/// Parse a dictionary node: (ref_bit, [child0, child1], key pointer).
pub fn parse_dic_entry_fields(input: &mut &[u8]) -> WResult<(i32, [u16; 2], u64)> {
    let ref_bit = le_i32.parse_next(input)?;
    let left = le_u16.parse_next(input)?;
    let right = le_u16.parse_next(input)?;
    let key = le_u64.parse_next(input)?;
    Ok((ref_bit, [left, right], key))
}

/// Parse a relocation section: (pointer, position, size, base_entry_index, entry_count).
pub fn parse_relocation_section_fields(input: &mut &[u8]) -> WResult<(u64, u32, u32, i32, i32)> {
    let pointer = le_u64.parse_next(input)?;
    let position = le_u32.parse_next(input)?;
    let size = le_u32.parse_next(input)?;
    let base_entry_index = le_i32.parse_next(input)?;
    let entry_count = le_i32.parse_next(input)?;
    Ok((pointer, position, size, base_entry_index, entry_count))
}

/// Parse a relocation entry: (position, array_count, relocation_count, stride).
pub fn parse_relocation_entry_fields(input: &mut &[u8]) -> WResult<(u32, u16, u8, u8)> {
    let position = le_u32.parse_next(input)?;
    let array_count = le_u16.parse_next(input)?;
    let relocation_count = le_u8.parse_next(input)?;
    let stride = le_u8.parse_next(input)?;
    Ok((position, array_count, relocation_count, stride))
}
