//! The 0x20-byte header shared by every relocatable file (`FRES`, `FSHA`, `BNSH`).

use rootcause::Report;
use winnow::Parser;
use winnow::binary::{le_u8, le_u16, le_u32};

use crate::data::parser_utils::{WResult, parse_file_signature};
use crate::error::{ResError, ResResult};

pub const HEADER_SIZE: usize = 0x20;

/// Byte offset of the `flags` field; bit 0 is the relocated flag.
pub const FLAGS_OFFSET: usize = 0x14;

const BOM_LITTLE_ENDIAN: u16 = 0xFEFF;

/// The signatures of the file kinds this crate reads.
pub mod signature {
    pub const RES_FILE: &[u8; 8] = b"FRES    ";
    pub const SHADER_ARCHIVE: &[u8; 8] = b"FSHA    ";
    pub const SHADER_CONTAINER: &[u8; 8] = b"BNSH\0\0\0\0";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinVersion {
    pub major: u16,
    pub minor: u8,
    pub micro: u8,
}

impl std::fmt::Display for BinVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryFileHeader {
    pub signature: [u8; 8],
    pub version: BinVersion,
    pub bom: u16,
    pub alignment_shift: u8,
    pub address_size: u8,
    pub filename_offset: u32,
    pub flags: u16,
    pub first_block_offset: u16,
    pub rel_table_offset: u32,
    pub file_size: u32,
}

fn parse_header_fields(input: &mut &[u8]) -> WResult<BinaryFileHeader> {
    let signature = parse_file_signature(input)?;
    let micro = le_u8.parse_next(input)?;
    let minor = le_u8.parse_next(input)?;
    let major = le_u16.parse_next(input)?;
    let bom = le_u16.parse_next(input)?;
    let alignment_shift = le_u8.parse_next(input)?;
    let address_size = le_u8.parse_next(input)?;
    let filename_offset = le_u32.parse_next(input)?;
    let flags = le_u16.parse_next(input)?;
    let first_block_offset = le_u16.parse_next(input)?;
    let rel_table_offset = le_u32.parse_next(input)?;
    let file_size = le_u32.parse_next(input)?;
    Ok(BinaryFileHeader {
        signature,
        version: BinVersion {
            major,
            minor,
            micro,
        },
        bom,
        alignment_shift,
        address_size,
        filename_offset,
        flags,
        first_block_offset,
        rel_table_offset,
        file_size,
    })
}

impl BinaryFileHeader {
    /// Parse the header at the start of `file_data` and check it describes a little-endian
    /// file that fits inside `file_data`.
    pub fn read(file_data: &[u8]) -> ResResult<Self> {
        if file_data.len() < HEADER_SIZE {
            return Err(Report::new(ResError::Truncated {
                need: HEADER_SIZE,
                have: file_data.len(),
            }));
        }

        let header = parse_header_fields(&mut &file_data[..HEADER_SIZE]).map_err(ResError::from)?;

        if header.bom != BOM_LITTLE_ENDIAN {
            return Err(Report::new(ResError::UnsupportedByteOrder { bom: header.bom }));
        }

        let file_size = header.file_size as usize;
        if file_size < HEADER_SIZE || file_size > file_data.len() {
            return Err(Report::new(ResError::Truncated {
                need: file_size.max(HEADER_SIZE),
                have: file_data.len(),
            }));
        }

        Ok(header)
    }

    /// Parse the header and require a specific signature.
    pub fn read_expecting(file_data: &[u8], expected: &[u8; 8]) -> ResResult<Self> {
        let header = Self::read(file_data)?;
        header.expect_signature(expected)?;
        Ok(header)
    }

    pub fn expect_signature(&self, expected: &[u8; 8]) -> ResResult<()> {
        if &self.signature != expected {
            return Err(Report::new(ResError::InvalidSignature {
                actual: String::from_utf8_lossy(&self.signature).into_owned(),
                expected: String::from_utf8_lossy(expected).into_owned(),
            }));
        }
        Ok(())
    }

    pub fn is_relocated(&self) -> bool {
        self.flags & 1 != 0
    }

    pub fn alignment(&self) -> usize {
        1usize << self.alignment_shift
    }
}
