//! Views over `.bfsha` shader archives.
//!
//! An archive holds shading models. Each model declares its static and dynamic options,
//! the compiled programs, and a key table with one row of `static_key_count +
//! dynamic_key_count` words per program. The compiled code itself lives in a `BNSH`
//! container embedded next to each model (see [`crate::models::bnsh`]).

use rootcause::Report;
use tracing::debug;

use crate::data::binary_file::{BinaryFileHeader, HEADER_SIZE, signature};
use crate::data::buffer::{Memory, ResBuffer};
use crate::data::dict::ResDic;
use crate::data::relocation;
use crate::data::view::{ResArray, View, res_view};
use crate::error::{LookupKind, ResError, ResResult};
use crate::models::bfres::find_in;
use crate::models::bnsh::{ShaderContainerFile, ShaderStage, ShaderVariation};
use crate::recognized::{RawEnum, Recognized, raw_enum};
use crate::shader::key::KeySlot;

pub const SHADER_FILE_SIZE: usize = 0x38;

res_view!(
    /// Root of a `.bfsha` file, starting with the binary file header.
    ShaderFile,
    SHADER_FILE_SIZE
);

impl<'a> ShaderFile<'a> {
    /// Relocate a shader archive in place, then every `BNSH` container embedded in it.
    ///
    /// Returns `false` if the archive itself was already relocated.
    pub fn relocate(buffer: &mut ResBuffer) -> ResResult<bool> {
        BinaryFileHeader::read_expecting(buffer.as_bytes(), signature::SHADER_ARCHIVE)?;
        let relocated = relocation::relocate(buffer, 0)?;

        let containers = {
            let file = ShaderFile::new(Memory::new(buffer))?;
            let mut offsets = Vec::new();
            for model in file.archive()?.shading_models()?.iter() {
                let Some(address) = model.read_ptr(0xA8)? else {
                    continue;
                };
                let offset = buffer.offset_of(address).ok_or_else(|| {
                    Report::new(ResError::OutOfBounds {
                        address,
                        len: HEADER_SIZE,
                    })
                })?;
                offsets.push(offset);
            }
            offsets
        };

        for offset in &containers {
            ShaderContainerFile::relocate(buffer, *offset)?;
        }
        debug!("relocated {} embedded shader containers", containers.len());
        Ok(relocated)
    }

    /// View the relocated shader archive at the start of `memory`'s primary buffer.
    pub fn new(memory: Memory<'a>) -> ResResult<Self> {
        let data = memory.primary().as_bytes();
        let header = BinaryFileHeader::read_expecting(data, signature::SHADER_ARCHIVE)?;
        if !header.is_relocated() {
            return Err(Report::new(ResError::NotRelocated {
                what: "shader archive",
            }));
        }
        if data.len() < SHADER_FILE_SIZE {
            return Err(Report::new(ResError::Truncated {
                need: SHADER_FILE_SIZE,
                have: data.len(),
            }));
        }
        Ok(Self::from_address(memory, memory.primary().base_address()))
    }

    pub fn header(&self) -> ResResult<BinaryFileHeader> {
        BinaryFileHeader::read(self.memory.primary().as_bytes())
    }

    pub fn archive(&self) -> ResResult<ShaderArchive<'a>> {
        self.read_view(0x20)?
            .ok_or_else(|| Report::new(ResError::corrupt("shader file has no archive")))
    }

    pub fn string_pool_size(&self) -> ResResult<u64> {
        self.read_u64(0x30)
    }
}

res_view!(ShaderArchive, 0x48);

impl<'a> ShaderArchive<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn path(&self) -> ResResult<Option<&'a str>> {
        self.read_string(0x8)
    }

    pub fn shading_model_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0x40)? as usize)
    }

    pub fn shading_models(&self) -> ResResult<ResArray<'a, ShadingModel<'a>>> {
        self.read_array(0x10, self.shading_model_count()?)
    }

    pub fn shading_model_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x18)
    }

    pub fn shader_container_count(&self) -> ResResult<u16> {
        self.read_u16(0x38)
    }

    pub fn flags(&self) -> ResResult<u16> {
        self.read_u16(0x3A)
    }

    /// Find a shading model by exact name, scanning the array in order.
    pub fn find_shading_model(&self, name: &str) -> ResResult<Option<ShadingModel<'a>>> {
        for model in self.shading_models()?.iter() {
            if model.name()? == name {
                return Ok(Some(model));
            }
        }
        Ok(None)
    }

    /// Like [`Self::find_shading_model`], but a miss is an error.
    pub fn shading_model(&self, name: &str) -> ResResult<ShadingModel<'a>> {
        self.find_shading_model(name)?
            .ok_or_else(|| Report::new(ResError::not_found(LookupKind::ShadingModel, name)))
    }
}

/// Which half of the key vector an option is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptionKind {
    Static,
    Dynamic,
}

res_view!(
    /// A named group of options, compiled programs, and the key table mapping one to the
    /// other.
    ShadingModel,
    0x100
);

impl<'a> ShadingModel<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn static_option_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE4)? as usize)
    }

    pub fn dynamic_option_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE6)? as usize)
    }

    pub fn options(&self, kind: OptionKind) -> ResResult<ResArray<'a, ShaderOption<'a>>> {
        match kind {
            OptionKind::Static => self.read_array(0x8, self.static_option_count()?),
            OptionKind::Dynamic => self.read_array(0x18, self.dynamic_option_count()?),
        }
    }

    pub fn option_dict(&self, kind: OptionKind) -> ResResult<Option<ResDic<'a>>> {
        match kind {
            OptionKind::Static => self.read_dict(0x10),
            OptionKind::Dynamic => self.read_dict(0x20),
        }
    }

    pub fn find_option(&self, kind: OptionKind, name: &str) -> ResResult<Option<ShaderOption<'a>>> {
        find_in(self.option_dict(kind)?, self.options(kind)?, name)
    }

    pub fn vertex_attribute_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xEC)? as usize)
    }

    pub fn vertex_attributes(&self) -> ResResult<ResArray<'a, VertexAttributeLocation<'a>>> {
        self.read_array(0x28, self.vertex_attribute_count()?)
    }

    pub fn vertex_attribute_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x30)
    }

    pub fn sampler_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xED)? as usize)
    }

    pub fn samplers(&self) -> ResResult<ResArray<'a, SamplerInfo<'a>>> {
        self.read_array(0x38, self.sampler_count()?)
    }

    pub fn sampler_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x40)
    }

    pub fn image_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xEE)? as usize)
    }

    pub fn uniform_block_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xEF)? as usize)
    }

    pub fn uniform_blocks(&self) -> ResResult<ResArray<'a, BufferObject<'a>>> {
        self.read_array(0x58, self.uniform_block_count()?)
    }

    pub fn uniform_block_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x60)
    }

    pub fn uniform_count(&self) -> ResResult<u32> {
        self.read_u32(0xD8)
    }

    pub fn storage_block_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xF4)? as usize)
    }

    pub fn storage_blocks(&self) -> ResResult<ResArray<'a, BufferObject<'a>>> {
        self.read_array(0x70, self.storage_block_count()?)
    }

    pub fn storage_block_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x78)
    }

    pub fn program_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE8)? as usize)
    }

    pub fn programs(&self) -> ResResult<ResArray<'a, ShaderProgram<'a>>> {
        self.read_array(0x88, self.program_count()?)
    }

    pub fn interface_info(&self) -> ResResult<Option<InterfaceInfo<'a>>> {
        self.read_view(0xA0)
    }

    /// The embedded `BNSH` container holding this model's compiled code.
    pub fn container(&self) -> ResResult<Option<ShaderContainerFile<'a>>> {
        match self.read_ptr(0xA8)? {
            Some(address) => Ok(Some(ShaderContainerFile::at(self.memory, address)?)),
            None => Ok(None),
        }
    }

    /// Index of the program built with every option at its default, or `None` (-1).
    pub fn default_program_index(&self) -> ResResult<Option<usize>> {
        let index = self.read_i32(0xE0)?;
        Ok(usize::try_from(index).ok())
    }

    pub fn static_key_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xEA)? as usize)
    }

    pub fn dynamic_key_count(&self) -> ResResult<usize> {
        Ok(self.read_u8(0xEB)? as usize)
    }

    /// Words per key vector.
    pub fn key_length(&self) -> ResResult<usize> {
        Ok(self.static_key_count()? + self.dynamic_key_count()?)
    }

    /// The key table row of program `index`.
    pub fn key_row(&self, index: usize) -> ResResult<Vec<u32>> {
        let key_length = self.key_length()?;
        let table = self
            .read_ptr(0x90)?
            .ok_or_else(|| Report::new(ResError::corrupt("shading model has no key table")))?;
        self.memory
            .u32_array(table + (index * key_length * 4) as u64, key_length)
    }

    /// Where `option` lives in this model's key vector.
    pub fn option_slot(&self, option: &ShaderOption<'a>, kind: OptionKind) -> ResResult<KeySlot> {
        let index = option.option_index()? as usize;
        let word = match kind {
            OptionKind::Static => index,
            OptionKind::Dynamic => (self.static_key_count()? + index)
                .checked_sub(option.dynamic_index_offset()? as usize)
                .ok_or_else(|| {
                    Report::new(ResError::corrupt(
                        "dynamic option index precedes its index offset",
                    ))
                })?,
        };
        let key_length = self.key_length()?;
        if word >= key_length {
            return Err(Report::new(ResError::corrupt(format!(
                "option key word {word} outside a key of {key_length} words"
            ))));
        }
        Ok(KeySlot {
            word,
            mask: option.option_mask()?,
            bit_offset: option.bit_offset()?,
        })
    }

    /// First program whose key row equals `key` word for word.
    pub fn find_program(&self, key: &[u32]) -> ResResult<Option<usize>> {
        if key.len() != self.key_length()? {
            return Ok(None);
        }
        for index in 0..self.program_count()? {
            if self.key_row(index)? == key {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub fn shader_stage_count(&self) -> ResResult<usize> {
        Ok(self.read_i8(0xFF)?.max(0) as usize)
    }

    /// Base location index of `stage` into the per-program slot arrays, or `None` when the
    /// model has no code for that stage.
    pub fn stage_base_location(&self, stage: ShaderStage) -> ResResult<Option<usize>> {
        let offset = match stage {
            ShaderStage::Vertex => 0xF9,
            ShaderStage::Geometry => 0xFA,
            ShaderStage::Pixel => 0xFB,
            ShaderStage::Compute => 0xFC,
            ShaderStage::Hull => 0xFD,
            ShaderStage::Domain => 0xFE,
        };
        Ok(usize::try_from(self.read_i8(offset)?).ok())
    }

    /// Position of interface element `index` for `stage` in the slot and location arrays.
    pub fn interface_position(&self, stage: ShaderStage, index: usize) -> ResResult<Option<usize>> {
        let Some(base) = self.stage_base_location(stage)? else {
            return Ok(None);
        };
        Ok(Some(index * self.shader_stage_count()? + base))
    }

    pub fn material_block_index(&self) -> ResResult<Option<usize>> {
        Ok(usize::try_from(self.read_i8(0xF0)?).ok())
    }

    pub fn shape_block_index(&self) -> ResResult<Option<usize>> {
        Ok(usize::try_from(self.read_i8(0xF1)?).ok())
    }

    pub fn skeleton_block_index(&self) -> ResResult<Option<usize>> {
        Ok(usize::try_from(self.read_i8(0xF2)?).ok())
    }

    pub fn option_block_index(&self) -> ResResult<Option<usize>> {
        Ok(usize::try_from(self.read_i8(0xF3)?).ok())
    }
}

res_view!(ShaderOption, 0x28);

impl<'a> ShaderOption<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn choice_dict(&self) -> ResResult<ResDic<'a>> {
        self.read_dict(0x8)?
            .ok_or_else(|| Report::new(ResError::corrupt("shader option has no choices")))
    }

    /// Raw values the choices map to, parallel to the choice dictionary.
    pub fn choice_values(&self) -> ResResult<Vec<u32>> {
        match self.read_ptr(0x10)? {
            Some(array) => self.memory.u32_array(array, self.choice_count()? as usize),
            None => Ok(Vec::new()),
        }
    }

    pub fn choice_count(&self) -> ResResult<u16> {
        self.read_u16(0x18)
    }

    pub fn default_choice(&self) -> ResResult<u16> {
        self.read_u16(0x1A)
    }

    pub fn uses_block_buffer(&self) -> ResResult<bool> {
        Ok(self.read_u8(0x1E)? != 0)
    }

    pub fn dynamic_index_offset(&self) -> ResResult<u8> {
        self.read_u8(0x1F)
    }

    pub fn option_mask(&self) -> ResResult<u32> {
        self.read_u32(0x20)
    }

    pub fn option_index(&self) -> ResResult<u8> {
        self.read_u8(0x24)
    }

    pub fn bit_offset(&self) -> ResResult<u8> {
        self.read_u8(0x25)
    }

    /// Name of choice `index`.
    pub fn choice_name(&self, index: u32) -> ResResult<&'a str> {
        self.choice_dict()?.key(index as usize)
    }

    pub fn choice_names(&self) -> ResResult<Vec<&'a str>> {
        let dict = self.choice_dict()?;
        (0..self.choice_count()? as usize)
            .map(|index| dict.key(index))
            .collect()
    }

    /// Index of the choice called `value`.
    pub fn find_choice(&self, value: &str) -> ResResult<Option<u32>> {
        Ok(self
            .choice_dict()?
            .find_index(value)?
            .map(|index| index as u32))
    }
}

res_view!(ShaderProgram, 0x40);

impl<'a> ShaderProgram<'a> {
    fn slot_array(&self, offset: usize, position: usize) -> ResResult<Option<i32>> {
        match self.read_ptr(offset)? {
            Some(array) => Ok(Some(self.memory.i32(array + (position * 4) as u64)?)),
            None => Ok(None),
        }
    }

    pub fn sampler_slot(&self, position: usize) -> ResResult<Option<i32>> {
        self.slot_array(0x0, position)
    }

    pub fn image_slot(&self, position: usize) -> ResResult<Option<i32>> {
        self.slot_array(0x8, position)
    }

    pub fn uniform_block_slot(&self, position: usize) -> ResResult<Option<i32>> {
        self.slot_array(0x10, position)
    }

    pub fn storage_block_slot(&self, position: usize) -> ResResult<Option<i32>> {
        self.slot_array(0x18, position)
    }

    /// The `BNSH` variation holding this program's compiled code.
    pub fn variation(&self) -> ResResult<Option<ShaderVariation<'a>>> {
        self.read_view(0x20)
    }

    pub fn init_mask(&self) -> ResResult<u16> {
        self.read_u16(0x34)
    }
}

res_view!(VertexAttributeLocation, 0x2);

impl VertexAttributeLocation<'_> {
    pub fn index(&self) -> ResResult<u8> {
        self.read_u8(0x0)
    }

    pub fn location(&self) -> ResResult<Option<u8>> {
        Ok(u8::try_from(self.read_i8(0x1)?).ok())
    }
}

res_view!(SamplerInfo, 0x10);

impl<'a> SamplerInfo<'a> {
    pub fn annotation(&self) -> ResResult<Option<&'a str>> {
        self.read_string(0x0)
    }

    pub fn index(&self) -> ResResult<u8> {
        self.read_u8(0x8)
    }
}

raw_enum! {
    /// What a buffer object feeds: the block a material, shape, skeleton or option
    /// parameters are uploaded into.
    pub enum BlockType: u8 {
        None = 0,
        Material = 1,
        Shape = 2,
        Skeleton = 3,
        Option = 4,
    }
}

res_view!(
    /// A uniform block or shader storage block.
    BufferObject,
    0x20
);

impl<'a> BufferObject<'a> {
    pub fn member_count(&self) -> ResResult<usize> {
        Ok(self.read_u32(0x1C)? as usize)
    }

    pub fn members(&self) -> ResResult<ResArray<'a, BufferMember<'a>>> {
        self.read_array(0x0, self.member_count()?)
    }

    pub fn member_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x8)
    }

    /// Members as (name, member), in storage order.
    pub fn named_members(&self) -> ResResult<Vec<(&'a str, BufferMember<'a>)>> {
        let Some(dict) = self.member_dict()? else {
            return Ok(Vec::new());
        };
        self.members()?
            .iter()
            .enumerate()
            .map(|(index, member)| Ok((dict.key(index)?, member)))
            .collect()
    }

    /// Initial contents of the block, if the archive stores them.
    pub fn default_value(&self) -> ResResult<Option<&'a [u8]>> {
        match self.read_ptr(0x10)? {
            Some(data) => Ok(Some(self.memory.bytes(data, self.size()? as usize)?)),
            None => Ok(None),
        }
    }

    pub fn index(&self) -> ResResult<u8> {
        self.read_u8(0x18)
    }

    pub fn block_type(&self) -> ResResult<Recognized<BlockType>> {
        Ok(BlockType::recognize(self.read_u8(0x19)?))
    }

    pub fn size(&self) -> ResResult<u16> {
        self.read_u16(0x1A)
    }
}

res_view!(BufferMember, 0x10);

impl<'a> BufferMember<'a> {
    pub fn annotation(&self) -> ResResult<Option<&'a str>> {
        self.read_string(0x0)
    }

    pub fn index(&self) -> ResResult<u32> {
        self.read_u32(0x8)
    }

    pub fn offset(&self) -> ResResult<u16> {
        self.read_u16(0xC)
    }

    pub fn block_index(&self) -> ResResult<u16> {
        self.read_u16(0xE)
    }
}

res_view!(
    /// Symbol names of every interface element, per stage.
    InterfaceInfo,
    0x20
);

impl<'a> InterfaceInfo<'a> {
    fn location(&self, offset: usize, position: usize) -> ResResult<Option<&'a str>> {
        match self.read_ptr(offset)? {
            Some(array) => self.memory.string_at(array + (position * 8) as u64),
            None => Ok(None),
        }
    }

    pub fn sampler_location(&self, position: usize) -> ResResult<Option<&'a str>> {
        self.location(0x0, position)
    }

    pub fn image_location(&self, position: usize) -> ResResult<Option<&'a str>> {
        self.location(0x8, position)
    }

    pub fn uniform_block_location(&self, position: usize) -> ResResult<Option<&'a str>> {
        self.location(0x10, position)
    }

    pub fn storage_block_location(&self, position: usize) -> ResResult<Option<&'a str>> {
        self.location(0x18, position)
    }
}
