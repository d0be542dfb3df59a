//! Views over `BNSH` shader containers (`nn::gfx::ResShaderFile`).
//!
//! A container holds one variation per compiled program; each variation carries the
//! program as source, intermediate and binary forms. Only the per-stage code and control
//! blobs and the interface slot tables are read here.

use rootcause::Report;

use crate::data::binary_file::{BinaryFileHeader, signature};
use crate::data::buffer::{Memory, ResBuffer};
use crate::data::dict::ResDic;
use crate::data::relocation;
use crate::data::view::{ResArray, View, res_view};
use crate::error::{ResError, ResResult};
use crate::recognized::{RawEnum, Recognized, raw_enum};

raw_enum! {
    /// Pipeline stage, in the order stage arrays are laid out.
    pub enum ShaderStage: u8 {
        Vertex = 0,
        Hull = 1,
        Domain = 2,
        Geometry = 3,
        Pixel = 4,
        Compute = 5,
    }
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel,
        ShaderStage::Compute,
    ];

    fn array_index(self) -> usize {
        self as usize
    }
}

raw_enum! {
    pub enum ShaderCodeType: u8 {
        Binary = 0,
        Ir = 1,
        Source = 2,
        SourceArray = 3,
    }
}

raw_enum! {
    pub enum ShaderInterfaceType: u8 {
        Input = 0,
        Output = 1,
        Sampler = 2,
        ConstantBuffer = 3,
        UnorderedAccessBuffer = 4,
        Image = 5,
        SeparateTexture = 6,
        SeparateSampler = 7,
    }
}

res_view!(ShaderContainerFile, 0x20);

impl<'a> ShaderContainerFile<'a> {
    /// Relocate the container starting at `offset` inside `buffer`, which is 0 for a
    /// standalone `.bnsh` file.
    pub fn relocate(buffer: &mut ResBuffer, offset: usize) -> ResResult<bool> {
        let data = buffer.as_bytes().get(offset..).unwrap_or_default();
        BinaryFileHeader::read_expecting(data, signature::SHADER_CONTAINER)?;
        relocation::relocate(buffer, offset)
    }

    /// View the relocated container whose header is at `address`.
    pub fn at(memory: Memory<'a>, address: u64) -> ResResult<Self> {
        let header =
            BinaryFileHeader::read_expecting(memory.tail(address)?, signature::SHADER_CONTAINER)?;
        if !header.is_relocated() {
            return Err(Report::new(ResError::NotRelocated {
                what: "shader container",
            }));
        }
        Ok(Self::from_address(memory, address))
    }

    pub fn header(&self) -> ResResult<BinaryFileHeader> {
        BinaryFileHeader::read(self.memory.tail(self.address)?)
    }

    /// The `grsc` block that follows the header.
    pub fn container(&self) -> ResResult<ShaderContainer<'a>> {
        let first_block = self.header()?.first_block_offset as u64;
        if first_block == 0 {
            return Err(Report::new(ResError::corrupt("shader container has no blocks")));
        }
        Ok(ShaderContainer::from_address(
            self.memory,
            self.address + first_block,
        ))
    }
}

res_view!(ShaderContainer, 0x30);

impl<'a> ShaderContainer<'a> {
    pub fn signature(&self) -> ResResult<[u8; 4]> {
        let bytes = self.memory.bytes(self.address, 4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn variation_count(&self) -> ResResult<usize> {
        Ok(self.read_u32(0x1C)? as usize)
    }

    pub fn variations(&self) -> ResResult<ResArray<'a, ShaderVariation<'a>>> {
        self.read_array(0x20, self.variation_count()?)
    }
}

res_view!(
    /// One compiled program in its available representations.
    ShaderVariation,
    0x40
);

impl<'a> ShaderVariation<'a> {
    pub fn source(&self) -> ResResult<Option<GfxShaderProgram<'a>>> {
        self.read_view(0x0)
    }

    pub fn intermediate(&self) -> ResResult<Option<GfxShaderProgram<'a>>> {
        self.read_view(0x8)
    }

    pub fn binary(&self) -> ResResult<Option<GfxShaderProgram<'a>>> {
        self.read_view(0x10)
    }
}

res_view!(GfxShaderProgram, 0xA0);

impl<'a> GfxShaderProgram<'a> {
    pub fn option(&self) -> ResResult<u8> {
        self.read_u8(0x0)
    }

    pub fn code_type(&self) -> ResResult<Recognized<ShaderCodeType>> {
        Ok(ShaderCodeType::recognize(self.read_u8(0x1)?))
    }

    pub fn code(&self, stage: ShaderStage) -> ResResult<Option<ShaderCode<'a>>> {
        self.read_view(0x8 + stage.array_index() * 8)
    }

    pub fn object_size(&self) -> ResResult<u32> {
        self.read_u32(0x60)
    }

    pub fn interfaces(&self) -> ResResult<Option<InterfaceSlotTable<'a>>> {
        self.read_view(0x78)
    }
}

res_view!(ShaderCode, 0x40);

impl<'a> ShaderCode<'a> {
    pub fn code_size(&self) -> ResResult<u32> {
        self.read_u32(0x18)
    }

    pub fn control_size(&self) -> ResResult<u32> {
        self.read_u32(0x1C)
    }

    fn blob(&self, offset: usize, len: u32) -> ResResult<&'a [u8]> {
        match self.read_ptr(offset)? {
            Some(data) => self.memory.bytes(data, len as usize),
            None => Ok(&[]),
        }
    }

    /// Compiled machine code.
    pub fn code(&self) -> ResResult<&'a [u8]> {
        self.blob(0x10, self.code_size()?)
    }

    /// Driver control section accompanying the code.
    pub fn control(&self) -> ResResult<&'a [u8]> {
        self.blob(0x8, self.control_size()?)
    }

    pub fn extra_scratch_memory_size(&self) -> ResResult<u32> {
        self.read_u32(0x28)
    }

    pub fn scaled_scratch_memory_size(&self) -> ResResult<u32> {
        self.read_u32(0x2C)
    }
}

res_view!(InterfaceSlotTable, 0x40);

impl<'a> InterfaceSlotTable<'a> {
    pub fn stage(&self, stage: ShaderStage) -> ResResult<Option<ShaderInterfaceInfo<'a>>> {
        self.read_view(stage.array_index() * 8)
    }
}

res_view!(
    /// Symbol dictionaries and binding slots of one stage.
    ShaderInterfaceInfo,
    0x68
);

impl<'a> ShaderInterfaceInfo<'a> {
    pub fn dict(&self, kind: ShaderInterfaceType) -> ResResult<Option<ResDic<'a>>> {
        match kind {
            ShaderInterfaceType::Input => self.read_dict(0x0),
            ShaderInterfaceType::Output => self.read_dict(0x8),
            ShaderInterfaceType::Sampler => self.read_dict(0x10),
            ShaderInterfaceType::ConstantBuffer => self.read_dict(0x18),
            ShaderInterfaceType::UnorderedAccessBuffer => self.read_dict(0x20),
            ShaderInterfaceType::Image => self.read_dict(0x50),
            ShaderInterfaceType::SeparateTexture | ShaderInterfaceType::SeparateSampler => {
                let Some(dicts) = self.read_ptr(0x58)? else {
                    return Ok(None);
                };
                let index = kind as u64 - ShaderInterfaceType::SeparateTexture as u64;
                Ok(self
                    .memory
                    .pointer(dicts + index * 8)?
                    .map(|address| ResDic::new(self.memory, address)))
            }
        }
    }

    pub fn base_index(&self, kind: ShaderInterfaceType) -> ResResult<i32> {
        match kind {
            ShaderInterfaceType::Input => Ok(0),
            ShaderInterfaceType::Output => self.read_i32(0x28),
            ShaderInterfaceType::Sampler => self.read_i32(0x2C),
            ShaderInterfaceType::ConstantBuffer => self.read_i32(0x30),
            ShaderInterfaceType::UnorderedAccessBuffer => self.read_i32(0x34),
            ShaderInterfaceType::Image => self.read_i32(0x4C),
            ShaderInterfaceType::SeparateTexture => self.read_i32(0x60),
            ShaderInterfaceType::SeparateSampler => self.read_i32(0x64),
        }
    }

    /// Binding slot of element `index` of `kind`, or `None` when there is no such element.
    pub fn slot(&self, kind: ShaderInterfaceType, index: usize) -> ResResult<Option<i32>> {
        let Some(dict) = self.dict(kind)? else {
            return Ok(None);
        };
        if index >= dict.len()? {
            return Ok(None);
        }
        let Some(slots) = self.read_ptr(0x38)? else {
            return Ok(None);
        };
        let Ok(position) = u64::try_from(index as i64 + self.base_index(kind)? as i64) else {
            return Ok(None);
        };
        Ok(Some(self.memory.i32(slots + position * 4)?))
    }

    pub fn work_group_size(&self) -> ResResult<[i32; 3]> {
        Ok([self.read_i32(0x40)?, self.read_i32(0x44)?, self.read_i32(0x48)?])
    }
}
