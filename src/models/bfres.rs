//! Views over `.bfres` model files.
//!
//! Every record is read in place from a relocated [`ResBuffer`]; nothing is copied out
//! except scalars and the occasional small `Vec` of values.

use rootcause::Report;
use variantly::Variantly;

use crate::data::binary_file::{BinaryFileHeader, signature};
use crate::data::buffer::{Memory, ResBuffer};
use crate::data::dict::ResDic;
use crate::data::relocation;
use crate::data::view::{ResArray, View, res_view};
use crate::error::{ResError, ResResult};
use crate::recognized::{RawEnum, Recognized, raw_enum};

pub const RES_FILE_SIZE: usize = 0xF0;

/// Bits of the file's options byte.
pub mod file_options {
    /// External strings have not been resolved yet.
    pub const EXTERNAL_STRINGS_PENDING: u8 = 1 << 1;
    /// Name fields hold keys into a separate external strings file.
    pub const HAS_EXTERNAL_STRINGS: u8 = 1 << 2;
}

pub(crate) const OPTIONS_OFFSET: usize = 0xEE;

/// Look up `name` in `dict` and return the matching element of `array`.
pub(crate) fn find_in<'a, T: View<'a>>(
    dict: Option<ResDic<'a>>,
    array: ResArray<'a, T>,
    name: &str,
) -> ResResult<Option<T>> {
    let Some(dict) = dict else {
        return Ok(None);
    };
    Ok(dict.find_index(name)?.and_then(|index| array.get(index)))
}

res_view!(
    /// Root of a `.bfres` model file, starting with the binary file header.
    ResFile,
    RES_FILE_SIZE
);

impl<'a> ResFile<'a> {
    /// Relocate a model file in place. Returns `false` if it was already relocated.
    pub fn relocate(buffer: &mut ResBuffer) -> ResResult<bool> {
        BinaryFileHeader::read_expecting(buffer.as_bytes(), signature::RES_FILE)?;
        relocation::relocate(buffer, 0)
    }

    /// View the relocated model file at the start of `memory`'s primary buffer.
    pub fn new(memory: Memory<'a>) -> ResResult<Self> {
        let data = memory.primary().as_bytes();
        let header = BinaryFileHeader::read_expecting(data, signature::RES_FILE)?;
        if !header.is_relocated() {
            return Err(Report::new(ResError::NotRelocated { what: "model file" }));
        }
        if data.len() < RES_FILE_SIZE {
            return Err(Report::new(ResError::Truncated {
                need: RES_FILE_SIZE,
                have: data.len(),
            }));
        }
        Ok(Self::from_address(memory, memory.primary().base_address()))
    }

    pub fn header(&self) -> ResResult<BinaryFileHeader> {
        BinaryFileHeader::read(self.memory.primary().as_bytes())
    }

    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x20)
    }

    pub fn model_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xDC)? as usize)
    }

    pub fn models(&self) -> ResResult<ResArray<'a, ResModel<'a>>> {
        self.read_array(0x28, self.model_count()?)
    }

    pub fn model_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x30)
    }

    pub fn find_model(&self, name: &str) -> ResResult<Option<ResModel<'a>>> {
        find_in(self.model_dict()?, self.models()?, name)
    }

    pub fn skeletal_anim_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE2)? as usize)
    }

    pub fn material_anim_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE4)? as usize)
    }

    pub fn material_anims(&self) -> ResResult<ResArray<'a, ResMaterialAnim<'a>>> {
        self.read_array(0x68, self.material_anim_count()?)
    }

    pub fn material_anim_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x70)
    }

    pub fn bone_visibility_anim_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE6)? as usize)
    }

    pub fn shape_anim_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xE8)? as usize)
    }

    pub fn scene_anim_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xEA)? as usize)
    }

    pub fn embedded_file_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0xEC)? as usize)
    }

    pub fn options(&self) -> ResResult<u8> {
        self.read_u8(OPTIONS_OFFSET)
    }

    pub fn has_external_strings(&self) -> ResResult<bool> {
        Ok(self.options()? & file_options::HAS_EXTERNAL_STRINGS != 0)
    }

    pub fn external_strings_resolved(&self) -> ResResult<bool> {
        Ok(self.options()? & file_options::EXTERNAL_STRINGS_PENDING == 0)
    }

    /// Sorted key array of an external strings file. Shares its slot with the embedded
    /// file array of ordinary model files.
    pub fn external_string_keys(&self) -> ResResult<Option<u64>> {
        self.read_ptr(0xB8)
    }

    /// Dictionary of an external strings file, parallel to the key array.
    pub fn external_string_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0xC0)
    }

    /// Address of the string an external strings file substitutes for unknown keys.
    pub fn default_string(&self) -> ResResult<Option<u64>> {
        self.read_ptr(0xD0)
    }
}

res_view!(ResModel, 0x78);

impl<'a> ResModel<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    pub fn skeleton(&self) -> ResResult<Option<ResSkeleton<'a>>> {
        self.read_view(0x18)
    }

    pub fn vertices(&self) -> ResResult<ResArray<'a, ResVertex<'a>>> {
        self.read_array(0x20, self.read_u16(0x68)? as usize)
    }

    pub fn shapes(&self) -> ResResult<ResArray<'a, ResShape<'a>>> {
        self.read_array(0x28, self.read_u16(0x6A)? as usize)
    }

    pub fn shape_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x30)
    }

    pub fn find_shape(&self, name: &str) -> ResResult<Option<ResShape<'a>>> {
        find_in(self.shape_dict()?, self.shapes()?, name)
    }

    pub fn materials(&self) -> ResResult<ResArray<'a, ResMaterial<'a>>> {
        self.read_array(0x38, self.read_u16(0x6C)? as usize)
    }

    pub fn material_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x40)
    }

    pub fn find_material(&self, name: &str) -> ResResult<Option<ResMaterial<'a>>> {
        find_in(self.material_dict()?, self.materials()?, name)
    }

    pub fn shader_reflections(&self) -> ResResult<ResArray<'a, ResShaderReflection<'a>>> {
        self.read_array(0x48, self.read_u16(0x6E)? as usize)
    }

    pub fn user_data(&self) -> ResResult<ResArray<'a, UserData<'a>>> {
        self.read_array(0x50, self.read_u16(0x70)? as usize)
    }

    pub fn user_data_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x58)
    }
}

res_view!(ResSkeleton, 0x40);

impl<'a> ResSkeleton<'a> {
    pub fn bone_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x8)
    }

    pub fn bones(&self) -> ResResult<ResArray<'a, ResBone<'a>>> {
        self.read_array(0x10, self.read_u16(0x38)? as usize)
    }

    pub fn find_bone(&self, name: &str) -> ResResult<Option<ResBone<'a>>> {
        find_in(self.bone_dict()?, self.bones()?, name)
    }

    pub fn smooth_bone_count(&self) -> ResResult<u16> {
        self.read_u16(0x3A)
    }

    pub fn rigid_bone_count(&self) -> ResResult<u16> {
        self.read_u16(0x3C)
    }
}

/// Index fields use `0xFFFF` for "none".
fn optional_index(raw: u16) -> Option<u16> {
    (raw != u16::MAX).then_some(raw)
}

res_view!(ResBone, 0x58);

impl<'a> ResBone<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn user_data(&self) -> ResResult<ResArray<'a, UserData<'a>>> {
        self.read_array(0x8, self.read_u16(0x2A)? as usize)
    }

    pub fn user_data_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x10)
    }

    pub fn index(&self) -> ResResult<u16> {
        self.read_u16(0x20)
    }

    pub fn parent_index(&self) -> ResResult<Option<u16>> {
        Ok(optional_index(self.read_u16(0x22)?))
    }

    pub fn smooth_bone_index(&self) -> ResResult<Option<u16>> {
        Ok(optional_index(self.read_u16(0x24)?))
    }

    pub fn rigid_bone_index(&self) -> ResResult<Option<u16>> {
        Ok(optional_index(self.read_u16(0x26)?))
    }

    pub fn billboard_index(&self) -> ResResult<Option<u16>> {
        Ok(optional_index(self.read_u16(0x28)?))
    }

    pub fn flags(&self) -> ResResult<u32> {
        self.read_u32(0x2C)
    }

    pub fn translate(&self) -> ResResult<[f32; 3]> {
        self.read_f32s(0x30)
    }

    /// Rotation quaternion (x, y, z, w).
    pub fn rotation(&self) -> ResResult<[f32; 4]> {
        self.read_f32s(0x3C)
    }

    pub fn scale(&self) -> ResResult<[f32; 3]> {
        self.read_f32s(0x4C)
    }
}

res_view!(ResVertex, 0x58);

impl<'a> ResVertex<'a> {
    pub fn attributes(&self) -> ResResult<ResArray<'a, ResVertexAttribute<'a>>> {
        self.read_array(0x8, self.read_u8(0x4C)? as usize)
    }

    pub fn attribute_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x10)
    }

    pub fn find_attribute(&self, name: &str) -> ResResult<Option<ResVertexAttribute<'a>>> {
        find_in(self.attribute_dict()?, self.attributes()?, name)
    }

    pub fn buffer_infos(&self) -> ResResult<ResArray<'a, ResBufferInfo<'a>>> {
        self.read_array(0x38, self.buffer_count()? as usize)
    }

    pub fn base_offset(&self) -> ResResult<u32> {
        self.read_u32(0x48)
    }

    pub fn buffer_count(&self) -> ResResult<u8> {
        self.read_u8(0x4D)
    }

    pub fn index(&self) -> ResResult<u16> {
        self.read_u16(0x4E)
    }

    pub fn vertex_count(&self) -> ResResult<u32> {
        self.read_u32(0x50)
    }

    pub fn buffer_alignment(&self) -> ResResult<u16> {
        self.read_u16(0x56)
    }
}

res_view!(ResVertexAttribute, 0x10);

impl<'a> ResVertexAttribute<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    /// Raw `nn::gfx` attribute format.
    pub fn format(&self) -> ResResult<u32> {
        self.read_u32(0x8)
    }

    pub fn offset(&self) -> ResResult<u16> {
        self.read_u16(0xC)
    }

    pub fn stream_index(&self) -> ResResult<u8> {
        self.read_u8(0xE)
    }
}

// The vertex buffer info record pads the shared stride/divisor pair to 0x10.
res_view!(ResBufferInfo, 0x10);

impl ResBufferInfo<'_> {
    pub fn stride(&self) -> ResResult<i32> {
        self.read_i32(0x0)
    }

    pub fn divisor(&self) -> ResResult<i32> {
        self.read_i32(0x4)
    }
}

raw_enum! {
    pub enum IndexFormat: u32 {
        Uint8 = 0,
        Uint16 = 1,
        Uint32 = 2,
    }
}

raw_enum! {
    pub enum PrimitiveTopology: u32 {
        PointList = 0,
        LineList = 1,
        LineStrip = 2,
        TriangleList = 3,
        TriangleStrip = 4,
        LineListAdjacency = 5,
        LineStripAdjacency = 6,
        TriangleListAdjacency = 7,
        TriangleStripAdjacency = 8,
        PatchList = 9,
    }
}

res_view!(ResShape, 0x60);

impl<'a> ResShape<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    pub fn vertex(&self) -> ResResult<Option<ResVertex<'a>>> {
        self.read_view(0x10)
    }

    pub fn meshes(&self) -> ResResult<ResArray<'a, ResMesh<'a>>> {
        self.read_array(0x18, self.read_u8(0x5B)? as usize)
    }

    pub fn skin_bone_indices(&self) -> ResResult<Vec<u16>> {
        self.read_u16_array(0x20, self.read_u16(0x58)? as usize)
    }

    pub fn key_shape_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x30)
    }

    pub fn key_shape_count(&self) -> ResResult<u8> {
        self.read_u8(0x5C)
    }

    pub fn index(&self) -> ResResult<u16> {
        self.read_u16(0x50)
    }

    pub fn material_index(&self) -> ResResult<u16> {
        self.read_u16(0x52)
    }

    pub fn bone_index(&self) -> ResResult<u16> {
        self.read_u16(0x54)
    }

    pub fn vertex_index(&self) -> ResResult<u16> {
        self.read_u16(0x56)
    }

    /// Number of bone weights per vertex; 0 for rigid shapes.
    pub fn vertex_skin_weight_count(&self) -> ResResult<u8> {
        self.read_u8(0x5A)
    }
}

res_view!(ResMesh, 0x38);

impl<'a> ResMesh<'a> {
    pub fn sub_meshes(&self) -> ResResult<ResArray<'a, ResSubMeshRange<'a>>> {
        self.read_array(0x0, self.read_u16(0x34)? as usize)
    }

    pub fn buffer_offset(&self) -> ResResult<u32> {
        self.read_u32(0x20)
    }

    pub fn primitive_topology(&self) -> ResResult<Recognized<PrimitiveTopology, u32>> {
        Ok(PrimitiveTopology::recognize(self.read_u32(0x24)?))
    }

    pub fn index_format(&self) -> ResResult<Recognized<IndexFormat, u32>> {
        Ok(IndexFormat::recognize(self.read_u32(0x28)?))
    }

    pub fn index_count(&self) -> ResResult<u32> {
        self.read_u32(0x2C)
    }

    pub fn base_index(&self) -> ResResult<u32> {
        self.read_u32(0x30)
    }
}

res_view!(ResSubMeshRange, 0x8);

impl ResSubMeshRange<'_> {
    pub fn offset(&self) -> ResResult<u32> {
        self.read_u32(0x0)
    }

    pub fn index_count(&self) -> ResResult<u32> {
        self.read_u32(0x4)
    }
}

raw_enum! {
    pub enum RenderInfoType: u8 {
        Int = 0,
        Float = 1,
        String = 2,
    }
}

res_view!(ResRenderInfo, 0x10);

impl<'a> ResRenderInfo<'a> {
    /// Address of the name pointer, which holds an external string key until resolution.
    pub fn name_field(&self) -> u64 {
        self.field(0x0)
    }

    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn value_type(&self) -> ResResult<Recognized<RenderInfoType>> {
        Ok(RenderInfoType::recognize(self.read_u8(0x8)?))
    }
}

res_view!(ResShaderParam, 0x18);

impl<'a> ResShaderParam<'a> {
    pub fn name_field(&self) -> u64 {
        self.field(0x8)
    }

    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    /// Offset of the parameter inside the material's shader parameter block.
    pub fn offset(&self) -> ResResult<u16> {
        self.read_u16(0x10)
    }

    /// Raw shader parameter type.
    pub fn param_type(&self) -> ResResult<u8> {
        self.read_u8(0x12)
    }
}

res_view!(
    /// Which shading model a material was built for, and the names it refers to.
    ResShaderReflection,
    0x58
);

impl<'a> ResShaderReflection<'a> {
    pub fn archive_name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn shading_model_name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    pub fn render_info_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0x48)? as usize)
    }

    pub fn render_infos(&self) -> ResResult<ResArray<'a, ResRenderInfo<'a>>> {
        self.read_array(0x10, self.render_info_count()?)
    }

    pub fn render_info_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x18)
    }

    pub fn shader_param_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0x4A)? as usize)
    }

    pub fn shader_params(&self) -> ResResult<ResArray<'a, ResShaderParam<'a>>> {
        self.read_array(0x20, self.shader_param_count()?)
    }

    pub fn shader_param_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x28)
    }

    pub fn shader_param_data_size(&self) -> ResResult<u16> {
        self.read_u16(0x4C)
    }

    pub fn vertex_attribute_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x30)
    }

    pub fn sampler_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x38)
    }

    pub fn static_option_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x40)
    }
}

/// A static option value as a material stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum StaticOptionValue<'a> {
    Bool(bool),
    String(&'a str),
}

impl StaticOptionValue<'_> {
    /// The choice name the value selects: `"1"`/`"0"` for booleans.
    pub fn choice(&self) -> &str {
        match self {
            StaticOptionValue::Bool(true) => "1",
            StaticOptionValue::Bool(false) => "0",
            StaticOptionValue::String(value) => value,
        }
    }
}

res_view!(ResShaderData, 0x50);

impl<'a> ResShaderData<'a> {
    pub fn reflection(&self) -> ResResult<Option<ResShaderReflection<'a>>> {
        self.read_view(0x0)
    }

    pub fn vertex_attribute_names(&self) -> ResResult<Vec<Option<&'a str>>> {
        self.read_string_array(0x8, self.read_u8(0x44)? as usize)
    }

    pub fn sampler_names(&self) -> ResResult<Vec<Option<&'a str>>> {
        self.read_string_array(0x18, self.read_u8(0x45)? as usize)
    }

    pub fn bool_static_option_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0x46)? as usize)
    }

    pub fn total_static_option_count(&self) -> ResResult<usize> {
        Ok(self.read_u16(0x48)? as usize)
    }

    /// Value of boolean option `index`. The bit array stores 32 options per 64-bit word.
    pub fn bool_static_option(&self, index: usize) -> ResResult<bool> {
        let array = self
            .read_ptr(0x28)?
            .ok_or_else(|| Report::new(ResError::corrupt("missing static option bit array")))?;
        let word = self.memory.u64(array + ((index >> 5) * 8) as u64)?;
        Ok((word >> (index & 0x1F)) & 1 != 0)
    }

    /// Value of string option `index`, counted from the first string option.
    pub fn string_static_option(&self, index: usize) -> ResResult<&'a str> {
        let array = self
            .read_ptr(0x30)?
            .ok_or_else(|| Report::new(ResError::corrupt("missing static option string array")))?;
        Ok(self
            .memory
            .string_at(array + (index * 8) as u64)?
            .unwrap_or_default())
    }

    /// Every static option as (name, value), in storage order.
    ///
    /// Names come from the reflection's static option dictionary, through the index array
    /// when there is one.
    pub fn static_options(&self) -> ResResult<Vec<(&'a str, StaticOptionValue<'a>)>> {
        let total = self.total_static_option_count()?;
        if total == 0 {
            return Ok(Vec::new());
        }
        let dict = self
            .reflection()?
            .and_then(|reflection| reflection.static_option_dict().transpose())
            .transpose()?
            .ok_or_else(|| Report::new(ResError::corrupt("static options without a dictionary")))?;
        let indices = self.read_u16_array(0x38, total)?;
        let bool_count = self.bool_static_option_count()?;

        let mut options = Vec::with_capacity(total);
        for i in 0..total {
            let index = indices.get(i).map_or(i, |&index| index as usize);
            let name = dict.key(index)?;
            let value = if i < bool_count {
                StaticOptionValue::Bool(self.bool_static_option(i)?)
            } else {
                StaticOptionValue::String(self.string_static_option(i - bool_count)?)
            };
            options.push((name, value));
        }
        Ok(options)
    }
}

/// One render info value list of a material.
#[derive(Debug, Clone, PartialEq, Variantly)]
pub enum RenderInfoValue<'a> {
    Int(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<&'a str>),
}

impl<'a> RenderInfoValue<'a> {
    /// The first string value, which is how the selector reads render info.
    pub fn first_string(&self) -> Option<&'a str> {
        match self {
            RenderInfoValue::String(values) => values.first().copied(),
            _ => None,
        }
    }
}

res_view!(ResMaterial, 0xB0);

impl<'a> ResMaterial<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    pub fn index(&self) -> ResResult<u16> {
        self.read_u16(0xA0)
    }

    pub fn shader_data(&self) -> ResResult<Option<ResShaderData<'a>>> {
        self.read_view(0x10)
    }

    /// The material's shader reflection, which every material in a game-ready file has.
    pub fn shader_reflection(&self) -> ResResult<ResShaderReflection<'a>> {
        self.shader_data()?
            .and_then(|data| data.reflection().transpose())
            .transpose()?
            .ok_or_else(|| Report::new(ResError::corrupt("material has no shader reflection")))
    }

    pub fn texture_names(&self) -> ResResult<Vec<&'a str>> {
        let names = self.read_string_array(0x20, self.read_u8(0xA3)? as usize)?;
        Ok(names.into_iter().map(Option::unwrap_or_default).collect())
    }

    pub fn sampler_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x38)
    }

    /// Sampler names, in sampler order.
    pub fn sampler_names(&self) -> ResResult<Vec<&'a str>> {
        let count = self.read_u8(0xA2)? as usize;
        match self.sampler_dict()? {
            Some(dict) => (0..count).map(|i| dict.key(i)).collect(),
            None => {
                tracing::warn!("material has {count} samplers but no sampler dictionary");
                Ok(Vec::new())
            }
        }
    }

    pub fn user_data(&self) -> ResResult<ResArray<'a, UserData<'a>>> {
        self.read_array(0x70, self.read_u16(0xA6)? as usize)
    }

    pub fn user_data_dict(&self) -> ResResult<Option<ResDic<'a>>> {
        self.read_dict(0x78)
    }

    /// Values of the render info declared at `index` of the reflection.
    pub fn render_info_value(
        &self,
        info: ResRenderInfo<'a>,
        index: usize,
    ) -> ResResult<Option<RenderInfoValue<'a>>> {
        let Some(values) = self.read_ptr(0x40)? else {
            return Ok(None);
        };
        let offsets = self
            .read_ptr(0x50)?
            .ok_or_else(|| Report::new(ResError::corrupt("render info values without offsets")))?;
        let offset = self.memory.u16(offsets + (index * 2) as u64)? as u64;
        let count = match self.read_ptr(0x48)? {
            Some(counts) => self.memory.u16(counts + (index * 2) as u64)? as usize,
            None => 1,
        };

        let start = values + offset;
        let value = match info.value_type()? {
            Recognized::Known(RenderInfoType::Int) => RenderInfoValue::Int(
                (0..count)
                    .map(|i| self.memory.i32(start + (i * 4) as u64))
                    .collect::<ResResult<_>>()?,
            ),
            Recognized::Known(RenderInfoType::Float) => RenderInfoValue::Float(
                (0..count)
                    .map(|i| self.memory.f32(start + (i * 4) as u64))
                    .collect::<ResResult<_>>()?,
            ),
            Recognized::Known(RenderInfoType::String) => RenderInfoValue::String(
                (0..count)
                    .map(|i| {
                        Ok(self
                            .memory
                            .string_at(start + (i * 8) as u64)?
                            .unwrap_or_default())
                    })
                    .collect::<ResResult<_>>()?,
            ),
            Recognized::Unknown(raw) => {
                tracing::warn!("skipping render info with unknown type {raw}");
                return Ok(None);
            }
        };
        Ok(Some(value))
    }

    /// Every render info value as (name, value), in reflection order.
    pub fn render_info(&self) -> ResResult<Vec<(&'a str, RenderInfoValue<'a>)>> {
        let reflection = self.shader_reflection()?;
        let mut values = Vec::new();
        for (index, info) in reflection.render_infos()?.iter().enumerate() {
            if let Some(value) = self.render_info_value(info, index)? {
                values.push((info.name()?, value));
            }
        }
        Ok(values)
    }
}

raw_enum! {
    pub enum UserDataType: u8 {
        Int = 0,
        Float = 1,
        String = 2,
        Bytes = 3,
    }
}

res_view!(UserData, 0x40);

impl<'a> UserData<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn count(&self) -> ResResult<u32> {
        self.read_u32(0x10)
    }

    pub fn value_type(&self) -> ResResult<Recognized<UserDataType>> {
        Ok(UserDataType::recognize(self.read_u8(0x14)?))
    }

    /// Integer values; empty for other types.
    pub fn ints(&self) -> ResResult<Vec<i32>> {
        if !self.value_type()?.is(UserDataType::Int) {
            return Ok(Vec::new());
        }
        let Some(data) = self.read_ptr(0x8)? else {
            return Ok(Vec::new());
        };
        (0..self.count()? as u64)
            .map(|i| self.memory.i32(data + i * 4))
            .collect()
    }

    /// Float values; empty for other types.
    pub fn floats(&self) -> ResResult<Vec<f32>> {
        if !self.value_type()?.is(UserDataType::Float) {
            return Ok(Vec::new());
        }
        let Some(data) = self.read_ptr(0x8)? else {
            return Ok(Vec::new());
        };
        (0..self.count()? as u64)
            .map(|i| self.memory.f32(data + i * 4))
            .collect()
    }

    /// String values; empty for other types.
    pub fn strings(&self) -> ResResult<Vec<&'a str>> {
        if !self.value_type()?.is(UserDataType::String) {
            return Ok(Vec::new());
        }
        let Some(data) = self.read_ptr(0x8)? else {
            return Ok(Vec::new());
        };
        (0..self.count()? as u64)
            .map(|i| Ok(self.memory.string_at(data + i * 8)?.unwrap_or_default()))
            .collect()
    }

    /// Raw bytes; empty for other types.
    pub fn bytes(&self) -> ResResult<&'a [u8]> {
        if !self.value_type()?.is(UserDataType::Bytes) {
            return Ok(&[]);
        }
        match self.read_ptr(0x8)? {
            Some(data) => self.memory.bytes(data, self.count()? as usize),
            None => Ok(&[]),
        }
    }
}

res_view!(ResMaterialAnim, 0x70);

impl<'a> ResMaterialAnim<'a> {
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x8)
    }

    pub fn bound_model(&self) -> ResResult<Option<ResModel<'a>>> {
        self.read_view(0x18)
    }

    pub fn per_material_anims(&self) -> ResResult<ResArray<'a, ResPerMaterialAnim<'a>>> {
        self.read_array(0x28, self.read_u16(0x62)? as usize)
    }

    pub fn texture_names(&self) -> ResResult<Vec<&'a str>> {
        let names = self.read_string_array(0x38, self.read_u16(0x6C)? as usize)?;
        Ok(names.into_iter().map(Option::unwrap_or_default).collect())
    }

    pub fn frame_count(&self) -> ResResult<u32> {
        self.read_u32(0x58)
    }

    pub fn shader_param_anim_count(&self) -> ResResult<u16> {
        self.read_u16(0x66)
    }

    pub fn texture_pattern_anim_count(&self) -> ResResult<u16> {
        self.read_u16(0x68)
    }
}

res_view!(ResPerMaterialAnim, 0x40);

impl<'a> ResPerMaterialAnim<'a> {
    /// Name of the material the animation applies to.
    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn shader_param_anims(&self) -> ResResult<ResArray<'a, ResShaderParamAnim<'a>>> {
        self.read_array(0x8, self.read_u16(0x32)? as usize)
    }

    pub fn texture_pattern_anims(&self) -> ResResult<ResArray<'a, ResTexturePatternAnim<'a>>> {
        self.read_array(0x10, self.read_u16(0x34)? as usize)
    }
}

res_view!(ResShaderParamAnim, 0x18);

impl<'a> ResShaderParamAnim<'a> {
    pub fn name_field(&self) -> u64 {
        self.field(0x0)
    }

    pub fn name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn base_curve(&self) -> ResResult<u16> {
        self.read_u16(0x8)
    }

    pub fn float_curve_count(&self) -> ResResult<u16> {
        self.read_u16(0xA)
    }

    pub fn int_curve_count(&self) -> ResResult<u16> {
        self.read_u16(0xC)
    }

    pub fn base_constant(&self) -> ResResult<u16> {
        self.read_u16(0xE)
    }

    pub fn constant_count(&self) -> ResResult<u16> {
        self.read_u16(0x10)
    }

    pub fn sub_shader_param_index(&self) -> ResResult<u16> {
        self.read_u16(0x12)
    }
}

res_view!(ResTexturePatternAnim, 0x10);

impl<'a> ResTexturePatternAnim<'a> {
    pub fn texture_name(&self) -> ResResult<&'a str> {
        self.read_name(0x0)
    }

    pub fn base_curve(&self) -> ResResult<u16> {
        self.read_u16(0x8)
    }

    pub fn base_constant(&self) -> ResResult<u16> {
        self.read_u16(0xA)
    }

    pub fn sub_sampler_index(&self) -> ResResult<u8> {
        self.read_u8(0xC)
    }
}
