use std::collections::BTreeMap;

use bon::Builder;
use itertools::Itertools;
use rootcause::Report;
use tracing::debug;

use crate::data::dict::ResDic;
use crate::error::{LookupKind, ResError, ResResult};
use crate::models::bfsha::{BufferObject, OptionKind, ShaderFile, ShaderProgram, ShadingModel};
use crate::models::bnsh::ShaderStage;

/// Which parts of an archive to describe.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoOptions {
    /// Name the archive must carry. Unchecked when unset.
    #[builder(into)]
    pub archive_name: Option<String>,
    /// Shading model to describe. Every model when unset.
    #[builder(into)]
    pub model_name: Option<String>,
    /// Program whose per-stage binding slots are listed.
    pub program_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OptionInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Choices"))]
    pub choices: Vec<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Default"))]
    pub default: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UniformInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Name"))]
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "Offset"))]
    pub offset: u16,
}

/// A uniform or storage block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlockInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Size"))]
    pub size: u16,
    /// Members by offset.
    #[cfg_attr(feature = "serde", serde(rename = "Uniforms"))]
    pub uniforms: Vec<UniformInfo>,
}

/// Where a program binds one interface element in one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Slot"))]
    pub slot: i32,
    /// Name of the element in the compiled stage.
    #[cfg_attr(feature = "serde", serde(rename = "Symbol", skip_serializing_if = "Option::is_none"))]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageSlots {
    #[cfg_attr(feature = "serde", serde(rename = "Samplers"))]
    pub samplers: BTreeMap<String, SlotInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "UBOs"))]
    pub uniform_blocks: BTreeMap<String, SlotInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "SSBOs"))]
    pub storage_blocks: BTreeMap<String, SlotInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProgramInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Index"))]
    pub index: usize,
    /// Slots of every stage the model has code for, by stage name.
    #[cfg_attr(feature = "serde", serde(rename = "Stages"))]
    pub stages: BTreeMap<String, StageSlots>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Static Options"))]
    pub static_options: BTreeMap<String, OptionInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "Dynamic Options"))]
    pub dynamic_options: BTreeMap<String, OptionInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "Samplers"))]
    pub samplers: Vec<String>,
    #[cfg_attr(feature = "serde", serde(rename = "UBOs"))]
    pub uniform_blocks: BTreeMap<String, BlockInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "SSBOs"))]
    pub storage_blocks: BTreeMap<String, BlockInfo>,
    #[cfg_attr(feature = "serde", serde(rename = "Vertex Attributes"))]
    pub vertex_attributes: Vec<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Program Count"))]
    pub program_count: usize,
    #[cfg_attr(feature = "serde", serde(rename = "Program", skip_serializing_if = "Option::is_none"))]
    pub program: Option<ProgramInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ShaderInfo {
    #[cfg_attr(feature = "serde", serde(rename = "Models"))]
    pub models: BTreeMap<String, ModelInfo>,
}

fn dict_keys(dict: Option<ResDic<'_>>) -> ResResult<Vec<String>> {
    match dict {
        Some(dict) => Ok(dict.keys()?.into_iter().map(str::to_owned).collect()),
        None => Ok(Vec::new()),
    }
}

fn options(model: &ShadingModel<'_>, kind: OptionKind) -> ResResult<BTreeMap<String, OptionInfo>> {
    let mut options = BTreeMap::new();
    for option in model.options(kind)?.iter() {
        let choices = option.choice_names()?;
        let default = choices
            .get(option.default_choice()? as usize)
            .copied()
            .unwrap_or_default()
            .to_owned();
        options.insert(
            option.name()?.to_owned(),
            OptionInfo {
                choices: choices.into_iter().map(str::to_owned).collect(),
                default,
            },
        );
    }
    Ok(options)
}

fn blocks<'a>(
    dict: Option<ResDic<'a>>,
    blocks: impl Iterator<Item = BufferObject<'a>>,
) -> ResResult<BTreeMap<String, BlockInfo>> {
    let mut infos = BTreeMap::new();
    for (name, block) in dict_keys(dict)?.into_iter().zip(blocks) {
        let uniforms = block
            .named_members()?
            .into_iter()
            .map(|(name, member)| {
                Ok(UniformInfo {
                    name: name.to_owned(),
                    offset: member.offset()?,
                })
            })
            .collect::<ResResult<Vec<_>>>()?
            .into_iter()
            .sorted_by_key(|uniform| uniform.offset)
            .collect();
        infos.insert(
            name,
            BlockInfo {
                size: block.size()?,
                uniforms,
            },
        );
    }
    Ok(infos)
}

/// Slot and symbol of every element named in `names`, skipping elements the stage does
/// not bind.
fn stage_slots(
    model: &ShadingModel<'_>,
    stage: ShaderStage,
    names: &[String],
    slot: impl Fn(usize) -> ResResult<Option<i32>>,
    symbol: impl Fn(usize) -> ResResult<Option<String>>,
) -> ResResult<BTreeMap<String, SlotInfo>> {
    let mut slots = BTreeMap::new();
    for (index, name) in names.iter().enumerate() {
        let Some(position) = model.interface_position(stage, index)? else {
            continue;
        };
        let Some(value) = slot(position)?.filter(|&value| value >= 0) else {
            continue;
        };
        slots.insert(
            name.clone(),
            SlotInfo {
                slot: value,
                symbol: symbol(position)?,
            },
        );
    }
    Ok(slots)
}

fn program_info(model: &ShadingModel<'_>, index: usize) -> ResResult<ProgramInfo> {
    let program: ShaderProgram<'_> = model.programs()?.get(index).ok_or_else(|| {
        Report::new(ResError::not_found(LookupKind::Program, index.to_string()))
    })?;
    let interface = model.interface_info()?;
    let samplers = dict_keys(model.sampler_dict()?)?;
    let uniform_blocks = dict_keys(model.uniform_block_dict()?)?;
    let storage_blocks = dict_keys(model.storage_block_dict()?)?;

    let mut stages = BTreeMap::new();
    for stage in ShaderStage::ALL {
        if model.stage_base_location(stage)?.is_none() {
            continue;
        }
        let owned = |name: Option<&str>| name.map(str::to_owned);
        let slots = StageSlots {
            samplers: stage_slots(
                model,
                stage,
                &samplers,
                |position| program.sampler_slot(position),
                |position| match interface {
                    Some(info) => Ok(owned(info.sampler_location(position)?)),
                    None => Ok(None),
                },
            )?,
            uniform_blocks: stage_slots(
                model,
                stage,
                &uniform_blocks,
                |position| program.uniform_block_slot(position),
                |position| match interface {
                    Some(info) => Ok(owned(info.uniform_block_location(position)?)),
                    None => Ok(None),
                },
            )?,
            storage_blocks: stage_slots(
                model,
                stage,
                &storage_blocks,
                |position| program.storage_block_slot(position),
                |position| match interface {
                    Some(info) => Ok(owned(info.storage_block_location(position)?)),
                    None => Ok(None),
                },
            )?,
        };
        stages.insert(stage.to_string(), slots);
    }
    Ok(ProgramInfo { index, stages })
}

fn model_info(model: &ShadingModel<'_>, program_index: Option<usize>) -> ResResult<ModelInfo> {
    Ok(ModelInfo {
        static_options: options(model, OptionKind::Static)?,
        dynamic_options: options(model, OptionKind::Dynamic)?,
        samplers: dict_keys(model.sampler_dict()?)?,
        uniform_blocks: blocks(model.uniform_block_dict()?, model.uniform_blocks()?.iter())?,
        storage_blocks: blocks(model.storage_block_dict()?, model.storage_blocks()?.iter())?,
        vertex_attributes: dict_keys(model.vertex_attribute_dict()?)?,
        program_count: model.program_count()?,
        program: program_index
            .map(|index| program_info(model, index))
            .transpose()?,
    })
}

/// Describe the options, resources and program count of the shading models `options`
/// selects.
pub fn shader_info(file: &ShaderFile<'_>, options: &InfoOptions) -> ResResult<ShaderInfo> {
    let archive = file.archive()?;
    if let Some(expected) = &options.archive_name {
        if archive.name()? != expected.as_str() {
            debug!("archive is named {} when {expected} was expected", archive.name()?);
            return Err(Report::new(ResError::not_found(
                LookupKind::Archive,
                expected.as_str(),
            )));
        }
    }

    let mut info = ShaderInfo::default();
    match &options.model_name {
        Some(name) => {
            let model = archive.find_shading_model(name)?.ok_or_else(|| {
                Report::new(ResError::not_found(LookupKind::ShadingModel, name.as_str()))
            })?;
            info.models
                .insert(name.clone(), model_info(&model, options.program_index)?);
        }
        None => {
            for model in archive.shading_models()?.iter() {
                info.models.insert(
                    model.name()?.to_owned(),
                    model_info(&model, options.program_index)?,
                );
            }
        }
    }
    Ok(info)
}

/// Compiled code and control section of one stage of one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCode<'a> {
    pub stage: ShaderStage,
    pub code: &'a [u8],
    pub control: &'a [u8],
}

/// Binary code of every stage program `index` of `model` has.
pub fn stage_code<'a>(model: &ShadingModel<'a>, index: usize) -> ResResult<Vec<StageCode<'a>>> {
    let program = model.programs()?.get(index).ok_or_else(|| {
        Report::new(ResError::not_found(LookupKind::Program, index.to_string()))
    })?;
    let Some(binary) = program
        .variation()?
        .and_then(|variation| variation.binary().transpose())
        .transpose()?
    else {
        debug!("program {index} has no compiled variation");
        return Ok(Vec::new());
    };

    let mut stages = Vec::new();
    for stage in ShaderStage::ALL {
        if let Some(code) = binary.code(stage)? {
            stages.push(StageCode {
                stage,
                code: code.code()?,
                control: code.control()?,
            });
        }
    }
    Ok(stages)
}
