use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::ResResult;
use crate::models::bfres::{RenderInfoValue, ResFile, ResMaterial, StaticOptionValue};
use crate::models::bfsha::ShaderFile;
use crate::shader::query::OptionValue;
use crate::shader::render_info::{NUMBER_NAMES, WEIGHT_OPTION};
use crate::shader::selector::ShaderSelector;

/// Skinning weight counts probed for every material, `0` through `15`.
pub const MAX_SKIN_COUNT: usize = 16;

/// What one material selects its shader with, and the programs it ends up with.
///
/// The option and render info maps use the same keys a search query does, so a dumped
/// material can be fed back into a search.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialDump {
    #[cfg_attr(feature = "serde", serde(rename = "Archive Name"))]
    pub archive_name: String,
    #[cfg_attr(feature = "serde", serde(rename = "Model Name"))]
    pub model_name: String,
    #[cfg_attr(feature = "serde", serde(rename = "Static Options"))]
    pub static_options: BTreeMap<String, OptionValue>,
    #[cfg_attr(feature = "serde", serde(rename = "Samplers"))]
    pub samplers: Vec<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Textures"))]
    pub textures: Vec<String>,
    /// First value of every render info entry.
    #[cfg_attr(feature = "serde", serde(rename = "Render Info"))]
    pub render_info: BTreeMap<String, OptionValue>,
    /// Weight counts for which a program exists.
    #[cfg_attr(feature = "serde", serde(rename = "Skin Counts"))]
    pub skin_counts: Vec<u32>,
    /// Program selected for each entry of `skin_counts`.
    #[cfg_attr(feature = "serde", serde(rename = "Shader Indices"))]
    pub shader_indices: Vec<usize>,
}

/// Materials of one model, by name.
pub type ModelDump = BTreeMap<String, MaterialDump>;

/// Models of one file, by name.
pub type FileDump = BTreeMap<String, ModelDump>;

fn first_render_info_value(value: &RenderInfoValue<'_>) -> Option<OptionValue> {
    match value {
        RenderInfoValue::Int(values) => values.first().map(|&v| OptionValue::Int(v.into())),
        RenderInfoValue::Float(values) => values.first().map(|&v| OptionValue::Float(v.into())),
        RenderInfoValue::String(values) => values.first().map(|&v| OptionValue::from(v)),
    }
}

/// Summarize `material`, probing `shaders` for the program it selects at every skin count.
pub fn dump_material(material: &ResMaterial<'_>, shaders: &ShaderFile<'_>) -> ResResult<MaterialDump> {
    let reflection = material.shader_reflection()?;
    let mut dump = MaterialDump {
        archive_name: reflection.archive_name()?.to_owned(),
        model_name: reflection.shading_model_name()?.to_owned(),
        samplers: material.sampler_names()?.into_iter().map(str::to_owned).collect(),
        textures: material.texture_names()?.into_iter().map(str::to_owned).collect(),
        ..Default::default()
    };

    if let Some(shader_data) = material.shader_data()? {
        for (name, value) in shader_data.static_options()? {
            let value = match value {
                StaticOptionValue::Bool(value) => OptionValue::Bool(value),
                StaticOptionValue::String(value) => OptionValue::from(value),
            };
            dump.static_options.insert(name.to_owned(), value);
        }
    }

    for (name, value) in material.render_info()? {
        match first_render_info_value(&value) {
            Some(value) => {
                dump.render_info.insert(name.to_owned(), value);
            }
            None => debug!("render info {name} has no values"),
        }
    }

    let mut selector = ShaderSelector::from_material(material)?;
    let Some(model) = selector.shading_model(shaders)? else {
        warn!(
            "no shading model {} in archive {} for material {}",
            selector.model_name(),
            selector.archive_name(),
            material.name()?
        );
        return Ok(dump);
    };
    for (count, weight) in NUMBER_NAMES.iter().take(MAX_SKIN_COUNT).enumerate() {
        selector.set_option(WEIGHT_OPTION, *weight);
        let key = selector.key_for(&model)?;
        if let Some(index) = model.find_program(key.words())? {
            dump.skin_counts.push(count as u32);
            dump.shader_indices.push(index);
        }
    }
    Ok(dump)
}

/// Summarize every material of every model in `file`.
pub fn dump_file(file: &ResFile<'_>, shaders: &ShaderFile<'_>) -> ResResult<FileDump> {
    let mut models = FileDump::new();
    for model in file.models()?.iter() {
        let mut materials = ModelDump::new();
        for material in model.materials()?.iter() {
            materials.insert(material.name()?.to_owned(), dump_material(&material, shaders)?);
        }
        models.insert(model.name()?.to_owned(), materials);
    }
    Ok(models)
}
