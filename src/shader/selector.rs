//! Selecting the compiled program a material would use.

use rootcause::Report;
use tracing::{debug, trace};

use crate::error::{ResError, ResResult};
use crate::models::bfres::ResMaterial;
use crate::models::bfsha::{ShaderFile, ShadingModel};
use crate::shader::key::{OptionMap, ShaderKey};
use crate::shader::query::MaterialQuery;
use crate::shader::render_info::{self, ASSIGN_MATERIAL, ASSIGN_TYPE_OPTION};

/// Archive name, shading model name and named option values of one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSelector {
    archive_name: String,
    model_name: String,
    options: OptionMap,
}

impl ShaderSelector {
    pub fn new(archive_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
            model_name: model_name.into(),
            options: OptionMap::new(),
        }
    }

    /// Collect the options a material selects its program with: its static options, the
    /// render info entries that stand for options, and the material assign type.
    ///
    /// When a name appears twice the first value is kept.
    pub fn from_material(material: &ResMaterial<'_>) -> ResResult<Self> {
        let reflection = material.shader_reflection()?;
        let mut selector = Self::new(
            reflection.archive_name()?,
            reflection.shading_model_name()?,
        );

        let shader_data = material
            .shader_data()?
            .ok_or_else(|| Report::new(ResError::corrupt("material has no shader data")))?;
        for (name, value) in shader_data.static_options()? {
            selector.insert_option(name, value.choice());
        }

        for (name, value) in material.render_info()? {
            let Some(entry) = render_info::by_render_info(name) else {
                continue;
            };
            let Some(value) = value.first_string() else {
                trace!("render info {name} is not a string");
                continue;
            };
            selector.insert_option(entry.option, entry.translate(value));
        }

        selector.insert_option(ASSIGN_TYPE_OPTION, ASSIGN_MATERIAL);
        Ok(selector)
    }

    pub fn from_query(query: &MaterialQuery) -> Self {
        let mut selector = Self::new(query.archive_name.as_str(), query.model_name.as_str());
        for (name, value) in &query.static_options {
            selector.insert_option(name, &value.to_choice());
        }
        selector.insert_option(ASSIGN_TYPE_OPTION, &query.assign_type);
        selector
    }

    fn insert_option(&mut self, name: &str, value: &str) {
        self.options
            .entry(name.to_owned())
            .or_insert_with(|| value.to_owned());
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.options.insert(name.into(), value.into());
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The key vector this selection produces for `model`.
    pub fn key_for(&self, model: &ShadingModel<'_>) -> ResResult<ShaderKey> {
        let mut key = ShaderKey::with_defaults(model)?;
        key.apply_named(model, &self.options)?;
        Ok(key)
    }

    /// The shading model this selection targets, if `file` is the right archive and has it.
    pub fn shading_model<'a>(&self, file: &ShaderFile<'a>) -> ResResult<Option<ShadingModel<'a>>> {
        let archive = file.archive()?;
        if archive.name()? != self.archive_name {
            debug!(
                "archive {} does not match {}",
                archive.name()?,
                self.archive_name
            );
            return Ok(None);
        }
        archive.find_shading_model(&self.model_name)
    }

    /// Index of the first program of the target shading model whose key equals this
    /// selection's key.
    pub fn search(&self, file: &ShaderFile<'_>) -> ResResult<Option<usize>> {
        let Some(model) = self.shading_model(file)? else {
            return Ok(None);
        };
        let key = self.key_for(&model)?;
        model.find_program(key.words())
    }
}
