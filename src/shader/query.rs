//! Query documents: which program a material would select, and which programs satisfy a
//! set of constraints. Field names match the JSON files the command line tool reads.

use std::collections::BTreeMap;

use bon::Builder;

use crate::shader::render_info::{ASSIGN_MATERIAL, FALSE_CHOICE, TRUE_CHOICE};

/// Archive and shading model name used when a query does not name one.
pub const DEFAULT_NAME: &str = "material";

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

fn default_assign_type() -> String {
    ASSIGN_MATERIAL.to_owned()
}

/// A scalar option value as written in a query.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl OptionValue {
    /// The choice name this value selects: booleans become `"1"`/`"0"`, numbers their
    /// shortest decimal form.
    pub fn to_choice(&self) -> String {
        match self {
            OptionValue::Bool(true) => TRUE_CHOICE.to_owned(),
            OptionValue::Bool(false) => FALSE_CHOICE.to_owned(),
            OptionValue::Int(value) => value.to_string(),
            OptionValue::Float(value) => (*value as f32).to_string(),
            OptionValue::String(value) => value.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_owned())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

/// Acceptable values of one constrained option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum ConstraintValue {
    /// `null`: any choice of the option.
    Any,
    One(OptionValue),
    Many(Vec<OptionValue>),
}

/// Options to select a single program with, as if they came from a material.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialQuery {
    #[builder(into, default = default_name())]
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Archive Name", default = "default_name")
    )]
    pub archive_name: String,
    #[builder(into, default = default_name())]
    #[cfg_attr(feature = "serde", serde(rename = "Model Name", default = "default_name"))]
    pub model_name: String,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(rename = "Static Options", default))]
    pub static_options: BTreeMap<String, OptionValue>,
    #[builder(into, default = default_assign_type())]
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Assign Type", default = "default_assign_type")
    )]
    pub assign_type: String,
}

impl Default for MaterialQuery {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Constraints every reported program must satisfy.
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchQuery {
    #[builder(into, default = default_name())]
    #[cfg_attr(
        feature = "serde",
        serde(rename = "Archive Name", default = "default_name")
    )]
    pub archive_name: String,
    #[builder(into, default = default_name())]
    #[cfg_attr(feature = "serde", serde(rename = "Model Name", default = "default_name"))]
    pub model_name: String,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(rename = "Static Options", default))]
    pub static_options: BTreeMap<String, ConstraintValue>,
    /// Render info entries; only those that select an option are used.
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(rename = "Render Info", default))]
    pub render_info: BTreeMap<String, ConstraintValue>,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(rename = "Dynamic Options", default))]
    pub dynamic_options: BTreeMap<String, ConstraintValue>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::builder().build()
    }
}
