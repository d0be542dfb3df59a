//! Constraints on option values, used to list every program a query admits.

use rootcause::Report;
use tracing::trace;

use crate::error::{ResError, ResResult};
use crate::models::bfsha::{OptionKind, ShaderOption, ShadingModel};
use crate::shader::key::KeySlot;
use crate::shader::query::{ConstraintValue, OptionValue, SearchQuery};
use crate::shader::render_info::{self, RenderInfoOption};

/// One option and the choice indices it may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub kind: OptionKind,
    pub slot: KeySlot,
    pub values: Vec<u32>,
}

impl Constraint {
    /// Whether the option's value in `words` is acceptable. An empty acceptable set never
    /// matches.
    pub fn matches(&self, words: &[u32]) -> bool {
        self.slot
            .read(words)
            .is_some_and(|value| self.values.contains(&value))
    }
}

/// Every constraint a program must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

fn choice_index(option: &ShaderOption<'_>, choice: &str) -> ResResult<u32> {
    option.find_choice(choice)?.ok_or_else(|| {
        Report::new(ResError::UnknownChoice {
            option: option.name().unwrap_or_default().to_owned(),
            value: choice.to_owned(),
        })
    })
}

fn accepted_value(
    option: &ShaderOption<'_>,
    value: &OptionValue,
    via: Option<&RenderInfoOption>,
) -> ResResult<u32> {
    match via {
        Some(entry) => {
            let word = value.as_str().ok_or_else(|| {
                Report::new(ResError::InvalidOptionValue {
                    name: entry.render_info.to_owned(),
                })
            })?;
            choice_index(option, entry.translate(word))
        }
        None => choice_index(option, &value.to_choice()),
    }
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the constraints of `query` against `model`.
    ///
    /// Static options come first, then render info (only the entries that select an
    /// option), then dynamic options.
    pub fn build(model: &ShadingModel<'_>, query: &SearchQuery) -> ResResult<Self> {
        let mut set = Self::new();
        for (name, value) in &query.static_options {
            set.push(model, OptionKind::Static, name, value, None)?;
        }
        for (name, value) in &query.render_info {
            let Some(entry) = render_info::by_render_info(name) else {
                trace!("render info {name} does not select an option");
                continue;
            };
            set.push(model, OptionKind::Static, entry.option, value, Some(entry))?;
        }
        for (name, value) in &query.dynamic_options {
            set.push(model, OptionKind::Dynamic, name, value, None)?;
        }
        Ok(set)
    }

    fn push(
        &mut self,
        model: &ShadingModel<'_>,
        kind: OptionKind,
        name: &str,
        value: &ConstraintValue,
        via: Option<&RenderInfoOption>,
    ) -> ResResult<()> {
        let option = model.find_option(kind, name)?.ok_or_else(|| {
            Report::new(ResError::UnknownOption {
                name: name.to_owned(),
            })
        })?;

        let values = match value {
            ConstraintValue::Any => (0..option.choice_count()? as u32).collect(),
            ConstraintValue::One(value) => vec![accepted_value(&option, value, via)?],
            ConstraintValue::Many(values) => values
                .iter()
                .map(|value| accepted_value(&option, value, via))
                .collect::<ResResult<_>>()?,
        };

        self.constraints.push(Constraint {
            name: name.to_owned(),
            kind,
            slot: model.option_slot(&option, kind)?,
            values,
        });
        Ok(())
    }

    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether option `name` of `kind` is constrained.
    pub fn constrains(&self, kind: OptionKind, name: &str) -> bool {
        self.constraints
            .iter()
            .any(|constraint| constraint.kind == kind && constraint.name == name)
    }

    /// An empty set matches every key.
    pub fn matches(&self, words: &[u32]) -> bool {
        self.constraints
            .iter()
            .all(|constraint| constraint.matches(words))
    }

    /// Indices of every program of `model` whose key row satisfies the set.
    pub fn matching_programs(&self, model: &ShadingModel<'_>) -> ResResult<Vec<usize>> {
        let mut matches = Vec::new();
        for index in 0..model.program_count()? {
            if self.matches(&model.key_row(index)?) {
                matches.push(index);
            }
        }
        Ok(matches)
    }
}
