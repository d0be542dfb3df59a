use std::fmt;

use itertools::Itertools;
use rootcause::Report;
use tracing::debug;

use crate::error::{LookupKind, ResError, ResResult};
use crate::models::bfsha::{OptionKind, ShaderFile, ShaderOption, ShadingModel};
use crate::shader::constraint::ConstraintSet;
use crate::shader::key::KeySlot;
use crate::shader::query::SearchQuery;
use crate::shader::render_info::describe_choice;

/// A program that satisfies a search, with the option values worth reporting.
///
/// A section is `None` when it is not reported at all, which differs from a reported
/// section that happens to list nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProgramMatch {
    pub index: usize,
    pub static_options: Option<Vec<(String, String)>>,
    pub dynamic_options: Option<Vec<(String, String)>>,
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    options: &Option<Vec<(String, String)>>,
) -> fmt::Result {
    let Some(options) = options else {
        return Ok(());
    };
    writeln!(f, "  {title}:")?;
    if !options.is_empty() {
        writeln!(
            f,
            "{}",
            options
                .iter()
                .format_with("\n", |(name, value), f| f(&format_args!("    {name}: {value}")))
        )?;
    }
    Ok(())
}

impl fmt::Display for ProgramMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shader Program {}:", self.index)?;
        write_section(f, "Static", &self.static_options)?;
        write_section(f, "Dynamic", &self.dynamic_options)
    }
}

fn choice_at(option: &ShaderOption<'_>, slot: KeySlot, words: &[u32]) -> ResResult<u32> {
    slot.read(words).ok_or_else(|| {
        Report::new(ResError::corrupt(format!(
            "key word {} of option {} is past the end of the key",
            slot.word,
            option.name().unwrap_or_default()
        )))
    })
}

/// `(name, choice)` of `option` in `words`. Static choices selected through render info
/// are shown as their render info value.
fn labelled(
    model: &ShadingModel<'_>,
    option: &ShaderOption<'_>,
    kind: OptionKind,
    words: &[u32],
) -> ResResult<(String, String)> {
    let slot = model.option_slot(option, kind)?;
    let name = option.name()?;
    let choice = option.choice_name(choice_at(option, slot, words)?)?;
    let choice = match kind {
        OptionKind::Static => describe_choice(name, choice),
        OptionKind::Dynamic => choice,
    };
    Ok((name.to_owned(), choice.to_owned()))
}

/// Every option of `kind` whose value in `words` is not its default.
fn non_default_options(
    model: &ShadingModel<'_>,
    kind: OptionKind,
    words: &[u32],
) -> ResResult<Vec<(String, String)>> {
    let mut options = Vec::new();
    for option in model.options(kind)?.iter() {
        let slot = model.option_slot(&option, kind)?;
        if choice_at(&option, slot, words)? == u32::from(option.default_choice()?) {
            continue;
        }
        options.push(labelled(model, &option, kind, words)?);
    }
    Ok(options)
}

fn constrained_options(
    model: &ShadingModel<'_>,
    constraints: &ConstraintSet,
    kind: OptionKind,
    words: &[u32],
) -> ResResult<Option<Vec<(String, String)>>> {
    let mut constrained = constraints
        .constraints()
        .iter()
        .filter(|constraint| constraint.kind == kind)
        .peekable();
    if constrained.peek().is_none() {
        return Ok(None);
    }
    let mut options = Vec::new();
    for constraint in constrained {
        let option = model.find_option(kind, &constraint.name)?.ok_or_else(|| {
            Report::new(ResError::UnknownOption {
                name: constraint.name.clone(),
            })
        })?;
        options.push(labelled(model, &option, kind, words)?);
    }
    Ok(Some(options))
}

/// Every program of the queried shading model whose key satisfies `query`.
///
/// Each match reports the constrained options, or with `verbose` every option that is
/// not at its default.
pub fn search_programs(
    file: &ShaderFile<'_>,
    query: &SearchQuery,
    verbose: bool,
) -> ResResult<Vec<ProgramMatch>> {
    let archive = file.archive()?;
    if archive.name()? != query.archive_name {
        debug!("expected archive {} but got {}", query.archive_name, archive.name()?);
        return Err(Report::new(ResError::not_found(
            LookupKind::Archive,
            query.archive_name.as_str(),
        )));
    }
    let model = archive.find_shading_model(&query.model_name)?.ok_or_else(|| {
        Report::new(ResError::not_found(
            LookupKind::ShadingModel,
            query.model_name.as_str(),
        ))
    })?;

    let constraints = ConstraintSet::build(&model, query)?;
    let mut matches = Vec::new();
    for index in constraints.matching_programs(&model)? {
        let words = model.key_row(index)?;
        let (static_options, dynamic_options) = if verbose {
            let reported = |kind, count: usize| -> ResResult<_> {
                if count == 0 {
                    return Ok(None);
                }
                Ok(Some(non_default_options(&model, kind, &words)?))
            };
            (
                reported(OptionKind::Static, model.static_option_count()?)?,
                reported(OptionKind::Dynamic, model.dynamic_option_count()?)?,
            )
        } else {
            (
                constrained_options(&model, &constraints, OptionKind::Static, &words)?,
                constrained_options(&model, &constraints, OptionKind::Dynamic, &words)?,
            )
        };
        matches.push(ProgramMatch {
            index,
            static_options,
            dynamic_options,
        });
    }
    Ok(matches)
}
