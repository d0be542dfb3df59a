//! Resolution of name fields that point into a separately loaded external strings file.
//!
//! Model files that share shader-related names with the rest of the game store those names
//! as opaque 64-bit keys. `ExternalBinaryString.bfres` holds a sorted key array and a
//! dictionary whose entry `i + 1` is the string for key `i`. Resolving replaces every key
//! with the address of its string, or of the table's fallback string when the key is
//! unknown.

use rootcause::Report;
use tracing::{debug, trace};

use crate::data::buffer::{Memory, ResBuffer};
use crate::data::dict::ResDic;
use crate::data::view::View;
use crate::error::{ResError, ResResult};
use crate::models::bfres::{OPTIONS_OFFSET, ResFile, file_options};

/// The lookup half of an external strings file.
#[derive(Debug, Clone, Copy)]
pub struct ExternalStringTable<'a> {
    memory: Memory<'a>,
    keys: u64,
    dict: ResDic<'a>,
    default_string: u64,
}

impl<'a> ExternalStringTable<'a> {
    pub fn new(file: ResFile<'a>) -> ResResult<Self> {
        let missing = || Report::new(ResError::corrupt("file is not an external strings table"));
        let keys = file.external_string_keys()?.ok_or_else(missing)?;
        let dict = file.external_string_dict()?.ok_or_else(missing)?;
        let default_string = file.default_string()?.ok_or_else(missing)?;
        Ok(Self {
            memory: file.memory(),
            keys,
            dict,
            default_string,
        })
    }

    pub fn len(&self) -> ResResult<usize> {
        self.dict.len()
    }

    pub fn is_empty(&self) -> ResResult<bool> {
        Ok(self.len()? == 0)
    }

    fn key_at(&self, index: usize) -> ResResult<u64> {
        self.memory.u64(self.keys + (index * 8) as u64)
    }

    /// Index of the first key not less than `key`.
    pub fn lower_bound(&self, key: u64) -> ResResult<usize> {
        let mut remaining = self.len()?;
        let mut index = 0;
        while remaining > 0 {
            let half = remaining / 2;
            if self.key_at(index + half)? < key {
                index += half + 1;
                remaining -= half + 1;
            } else {
                remaining = half;
            }
        }
        Ok(index)
    }

    /// Address of the string for `key`, or of the fallback string.
    pub fn resolve(&self, key: u64) -> ResResult<u64> {
        let index = self.lower_bound(key)?;
        if index < self.len()? && self.key_at(index)? == key {
            let entry = self.dict.entry(index + 1)?;
            if entry.key != 0 {
                return Ok(entry.key);
            }
        }
        Ok(self.default_string)
    }

    pub fn resolve_str(&self, key: u64) -> ResResult<&'a str> {
        self.memory.bin_string(self.resolve(key)?)
    }

    pub fn default_string(&self) -> u64 {
        self.default_string
    }
}

/// A pending write of `value` to the pointer field at `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Patch {
    field: u64,
    value: u64,
}

/// Resolve every name of `dict`. Entry `k + 1` of a resolved dictionary names element `k`.
fn resolve_dict_keys(
    dict: ResDic<'_>,
    table: &ExternalStringTable<'_>,
    patches: &mut Vec<Patch>,
) -> ResResult<()> {
    patches.push(Patch {
        field: dict.key_field(0),
        value: table.default_string(),
    });
    for index in 1..=dict.len()? {
        let key = dict.entry(index)?.key;
        patches.push(Patch {
            field: dict.key_field(index),
            value: table.resolve(key)?,
        });
    }
    Ok(())
}

/// Resolve a name array and, when its dictionary has not been filled in, the dictionary
/// keys alongside it.
fn resolve_name_array(
    memory: Memory<'_>,
    name_fields: impl Iterator<Item = u64>,
    dict: ResDic<'_>,
    table: &ExternalStringTable<'_>,
    patches: &mut Vec<Patch>,
) -> ResResult<()> {
    let fill_dict = dict.entry(0)?.key == 0;
    if fill_dict {
        patches.push(Patch {
            field: dict.key_field(0),
            value: table.default_string(),
        });
    }
    let dict_len = dict.len()?;
    for (k, field) in name_fields.enumerate() {
        let resolved = table.resolve(memory.u64(field)?)?;
        patches.push(Patch {
            field,
            value: resolved,
        });
        if fill_dict {
            if k >= dict_len {
                return Err(Report::new(ResError::corrupt(format!(
                    "name {k} has no entry in a dictionary of {dict_len}"
                ))));
            }
            patches.push(Patch {
                field: dict.key_field(k + 1),
                value: resolved,
            });
        }
    }
    Ok(())
}

fn collect_patches(file: ResFile<'_>, table: &ExternalStringTable<'_>) -> ResResult<Vec<Patch>> {
    let memory = file.memory();
    let mut patches = Vec::new();

    for model in file.models()?.iter() {
        for reflection in model.shader_reflections()?.iter() {
            if let Some(dict) = reflection.static_option_dict()? {
                // A filled-in root means the whole dictionary was already resolved.
                if dict.entry(0)?.key == 0 {
                    resolve_dict_keys(dict, table, &mut patches)?;
                }
            }

            if reflection.render_info_count()? != 0 {
                let dict = reflection.render_info_dict()?.ok_or_else(|| {
                    Report::new(ResError::corrupt("render info without a dictionary"))
                })?;
                let fields = reflection.render_infos()?.iter().map(|info| info.name_field());
                resolve_name_array(memory, fields, dict, table, &mut patches)?;
            }

            if reflection.shader_param_count()? != 0 {
                let dict = reflection.shader_param_dict()?.ok_or_else(|| {
                    Report::new(ResError::corrupt("shader params without a dictionary"))
                })?;
                let fields = reflection.shader_params()?.iter().map(|param| param.name_field());
                resolve_name_array(memory, fields, dict, table, &mut patches)?;
            }
        }
    }

    for anim in file.material_anims()?.iter() {
        for per_material in anim.per_material_anims()?.iter() {
            for param_anim in per_material.shader_param_anims()?.iter() {
                let field = param_anim.name_field();
                patches.push(Patch {
                    field,
                    value: table.resolve(memory.u64(field)?)?,
                });
            }
        }
    }

    Ok(patches)
}

impl ResFile<'_> {
    /// Replace the external string keys of a relocated model file with string addresses
    /// inside `external`.
    ///
    /// Returns `false` without touching the buffer when the file has no external strings
    /// or they were already resolved. `external` must outlive every view that reads the
    /// resolved names, which [`Memory::with_external`] enforces.
    pub fn relocate_external_strings(
        buffer: &mut ResBuffer,
        external: &ResBuffer,
    ) -> ResResult<bool> {
        let patches = {
            let file = ResFile::new(Memory::new(buffer))?;
            if !file.has_external_strings()? || file.external_strings_resolved()? {
                return Ok(false);
            }
            let table = ExternalStringTable::new(ResFile::new(Memory::new(external))?)?;
            collect_patches(file, &table)?
        };

        let mut offsets = Vec::with_capacity(patches.len());
        for patch in &patches {
            let offset = buffer.offset_of(patch.field).ok_or_else(|| {
                Report::new(ResError::OutOfBounds {
                    address: patch.field,
                    len: 8,
                })
            })?;
            offsets.push((offset, patch.value));
        }

        for (offset, value) in offsets {
            trace!("external string at 0x{offset:X} -> 0x{value:X}");
            buffer.write_u64_at(offset, value)?;
        }
        let options = buffer.as_bytes()[OPTIONS_OFFSET];
        buffer.write_u8_at(OPTIONS_OFFSET, options & !file_options::EXTERNAL_STRINGS_PENDING)?;
        debug!("resolved {} external string references", patches.len());
        Ok(true)
    }

    /// Relocate a model file and, when it needs them, resolve its external strings.
    pub fn prepare(buffer: &mut ResBuffer, external: Option<&ResBuffer>) -> ResResult<()> {
        ResFile::relocate(buffer)?;
        let pending = {
            let file = ResFile::new(Memory::new(buffer))?;
            file.has_external_strings()? && !file.external_strings_resolved()?
        };
        if !pending {
            return Ok(());
        }
        let external = external.ok_or_else(|| Report::new(ResError::MissingExternalStrings))?;
        ResFile::relocate_external_strings(buffer, external)?;
        Ok(())
    }
}
