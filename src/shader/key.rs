//! Key vectors: one word-packed choice index per shader option.

use std::collections::BTreeMap;

use crate::error::ResResult;
use crate::models::bfsha::{OptionKind, ShadingModel};

/// Where one option's choice index is packed: a word of the key vector plus the bits
/// inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlot {
    pub word: usize,
    pub mask: u32,
    pub bit_offset: u8,
}

impl KeySlot {
    /// Decode the choice index stored in `words`.
    pub fn read(&self, words: &[u32]) -> Option<u32> {
        let word = words.get(self.word)?;
        Some((word & self.mask).checked_shr(self.bit_offset as u32).unwrap_or(0))
    }

    /// Store `choice` without touching bits outside the mask.
    pub fn write(&self, words: &mut [u32], choice: u32) {
        if let Some(word) = words.get_mut(self.word) {
            let shifted = choice.checked_shl(self.bit_offset as u32).unwrap_or(0);
            *word = (shifted & self.mask) | (*word & !self.mask);
        }
    }
}

/// Option name to choice name.
pub type OptionMap = BTreeMap<String, String>;

/// A full key vector for one shading model: static words first, then dynamic words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderKey {
    words: Vec<u32>,
}

impl ShaderKey {
    /// All-zero key of `len` words.
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len],
        }
    }

    /// Key with every option of `model` set to its default choice.
    pub fn with_defaults(model: &ShadingModel<'_>) -> ResResult<Self> {
        let mut key = Self::zeroed(model.key_length()?);
        for kind in [OptionKind::Static, OptionKind::Dynamic] {
            for option in model.options(kind)?.iter() {
                let slot = model.option_slot(&option, kind)?;
                key.write(slot, option.default_choice()? as u32);
            }
        }
        Ok(key)
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn write(&mut self, slot: KeySlot, choice: u32) {
        slot.write(&mut self.words, choice);
    }

    pub fn read(&self, slot: KeySlot) -> Option<u32> {
        slot.read(&self.words)
    }

    /// Set every option of `model` named in `options` to the choice of that name.
    ///
    /// Options absent from the map keep their current value, as do options whose value is
    /// not one of their choices.
    pub fn apply_named(&mut self, model: &ShadingModel<'_>, options: &OptionMap) -> ResResult<()> {
        for kind in [OptionKind::Static, OptionKind::Dynamic] {
            for option in model.options(kind)?.iter() {
                let Some(value) = options.get(option.name()?) else {
                    continue;
                };
                let Some(choice) = option.find_choice(value)? else {
                    tracing::trace!("{} has no choice {value}", option.name()?);
                    continue;
                };
                let slot = model.option_slot(&option, kind)?;
                self.write(slot, choice);
            }
        }
        Ok(())
    }
}

impl From<Vec<u32>> for ShaderKey {
    fn from(words: Vec<u32>) -> Self {
        Self { words }
    }
}
