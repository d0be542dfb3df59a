//! Render info values that select shader options.
//!
//! A handful of material render info entries are not options themselves but pick the value
//! of an option under a different name. Their string values translate to a choice index
//! written out as a decimal choice name.

/// Choice names the game probes when translating render info, `"0"` through `"17"`.
pub const NUMBER_NAMES: [&str; 18] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16",
    "17",
];

pub const TRUE_CHOICE: &str = "1";
pub const FALSE_CHOICE: &str = "0";

/// Dynamic option probed to find the skinning weight counts a material supports.
pub const WEIGHT_OPTION: &str = "gsys_weight";
pub const ASSIGN_TYPE_OPTION: &str = "gsys_assign_type";
pub const ASSIGN_MATERIAL: &str = "gsys_assign_material";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocabulary {
    /// Position in the word list, or `fallback` for unknown words.
    Indexed {
        words: &'static [&'static str],
        fallback: usize,
    },
    /// `"true"` selects choice `"1"`, anything else `"0"`.
    Flag,
}

/// A render info entry that selects a shader option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderInfoOption {
    pub render_info: &'static str,
    pub option: &'static str,
    vocabulary: Vocabulary,
}

pub const RENDER_STATE_MODES: [&str; 4] = ["opaque", "mask", "translucent", "custom"];
pub const COMPARE_FUNCS: [&str; 8] = [
    "never", "less", "equal", "lequal", "greater", "nequal", "gequal", "always",
];
pub const DISPLAY_FACES: [&str; 4] = ["both", "front", "back", "none"];
pub const PASSES: [&str; 4] = ["no_setting", "seal", "xlu_water", "reduced_buffer"];

pub const RENDER_INFO_OPTIONS: [RenderInfoOption; 5] = [
    RenderInfoOption {
        render_info: "gsys_render_state_mode",
        option: "gsys_renderstate",
        vocabulary: Vocabulary::Indexed {
            words: &RENDER_STATE_MODES,
            fallback: 0,
        },
    },
    RenderInfoOption {
        render_info: "gsys_alpha_test_func",
        option: "gsys_alpha_test_func",
        vocabulary: Vocabulary::Indexed {
            words: &COMPARE_FUNCS,
            fallback: 8,
        },
    },
    RenderInfoOption {
        render_info: "gsys_alpha_test_enable",
        option: "gsys_alpha_test_enable",
        vocabulary: Vocabulary::Flag,
    },
    RenderInfoOption {
        render_info: "gsys_render_state_display_face",
        option: "gsys_display_face_type",
        vocabulary: Vocabulary::Indexed {
            words: &DISPLAY_FACES,
            fallback: 1,
        },
    },
    RenderInfoOption {
        render_info: "gsys_pass",
        option: "gsys_pass",
        vocabulary: Vocabulary::Indexed {
            words: &PASSES,
            fallback: 0,
        },
    },
];

/// The option selected by render info `name`, if it selects one.
pub fn by_render_info(name: &str) -> Option<&'static RenderInfoOption> {
    RENDER_INFO_OPTIONS.iter().find(|entry| entry.render_info == name)
}

/// The render info entry that selects option `name`, if any.
pub fn by_option(name: &str) -> Option<&'static RenderInfoOption> {
    RENDER_INFO_OPTIONS.iter().find(|entry| entry.option == name)
}

impl RenderInfoOption {
    /// Choice name selected by render info value `value`.
    pub fn translate(&self, value: &str) -> &'static str {
        match self.vocabulary {
            Vocabulary::Indexed { words, fallback } => {
                let index = words.iter().position(|word| *word == value).unwrap_or(fallback);
                NUMBER_NAMES.get(index).copied().unwrap_or(FALSE_CHOICE)
            }
            Vocabulary::Flag if value == "true" => TRUE_CHOICE,
            Vocabulary::Flag => FALSE_CHOICE,
        }
    }

    /// Render info value a choice name stands for. Choices outside the vocabulary come
    /// back unchanged.
    pub fn describe<'v>(&self, choice: &'v str) -> &'v str {
        match self.vocabulary {
            Vocabulary::Indexed { words, .. } => choice
                .parse::<usize>()
                .ok()
                .and_then(|index| words.get(index).copied())
                .unwrap_or(choice),
            Vocabulary::Flag if choice == TRUE_CHOICE => "true",
            Vocabulary::Flag => "false",
        }
    }
}

/// Translate `choice` of option `option` back to its render info value, if the option is
/// selected by render info.
pub fn describe_choice<'v>(option: &str, choice: &'v str) -> &'v str {
    match by_option(option) {
        Some(entry) => entry.describe(choice),
        None => choice,
    }
}
