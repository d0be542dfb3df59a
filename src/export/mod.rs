/// Per-material summaries of model files, with the programs each material selects
pub mod material_dump;
/// Listing every program that satisfies a set of option constraints
pub mod search;
/// Option, resource and program slot listings of shading models
pub mod shader_info;

pub use material_dump::{MaterialDump, dump_file, dump_material};
pub use search::{ProgramMatch, search_programs};
pub use shader_info::{InfoOptions, ShaderInfo, StageCode, shader_info, stage_code};
