/// `.bfres` model files: models, materials, skeletons, material animations
pub mod bfres;
/// `.bfsha` shader archives
pub mod bfsha;
/// `BNSH` shader containers holding compiled code
pub mod bnsh;
/// Resolution of names stored in a shared external strings file
pub mod external_strings;

pub use bfres::ResFile;
pub use bfsha::ShaderFile;
pub use external_strings::ExternalStringTable;
