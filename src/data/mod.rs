/// The file header shared by relocatable files
pub mod binary_file;
/// Owned buffers and the address space views read through
pub mod buffer;
/// Decompression of packaged files
pub mod decompress;
/// The `ResDic` binary-trie dictionary
pub mod dict;
/// Loading buffers from disk
pub mod loader;
pub mod parser_utils;
/// The `_RLT` relocation table
pub mod relocation;
/// Record views over relocated memory
pub mod view;

pub use binary_file::{BinaryFileHeader, signature};
pub use buffer::{Memory, ResBuffer};
pub use dict::ResDic;
pub use loader::{Loader, LoaderConfig};
pub use view::{ResArray, View};
