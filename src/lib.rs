/// Buffers, relocation, dictionaries and the views everything else is read through
pub mod data;
/// Error definitions
pub mod error;
/// Material dumps, program searches and shading model listings
pub mod export;
/// Resource file formats (bfres, bfsha, bnsh, external strings)
pub mod models;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;
/// Shader option keys, queries and program selection
pub mod shader;

#[cfg(test)]
mod testing;
