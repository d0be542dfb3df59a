use thiserror::Error;

/// What kind of named thing a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Archive,
    ShadingModel,
    Model,
    Material,
    Option,
    Program,
    Stage,
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LookupKind::Archive => "shader archive",
            LookupKind::ShadingModel => "shading model",
            LookupKind::Model => "model",
            LookupKind::Material => "material",
            LookupKind::Option => "shader option",
            LookupKind::Program => "shader program",
            LookupKind::Stage => "shader stage",
        };
        f.write_str(name)
    }
}

/// Errors raised while relocating or decoding a resource buffer.
#[derive(Error, Debug)]
pub enum ResError {
    #[error("I/O error reading {path}")]
    Io {
        path: String,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to decompress {path}: {detail}")]
    Decompress { path: String, detail: String },
    #[error("buffer too small: need 0x{need:X} bytes, have 0x{have:X}")]
    Truncated { need: usize, have: usize },
    #[error("invalid signature {actual:?} (expected {expected:?})")]
    InvalidSignature { actual: String, expected: String },
    #[error("unsupported byte order marker 0x{bom:04X}")]
    UnsupportedByteOrder { bom: u16 },
    #[error("read of 0x{len:X} bytes at address 0x{address:X} is outside every loaded buffer")]
    OutOfBounds { address: u64, len: usize },
    #[error("corrupt format: {detail}")]
    CorruptFormat { detail: String },
    #[error("{what} has not been relocated")]
    NotRelocated { what: &'static str },
    #[error("file references external strings but no external string table was supplied")]
    MissingExternalStrings,
    #[error("invalid UTF-8 in string at 0x{address:X}: {err}")]
    InvalidUtf8 {
        address: u64,
        #[source]
        err: std::str::Utf8Error,
    },
    #[error("{kind} not found: {name}")]
    NotFound { kind: LookupKind, name: String },
    #[error("unknown option: {name}")]
    UnknownOption { name: String },
    #[error("unknown value for option {option}: {value}")]
    UnknownChoice { option: String, value: String },
    #[error("invalid option value for {name}")]
    InvalidOptionValue { name: String },
}

impl ResError {
    pub fn corrupt(detail: impl Into<String>) -> Self {
        ResError::CorruptFormat {
            detail: detail.into(),
        }
    }

    pub fn not_found(kind: LookupKind, name: impl Into<String>) -> Self {
        ResError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

impl From<winnow::error::ErrMode<winnow::error::ContextError>> for ResError {
    fn from(e: winnow::error::ErrMode<winnow::error::ContextError>) -> Self {
        ResError::CorruptFormat {
            detail: format!("{e}"),
        }
    }
}

pub type ResResult<T> = Result<T, rootcause::Report<ResError>>;
