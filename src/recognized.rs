//! Typed reads of enum fields whose on-disk values may postdate this crate.

use std::fmt;

/// An enum field read from a resource file.
///
/// `Known` holds the decoded variant. `Unknown` keeps the stored integer (a `u8` for most
/// fields) when no variant claims it, so the record can still be read and printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recognized<T, Raw = u8> {
    Known(T),
    Unknown(Raw),
}

impl<T, Raw> Recognized<T, Raw> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recognized::Known(value) => Some(value),
            Recognized::Unknown(_) => None,
        }
    }
}

impl<T: PartialEq, Raw> Recognized<T, Raw> {
    /// Whether the field decoded to exactly `variant`.
    pub fn is(&self, variant: T) -> bool {
        self.known() == Some(&variant)
    }
}

impl<T: fmt::Display, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(value) => value.fmt(f),
            Recognized::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// Enums declared with `raw_enum!`, decoded from their stored integer.
pub trait RawEnum: Sized {
    type Raw: Copy;

    fn from_raw(raw: Self::Raw) -> Option<Self>;

    fn recognize(raw: Self::Raw) -> Recognized<Self, Self::Raw> {
        Self::from_raw(raw).map_or(Recognized::Unknown(raw), Recognized::Known)
    }
}

/// Declare a `RawEnum` whose variants map one-to-one onto raw values.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $raw:ty {
            $($variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::recognized::RawEnum for $name {
            type Raw = $raw;

            fn from_raw(raw: $raw) -> Option<Self> {
                match raw {
                    $(x if x == $value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $($name::$variant => stringify!($variant),)+
                };
                f.write_str(name)
            }
        }
    };
}
pub(crate) use raw_enum;
