#![doc = include_str!("../README.md")]

pub mod error;
pub mod normalize;
pub mod options;
pub mod value;

#[cfg(feature = "serde")]
pub mod ser;

pub use crate::error::{Error, Result};
pub use crate::normalize::{normalize, normalize_with, try_normalize, try_normalize_with};
pub use crate::options::Options;
pub use crate::value::{
    Array, Field, Key, Kind, Map, Number, Ptr, Record, Shared, Slice, Type, Value, Visibility,
};

#[cfg(feature = "json")]
pub use crate::ser::{to_json_string, to_json_string_pretty, to_json_value};
