use thiserror::Error;

use crate::value::Kind;

#[derive(Debug, Error)]
pub enum Error {
    /// The entry point needs a pointer so the graph behind it can be assigned through.
    #[error("expected pointer, found {found}")]
    NotAPointer { found: Kind },

    #[cfg(feature = "json")]
    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
