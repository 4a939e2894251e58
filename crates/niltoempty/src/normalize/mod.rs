//! Replaces nil slices and maps reachable from a root pointer with empty ones.
//!
//! The walk follows pointers, slice and array elements, map entries, dynamic
//! slots and record fields. Nil pointers and the untyped nil are preserved.
//! A location is only assigned when it is settable: internal record fields are
//! never assigned, and nothing reached through an internal pointer is either.
//! Unsettable nil collections are left nil without reporting an error.
//!
//! Each pointer target, slice store and map store is entered at most once per
//! call and access mode: a store first reached through an internal pointer is
//! entered again when an exported path reaches it later. Cyclic graphs
//! terminate.

mod walk;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::value::{Kind, Value};

use self::walk::{Access, Walker};

/// Normalizes the graph behind `root` in place and returns `root`.
///
/// # Panics
///
/// Panics if `root` is not a [`Value::Ptr`]. Use [`try_normalize`] to get an
/// error instead.
pub fn normalize(root: &mut Value) -> &mut Value {
    normalize_with(root, &Options::default())
}

/// [`normalize`] with explicit options.
///
/// # Panics
///
/// Panics if `root` is not a [`Value::Ptr`].
pub fn normalize_with<'a>(root: &'a mut Value, options: &Options) -> &'a mut Value {
    match try_normalize_with(root, options) {
        Ok(root) => root,
        Err(err) => panic!("niltoempty: {}", err),
    }
}

pub fn try_normalize(root: &mut Value) -> Result<&mut Value> {
    try_normalize_with(root, &Options::default())
}

pub fn try_normalize_with<'a>(root: &'a mut Value, options: &Options) -> Result<&'a mut Value> {
    let kind = root.kind();
    if kind != Kind::Ptr {
        return Err(Error::NotAPointer { found: kind });
    }

    debug!(root = %root.type_of(), "normalizing");
    let mut walker = Walker::new(options);
    walker.walk(root, Access::ROOT, 0);

    let stats = walker.stats();
    debug!(
        visited = stats.visited,
        initialized = stats.initialized,
        skipped = stats.skipped,
        "normalized"
    );
    if stats.truncated > 0 {
        warn!(
            truncated = stats.truncated,
            max_depth = ?options.max_depth,
            "depth limit left subtrees unnormalized"
        );
    }
    Ok(root)
}
