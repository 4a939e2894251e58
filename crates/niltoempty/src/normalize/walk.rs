//! Recursive walk that initializes nil slices and maps in place.

use std::collections::HashSet;

use tracing::trace;

use crate::options::Options;
use crate::value::{Map, Ptr, Record, Slice, Value, Visibility};

/// How a node was reached. Only settable nodes are ever assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Access {
    /// The location can be assigned through.
    pub addressable: bool,
    /// The node was reached through an internal field.
    pub read_only: bool,
}

impl Access {
    /// The root pointer handle is itself a plain value; its target is not.
    pub const ROOT: Access = Access {
        addressable: false,
        read_only: false,
    };

    pub fn settable(self) -> bool {
        self.addressable && !self.read_only
    }

    /// Access to a pointer target or a freshly allocated holder. The
    /// read-only barrier survives.
    fn addressed(self) -> Access {
        Access {
            addressable: true,
            ..self
        }
    }

    fn hidden(self) -> Access {
        Access {
            read_only: true,
            ..self
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Stats {
    /// Pointer targets, slice and map stores entered.
    pub visited: usize,
    /// Nil slices and maps replaced by empty ones.
    pub initialized: usize,
    /// Nil slices and maps left alone because they were not settable.
    pub skipped: usize,
    /// Subtrees cut off by the depth limit.
    pub truncated: usize,
}

pub(crate) struct Walker<'o> {
    options: &'o Options,
    /// Storage addresses entered so far, with the read-only flag they were
    /// entered under.
    visited: HashSet<(usize, bool)>,
    stats: Stats,
}

impl<'o> Walker<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self {
            options,
            visited: HashSet::new(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn walk(&mut self, node: &mut Value, access: Access, depth: usize) {
        if let Some(limit) = self.options.max_depth {
            if depth > limit {
                self.stats.truncated += 1;
                trace!(depth, kind = %node.kind(), "below depth limit, left as is");
                return;
            }
        }
        if self.seen(node, access) {
            return;
        }

        match node {
            Value::Ptr(ptr) => self.walk_ptr(ptr, access, depth),
            Value::Slice(slice) => self.walk_slice(slice, access, depth),
            Value::Map(map) => self.walk_map(map, access, depth),
            Value::Dynamic(slot) => self.walk_dynamic(slot, access, depth),
            Value::Array(array) => {
                for item in array.items_mut() {
                    self.walk(item, access, depth + 1);
                }
            }
            Value::Record(record) => self.walk_record(record, access, depth),
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    /// Marks the storage behind a non-nil pointer, slice or map. Returns true
    /// if it was already entered with at least the same write access,
    /// including when it is still being walked further up the stack. A node
    /// first entered read-only is entered once more on a writable path.
    fn seen(&mut self, node: &Value, access: Access) -> bool {
        let Some(id) = node.identity() else {
            return false;
        };
        let writable_seen = self.visited.contains(&(id, false));
        if writable_seen || (access.read_only && self.visited.contains(&(id, true))) {
            return true;
        }
        self.visited.insert((id, access.read_only));
        self.stats.visited += 1;
        false
    }

    fn walk_ptr(&mut self, ptr: &Ptr, access: Access, depth: usize) {
        let Some(target) = ptr.target() else {
            return;
        };
        let Ok(mut target) = target.try_borrow_mut() else {
            trace!(elem = %ptr.elem(), "pointer target is borrowed elsewhere, skipped");
            return;
        };
        self.walk(&mut target, access.addressed(), depth + 1);
    }

    fn walk_slice(&mut self, slice: &mut Slice, access: Access, depth: usize) {
        if slice.is_nil() {
            if access.settable() {
                slice.initialize();
                self.stats.initialized += 1;
            } else {
                self.stats.skipped += 1;
                trace!(elem = %slice.elem(), "nil slice is not settable");
            }
            return;
        }
        let Some(items) = slice.items() else {
            return;
        };
        let Ok(mut items) = items.try_borrow_mut() else {
            trace!(elem = %slice.elem(), "slice is borrowed elsewhere, skipped");
            return;
        };
        for item in items.iter_mut() {
            self.walk(item, access, depth + 1);
        }
    }

    fn walk_map(&mut self, map: &mut Map, access: Access, depth: usize) {
        if map.is_nil() {
            if access.settable() {
                map.initialize();
                self.stats.initialized += 1;
            } else {
                self.stats.skipped += 1;
                trace!(key = %map.key_type(), value = %map.value_type(), "nil map is not settable");
            }
            return;
        }
        let Some(entries) = map.entries() else {
            return;
        };
        let Ok(mut entries) = entries.try_borrow_mut() else {
            trace!(
                key = %map.key_type(),
                value = %map.value_type(),
                "map is borrowed elsewhere, skipped"
            );
            return;
        };

        // Entries are not addressable: normalize a detached copy and put it back.
        for (key, value) in entries.iter_mut() {
            if value.is_untyped_nil() {
                continue;
            }
            let mut holder = value.clone();
            self.walk(&mut holder, access.addressed(), depth + 1);
            if access.read_only {
                trace!(%key, "read-only map entry not written back");
            } else {
                *value = holder;
            }
        }
    }

    fn walk_dynamic(&mut self, slot: &mut Option<Box<Value>>, access: Access, depth: usize) {
        let Some(inner) = slot else {
            return;
        };
        let mut holder = (**inner).clone();
        self.walk(&mut holder, access.addressed(), depth + 1);
        if access.settable() {
            **inner = holder;
        }
    }

    fn walk_record(&mut self, record: &mut Record, access: Access, depth: usize) {
        for field in record.fields_mut() {
            match field.visibility() {
                Visibility::Exported => self.walk(field.value_mut(), access, depth + 1),
                // The pointer itself stays untouched; its target is read through.
                Visibility::Internal if is_present_ptr(field.value()) => {
                    self.walk(field.value_mut(), access.hidden(), depth + 1)
                }
                Visibility::Internal => trace!(field = field.name(), "internal field skipped"),
            }
        }
    }
}

fn is_present_ptr(value: &Value) -> bool {
    matches!(value, Value::Ptr(ptr) if !ptr.is_nil())
}
