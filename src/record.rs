//! # GlobalRecord - One Traversal Position
//!
//! A `GlobalRecord` is the unit of one traversal step over hierarchical
//! storage: the global name, an ordered list of subscripts, and the node's
//! data value when the caller asked for it. Connection primitives mutate
//! records in place (`order_next` rewrites the last subscript; the range
//! walk writes a whole candidate position into a spare record), so the same
//! two buffers carry an entire traversal without reallocation.
//!
//! Subscripts are ordered per the store's collation; the cursor engine never
//! compares them itself. An empty last subscript is the end-of-data marker
//! for single-global traversal.

use smallvec::SmallVec;

/// Subscript list; inline capacity covers typical nesting depth.
pub type KeyList = SmallVec<[String; 8]>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalRecord {
    pub name: String,
    pub keys: KeyList,
    pub data: Option<String>,
}

impl GlobalRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: KeyList::new(),
            data: None,
        }
    }

    pub fn with_keys<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            data: None,
        }
    }

    /// Number of populated subscripts.
    pub fn keyn(&self) -> usize {
        self.keys.len()
    }

    pub fn last_key(&self) -> Option<&str> {
        self.keys.last().map(String::as_str)
    }

    /// Replaces the last subscript in place. No-op on a keyless record.
    pub fn set_last_key(&mut self, part: impl Into<String>) {
        if let Some(last) = self.keys.last_mut() {
            *last = part.into();
        }
    }

    /// Rewrites this record to a new position within the same global,
    /// reusing the subscript storage.
    pub fn set_position<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.clear();
        self.keys.extend(keys.into_iter().map(Into::into));
        self.data = None;
    }
}
