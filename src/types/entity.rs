//! Entity identifiers attached to records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved identifier of a tracked entity, e.g. an upper-case ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name used for this entity in the output tree.
    #[must_use]
    pub fn path_segment(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw vendor tag together with the entity it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityTag {
    pub raw: String,
    pub entity: EntityId,
}

impl EntityTag {
    pub fn new<S: Into<String>>(raw: S, entity: EntityId) -> Self {
        Self {
            raw: raw.into(),
            entity,
        }
    }

    /// Purely numeric raw tags are ambiguous and never indexed.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        !is_all_digits(&self.raw)
    }
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
