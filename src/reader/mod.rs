//! Record decoding: container bodies, article tokens, and entity resolution.

mod container;
mod json;
mod ticker;

use chrono::NaiveDate;
use serde_json::Value;

pub use container::parse_container;
pub use json::JsonRecordDecoder;
pub use ticker::TickerResolver;

use crate::types::{EntityId, Record};

/// Trait implemented by decoders that turn one raw article token into a `Record`.
///
/// Decoding never fails: missing or malformed fields fall back to defaults, and a
/// record that ends up without id, date, or entity tags is simply not routable.
pub trait RecordDecoder: Send + Sync {
    /// Human-readable name used for diagnostics.
    fn name(&self) -> &'static str;

    fn decode(&self, token: Value) -> Record;
}

/// Maps a raw vendor tag onto a tracked entity as of a given date.
pub trait EntityResolver: Send + Sync {
    /// Returns `None` when the tag does not name a trackable entity.
    fn resolve(&self, raw_tag: &str, as_of: NaiveDate) -> Option<EntityId>;
}
