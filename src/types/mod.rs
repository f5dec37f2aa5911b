//! Public types exposed by the `bulknews-core` crate.

pub mod entity;
pub mod options;
pub mod record;
pub mod stats;

pub use entity::{EntityId, EntityTag};
pub use options::{ConverterConfig, ConverterConfigBuilder};
pub use record::{Record, RecordId, effective_time};
pub use stats::{EngineStats, PersistenceStats, RunSummary};
