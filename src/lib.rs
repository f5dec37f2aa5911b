#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal helpers are self-describing; public entry points
// carry docs where the behavior is not obvious from the signature.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Counters are u64 while collection sizes are usize; values stay far below the
// point where the casts lose information.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
//
// Pattern matching: these pedantic lints often suggest changes that reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)] // Units and flushes are handed off by value
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::must_use_candidate)] // Constructors and accessors are marked where it matters

//! Bulk news archive conversion.
//!
//! Vendor archives are extracted, their articles decoded and bucketed by the UTC
//! date of their effective time, and each completed date is persisted as a zip
//! of raw payloads plus one newline-joined id list per tracked entity.

/// The bulknews-core crate version (matches `Cargo.toml`).
pub const BULKNEWS_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod converter;
pub mod engine;
pub mod error;
pub mod io;
pub mod reader;
pub mod source;
pub mod types;

pub use converter::NewsConverter;
pub use engine::{
    BucketingEngine, DateFlush, DateWatermark, EntityIndex, FlushSink, IndexEntry, WatermarkStep,
};
pub use error::{ConverterError, Result};
pub use io::{OutputLayout, PersistencePool, WorkUnit, read_archive, read_index};
pub use reader::{
    EntityResolver, JsonRecordDecoder, RecordDecoder, TickerResolver, parse_container,
};
pub use source::{
    ArchiveExtractor, ArchiveFile, ScratchSpace, TarGzExtractor, discover, locate_container,
    select_for_date,
};
pub use types::{
    ConverterConfig, ConverterConfigBuilder, EngineStats, EntityId, EntityTag, PersistenceStats,
    Record, RecordId, RunSummary, effective_time,
};
