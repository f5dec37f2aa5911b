//! Run orchestration: archives in, per-date artifacts out.
//!
//! Responsibilities:
//! - Validate configuration and pick the archives to process before anything is written.
//! - Extract each archive into its own scratch space and release it on every path.
//! - Feed decoded records through the bucketing engine and throttle the persistence pool.
//! - Skip archives whose container body does not decode; abort on any other failure.

use crate::engine::BucketingEngine;
use crate::error::Result;
use crate::io::{OutputLayout, PersistencePool};
use crate::reader::{JsonRecordDecoder, RecordDecoder, parse_container};
use crate::source::{
    ArchiveExtractor, ArchiveFile, ScratchSpace, TarGzExtractor, discover, locate_container,
    select_for_date,
};
use crate::types::{ConverterConfig, RunSummary};

/// Converts a directory of vendor archives into the output tree.
pub struct NewsConverter {
    config: ConverterConfig,
    extractor: Box<dyn ArchiveExtractor>,
    decoder: Box<dyn RecordDecoder>,
}

impl NewsConverter {
    #[must_use]
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            extractor: Box::new(TarGzExtractor),
            decoder: Box::new(JsonRecordDecoder::default()),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Box<dyn RecordDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Archives this run will process, in processing order.
    pub fn archives(&self) -> Result<Vec<ArchiveFile>> {
        let archives = discover(&self.config.source_dir)?;
        match self.config.target_date {
            Some(date) => select_for_date(archives, date),
            None => Ok(archives),
        }
    }

    /// Process every selected archive and wait for all artifacts to be written.
    ///
    /// On a fatal error the live buckets are discarded, units already submitted
    /// still finish, and the error is returned. Nothing is rolled back.
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let archives = self.archives()?;
        tracing::info!(
            target: "bulknews::converter",
            archives = archives.len(),
            source = %self.config.source_dir.display(),
            output = %self.config.output_dir.display(),
            target_date = ?self.config.target_date,
            "starting conversion"
        );

        let mut pool = PersistencePool::new(
            OutputLayout::from_config(&self.config),
            self.config.workers,
            self.config.max_outstanding,
        )?;
        let mut engine = BucketingEngine::new();
        let mut summary = RunSummary::default();

        let outcome = self.convert_all(&archives, &mut engine, &mut pool, &mut summary);
        pool.final_drain();
        summary.persistence = pool.shutdown();
        summary.engine = engine.stats();

        match outcome {
            Ok(()) => {
                tracing::info!(
                    target: "bulknews::converter",
                    processed = summary.archives_processed,
                    skipped = summary.archives_skipped,
                    records = summary.engine.records_ingested,
                    dropped = summary.engine.records_dropped,
                    dates = summary.engine.dates_flushed,
                    failed_writes = summary.persistence.failed,
                    "conversion finished"
                );
                Ok(summary)
            }
            Err(err) => {
                tracing::error!(target: "bulknews::converter", error = %err, "conversion aborted");
                Err(err)
            }
        }
    }

    fn convert_all(
        &self,
        archives: &[ArchiveFile],
        engine: &mut BucketingEngine,
        pool: &mut PersistencePool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for archive in archives {
            match self.convert_archive(archive, engine, pool) {
                Ok(_) => summary.archives_processed += 1,
                Err(err) if !err.is_fatal() => {
                    tracing::warn!(
                        target: "bulknews::converter",
                        archive = %archive.file_name(),
                        error = %err,
                        "skipping archive"
                    );
                    summary.archives_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        engine.drain_all(pool)
    }

    fn convert_archive(
        &self,
        archive: &ArchiveFile,
        engine: &mut BucketingEngine,
        pool: &mut PersistencePool,
    ) -> Result<usize> {
        let scratch = ScratchSpace::acquire(self.config.scratch_root.as_deref())?;
        let outcome = self.ingest_archive(archive, &scratch, engine, pool);
        if let Err(err) = scratch.release() {
            tracing::warn!(
                target: "bulknews::converter",
                archive = %archive.file_name(),
                error = %err,
                "failed to release scratch space"
            );
        }
        outcome
    }

    fn ingest_archive(
        &self,
        archive: &ArchiveFile,
        scratch: &ScratchSpace,
        engine: &mut BucketingEngine,
        pool: &mut PersistencePool,
    ) -> Result<usize> {
        let working = self.extractor.extract(&archive.path, scratch.path())?;
        let container = locate_container(&working)?;
        let tokens = parse_container(&container)?;
        let count = tokens.len();
        for token in tokens {
            engine.ingest(self.decoder.decode(token), pool)?;
            pool.throttle();
        }
        tracing::info!(
            target: "bulknews::converter",
            archive = %archive.file_name(),
            decoder = self.decoder.name(),
            records = count,
            watermark = %engine.watermark(),
            "archive ingested"
        );
        Ok(count)
    }
}
