//! Builder-style configuration for a conversion run.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ARCHIVE_EXTENSION, DEFAULT_INDEX_EXTENSION, DEFAULT_MAX_OUTSTANDING};
use crate::error::{ConverterError, Result};

fn default_max_outstanding() -> usize {
    DEFAULT_MAX_OUTSTANDING
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_index_extension() -> String {
    DEFAULT_INDEX_EXTENSION.to_string()
}

fn default_archive_extension() -> String {
    DEFAULT_ARCHIVE_EXTENSION.to_string()
}

/// Settings for one conversion run over a directory of vendor archives.
///
/// Every field has a default, so a JSON config only needs to name the
/// directories. Builders make it easy to override single settings from the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding `bulkfile_<start>_<end>.tar.gz` archives.
    #[serde(default)]
    pub source_dir: PathBuf,
    /// Root of the output tree.
    #[serde(default)]
    pub output_dir: PathBuf,
    /// Restrict the run to the two archives bracketing this date.
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    /// Outstanding persistence units tolerated before the producer drains.
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: usize,
    /// Persistence worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_index_extension")]
    pub index_extension: String,
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
    /// Parent directory for scratch space; the system temp dir when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            target_date: None,
            max_outstanding: default_max_outstanding(),
            workers: default_workers(),
            index_extension: default_index_extension(),
            archive_extension: default_archive_extension(),
            scratch_root: None,
        }
    }
}

impl ConverterConfig {
    /// Start a fluent builder for `ConverterConfig`.
    #[must_use]
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = fs_err::read(path).map_err(|err| {
            ConverterError::configuration(format!("cannot read config {}: {err}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            ConverterError::configuration(format!("invalid config {}: {err}", path.display()))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_outstanding == 0 {
            return Err(ConverterError::configuration(
                "max_outstanding must be non-zero",
            ));
        }
        if self.workers == 0 {
            return Err(ConverterError::configuration("workers must be non-zero"));
        }
        for (name, ext) in [
            ("index_extension", &self.index_extension),
            ("archive_extension", &self.archive_extension),
        ] {
            if ext.is_empty() || ext.contains(['/', '\\', '.']) {
                return Err(ConverterError::configuration(format!(
                    "{name} must be a bare extension, got {ext:?}"
                )));
            }
        }
        // An entity directory could otherwise alias the content directory's files.
        if self.index_extension.eq_ignore_ascii_case(&self.archive_extension) {
            return Err(ConverterError::configuration(format!(
                "index_extension and archive_extension must differ, both are {:?}",
                self.index_extension
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConverterConfigBuilder {
    inner: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn source_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.inner.source_dir = dir.into();
        self
    }

    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.inner.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn target_date(mut self, date: NaiveDate) -> Self {
        self.inner.target_date = Some(date);
        self
    }

    #[must_use]
    pub fn max_outstanding(mut self, limit: usize) -> Self {
        self.inner.max_outstanding = limit;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.inner.workers = workers;
        self
    }

    pub fn index_extension<S: Into<String>>(mut self, ext: S) -> Self {
        self.inner.index_extension = ext.into();
        self
    }

    pub fn archive_extension<S: Into<String>>(mut self, ext: S) -> Self {
        self.inner.archive_extension = ext.into();
        self
    }

    pub fn scratch_root<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.inner.scratch_root = Some(dir.into());
        self
    }

    #[must_use]
    pub fn build(self) -> ConverterConfig {
        self.inner
    }
}
