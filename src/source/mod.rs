//! Vendor archive discovery and selection.

mod extract;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

pub use extract::{ArchiveExtractor, ScratchSpace, TarGzExtractor, locate_container};

use crate::constants::{ARCHIVE_DATE_FORMAT, ARCHIVE_PREFIX, ARCHIVE_SUFFIX};
use crate::error::{ConverterError, Result};

/// Archives a targeted run needs: the previous-day and target-day ranges.
const BRACKETING_ARCHIVES: usize = 2;

/// A vendor archive and the inclusive date span it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ArchiveFile {
    /// Parse `bulkfile_<start>_<end>.tar.gz`. Other names yield `Ok(None)`.
    pub fn from_path(path: &Path) -> Result<Option<Self>> {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        let Some(span) = name
            .strip_prefix(ARCHIVE_PREFIX)
            .and_then(|rest| rest.strip_suffix(ARCHIVE_SUFFIX))
        else {
            return Ok(None);
        };
        let Some((start, end)) = span.split_once('_') else {
            return Ok(None);
        };
        let (Ok(start), Ok(end)) = (
            NaiveDate::parse_from_str(start, ARCHIVE_DATE_FORMAT),
            NaiveDate::parse_from_str(end, ARCHIVE_DATE_FORMAT),
        ) else {
            return Ok(None);
        };
        if end < start {
            return Err(ConverterError::source(format!(
                "archive {name} ends before it starts"
            )));
        }
        Ok(Some(Self {
            path: path.to_path_buf(),
            start,
            end,
        }))
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List the archives in `dir`, oldest span first.
pub fn discover(dir: &Path) -> Result<Vec<ArchiveFile>> {
    let entries = fs_err::read_dir(dir).map_err(|err| {
        ConverterError::configuration(format!("cannot read source directory: {err}"))
    })?;
    let mut archives = Vec::new();
    for entry in entries {
        let path = entry?.path();
        match ArchiveFile::from_path(&path)? {
            Some(archive) => archives.push(archive),
            None => tracing::debug!(
                target: "bulknews::source",
                path = %path.display(),
                "ignoring non-archive file"
            ),
        }
    }
    archives.sort_by(|a, b| {
        (a.start, a.end)
            .cmp(&(b.start, b.end))
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(archives)
}

/// Keep the archives whose span contains `date`; exactly two must remain.
pub fn select_for_date(archives: Vec<ArchiveFile>, date: NaiveDate) -> Result<Vec<ArchiveFile>> {
    let selected: Vec<ArchiveFile> = archives
        .into_iter()
        .filter(|archive| archive.covers(date))
        .collect();
    if selected.len() != BRACKETING_ARCHIVES {
        return Err(ConverterError::configuration(format!(
            "expected {BRACKETING_ARCHIVES} archives bracketing {date}, found {}",
            selected.len()
        )));
    }
    Ok(selected)
}
