//! Output tree layout and artifact codecs.
//!
//! ```text
//! <root>/<entity-lowercase>/<YYYYMMDD>.<index-ext>   newline-joined record ids
//! <root>/content/<YYYYMMDD>.<archive-ext>            zip, one entry per record id
//! ```

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use atomic_write_file::AtomicWriteFile;
use chrono::NaiveDate;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::constants::{ARTIFACT_DATE_FORMAT, CONTENT_DIR};
use crate::error::{ConverterError, Result};
use crate::types::{ConverterConfig, EntityId, RecordId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    index_extension: String,
    archive_extension: String,
}

impl OutputLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        index_extension: impl Into<String>,
        archive_extension: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            index_extension: index_extension.into(),
            archive_extension: archive_extension.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(
            &config.output_dir,
            &config.index_extension,
            &config.archive_extension,
        )
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Index file for `entity` on `date`.
    ///
    /// The entity's directory must be a single plain segment under the root
    /// that is not the content directory; anything else is a `Persistence` error.
    pub fn index_path(&self, entity: &EntityId, date: NaiveDate) -> Result<PathBuf> {
        let segment = entity.path_segment();
        if matches!(segment.as_str(), "" | "." | "..")
            || segment == CONTENT_DIR
            || segment.contains(['/', '\\'])
        {
            return Err(ConverterError::Persistence {
                path: self.root.join(&segment),
                reason: format!("entity {entity:?} does not map to an index directory").into(),
            });
        }
        Ok(self.root.join(segment).join(format!(
            "{}.{}",
            date.format(ARTIFACT_DATE_FORMAT),
            self.index_extension
        )))
    }

    #[must_use]
    pub fn archive_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(CONTENT_DIR).join(format!(
            "{}.{}",
            date.format(ARTIFACT_DATE_FORMAT),
            self.archive_extension
        ))
    }
}

/// Write an entity index: record ids joined by newlines.
pub fn write_index(path: &Path, ids: &[RecordId]) -> Result<()> {
    let body = ids
        .iter()
        .map(RecordId::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    write_artifact(path, body.as_bytes())
}

pub fn read_index(path: &Path) -> Result<Vec<RecordId>> {
    let body = fs_err::read_to_string(path)?;
    Ok(body
        .lines()
        .filter(|line| !line.is_empty())
        .map(RecordId::new)
        .collect())
}

/// Write a date's content container, one deflated entry per record id.
pub fn write_archive(path: &Path, archive: &BTreeMap<RecordId, Vec<u8>>) -> Result<()> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (id, payload) in archive {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(id.as_str(), options)?;
        writer.write_all(payload)?;
    }
    let bytes = writer.finish()?.into_inner();
    write_artifact(path, &bytes)
}

/// Read a content container back into `{id -> payload}`.
pub fn read_archive(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let file = fs_err::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let mut payload = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut payload)?;
        entries.insert(entry.name().to_string(), payload);
    }
    Ok(entries)
}

/// Atomically replace `path` with `bytes`, warning when it already existed.
fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let persistence = |err: std::io::Error| ConverterError::Persistence {
        path: path.to_path_buf(),
        reason: err.to_string().into(),
    };
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(persistence)?;
    }
    if path.exists() {
        tracing::warn!(
            target: "bulknews::persist",
            path = %path.display(),
            "overwriting existing artifact"
        );
    }
    let mut file = AtomicWriteFile::open(path).map_err(persistence)?;
    file.write_all(bytes).map_err(persistence)?;
    file.commit().map_err(persistence)
}
