use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;

use crate::error::{ConverterError, Result};

/// Unpacks one vendor archive into a working directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` under `scratch` and return the working directory.
    fn extract(&self, archive: &Path, scratch: &Path) -> Result<PathBuf>;
}

/// Extractor for gzip-compressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract(&self, archive: &Path, scratch: &Path) -> Result<PathBuf> {
        let extraction = |err: std::io::Error| ConverterError::Extraction {
            path: archive.to_path_buf(),
            reason: err.to_string().into(),
        };
        let file = fs_err::File::open(archive).map_err(extraction)?;
        let mut tarball = tar::Archive::new(GzDecoder::new(file));
        tarball.unpack(scratch).map_err(extraction)?;
        Ok(scratch.to_path_buf())
    }
}

/// A private temporary directory, removed on `release` or drop.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    pub fn acquire(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("bulknews-");
        let dir = match root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory and everything in it.
    pub fn release(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Find the single record container in an extracted tree.
///
/// Hidden files are ignored. Zero or several candidates is a source error.
pub fn locate_container(working_dir: &Path) -> Result<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![working_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs_err::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                found.push(entry.path());
            }
        }
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        n => Err(ConverterError::source(format!(
            "expected one record container in {}, found {n}",
            working_dir.display()
        ))),
    }
}
