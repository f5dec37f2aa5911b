use std::borrow::Cow;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while converting bulk news archives.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("configuration error: {reason}")]
    Configuration { reason: Cow<'static, str> },

    #[error("failed to extract archive {path}: {reason}")]
    Extraction {
        path: PathBuf,
        reason: Cow<'static, str>,
    },

    #[error("archive source error: {reason}")]
    Source { reason: Cow<'static, str> },

    #[error("failed to decode record container {path}: {reason}")]
    ContainerDecode {
        path: PathBuf,
        reason: Cow<'static, str>,
    },

    #[error(
        "record bucketed on {date} regresses more than one day behind watermark {watermark}"
    )]
    WindowViolation {
        date: NaiveDate,
        watermark: NaiveDate,
    },

    #[error("failed to persist {path}: {reason}")]
    Persistence {
        path: PathBuf,
        reason: Cow<'static, str>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl ConverterError {
    pub(crate) fn configuration(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn source(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Source {
            reason: reason.into(),
        }
    }

    /// Whether the error aborts the whole run.
    ///
    /// A malformed container only skips its archive, and persistence failures
    /// never leave the worker that hit them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ContainerDecode { .. } | Self::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConverterError>;
