//! Shared constants for the bulk news converter.

use chrono::TimeDelta;

/// Maximum crawl/publish drift for which the crawl time is trusted as-is.
pub const MAX_CRAWL_DRIFT: TimeDelta = TimeDelta::days(1);

/// Latency applied to the publish time of historically re-crawled articles.
pub const HISTORICAL_CRAWL_OFFSET: TimeDelta = TimeDelta::hours(1);

/// Out-of-order tolerance of the bucketing watermark, in days.
pub const WINDOW_SLACK_DAYS: u64 = 1;

/// Outstanding persistence units tolerated before the producer drains.
pub const DEFAULT_MAX_OUTSTANDING: usize = 200;

pub const DEFAULT_INDEX_EXTENSION: &str = "idx";
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";

/// Directory (under the output root) holding the per-date content containers.
pub const CONTENT_DIR: &str = "content";

/// Date format used in artifact file names.
pub const ARTIFACT_DATE_FORMAT: &str = "%Y%m%d";

/// Vendor archive naming: `bulkfile_<start>_<end>.tar.gz`.
pub const ARCHIVE_PREFIX: &str = "bulkfile_";
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Field injected into every stored payload carrying the effective time.
pub const EFFECTIVE_DATE_FIELD: &str = "effectiveDate";
pub const PUBLISHED_DATE_FIELD: &str = "publishedDate";
pub const CRAWL_DATE_FIELD: &str = "crawlDate";
pub const TICKERS_FIELD: &str = "tickers";
pub const ID_FIELD: &str = "id";
