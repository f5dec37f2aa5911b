//! End-to-end conversion runs over real `.tar.gz` vendor archives.

use std::fs::File;
use std::path::{Path, PathBuf};

use bulknews_core::{
    BucketingEngine, ConverterConfig, ConverterError, JsonRecordDecoder, NewsConverter,
    OutputLayout, PersistencePool, RecordDecoder, read_archive, read_index,
};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    source: PathBuf,
    output: PathBuf,
    scratch: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let source = root.path().join("raw");
        let output = root.path().join("out");
        let scratch = root.path().join("scratch");
        std::fs::create_dir_all(&source).unwrap();
        Self {
            source,
            output,
            scratch,
            _root: root,
        }
    }

    fn config(&self) -> ConverterConfig {
        ConverterConfig::builder()
            .source_dir(&self.source)
            .output_dir(&self.output)
            .scratch_root(&self.scratch)
            .workers(2)
            .build()
    }

    fn archive(&self, start: &str, end: &str, articles: &[Value]) -> PathBuf {
        let body = serde_json::to_vec(articles).unwrap();
        self.raw_archive(start, end, &body)
    }

    fn raw_archive(&self, start: &str, end: &str, body: &[u8]) -> PathBuf {
        let path = self.source.join(format!("bulkfile_{start}_{end}.tar.gz"));
        let file = File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "news.json", body).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    fn index(&self, entity_dir: &str, date: &str) -> Vec<String> {
        let path = self.output.join(entity_dir).join(format!("{date}.idx"));
        read_index(&path)
            .unwrap()
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    fn content(&self, date: &str) -> std::collections::BTreeMap<String, Vec<u8>> {
        read_archive(&self.output.join("content").join(format!("{date}.zip"))).unwrap()
    }

    /// Every file written under the output root.
    fn outputs(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut pending = vec![self.output.clone()];
        while let Some(dir) = pending.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

fn article(id: u64, published: &str, crawled: &str, tickers: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("article {id}"),
        "publishedDate": published,
        "crawlDate": crawled,
        "tickers": tickers,
    })
}

fn ids_in(path: &Path) -> Vec<String> {
    if path.extension().is_some_and(|ext| ext == "zip") {
        read_archive(path).unwrap().into_keys().collect()
    } else {
        read_index(path)
            .unwrap()
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }
}

#[test]
fn numeric_tags_are_archived_but_not_indexed() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[
            article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:05:00Z", &["AAPL"]),
            article(2, "2021-03-01T11:00:00Z", "2021-03-01T11:05:00Z", &["123"]),
            article(3, "2021-03-02T09:00:00Z", "2021-03-02T09:05:00Z", &["aapl"]),
        ],
    );

    let summary = NewsConverter::new(fx.config()).run().unwrap();
    assert_eq!(summary.archives_processed, 1);
    assert_eq!(summary.engine.records_ingested, 3);
    assert_eq!(summary.engine.dates_flushed, 2);
    assert_eq!(summary.persistence.failed, 0);

    assert_eq!(fx.index("aapl", "20210301"), vec!["1"]);
    assert_eq!(fx.index("aapl", "20210302"), vec!["3"]);
    assert!(!fx.output.join("123").exists());

    let content = fx.content("20210301");
    assert_eq!(content.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    assert!(fx.scratch_is_empty());
}

#[test]
fn historical_recrawl_lands_on_publish_date() {
    let fx = Fixture::new();
    fx.archive(
        "2019-04-30",
        "2019-05-01",
        &[article(
            7,
            "2014-01-01T00:00:00Z",
            "2019-05-01T00:00:00Z",
            &["IBM"],
        )],
    );

    NewsConverter::new(fx.config()).run().unwrap();

    assert_eq!(fx.index("ibm", "20140101"), vec!["7"]);
    let stored: Value = serde_json::from_slice(&fx.content("20140101")["7"]).unwrap();
    assert_eq!(stored["effectiveDate"], "2014-01-01T01:00:00Z");
    assert!(!fx.output.join("content").join("20190501.zip").exists());
}

#[test]
fn target_date_without_both_bracketing_archives_fails_fast() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-02",
        "2021-03-03",
        &[article(1, "2021-03-02T10:00:00Z", "2021-03-02T10:00:00Z", &["AAPL"])],
    );
    let mut config = fx.config();
    config.target_date = NaiveDate::from_ymd_opt(2021, 3, 2);

    let err = NewsConverter::new(config).run().unwrap_err();
    assert!(matches!(err, ConverterError::Configuration { .. }));
    assert!(fx.outputs().is_empty());
}

#[test]
fn target_date_processes_only_bracketing_archives() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[article(1, "2021-03-01T22:00:00Z", "2021-03-01T22:00:00Z", &["MSFT"])],
    );
    fx.archive(
        "2021-03-02",
        "2021-03-03",
        &[article(2, "2021-03-02T12:00:00Z", "2021-03-02T12:00:00Z", &["MSFT"])],
    );
    fx.archive(
        "2021-03-03",
        "2021-03-04",
        &[article(3, "2021-03-03T12:00:00Z", "2021-03-03T12:00:00Z", &["MSFT"])],
    );
    let mut config = fx.config();
    config.target_date = NaiveDate::from_ymd_opt(2021, 3, 2);

    let converter = NewsConverter::new(config);
    assert_eq!(converter.archives().unwrap().len(), 2);
    let summary = converter.run().unwrap();
    assert_eq!(summary.archives_processed, 2);

    assert_eq!(fx.index("msft", "20210301"), vec!["1"]);
    assert_eq!(fx.index("msft", "20210302"), vec!["2"]);
    assert!(!fx.output.join("msft").join("20210303.idx").exists());
}

#[test]
fn malformed_container_skips_only_that_archive() {
    let fx = Fixture::new();
    fx.raw_archive("2021-03-01", "2021-03-02", b"[{\"id\": 1, \"tickers\": [");
    fx.archive(
        "2021-03-02",
        "2021-03-03",
        &[article(2, "2021-03-02T08:00:00Z", "2021-03-02T08:00:00Z", &["TSLA"])],
    );

    let summary = NewsConverter::new(fx.config()).run().unwrap();
    assert_eq!(summary.archives_skipped, 1);
    assert_eq!(summary.archives_processed, 1);
    assert_eq!(fx.index("tsla", "20210302"), vec!["2"]);
    assert!(fx.scratch_is_empty());
}

#[test]
fn corrupt_archive_aborts_the_run() {
    let fx = Fixture::new();
    std::fs::write(
        fx.source.join("bulkfile_2021-03-01_2021-03-02.tar.gz"),
        b"truncated download",
    )
    .unwrap();

    let err = NewsConverter::new(fx.config()).run().unwrap_err();
    assert!(matches!(err, ConverterError::Extraction { .. }));
    assert!(fx.scratch_is_empty());
}

#[test]
fn regression_beyond_window_aborts_and_releases_scratch() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-04",
        "2021-03-05",
        &[
            article(1, "2021-03-05T10:00:00Z", "2021-03-05T10:00:00Z", &["AAPL"]),
            article(2, "2021-03-02T10:00:00Z", "2021-03-02T10:00:00Z", &["AAPL"]),
        ],
    );

    let err = NewsConverter::new(fx.config()).run().unwrap_err();
    assert!(matches!(err, ConverterError::WindowViolation { .. }));
    assert!(fx.outputs().is_empty(), "live buckets are not committed");
    assert!(fx.scratch_is_empty());
}

#[test]
fn untagged_records_never_reach_any_artifact() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[
            article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:00:00Z", &["AAPL"]),
            article(99, "2021-03-01T10:30:00Z", "2021-03-01T10:30:00Z", &[]),
            article(98, "2021-03-01T10:40:00Z", "2021-03-01T10:40:00Z", &["not a ticker"]),
            json!({"id": 97, "tickers": ["AAPL"]}),
        ],
    );

    let summary = NewsConverter::new(fx.config()).run().unwrap();
    assert_eq!(summary.engine.records_dropped, 3);

    let outputs = fx.outputs();
    assert!(!outputs.is_empty());
    for path in outputs {
        let ids = ids_in(&path);
        for dropped in ["99", "98", "97"] {
            assert!(
                !ids.iter().any(|id| id == dropped),
                "{dropped} found in {}",
                path.display()
            );
        }
    }
}

#[test]
fn index_is_time_ordered_across_archives() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[
            article(10, "2021-03-02T18:00:00Z", "2021-03-02T18:00:00Z", &["NVDA"]),
            article(11, "2021-03-01T23:00:00Z", "2021-03-01T23:00:00Z", &["NVDA"]),
        ],
    );
    fx.archive(
        "2021-03-02",
        "2021-03-03",
        &[
            article(12, "2021-03-02T03:00:00Z", "2021-03-02T03:00:00Z", &["NVDA"]),
            article(13, "2021-03-02T09:00:00Z", "2021-03-02T09:00:00Z", &["NVDA", "AMD"]),
        ],
    );

    let mut config = fx.config();
    config.workers = 1;
    config.max_outstanding = 1;
    NewsConverter::new(config).run().unwrap();

    assert_eq!(fx.index("nvda", "20210301"), vec!["11"]);
    assert_eq!(fx.index("nvda", "20210302"), vec!["12", "13", "10"]);
    assert_eq!(fx.index("amd", "20210302"), vec!["13"]);
}

#[test]
fn stored_payload_matches_decoder_output() {
    let fx = Fixture::new();
    let token = article(
        5,
        "2021-03-01T10:00:00.123456Z",
        "2021-03-01T10:01:00+00:00",
        &["GOOG", "GOOGL"],
    );
    fx.archive("2021-03-01", "2021-03-02", std::slice::from_ref(&token));

    NewsConverter::new(fx.config()).run().unwrap();

    let expected = JsonRecordDecoder::default().decode(token).payload;
    assert_eq!(fx.content("20210301")["5"], expected);
}

#[test]
fn rerun_overwrites_existing_artifacts() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:00:00Z", &["AAPL"])],
    );

    NewsConverter::new(fx.config()).run().unwrap();
    let first = fx.outputs();
    let summary = NewsConverter::new(fx.config()).run().unwrap();

    assert_eq!(fx.outputs(), first);
    assert_eq!(summary.persistence.failed, 0);
    assert_eq!(fx.index("aapl", "20210301"), vec!["1"]);
}

#[test]
fn punctuation_tags_never_escape_the_output_root() {
    let fx = Fixture::new();
    let parent = fx.output.parent().unwrap().join("nested");
    let mut config = fx.config();
    config.output_dir = parent.join("out");
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[
            article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:00:00Z", &["..", ".", "AAPL"]),
            article(2, "2021-03-01T11:00:00Z", "2021-03-01T11:00:00Z", &[".."]),
        ],
    );

    let summary = NewsConverter::new(config.clone()).run().unwrap();
    assert_eq!(summary.engine.records_dropped, 1);
    assert_eq!(summary.persistence.failed, 0);

    let siblings: Vec<_> = std::fs::read_dir(&parent)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(siblings, vec!["out"]);

    let mut top_level: Vec<_> = std::fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    top_level.sort();
    assert_eq!(top_level, vec!["aapl", "content"]);

    let index = read_index(&config.output_dir.join("aapl").join("20210301.idx")).unwrap();
    assert_eq!(index.len(), 1);
}

#[test]
fn content_ticker_cannot_clobber_the_date_archive() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:00:00Z", &["CONTENT", "AAPL"])],
    );

    let summary = NewsConverter::new(fx.config()).run().unwrap();
    assert_eq!(summary.persistence.failed, 1, "reserved entity directory is reported");
    assert_eq!(summary.persistence.completed, 2);

    let content = fx.content("20210301");
    assert_eq!(content.keys().collect::<Vec<_>>(), vec!["1"]);
    assert_eq!(fx.index("aapl", "20210301"), vec!["1"]);
}

#[test]
fn shared_artifact_extension_is_rejected_before_output() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-02",
        &[article(1, "2021-03-01T10:00:00Z", "2021-03-01T10:00:00Z", &["CONTENT"])],
    );
    let mut config = fx.config();
    config.index_extension = "zip".to_string();

    let err = NewsConverter::new(config).run().unwrap_err();
    assert!(matches!(err, ConverterError::Configuration { .. }));
    assert!(fx.outputs().is_empty());
}

#[test]
fn advancing_watermark_persists_completed_dates_mid_run() {
    let fx = Fixture::new();
    let layout = OutputLayout::new(&fx.output, "idx", "zip");
    let mut pool = PersistencePool::new(layout, 2, 200).unwrap();
    let mut engine = BucketingEngine::new();
    let decoder = JsonRecordDecoder::default();

    let day = |d: u32| NaiveDate::from_ymd_opt(2021, 3, d).unwrap();
    let ingest = |engine: &mut BucketingEngine, pool: &mut PersistencePool, id: u64, d: u32| {
        let ts = format!("2021-03-{d:02}T12:00:00Z");
        let record = decoder.decode(article(id, &ts, &ts, &["AAPL"]));
        engine.ingest(record, pool).unwrap();
    };

    ingest(&mut engine, &mut pool, 1, 1);
    ingest(&mut engine, &mut pool, 2, 2);
    ingest(&mut engine, &mut pool, 3, 3);
    ingest(&mut engine, &mut pool, 4, 5);
    pool.final_drain();

    // Advancing to the 5th flushes everything before the previous watermark (the 3rd).
    assert_eq!(engine.stats().dates_flushed, 2);
    assert_eq!(engine.live_dates().collect::<Vec<_>>(), vec![day(3), day(5)]);
    assert_eq!(fx.index("aapl", "20210301"), vec!["1"]);
    assert_eq!(fx.index("aapl", "20210302"), vec!["2"]);
    assert!(fx.content("20210302").contains_key("2"));
    assert!(!fx.output.join("aapl").join("20210303.idx").exists());
    assert!(!fx.output.join("content").join("20210305.zip").exists());

    ingest(&mut engine, &mut pool, 5, 7);
    pool.final_drain();
    assert_eq!(fx.index("aapl", "20210303"), vec!["3"]);
    assert!(!fx.output.join("aapl").join("20210305.idx").exists());

    engine.drain_all(&mut pool).unwrap();
    pool.final_drain();
    let stats = pool.shutdown();
    assert_eq!(engine.stats().dates_flushed, 5);
    assert_eq!(stats.failed, 0);
    assert_eq!(fx.index("aapl", "20210305"), vec!["4"]);
    assert_eq!(fx.index("aapl", "20210307"), vec!["5"]);
}

#[test]
fn multi_day_run_writes_every_date() {
    let fx = Fixture::new();
    fx.archive(
        "2021-03-01",
        "2021-03-03",
        &[
            article(1, "2021-03-01T09:00:00Z", "2021-03-01T09:00:00Z", &["AAPL"]),
            article(2, "2021-03-02T09:00:00Z", "2021-03-02T09:00:00Z", &["AAPL"]),
            article(3, "2021-03-03T09:00:00Z", "2021-03-03T09:00:00Z", &["AAPL", "MSFT"]),
        ],
    );
    fx.archive(
        "2021-03-03",
        "2021-03-06",
        &[
            article(4, "2021-03-04T09:00:00Z", "2021-03-04T09:00:00Z", &["MSFT"]),
            article(5, "2021-03-05T09:00:00Z", "2021-03-05T09:00:00Z", &["AAPL"]),
            article(6, "2021-03-06T09:00:00Z", "2021-03-06T09:00:00Z", &["AAPL"]),
        ],
    );
    let mut config = fx.config();
    config.max_outstanding = 1;

    let summary = NewsConverter::new(config).run().unwrap();
    assert_eq!(summary.engine.dates_flushed, 6);
    assert!(summary.engine.peak_live_buckets < 6, "early dates leave memory before the end");
    assert_eq!(summary.persistence.failed, 0);

    for (d, id) in [(1, "1"), (2, "2"), (3, "3"), (5, "5"), (6, "6")] {
        assert_eq!(fx.index("aapl", &format!("202103{d:02}")), vec![id]);
    }
    assert_eq!(fx.index("msft", "20210303"), vec!["3"]);
    assert_eq!(fx.index("msft", "20210304"), vec!["4"]);
    for d in 1..=6 {
        assert_eq!(fx.content(&format!("202103{d:02}")).len(), 1);
    }
}
