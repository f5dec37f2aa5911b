use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::{EntityResolver, RecordDecoder, TickerResolver};
use crate::constants::{
    CRAWL_DATE_FIELD, EFFECTIVE_DATE_FIELD, ID_FIELD, PUBLISHED_DATE_FIELD, TICKERS_FIELD,
};
use crate::types::{EntityTag, Record, RecordId};

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decoder for vendor article objects serialized as JSON.
pub struct JsonRecordDecoder {
    resolver: Box<dyn EntityResolver>,
}

impl JsonRecordDecoder {
    #[must_use]
    pub fn new(resolver: Box<dyn EntityResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve raw tags, dropping unresolvable ones and repeats of an entity.
    fn resolve_tags(&self, tags: Option<&Value>, as_of: NaiveDate) -> Vec<EntityTag> {
        let Some(Value::Array(tags)) = tags else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        tags.iter()
            .filter_map(Value::as_str)
            .filter_map(|raw| {
                let entity = self.resolver.resolve(raw, as_of)?;
                seen.insert(entity.clone())
                    .then(|| EntityTag::new(raw.trim(), entity))
            })
            .collect()
    }
}

impl Default for JsonRecordDecoder {
    fn default() -> Self {
        Self::new(Box::new(TickerResolver))
    }
}

impl RecordDecoder for JsonRecordDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, token: Value) -> Record {
        let mut object = match token {
            Value::Object(object) => object,
            other => {
                tracing::debug!(
                    target: "bulknews::reader",
                    kind = value_kind(&other),
                    "article token is not an object"
                );
                Map::new()
            }
        };

        let id = RecordId::new(read_id(object.get(ID_FIELD)));
        let published = object.get(PUBLISHED_DATE_FIELD).and_then(parse_timestamp);
        let crawled = object.get(CRAWL_DATE_FIELD).and_then(parse_timestamp);

        let (published, crawled) = match (published, crawled) {
            (Some(published), Some(crawled)) => (published, crawled),
            (Some(published), None) => (published, published),
            (None, Some(crawled)) => (crawled, crawled),
            (None, None) => {
                return Record::undated(id, Vec::new(), serialize(object));
            }
        };

        let mut record = Record::new(id, published, crawled, Vec::new(), Vec::new());
        record.entity_tags = self.resolve_tags(object.get(TICKERS_FIELD), record.bucket_date());

        object.insert(PUBLISHED_DATE_FIELD.into(), format_timestamp(published));
        object.insert(CRAWL_DATE_FIELD.into(), format_timestamp(crawled));
        object.insert(
            EFFECTIVE_DATE_FIELD.into(),
            format_timestamp(record.effective_time()),
        );
        record.payload = serialize(object);
        record
    }
}

fn read_id(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn format_timestamp(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn serialize(object: Map<String, Value>) -> Vec<u8> {
    serde_json::to_vec(&Value::Object(object)).unwrap_or_default()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
