use chrono::NaiveDate;

use super::EntityResolver;
use crate::types::EntityId;

/// Resolves raw vendor tickers by normalizing them to upper case.
///
/// A ticker needs at least one ASCII letter or digit; punctuation-only tags
/// such as `..` never resolve. Symbol history (renames, delistings) is not
/// tracked, so `as_of` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickerResolver;

impl EntityResolver for TickerResolver {
    fn resolve(&self, raw_tag: &str, _as_of: NaiveDate) -> Option<EntityId> {
        let tag = raw_tag.trim();
        if !tag.chars().all(is_ticker_char) || !tag.chars().any(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(EntityId::new(tag.to_ascii_uppercase()))
    }
}

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^')
}
