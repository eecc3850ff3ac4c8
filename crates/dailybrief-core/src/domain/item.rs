use serde::Serialize;

use crate::{SourceDescriptor, UtcDateTime};

/// A normalized entry produced by a parser.
///
/// `(source_id, url)` is the durable identity; every other field is content
/// or provenance that a later run may replace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub source_id: String,
    pub source_name: String,
    pub category: String,
    pub kind: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_at: UtcDateTime,
    pub fetched_at: UtcDateTime,
    /// Last run that wrote this item; `None` until persisted.
    pub run_id: Option<String>,
}

impl Item {
    /// Item carrying the descriptive fields of `source`.
    pub fn from_source(
        source: &SourceDescriptor,
        title: String,
        summary: String,
        url: String,
        published_at: UtcDateTime,
        fetched_at: UtcDateTime,
    ) -> Self {
        Self {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            category: source.category.clone(),
            kind: source.kind_name().to_owned(),
            title,
            summary,
            url,
            published_at,
            fetched_at,
            run_id: None,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.source_id, &self.url)
    }
}
