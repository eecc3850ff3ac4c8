//! Kind-specific payload parsers. Pure: no I/O, no mutation.

pub mod feed;
pub mod normalize;
pub mod stats_api;

use crate::{Item, ParseError, SourceDescriptor, SourceKind, UtcDateTime};

/// URL to fetch for `source`: the feed URL itself, or the stats API URL with
/// its query composed from the source parameters.
pub fn request_url(source: &SourceDescriptor) -> String {
    match &source.kind {
        SourceKind::Feed => source.url.clone(),
        SourceKind::StatsApi { params } => stats_api::build_request_url(&source.url, params),
    }
}

/// Parse a fetched payload with the parser matching the source kind.
pub fn parse_payload(
    payload: &str,
    source: &SourceDescriptor,
    fetched_at: UtcDateTime,
) -> Result<Vec<Item>, ParseError> {
    match source.kind {
        SourceKind::Feed => feed::parse_feed(payload, source, fetched_at),
        SourceKind::StatsApi { .. } => stats_api::parse_stats(payload, source, fetched_at),
    }
}
