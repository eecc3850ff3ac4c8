//! Tabular statistics API (e-Stat `getStatsData` JSON).

use serde_json::{Map, Value};

use crate::parsers::normalize::{clean_text, parse_published};
use crate::{Item, ParseError, SourceDescriptor, UtcDateTime};

/// `(query key, parameter names tried in order)` for the fixed query keys.
const QUERY_KEYS: &[(&str, &[&str])] = &[
    ("appId", &["app_id"]),
    ("statsDataId", &["dataset_id", "stats_data_id"]),
    ("cdCat01", &["category"]),
    ("cdTime", &["time"]),
];

/// API statuses at or above this value are errors; lower values are
/// successful (possibly with no data).
const FIRST_ERROR_STATUS: i64 = 100;

/// Compose the request URL for a stats API source from its parameters.
///
/// Fixed keys come first, then any extra `query` mapping; an extra key
/// overrides a fixed key of the same name. Empty values are dropped.
pub fn build_request_url(base_url: &str, params: &Map<String, Value>) -> String {
    let mut query: Vec<(String, String)> = Vec::new();
    for (key, names) in QUERY_KEYS {
        let value = names
            .iter()
            .filter_map(|name| params.get(*name).and_then(scalar_text))
            .find(|value| !value.is_empty());
        if let Some(value) = value {
            query.push(((*key).to_owned(), value));
        }
    }

    if let Some(Value::Object(extra)) = params.get("query") {
        for (key, value) in extra {
            let Some(value) = scalar_text(value).filter(|value| !value.is_empty()) else {
                continue;
            };
            match query.iter_mut().find(|(existing, _)| existing == key) {
                Some(slot) => slot.1 = value,
                None => query.push((key.clone(), value)),
            }
        }
    }

    if query.is_empty() {
        return base_url.to_owned();
    }
    let encoded = query
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}{encoded}")
}

/// Parse a `GET_STATS_DATA` document into one item per data point.
///
/// Each item URL is the source URL plus a fragment built from the point's
/// attributes, so distinct points keep distinct `(source_id, url)` keys.
pub fn parse_stats(
    content: &str,
    source: &SourceDescriptor,
    fetched_at: UtcDateTime,
) -> Result<Vec<Item>, ParseError> {
    let document: Value = serde_json::from_str(content)?;
    let root = document
        .get("GET_STATS_DATA")
        .and_then(Value::as_object)
        .ok_or(ParseError::MissingNode("GET_STATS_DATA"))?;

    if let Some(result) = root.get("RESULT") {
        check_result(result)?;
    }

    let Some(statistical) = root.get("STATISTICAL_DATA") else {
        return Ok(Vec::new());
    };

    let table_title = statistical
        .pointer("/TABLE_INF/TITLE")
        .and_then(|title| match title {
            Value::String(text) => Some(text.clone()),
            Value::Object(fields) => fields
                .get("@title")
                .or_else(|| fields.get("$"))
                .and_then(scalar_text),
            _ => None,
        })
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| source.name.clone());

    let points: Vec<&Value> = match statistical.pointer("/DATA_INF/VALUE") {
        Some(Value::Array(values)) => values.iter().collect(),
        Some(value @ Value::Object(_)) => vec![value],
        _ => Vec::new(),
    };

    let items = points
        .into_iter()
        .enumerate()
        .filter_map(|(index, point)| {
            let point = point.as_object()?;
            Some(point_item(point, index, &table_title, source, fetched_at))
        })
        .collect();
    Ok(items)
}

fn point_item(
    point: &Map<String, Value>,
    index: usize,
    table_title: &str,
    source: &SourceDescriptor,
    fetched_at: UtcDateTime,
) -> Item {
    let attribute = |name: &str| point.get(name).and_then(scalar_text).filter(|v| !v.is_empty());

    let summary = clean_text(&attribute("$").unwrap_or_default());
    let time_label = attribute("@time")
        .or_else(|| attribute("@time_code"))
        .unwrap_or_default();
    let title = clean_text(format!("{table_title} {time_label}").trim());
    let title = if title.is_empty() {
        source.name.clone()
    } else {
        title
    };
    let published_raw = attribute("@date").or_else(|| attribute("@time"));
    let published_at = parse_published(published_raw.as_deref(), fetched_at);

    let url = format!("{}#{}", source.url, point_fragment(point, index));
    Item::from_source(source, title, summary, url, published_at, fetched_at)
}

/// `tab=..&cat01=..&time=..` from the point's `@` attributes, or the
/// point's position when it has none.
fn point_fragment(point: &Map<String, Value>, index: usize) -> String {
    let pairs: Vec<String> = point
        .iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix('@')?;
            let value = scalar_text(value)?;
            Some(format!("{name}={}", urlencoding::encode(&value)))
        })
        .collect();
    if pairs.is_empty() {
        format!("point={index}")
    } else {
        pairs.join("&")
    }
}

fn check_result(result: &Value) -> Result<(), ParseError> {
    let status = match result.get("STATUS") {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    match status {
        Some(status) if status >= FIRST_ERROR_STATUS => Err(ParseError::Api {
            status: status.to_string(),
            message: result
                .get("ERROR_MSG")
                .and_then(scalar_text)
                .unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
