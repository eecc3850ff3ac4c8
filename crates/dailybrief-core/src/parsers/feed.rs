//! RSS 2.0 / Atom feed parser.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::parsers::normalize::{clean_text, parse_published};
use crate::{Item, ParseError, SourceDescriptor, UtcDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFlavor {
    RssItem,
    AtomEntry,
}

impl EntryFlavor {
    fn of(element: &BytesStart<'_>) -> Option<Self> {
        match element.local_name().as_ref() {
            b"item" => Some(Self::RssItem),
            b"entry" => Some(Self::AtomEntry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    Content,
    PubDate,
    Published,
    Updated,
    DcDate,
}

impl Field {
    fn classify(element: &BytesStart<'_>) -> Option<Self> {
        if element.name().as_ref() == b"dc:date" {
            return Some(Self::DcDate);
        }
        match element.local_name().as_ref() {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"summary" => Some(Self::Summary),
            b"content" | b"encoded" => Some(Self::Content),
            b"pubDate" => Some(Self::PubDate),
            b"published" => Some(Self::Published),
            b"updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    link_href: Option<String>,
    preferred_href: bool,
    description: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, text: String) {
        if text.trim().is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    /// Keep the first `href`, unless a later link is the alternate one.
    fn offer_link_attributes(&mut self, element: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attribute in element.attributes().flatten() {
            let value = decode_xml_text(&attribute.value).trim().to_owned();
            match attribute.key.local_name().as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }
        let Some(href) = href.filter(|href| !href.is_empty()) else {
            return;
        };
        let preferred = rel.as_deref().map_or(true, |rel| rel == "alternate");
        if self.link_href.is_none() || (preferred && !self.preferred_href) {
            self.link_href = Some(href);
            self.preferred_href = preferred;
        }
    }

    fn into_item(
        self,
        source: &SourceDescriptor,
        fetched_at: UtcDateTime,
    ) -> Option<Item> {
        let title = clean_text(self.title.as_deref().unwrap_or_default());
        let url = self
            .link
            .map(|link| link.trim().to_owned())
            .filter(|link| !link.is_empty())
            .or(self.link_href)
            .unwrap_or_default();
        if title.is_empty() && url.is_empty() {
            return None;
        }

        let summary = clean_text(
            self.description
                .or(self.summary)
                .or(self.content)
                .as_deref()
                .unwrap_or_default(),
        );
        let published_raw = self
            .pub_date
            .or(self.published)
            .or(self.updated)
            .or(self.dc_date);
        let published_at = parse_published(published_raw.as_deref(), fetched_at);

        Some(Item::from_source(
            source,
            title,
            summary,
            url,
            published_at,
            fetched_at,
        ))
    }
}

struct OpenEntry {
    flavor: EntryFlavor,
    depth: usize,
    raw: RawEntry,
    field: Option<(Field, usize, String)>,
}

/// Parse an RSS or Atom document into items.
///
/// RSS `item` elements take precedence: Atom `entry` elements are used only
/// when the document has no `item` at all. Entries with neither a title nor
/// a URL are dropped.
pub fn parse_feed(
    content: &str,
    source: &SourceDescriptor,
    fetched_at: UtcDateTime,
) -> Result<Vec<Item>, ParseError> {
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut open: Option<OpenEntry> = None;
    let mut rss_items: Vec<RawEntry> = Vec::new();
    let mut atom_entries: Vec<RawEntry> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                saw_root = true;
                if let Some(entry) = open.as_mut() {
                    if entry.field.is_none() && depth == entry.depth + 1 {
                        if let Some(field) = Field::classify(&element) {
                            if field == Field::Link {
                                entry.raw.offer_link_attributes(&element);
                            }
                            entry.field = Some((field, depth, String::new()));
                        }
                    }
                } else if let Some(flavor) = EntryFlavor::of(&element) {
                    open = Some(OpenEntry {
                        flavor,
                        depth,
                        raw: RawEntry::default(),
                        field: None,
                    });
                }
            }
            Event::Empty(element) => {
                saw_root = true;
                if let Some(entry) = open.as_mut() {
                    if depth == entry.depth && element.local_name().as_ref() == b"link" {
                        entry.raw.offer_link_attributes(&element);
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, _, buffer)) = open.as_mut().and_then(|entry| entry.field.as_mut()) {
                    buffer.push_str(&decode_xml_text(&text));
                }
            }
            Event::CData(data) => {
                if let Some((_, _, buffer)) = open.as_mut().and_then(|entry| entry.field.as_mut()) {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let mut entry_closed = false;
                if let Some(entry) = open.as_mut() {
                    if let Some((field, field_depth, text)) = entry.field.take() {
                        if field_depth == depth {
                            entry.raw.set(field, text);
                        } else {
                            entry.field = Some((field, field_depth, text));
                        }
                    }
                    entry_closed = depth == entry.depth;
                }
                if entry_closed {
                    if let Some(finished) = open.take() {
                        match finished.flavor {
                            EntryFlavor::RssItem => rss_items.push(finished.raw),
                            EntryFlavor::AtomEntry => atom_entries.push(finished.raw),
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::Xml(String::from("document has no root element")));
    }
    if depth != 0 {
        return Err(ParseError::Xml(format!(
            "document ended with {depth} unclosed element(s)"
        )));
    }

    let entries = if rss_items.is_empty() {
        atom_entries
    } else {
        rss_items
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| entry.into_item(source, fetched_at))
        .collect())
}

/// Resolve XML-level entity and character references without failing on
/// HTML-only entities; [`clean_text`] decodes the HTML level afterwards.
fn decode_xml_text(raw: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(text) => html_escape::decode_html_entities(text),
        Cow::Owned(text) => Cow::Owned(html_escape::decode_html_entities(&text).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceDescriptor {
        SourceDescriptor::feed("news", "Example News", "https://news.example.test/rss")
            .with_category("news")
    }

    fn now() -> UtcDateTime {
        UtcDateTime::parse_rfc3339("2024-06-01T00:00:00Z").expect("now")
    }

    #[test]
    fn parses_rss_items() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Channel</title>
  <item>
    <title>First &amp;amp; foremost</title>
    <link> https://news.example.test/1 </link>
    <description><![CDATA[<p>Hello&nbsp;world</p>]]></description>
    <pubDate>Tue, 10 Jun 2003 04:00:00 GMT</pubDate>
  </item>
  <item><title>No link</title></item>
  <item><description>neither title nor link</description></item>
</channel></rss>"#;

        let items = parse_feed(xml, &source(), now()).expect("must parse");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First & foremost");
        assert_eq!(items[0].url, "https://news.example.test/1");
        assert_eq!(items[0].summary, "<p>Hello world</p>");
        assert_eq!(items[0].published_at.format_rfc3339(), "2003-06-10T04:00:00Z");
        assert_eq!(items[0].source_id, "news");
        assert_eq!(items[0].kind, "feed");
        assert_eq!(items[1].url, "");
        assert_eq!(items[1].published_at, now());
    }

    #[test]
    fn parses_atom_entries_with_href_links() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <entry>
    <title>Entry one</title>
    <link rel="self" href="https://news.example.test/self/1"/>
    <link rel="alternate" href="https://news.example.test/1"/>
    <summary>Short   text</summary>
    <updated>2024-05-01T12:00:00Z</updated>
  </entry>
</feed>"#;

        let items = parse_feed(xml, &source(), now()).expect("must parse");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://news.example.test/1");
        assert_eq!(items[0].summary, "Short text");
        assert_eq!(items[0].published_at.format_rfc3339(), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn rss_items_take_precedence_over_atom_entries() {
        let xml = r#"<rss><channel>
  <item><title>rss</title><link>https://a.test/rss</link></item>
  <entry xmlns="http://www.w3.org/2005/Atom"><title>atom</title></entry>
</channel></rss>"#;

        let items = parse_feed(xml, &source(), now()).expect("must parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "rss");
    }

    #[test]
    fn reads_dublin_core_dates() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <item><title>dc</title><link>https://a.test/dc</link><dc:date>2024-02-03T04:05:06+09:00</dc:date></item>
</rdf:RDF>"#;

        let items = parse_feed(xml, &source(), now()).expect("must parse");
        assert_eq!(items[0].published_at.format_rfc3339(), "2024-02-02T19:05:06Z");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_feed("", &source(), now()).is_err());
        assert!(parse_feed("not xml at all", &source(), now()).is_err());
        assert!(parse_feed("<rss><channel><item>", &source(), now()).is_err());
        assert!(parse_feed("<rss><channel></item></rss>", &source(), now()).is_err());
    }
}
