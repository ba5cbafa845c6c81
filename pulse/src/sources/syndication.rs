//! Lenient RSS 2.0 / Atom reader.
//!
//! Only the handful of fields a mention needs are extracted. Unknown elements
//! are ignored and malformed trailing markup ends the parse with whatever
//! entries were complete at that point.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{PulseError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// Raw (possibly HTML) body text.
    pub description: String,
    pub link: String,
    pub guid: String,
    pub author: String,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct EntryBuilder {
    entry: FeedEntry,
    summary: String,
    content: String,
    encoded: String,
    in_author: bool,
}

impl EntryBuilder {
    fn assign(&mut self, field: &str, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            "title" => &mut self.entry.title,
            "description" => &mut self.entry.description,
            "summary" => &mut self.summary,
            "content" => &mut self.content,
            "content:encoded" => &mut self.encoded,
            "link" => &mut self.entry.link,
            "guid" | "id" => &mut self.entry.guid,
            "author" | "dc:creator" | "name" => &mut self.entry.author,
            "pubdate" | "published" | "updated" | "dc:date" => {
                if self.entry.published.is_none() {
                    self.entry.published = parse_date(&value);
                }
                return;
            }
            _ => return,
        };
        if slot.is_empty() {
            *slot = value;
        }
    }

    fn finish(mut self) -> FeedEntry {
        if self.entry.description.is_empty() {
            self.entry.description = [self.summary, self.encoded, self.content]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_default();
        }
        self.entry
    }
}

const TRACKED_FIELDS: &[&str] = &[
    "title",
    "description",
    "summary",
    "content",
    "content:encoded",
    "link",
    "guid",
    "id",
    "author",
    "dc:creator",
    "pubdate",
    "published",
    "updated",
    "dc:date",
];

/// Elements that mark a document as a syndication feed.
const FEED_ROOTS: &[&str] = &["rss", "feed", "rdf:rdf", "channel"];

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

/// Atom links carry the target in `href`; only `rel="alternate"` (or no rel)
/// points at the article itself.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => href = std::str::from_utf8(&attr.value).ok().map(String::from),
            b"rel" => rel_ok = attr.value.as_ref() == b"alternate",
            _ => {}
        }
    }
    href.filter(|_| rel_ok)
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse an RSS or Atom document into entries (`item` or `entry` elements).
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut text = String::new();
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                saw_root |= FEED_ROOTS.contains(&name.as_str());
                if name == "item" || name == "entry" {
                    current = Some(EntryBuilder::default());
                    text.clear();
                } else {
                    match (name.as_str(), current.as_mut()) {
                        ("author", Some(builder)) => {
                            builder.in_author = true;
                            text.clear();
                        }
                        ("link", Some(builder)) => {
                            if let Some(href) = atom_href(&e) {
                                builder.assign("link", href);
                            }
                            text.clear();
                        }
                        (field, Some(_)) if TRACKED_FIELDS.contains(&field) => text.clear(),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root |= FEED_ROOTS.contains(&element_name(&e).as_str());
                if let Some(builder) = current.as_mut() {
                    if element_name(&e) == "link" {
                        if let Some(href) = atom_href(&e) {
                            builder.assign("link", href);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                match name.as_str() {
                    "item" | "entry" => {
                        if let Some(builder) = current.take() {
                            entries.push(builder.finish());
                        }
                        text.clear();
                    }
                    "author" => {
                        if let Some(builder) = current.as_mut() {
                            builder.assign("author", std::mem::take(&mut text));
                            builder.in_author = false;
                        }
                    }
                    "name" => {
                        if let Some(builder) = current.as_mut().filter(|b| b.in_author) {
                            builder.assign("name", std::mem::take(&mut text));
                        }
                    }
                    field if TRACKED_FIELDS.contains(&field) => {
                        if let Some(builder) = current.as_mut() {
                            builder.assign(field, std::mem::take(&mut text));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    let name = String::from_utf8_lossy(e.as_ref()).to_string();
                    match e.resolve_char_ref().ok().flatten().or_else(|| resolve_entity(&name)) {
                        Some(ch) => text.push(ch),
                        // HTML entities inside RSS bodies are decoded later with the markup.
                        None => {
                            text.push('&');
                            text.push_str(&name);
                            text.push(';');
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                if entries.is_empty() {
                    return Err(PulseError::SourceFetch(format!(
                        "malformed feed document at byte {}: {e}",
                        reader.error_position()
                    )));
                }
                tracing::debug!(error = %e, parsed = entries.len(), "Stopping at malformed feed markup");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(PulseError::SourceFetch(
            "response is not an XML feed document".to_string(),
        ));
    }

    Ok(entries)
}
