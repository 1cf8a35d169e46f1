//! Sitemap document parsing
//!
//! Parses documents following the sitemap protocol:
//!
//! ```xml
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url><loc>https://blueprint.ng/some-article/</loc><lastmod>2024-05-01T10:00:00+00:00</lastmod></url>
//! </urlset>
//! ```
//!
//! Entries keep document order. A missing or unparsable `lastmod` yields an
//! absent timestamp; malformed XML fails the whole document.

use crate::{NewswireError, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One `<url>` element of a sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// The `<loc>` value
    pub location: String,

    /// The `<lastmod>` value, when present and parsable
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Loc,
    LastMod,
}

/// Parses a sitemap body into its entries, in document order
///
/// # Returns
///
/// * `Ok(Vec<SitemapEntry>)` - Every `<url>` element that carries a non-empty `<loc>`
/// * `Err(NewswireError::MalformedSitemap)` - The document is not well-formed XML
///   or its root element is not `urlset`
pub fn parse_sitemap(body: &str) -> Result<Vec<SitemapEntry>> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut field: Option<Field> = None;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if depth == 0 {
                    if name.as_ref() != b"urlset" {
                        return Err(NewswireError::MalformedSitemap {
                            message: format!(
                                "expected <urlset> root, found <{}>",
                                String::from_utf8_lossy(name.as_ref())
                            ),
                        });
                    }
                    saw_root = true;
                }
                // Only direct children of <url>; extensions such as <image:loc> sit deeper
                field = match (depth, name.as_ref()) {
                    (1, b"url") => {
                        loc = None;
                        lastmod = None;
                        None
                    }
                    (2, b"loc") => Some(Field::Loc),
                    (2, b"lastmod") => Some(Field::LastMod),
                    _ => None,
                };
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    // `<urlset/>` is a valid, empty sitemap
                    if e.local_name().as_ref() != b"urlset" {
                        return Err(NewswireError::MalformedSitemap {
                            message: "expected <urlset> root".to_string(),
                        });
                    }
                    saw_root = true;
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| malformed(&reader, e))?;
                capture(field, &text, &mut loc, &mut lastmod);
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                let text = String::from_utf8_lossy(&raw);
                capture(field, &text, &mut loc, &mut lastmod);
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                field = None;
                if depth == 1 && e.local_name().as_ref() == b"url" {
                    match loc.take() {
                        Some(location) => entries.push(SitemapEntry {
                            location,
                            last_modified: lastmod.take().as_deref().and_then(parse_lastmod),
                        }),
                        None => tracing::debug!("Skipping <url> without <loc>"),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(NewswireError::MalformedSitemap {
            message: "document has no <urlset> root".to_string(),
        });
    }
    if depth != 0 {
        return Err(NewswireError::MalformedSitemap {
            message: "unexpected end of document".to_string(),
        });
    }

    Ok(entries)
}

fn capture(field: Option<Field>, text: &str, loc: &mut Option<String>, lastmod: &mut Option<String>) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match field {
        Some(Field::Loc) => *loc = Some(text.to_string()),
        Some(Field::LastMod) => *lastmod = Some(text.to_string()),
        None => {}
    }
}

fn malformed(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> NewswireError {
    NewswireError::MalformedSitemap {
        message: format!("at byte {}: {}", reader.buffer_position(), err),
    }
}

/// Parses a `lastmod` value: RFC3339, or a plain `YYYY-MM-DD` date at midnight UTC
pub fn parse_lastmod(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
