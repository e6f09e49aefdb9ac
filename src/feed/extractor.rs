use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::document::DocumentNode;

/// Errors that abort an entire extraction.
///
/// Per-entry problems never appear here; they are filtered into
/// [`Extraction::dropped`] instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document has no top-level feed container element.
    #[error("document has no <{0}> root container")]
    MissingRoot(String),
}

/// Element and attribute names the extractor looks up.
///
/// These are a contract with the upstream feed format, kept configurable so
/// fixture documents in tests (and the config file) can rename them. Defaults
/// match the Atom vocabulary of the source feed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Vocabulary {
    /// Top-level feed container element.
    pub root: String,
    /// Repeated entry element under the root.
    pub entry: String,
    /// Per-entry title element.
    pub title: String,
    /// Per-entry publication timestamp element.
    pub published: String,
    /// Repeated per-entry link element.
    pub link: String,
    /// Link attribute naming the link's relation.
    pub relation_attr: String,
    /// Link attribute carrying the destination URL.
    pub destination_attr: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            root: "feed".to_string(),
            entry: "entry".to_string(),
            title: "title".to_string(),
            published: "published".to_string(),
            link: "link".to_string(),
            relation_attr: "rel".to_string(),
            destination_attr: "href".to_string(),
        }
    }
}

/// One normalized feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Entry title; never empty.
    pub title: String,
    /// Publication instant, normalized to UTC.
    pub date: DateTime<Utc>,
    /// Canonical link; never empty (falls back to the feed's home page when
    /// no link candidate qualifies).
    pub link: String,
}

/// Why a malformed entry was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The title element was absent or its text was empty.
    MissingTitle,
    /// The published element was absent.
    MissingPublished,
    /// The published text was not a full ISO-8601 instant.
    InvalidTimestamp,
}

/// A filtered entry, recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntry {
    /// Zero-based index among the root's entry elements, counting only
    /// entry-tagged children (non-entry siblings do not advance it).
    pub position: usize,
    pub reason: DropReason,
}

/// Result of extracting a document: the kept entries plus a record of every
/// entry that was filtered out.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Well-formed entries, in document order.
    pub entries: Vec<Entry>,
    /// Malformed entries that were skipped. Diagnostics only; the presence
    /// of drops is not an error.
    pub dropped: Vec<DroppedEntry>,
}

/// Extracts normalized entries from a parsed feed document.
///
/// Locates the root container, walks its entry elements in document order,
/// and keeps every entry that has a non-empty title and a strictly valid
/// published instant. Entries missing either are dropped and recorded in
/// [`Extraction::dropped`]; sibling entries are unaffected. The canonical
/// link is chosen by [`select_link`] and is always populated.
///
/// # Errors
///
/// Returns [`ExtractError::MissingRoot`] when the document has no root
/// container element. An empty feed (root present, no entries) is a success
/// with zero entries, not an error.
pub fn extract(
    document: &DocumentNode,
    vocabulary: &Vocabulary,
    fallback_link: &str,
) -> Result<Extraction, ExtractError> {
    let root = document
        .first(&vocabulary.root)
        .map_err(|_| ExtractError::MissingRoot(vocabulary.root.clone()))?;

    let mut extraction = Extraction::default();

    for (position, entry) in root.all(&vocabulary.entry).enumerate() {
        match build_entry(entry, vocabulary, fallback_link) {
            Ok(entry) => extraction.entries.push(entry),
            Err(reason) => {
                tracing::debug!(position = position, reason = ?reason, "Dropping malformed entry");
                extraction.dropped.push(DroppedEntry { position, reason });
            }
        }
    }

    Ok(extraction)
}

/// Assembles a single entry, or names the field that disqualifies it.
fn build_entry(
    node: &DocumentNode,
    vocabulary: &Vocabulary,
    fallback_link: &str,
) -> Result<Entry, DropReason> {
    let title = node
        .first(&vocabulary.title)
        .map(|t| t.text.trim().to_string())
        .map_err(|_| DropReason::MissingTitle)?;
    if title.is_empty() {
        return Err(DropReason::MissingTitle);
    }

    let published = node
        .first(&vocabulary.published)
        .map(|p| p.text.clone())
        .map_err(|_| DropReason::MissingPublished)?;
    let date = parse_published(&published)?;

    let link = select_link(node.all(&vocabulary.link), vocabulary, fallback_link);

    Ok(Entry { title, date, link })
}

/// Chooses the canonical link from an entry's link elements.
///
/// A candidate qualifies only if its relation attribute is `related` or
/// `alternate` AND it carries a destination attribute. Preference is the
/// first `related` candidate in document order, then the first `alternate`,
/// then the fallback URL. The relation tier outranks document position: an
/// `alternate` that appears before any `related` still loses to it.
pub fn select_link<'a>(
    candidates: impl Iterator<Item = &'a DocumentNode>,
    vocabulary: &Vocabulary,
    fallback_link: &str,
) -> String {
    let mut first_alternate: Option<&str> = None;

    for node in candidates {
        let destination = match node.attr(&vocabulary.destination_attr) {
            Some(href) => href,
            None => continue,
        };
        match node.attr(&vocabulary.relation_attr) {
            Some("related") => return destination.to_string(),
            Some("alternate") => {
                first_alternate.get_or_insert(destination);
            }
            _ => {}
        }
    }

    first_alternate.unwrap_or(fallback_link).to_string()
}

/// Parses a published timestamp as a strict ISO-8601 instant.
///
/// Date, time, and an explicit UTC or offset designator are all required;
/// date-only strings fail rather than defaulting to midnight. The parsed
/// instant is normalized to UTC.
fn parse_published(text: &str) -> Result<DateTime<Utc>, DropReason> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DropReason::InvalidTimestamp)
}
