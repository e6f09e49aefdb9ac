//! Feed retrieval and normalization.
//!
//! This module turns a remote Atom feed into a clean, ordered list of
//! entries:
//!
//! - [`document`] - Generic XML document tree built with `quick-xml`
//! - [`extractor`] - Entry extraction, link selection, timestamp validation
//! - [`fetcher`] - HTTP retrieval and the fetch-then-extract pipeline
//!
//! Extraction is a pure, synchronous pass over the materialized tree; only
//! the fetch is async. Malformed entries are filtered rather than failing
//! the whole feed, and each drop is recorded in [`Extraction::dropped`].

pub mod document;
pub mod extractor;
pub mod fetcher;

pub use document::{parse_document, DocumentError, DocumentNode};
pub use extractor::{extract, select_link, DropReason, DroppedEntry, Entry, ExtractError, Extraction, Vocabulary};
pub use fetcher::{fetch_bytes, fetch_entries, FeedError, FetchError};
