//! glance — fetch a single Atom feed and normalize its entries.
//!
//! The interesting part lives in [`feed`]: a generic XML document tree, an
//! entry extractor with relation-priority link selection and strict
//! timestamp validation, and a fetch-then-extract pipeline with a two-tier
//! failure model (document-level errors abort; entry-level problems are
//! filtered and recorded).

pub mod config;
pub mod feed;
pub mod util;
