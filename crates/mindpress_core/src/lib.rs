//! Core logic for the mindpress publishing pipeline: a line-oriented
//! Markdown block parser with provenance anchors, citation resolution
//! against a CSV source registry, HTML rendering, page assembly, book and
//! series exports, and the provenance linter. Everything here is pure with
//! respect to the filesystem except config and registry loading; the
//! binary in `mindpress_cli` does the walking and writing.

pub mod blocks;
pub mod book;
pub mod cite;
pub mod config;
pub mod format;
pub mod inline;
pub mod lint;
pub mod model;
pub mod page;
pub mod render;
pub mod sources;
pub mod timecode;
