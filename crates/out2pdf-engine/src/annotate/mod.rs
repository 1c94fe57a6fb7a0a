//! # Line Annotation
//!
//! Pattern-driven rewriting of report lines with per-line formatting
//! annotations.
//!
//! ## Architecture
//!
//! [`annotate`] walks the lines of one document and, for each line, applies
//! the operations of a [`DocumentClassTable`](crate::registry::DocumentClassTable)
//! in order. Every match is substituted immediately; span operations also
//! record where the (whitespace-trimmed) substitution ended up.
//!
//! ## Modules
//!
//! - **`annotation`**: `Tag`, `Annotation`, `LineAnnotations`, `AnnotationMap`
//! - **`trim`**: `trim_span_to_non_whitespace()`, the edge-trimming step
//! - **`annotator`**: `annotate()` entry point, options and errors
//!
//! ## Invariants
//!
//! Per line, annotations are sorted by `start` and text spans never overlap.
//! Markers (`NewPage`, `RemoveLine`) sit at `0..0`, are stored once per tag
//! and take no part in overlap checks.

pub mod annotation;
pub mod annotator;
pub mod trim;

pub use annotation::{Annotation, AnnotationMap, LineAnnotations, Tag};
pub use annotator::{
    AnnotateError, AnnotateOptions, AnnotatedDocument, NestedMatchPolicy, annotate,
};
pub use trim::trim_span_to_non_whitespace;
