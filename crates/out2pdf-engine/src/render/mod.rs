//! # Document Rendering
//!
//! Turns rewritten lines and their [`AnnotationMap`](crate::annotate::AnnotationMap)
//! into a flat [`Token`] stream for a document compiler backend.
//!
//! The renderer walks each line with a cursor: text between spans becomes
//! [`Token::Literal`], each span a [`Token::FormattedSpan`]. Markers act on
//! the whole line: `NewPage` emits one [`Token::PageDelimiter`] ahead of the
//! line, `RemoveLine` drops the line's content entirely.

pub mod renderer;
pub mod token;

pub use renderer::{RenderError, render};
pub use token::{Section, SpanKind, Token};
