use serde::Serialize;

use crate::annotate::Tag;

/// Formatting applied to a highlighted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpanKind {
    InvertColors,
    Underline,
    LargeFont,
}

impl SpanKind {
    /// The span kind for a text-span tag. Markers have none.
    pub fn from_tag(tag: Tag) -> Option<Self> {
        match tag {
            Tag::InvertColors => Some(Self::InvertColors),
            Tag::Underline => Some(Self::Underline),
            Tag::LargeFont => Some(Self::LargeFont),
            Tag::NewPage | Tag::RemoveLine => None,
        }
    }
}

/// One element of the renderer's output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    /// Page footer for the section: `header` followed by `label`.
    Footer { header: String, label: String },
    /// Unformatted report text, rendered verbatim.
    Literal(String),
    FormattedSpan { kind: SpanKind, text: String },
    PageDelimiter,
    SectionBookmark(String),
    PageCounterReset,
    LineBreak,
    EndOfDocument,
}

impl Token {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn span(kind: SpanKind, text: impl Into<String>) -> Self {
        Self::FormattedSpan {
            kind,
            text: text.into(),
        }
    }
}

/// Metadata of one logical sub-document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Bookmark and footer label, e.g. the calculation type.
    pub label: String,
    /// Footer text placed before the label, e.g. the airport code.
    pub header: String,
    /// The last section closes the document instead of starting a new page.
    pub is_final: bool,
}

impl Section {
    pub fn new(label: impl Into<String>, header: impl Into<String>, is_final: bool) -> Self {
        Self {
            label: label.into(),
            header: header.into(),
            is_final,
        }
    }
}
