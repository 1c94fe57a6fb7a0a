pub mod annotate;
pub mod latex;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod span;

// Re-export key types for easier usage
pub use annotate::{
    AnnotateError, AnnotateOptions, AnnotatedDocument, Annotation, AnnotationMap, NestedMatchPolicy,
    Tag, annotate,
};
pub use latex::{LatexOptions, LatexWriter, REQUIRED_PACKAGES, to_latex};
pub use pipeline::{PipelineError, SectionInput, convert_document, convert_section};
pub use registry::{
    ClassDef, ConfigError, DocumentClassTable, OperationDef, OperationKind, OperationRegistry,
    OperationSpec,
};
pub use render::{RenderError, Section, SpanKind, Token, render};
pub use span::Span;
