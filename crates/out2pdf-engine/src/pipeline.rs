use crate::annotate::{AnnotateError, AnnotateOptions, annotate};
use crate::registry::{ConfigError, OperationRegistry};
use crate::render::{RenderError, Section, Token, render};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One report to be turned into a section of the output document.
#[derive(Debug, Clone)]
pub struct SectionInput {
    /// Identifies the report in diagnostics, usually its file name.
    pub document: String,
    /// Key of the document class whose rules apply.
    pub class: String,
    pub lines: Vec<String>,
    pub section: Section,
}

/// Annotates and renders a single section.
pub fn convert_section(
    registry: &OperationRegistry,
    input: SectionInput,
    options: AnnotateOptions,
) -> Result<Vec<Token>, PipelineError> {
    let table = registry.table(&input.class)?;
    let annotated = annotate(&input.document, input.lines, table, options)?;
    Ok(render(
        &annotated.lines,
        &annotated.annotations,
        &input.section,
    )?)
}

/// Converts sections in order into one token stream.
///
/// Stops at the first failing section.
pub fn convert_document(
    registry: &OperationRegistry,
    inputs: Vec<SectionInput>,
    options: AnnotateOptions,
) -> Result<Vec<Token>, PipelineError> {
    let mut tokens = Vec::new();
    for input in inputs {
        log::info!(
            "converting '{}' as section '{}' (class '{}')",
            input.document,
            input.section.label,
            input.class
        );
        tokens.extend(convert_section(registry, input, options)?);
    }
    Ok(tokens)
}
