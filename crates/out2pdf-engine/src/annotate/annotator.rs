use serde::{Deserialize, Serialize};

use crate::registry::{DocumentClassTable, OperationKind, OperationSpec};
use crate::span::Span;

use super::annotation::{Annotation, AnnotationMap, LineAnnotations, Tag};
use super::trim::trim_span_to_non_whitespace;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotateError {
    #[error(
        "File '{document}', line {line}: cannot add overlapping operation at range {range} (already annotated: {existing})"
    )]
    Overlap {
        document: String,
        line: usize,
        range: Span,
        existing: Span,
    },
    #[error(
        "File '{document}', line {line}: match at range {range} lies inside annotated range {existing}"
    )]
    NestedMatch {
        document: String,
        line: usize,
        range: Span,
        existing: Span,
    },
}

/// How to treat a match that falls entirely inside a span an earlier
/// operation already annotated on the same line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedMatchPolicy {
    /// The match is applied; a rewrite inside the span resizes the span.
    #[default]
    Trust,
    /// Such a match aborts the document with [`AnnotateError::NestedMatch`].
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    pub nested_matches: NestedMatchPolicy,
}

/// Rewritten lines together with their annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotatedDocument {
    pub lines: Vec<String>,
    pub annotations: AnnotationMap,
}

/// Per-call state of one annotation pass.
///
/// Lives on the stack of [`annotate`] so the table it reads from can be shared
/// between concurrent calls.
#[derive(Debug, Clone, Copy)]
struct AnnotationContext<'a> {
    document: &'a str,
    line: usize,
    options: AnnotateOptions,
}

impl AnnotationContext<'_> {
    fn overlap(&self, range: Span, existing: Span) -> AnnotateError {
        AnnotateError::Overlap {
            document: self.document.to_string(),
            line: self.line,
            range,
            existing,
        }
    }

    fn nested(&self, range: Span, existing: Span) -> AnnotateError {
        AnnotateError::NestedMatch {
            document: self.document.to_string(),
            line: self.line,
            range,
            existing,
        }
    }
}

/// Applies every operation of `table` to every line, in table order.
///
/// Each operation performs a global, left-to-right substitution on the
/// current text of the line; the next operation sees the rewritten text.
/// Span offsets refer to the final text of the line: when a later operation
/// rewrites text before or inside a recorded span, the span moves with it.
/// A rewrite cutting across a span's edge is an overlap.
///
/// `document` only identifies the input in error messages.
pub fn annotate(
    document: &str,
    mut lines: Vec<String>,
    table: &DocumentClassTable,
    options: AnnotateOptions,
) -> Result<AnnotatedDocument, AnnotateError> {
    let mut annotations = AnnotationMap::default();

    for (index, text) in lines.iter_mut().enumerate() {
        let ctx = AnnotationContext {
            document,
            line: index,
            options,
        };
        let mut entry = LineAnnotations::default();
        for op in table.operations() {
            if let Some(rewritten) = apply_operation(&ctx, op, text, &mut entry)? {
                *text = rewritten;
            }
        }
        annotations.insert(index, entry);
    }

    log::debug!(
        "annotated '{}' with class '{}': {} line(s), {} annotated",
        document,
        table.key(),
        lines.len(),
        annotations.len()
    );

    Ok(AnnotatedDocument { lines, annotations })
}

/// One substitution made by an operation: the matched range of the old text
/// and the number of bytes written in its place.
#[derive(Debug, Clone, Copy)]
struct Rewrite {
    range: Span,
    written: usize,
}

/// Runs one operation over one line. Returns `None` when nothing matched.
///
/// Spans recorded by earlier operations are moved to their offsets in the
/// rewritten text before the new spans are inserted.
fn apply_operation(
    ctx: &AnnotationContext<'_>,
    op: &OperationSpec,
    text: &str,
    entry: &mut LineAnnotations,
) -> Result<Option<String>, AnnotateError> {
    let mut matches = op.pattern.find_iter(text).peekable();
    if matches.peek().is_none() {
        return Ok(None);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut rewrites = Vec::new();
    let mut added = Vec::new();

    for m in matches {
        let range = Span::from(m.range());
        check_prior(ctx, entry, range)?;

        out.push_str(&text[last..m.start()]);
        let begin = out.len();
        let matched = m.as_str();

        match &op.kind {
            OperationKind::Replace(replacement) => out.push_str(replacement),
            OperationKind::RemoveLine => {
                insert(ctx, entry, Annotation::marker(Tag::RemoveLine))?;
            }
            OperationKind::NewPage => {
                // No page break before the first page.
                if ctx.line > 0 {
                    insert(ctx, entry, Annotation::marker(Tag::NewPage))?;
                }
            }
            OperationKind::InvertColors(replacement) => {
                let replacement = replacement.as_deref().unwrap_or(matched);
                added.extend(push_span(ctx, &mut out, replacement, Tag::InvertColors, false));
            }
            OperationKind::Underline(replacement) => {
                let replacement = replacement.as_deref().unwrap_or(matched);
                added.extend(push_span(ctx, &mut out, replacement, Tag::Underline, true));
            }
            OperationKind::LargeFont(replacement) => {
                let replacement = replacement.as_deref().unwrap_or(matched);
                added.extend(push_span(ctx, &mut out, replacement, Tag::LargeFont, true));
            }
        }

        rewrites.push(Rewrite {
            range,
            written: out.len() - begin,
        });
        last = m.end();
    }
    out.push_str(&text[last..]);

    if rewrites.iter().any(|r| r.written != r.range.len()) {
        entry.remap_spans(|span| {
            Span::new(
                remap(&rewrites, span.start, true),
                remap(&rewrites, span.end, false),
            )
        });
    }
    for annotation in added {
        insert(ctx, entry, annotation)?;
    }
    Ok(Some(out))
}

/// Rejects a match that cuts across an annotated span, and under
/// [`NestedMatchPolicy::Reject`] one that lies inside it.
fn check_prior(
    ctx: &AnnotationContext<'_>,
    entry: &LineAnnotations,
    range: Span,
) -> Result<(), AnnotateError> {
    if let Some(existing) = entry.enclosing(range) {
        return match ctx.options.nested_matches {
            NestedMatchPolicy::Trust => Ok(()),
            NestedMatchPolicy::Reject => Err(ctx.nested(range, existing)),
        };
    }
    match entry.spans().map(|a| a.span).find(|s| s.overlaps(range)) {
        Some(existing) => Err(ctx.overlap(range, existing)),
        None => Ok(()),
    }
}

/// Where byte offset `pos` of the old text lands in the rewritten text.
///
/// Text inserted by an empty match at exactly `pos` lands before `pos` when
/// `insert_before` is set, after it otherwise.
fn remap(rewrites: &[Rewrite], pos: usize, insert_before: bool) -> usize {
    let (written, removed) = rewrites
        .iter()
        .filter(|r| {
            r.range.end < pos || (r.range.end == pos && (insert_before || !r.range.is_empty()))
        })
        .fold((0, 0), |(written, removed), r| {
            (written + r.written, removed + r.range.len())
        });
    pos + written - removed
}

/// Appends `replacement` to `out` and returns the annotation for its
/// trimmed core, if it has one.
fn push_span(
    ctx: &AnnotationContext<'_>,
    out: &mut String,
    replacement: &str,
    tag: Tag,
    with_payload: bool,
) -> Option<Annotation> {
    let core = trim_span_to_non_whitespace(replacement);
    let span = Span::new(out.len() + core.start, out.len() + core.end);
    out.push_str(replacement);

    if span.is_empty() {
        log::debug!(
            "'{}' line {}: {:?} match is blank, nothing to annotate",
            ctx.document,
            ctx.line,
            tag
        );
        return None;
    }

    let payload = with_payload.then(|| replacement[core.range()].to_string());
    Some(Annotation::new(span, tag, payload))
}

fn insert(
    ctx: &AnnotationContext<'_>,
    entry: &mut LineAnnotations,
    annotation: Annotation,
) -> Result<(), AnnotateError> {
    let range = annotation.span;
    entry
        .insert(annotation)
        .map_err(|existing| ctx.overlap(range, existing))
}
