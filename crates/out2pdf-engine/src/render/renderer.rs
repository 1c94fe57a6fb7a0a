use crate::annotate::{Annotation, AnnotationMap, Tag};
use crate::span::Span;

use super::token::{Section, SpanKind, Token};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Section '{section}', line {line}: inverted span {span}")]
    InvertedSpan {
        section: String,
        line: usize,
        span: Span,
    },
    #[error("Section '{section}', line {line}: span {span} is outside the line (length {len})")]
    OutOfBounds {
        section: String,
        line: usize,
        span: Span,
        len: usize,
    },
    #[error("Section '{section}', line {line}: span {span} starts before offset {cursor}")]
    OutOfOrder {
        section: String,
        line: usize,
        span: Span,
        cursor: usize,
    },
}

/// Renders one section of annotated lines into a token stream.
///
/// The stream opens with the section's footer, bookmark and page counter
/// reset, then carries each line's tokens, and ends with either a page
/// delimiter or, for the final section, the end of the document.
///
/// Trailing line terminators are not part of the rendered text; spans must
/// lie within the remaining visible text.
pub fn render(
    lines: &[String],
    annotations: &AnnotationMap,
    section: &Section,
) -> Result<Vec<Token>, RenderError> {
    let mut out = vec![
        Token::Footer {
            header: section.header.clone(),
            label: section.label.clone(),
        },
        Token::SectionBookmark(section.label.clone()),
        Token::PageCounterReset,
    ];

    for (index, text) in lines.iter().enumerate() {
        LineRenderer {
            section,
            index,
            text: visible_text(text),
        }
        .render(annotations.line(index), &mut out)?;
    }

    out.push(if section.is_final {
        Token::EndOfDocument
    } else {
        Token::PageDelimiter
    });

    log::debug!(
        "rendered section '{}': {} line(s), {} token(s)",
        section.label,
        lines.len(),
        out.len()
    );
    Ok(out)
}

fn visible_text(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

struct LineRenderer<'a> {
    section: &'a Section,
    index: usize,
    text: &'a str,
}

impl LineRenderer<'_> {
    fn render(&self, annotations: &[Annotation], out: &mut Vec<Token>) -> Result<(), RenderError> {
        let mut cursor = 0;
        let mut suppressed = false;
        let mut page_break = false;
        let mut content = Vec::new();

        for ann in annotations {
            if let Some(kind) = SpanKind::from_tag(ann.tag) {
                self.check(ann.span, cursor)?;
                if cursor < ann.span.start {
                    content.push(Token::literal(&self.text[cursor..ann.span.start]));
                }
                content.push(Token::span(kind, &self.text[ann.span.range()]));
                cursor = ann.span.end;
                continue;
            }
            match ann.tag {
                // Page breaks belong between pages, never before the first line.
                Tag::NewPage if self.index != 0 && !page_break => {
                    page_break = true;
                    out.push(Token::PageDelimiter);
                }
                Tag::RemoveLine => suppressed = true,
                _ => {}
            }
        }

        if suppressed {
            return Ok(());
        }

        out.append(&mut content);
        if cursor < self.text.len() {
            out.push(Token::literal(&self.text[cursor..]));
        }
        out.push(Token::LineBreak);
        Ok(())
    }

    fn check(&self, span: Span, cursor: usize) -> Result<(), RenderError> {
        let section = || self.section.label.clone();
        if span.start > span.end {
            return Err(RenderError::InvertedSpan {
                section: section(),
                line: self.index,
                span,
            });
        }
        if span.end > self.text.len()
            || !self.text.is_char_boundary(span.start)
            || !self.text.is_char_boundary(span.end)
        {
            return Err(RenderError::OutOfBounds {
                section: section(),
                line: self.index,
                span,
                len: self.text.len(),
            });
        }
        if span.start < cursor {
            return Err(RenderError::OutOfOrder {
                section: section(),
                line: self.index,
                span,
                cursor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::LineAnnotations;
    use pretty_assertions::assert_eq;

    fn section(is_final: bool) -> Section {
        Section::new("TAKEOFF", "CYOW", is_final)
    }

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|l| l.to_string()).collect()
    }

    fn map(entries: Vec<(usize, Vec<Annotation>)>) -> AnnotationMap {
        entries
            .into_iter()
            .map(|(line, anns)| {
                let mut la = LineAnnotations::default();
                for a in anns {
                    la.insert(a).unwrap();
                }
                (line, la)
            })
            .collect()
    }

    fn span(start: usize, end: usize, tag: Tag) -> Annotation {
        Annotation::new(Span::new(start, end), tag, None)
    }

    /// Tokens between the section prologue and epilogue.
    fn body(tokens: &[Token]) -> &[Token] {
        &tokens[3..tokens.len() - 1]
    }

    #[test]
    fn emits_prologue_and_final_epilogue() {
        let tokens = render(&[], &AnnotationMap::default(), &section(true)).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Footer {
                    header: "CYOW".into(),
                    label: "TAKEOFF".into()
                },
                Token::SectionBookmark("TAKEOFF".into()),
                Token::PageCounterReset,
                Token::EndOfDocument,
            ]
        );
    }

    #[test]
    fn non_final_section_ends_with_page_delimiter() {
        let tokens = render(&lines(&["x\n"]), &AnnotationMap::default(), &section(false)).unwrap();
        assert_eq!(tokens.last(), Some(&Token::PageDelimiter));
    }

    #[test]
    fn plain_line_is_literal_and_break() {
        let tokens = render(
            &lines(&["  RWY 07   TORA 3200\n"]),
            &AnnotationMap::default(),
            &section(true),
        )
        .unwrap();
        assert_eq!(
            body(&tokens),
            &[Token::literal("  RWY 07   TORA 3200"), Token::LineBreak]
        );
    }

    #[test]
    fn spans_split_line_around_cursor() {
        let annotations = map(vec![(
            0,
            vec![
                span(0, 2, Tag::LargeFont),
                span(3, 5, Tag::Underline),
                span(8, 9, Tag::InvertColors),
            ],
        )]);
        let tokens = render(&lines(&["V1 VR - V2\n"]), &annotations, &section(true)).unwrap();
        assert_eq!(
            body(&tokens),
            &[
                Token::span(SpanKind::LargeFont, "V1"),
                Token::literal(" "),
                Token::span(SpanKind::Underline, "VR"),
                Token::literal(" - "),
                Token::span(SpanKind::InvertColors, "V"),
                Token::literal("2"),
                Token::LineBreak,
            ]
        );
    }

    #[test]
    fn line_ending_on_span_gets_bare_break() {
        let annotations = map(vec![(0, vec![span(7, 11, Tag::InvertColors)])]);
        let tokens = render(&lines(&["ENGINE FAIL\n"]), &annotations, &section(true)).unwrap();
        assert_eq!(
            body(&tokens),
            &[
                Token::literal("ENGINE "),
                Token::span(SpanKind::InvertColors, "FAIL"),
                Token::LineBreak,
            ]
        );
    }

    #[test]
    fn removal_overrides_spans() {
        let annotations = map(vec![(
            1,
            vec![span(0, 3, Tag::InvertColors), Annotation::marker(Tag::RemoveLine)],
        )]);
        let tokens = render(&lines(&["a\n", "bbb\n", "c\n"]), &annotations, &section(true)).unwrap();
        assert_eq!(
            body(&tokens),
            &[
                Token::literal("a"),
                Token::LineBreak,
                Token::literal("c"),
                Token::LineBreak,
            ]
        );
    }

    #[test]
    fn page_break_precedes_removed_line() {
        let annotations = map(vec![(
            1,
            vec![
                Annotation::marker(Tag::NewPage),
                Annotation::marker(Tag::RemoveLine),
            ],
        )]);
        let tokens = render(&lines(&["a\n", "\n"]), &annotations, &section(true)).unwrap();
        assert_eq!(
            body(&tokens),
            &[Token::literal("a"), Token::LineBreak, Token::PageDelimiter]
        );
    }

    #[test]
    fn first_line_page_break_is_ignored() {
        let annotations = map(vec![(0, vec![Annotation::marker(Tag::NewPage)])]);
        let tokens = render(&lines(&["a\n"]), &annotations, &section(true)).unwrap();
        assert_eq!(body(&tokens), &[Token::literal("a"), Token::LineBreak]);
    }

    #[test]
    fn rejects_span_past_visible_text() {
        let annotations = map(vec![(0, vec![span(2, 4, Tag::InvertColors)])]);
        let err = render(&lines(&["abc\n"]), &annotations, &section(true)).unwrap_err();
        assert_eq!(
            err,
            RenderError::OutOfBounds {
                section: "TAKEOFF".into(),
                line: 0,
                span: Span::new(2, 4),
                len: 3,
            }
        );
    }

    #[test]
    fn rejects_span_starting_inside_previous_one() {
        let section = section(true);
        let renderer = LineRenderer {
            section: &section,
            index: 2,
            text: "V1 VR V2",
        };
        let mut out = Vec::new();

        let err = renderer
            .render(
                &[span(0, 5, Tag::Underline), span(3, 8, Tag::InvertColors)],
                &mut out,
            )
            .unwrap_err();

        assert_eq!(
            err,
            RenderError::OutOfOrder {
                section: "TAKEOFF".into(),
                line: 2,
                span: Span::new(3, 8),
                cursor: 5,
            }
        );
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_inverted_span() {
        let annotations = map(vec![(0, vec![span(3, 1, Tag::Underline)])]);
        let err = render(&lines(&["abcdef\n"]), &annotations, &section(true)).unwrap_err();
        assert!(matches!(err, RenderError::InvertedSpan { line: 0, .. }));
    }

    #[test]
    fn rejects_offset_inside_multibyte_char() {
        let annotations = map(vec![(0, vec![span(1, 2, Tag::Underline)])]);
        let err = render(&lines(&["ВПП\n"]), &annotations, &section(true)).unwrap_err();
        assert!(matches!(err, RenderError::OutOfBounds { .. }));
    }
}
