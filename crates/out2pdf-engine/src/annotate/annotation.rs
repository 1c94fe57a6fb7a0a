use std::collections::BTreeMap;

use serde::Serialize;

use crate::span::Span;

/// Formatting or structural directive attached to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tag {
    NewPage,
    InvertColors,
    RemoveLine,
    Underline,
    LargeFont,
}

impl Tag {
    /// Markers apply to the whole line and carry no text range.
    pub fn is_marker(self) -> bool {
        matches!(self, Tag::NewPage | Tag::RemoveLine)
    }
}

/// A tagged range on the rewritten text of one line.
///
/// Markers always use the empty span `0..0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub span: Span,
    pub tag: Tag,
    /// Display text for tags that need it (underline, large font).
    pub payload: Option<String>,
}

impl Annotation {
    pub fn marker(tag: Tag) -> Self {
        debug_assert!(tag.is_marker());
        Self {
            span: Span::default(),
            tag,
            payload: None,
        }
    }

    pub fn new(span: Span, tag: Tag, payload: Option<String>) -> Self {
        Self { span, tag, payload }
    }

    pub fn is_marker(&self) -> bool {
        self.tag.is_marker()
    }
}

/// Annotations of a single line, ordered by `start`, spans pairwise disjoint.
///
/// Markers are kept at the front in registration order. Each marker tag is
/// stored at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineAnnotations {
    items: Vec<Annotation>,
}

impl LineAnnotations {
    /// Inserts at the position given by `start`.
    ///
    /// On conflict returns the span of the existing annotation that the new
    /// one would overlap; the list is left untouched.
    pub fn insert(&mut self, annotation: Annotation) -> Result<(), Span> {
        if annotation.is_marker() {
            if !self.has_marker(annotation.tag) {
                let idx = self.items.partition_point(Annotation::is_marker);
                self.items.insert(idx, annotation);
            }
            return Ok(());
        }

        let new = annotation.span;
        let idx = self
            .items
            .partition_point(|a| a.is_marker() || a.span.start <= new.start);

        if let Some(prev) = idx.checked_sub(1).map(|i| &self.items[i])
            && !prev.is_marker()
            && prev.span.end > new.start
        {
            return Err(prev.span);
        }
        if let Some(next) = self.items.get(idx)
            && next.span.start < new.end
        {
            return Err(next.span);
        }

        self.items.insert(idx, annotation);
        Ok(())
    }

    pub fn has_marker(&self, tag: Tag) -> bool {
        self.items.iter().any(|a| a.is_marker() && a.tag == tag)
    }

    /// Text spans only, in order.
    pub fn spans(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter().filter(|a| !a.is_marker())
    }

    /// The existing span that fully contains `span`, if any.
    pub fn enclosing(&self, span: Span) -> Option<Span> {
        self.spans()
            .map(|a| a.span)
            .find(|existing| !span.is_empty() && existing.contains(span))
    }

    /// Moves every text span through `map`, dropping spans it empties.
    ///
    /// `map` must be monotonic so that order and disjointness carry over.
    pub(crate) fn remap_spans(&mut self, map: impl Fn(Span) -> Span) {
        self.items.retain_mut(|a| {
            if a.is_marker() {
                return true;
            }
            a.span = map(a.span);
            !a.span.is_empty()
        });
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a LineAnnotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Line index to that line's annotations. Lines without annotations are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationMap {
    lines: BTreeMap<usize, LineAnnotations>,
}

impl AnnotationMap {
    pub fn get(&self, line: usize) -> Option<&LineAnnotations> {
        self.lines.get(&line)
    }

    /// Annotations for `line`, empty when it has none.
    pub fn line(&self, line: usize) -> &[Annotation] {
        self.lines
            .get(&line)
            .map(LineAnnotations::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn insert(&mut self, line: usize, annotations: LineAnnotations) {
        if !annotations.is_empty() {
            self.lines.insert(line, annotations);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &LineAnnotations)> {
        self.lines.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromIterator<(usize, LineAnnotations)> for AnnotationMap {
    fn from_iter<T: IntoIterator<Item = (usize, LineAnnotations)>>(iter: T) -> Self {
        let mut map = Self::default();
        for (line, annotations) in iter {
            map.insert(line, annotations);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn span(start: usize, end: usize) -> Annotation {
        Annotation::new(Span::new(start, end), Tag::InvertColors, None)
    }

    fn starts(line: &LineAnnotations) -> Vec<(usize, usize)> {
        line.iter().map(|a| (a.span.start, a.span.end)).collect()
    }

    #[test]
    fn inserts_in_start_order() {
        let mut line = LineAnnotations::default();
        line.insert(span(10, 12)).unwrap();
        line.insert(span(0, 3)).unwrap();
        line.insert(span(5, 10)).unwrap();
        line.insert(span(12, 20)).unwrap();
        assert_eq!(starts(&line), vec![(0, 3), (5, 10), (10, 12), (12, 20)]);
    }

    #[test]
    fn rejects_span_reaching_into_next() {
        let mut line = LineAnnotations::default();
        line.insert(span(5, 10)).unwrap();
        assert_eq!(line.insert(span(2, 6)), Err(Span::new(5, 10)));
        assert_eq!(line.len(), 1);
    }

    #[test]
    fn rejects_span_starting_inside_previous() {
        let mut line = LineAnnotations::default();
        line.insert(span(5, 10)).unwrap();
        assert_eq!(line.insert(span(9, 15)), Err(Span::new(5, 10)));
        assert_eq!(line.insert(span(5, 7)), Err(Span::new(5, 10)));
        assert_eq!(line.insert(span(6, 8)), Err(Span::new(5, 10)));
    }

    #[test]
    fn markers_do_not_count_toward_overlap() {
        let mut line = LineAnnotations::default();
        line.insert(span(0, 4)).unwrap();
        line.insert(Annotation::marker(Tag::RemoveLine)).unwrap();
        line.insert(Annotation::marker(Tag::NewPage)).unwrap();
        line.insert(span(4, 8)).unwrap();
        assert_eq!(
            line.iter().map(|a| a.tag).collect::<Vec<_>>(),
            vec![Tag::RemoveLine, Tag::NewPage, Tag::InvertColors, Tag::InvertColors]
        );
    }

    #[test]
    fn markers_are_idempotent() {
        let mut line = LineAnnotations::default();
        for _ in 0..3 {
            line.insert(Annotation::marker(Tag::NewPage)).unwrap();
            line.insert(Annotation::marker(Tag::RemoveLine)).unwrap();
        }
        assert_eq!(line.len(), 2);
        assert!(line.has_marker(Tag::NewPage));
        assert!(line.has_marker(Tag::RemoveLine));
    }

    #[test]
    fn finds_enclosing_span() {
        let mut line = LineAnnotations::default();
        line.insert(span(3, 9)).unwrap();
        assert_eq!(line.enclosing(Span::new(4, 6)), Some(Span::new(3, 9)));
        assert_eq!(line.enclosing(Span::new(2, 6)), None);
        assert_eq!(line.enclosing(Span::new(4, 4)), None);
    }

    #[test]
    fn remap_moves_spans_and_keeps_markers() {
        let mut line = LineAnnotations::default();
        line.insert(Annotation::marker(Tag::NewPage)).unwrap();
        line.insert(span(0, 2)).unwrap();
        line.insert(span(4, 6)).unwrap();

        // Bytes 0..2 deleted.
        line.remap_spans(|s| Span::new(s.start.saturating_sub(2), s.end.saturating_sub(2)));

        assert_eq!(starts(&line), vec![(0, 0), (2, 4)]);
        assert!(line.has_marker(Tag::NewPage));
    }

    #[test]
    fn map_skips_empty_lines() {
        let mut with = LineAnnotations::default();
        with.insert(span(0, 1)).unwrap();
        let map: AnnotationMap = [(0, LineAnnotations::default()), (3, with)]
            .into_iter()
            .collect();
        assert_eq!(map.len(), 1);
        assert!(map.line(0).is_empty());
        assert_eq!(map.line(3).len(), 1);
    }
}
