//! Document-level facade: page slots, selection state, word hit-testing and
//! search.

use textlayer_core::bound::{DefaultFontMetrics, FontMetrics};
use textlayer_core::geometry::Point;
use textlayer_core::normalize::normalize;
use textlayer_core::run::{Run, Viewport};
use textlayer_core::search::{compile_query_cached, match_page, SearchOptions};
use textlayer_core::select::{join_selected_text, SelectionRect};
use textlayer_core::word;

use crate::error::EngineError;
use crate::page::{PageData, PageSlot};

/// A pointer position in one page's local coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PagePoint {
    pub page: usize,
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    pub fn new(page: usize, x: f64, y: f64) -> Self {
        Self { page, x, y }
    }

    fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// The whole selection as the renderer sees it: staged segments followed by
/// the active one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionSummary {
    pub rects: Vec<SelectionRect>,
    pub text: String,
    /// True when more than one disjoint segment contributes.
    pub multi_segment: bool,
}

/// Context around a match, for result listings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchSnippet {
    pub before: String,
    pub matched: String,
    pub after: String,
}

/// One search match with its highlight rectangles, offsets in the page's
/// raw text (character indices).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FoundMatch {
    pub start: usize,
    pub length: usize,
    pub rects: Vec<SelectionRect>,
    pub snippet: MatchSnippet,
}

/// All matches on one page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSearchResult {
    pub page_index: usize,
    pub matches: Vec<FoundMatch>,
}

#[derive(Debug, Clone, Default)]
struct Segment {
    rects: Vec<SelectionRect>,
    text: String,
}

/// The text layer of one open document: per-page geometry slots plus the
/// session's selection state.
pub struct TextLayout {
    pages: Vec<PageSlot>,
    metrics: Box<dyn FontMetrics + Send + Sync>,
    active: Option<Segment>,
    staged: Vec<Segment>,
}

impl TextLayout {
    /// A layout with `page_count` pending pages and default font metrics.
    pub fn new(page_count: usize) -> Self {
        Self::with_metrics(page_count, Box::new(DefaultFontMetrics))
    }

    pub fn with_metrics(
        page_count: usize,
        metrics: Box<dyn FontMetrics + Send + Sync>,
    ) -> Self {
        TextLayout {
            pages: (0..page_count).map(|_| PageSlot::new()).collect(),
            metrics,
            active: None,
            staged: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn slot(&self, index: usize) -> Result<&PageSlot, EngineError> {
        self.pages.get(index).ok_or(EngineError::PageOutOfBounds {
            index,
            count: self.pages.len(),
        })
    }

    /// Hand a page its runs for the current layout pass.
    pub fn install_page(
        &self,
        index: usize,
        runs: Vec<Run>,
        viewport: Viewport,
    ) -> Result<(), EngineError> {
        tracing::debug!(page = index, runs = runs.len(), "installing page runs");
        self.slot(index)?.install(runs, viewport, self.metrics.as_ref());
        Ok(())
    }

    /// Rebuild a page's geometry for a new viewport.
    pub fn rescale_page(&self, index: usize, viewport: Viewport) -> Result<(), EngineError> {
        tracing::trace!(page = index, scale = viewport.scale, "rescaling page");
        self.slot(index)?.rescale(viewport, self.metrics.as_ref());
        Ok(())
    }

    /// Drop a page's caches. Session selection state is cleared too, since
    /// its rectangles may reference the torn page.
    pub fn teardown_page(&mut self, index: usize) -> Result<(), EngineError> {
        tracing::debug!(page = index, "tearing down page");
        self.slot(index)?.teardown();
        self.active = None;
        self.staged.clear();
        Ok(())
    }

    fn with_page<R>(
        &self,
        index: usize,
        f: impl FnOnce(&PageData) -> R,
    ) -> Result<R, EngineError> {
        self.slot(index)?
            .with_ready(f)
            .ok_or(EngineError::PageNotReady(index))
    }

    /// Resolve a drag from `start` to `end` into the active selection.
    ///
    /// Returns `Ok(true)` when a selection was made, `Ok(false)` when no run
    /// was hit — the previous selection is left untouched in that case.
    /// Blocks until the pages involved are ready.
    pub fn select(
        &mut self,
        start: PagePoint,
        end: PagePoint,
        buff: f64,
    ) -> Result<bool, EngineError> {
        let (start, end) = if start.page <= end.page {
            (start, end)
        } else {
            (end, start)
        };

        let segment = if start.page == end.page {
            self.with_page(start.page, |data| {
                data.geometry()
                    .select_range(start.point(), end.point(), buff)
            })?
            .map(|sel| Segment {
                rects: sel.rects,
                text: sel.text,
            })
        } else {
            self.select_cross_page(start, end, buff)?
        };

        match segment {
            Some(segment) => {
                self.active = Some(segment);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn select_cross_page(
        &self,
        start: PagePoint,
        end: PagePoint,
        buff: f64,
    ) -> Result<Option<Segment>, EngineError> {
        // Trailing part: from the start point to the first page's corner.
        let trailing = self.with_page(start.page, |data| {
            let corner = Point::new(data.viewport.width, data.viewport.height);
            data.geometry().select_range(start.point(), corner, buff)
        })?;
        let Some(trailing) = trailing else {
            return Ok(None);
        };

        // Leading part: from the last page's origin to the end point.
        let leading = self.with_page(end.page, |data| {
            data.geometry()
                .select_range(Point::default(), end.point(), buff)
        })?;
        let Some(leading) = leading else {
            return Ok(None);
        };

        let mut rects = trailing.rects;
        let mut texts: Vec<String> = vec![trailing.text];

        // Every page strictly between contributes one full-page rectangle.
        for page in start.page + 1..end.page {
            let full = self.with_page(page, |data| SelectionRect {
                x: 0.0,
                y: 0.0,
                width: data.viewport.width,
                height: data.viewport.height,
                rotation: None,
                text: data.assembled.clone(),
                should_render: true,
            })?;
            texts.push(full.text.clone());
            rects.push(full);
        }

        texts.push(leading.text.clone());
        rects.extend(leading.rects);

        let text = join_selected_text(texts.iter().map(String::as_str));
        Ok(Some(Segment { rects, text }))
    }

    /// Commit the active selection as a staged segment, clearing the active
    /// one so a new disjoint region can be selected.
    pub fn stage(&mut self) {
        if let Some(segment) = self.active.take() {
            self.staged.push(segment);
        }
    }

    /// Clear selection state. Without `force` this is a no-op when nothing
    /// is selected, so repeated clears are idempotent.
    pub fn clear_selection(&mut self, force: bool) {
        if force || self.active.is_some() || !self.staged.is_empty() {
            self.active = None;
            self.staged.clear();
        }
    }

    fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.staged.iter().chain(self.active.as_ref())
    }

    /// Staged texts followed by the active one, joined with the single-space
    /// rule.
    pub fn selected_text(&self) -> String {
        join_selected_text(self.segments().map(|s| s.text.as_str()))
    }

    /// Staged rectangles followed by the active ones, in selection order.
    pub fn selected_rects(&self) -> Vec<SelectionRect> {
        self.segments().flat_map(|s| s.rects.iter().cloned()).collect()
    }

    /// The selection as a whole, or `None` when nothing is selected.
    pub fn selection(&self) -> Option<SelectionSummary> {
        let count = self.segments().count();
        if count == 0 {
            return None;
        }
        Some(SelectionSummary {
            rects: self.selected_rects(),
            // The summary is for display: normalized so line-break artifacts
            // (hyphenation, injected newlines) collapse, then trimmed.
            text: normalize(&self.selected_text()).text.trim().to_owned(),
            multi_segment: count > 1,
        })
    }

    /// Resolve a point to the word under it. Waits for the page's readiness;
    /// a miss is `Ok(None)`.
    pub fn hit_test_word(
        &self,
        p: PagePoint,
        buff: f64,
    ) -> Result<Option<SelectionRect>, EngineError> {
        self.with_page(p.page, |data| {
            word::hit_test_word(&data.geometry(), p.point(), buff)
        })
    }

    /// Search one page, waiting for its readiness.
    pub fn search_page(
        &self,
        index: usize,
        query: &str,
        opts: SearchOptions,
    ) -> Result<PageSearchResult, EngineError> {
        self.with_page(index, |data| PageSearchResult {
            page_index: index,
            matches: search_ready_page(data, query, opts),
        })
    }

    /// Search every ready page, in page order. Pages still pending (or torn
    /// down) are skipped; the caller re-issues the query once more pages
    /// become ready.
    pub fn search_all(&self, query: &str, opts: SearchOptions) -> Vec<PageSearchResult> {
        let mut results = Vec::new();
        let mut skipped = 0usize;
        for (index, slot) in self.pages.iter().enumerate() {
            let page = slot.try_with(|data| PageSearchResult {
                page_index: index,
                matches: search_ready_page(data, query, opts),
            });
            match page {
                Some(result) => {
                    if !result.matches.is_empty() {
                        results.push(result);
                    }
                }
                None => skipped += 1,
            }
        }
        tracing::debug!(
            query,
            pages = self.pages.len(),
            skipped,
            hits = results.len(),
            "bulk search finished"
        );
        results
    }
}

fn search_ready_page(data: &PageData, query: &str, opts: SearchOptions) -> Vec<FoundMatch> {
    let compiled = compile_query_cached(query, data.normalized.has_diacritics, opts);
    let geometry = data.geometry();
    let chars: Vec<char> = data.normalized.text.chars().collect();
    match_page(&compiled, &data.normalized.text)
        .into_iter()
        .map(|(start, len)| {
            let (orig_start, orig_len) = data.normalized.remap_range(start, len);
            FoundMatch {
                start: orig_start,
                length: orig_len,
                rects: geometry.rects_for_char_range(orig_start, orig_len),
                snippet: make_snippet(&chars, start, len),
            }
        })
        .collect()
}

/// Context window size, in characters, on each side of a match.
const SNIPPET_CONTEXT: usize = 100;

fn make_snippet(chars: &[char], start: usize, len: usize) -> MatchSnippet {
    let end = start + len;

    let from = start.saturating_sub(SNIPPET_CONTEXT);
    let mut before: String = chars[from..start].iter().collect();
    let mut truncated_before = from > 0;
    // Cut the leading context at the last sentence boundary inside it.
    if let Some(dot) = before.rfind('.') {
        before = before[dot + 1..].trim_start().to_owned();
        truncated_before = true;
    }
    if truncated_before && !before.is_empty() {
        before.insert_str(0, "...");
    }

    let to = (end + SNIPPET_CONTEXT).min(chars.len());
    let mut after: String = chars[end..to].iter().collect();
    let mut truncated_after = to < chars.len();
    // Keep the trailing context up to and including the sentence end.
    if let Some(dot) = after.find('.') {
        after.truncate(dot + 1);
        truncated_after = false;
    }
    if truncated_after {
        after.push_str("...");
    }

    MatchSnippet {
        before,
        matched: chars[start..end].iter().collect(),
        after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_plain_window() {
        let chars: Vec<char> = "alpha beta gamma".chars().collect();
        let s = make_snippet(&chars, 6, 4);
        assert_eq!(s.before, "alpha ");
        assert_eq!(s.matched, "beta");
        assert_eq!(s.after, " gamma");
    }

    #[test]
    fn snippet_cuts_at_sentence_boundaries() {
        let chars: Vec<char> = "First one. The needle is here. Trailing tail".chars().collect();
        let start = "First one. The ".chars().count();
        let s = make_snippet(&chars, start, 6);
        assert_eq!(s.before, "...The ");
        assert_eq!(s.matched, "needle");
        assert_eq!(s.after, " is here.");
    }

    #[test]
    fn snippet_marks_truncation() {
        let long = "x".repeat(300);
        let chars: Vec<char> = long.chars().collect();
        let s = make_snippet(&chars, 150, 1);
        assert!(s.before.starts_with("..."));
        assert!(s.after.ends_with("..."));
        assert_eq!(s.before.len(), SNIPPET_CONTEXT + 3);
    }
}
