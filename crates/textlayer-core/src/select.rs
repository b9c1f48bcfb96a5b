//! Pointer selection: resolve a drag gesture into per-run rectangles and the
//! text they cover.
//!
//! All functions here are pure over a page's runs, bounds and viewport; the
//! multi-segment selection state lives in the facade crate.

use crate::bound::Bound;
use crate::geometry::Point;
use crate::run::{Run, Viewport};

/// Rotation descriptor attached to rectangles of rotated runs. The renderer
/// rotates by `angle` around `(x, y)` and then offsets by `(dx, dy)` in the
/// rotated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotation {
    pub angle: f64,
    pub dx: f64,
    pub dy: f64,
}

/// One rectangle of a selection or search highlight, plus the text it covers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: Option<Rotation>,
    pub text: String,
    pub should_render: bool,
}

/// Rectangles plus assembled text for one selection segment.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSelection {
    pub rects: Vec<SelectionRect>,
    pub text: String,
}

/// Order a drag's two endpoints into reading order: top-to-bottom, and
/// left-to-right within the same height.
pub fn order_points(p1: Point, p2: Point) -> (Point, Point) {
    if p2.y < p1.y || (p2.y == p1.y && p2.x < p1.x) {
        (p2, p1)
    } else {
        (p1, p2)
    }
}

/// Concatenate selection parts, inserting a single space at each boundary
/// where the earlier part does not already end in whitespace.
pub fn join_selected_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round rectangle coordinates to two decimals so renderer output is stable
/// across float noise.
pub fn round_rects(rects: &mut [SelectionRect]) {
    for r in rects {
        r.x = round2(r.x);
        r.y = round2(r.y);
        r.width = round2(r.width);
        r.height = round2(r.height);
    }
}

/// Fold single-space rectangles into a neighbor: the space joins the
/// preceding rectangle's text when one exists, otherwise the following one.
/// Keeps highlight painting free of detached sliver rectangles.
pub fn merge_space_rects(rects: Vec<SelectionRect>) -> Vec<SelectionRect> {
    let mut out: Vec<SelectionRect> = Vec::with_capacity(rects.len());
    let mut pending_leading_space = false;
    for r in rects {
        if r.text == " " {
            match out.last_mut() {
                Some(prev) => prev.text.push(' '),
                None => pending_leading_space = true,
            }
            continue;
        }
        let mut r = r;
        if pending_leading_space {
            r.text.insert(0, ' ');
            pending_leading_space = false;
        }
        out.push(r);
    }
    out
}

/// A page's geometry inputs, borrowed together: `bounds[i]` is the bound of
/// `runs[i]` (or `None` for an empty run).
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry<'a> {
    pub runs: &'a [Run],
    pub bounds: &'a [Option<Bound>],
    pub viewport: &'a Viewport,
}

impl<'a> PageGeometry<'a> {
    fn first_index(&self) -> Option<usize> {
        self.bounds.iter().position(|b| b.is_some())
    }

    fn last_index(&self) -> Option<usize> {
        self.bounds.iter().rposition(|b| b.is_some())
    }

    /// Whether `p` sits at the page's bottom-right corner, the gesture for
    /// "select to the end of the page".
    fn at_page_corner(&self, p: Point) -> bool {
        (p.x - self.viewport.width).abs() <= 1.0 && (p.y - self.viewport.height).abs() <= 1.0
    }

    /// Find the run whose bound contains `p` once expanded by `buff`. Among
    /// candidates, a bound strictly containing the point wins; otherwise the
    /// one with the nearest corner does.
    pub fn resolve_run(&self, p: Point, buff: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, bound) in self.bounds.iter().enumerate() {
            let Some(bound) = bound else { continue };
            if !bound.should_render || !bound.contains(p, buff) {
                continue;
            }
            let dist = if bound.contains(p, 0.0) {
                0.0
            } else {
                bound.nearest_corner_distance_sq(p)
            };
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((i, dist));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Rectangle covering characters `k1..k2` of run `idx`, clamped to the
    /// run, with `text` taken from the same span. Returns `None` when the
    /// run has no bound.
    pub fn run_span_rect(&self, idx: usize, k1: usize, k2: usize) -> Option<SelectionRect> {
        let run = &self.runs[idx];
        let bound = self.bounds[idx].as_ref()?;
        let total = run.char_count();
        let k1 = k1.min(total);
        let k2 = k2.clamp(k1, total);
        let x0 = bound.offset_x(run, self.viewport, k1);
        let x1 = bound.offset_x(run, self.viewport, k2);
        let text: String = run.text.chars().skip(k1).take(k2 - k1).collect();
        let rect = match &bound.frame {
            Some(frame) => SelectionRect {
                x: frame.matrix.0[4],
                y: frame.matrix.0[5],
                width: x1 - x0,
                height: bound.size.1,
                rotation: Some(Rotation {
                    angle: frame.angle,
                    dx: x0,
                    dy: 0.0,
                }),
                text,
                should_render: bound.should_render,
            },
            None => SelectionRect {
                x: bound.rect.left + x0,
                y: bound.rect.top,
                width: x1 - x0,
                height: bound.size.1,
                rotation: None,
                text,
                should_render: bound.should_render,
            },
        };
        Some(rect)
    }

    /// Resolve a drag from `p1` to `p2` (with tolerance `buff`) into ordered
    /// rectangles and text. Returns `None` when neither endpoint lands on a
    /// run, so the caller can leave prior state untouched.
    pub fn select_range(&self, p1: Point, p2: Point, buff: f64) -> Option<PageSelection> {
        let (a, b) = order_points(p1, p2);

        // A synthetic origin point marks "from the start of the page".
        let start_idx = if a == Point::default() {
            self.first_index()?
        } else {
            self.resolve_run(a, buff)?
        };

        let at_corner = self.at_page_corner(b);
        let end_idx = if at_corner {
            self.last_index()?
        } else {
            self.resolve_run(b, buff)?
        };

        let (start_idx, end_idx) = if start_idx <= end_idx {
            (start_idx, end_idx)
        } else {
            (end_idx, start_idx)
        };

        let mut rects = Vec::new();

        if start_idx == end_idx {
            let run = &self.runs[start_idx];
            let bound = self.bounds[start_idx].as_ref()?;
            let total = run.char_count();
            let (k1, _) = bound.boundary_at(run, self.viewport, bound.local_x(a));
            let k2 = if at_corner {
                total
            } else {
                let mut lx = bound.local_x(b);
                let lx1 = bound.local_x(a);
                if lx < lx1 {
                    lx = lx1;
                }
                bound.boundary_at(run, self.viewport, lx).0
            };
            let (k1, k2) = if k1 <= k2 { (k1, k2) } else { (k2, k1) };
            let rect = self.run_span_rect(start_idx, k1, k2)?;
            let text = rect.text.clone();
            rects.push(rect);
            round_rects(&mut rects);
            return Some(PageSelection { rects, text });
        }

        // Trailing span on the start run.
        {
            let run = &self.runs[start_idx];
            if let Some(bound) = self.bounds[start_idx].as_ref() {
                let (k1, _) = bound.boundary_at(run, self.viewport, bound.local_x(a));
                if let Some(mut rect) = self.run_span_rect(start_idx, k1, run.char_count()) {
                    if run.has_line_break {
                        rect.text.push('\n');
                    }
                    rects.push(rect);
                }
            }
        }

        // Full spans on every run strictly between.
        for idx in start_idx + 1..end_idx {
            let run = &self.runs[idx];
            if let Some(mut rect) = self.run_span_rect(idx, 0, run.char_count()) {
                if run.has_line_break {
                    rect.text.push('\n');
                }
                rects.push(rect);
            }
        }

        // Leading span on the end run.
        {
            let run = &self.runs[end_idx];
            if let Some(bound) = self.bounds[end_idx].as_ref() {
                let k2 = if at_corner {
                    run.char_count()
                } else {
                    bound.boundary_at(run, self.viewport, bound.local_x(b)).0
                };
                if let Some(rect) = self.run_span_rect(end_idx, 0, k2) {
                    rects.push(rect);
                }
            }
        }

        if rects.is_empty() {
            return None;
        }
        let mut rects = merge_space_rects(rects);
        let text = join_selected_text(rects.iter().map(|r| r.text.as_str()));
        round_rects(&mut rects);
        Some(PageSelection { rects, text })
    }

    /// Rectangles for a character range of the page's assembled text, where
    /// each run contributes its characters plus one slot for the line break
    /// that follows it. Shared by search highlighting and cross-page
    /// selection.
    pub fn rects_for_char_range(&self, start: usize, len: usize) -> Vec<SelectionRect> {
        let end = start + len;
        let mut rects = Vec::new();
        let mut cursor = 0;
        for (idx, run) in self.runs.iter().enumerate() {
            let total = run.char_count();
            let run_start = cursor;
            let run_end = cursor + total;
            cursor = run_end + usize::from(run.has_line_break);
            if run_start >= end {
                break;
            }
            let k1 = start.saturating_sub(run_start).min(total);
            let k2 = end.saturating_sub(run_start).min(total);
            if k1 >= k2 {
                continue;
            }
            if let Some(rect) = self.run_span_rect(idx, k1, k2) {
                rects.push(rect);
            }
        }
        let mut rects = merge_space_rects(rects);
        round_rects(&mut rects);
        rects
    }
}
