//! Oriented bounds for text runs.
//!
//! A [`Bound`] is the rendered footprint of a run in viewport space. For
//! rotated runs it carries a [`RotatedFrame`] so hit-testing and horizontal
//! offsets can work in the run's own axis system instead of the enclosing
//! axis-aligned box.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::sync::{Mutex, OnceLock};

use crate::geometry::{Affine, Point, RectBox};
use crate::run::{Run, Viewport};

/// Ascent ratio used when a font reports no metrics.
pub const DEFAULT_FONT_ASCENT: f64 = 0.8;

/// Source of font ascent metrics, keyed by family name.
///
/// Returning `None` falls back to [`DEFAULT_FONT_ASCENT`]; either way the
/// resolved ratio is memoized per family for the life of the process.
pub trait FontMetrics {
    fn ascent_ratio(&self, family: &str) -> Option<f64>;
}

/// Metrics source that knows nothing; every family resolves to the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFontMetrics;

impl FontMetrics for DefaultFontMetrics {
    fn ascent_ratio(&self, _family: &str) -> Option<f64> {
        None
    }
}

fn ascent_cache() -> &'static Mutex<HashMap<String, f64>> {
    static CACHE: OnceLock<Mutex<HashMap<String, f64>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Resolved ascent ratio for a font family, memoized process-wide.
pub fn font_ascent(family: &str, metrics: &dyn FontMetrics) -> f64 {
    let mut cache = ascent_cache()
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    if let Some(&ratio) = cache.get(family) {
        return ratio;
    }
    let ratio = metrics.ascent_ratio(family).unwrap_or(DEFAULT_FONT_ASCENT);
    cache.insert(family.to_owned(), ratio);
    ratio
}

/// Rotation data for a non-axis-aligned bound.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotatedFrame {
    /// Rotation frame `[cos, sin, -sin, cos, left, top]` anchored at the
    /// bound's top-left corner.
    pub matrix: Affine,
    /// Rotation angle in radians.
    pub angle: f64,
    /// Corners in viewport space, `[top-left, top-right, bottom-right,
    /// bottom-left]` of the oriented box.
    pub corners: [Point; 4],
    /// The bound's box in local (derotated) coordinates.
    pub local: RectBox,
}

/// Rendered footprint of one run in viewport space.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bound {
    /// Axis-aligned box; for rotated runs this encloses the oriented corners.
    pub rect: RectBox,
    /// Local `(width, height)` of the run box, independent of rotation.
    pub size: (f64, f64),
    /// Rendered font size in viewport units.
    pub font_size: f64,
    /// Whether the run produces visible output. Lone space glyphs with
    /// ordinary scaling do not.
    pub should_render: bool,
    /// Present for rotated runs only.
    pub frame: Option<RotatedFrame>,
}

impl Bound {
    /// Whether `p` falls inside the bound, expanded by `buff` on every side.
    /// Rotated bounds test in local coordinates, so the buffer follows the
    /// run's own axes.
    pub fn contains(&self, p: Point, buff: f64) -> bool {
        match &self.frame {
            Some(frame) => {
                let local = frame.matrix.rotate_to_local(p);
                frame.local.contains(local, buff)
            }
            None => self.rect.contains(p, buff),
        }
    }

    /// Squared distance from `p` to the nearest corner of the bound.
    pub fn nearest_corner_distance_sq(&self, p: Point) -> f64 {
        self.corners()
            .iter()
            .map(|c| c.distance_sq(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Corners in viewport space.
    pub fn corners(&self) -> [Point; 4] {
        match &self.frame {
            Some(frame) => frame.corners,
            None => self.rect.corners(),
        }
    }

    /// Horizontal offset of `p` from the bound's leading edge, measured along
    /// the run's text direction.
    pub fn local_x(&self, p: Point) -> f64 {
        match &self.frame {
            Some(frame) => frame.matrix.rotate_to_local(p).x - frame.local.left,
            None => p.x - self.rect.left,
        }
    }

    /// Left edge of character `k` (or the run's trailing edge for
    /// `k == char_count`) as an offset from the bound's leading edge.
    ///
    /// Uses per-character placements when the run carries them for every
    /// character, otherwise interpolates uniformly across the run width.
    pub fn offset_x(&self, run: &Run, viewport: &Viewport, k: usize) -> f64 {
        let total = run.char_count();
        let k = k.min(total);
        if k == 0 {
            return 0.0;
        }
        if k == total {
            return self.size.0;
        }
        match &run.chars {
            Some(chars) if chars.len() == total => {
                self.local_x(chars[k].position(viewport))
            }
            _ => self.size.0 * k as f64 / total as f64,
        }
    }

    /// Snap a horizontal offset to the nearest character boundary at or past
    /// it. Returns the boundary's character index and its offset, clamped to
    /// the run's edges. A target at or before the leading edge resolves to
    /// boundary 0, so a zero-width drag selects zero characters.
    pub fn boundary_at(&self, run: &Run, viewport: &Viewport, target: f64) -> (usize, f64) {
        let total = run.char_count();
        if target <= 0.0 {
            return (0, 0.0);
        }
        for k in 1..=total {
            let x = self.offset_x(run, viewport, k);
            if x >= target {
                return (k, x);
            }
        }
        (total, self.offset_x(run, viewport, total))
    }

    /// Index of the character whose cell contains the horizontal offset
    /// `target`, clamped to the run's characters.
    pub fn char_index_at(&self, run: &Run, viewport: &Viewport, target: f64) -> usize {
        let total = run.char_count();
        if total == 0 {
            return 0;
        }
        let mut idx = 0;
        for k in 1..total {
            if self.offset_x(run, viewport, k) <= target {
                idx = k;
            } else {
                break;
            }
        }
        idx
    }
}

fn compute_should_render(text: &str, tx: &Affine) -> bool {
    let mut chars = text.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if chars.next().is_some() || !first.is_whitespace() {
        return true;
    }
    // A lone ordinary space never renders. Other single whitespace glyphs
    // render only when scaled visibly wider than tall (or vice versa).
    if first == ' ' || tx.0[0] == tx.0[3] {
        return false;
    }
    let ratio = (tx.0[0] / tx.0[3]).abs();
    ratio > 1.5 || ratio < 1.0 / 1.5
}

/// Compute the oriented bound of `run` under `viewport`, or `None` for a run
/// with empty text.
pub fn build_bound(run: &Run, viewport: &Viewport, metrics: &dyn FontMetrics) -> Option<Bound> {
    if run.text.is_empty() {
        return None;
    }

    let tx = viewport.transform.compose(&run.transform);
    let m = &tx.0;

    let mut angle = m[1].atan2(m[0]);
    if run.vertical {
        angle += FRAC_PI_2;
    }

    let font_size = (m[2] * m[2] + m[3] * m[3]).sqrt();
    let ascent = font_size * font_ascent(&run.font_family, metrics);

    // The transform origin sits on the baseline; shift up by the ascent,
    // along the rotated vertical axis for angled runs.
    let (left, top) = if angle == 0.0 {
        (m[4], m[5] - ascent)
    } else {
        (m[4] + ascent * angle.sin(), m[5] - ascent * angle.cos())
    };

    let extent = if run.vertical { run.height } else { run.width };
    let width = extent * viewport.scale;
    let height = font_size;

    let should_render = compute_should_render(&run.text, &tx);

    if angle == 0.0 {
        return Some(Bound {
            rect: RectBox::new(left, top, left + width, top + height),
            size: (width, height),
            font_size,
            should_render,
            frame: None,
        });
    }

    let (sin, cos) = angle.sin_cos();
    let matrix = Affine([cos, sin, -sin, cos, left, top]);
    let p1 = Point::new(left, top);
    let p2 = Point::new(left + width * cos, top + width * sin);
    let p3 = Point::new(left - height * sin, top + height * cos);
    let p4 = Point::new(p2.x + p3.x - p1.x, p2.y + p3.y - p1.y);
    let corners = [p1, p2, p4, p3];

    let local_origin = matrix.rotate_to_local(p1);
    let local = RectBox::new(
        local_origin.x,
        local_origin.y,
        local_origin.x + width,
        local_origin.y + height,
    );

    Some(Bound {
        rect: RectBox::enclosing(&corners),
        size: (width, height),
        font_size,
        should_render,
        frame: Some(RotatedFrame {
            matrix,
            angle,
            corners,
            local,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Affine;
    use crate::run::CharAdvance;
    use std::f64::consts::FRAC_PI_4;

    fn make_run(text: &str, width: f64) -> Run {
        Run {
            text: text.to_owned(),
            transform: Affine([0.0, 12.0, -12.0, 0.0, 10.0, 100.0]),
            width,
            height: 1.0,
            font_family: "serif".to_owned(),
            vertical: false,
            has_line_break: false,
            chars: None,
        }
    }

    fn horizontal_run(text: &str, width: f64) -> Run {
        Run {
            transform: Affine([12.0, 0.0, 0.0, 12.0, 10.0, 100.0]),
            ..make_run(text, width)
        }
    }

    fn viewport() -> Viewport {
        Viewport::axis_aligned(1.0, 600.0, 800.0)
    }

    #[test]
    fn empty_run_has_no_bound() {
        let run = horizontal_run("", 0.0);
        assert!(build_bound(&run, &viewport(), &DefaultFontMetrics).is_none());
    }

    #[test]
    fn horizontal_run_is_axis_aligned() {
        let run = horizontal_run("hello", 5.0);
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        assert!(b.frame.is_none());
        assert!((b.font_size - 12.0).abs() < 1e-9);
        assert!((b.size.0 - 5.0).abs() < 1e-9);
        // Baseline at y = 800 - 100 = 700, shifted up by 12 * 0.8.
        assert!((b.rect.top - (700.0 - 12.0 * DEFAULT_FONT_ASCENT)).abs() < 1e-9);
        assert!((b.rect.left - 10.0).abs() < 1e-9);
        assert!(b.should_render);
    }

    #[test]
    fn rotated_run_carries_frame() {
        let (sin, cos) = FRAC_PI_4.sin_cos();
        let run = Run {
            // Rotation in layout space; viewport y-flip negates the angle.
            transform: Affine([12.0 * cos, 12.0 * sin, -12.0 * sin, 12.0 * cos, 10.0, 100.0]),
            ..make_run("tilted", 6.0)
        };
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        let frame = b.frame.expect("rotated run should carry a frame");
        assert!((frame.angle + FRAC_PI_4).abs() < 1e-9);
        // The enclosing rect is wider than the local box.
        assert!(b.rect.width() > b.size.0 * 0.9);
        // Local box round-trips its own corners.
        for c in frame.corners {
            let local = frame.matrix.rotate_to_local(c);
            assert!(frame.local.contains(local, 1e-9));
        }
    }

    #[test]
    fn lone_space_does_not_render() {
        let run = horizontal_run(" ", 0.5);
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        assert!(!b.should_render);
    }

    #[test]
    fn stretched_whitespace_renders() {
        let run = Run {
            transform: Affine([30.0, 0.0, 0.0, 12.0, 10.0, 100.0]),
            ..make_run("\u{00a0}", 2.0)
        };
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        assert!(b.should_render);
    }

    #[test]
    fn contains_respects_rotation() {
        let (sin, cos) = FRAC_PI_4.sin_cos();
        let run = Run {
            transform: Affine([12.0 * cos, 12.0 * sin, -12.0 * sin, 12.0 * cos, 10.0, 100.0]),
            ..make_run("tilted", 20.0)
        };
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        // The enclosing rect's own top-left corner lies outside the oriented
        // box for a 45 degree run.
        let outside = Point::new(b.rect.left + 0.1, b.rect.top + 0.1);
        assert!(b.rect.contains(outside, 0.0));
        assert!(!b.contains(outside, 0.0));
        // A corner of the oriented box is inside with a small buffer.
        assert!(b.contains(b.corners()[0], 0.1));
    }

    #[test]
    fn offset_x_interpolates_without_char_advances() {
        let run = horizontal_run("abcd", 8.0);
        let b = build_bound(&run, &viewport(), &DefaultFontMetrics).unwrap();
        assert_eq!(b.offset_x(&run, &viewport(), 0), 0.0);
        assert!((b.offset_x(&run, &viewport(), 2) - 4.0).abs() < 1e-9);
        assert!((b.offset_x(&run, &viewport(), 4) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn offset_x_uses_char_advances_when_present() {
        let vp = viewport();
        let mut run = horizontal_run("ab", 10.0);
        let origin = |x: f64| CharAdvance {
            transform: Affine([12.0, 0.0, 0.0, 12.0, x, 100.0]),
            space_width: 0.0,
        };
        run.chars = Some(vec![origin(10.0), origin(17.0)]);
        let b = build_bound(&run, &vp, &DefaultFontMetrics).unwrap();
        assert!((b.offset_x(&run, &vp, 1) - 7.0).abs() < 1e-9);
        assert!((b.offset_x(&run, &vp, 2) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn boundary_at_snaps_forward() {
        let vp = viewport();
        let run = horizontal_run("abcd", 8.0);
        let b = build_bound(&run, &vp, &DefaultFontMetrics).unwrap();
        assert_eq!(b.boundary_at(&run, &vp, -1.0), (0, 0.0));
        assert_eq!(b.boundary_at(&run, &vp, 0.0), (0, 0.0));
        let (k, x) = b.boundary_at(&run, &vp, 2.5);
        assert_eq!(k, 2);
        assert!((x - 4.0).abs() < 1e-9);
        // Past the trailing edge clamps to the run end.
        assert_eq!(b.boundary_at(&run, &vp, 100.0).0, 4);
    }

    #[test]
    fn char_index_at_clamps_to_last_char() {
        let vp = viewport();
        let run = horizontal_run("abcd", 8.0);
        let b = build_bound(&run, &vp, &DefaultFontMetrics).unwrap();
        assert_eq!(b.char_index_at(&run, &vp, -5.0), 0);
        assert_eq!(b.char_index_at(&run, &vp, 3.0), 1);
        assert_eq!(b.char_index_at(&run, &vp, 100.0), 3);
    }

    #[test]
    fn ascent_falls_back_to_default() {
        assert_eq!(
            font_ascent("no-such-family", &DefaultFontMetrics),
            DEFAULT_FONT_ASCENT
        );
    }
}
