//! Word hit-testing: resolve a single point to the alphanumeric word under
//! (or immediately after) it.

use crate::geometry::Point;
use crate::select::{PageGeometry, SelectionRect};

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Resolve `p` to the word it touches, with tolerance `buff`.
///
/// The resolved character's word expands left and right over `[A-Za-z0-9]`
/// neighbors; hitting a non-word character probes the word immediately to
/// its right instead. A span of a single character is not a word and
/// returns `None`, as does a point that lands on no run.
pub fn hit_test_word(geom: &PageGeometry<'_>, p: Point, buff: f64) -> Option<SelectionRect> {
    let idx = geom.resolve_run(p, buff)?;
    let run = &geom.runs[idx];
    let bound = geom.bounds[idx].as_ref()?;
    let chars: Vec<char> = run.text.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let hit = bound.char_index_at(run, geom.viewport, bound.local_x(p));

    let (mut left, mut right) = if is_word_char(chars[hit]) {
        (hit, hit)
    } else {
        // Probe the word starting just right of the separator.
        let next = hit + 1;
        if next >= chars.len() || !is_word_char(chars[next]) {
            return None;
        }
        (next, next)
    };

    while left > 0 && is_word_char(chars[left - 1]) {
        left -= 1;
    }
    while right + 1 < chars.len() && is_word_char(chars[right + 1]) {
        right += 1;
    }

    if left == right {
        return None;
    }
    geom.run_span_rect(idx, left, right + 1)
}
