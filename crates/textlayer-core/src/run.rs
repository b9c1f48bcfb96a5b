//! Input model: text runs as reported by a layout engine, plus the viewport
//! that maps layout space to rendered device space.

use crate::geometry::{Affine, Point};

/// Mapping from page layout space to rendered viewport space.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    /// Layout-space to viewport-space transform.
    pub transform: Affine,
    /// Uniform zoom factor baked into `transform`.
    pub scale: f64,
    /// Rendered page width in viewport units.
    pub width: f64,
    /// Rendered page height in viewport units.
    pub height: f64,
}

impl Viewport {
    /// An unrotated viewport: layout space scaled by `scale` with the y axis
    /// flipped so the origin sits at the top-left corner.
    pub fn axis_aligned(scale: f64, width: f64, height: f64) -> Self {
        Viewport {
            transform: Affine([scale, 0.0, 0.0, -scale, 0.0, height]),
            scale,
            width,
            height,
        }
    }
}

/// Placement of a single character inside a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharAdvance {
    /// Layout-space transform placing this character's origin.
    pub transform: Affine,
    /// Advance width of the space glyph in the character's font, in text
    /// space units. Zero when the font does not report one.
    pub space_width: f64,
}

impl CharAdvance {
    /// The character origin mapped into viewport space.
    pub fn position(&self, viewport: &Viewport) -> Point {
        viewport.transform.transform_point(self.transform.origin())
    }
}

/// A contiguous run of text sharing one transform and font, the atomic unit
/// every geometry operation works over.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Run {
    /// The run's text content.
    pub text: String,
    /// Layout-space transform placing the run baseline origin.
    pub transform: Affine,
    /// Run width in text space units (height for vertical runs).
    pub width: f64,
    /// Run height in text space units.
    pub height: f64,
    /// Font family name, used to look up ascent metrics.
    pub font_family: String,
    /// Whether the run is laid out top-to-bottom.
    pub vertical: bool,
    /// Whether a line break follows this run.
    pub has_line_break: bool,
    /// Per-character placements when the layout engine reports them. Absent
    /// for coarse-only runs, in which case positions inside the run are
    /// interpolated from the run width.
    pub chars: Option<Vec<CharAdvance>>,
}

impl Run {
    /// Number of characters in the run's text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
