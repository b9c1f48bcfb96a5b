//! textlayer-core: Renderer-independent text geometry and search algorithms.
//!
//! This crate provides the pure building blocks of the text layer: affine
//! geometry, oriented run bounds, text normalization with reversible offset
//! mapping, pointer selection, word hit-testing and query matching. It holds
//! no page state — the `textlayer` crate ties these together per page.

pub mod bound;
pub mod geometry;
pub mod normalize;
pub mod run;
pub mod search;
pub mod select;
pub mod word;

pub use bound::{build_bound, Bound, DefaultFontMetrics, FontMetrics, RotatedFrame};
pub use geometry::{Affine, Point, RectBox};
pub use normalize::{normalize, NormalizedText, OffsetEntry};
pub use run::{CharAdvance, Run, Viewport};
pub use search::{compile_query, compile_query_cached, match_page, Query, SearchOptions};
pub use select::{
    join_selected_text, merge_space_rects, order_points, round_rects, PageGeometry,
    PageSelection, Rotation, SelectionRect,
};
pub use word::hit_test_word;
