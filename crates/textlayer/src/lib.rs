//! textlayer: Text geometry, selection and search for document readers.
//!
//! This is the stateful facade over textlayer-core. It owns one slot per
//! page (runs, bounds, normalized text, readiness signal) plus the session's
//! selection state, and exposes the pointer- and query-driven operations a
//! viewer needs.
//!
//! # Architecture
//!
//! - **textlayer-core**: pure geometry, normalization, selection and search
//!   algorithms
//! - **textlayer** (this crate): per-page lifecycle, readiness, selection
//!   staging, and document-wide search

pub mod document;
pub mod error;
pub mod page;

pub use textlayer_core;

pub use document::{
    FoundMatch, MatchSnippet, PagePoint, PageSearchResult, SelectionSummary, TextLayout,
};
pub use error::EngineError;
pub use page::{PageData, PageSlot};
pub use textlayer_core::bound::{DefaultFontMetrics, FontMetrics};
pub use textlayer_core::run::{CharAdvance, Run, Viewport};
pub use textlayer_core::search::SearchOptions;
pub use textlayer_core::select::{Rotation, SelectionRect};
