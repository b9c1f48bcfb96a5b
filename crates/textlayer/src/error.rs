//! Engine error taxonomy.
//!
//! "No match" and "no run under the pointer" are normal outcomes expressed
//! as empty results, never as errors. Errors cover only page addressing and
//! lifecycle.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The page was torn down, so a single-page operation cannot produce a
    /// result from current geometry.
    #[error("page {0} is not ready")]
    PageNotReady(usize),

    /// The page index is outside the document.
    #[error("page index {index} out of bounds for {count} pages")]
    PageOutOfBounds { index: usize, count: usize },
}
