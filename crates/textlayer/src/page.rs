//! Per-page state: the run list and everything derived from it, behind a
//! readiness signal.
//!
//! A page starts `Pending`, becomes `Ready` when the layout engine delivers
//! its runs, and ends `Torn` at teardown. Derived data (bounds, assembled
//! text, normalization) is rebuilt wholesale on every install or rescale —
//! bound coordinates are viewport-dependent and must never be reused across
//! a scale change.

use std::sync::{Condvar, Mutex};

use textlayer_core::bound::{build_bound, Bound, FontMetrics};
use textlayer_core::normalize::{normalize, NormalizedText};
use textlayer_core::run::{Run, Viewport};
use textlayer_core::select::PageGeometry;

/// A ready page's cached inputs and derived caches.
#[derive(Debug, Clone)]
pub struct PageData {
    pub runs: Vec<Run>,
    pub bounds: Vec<Option<Bound>>,
    /// Raw page text: run texts concatenated, with a newline after each run
    /// that ends its line. This is the "original" side of the offset table.
    pub assembled: String,
    pub normalized: NormalizedText,
    pub viewport: Viewport,
}

impl PageData {
    fn build(runs: Vec<Run>, viewport: Viewport, metrics: &dyn FontMetrics) -> Self {
        let bounds = runs
            .iter()
            .map(|r| build_bound(r, &viewport, metrics))
            .collect();
        let mut assembled = String::new();
        for run in &runs {
            assembled.push_str(&run.text);
            if run.has_line_break {
                assembled.push('\n');
            }
        }
        let normalized = normalize(&assembled);
        PageData {
            runs,
            bounds,
            assembled,
            normalized,
            viewport,
        }
    }

    pub fn geometry(&self) -> PageGeometry<'_> {
        PageGeometry {
            runs: &self.runs,
            bounds: &self.bounds,
            viewport: &self.viewport,
        }
    }
}

#[derive(Debug)]
enum PageState {
    Pending,
    Ready(PageData),
    Torn,
}

/// One page's slot in the layout: state plus the signal that readiness
/// waiters block on.
#[derive(Debug)]
pub struct PageSlot {
    state: Mutex<PageState>,
    ready: Condvar,
}

impl PageSlot {
    pub fn new() -> Self {
        PageSlot {
            state: Mutex::new(PageState::Pending),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install a layout pass: runs plus the viewport they were laid out for.
    /// Replaces any previous state, including `Torn`.
    pub fn install(&self, runs: Vec<Run>, viewport: Viewport, metrics: &dyn FontMetrics) {
        let data = PageData::build(runs, viewport, metrics);
        *self.lock() = PageState::Ready(data);
        self.ready.notify_all();
    }

    /// Rebuild derived data for a new viewport, keeping the run list. A
    /// no-op unless the page is ready.
    pub fn rescale(&self, viewport: Viewport, metrics: &dyn FontMetrics) {
        let mut state = self.lock();
        if let PageState::Ready(data) = &mut *state {
            let runs = std::mem::take(&mut data.runs);
            *data = PageData::build(runs, viewport, metrics);
        }
    }

    /// Drop the page's caches and wake all waiters with a negative answer.
    pub fn teardown(&self) {
        *self.lock() = PageState::Torn;
        self.ready.notify_all();
    }

    /// Run `f` against the page's data, blocking until the page is ready.
    /// Returns `None` when the page is (or becomes) torn down.
    pub fn with_ready<R>(&self, f: impl FnOnce(&PageData) -> R) -> Option<R> {
        let mut state = self.lock();
        loop {
            match &*state {
                PageState::Ready(data) => return Some(f(data)),
                PageState::Torn => return None,
                PageState::Pending => {
                    state = self.ready.wait(state).unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Run `f` against the page's data only if it is ready right now.
    pub fn try_with<R>(&self, f: impl FnOnce(&PageData) -> R) -> Option<R> {
        match &*self.lock() {
            PageState::Ready(data) => Some(f(data)),
            _ => None,
        }
    }
}

impl Default for PageSlot {
    fn default() -> Self {
        Self::new()
    }
}
