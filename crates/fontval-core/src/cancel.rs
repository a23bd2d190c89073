// this_file: crates/fontval-core/src/cancel.rs

//! Cooperative cancellation shared between a driving thread and the loops it runs
//!
//! The flag is monotone within a run: once set it stays set until the next
//! run clears it. Loops poll it at glyph, size and height boundaries, so a
//! request is honored within one step and never in the middle of one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable handle to one cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear the flag. Only the start of a new run should call this.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Cancels a whole validation run: the driver's own flag plus the
/// backend's raster-test and metrics flags
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tokens: Vec<CancellationToken>,
}

impl CancelHandle {
    pub fn new(tokens: impl IntoIterator<Item = CancellationToken>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn cancel(&self) {
        for token in &self.tokens {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tokens.iter().any(CancellationToken::is_cancelled)
    }

    pub(crate) fn reset(&self) {
        for token in &self.tokens {
            token.reset();
        }
    }
}
