//! Progress accounting.

use crate::job::ProgressCallback;
use crate::layer::LayerKind;

/// Reports settled tiles to the job's progress callback.
///
/// Every layer contributes its progress weight once per page, split evenly
/// over the layer's tiles, so a completed job reports exactly
/// `Σ weight × pages`.
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    total: f64,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>, layers: &[LayerKind], pages: usize) -> Self {
        let per_page: f64 = layers.iter().map(LayerKind::progress_weight).sum();
        Self {
            callback,
            total: per_page * pages as f64,
        }
    }

    pub fn advance(&mut self, increment: f64) {
        if let Some(callback) = &self.callback {
            callback(increment, self.total);
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.total)
            .field("reports", &self.callback.is_some())
            .finish()
    }
}
