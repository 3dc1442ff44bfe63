//! Snapshot provider abstraction.

use crate::error::SelectResult;
use async_trait::async_trait;
use spider_select_types::ElementSnapshot;

/// Source of page snapshots, usually a browser-side capture service.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Capture the current page state.
    async fn capture(&self) -> SelectResult<ElementSnapshot>;
}

/// A provider that always returns the same snapshot.
///
/// Useful for replaying a saved capture.
#[derive(Debug, Clone)]
pub struct StaticSnapshot(pub ElementSnapshot);

#[async_trait]
impl SnapshotProvider for StaticSnapshot {
    async fn capture(&self) -> SelectResult<ElementSnapshot> {
        Ok(self.0.clone())
    }
}
