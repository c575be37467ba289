//! Snapshot-based dirty tracking.
//!
//! The tracker keeps the canonical JSON text of the last persisted content.
//! Dirtiness is a value comparison of that text against the current content,
//! never an identity check.

use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    snapshot: Option<String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker seeded with `data` as the persisted baseline.
    pub fn with_snapshot<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let mut tracker = Self::new();
        tracker.snapshot(data)?;
        Ok(tracker)
    }

    /// Store the canonical serialization of `data`.
    pub fn snapshot<T: Serialize>(&mut self, data: &T) -> Result<(), serde_json::Error> {
        self.snapshot = Some(serde_json::to_string(data)?);
        Ok(())
    }

    /// `true` when `current` serializes differently from the snapshot.
    ///
    /// With no snapshot taken yet everything counts as dirty.
    pub fn is_dirty<T: Serialize>(&self, current: &T) -> Result<bool, serde_json::Error> {
        let current = serde_json::to_string(current)?;
        Ok(self.snapshot.as_deref() != Some(current.as_str()))
    }

    /// Replace the snapshot after `data` has been written successfully.
    pub fn commit<T: Serialize>(&mut self, data: &T) -> Result<(), serde_json::Error> {
        self.snapshot(data)?;
        tracing::debug!("snapshot replaced after save");
        Ok(())
    }

    pub fn snapshot_text(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }
}
