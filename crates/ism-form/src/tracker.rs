//! Page-level load/save state for the save/discard bar.

use std::time::Instant;

use crate::diff::DirtyDiff;

/// Tracks loading, saving and unsaved changes of one settings page.
#[derive(Debug, Clone)]
pub struct SubmitTracker {
    /// Number of entries differing from the saved snapshot.
    unsaved_count: usize,

    /// Whether a load is in flight.
    loading: bool,

    /// Whether a save is in flight.
    saving: bool,

    /// When the first unsaved change was observed. Reset on save and reload.
    first_unsaved_change: Option<Instant>,

    /// Set once the page is gone; late completions must not touch state.
    detached: bool,
}

impl Default for SubmitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmitTracker {
    pub fn new() -> Self {
        Self {
            unsaved_count: 0,
            loading: false,
            saving: false,
            first_unsaved_change: None,
            detached: false,
        }
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[inline]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    #[inline]
    pub fn unsaved_count(&self) -> usize {
        self.unsaved_count
    }

    /// Refresh the unsaved count from a diff.
    pub fn observe(&mut self, diff: &DirtyDiff) {
        self.unsaved_count = diff.count();
        if self.unsaved_count == 0 {
            self.first_unsaved_change = None;
        } else if self.first_unsaved_change.is_none() {
            self.first_unsaved_change = Some(Instant::now());
        }
    }

    /// Whether the save/discard bar should be visible.
    pub fn shows_save_bar(&self) -> bool {
        self.unsaved_count > 0 && !self.loading
    }

    /// Whether a submit may start now.
    pub fn can_submit(&self) -> bool {
        !self.saving && !self.loading && !self.detached
    }

    pub fn start_load(&mut self) {
        self.loading = true;
    }

    /// Mark a load finished. Returns false when the page is detached and the
    /// result should be dropped.
    pub fn load_complete(&mut self) -> bool {
        if self.detached {
            return false;
        }
        self.loading = false;
        self.unsaved_count = 0;
        self.first_unsaved_change = None;
        true
    }

    pub fn load_failed(&mut self) {
        self.loading = false;
    }

    pub fn start_save(&mut self) {
        self.saving = true;
    }

    pub fn save_complete(&mut self) {
        self.saving = false;
        self.unsaved_count = 0;
        self.first_unsaved_change = None;
    }

    pub fn save_failed(&mut self) {
        self.saving = false;
        // Unsaved changes survive a failed save.
    }

    /// Milliseconds since the first unsaved change.
    pub fn ms_since_first_unsaved(&self) -> Option<u64> {
        self.first_unsaved_change
            .map(|t| u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    /// Mark the page as gone.
    pub fn detach(&mut self) {
        self.detached = true;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::diff::diff_lists;

    fn dirty_diff() -> DirtyDiff {
        diff_lists(
            &[json!({ "id": "a", "v": 2 })],
            &[json!({ "id": "a", "v": 1 })],
            "id",
        )
    }

    #[test]
    fn new_tracker_is_clean() {
        let tracker = SubmitTracker::new();
        assert_eq!(tracker.unsaved_count(), 0);
        assert!(!tracker.shows_save_bar());
        assert!(tracker.can_submit());
    }

    #[test]
    fn observe_shows_save_bar() {
        let mut tracker = SubmitTracker::new();
        tracker.observe(&dirty_diff());
        assert_eq!(tracker.unsaved_count(), 1);
        assert!(tracker.shows_save_bar());
        assert!(tracker.ms_since_first_unsaved().is_some_and(|ms| ms < 60_000));

        tracker.observe(&DirtyDiff::default());
        assert!(!tracker.shows_save_bar());
        assert!(tracker.ms_since_first_unsaved().is_none());
    }

    #[test]
    fn save_failed_keeps_changes() {
        let mut tracker = SubmitTracker::new();
        tracker.observe(&dirty_diff());
        tracker.start_save();
        assert!(!tracker.can_submit());
        tracker.save_failed();
        assert!(tracker.can_submit());
        assert_eq!(tracker.unsaved_count(), 1);
    }

    #[test]
    fn save_complete_clears_changes() {
        let mut tracker = SubmitTracker::new();
        tracker.observe(&dirty_diff());
        tracker.start_save();
        tracker.save_complete();
        assert_eq!(tracker.unsaved_count(), 0);
        assert!(!tracker.is_saving());
    }

    #[test]
    fn detached_tracker_drops_late_loads() {
        let mut tracker = SubmitTracker::new();
        tracker.start_load();
        tracker.detach();
        assert!(!tracker.load_complete());
        assert!(tracker.is_loading());
        assert!(!tracker.can_submit());
    }
}
