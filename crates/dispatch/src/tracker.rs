use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Remembers the most recent call per request id.
///
/// Each call takes a stamp when it starts. When it finishes, it is current
/// only if no other call with the same id took a stamp in between.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a new call for `request_id` and returns its stamp.
    pub fn stamp(&self, request_id: &str) -> u64 {
        let stamp = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.lock().insert(request_id.to_string(), stamp);
        stamp
    }

    #[must_use]
    pub fn is_current(&self, request_id: &str, stamp: u64) -> bool {
        self.latest.lock().get(request_id) == Some(&stamp)
    }

    /// Ends the call holding `stamp` and reports whether it was current.
    /// The id is forgotten once its newest call ends.
    pub fn finish(&self, request_id: &str, stamp: u64) -> bool {
        let mut latest = self.latest.lock();
        if latest.get(request_id) != Some(&stamp) {
            return false;
        }
        latest.remove(request_id);
        true
    }

    /// Number of ids with a call in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_stamp_supersedes() {
        let tracker = RequestTracker::new();
        let first = tracker.stamp("search");
        let second = tracker.stamp("search");

        assert!(!tracker.is_current("search", first));
        assert!(tracker.is_current("search", second));
    }

    #[test]
    fn test_finish_forgets_completed_ids() {
        let tracker = RequestTracker::new();
        let first = tracker.stamp("search");
        let second = tracker.stamp("search");

        assert!(!tracker.finish("search", first));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.finish("search", second));
        assert!(tracker.is_empty());
        assert!(!tracker.finish("search", second));
    }

    #[test]
    fn test_ids_are_independent() {
        let tracker = RequestTracker::new();
        let search = tracker.stamp("search");
        tracker.stamp("filters");

        assert!(tracker.is_current("search", search));
        assert!(!tracker.is_current("unknown", search));
    }
}
