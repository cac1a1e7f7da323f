//! Dataset slots with last-requested-wins publishing.
//!
//! Every load request takes a fresh generation from the slot's counter. A
//! finished parse is only published if its generation is still the latest
//! one issued, so a slow parse of an older file can never overwrite the
//! result of a newer request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use movilo_mocap_core::ParseError;

/// Shared, monotonically increasing request counter for one slot. Clones
/// observe the same counter, so worker threads can check whether their
/// request has been superseded.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Take a new generation; it supersedes every earlier one.
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

/// Result of offering a finished parse to a slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Publish {
    /// The dataset replaced the previous one.
    Applied,
    /// The parse failed; the previous dataset is untouched.
    Rejected(ParseError),
    /// A newer request exists; the result was dropped.
    Superseded,
}

#[derive(Debug)]
pub struct DatasetSlot<T> {
    generation: Generation,
    pending: Option<u64>,
    dataset: Option<T>,
    file_name: Option<String>,
    failed: bool,
}

impl<T> Default for DatasetSlot<T> {
    fn default() -> Self {
        Self {
            generation: Generation::default(),
            pending: None,
            dataset: None,
            file_name: None,
            failed: false,
        }
    }
}

impl<T> DatasetSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new load request and return its generation.
    pub fn request(&mut self) -> u64 {
        let generation = self.generation.issue();
        self.pending = Some(generation);
        generation
    }

    /// Withdraw a request that never started. The slot stops waiting for it
    /// if it is still the latest one.
    pub fn abandon(&mut self, generation: u64) {
        if self.pending == Some(generation) {
            self.pending = None;
        }
    }

    /// Handle for worker threads to check supersession.
    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    /// Whether the latest request has not been published yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offer a finished parse. Only the latest generation is accepted.
    pub fn publish(
        &mut self,
        generation: u64,
        file_name: &str,
        result: Result<T, ParseError>,
    ) -> Publish {
        if !self.generation.is_current(generation) {
            return Publish::Superseded;
        }
        self.pending = None;
        match result {
            Ok(dataset) => {
                self.dataset = Some(dataset);
                self.file_name = Some(file_name.to_string());
                self.failed = false;
                Publish::Applied
            }
            Err(err) => {
                self.failed = true;
                Publish::Rejected(err)
            }
        }
    }

    pub fn dataset(&self) -> Option<&T> {
        self.dataset.as_ref()
    }

    /// Name of the file the held dataset came from. Hidden while the most
    /// recent load of this slot has failed.
    pub fn file_name(&self) -> Option<&str> {
        if self.failed {
            None
        } else {
            self.file_name.as_deref()
        }
    }

    /// The most recent load of this slot failed.
    pub fn has_error(&self) -> bool {
        self.failed
    }

    pub(crate) fn clear_error(&mut self) {
        self.failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase_and_are_shared() {
        let counter = Generation::default();
        let worker_view = counter.clone();
        let a = counter.issue();
        let b = counter.issue();
        assert!(b > a);
        assert!(!worker_view.is_current(a));
        assert!(worker_view.is_current(b));
    }

    #[test]
    fn only_latest_request_publishes() {
        let mut slot: DatasetSlot<u32> = DatasetSlot::new();
        let old = slot.request();
        let new = slot.request();

        assert_eq!(slot.publish(new, "b.tsv", Ok(2)), Publish::Applied);
        assert_eq!(slot.publish(old, "a.tsv", Ok(1)), Publish::Superseded);
        assert_eq!(slot.dataset(), Some(&2));
        assert_eq!(slot.file_name(), Some("b.tsv"));
        assert!(!slot.is_pending());
    }

    #[test]
    fn abandoned_request_is_no_longer_pending() {
        let mut slot: DatasetSlot<u32> = DatasetSlot::new();
        let first = slot.request();
        let second = slot.request();
        slot.abandon(first);
        assert!(slot.is_pending());
        slot.abandon(second);
        assert!(!slot.is_pending());
        assert_eq!(slot.publish(first, "a.tsv", Ok(1)), Publish::Superseded);
    }

    #[test]
    fn failure_keeps_dataset_and_hides_name() {
        let mut slot: DatasetSlot<u32> = DatasetSlot::new();
        let g = slot.request();
        slot.publish(g, "a.tsv", Ok(1));

        let g = slot.request();
        assert!(slot.is_pending());
        let outcome = slot.publish(g, "b.tsv", Err(ParseError::EmptyInput));
        assert_eq!(outcome, Publish::Rejected(ParseError::EmptyInput));
        assert_eq!(slot.dataset(), Some(&1));
        assert!(slot.has_error());
        assert_eq!(slot.file_name(), None);

        slot.clear_error();
        assert_eq!(slot.file_name(), Some("a.tsv"));
    }
}
