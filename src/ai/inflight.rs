//! Per-trigger bookkeeping of running AI requests

use std::collections::HashMap;

use super::Trigger;

/// Identifies one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Tracks the single in-flight request of each trigger point.
///
/// A response is applied only if its ticket is still the current one for the
/// trigger; anything else is stale and gets dropped.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    next: u64,
    active: HashMap<Trigger, Ticket>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `trigger`. Returns `None` while a request for it is running.
    pub fn begin(&mut self, trigger: &Trigger) -> Option<Ticket> {
        if self.active.contains_key(trigger) {
            return None;
        }
        self.next += 1;
        let ticket = Ticket(self.next);
        self.active.insert(trigger.clone(), ticket);
        Some(ticket)
    }

    /// Release `trigger` if `ticket` is current. `false` means the response is stale.
    pub fn finish(&mut self, trigger: &Trigger, ticket: Ticket) -> bool {
        match self.active.get(trigger) {
            Some(current) if *current == ticket => {
                self.active.remove(trigger);
                true
            }
            _ => false,
        }
    }

    /// Forget the running request, e.g. because its view was closed
    pub fn cancel(&mut self, trigger: &Trigger) -> bool {
        self.active.remove(trigger).is_some()
    }

    pub fn is_in_flight(&self, trigger: &Trigger) -> bool {
        self.active.contains_key(trigger)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_request_per_trigger() {
        let mut registry = InflightRegistry::new();
        let snapshot = Trigger::AlertSnapshot(3);

        let ticket = registry.begin(&snapshot).unwrap();
        assert!(registry.begin(&snapshot).is_none());
        assert!(registry.begin(&Trigger::Report).is_some());
        assert_eq!(registry.len(), 2);

        assert!(registry.finish(&snapshot, ticket));
        assert!(!registry.is_in_flight(&snapshot));
        assert!(registry.begin(&snapshot).is_some());
    }

    #[test]
    fn test_cancelled_response_is_stale() {
        let mut registry = InflightRegistry::new();
        let feed = Trigger::LiveFeed("cam-02".to_string());

        let old = registry.begin(&feed).unwrap();
        assert!(registry.cancel(&feed));
        let new = registry.begin(&feed).unwrap();

        assert!(!registry.finish(&feed, old));
        assert!(registry.is_in_flight(&feed));
        assert!(registry.finish(&feed, new));
        assert!(registry.is_empty());
    }
}
