//! Filtered, sorted and paginated alert views

use serde::{Deserialize, Serialize};

use super::{Alert, BehaviourType};

/// Rows per page in the alert log
pub const PAGE_SIZE: usize = 10;

/// Search and filter criteria for the alert log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertQuery {
    /// Substring matched against person id, behavior and camera
    pub search: String,
    /// Exact behavior filter; `None` means all
    pub behaviour: Option<BehaviourType>,
}

impl AlertQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn behaviour(mut self, behaviour: BehaviourType) -> Self {
        self.behaviour = Some(behaviour);
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        let term = self.search.to_lowercase();
        let matches_search = alert.person_id.to_string().contains(&term)
            || alert.behaviour_type.as_str().contains(&term)
            || alert.camera_id.to_lowercase().contains(&term);
        let matches_filter = self.behaviour.map_or(true, |b| alert.behaviour_type == b);

        matches_search && matches_filter
    }

    /// Matching alerts, newest timestamp first
    pub fn apply<'a, I>(&self, alerts: I) -> Vec<Alert>
    where
        I: IntoIterator<Item = &'a Alert>,
    {
        let mut matched: Vec<Alert> = alerts
            .into_iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }
}

/// One page of a larger result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into fixed-size pages. Page numbers start at 1; page 0 is
/// read as page 1 and pages past the end come back empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size).min(total_items);
    let end = start.saturating_add(page_size).min(total_items);

    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total_items,
    }
}
