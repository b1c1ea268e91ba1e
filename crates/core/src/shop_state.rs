//! Derived shopping UI state
//!
//! The controller owns one [`UiState`] per session and publishes immutable
//! [`ShopState`] snapshots from it. All mutation paths keep the featured
//! wine invariant: whenever a featured wine is set, it is also a member of
//! the discussed shelf.

use serde::{Deserialize, Serialize};

use crate::filters::ActiveFilters;
use crate::wine::Wine;

/// Default capacity of the discussed shelf. Overridable via session policy
/// configuration.
pub const DEFAULT_DISCUSSED_CAPACITY: usize = 12;

/// Recency-ordered, capped set of wines surfaced during the session.
///
/// Most-recently-surfaced first. Inserting an already-present wine moves
/// it to the front rather than duplicating; the oldest entry is evicted on
/// overflow.
#[derive(Debug, Clone)]
pub struct DiscussedWines {
    wines: Vec<Wine>,
    capacity: usize,
}

impl DiscussedWines {
    pub fn new(capacity: usize) -> Self {
        Self {
            wines: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Front-insert a wine, deduplicating by id and evicting from the back
    /// when over capacity.
    pub fn insert_front(&mut self, wine: Wine) {
        self.wines.retain(|w| w.id != wine.id);
        self.wines.insert(0, wine);
        self.wines.truncate(self.capacity);
    }

    /// Front-insert a batch, preserving the batch's own ranking order
    /// (the batch's first element ends up at the front).
    pub fn insert_front_all<I>(&mut self, wines: I)
    where
        I: IntoIterator<Item = Wine>,
        I::IntoIter: DoubleEndedIterator,
    {
        for wine in wines.into_iter().rev() {
            self.insert_front(wine);
        }
    }

    pub fn contains(&self, wine_id: i64) -> bool {
        self.wines.iter().any(|w| w.id == wine_id)
    }

    pub fn len(&self) -> usize {
        self.wines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.wines.clear();
    }

    pub fn to_vec(&self) -> Vec<Wine> {
        self.wines.clone()
    }
}

impl Default for DiscussedWines {
    fn default() -> Self {
        Self::new(DEFAULT_DISCUSSED_CAPACITY)
    }
}

/// Immutable snapshot published to UI consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopState {
    pub filters: ActiveFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<Wine>,
    pub discussed: Vec<Wine>,
}

/// Mutable per-session UI state owned by the controller.
#[derive(Debug, Clone)]
pub struct UiState {
    filters: ActiveFilters,
    featured: Option<Wine>,
    discussed: DiscussedWines,
}

impl UiState {
    pub fn new(discussed_capacity: usize) -> Self {
        Self {
            filters: ActiveFilters::default(),
            featured: None,
            discussed: DiscussedWines::new(discussed_capacity),
        }
    }

    /// Apply a successful search/recommend result: replace the active
    /// filters, feature the top result, and union all results into the
    /// discussed shelf (front = most recent).
    pub fn apply_ranked_results(&mut self, filters: ActiveFilters, results: &[Wine]) {
        self.filters = filters;
        if let Some(top) = results.first() {
            self.featured = Some(top.clone());
        }
        self.discussed.insert_front_all(results.iter().cloned());
    }

    /// Apply a resolved `get_wine`: feature it and insert into the shelf.
    /// Active filters are untouched.
    pub fn apply_single(&mut self, wine: Wine) {
        self.discussed.insert_front(wine.clone());
        self.featured = Some(wine);
    }

    /// Apply a `list_wines` subset: shelf only, filters untouched. A
    /// featured wine that the batch evicts from the shelf is unfeatured,
    /// keeping the featured wine a shelf member.
    pub fn apply_listing(&mut self, subset: &[Wine]) {
        self.discussed.insert_front_all(subset.iter().cloned());
        if let Some(featured) = &self.featured {
            if !self.discussed.contains(featured.id) {
                self.featured = None;
            }
        }
    }

    /// Explicit user filter action: replaces the whole record.
    pub fn set_filters(&mut self, filters: ActiveFilters) {
        self.filters = filters;
    }

    /// Reset on entry to a rest state (`Idle`/`Disconnected`).
    pub fn clear(&mut self) {
        self.filters = ActiveFilters::default();
        self.featured = None;
        self.discussed.clear();
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn featured(&self) -> Option<&Wine> {
        self.featured.as_ref()
    }

    pub fn discussed(&self) -> &DiscussedWines {
        &self.discussed
    }

    pub fn snapshot(&self) -> ShopState {
        ShopState {
            filters: self.filters.clone(),
            featured: self.featured.clone(),
            discussed: self.discussed.to_vec(),
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(DEFAULT_DISCUSSED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wine(id: i64) -> Wine {
        Wine {
            id,
            slug: None,
            name: format!("Wine {id}"),
            winery: "W".into(),
            region: "R".into(),
            country: "C".into(),
            grape_variety: None,
            vintage: None,
            wine_type: "red".into(),
            style: None,
            color: None,
            price_retail: id as f64,
            price_trade: None,
            bottle_size: None,
            tasting_notes: None,
            food_pairings: None,
            critic_scores: None,
            drinking_window: None,
            image_url: None,
            supplier: None,
            is_active: true,
        }
    }

    #[test]
    fn test_discussed_caps_and_evicts_oldest() {
        let mut discussed = DiscussedWines::new(3);
        for id in 1..=5 {
            discussed.insert_front(wine(id));
        }
        assert_eq!(discussed.len(), 3);
        let ids: Vec<i64> = discussed.to_vec().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn test_resurfaced_wine_moves_to_front_without_duplicate() {
        let mut discussed = DiscussedWines::new(5);
        for id in 1..=3 {
            discussed.insert_front(wine(id));
        }
        discussed.insert_front(wine(1));
        let ids: Vec<i64> = discussed.to_vec().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_batch_insert_keeps_ranking_order() {
        let mut discussed = DiscussedWines::new(10);
        discussed.insert_front_all(vec![wine(1), wine(2), wine(3)]);
        let ids: Vec<i64> = discussed.to_vec().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_featured_invariant_after_ranked_results() {
        let mut state = UiState::new(4);
        let results = vec![wine(10), wine(11), wine(12)];
        state.apply_ranked_results(
            ActiveFilters {
                region: Some("bordeaux".into()),
                ..Default::default()
            },
            &results,
        );
        let featured = state.featured().unwrap();
        assert_eq!(featured.id, 10);
        assert!(state.discussed().contains(featured.id));
        assert_eq!(state.filters().region.as_deref(), Some("bordeaux"));
    }

    #[test]
    fn test_ranked_results_replace_filters() {
        let mut state = UiState::default();
        state.set_filters(ActiveFilters {
            country: Some("France".into()),
            ..Default::default()
        });
        state.apply_ranked_results(
            ActiveFilters {
                max_price: Some(50.0),
                ..Default::default()
            },
            &[wine(1)],
        );
        // Replaced, not merged.
        assert!(state.filters().country.is_none());
        assert_eq!(state.filters().max_price, Some(50.0));
    }

    #[test]
    fn test_single_does_not_touch_filters() {
        let mut state = UiState::default();
        state.set_filters(ActiveFilters {
            region: Some("Rioja".into()),
            ..Default::default()
        });
        state.apply_single(wine(42));
        assert_eq!(state.filters().region.as_deref(), Some("Rioja"));
        assert_eq!(state.featured().unwrap().id, 42);
        assert!(state.discussed().contains(42));
    }

    #[test]
    fn test_listing_does_not_feature() {
        let mut state = UiState::default();
        state.apply_listing(&[wine(1), wine(2)]);
        assert!(state.featured().is_none());
        assert_eq!(state.discussed().len(), 2);
    }

    #[test]
    fn test_listing_unfeatures_evicted_wine() {
        let mut state = UiState::new(3);
        state.apply_single(wine(42));
        state.apply_listing(&[wine(1), wine(2), wine(3), wine(4), wine(5)]);
        // The batch pushed wine 42 off the shelf, so nothing is featured.
        assert!(state.featured().is_none());
        assert!(!state.discussed().contains(42));
    }

    #[test]
    fn test_listing_keeps_surviving_featured_wine() {
        let mut state = UiState::new(5);
        state.apply_single(wine(42));
        state.apply_listing(&[wine(1), wine(2)]);
        assert_eq!(state.featured().unwrap().id, 42);
        assert!(state.discussed().contains(42));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = UiState::default();
        state.apply_ranked_results(ActiveFilters::default(), &[wine(1)]);
        state.clear();
        assert!(state.filters().is_empty());
        assert!(state.featured().is_none());
        assert!(state.discussed().is_empty());
    }
}
