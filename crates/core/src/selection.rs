//! Selection set for bulk actions.

use std::collections::BTreeSet;

/// Ids of notifications chosen for a bulk action. Never spans pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Selected ids as owned strings.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    /// Flip membership of `id`.
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Whether every id of `page` is selected.
    pub fn covers<'a>(&self, page: impl IntoIterator<Item = &'a str>) -> bool {
        page.into_iter().all(|id| self.ids.contains(id))
    }

    /// Clear if the page is fully covered, otherwise select exactly the
    /// page.
    pub fn toggle_all<'a>(&mut self, page: impl IntoIterator<Item = &'a str> + Clone) {
        if self.covers(page.clone()) {
            self.ids.clear();
        } else {
            self.ids = page.into_iter().map(str::to_string).collect();
        }
    }

    /// Drop `id` from the selection.
    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    /// Add `id` to the selection.
    pub fn insert(&mut self, id: &str) {
        self.ids.insert(id.to_string());
    }

    /// Drop ids not in `page`.
    pub fn retain_page<'a>(&mut self, page: impl IntoIterator<Item = &'a str>) {
        let keep: BTreeSet<&str> = page.into_iter().collect();
        self.ids.retain(|id| keep.contains(id.as_str()));
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_membership() {
        let mut selection = Selection::default();
        selection.toggle("a");
        assert!(selection.contains("a"));
        selection.toggle("a");
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_all_twice_is_empty() {
        let page = ["a", "b", "c"];
        let mut selection = Selection::default();

        selection.toggle_all(page);
        assert_eq!(selection.len(), 3);

        selection.toggle_all(page);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_partial_selection_becomes_whole_page() {
        let page = ["a", "b", "c"];
        let mut selection = Selection::default();
        selection.toggle("b");

        selection.toggle_all(page);
        assert_eq!(selection.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_toggle_all_replaces_foreign_ids() {
        let mut selection = Selection::default();
        selection.insert("from-other-page");

        selection.toggle_all(["a", "b"]);
        assert_eq!(selection.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_retain_page() {
        let mut selection = Selection::default();
        selection.insert("a");
        selection.insert("z");
        selection.retain_page(["a", "b"]);
        assert_eq!(selection.to_vec(), vec!["a"]);
    }
}
