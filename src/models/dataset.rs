//! Dataset model: the versioned unit holding every category and bookmark.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Bookmark, Category, Visibility};

/// Display names of the categories created for a brand-new store.
pub const SEED_CATEGORY_NAMES: [&str; 3] = ["Default", "Work", "Study"];

/// The root document persisted under the `current` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Missing in legacy blobs, in which case the first save yields 1.
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub updated_at: String,
}

impl Dataset {
    /// Build the first-run dataset: version 1, three public categories, no bookmarks.
    pub fn seed(now: String) -> Self {
        let categories = SEED_CATEGORY_NAMES
            .iter()
            .enumerate()
            .map(|(order, name)| Category::new(*name, order as i64, Visibility::Public))
            .collect();

        Self {
            version: 1,
            categories,
            bookmarks: Vec::new(),
            updated_at: now,
        }
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn bookmark_mut(&mut self, id: &str) -> Option<&mut Bookmark> {
        self.bookmarks.iter_mut().find(|b| b.id == id)
    }

    /// Order value that appends a bookmark at the end of `category_id`.
    pub fn next_bookmark_order(&self, category_id: &str) -> i64 {
        self.bookmarks
            .iter()
            .filter(|b| b.category_id == category_id)
            .map(|b| b.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Reassign category orders to `0..N-1`, keeping their relative order.
    pub fn renormalize_category_orders(&mut self) {
        let mut ranked: Vec<(i64, usize)> = self
            .categories
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.order, idx))
            .collect();
        ranked.sort();

        for (rank, (_, idx)) in ranked.into_iter().enumerate() {
            self.categories[idx].order = rank as i64;
        }
    }

    /// Reassign bookmark orders to `0..N-1` within each category.
    pub fn renormalize_bookmark_orders(&mut self) {
        let mut by_category: HashMap<String, Vec<(i64, usize)>> = HashMap::new();
        for (idx, b) in self.bookmarks.iter().enumerate() {
            by_category
                .entry(b.category_id.clone())
                .or_default()
                .push((b.order, idx));
        }

        for (_, mut ranked) in by_category {
            ranked.sort();
            for (rank, (_, idx)) in ranked.into_iter().enumerate() {
                self.bookmarks[idx].order = rank as i64;
            }
        }
    }

    /// Put the listed categories first, in list order, followed by the rest in
    /// their current order. Unknown ids are ignored.
    pub fn apply_category_order(&mut self, ids: &[String]) {
        let listed = list_positions(ids);
        let mut ranked: Vec<(usize, i64, usize)> = self
            .categories
            .iter()
            .enumerate()
            .map(|(idx, c)| match listed.get(c.id.as_str()) {
                Some(&pos) => (0, pos as i64, idx),
                None => (1, c.order, idx),
            })
            .collect();
        ranked.sort();

        for (rank, (_, _, idx)) in ranked.into_iter().enumerate() {
            self.categories[idx].order = rank as i64;
        }
    }

    /// Same as [`Dataset::apply_category_order`] for the bookmarks of one
    /// category. Ids belonging to other categories are ignored.
    pub fn apply_bookmark_order(&mut self, category_id: &str, ids: &[String]) {
        let listed = list_positions(ids);
        let mut ranked: Vec<(usize, i64, usize)> = self
            .bookmarks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.category_id == category_id)
            .map(|(idx, b)| match listed.get(b.id.as_str()) {
                Some(&pos) => (0, pos as i64, idx),
                None => (1, b.order, idx),
            })
            .collect();
        ranked.sort();

        for (rank, (_, _, idx)) in ranked.into_iter().enumerate() {
            self.bookmarks[idx].order = rank as i64;
        }
    }

    /// Remove categories (and their bookmarks) whose id is in `ids`.
    ///
    /// Returns the removed categories. Orders are renormalized afterwards.
    pub fn remove_categories(&mut self, ids: &[String]) -> Vec<Category> {
        let (removed, kept): (Vec<Category>, Vec<Category>) = std::mem::take(&mut self.categories)
            .into_iter()
            .partition(|c| ids.contains(&c.id));
        self.categories = kept;

        if !removed.is_empty() {
            self.bookmarks
                .retain(|b| !removed.iter().any(|c| c.id == b.category_id));
            self.renormalize_category_orders();
        }
        removed
    }

    /// Categories that currently hold no bookmarks.
    pub fn empty_categories(&self) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| !self.bookmarks.iter().any(|b| b.category_id == c.id))
            .collect()
    }

    /// Copy with private categories and private bookmarks removed.
    pub fn public_view(&self) -> Dataset {
        let categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .cloned()
            .collect();

        let bookmarks = self
            .bookmarks
            .iter()
            .filter(|b| !b.is_private && categories.iter().any(|c| c.id == b.category_id))
            .cloned()
            .collect();

        Dataset {
            version: self.version,
            categories,
            bookmarks,
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Position of each id in a requested order; the first occurrence wins.
fn list_positions(ids: &[String]) -> HashMap<&str, usize> {
    let mut positions = HashMap::new();
    for (pos, id) in ids.iter().enumerate() {
        positions.entry(id.as_str()).or_insert(pos);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(id: &str, category_id: &str, order: i64, is_private: bool) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            category_id: category_id.to_string(),
            title: id.to_string(),
            url: format!("https://{}.example", id),
            description: None,
            icon_url: None,
            is_private,
            order,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_seed_has_three_ordered_categories() {
        let seed = Dataset::seed("2024-01-01T00:00:00Z".to_string());
        assert_eq!(seed.version, 1);
        assert!(seed.bookmarks.is_empty());
        let names: Vec<&str> = seed.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, SEED_CATEGORY_NAMES);
        let orders: Vec<i64> = seed.categories.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_version_deserializes_as_zero() {
        let data: Dataset =
            serde_json::from_str(r#"{"categories":[],"bookmarks":[],"updatedAt":""}"#).unwrap();
        assert_eq!(data.version, 0);
    }

    #[test]
    fn test_renormalize_bookmark_orders_per_category() {
        let mut data = Dataset::seed(String::new());
        data.bookmarks = vec![
            bookmark("a", "c1", 5, false),
            bookmark("b", "c1", 2, false),
            bookmark("c", "c2", 9, false),
        ];
        data.renormalize_bookmark_orders();

        let order_of = |id: &str| data.bookmarks.iter().find(|b| b.id == id).unwrap().order;
        assert_eq!(order_of("b"), 0);
        assert_eq!(order_of("a"), 1);
        assert_eq!(order_of("c"), 0);
    }

    #[test]
    fn test_remove_categories_cascades() {
        let mut data = Dataset::seed(String::new());
        let doomed = data.categories[1].id.clone();
        let survivor = data.categories[2].id.clone();
        data.bookmarks = vec![bookmark("a", &doomed, 0, false), bookmark("b", &survivor, 0, false)];

        let removed = data.remove_categories(&[doomed]);

        assert_eq!(removed.len(), 1);
        assert_eq!(data.categories.len(), 2);
        assert_eq!(data.bookmarks.len(), 1);
        assert_eq!(data.category(&survivor).unwrap().order, 1);
    }

    #[test]
    fn test_public_view_hides_private_entries() {
        let mut data = Dataset::seed(String::new());
        let public_id = data.categories[0].id.clone();
        let private_id = data.categories[1].id.clone();
        data.category_mut(&private_id).unwrap().visibility = Visibility::Private;
        data.bookmarks = vec![
            bookmark("open", &public_id, 0, false),
            bookmark("secret", &public_id, 1, true),
            bookmark("hidden-cat", &private_id, 0, false),
        ];

        let view = data.public_view();

        assert_eq!(view.categories.len(), 2);
        assert_eq!(view.bookmarks.len(), 1);
        assert_eq!(view.bookmarks[0].id, "open");
    }

    #[test]
    fn test_next_bookmark_order_appends() {
        let mut data = Dataset::seed(String::new());
        assert_eq!(data.next_bookmark_order("c1"), 0);
        data.bookmarks = vec![bookmark("a", "c1", 0, false), bookmark("b", "c1", 1, false)];
        assert_eq!(data.next_bookmark_order("c1"), 2);
    }

    #[test]
    fn test_partial_bookmark_order_moves_listed_first() {
        let mut data = Dataset::seed(String::new());
        data.bookmarks = vec![
            bookmark("a", "c1", 0, false),
            bookmark("b", "c1", 1, false),
            bookmark("c", "c1", 2, false),
            bookmark("x", "c2", 0, false),
        ];
        data.apply_bookmark_order("c1", &["c".to_string(), "x".to_string()]);

        let order_of = |id: &str| data.bookmarks.iter().find(|b| b.id == id).unwrap().order;
        assert_eq!(order_of("c"), 0);
        assert_eq!(order_of("a"), 1);
        assert_eq!(order_of("b"), 2);
        assert_eq!(order_of("x"), 0);
    }

    #[test]
    fn test_partial_category_order_keeps_orders_unique() {
        let mut data = Dataset::seed(String::new());
        let study = data.categories[2].id.clone();
        data.apply_category_order(&[study.clone(), "missing".to_string(), study.clone()]);

        let names: Vec<(&str, i64)> = {
            let mut sorted: Vec<_> = data.categories.iter().collect();
            sorted.sort_by_key(|c| c.order);
            sorted.iter().map(|c| (c.name.as_str(), c.order)).collect()
        };
        assert_eq!(names, vec![("Study", 0), ("Default", 1), ("Work", 2)]);
    }
}
