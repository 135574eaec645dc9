//! Read-only photo catalog with substring search.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One catalog record. Reference data, never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl CatalogEntry {
    fn matches_query(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// An ordered, static list of catalog entries.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The festival photo collection shown on the portfolio page.
    pub fn festival_photos() -> Self {
        let entry = |id: &str, year: &str, description: &str, image: &str, category: &str, price: Option<Decimal>| {
            CatalogEntry {
                id: id.into(),
                name: year.into(),
                description: description.into(),
                image_url: format!("https://skenergy-372636382.imgix.net/{image}"),
                category: category.into(),
                price,
            }
        };
        let price = Some(Decimal::new(8999, 2));

        Self::new(vec![
            entry("1", "Year 2024", "Year 2024", "IMG20220831125514.jpg", "Electronics", None),
            entry(
                "2",
                "Year 2024",
                "Year 2024",
                "IMG20220831125530.jpg",
                "Electronics",
                Some(Decimal::new(19999, 2)),
            ),
            entry("3", "Year 2024", "Moving to Year 100", "khatavbannerimg.jpg", "Accessories", price),
            entry(
                "4",
                "Year 2020",
                "Year 2020",
                "20200822_122411_resized(3).jpg",
                "Accessories",
                price,
            ),
            entry("5", "Year 2021", "Year 2021", "IMG-20210911-WA0021_1.jpg", "Accessories", price),
            entry("6", "Year 2023", "Year 2023", "IMG20230919140952.jpg", "Accessories", price),
        ])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose name or description contains `query`, ignoring case.
    ///
    /// Order is preserved and an empty query returns every entry.
    pub fn filter(&self, query: &str) -> Vec<&CatalogEntry> {
        filter_entries(&self.entries, query)
    }

    /// Applies the text query and, if given, an exact case-insensitive category match.
    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<&CatalogEntry> {
        self.filter(query)
            .into_iter()
            .filter(|entry| category.is_none_or(|c| entry.category.eq_ignore_ascii_case(c.trim())))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.category.as_str()) {
                seen.push(&entry.category);
            }
        }
        seen
    }
}

/// Substring filter over any slice of entries.
pub fn filter_entries<'a>(entries: &'a [CatalogEntry], query: &str) -> Vec<&'a CatalogEntry> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries.iter().filter(|e| e.matches_query(&needle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entries: &[&CatalogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let catalog = Catalog::festival_photos();
        assert_eq!(ids(&catalog.filter("")), vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn filter_is_case_insensitive_and_order_preserving() {
        let catalog = Catalog::festival_photos();
        assert_eq!(ids(&catalog.filter("year 2024")), vec!["1", "2", "3"]);
        assert_eq!(ids(&catalog.filter("MOVING")), vec!["3"]);
        assert!(catalog.filter("diwali").is_empty());
    }

    #[test]
    fn filter_is_idempotent() {
        let catalog = Catalog::festival_photos();
        for query in ["", "2024", "year", "moving", "zzz"] {
            let once: Vec<CatalogEntry> = catalog.filter(query).into_iter().cloned().collect();
            let twice = filter_entries(&once, query);
            assert_eq!(ids(&twice), once.iter().map(|e| e.id.clone()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn search_combines_query_and_category() {
        let catalog = Catalog::festival_photos();
        assert_eq!(ids(&catalog.search("2024", Some("accessories"))), vec!["3"]);
        assert_eq!(ids(&catalog.search("", Some("Electronics"))), vec!["1", "2"]);
        assert_eq!(catalog.search("", None).len(), 6);
    }

    #[test]
    fn get_by_id_and_categories() {
        let catalog = Catalog::festival_photos();
        assert_eq!(catalog.get("4").map(|e| e.name.as_str()), Some("Year 2020"));
        assert!(catalog.get("99").is_none());
        assert_eq!(catalog.categories(), vec!["Electronics", "Accessories"]);
    }

    #[test]
    fn price_is_optional() {
        let catalog = Catalog::festival_photos();
        assert_eq!(catalog.get("1").and_then(|e| e.price), None);
        assert_eq!(catalog.get("2").and_then(|e| e.price), Some(Decimal::new(19999, 2)));
    }
}
