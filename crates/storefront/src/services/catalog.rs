//! Catalog queries answered locally over the cached product list.
//!
//! The backend has no filtering or sorting endpoints, so category filters,
//! price sorting, search and related products are computed here.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::backend::Product;

/// Number of related products shown on a product page.
pub const RELATED_LIMIT: usize = 4;

/// Price ordering offered on the product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PriceSort {
    /// Backend order.
    #[default]
    #[serde(rename = "", alias = "default")]
    None,
    #[serde(rename = "lowToHigh")]
    LowToHigh,
    #[serde(rename = "highToLow")]
    HighToLow,
}

impl PriceSort {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::LowToHigh => "lowToHigh",
            Self::HighToLow => "highToLow",
        }
    }
}

/// Distinct non-empty categories, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|product| product.category.trim())
        .filter(|category| !category.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Filter by exact category (when given) and sort by price.
///
/// Sorting is stable, so products with equal prices keep backend order.
#[must_use]
pub fn filter_and_sort(products: &[Product], category: Option<&str>, sort: PriceSort) -> Vec<Product> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let mut selected: Vec<Product> = products
        .iter()
        .filter(|product| category.is_none_or(|c| product.category == c))
        .cloned()
        .collect();

    match sort {
        PriceSort::None => {}
        PriceSort::LowToHigh => selected.sort_by(|a, b| a.price.cmp(&b.price)),
        PriceSort::HighToLow => selected.sort_by(|a, b| b.price.cmp(&a.price)),
    }
    selected
}

/// Products whose name contains `query`, case-insensitively.
///
/// A blank query matches nothing.
#[must_use]
pub fn search(products: &[Product], query: &str) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    products
        .iter()
        .filter(|product| product.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Up to [`RELATED_LIMIT`] other products in the same category.
#[must_use]
pub fn related(products: &[Product], product: &Product) -> Vec<Product> {
    products
        .iter()
        .filter(|other| other.category == product.category && other.id != product.id)
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

/// Products that can be bought right now.
#[must_use]
pub fn in_stock(products: &[Product]) -> Vec<Product> {
    products.iter().filter(|p| p.in_stock).cloned().collect()
}

/// Admin product search: name or category substring, case-insensitive.
#[must_use]
pub fn admin_search(products: &[Product], query: &str) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    products
        .iter()
        .filter(|product| {
            needle.is_empty()
                || product.name.to_lowercase().contains(&needle)
                || product.category.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use suraj_core::ProductId;

    use super::*;

    fn product(id: &str, name: &str, price: i64, category: &str, in_stock: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::from(price),
            description: String::new(),
            image: String::new(),
            in_stock,
            category: category.to_string(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("p1", "32 inch Smart TV", 12_000, "TV", true),
            product("p2", "TV Remote", 250, "Accessories", true),
            product("p3", "43 inch 4K TV", 24_000, "TV", false),
            product("p4", "Soundbar", 6_000, "Audio", true),
            product("p5", "24 inch HD TV", 8_000, "TV", true),
            product("p6", "Wall Mount", 250, "Accessories", true),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_categories_sorted_and_distinct() {
        assert_eq!(categories(&catalog()), vec!["Accessories", "Audio", "TV"]);
    }

    #[test]
    fn test_filter_by_category() {
        let tvs = filter_and_sort(&catalog(), Some("TV"), PriceSort::None);
        assert_eq!(ids(&tvs), vec!["p1", "p3", "p5"]);

        let all = filter_and_sort(&catalog(), Some("  "), PriceSort::None);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_sort_is_stable() {
        let sorted = filter_and_sort(&catalog(), None, PriceSort::LowToHigh);
        assert_eq!(ids(&sorted), vec!["p2", "p6", "p4", "p5", "p1", "p3"]);

        let sorted = filter_and_sort(&catalog(), None, PriceSort::HighToLow);
        assert_eq!(ids(&sorted), vec!["p3", "p1", "p5", "p4", "p2", "p6"]);
    }

    #[test]
    fn test_search_case_insensitive() {
        assert_eq!(ids(&search(&catalog(), "tv")), vec!["p1", "p2", "p3", "p5"]);
        assert!(search(&catalog(), "   ").is_empty());
    }

    #[test]
    fn test_related_excludes_self_and_caps() {
        let products = catalog();
        let related = related(&products, &products[0]);
        assert_eq!(ids(&related), vec!["p3", "p5"]);
    }

    #[test]
    fn test_in_stock() {
        assert!(!ids(&in_stock(&catalog())).contains(&"p3"));
    }

    #[test]
    fn test_admin_search_matches_category() {
        assert_eq!(ids(&admin_search(&catalog(), "audio")), vec!["p4"]);
        assert_eq!(admin_search(&catalog(), "").len(), 6);
    }

    #[test]
    fn test_price_sort_from_query() {
        #[derive(Deserialize)]
        struct Q {
            #[serde(default)]
            sort: PriceSort,
        }
        let q: Q = serde_json::from_str(r#"{"sort":"highToLow"}"#).unwrap();
        assert_eq!(q.sort, PriceSort::HighToLow);
        let q: Q = serde_json::from_str(r#"{"sort":""}"#).unwrap();
        assert_eq!(q.sort, PriceSort::None);
    }
}
