//! Admin order list filtering and sorting.
//!
//! `GET /orders` returns every order; the admin list narrows and orders it
//! locally from the query string.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use suraj_core::OrderStatus;

use crate::backend::Order;

// =============================================================================
// Query Parameters
// =============================================================================

/// Query parameters for the admin orders list.
///
/// Every field arrives as raw form text; blank or unparseable values are
/// treated as "no filter" so a half-filled form never errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersQuery {
    /// Free-text search over order id, customer email and item names.
    pub search: Option<String>,
    /// Created on or after (YYYY-MM-DD).
    pub from: Option<String>,
    /// Created on or before (YYYY-MM-DD).
    pub to: Option<String>,
    /// Minimum total price.
    pub min_price: Option<String>,
    /// Maximum total price.
    pub max_price: Option<String>,
    /// `all` or an order status.
    pub status: Option<String>,
    /// Sort key, see [`OrderSort`].
    pub sort: Option<String>,
}

/// Sort order for the admin orders list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    DateDesc,
    DateAsc,
    PriceDesc,
    PriceAsc,
    NameAsc,
    NameDesc,
}

impl OrderSort {
    pub const ALL: [Self; 6] = [
        Self::DateDesc,
        Self::DateAsc,
        Self::PriceDesc,
        Self::PriceAsc,
        Self::NameAsc,
        Self::NameDesc,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::PriceDesc => "price-desc",
            Self::PriceAsc => "price-asc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DateDesc => "Newest first",
            Self::DateAsc => "Oldest first",
            Self::PriceDesc => "Price: high to low",
            Self::PriceAsc => "Price: low to high",
            Self::NameAsc => "Customer: A to Z",
            Self::NameDesc => "Customer: Z to A",
        }
    }
}

impl FromStr for OrderSort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or(())
    }
}

// =============================================================================
// Parsed Filter
// =============================================================================

/// Parsed, validated form of [`OrdersQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// `None` means all statuses.
    pub status: Option<OrderStatus>,
    pub sort: OrderSort,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl From<&OrdersQuery> for OrderFilter {
    fn from(query: &OrdersQuery) -> Self {
        let date = |value: Option<&String>| {
            non_blank(value).and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        };
        let price = |value: Option<&String>| non_blank(value).and_then(|v| v.parse().ok());

        Self {
            search: non_blank(query.search.as_ref()).map(str::to_lowercase),
            from: date(query.from.as_ref()),
            to: date(query.to.as_ref()),
            min_price: price(query.min_price.as_ref()),
            max_price: price(query.max_price.as_ref()),
            status: non_blank(query.status.as_ref())
                .filter(|s| *s != "all")
                .and_then(|s| s.parse().ok()),
            sort: non_blank(query.sort.as_ref())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

impl OrderFilter {
    /// Whether any narrowing filter is active (sorting does not count).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.search.is_some()
            || self.from.is_some()
            || self.to.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.status.is_some()
    }

    /// Whether `order` passes every active filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.matches_search(order)
            && self.matches_dates(order)
            && self.matches_price(order)
            && self.status.is_none_or(|status| order.known_status() == Some(status))
    }

    fn matches_search(&self, order: &Order) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };
        order.id.as_str().to_lowercase().contains(needle)
            || order
                .customer_email()
                .is_some_and(|email| email.to_lowercase().contains(needle))
            || order
                .order_items
                .iter()
                .any(|item| item.product_name().to_lowercase().contains(needle))
    }

    fn matches_dates(&self, order: &Order) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        // Undated orders cannot satisfy a date range.
        let Some(created) = order.created_on() else {
            return false;
        };
        self.from.is_none_or(|from| created >= from) && self.to.is_none_or(|to| created <= to)
    }

    fn matches_price(&self, order: &Order) -> bool {
        self.min_price.is_none_or(|min| order.total_price >= min)
            && self.max_price.is_none_or(|max| order.total_price <= max)
    }

    /// Filter and sort `orders`.
    #[must_use]
    pub fn apply(&self, orders: Vec<Order>) -> Vec<Order> {
        let mut selected: Vec<Order> = orders.into_iter().filter(|o| self.matches(o)).collect();
        selected.sort_by(|a, b| self.compare(a, b));
        selected
    }

    fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let email = |order: &Order| order.customer_email().unwrap_or_default().to_lowercase();
        match self.sort {
            OrderSort::DateDesc => b.created_at.cmp(&a.created_at),
            OrderSort::DateAsc => a.created_at.cmp(&b.created_at),
            OrderSort::PriceDesc => b.total_price.cmp(&a.total_price),
            OrderSort::PriceAsc => a.total_price.cmp(&b.total_price),
            OrderSort::NameAsc => email(a).cmp(&email(b)),
            OrderSort::NameDesc => email(b).cmp(&email(a)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(id: &str, email: &str, item: &str, total: i64, created: &str, status: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "user": { "_id": "u-".to_string() + id, "email": email },
            "orderItems": [{ "name": item, "image": "", "price": total, "quantity": 1 }],
            "shippingAddress": { "area": "MG Road", "city": "Pune", "state": "Maharashtra", "pincode": "411001" },
            "totalPrice": total,
            "status": status,
            "paymentMethod": "cod",
            "createdAt": created,
        }))
        .unwrap()
    }

    fn orders() -> Vec<Order> {
        vec![
            order("aaa111", "ravi@example.com", "32 inch Smart TV", 12_000, "2026-10-01T10:00:00Z", "processing"),
            order("bbb222", "anita@example.com", "TV Remote", 250, "2026-10-05T23:59:00Z", "delivered"),
            order("ccc333", "zoya@example.com", "Soundbar", 6_000, "2026-10-10T08:00:00Z", "shipped"),
        ]
    }

    fn query(pairs: &[(&str, &str)]) -> OrderFilter {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
            .collect();
        let query: OrdersQuery = serde_json::from_value(map.into()).unwrap();
        OrderFilter::from(&query)
    }

    fn ids(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_default_is_newest_first() {
        let filter = query(&[]);
        assert!(!filter.is_active());
        assert_eq!(ids(&filter.apply(orders())), vec!["ccc333", "bbb222", "aaa111"]);
    }

    #[test]
    fn test_search_matches_id_email_and_item() {
        assert_eq!(ids(&query(&[("search", "BBB")]).apply(orders())), vec!["bbb222"]);
        assert_eq!(ids(&query(&[("search", "zoya@")]).apply(orders())), vec!["ccc333"]);
        assert_eq!(ids(&query(&[("search", "smart tv")]).apply(orders())), vec!["aaa111"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = query(&[("from", "2026-10-05"), ("to", "2026-10-10")]);
        assert_eq!(ids(&filter.apply(orders())), vec!["ccc333", "bbb222"]);
    }

    #[test]
    fn test_date_range_uses_store_local_day() {
        // 20:00 UTC on the 11th is 01:30 on the 12th in the shop's timezone.
        let late = order("ddd444", "ravi@example.com", "Remote", 300, "2026-10-11T20:00:00Z", "processing");
        assert_eq!(late.created_label(), "12 October 2026, 01:30 AM");

        let filter = query(&[("from", "2026-10-12"), ("to", "2026-10-12")]);
        assert_eq!(ids(&filter.apply(vec![late.clone()])), vec!["ddd444"]);
        let filter = query(&[("to", "2026-10-11")]);
        assert!(filter.apply(vec![late]).is_empty());
    }

    #[test]
    fn test_price_range_and_status() {
        let filter = query(&[("min_price", "250"), ("max_price", "6000"), ("sort", "price-asc")]);
        assert_eq!(ids(&filter.apply(orders())), vec!["bbb222", "ccc333"]);

        let filter = query(&[("status", "processing")]);
        assert_eq!(ids(&filter.apply(orders())), vec!["aaa111"]);

        let filter = query(&[("status", "all")]);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_sort_by_customer_email() {
        let filter = query(&[("sort", "name-asc")]);
        assert_eq!(ids(&filter.apply(orders())), vec!["bbb222", "aaa111", "ccc333"]);
        let filter = query(&[("sort", "name-desc")]);
        assert_eq!(ids(&filter.apply(orders())), vec!["ccc333", "aaa111", "bbb222"]);
    }

    #[test]
    fn test_garbage_values_are_ignored() {
        let filter = query(&[("from", "yesterday"), ("min_price", "abc"), ("sort", "bogus")]);
        assert_eq!(filter, OrderFilter::default());
    }
}
