//! Status enums for orders and complaints.
//!
//! Wire values follow the backend exactly: order statuses are lowercase,
//! complaint statuses are capitalized.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Received,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Received,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Capitalized label for badges.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Label for an order whose status may be missing.
    #[must_use]
    pub fn label_or_pending(status: Option<Self>) -> &'static str {
        status.map_or("Pending", |s| s.label())
    }

    /// Customers may only cancel an order the shop is still processing.
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Complaint (service ticket) status managed by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ComplaintStatus {
    #[default]
    Pending,
    Processing,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    /// Every status, in the order shown in the admin dropdown.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Resolved,
        Self::Rejected,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid complaint status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_order_status_labels() {
        assert_eq!(OrderStatus::label_or_pending(None), "Pending");
        assert_eq!(
            OrderStatus::label_or_pending(Some(OrderStatus::Shipped)),
            "Shipped"
        );
    }

    #[test]
    fn test_only_processing_is_cancellable() {
        let cancellable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_cancellable)
            .collect();
        assert_eq!(cancellable, vec![OrderStatus::Processing]);
    }

    #[test]
    fn test_complaint_status_round_trip() {
        for status in ComplaintStatus::ALL {
            assert_eq!(status.as_str().parse::<ComplaintStatus>().unwrap(), status);
        }
        assert!("resolved".parse::<ComplaintStatus>().is_err());
    }
}
