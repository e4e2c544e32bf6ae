//! Payment method chosen at checkout.

use serde::{Deserialize, Serialize};

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Hosted Razorpay checkout.
    Razorpay,
}

impl PaymentMethod {
    /// Wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Razorpay => "razorpay",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::Razorpay => "Pay Online (Razorpay)",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "razorpay" => Ok(Self::Razorpay),
            other => Err(format!("invalid payment method: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"cod\"");
        assert_eq!("razorpay".parse::<PaymentMethod>().unwrap(), PaymentMethod::Razorpay);
        assert!("card".parse::<PaymentMethod>().is_err());
    }
}
