//! Shipping address captured at checkout and stored on the user profile.

use serde::{Deserialize, Serialize};

/// States and union territories offered in address forms.
pub const INDIAN_STATES: [&str; 36] = [
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Andaman and Nicobar Islands",
    "Chandigarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
    "Lakshadweep",
    "Puducherry",
];

/// Reasons a shipping address is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The pincode is not six digits.
    #[error("pincode must be 6 digits")]
    InvalidPincode,
}

/// A delivery address. Field names match the backend's camelCase records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub area: String,
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub instructions: String,
}

impl ShippingAddress {
    /// Whether this address is complete enough to offer as the saved option.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.area.trim().is_empty()
    }

    /// Trim every field in place.
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            area: self.area.trim().to_owned(),
            landmark: self.landmark.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            pincode: self.pincode.trim().to_owned(),
            instructions: self.instructions.trim().to_owned(),
        }
    }

    /// Check the fields required for delivery.
    ///
    /// # Errors
    ///
    /// Returns the first missing field, or [`AddressError::InvalidPincode`].
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("area", &self.area),
            ("city", &self.city),
            ("state", &self.state),
            ("pincode", &self.pincode),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }

        let pincode = self.pincode.trim();
        if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidPincode);
        }
        Ok(())
    }

    /// One-line rendering used in order summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = [&self.area, &self.landmark, &self.city, &self.state]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let pincode = self.pincode.trim();
        if !pincode.is_empty() {
            line.push_str(" - ");
            line.push_str(pincode);
        }
        line
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ShippingAddress {
        ShippingAddress {
            area: "12 MG Road".to_owned(),
            landmark: "Near City Mall".to_owned(),
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            pincode: "411001".to_owned(),
            instructions: String::new(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn test_validate_missing_and_pincode() {
        let mut addr = sample();
        addr.city = "  ".to_owned();
        assert_eq!(addr.validate(), Err(AddressError::MissingField("city")));

        let mut addr = sample();
        addr.pincode = "41100".to_owned();
        assert_eq!(addr.validate(), Err(AddressError::InvalidPincode));
        addr.pincode = "41100a".to_owned();
        assert_eq!(addr.validate(), Err(AddressError::InvalidPincode));
    }

    #[test]
    fn test_is_usable() {
        assert!(sample().is_usable());
        assert!(!ShippingAddress::default().is_usable());
    }

    #[test]
    fn test_deserialize_partial_record() {
        let addr: ShippingAddress = serde_json::from_str(r#"{"area":"X","city":"Y"}"#).unwrap();
        assert_eq!(addr.area, "X");
        assert!(addr.pincode.is_empty());
    }

    #[test]
    fn test_one_line() {
        assert_eq!(
            sample().one_line(),
            "12 MG Road, Near City Mall, Pune, Maharashtra - 411001"
        );
    }

    #[test]
    fn test_states_unique() {
        let mut states = INDIAN_STATES.to_vec();
        states.sort_unstable();
        states.dedup();
        assert_eq!(states.len(), INDIAN_STATES.len());
    }
}
