//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Keeps only the digits of a phone number, for `tel:` and WhatsApp links.
///
/// Usage in templates: `<a href="https://wa.me/{{ phone|digits }}">`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn digits(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(only_digits(&value.to_string()))
}

fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_digits() {
        assert_eq!(only_digits("+91 98765-43210"), "919876543210");
        assert_eq!(only_digits("n/a"), "");
    }
}
