//! Recipient phone-number normalization.
//!
//! Callers hand in whatever the back office has on file — `"(88)
//! 99671-0011"`, `"+55 88 99671 0011"`, already-normalized digits — and the
//! transport gets one canonical form: digits only, country prefix first.

/// Strip every non-digit character; prepend `country_prefix` unless the
/// digits already start with it.  Idempotent.
pub fn normalize(raw: &str, country_prefix: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with(country_prefix) {
        digits
    } else {
        format!("{country_prefix}{digits}")
    }
}
