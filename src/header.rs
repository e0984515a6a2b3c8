//! Header normalisation used for column matching.
//!
//! A normalised header is a comparison key only. It is never written back to a
//! file or used as a column name in SQL.

/// Lower-cases `header` and strips every character that is not alphanumeric.
///
/// `"Phone Number"`, `"phone_number"` and `"PhoneNumber"` all collapse to
/// `"phonenumber"`.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
