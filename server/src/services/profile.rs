//! Demographic and contact fields shared by patients and caregivers.

use time::Date;

/// Validated profile for a new patient or caregiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub languages: Vec<String>,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub languages: Option<Vec<String>>,
}

/// Name shown in lists: first, middle, and last joined by single spaces.
#[must_use]
pub fn display_name(first: &str, middle: Option<&str>, last: &str) -> String {
    [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// SQL twin of `display_name`, for list queries that sort or return names.
pub(crate) fn display_name_sql(alias: &str) -> String {
    format!("concat_ws(' ', {alias}.first_name, {alias}.middle_name, {alias}.last_name)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_skips_missing_middle() {
        assert_eq!(display_name("Mary", None, "Smith"), "Mary Smith");
        assert_eq!(display_name("Mary", Some(" "), "Smith"), "Mary Smith");
        assert_eq!(display_name("Mary", Some("Ann"), "Smith"), "Mary Ann Smith");
    }

    #[test]
    fn display_name_sql_uses_alias() {
        assert_eq!(display_name_sql("p"), "concat_ws(' ', p.first_name, p.middle_name, p.last_name)");
    }
}
