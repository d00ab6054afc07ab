//! Field validation shared by every create/update handler.
//!
//! Rules mirror what the dashboard forms enforce client-side: required names,
//! 7-15 digit phone numbers, `local@domain.tld` emails. Dashboard forms send
//! `""` for untouched optional inputs, so blank strings normalize to `None`.

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub const PHONE_MIN_DIGITS: usize = 7;
pub const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{0} must be 7-15 digits")]
    Phone(&'static str),
    #[error("{0} is not a valid email address")]
    Email(&'static str),
    #[error("{0} must be a positive number")]
    Number(&'static str),
    #[error("{0} must be a date in YYYY-MM-DD format")]
    Date(&'static str),
    #[error("{0} must be an RFC 3339 timestamp")]
    Timestamp(&'static str),
    #[error("{end} cannot be before {start}")]
    Range { start: &'static str, end: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be one of: {allowed}")]
    Choice { field: &'static str, allowed: String },
    #[error("{0}")]
    Rule(String),
}

impl crate::error::ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }

    fn status(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::BAD_REQUEST
    }
}

pub type Validated<T> = Result<T, ValidationError>;

/// A form value that may arrive as a JSON number or as the text of an input box.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Trim and require a non-empty value.
pub fn required(field: &'static str, value: &str) -> Validated<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_owned())
}

/// Trim an optional value; blank becomes `None`.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Phone numbers are bare digits, 7-15 of them.
pub fn phone(field: &'static str, value: &str) -> Validated<String> {
    let trimmed = value.trim();
    let valid = (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&trimmed.len())
        && trimmed.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(ValidationError::Phone(field));
    }
    Ok(trimmed.to_owned())
}

pub fn optional_phone(field: &'static str, value: Option<String>) -> Validated<Option<String>> {
    optional_text(value).map(|v| phone(field, &v)).transpose()
}

/// Normalize to trimmed lowercase and check the `local@domain.tld` shape.
pub fn email(field: &'static str, value: &str) -> Validated<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if normalized.chars().any(char::is_whitespace) {
        return Err(ValidationError::Email(field));
    }
    let Some((local, domain)) = normalized.split_once('@') else {
        return Err(ValidationError::Email(field));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::Email(field));
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(ValidationError::Email(field));
    }
    Ok(normalized)
}

pub fn optional_email(field: &'static str, value: Option<String>) -> Validated<Option<String>> {
    optional_text(value).map(|v| email(field, &v)).transpose()
}

/// Height/weight style measurement: blank is absent, otherwise a positive finite number.
pub fn measurement(field: &'static str, value: Option<NumberOrText>) -> Validated<Option<f64>> {
    let number = match value {
        None => return Ok(None),
        Some(NumberOrText::Number(n)) => n,
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| ValidationError::Number(field))?
        }
    };
    if !number.is_finite() || number <= 0.0 {
        return Err(ValidationError::Number(field));
    }
    Ok(Some(number))
}

/// Parse a `YYYY-MM-DD` date.
pub fn date(field: &'static str, value: &str) -> Validated<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), &format).map_err(|_| ValidationError::Date(field))
}

pub fn optional_date(field: &'static str, value: Option<String>) -> Validated<Option<Date>> {
    optional_text(value).map(|v| date(field, &v)).transpose()
}

/// Parse an RFC 3339 timestamp. A `datetime-local` form value without an
/// offset (`2025-03-10T09:30`, seconds optional) is read as UTC.
pub fn timestamp(field: &'static str, value: &str) -> Validated<OffsetDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(trimmed, &with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, &without_seconds))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| ValidationError::Timestamp(field))
}

pub fn optional_timestamp(field: &'static str, value: Option<String>) -> Validated<Option<OffsetDateTime>> {
    optional_text(value).map(|v| timestamp(field, &v)).transpose()
}

/// `end` may equal `start` but not precede it. Absent bounds are unconstrained.
pub fn date_range(
    start_field: &'static str,
    start: Option<Date>,
    end_field: &'static str,
    end: Option<Date>,
) -> Validated<()> {
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(ValidationError::Range { start: start_field, end: end_field });
    }
    Ok(())
}

/// Character-count ceiling.
pub fn max_len(field: &'static str, value: Option<&str>, max: usize) -> Validated<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

/// Trim, drop blanks, and dedupe while keeping first-seen order.
#[must_use]
pub fn languages(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() || out.iter().any(|seen| seen.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        out.push(trimmed.to_owned());
    }
    out
}

/// Closed set of values stored in a TEXT column.
///
/// Generates the enum, its wire spelling (`as_str`), and `parse`, which
/// rejects anything outside the set with a `Choice` error naming the field.
macro_rules! text_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parse the wire spelling, ignoring surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns `ValidationError::Choice` for values outside the set.
            pub fn parse(field: &'static str, raw: &str) -> $crate::validate::Validated<Self> {
                match raw.trim() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::validate::ValidationError::Choice {
                        field,
                        allowed: [$($text),+].join(", "),
                    }),
                }
            }

            /// Parse an optional value; blank is absent.
            ///
            /// # Errors
            ///
            /// Returns `ValidationError::Choice` for values outside the set.
            pub fn parse_optional(field: &'static str, raw: Option<&str>) -> $crate::validate::Validated<Option<Self>> {
                match raw.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(value) => Self::parse(field, value).map(Some),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
