use super::*;
use time::macros::date;

#[test]
fn required_trims_and_rejects_blank() {
    assert_eq!(required("first_name", "  Mary ").unwrap(), "Mary");
    assert_eq!(required("first_name", "   "), Err(ValidationError::Required("first_name")));
}

#[test]
fn optional_text_blank_is_none() {
    assert_eq!(optional_text(Some("  ".into())), None);
    assert_eq!(optional_text(Some(" Chennai ".into())), Some("Chennai".into()));
    assert_eq!(optional_text(None), None);
}

#[test]
fn phone_accepts_seven_to_fifteen_digits() {
    assert_eq!(phone("phone", "1234567").unwrap(), "1234567");
    assert_eq!(phone("phone", " 123456789012345 ").unwrap(), "123456789012345");
}

#[test]
fn phone_rejects_short_long_and_formatted_numbers() {
    for bad in ["123456", "1234567890123456", "+911234567", "98-765-4321", "", "phone123"] {
        assert_eq!(phone("phone", bad), Err(ValidationError::Phone("phone")), "input {bad:?}");
    }
}

#[test]
fn optional_phone_skips_blank() {
    assert_eq!(optional_phone("phone", Some(String::new())).unwrap(), None);
    assert!(optional_phone("phone", Some("12".into())).is_err());
}

#[test]
fn email_normalizes_case_and_whitespace() {
    assert_eq!(email("email", "  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
}

#[test]
fn email_rejects_malformed_shapes() {
    for bad in ["jane", "jane@", "@example.com", "jane@example", "jane@@example.com", "ja ne@example.com", "jane@.com"] {
        assert_eq!(email("email", bad), Err(ValidationError::Email("email")), "input {bad:?}");
    }
}

#[test]
fn empty_email_is_required_but_optional_email_allows_blank() {
    assert_eq!(email("email", ""), Err(ValidationError::Required("email")));
    assert_eq!(optional_email("email", Some(String::new())).unwrap(), None);
    assert_eq!(optional_email("email", Some("A@B.io".into())).unwrap(), Some("a@b.io".into()));
}

#[test]
fn measurement_accepts_numbers_and_numeric_text() {
    assert_eq!(measurement("height", Some(NumberOrText::Number(162.5))).unwrap(), Some(162.5));
    assert_eq!(measurement("height", Some(NumberOrText::Text(" 70 ".into()))).unwrap(), Some(70.0));
    assert_eq!(measurement("height", Some(NumberOrText::Text(String::new()))).unwrap(), None);
    assert_eq!(measurement("height", None).unwrap(), None);
}

#[test]
fn measurement_rejects_non_positive_and_garbage() {
    assert_eq!(measurement("weight", Some(NumberOrText::Number(0.0))), Err(ValidationError::Number("weight")));
    assert_eq!(measurement("weight", Some(NumberOrText::Number(-3.0))), Err(ValidationError::Number("weight")));
    assert_eq!(measurement("weight", Some(NumberOrText::Text("heavy".into()))), Err(ValidationError::Number("weight")));
}

#[test]
fn number_or_text_deserializes_both_forms() {
    let n: NumberOrText = serde_json::from_str("12.5").unwrap();
    let t: NumberOrText = serde_json::from_str("\"12.5\"").unwrap();
    assert_eq!(n, NumberOrText::Number(12.5));
    assert_eq!(t, NumberOrText::Text("12.5".into()));
}

#[test]
fn date_parses_iso_format() {
    assert_eq!(date("dob", "1950-03-14").unwrap(), date!(1950 - 03 - 14));
    assert_eq!(date("dob", "14/03/1950"), Err(ValidationError::Date("dob")));
    assert_eq!(optional_date("dob", Some(String::new())).unwrap(), None);
}

#[test]
fn date_range_allows_equal_and_rejects_inverted() {
    let a = date!(2025 - 01 - 10);
    let b = date!(2025 - 01 - 12);
    assert!(date_range("start_date", Some(a), "end_date", Some(b)).is_ok());
    assert!(date_range("start_date", Some(a), "end_date", Some(a)).is_ok());
    assert!(date_range("start_date", None, "end_date", Some(a)).is_ok());
    assert_eq!(
        date_range("start_date", Some(b), "end_date", Some(a)),
        Err(ValidationError::Range { start: "start_date", end: "end_date" })
    );
}

#[test]
fn max_len_counts_characters_not_bytes() {
    assert!(max_len("title", Some("ééé"), 3).is_ok());
    assert_eq!(max_len("title", Some("abcd"), 3), Err(ValidationError::TooLong { field: "title", max: 3 }));
    assert!(max_len("title", None, 3).is_ok());
}

#[test]
fn languages_trims_and_dedupes_case_insensitively() {
    let out = languages(vec![" English".into(), "Hindi".into(), "english".into(), String::new(), "Tamil ".into()]);
    assert_eq!(out, vec!["English", "Hindi", "Tamil"]);
}

#[test]
fn range_error_message_names_both_fields() {
    let err = ValidationError::Range { start: "effective_from", end: "effective_to" };
    assert_eq!(err.to_string(), "effective_to cannot be before effective_from");
}

text_enum! {
    pub enum Shift {
        Day => "day",
        Night => "night",
    }
}

#[test]
fn text_enum_parses_wire_spelling() {
    assert_eq!(Shift::parse("shift", " night ").unwrap(), Shift::Night);
    assert_eq!(Shift::Day.as_str(), "day");
    assert_eq!(Shift::Night.to_string(), "night");
    assert_eq!(Shift::ALL.len(), 2);
}

#[test]
fn text_enum_rejects_unknown_values_with_the_allowed_set() {
    let err = Shift::parse("shift", "evening").unwrap_err();
    assert_eq!(err.to_string(), "shift must be one of: day, night");
}

#[test]
fn text_enum_optional_blank_is_none() {
    assert_eq!(Shift::parse_optional("shift", None).unwrap(), None);
    assert_eq!(Shift::parse_optional("shift", Some("  ")).unwrap(), None);
    assert_eq!(Shift::parse_optional("shift", Some("day")).unwrap(), Some(Shift::Day));
}

#[test]
fn text_enum_serializes_as_wire_spelling() {
    assert_eq!(serde_json::to_string(&Shift::Night).unwrap(), "\"night\"");
}

#[test]
fn timestamp_accepts_rfc3339_with_offset() {
    let parsed = timestamp("scheduled_start", "2025-03-10T09:30:00+05:30").unwrap();
    assert_eq!(parsed.offset().whole_hours(), 5);
    assert_eq!(parsed.hour(), 9);
}

#[test]
fn timestamp_reads_datetime_local_as_utc() {
    let parsed = timestamp("scheduled_start", "2025-03-10T09:30").unwrap();
    assert!(parsed.offset().is_utc());
    assert_eq!(parsed.minute(), 30);
    assert_eq!(timestamp("scheduled_start", "2025-03-10T09:30:15").unwrap().second(), 15);
}

#[test]
fn timestamp_rejects_garbage_and_blank() {
    assert_eq!(timestamp("scheduled_end", "tomorrow"), Err(ValidationError::Timestamp("scheduled_end")));
    assert_eq!(timestamp("scheduled_end", " "), Err(ValidationError::Required("scheduled_end")));
    assert_eq!(optional_timestamp("scheduled_end", Some(String::new())).unwrap(), None);
}
