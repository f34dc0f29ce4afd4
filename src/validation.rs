//! Field-level validation primitives shared by the category and expense
//! entities.
//!
//! Validation results map field names to lists of human-readable messages so
//! the embedding UI can re-render a form with per-field errors. Each field is
//! checked independently; within a field only the first failing rule is
//! reported.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;
use time::{Date, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;

/// A mapping from field name to the list of validation messages for that
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    /// Create an empty set of validation errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set of validation errors with a single message on a single field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a validation message for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Whether no field has a validation message.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The validation messages recorded for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Iterate over `(field, messages)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        self.0.iter().map(|(field, messages)| (*field, messages.as_slice()))
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }

        Ok(())
    }
}

/// Count the user-perceived characters in `text`.
///
/// Length limits are defined in terms of what a person would count as a
/// character, so grapheme clusters are counted rather than bytes or code
/// points.
pub fn char_count(text: &str) -> usize {
    text.graphemes(true).count()
}

/// The current date in UTC.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// The date `years` whole years away from `date`.
///
/// February 29 maps to February 28 when the target year is not a leap year.
pub fn shift_years(date: Date, years: i32) -> Date {
    let year = date.year() + years;

    Date::from_calendar_date(year, date.month(), date.day()).unwrap_or_else(|_| {
        Date::from_calendar_date(year, date.month(), 28).expect("day 28 exists in every month")
    })
}

#[cfg(test)]
mod validation_tests {
    use time::macros::date;

    use super::{ValidationErrors, char_count, shift_years};

    #[test]
    fn add_groups_messages_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "can't be blank");
        errors.add("amount", "must be greater than 0");
        errors.add("amount", "must have at most 2 decimal places");

        assert_eq!(errors.field("name"), Some(&["can't be blank".to_string()][..]));
        assert_eq!(errors.field("amount").map(<[String]>::len), Some(2));
        assert_eq!(errors.field("date"), None);
    }

    #[test]
    fn display_lists_fields_in_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "can't be blank");
        errors.add("amount", "must be greater than 0");

        assert_eq!(
            errors.to_string(),
            "amount must be greater than 0; name can't be blank"
        );
    }

    #[test]
    fn char_count_counts_graphemes() {
        assert_eq!(char_count("abc"), 3);
        assert_eq!(char_count("café"), 4);
        assert_eq!(char_count(""), 0);
    }

    #[test]
    fn shift_years_handles_leap_days() {
        assert_eq!(shift_years(date!(2024 - 02 - 29), 1), date!(2025 - 02 - 28));
        assert_eq!(shift_years(date!(2020 - 06 - 15), -10), date!(2010 - 06 - 15));
    }
}
