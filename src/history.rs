//! History filters and the query representation shared by listing and export.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Query parameter carrying the subject code.
pub const SUBJECT_PARAM: &str = "subject";
/// Query parameter carrying the inclusive start date.
pub const DATE_FROM_PARAM: &str = "date_from";
/// Query parameter carrying the inclusive end date.
pub const DATE_TO_PARAM: &str = "date_to";

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("literal regex"));

/// User-edited history filter. An empty field leaves that axis unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Subject code, e.g. `CS101`; empty for all subjects.
    pub subject_code: String,
    /// Inclusive `YYYY-MM-DD` start date; empty for no lower bound.
    pub date_from: String,
    /// Inclusive `YYYY-MM-DD` end date; empty for no upper bound.
    pub date_to: String,
}

/// A filter field that does not parse as a date.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date {value:?} for {field}; expected YYYY-MM-DD")]
pub struct FilterError {
    /// Offending parameter name.
    pub field: &'static str,
    /// Raw value entered.
    pub value: String,
}

impl HistoryFilter {
    /// Check that any non-empty date fields have the `YYYY-MM-DD` shape.
    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, value) in [
            (DATE_FROM_PARAM, &self.date_from),
            (DATE_TO_PARAM, &self.date_to),
        ] {
            if !value.is_empty() && !ISO_DATE.is_match(value) {
                return Err(FilterError {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// The ordered non-empty key/value pairs this filter serializes to.
    ///
    /// Empty fields are omitted entirely, never sent as empty strings. The
    /// SAME pairs feed both the listing request and the export request, so an
    /// exported spreadsheet always matches what is displayed.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(3);
        for (name, value) in [
            (SUBJECT_PARAM, &self.subject_code),
            (DATE_FROM_PARAM, &self.date_from),
            (DATE_TO_PARAM, &self.date_to),
        ] {
            if !value.is_empty() {
                pairs.push((name, value.as_str()));
            }
        }
        pairs
    }
}

/// One attendance record from the history listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AttendanceRecord {
    /// Class date, `YYYY-MM-DD`.
    pub date: String,
    /// Subject display name.
    pub subject: String,
    /// Subject code.
    pub subject_code: String,
    /// Student display name.
    pub student_name: String,
    /// Student roll number.
    pub roll_number: String,
    /// Marks awarded for the class.
    pub marks: i64,
    /// `present` or `absent`.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted_entirely() {
        let filter = HistoryFilter {
            subject_code: "CS101".to_string(),
            date_from: String::new(),
            date_to: "2024-01-01".to_string(),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("subject", "CS101"), ("date_to", "2024-01-01")]
        );
    }

    #[test]
    fn unconstrained_filter_serializes_to_zero_pairs() {
        assert!(HistoryFilter::default().query_pairs().is_empty());
    }

    #[test]
    fn pair_order_is_stable() {
        let filter = HistoryFilter {
            subject_code: "CS101".to_string(),
            date_from: "2024-01-01".to_string(),
            date_to: "2024-02-01".to_string(),
        };
        let names: Vec<_> = filter.query_pairs().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["subject", "date_from", "date_to"]);
    }

    #[test]
    fn validate_accepts_empty_and_well_formed_dates() {
        assert!(HistoryFilter::default().validate().is_ok());
        let filter = HistoryFilter {
            subject_code: String::new(),
            date_from: "2024-01-01".to_string(),
            date_to: "2024-12-31".to_string(),
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_dates() {
        let filter = HistoryFilter {
            subject_code: String::new(),
            date_from: "01/02/2024".to_string(),
            date_to: String::new(),
        };
        let err = filter.validate().unwrap_err();
        assert_eq!(err.field, "date_from");
        assert_eq!(err.value, "01/02/2024");
    }

    #[test]
    fn record_wire_shape_deserializes() {
        let raw = r#"{
            "date": "2024-01-15",
            "subject": "Data Structures",
            "subject_code": "CS101",
            "student_name": "Jane Doe",
            "roll_number": "R01",
            "marks": 1,
            "status": "present"
        }"#;
        let record: AttendanceRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.subject_code, "CS101");
        assert_eq!(record.marks, 1);
        assert_eq!(record.status, "present");
    }
}
