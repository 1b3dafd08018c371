//! State for the attendance-history screen: one filter, two request kinds.

use std::path::PathBuf;

use crate::api::ApiError;
use crate::history::{AttendanceRecord, HistoryFilter};
use crate::ops::OpState;

/// Screen state. Listing and export both read [`HistoryScreen::filter`], so
/// an exported spreadsheet always matches the records on display.
#[derive(Debug, Default)]
pub struct HistoryScreen {
    /// The user-edited filter, shared by listing and export.
    pub filter: HistoryFilter,
    /// The fetched records.
    pub records: OpState<Vec<AttendanceRecord>>,
    /// Destination of the last export, with bytes written.
    pub export: OpState<(PathBuf, u64)>,
}

impl HistoryScreen {
    /// Begin a listing fetch.
    pub fn begin_fetch(&mut self) {
        self.records.start();
    }

    /// Resolve a listing fetch.
    pub fn finish_fetch(&mut self, result: Result<Vec<AttendanceRecord>, ApiError>) {
        match result {
            Ok(records) => self.records.resolve(records),
            Err(err) => self.records.fail(err.user_message()),
        }
    }

    /// Begin an export.
    pub fn begin_export(&mut self) {
        self.export.start();
    }

    /// Resolve an export with its destination and size.
    pub fn finish_export(&mut self, dest: PathBuf, result: Result<u64, ApiError>) {
        match result {
            Ok(written) => self.export.resolve((dest, written)),
            Err(err) => self.export.fail(err.user_message()),
        }
    }

    /// The query pairs a listing request would send right now.
    pub fn listing_query(&self) -> Vec<(&'static str, &str)> {
        self.filter.query_pairs()
    }

    /// The query pairs an export request would send right now. Identical to
    /// [`HistoryScreen::listing_query`] by construction.
    pub fn export_query(&self) -> Vec<(&'static str, &str)> {
        self.filter.query_pairs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_and_export_share_one_query_representation() {
        let mut screen = HistoryScreen::default();
        screen.filter.subject_code = "CS101".to_string();
        screen.filter.date_to = "2024-01-01".to_string();
        assert_eq!(screen.listing_query(), screen.export_query());
        assert_eq!(
            screen.listing_query(),
            vec![("subject", "CS101"), ("date_to", "2024-01-01")]
        );
    }

    #[test]
    fn fetch_and_export_are_independent_operations() {
        let mut screen = HistoryScreen::default();
        screen.begin_fetch();
        screen.begin_export();
        screen.finish_fetch(Ok(Vec::new()));
        assert!(screen.export.is_pending());
        assert!(screen.records.value().is_some());

        screen.finish_export(
            PathBuf::from("attendance.xlsx"),
            Err(ApiError::Transport("refused".to_string())),
        );
        assert_eq!(screen.export.error(), Some("Network error"));
        // The listing result survives the failed export.
        assert!(screen.records.value().is_some());
    }
}
