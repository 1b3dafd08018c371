//! Event-driven state containers for the client's screens.
//!
//! Screens own one `OpState` per independent network operation and mutate
//! state only in response to discrete triggers, so they are testable without
//! a UI or a live backend: callers feed `finish_*` the `Result` of the
//! corresponding API call.

/// Attendance history listing and export.
pub mod history;
/// Photo upload and presence table.
pub mod mark_attendance;
