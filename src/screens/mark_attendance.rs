//! State for the mark-attendance screen: roster, detections, verdicts.

use crate::api::{ApiError, AttendanceSubmission, MarkResponse, Subject};
use crate::ops::OpState;
use crate::reconcile::{self, DetectionResult, PresenceVerdict, Roster};

/// Screen state. Verdicts are recomputed whenever the roster or the
/// detection list changes; they are never a source of truth.
#[derive(Debug, Default)]
pub struct MarkAttendanceScreen {
    /// Subjects available to the teacher.
    pub subjects: OpState<Vec<Subject>>,
    /// Chosen date, subject, and marks for the next mark upload.
    pub submission: AttendanceSubmission,
    /// Enrolled roster, fetched per screen visit.
    pub roster: OpState<Roster>,
    /// Detections from the most recent upload.
    pub detections: OpState<Vec<DetectionResult>>,
    /// Status line from the last mark request.
    pub status_message: Option<String>,
    verdicts: Vec<PresenceVerdict>,
}

impl MarkAttendanceScreen {
    /// Begin the subjects fetch.
    pub fn begin_subjects_fetch(&mut self) {
        self.subjects.start();
    }

    /// Resolve the subjects fetch.
    pub fn finish_subjects_fetch(&mut self, result: Result<Vec<Subject>, ApiError>) {
        match result {
            Ok(subjects) => self.subjects.resolve(subjects),
            Err(err) => self.subjects.fail(err.user_message()),
        }
    }

    /// Begin the roster fetch.
    pub fn begin_roster_fetch(&mut self) {
        self.roster.start();
    }

    /// Resolve the roster fetch and refresh verdicts.
    pub fn finish_roster_fetch(&mut self, result: Result<Roster, ApiError>) {
        match result {
            Ok(roster) => self.roster.resolve(roster),
            Err(err) => self.roster.fail(err.user_message()),
        }
        self.recompute();
    }

    /// Begin an upload; clears the previous status line and detections view.
    pub fn begin_upload(&mut self) {
        self.detections.start();
        self.status_message = None;
        self.recompute();
    }

    /// Resolve a detect-only upload and refresh verdicts.
    pub fn finish_detect(&mut self, result: Result<Vec<DetectionResult>, ApiError>) {
        match result {
            Ok(detections) => self.detections.resolve(detections),
            Err(err) => self.detections.fail(err.user_message()),
        }
        self.recompute();
    }

    /// Resolve a mark upload: keeps the backend status line and refreshes
    /// verdicts from the detected students.
    pub fn finish_mark(&mut self, result: Result<MarkResponse, ApiError>) {
        match result {
            Ok(response) => {
                self.status_message = Some(response.message);
                self.detections.resolve(response.detected_students);
            }
            Err(err) => {
                let message = err.user_message();
                self.status_message = Some(message.clone());
                self.detections.fail(message);
            }
        }
        self.recompute();
    }

    /// Current presence verdicts, one per roster entry.
    pub fn verdicts(&self) -> &[PresenceVerdict] {
        &self.verdicts
    }

    fn recompute(&mut self) {
        static EMPTY_ROSTER: std::sync::LazyLock<Roster> = std::sync::LazyLock::new(Roster::new);
        let roster = self.roster.value().unwrap_or(&EMPTY_ROSTER);
        let detections = self.detections.value().map(Vec::as_slice).unwrap_or(&[]);
        self.verdicts = reconcile::reconcile(roster, detections);
    }
}
