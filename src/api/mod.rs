//! HTTP client for the attendance backend.
//!
//! Wraps every backend endpoint the client uses. Wire field names in the
//! request/response types are the contract with the backend and must not be
//! renamed. All protected requests carry the caller identity in the
//! [`IDENTITY_HEADER`] header; the backend historically accepted two header
//! spellings and this client standardizes on the one its CORS allow-list
//! admits.

mod multipart;

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::history::{AttendanceRecord, FilterError, HistoryFilter};
use crate::http_client;
use crate::reconcile::{DetectionResult, Roster};
use crate::session::{Role, Session};

pub use multipart::MultipartForm;

/// Header carrying the caller's subject identifier on protected requests.
pub const IDENTITY_HEADER: &str = "user_id";

/// Cap on the exported spreadsheet size.
pub const EXPORT_MAX_BYTES: usize = 16 * 1024 * 1024;

/// Successful login payload.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    /// Human-readable status line.
    pub message: String,
    /// Subject identifier to persist and send on protected requests.
    pub user_id: u64,
    /// Role-specific profile record.
    pub user: crate::session::Profile,
}

/// Account registration request.
#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: String,
    /// Password, forwarded as-is.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Requested role.
    pub role: Role,
    /// Student roll number (students only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    /// Teacher employee id (teachers only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// Department, defaulted server-side when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Semester (students only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
}

/// Successful registration payload.
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterResponse {
    /// Human-readable status line.
    pub message: String,
    /// Newly created subject identifier.
    pub user_id: u64,
}

/// One taught subject.
#[derive(Clone, Debug, Deserialize)]
pub struct Subject {
    /// Backend id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Short code, e.g. `CS101`.
    pub code: String,
    /// Credit count.
    pub credits: u32,
    /// Owning department.
    pub department: String,
    /// Teaching staff display name.
    pub teacher: String,
}

/// One recent attendance row on the teacher dashboard.
#[derive(Clone, Debug, Deserialize)]
pub struct RecentAttendance {
    /// Class date.
    pub date: String,
    /// Subject display name.
    pub subject: String,
    /// Student display name.
    pub student: String,
    /// Marks awarded.
    pub marks: i64,
}

/// Teacher dashboard statistics.
#[derive(Clone, Debug, Deserialize)]
pub struct TeacherStats {
    /// Sessions held by this teacher.
    pub total_classes: i64,
    /// Enrolled student count.
    pub total_students: i64,
    /// Most recent attendance rows.
    pub recent_attendance: Vec<RecentAttendance>,
}

/// Student dashboard statistics.
#[derive(Clone, Debug, Deserialize)]
pub struct StudentStats {
    /// Present percentage over all recorded classes.
    pub overall_percentage: f64,
    /// Classes recorded for this student.
    pub total_classes: i64,
    /// Classes attended.
    pub total_present: i64,
}

/// Role-dependent dashboard payload; the backend picks the shape from the
/// caller's role.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DashboardStats {
    /// Teacher shape.
    Teacher(TeacherStats),
    /// Student shape.
    Student(StudentStats),
}

/// Attendance-mark response: a status line plus the recognized students.
#[derive(Clone, Debug, Deserialize)]
pub struct MarkResponse {
    /// Human-readable status line, e.g. `Marked 12`.
    pub message: String,
    /// Detections recognized in the uploaded photo.
    pub detected_students: Vec<DetectionResult>,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    results: Vec<DetectionResult>,
}

/// Generic message-only response.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageResponse {
    /// Human-readable status line.
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Form fields accompanying an attendance-mark upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceSubmission {
    /// Class date, `YYYY-MM-DD`.
    pub date: String,
    /// Subject code.
    pub subject_code: String,
    /// Marks per present student.
    pub marks: u32,
}

impl Default for AttendanceSubmission {
    fn default() -> Self {
        Self {
            date: String::new(),
            subject_code: String::new(),
            marks: 1,
        }
    }
}

/// Form fields for registering a student together with a reference photo.
#[derive(Clone, Debug)]
pub struct StudentRegistration {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Roll number.
    pub roll_number: String,
    /// Department.
    pub department: String,
    /// Semester.
    pub semester: u32,
    /// Academic year, e.g. `2024-2025`.
    pub academic_year: String,
}

/// An image read into memory for upload.
#[derive(Clone, Debug)]
pub struct PhotoUpload {
    /// Filename presented to the backend.
    pub file_name: String,
    /// MIME type of the image.
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Read an image file, deriving the MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        let content_type = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        };
        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }
}

/// Errors from backend calls, split by the failure taxonomy: transport
/// problems retry manually with a generic message, backend-reported errors
/// surface their payload verbatim, and decode problems are reported as such.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured backend URL does not parse.
    #[error("Invalid backend URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),
    /// The backend answered non-2xx with an error payload.
    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),
    /// A history filter failed validation before the request was issued.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// Local file I/O failed (upload read or export write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The message shown to the user.
    ///
    /// Transport failures collapse to a generic network message; the user
    /// retries by re-triggering the action. Backend errors pass through
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Network error".to_string(),
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Synchronous client for one backend base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: Url,
}

impl ApiClient {
    /// Build a client for the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|source| ApiError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self { base })
    }

    /// `POST /login`.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint("/login")?;
        let response = http_client::agent()
            .post(url.as_str())
            .send_json(serde_json::json!({ "email": email, "password": password }))
            .map_err(map_ureq_error)?;
        decode(response)
    }

    /// `POST /register`.
    pub fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let url = self.endpoint("/register")?;
        let response = http_client::agent()
            .post(url.as_str())
            .send_json(request)
            .map_err(map_ureq_error)?;
        decode(response)
    }

    /// `GET /subjects`.
    pub fn subjects(&self, session: &Session) -> Result<Vec<Subject>, ApiError> {
        self.get_json(session, "/subjects", &[])
    }

    /// `GET /students`: the enrolled roster as display name to roll number.
    pub fn roster(&self, session: &Session) -> Result<Roster, ApiError> {
        let mapping: BTreeMap<String, String> = self.get_json(session, "/students", &[])?;
        Ok(mapping)
    }

    /// `GET /dashboard/stats`; the payload shape follows the caller's role.
    pub fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats, ApiError> {
        self.get_json(session, "/dashboard/stats", &[])
    }

    /// `POST /attendance/detect`: preview recognition without writing records.
    pub fn detect(
        &self,
        session: &Session,
        photo: &PhotoUpload,
    ) -> Result<Vec<DetectionResult>, ApiError> {
        let mut form = MultipartForm::new();
        form.file(
            "photo",
            &photo.file_name,
            &photo.content_type,
            &photo.bytes,
        );
        let response: DetectResponse =
            self.post_multipart(session, "/attendance/detect", form)?;
        Ok(response.results)
    }

    /// `POST /attendance/mark`: recognize and record attendance.
    pub fn mark_attendance(
        &self,
        session: &Session,
        submission: &AttendanceSubmission,
        photo: &PhotoUpload,
    ) -> Result<MarkResponse, ApiError> {
        let mut form = MultipartForm::new();
        form.text("date", &submission.date);
        form.text("subject", &submission.subject_code);
        form.text("marks", &submission.marks.to_string());
        form.file(
            "photo",
            &photo.file_name,
            &photo.content_type,
            &photo.bytes,
        );
        self.post_multipart(session, "/attendance/mark", form)
    }

    /// `GET /attendance/history` with the filter's non-empty pairs.
    pub fn history(
        &self,
        session: &Session,
        filter: &HistoryFilter,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        filter.validate()?;
        self.get_json(session, "/attendance/history", &filter.query_pairs())
    }

    /// `GET /attendance/export` with the SAME pairs as the listing, streaming
    /// the spreadsheet to `dest`. Returns the bytes written.
    pub fn export(
        &self,
        session: &Session,
        filter: &HistoryFilter,
        dest: &Path,
    ) -> Result<u64, ApiError> {
        filter.validate()?;
        let url = self.endpoint_with_query("/attendance/export", &filter.query_pairs())?;
        let response = http_client::agent()
            .get(url.as_str())
            .set(IDENTITY_HEADER, &session.subject_id)
            .call()
            .map_err(map_ureq_error)?;
        let mut file = File::create(dest)?;
        let written = http_client::stream_body_capped(response, &mut file, EXPORT_MAX_BYTES)?;
        Ok(written)
    }

    /// `POST /teacher/register-student-with-photo`.
    pub fn register_student(
        &self,
        session: &Session,
        registration: &StudentRegistration,
        photo: &PhotoUpload,
    ) -> Result<MessageResponse, ApiError> {
        let mut form = MultipartForm::new();
        form.text("name", &registration.name);
        form.text("email", &registration.email);
        form.text("roll_number", &registration.roll_number);
        form.text("department", &registration.department);
        form.text("semester", &registration.semester.to_string());
        form.text("academic_year", &registration.academic_year);
        form.file(
            "photo",
            &photo.file_name,
            &photo.content_type,
            &photo.bytes,
        );
        self.post_multipart(session, "/teacher/register-student-with-photo", form)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        pairs: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint_with_query(path, pairs)?;
        let response = http_client::agent()
            .get(url.as_str())
            .set(IDENTITY_HEADER, &session.subject_id)
            .call()
            .map_err(map_ureq_error)?;
        decode(response)
    }

    fn post_multipart<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        form: MultipartForm,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let content_type = form.content_type();
        let body = form.finish();
        let response = http_client::agent()
            .post(url.as_str())
            .set(IDENTITY_HEADER, &session.subject_id)
            .set("Content-Type", &content_type)
            .send_bytes(&body)
            .map_err(map_ureq_error)?;
        decode(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|source| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base),
            source,
        })
    }

    fn endpoint_with_query(&self, path: &str, pairs: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    response
        .into_json()
        .map_err(|err| ApiError::Decode(err.to_string()))
}

fn map_ureq_error(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Status(status, response) => ApiError::Backend {
            status,
            message: backend_message(response),
        },
        ureq::Error::Transport(err) => ApiError::Transport(err.to_string()),
    }
}

fn backend_message(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorPayload>(&body) {
        Ok(payload) => payload.error,
        Err(_) if !body.is_empty() => body,
        Err(_) => "Request failed".to_string(),
    }
}
