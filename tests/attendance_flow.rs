//! End-to-end client flows against a scripted backend stub.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use rollcall::api::ApiClient;
use rollcall::guard::{self, RouteDecision};
use rollcall::history::HistoryFilter;
use rollcall::screens::history::HistoryScreen;
use rollcall::screens::mark_attendance::MarkAttendanceScreen;
use rollcall::session::{Role, SessionState, SessionStore};
use tempfile::tempdir;

/// Serve a fixed sequence of canned responses, one connection each, and hand
/// back the base URL plus the captured request heads.
fn serve_script(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };
            let mut buf = [0u8; 16 * 1024];
            let read = stream.read(&mut buf).unwrap_or(0);
            let _ = tx.send(String::from_utf8_lossy(&buf[..read]).into_owned());
            let _ = stream.write_all(response.as_bytes());
        }
    });
    (format!("http://{addr}"), rx)
}

fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

#[test]
fn teacher_signs_in_restarts_and_marks_attendance() {
    let login_body = r#"{
        "message": "Login OK",
        "user_id": 7,
        "user": {"id": 7, "email": "jane@example.edu", "role": "teacher", "name": "Jane Doe"}
    }"#;
    let roster_body = r#"{"Jane_Doe": "R01", "Amit_Kumar": "R02"}"#;
    let detect_body = r#"{"results": [
        {"student": "Jane Doe", "roll": "R01", "confidence": 91.4,
         "location": {"top": 10.0, "left": 20.0}}
    ]}"#;
    let (base, _rx) = serve_script(vec![
        json_response(login_body),
        json_response(roster_body),
        json_response(detect_body),
    ]);
    let client = ApiClient::new(&base).unwrap();

    // Sign in and persist the session.
    let dir = tempdir().unwrap();
    let login = client.login("jane@example.edu", "secret").unwrap();
    let mut store = SessionStore::at(dir.path());
    store.restore();
    store.login(&login.user_id.to_string(), login.user).unwrap();

    // A fresh store over the same directory simulates a process restart.
    let mut restarted = SessionStore::at(dir.path());
    restarted.restore();
    let session = restarted.session().expect("persisted session").clone();
    assert_eq!(
        guard::decide(restarted.state(), Some(Role::Teacher)),
        RouteDecision::Render
    );

    // Roster plus one detection. The detection uses the display encoding
    // while the roster uses underscores; reconciliation must still match.
    let mut screen = MarkAttendanceScreen::default();
    screen.begin_roster_fetch();
    screen.finish_roster_fetch(client.roster(&session));
    screen.begin_upload();
    screen.finish_detect(client.detect(
        &session,
        &rollcall::api::PhotoUpload {
            file_name: "class.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        },
    ));

    let verdicts = screen.verdicts();
    assert_eq!(verdicts.len(), 2);
    let jane = verdicts.iter().find(|v| v.roll_number == "R01").unwrap();
    let amit = verdicts.iter().find(|v| v.roll_number == "R02").unwrap();
    assert!(jane.present);
    assert!(!amit.present);
    assert!(amit.matched.is_none());
}

#[test]
fn student_sessions_are_turned_away_from_teacher_commands() {
    let dir = tempdir().unwrap();
    let mut store = SessionStore::at(dir.path());
    store.restore();
    store
        .login(
            "12",
            rollcall::session::Profile {
                id: 12,
                email: "amit@example.edu".to_string(),
                role: Role::Student,
                name: "Amit Kumar".to_string(),
            },
        )
        .unwrap();
    assert_eq!(
        guard::decide(store.state(), Some(Role::Teacher)),
        RouteDecision::RedirectToHome(Role::Student)
    );
    // The same session still reaches role-agnostic screens.
    assert_eq!(guard::decide(store.state(), None), RouteDecision::Render);
}

#[test]
fn anonymous_state_redirects_to_login_after_restore() {
    let dir = tempdir().unwrap();
    let mut store = SessionStore::at(dir.path());
    assert_eq!(
        guard::decide(store.state(), Some(Role::Teacher)),
        RouteDecision::Pending
    );
    store.restore();
    assert_eq!(store.state(), &SessionState::Anonymous);
    assert_eq!(
        guard::decide(store.state(), Some(Role::Teacher)),
        RouteDecision::RedirectToLogin
    );
}

#[test]
fn history_listing_and_export_send_identical_filters() {
    let spreadsheet = "PK-spreadsheet-bytes";
    let export_response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\nContent-Length: {}\r\n\r\n{spreadsheet}",
        spreadsheet.len()
    );
    let (base, rx) = serve_script(vec![json_response("[]"), export_response]);
    let client = ApiClient::new(&base).unwrap();
    let session = rollcall::session::Session {
        subject_id: "7".to_string(),
        profile: rollcall::session::Profile {
            id: 7,
            email: "jane@example.edu".to_string(),
            role: Role::Teacher,
            name: "Jane Doe".to_string(),
        },
    };

    let mut screen = HistoryScreen::default();
    screen.filter = HistoryFilter {
        subject_code: "CS101".to_string(),
        date_from: String::new(),
        date_to: "2024-01-01".to_string(),
    };
    screen.begin_fetch();
    screen.finish_fetch(client.history(&session, &screen.filter));
    assert!(screen.records.value().is_some());

    let dir = tempdir().unwrap();
    let dest = dir.path().join("attendance.xlsx");
    screen.begin_export();
    let result = client.export(&session, &screen.filter, &dest);
    screen.finish_export(dest.clone(), result);
    assert_eq!(
        screen.export.value(),
        Some(&(dest.clone(), spreadsheet.len() as u64))
    );
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), spreadsheet);

    // Both requests carried the same query string.
    let listing = rx.recv().unwrap();
    let export = rx.recv().unwrap();
    let query_of = |head: &str| {
        let line = head.lines().next().unwrap_or_default();
        line.split('?')
            .nth(1)
            .and_then(|rest| rest.split(' ').next())
            .unwrap_or_default()
            .to_string()
    };
    assert_eq!(query_of(&listing), "subject=CS101&date_to=2024-01-01");
    assert_eq!(query_of(&export), query_of(&listing));
}
