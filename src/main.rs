#![deny(missing_docs)]
#![deny(warnings)]

//! Command-line client for the rollcall attendance backend.

use std::path::PathBuf;

use rollcall::api::{
    ApiClient, AttendanceSubmission, DashboardStats, PhotoUpload, RegisterRequest,
    StudentRegistration,
};
use rollcall::config;
use rollcall::guard::{self, RouteDecision};
use rollcall::history::HistoryFilter;
use rollcall::identity;
use rollcall::logging;
use rollcall::reconcile::PresenceVerdict;
use rollcall::screens::history::HistoryScreen;
use rollcall::screens::mark_attendance::MarkAttendanceScreen;
use rollcall::session::{Role, Session, SessionState, SessionStore};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(command) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    match command {
        Command::Login { email, password } => login(&api_client()?, &email, &password),
        Command::Logout => logout(),
        Command::Whoami => whoami(),
        Command::Register(request) => register(&api_client()?, &request),
        Command::Subjects => subjects(&api_client()?),
        Command::Roster => roster(&api_client()?),
        Command::Stats => stats(&api_client()?),
        Command::Detect { photo } => detect(&api_client()?, &photo),
        Command::Mark {
            photo,
            date,
            subject,
            marks,
        } => mark(&api_client()?, &photo, date, subject, marks),
        Command::History { filter } => history(&api_client()?, filter),
        Command::Export { filter, out } => export(&api_client()?, filter, out),
        Command::RegisterStudent {
            registration,
            photo,
        } => register_student(&api_client()?, &registration, &photo),
    }
}

fn api_client() -> Result<ApiClient, String> {
    let config = config::load_or_default().map_err(|err| err.to_string())?;
    let base_url = std::env::var("ROLLCALL_BACKEND_URL").unwrap_or(config.backend_url);
    ApiClient::new(&base_url).map_err(|err| err.to_string())
}

fn open_store() -> Result<SessionStore, String> {
    SessionStore::open_default().map_err(|err| err.to_string())
}

/// Restore the persisted session and apply the route guard for a protected
/// command.
fn require_session(required: Option<Role>) -> Result<Session, String> {
    let mut store = open_store()?;
    store.restore();
    let decision = guard::decide(store.state(), required);
    match (decision, store.session()) {
        (RouteDecision::Render, Some(session)) => Ok(session.clone()),
        (RouteDecision::RedirectToHome(actual), _) => {
            let needed = required.map(Role::as_str).unwrap_or("any");
            Err(format!(
                "This command requires the {needed} role; you are signed in as {}. See {}.",
                actual.as_str(),
                actual.home_route()
            ))
        }
        _ => Err("Not signed in. Run `rollcall login` first.".to_string()),
    }
}

fn login(client: &ApiClient, email: &str, password: &str) -> Result<(), String> {
    let response = client.login(email, password).map_err(|err| err.user_message())?;
    let mut store = open_store()?;
    store.restore();
    store
        .login(&response.user_id.to_string(), response.user)
        .map_err(|err| err.to_string())?;
    let session = store
        .session()
        .ok_or_else(|| "Session not established".to_string())?;
    println!(
        "{}; signed in as {} ({})",
        response.message,
        session.display_name(),
        session.role().as_str()
    );
    Ok(())
}

fn logout() -> Result<(), String> {
    let mut store = open_store()?;
    store.restore();
    store.logout().map_err(|err| err.to_string())?;
    println!("Signed out.");
    Ok(())
}

fn whoami() -> Result<(), String> {
    let mut store = open_store()?;
    match store.restore() {
        SessionState::Authenticated(session) => {
            println!(
                "{} ({}) <{}>",
                session.display_name(),
                session.role().as_str(),
                session.profile.email
            );
        }
        _ => println!("Not signed in."),
    }
    Ok(())
}

fn register(client: &ApiClient, request: &RegisterRequest) -> Result<(), String> {
    let response = client.register(request).map_err(|err| err.user_message())?;
    println!("{} (user id {})", response.message, response.user_id);
    Ok(())
}

fn subjects(client: &ApiClient) -> Result<(), String> {
    let session = require_session(None)?;
    let subjects = client.subjects(&session).map_err(|err| err.user_message())?;
    if subjects.is_empty() {
        println!("No subjects.");
        return Ok(());
    }
    for subject in subjects {
        println!(
            "- {} ({}) {} credits, {}, taught by {}",
            subject.name, subject.code, subject.credits, subject.department, subject.teacher
        );
    }
    Ok(())
}

fn roster(client: &ApiClient) -> Result<(), String> {
    let session = require_session(None)?;
    let roster = client.roster(&session).map_err(|err| err.user_message())?;
    println!("Enrolled students: {}", roster.len());
    for (name, roll) in &roster {
        println!("- {} ({roll})", identity::to_display(name));
    }
    Ok(())
}

fn stats(client: &ApiClient) -> Result<(), String> {
    let session = require_session(None)?;
    match client
        .dashboard_stats(&session)
        .map_err(|err| err.user_message())?
    {
        DashboardStats::Teacher(stats) => {
            println!("Classes held: {}", stats.total_classes);
            println!("Students enrolled: {}", stats.total_students);
            if !stats.recent_attendance.is_empty() {
                println!("Recent attendance:");
                for row in stats.recent_attendance {
                    println!(
                        "- {} {} {} ({} marks)",
                        row.date, row.subject, row.student, row.marks
                    );
                }
            }
        }
        DashboardStats::Student(stats) => {
            println!(
                "Attendance: {:.1}% ({}/{} classes)",
                stats.overall_percentage, stats.total_present, stats.total_classes
            );
        }
    }
    Ok(())
}

fn detect(client: &ApiClient, photo_path: &PathBuf) -> Result<(), String> {
    let session = require_session(Some(Role::Teacher))?;
    let photo = read_photo(photo_path)?;

    let mut screen = MarkAttendanceScreen::default();
    screen.begin_roster_fetch();
    screen.finish_roster_fetch(client.roster(&session));
    screen.begin_upload();
    screen.finish_detect(client.detect(&session, &photo));
    report_presence(&screen)
}

fn mark(
    client: &ApiClient,
    photo_path: &PathBuf,
    date: String,
    subject_code: String,
    marks: u32,
) -> Result<(), String> {
    let session = require_session(Some(Role::Teacher))?;
    let photo = read_photo(photo_path)?;

    let mut screen = MarkAttendanceScreen::default();
    screen.submission = AttendanceSubmission {
        date,
        subject_code,
        marks,
    };
    screen.begin_roster_fetch();
    screen.finish_roster_fetch(client.roster(&session));
    screen.begin_upload();
    screen.finish_mark(client.mark_attendance(&session, &screen.submission, &photo));
    if let Some(message) = &screen.status_message {
        println!("{message}");
    }
    report_presence(&screen)
}

fn history(client: &ApiClient, filter: HistoryFilter) -> Result<(), String> {
    let session = require_session(Some(Role::Teacher))?;
    let mut screen = HistoryScreen::default();
    screen.filter = filter;
    screen.filter.validate().map_err(|err| err.to_string())?;
    screen.begin_fetch();
    screen.finish_fetch(client.history(&session, &screen.filter));
    if let Some(err) = screen.records.error() {
        return Err(err.to_string());
    }
    let records = screen.records.value().map(Vec::as_slice).unwrap_or(&[]);
    if records.is_empty() {
        println!("No attendance records found.");
        return Ok(());
    }
    for record in records {
        println!(
            "{} {} ({}) {} ({}) {} marks [{}]",
            record.date,
            record.subject,
            record.subject_code,
            record.student_name,
            record.roll_number,
            record.marks,
            record.status
        );
    }
    Ok(())
}

fn export(client: &ApiClient, filter: HistoryFilter, out: PathBuf) -> Result<(), String> {
    let session = require_session(Some(Role::Teacher))?;
    let mut screen = HistoryScreen::default();
    screen.filter = filter;
    screen.filter.validate().map_err(|err| err.to_string())?;
    screen.begin_export();
    let result = client.export(&session, &screen.filter, &out);
    screen.finish_export(out, result);
    if let Some(err) = screen.export.error() {
        return Err(err.to_string());
    }
    if let Some((dest, written)) = screen.export.value() {
        println!("Exported {written} bytes to {}", dest.display());
    }
    Ok(())
}

fn register_student(
    client: &ApiClient,
    registration: &StudentRegistration,
    photo_path: &PathBuf,
) -> Result<(), String> {
    let session = require_session(Some(Role::Teacher))?;
    let photo = read_photo(photo_path)?;
    let response = client
        .register_student(&session, registration, &photo)
        .map_err(|err| err.user_message())?;
    println!("{}", response.message);
    Ok(())
}

fn read_photo(path: &PathBuf) -> Result<PhotoUpload, String> {
    PhotoUpload::from_path(path)
        .map_err(|err| format!("Failed to read photo {}: {err}", path.display()))
}

fn report_presence(screen: &MarkAttendanceScreen) -> Result<(), String> {
    if let Some(err) = screen.roster.error() {
        return Err(err.to_string());
    }
    if let Some(err) = screen.detections.error() {
        return Err(err.to_string());
    }
    print_verdicts(screen.verdicts());
    Ok(())
}

fn print_verdicts(verdicts: &[PresenceVerdict]) {
    let present = verdicts.iter().filter(|v| v.present).count();
    println!("Presence ({present}/{} present):", verdicts.len());
    for verdict in verdicts {
        let status = if verdict.present { "present" } else { "absent" };
        let name = identity::to_display(&verdict.display_name);
        match &verdict.matched {
            Some(detection) => println!(
                "- [{status}] {name} ({}) {:.1}% confidence",
                verdict.roll_number, detection.confidence_percent
            ),
            None => println!("- [{status}] {name} ({})", verdict.roll_number),
        }
    }
}

#[derive(Debug)]
enum Command {
    Login {
        email: String,
        password: String,
    },
    Logout,
    Whoami,
    Register(RegisterRequest),
    Subjects,
    Roster,
    Stats,
    Detect {
        photo: PathBuf,
    },
    Mark {
        photo: PathBuf,
        date: String,
        subject: String,
        marks: u32,
    },
    History {
        filter: HistoryFilter,
    },
    Export {
        filter: HistoryFilter,
        out: PathBuf,
    },
    RegisterStudent {
        registration: StudentRegistration,
        photo: PathBuf,
    },
}

fn parse_args(args: Vec<String>) -> Result<Option<Command>, String> {
    let Some(first) = args.first() else {
        println!("{}", help_text());
        return Ok(None);
    };
    match first.as_str() {
        "-h" | "--help" | "help" => {
            println!("{}", help_text());
            Ok(None)
        }
        "login" => parse_login(&args[1..]).map(Some),
        "logout" => Ok(Some(Command::Logout)),
        "whoami" => Ok(Some(Command::Whoami)),
        "register" => parse_register(&args[1..]).map(Some),
        "subjects" => Ok(Some(Command::Subjects)),
        "roster" => Ok(Some(Command::Roster)),
        "stats" => Ok(Some(Command::Stats)),
        "detect" => parse_detect(&args[1..]).map(Some),
        "mark" => parse_mark(&args[1..]).map(Some),
        "history" => parse_history(&args[1..]).map(|filter| Some(Command::History { filter })),
        "export" => parse_export(&args[1..]).map(Some),
        "register-student" => parse_register_student(&args[1..]).map(Some),
        unknown => Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    }
}

fn take_value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_login(args: &[String]) -> Result<Command, String> {
    let mut email = None;
    let mut password = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--email" => email = Some(take_value(args, &mut idx, "--email")?.to_string()),
            "--password" => password = Some(take_value(args, &mut idx, "--password")?.to_string()),
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    let email = email.ok_or_else(|| "--email is required".to_string())?;
    let password = password.ok_or_else(|| "--password is required".to_string())?;
    Ok(Command::Login { email, password })
}

fn parse_register(args: &[String]) -> Result<Command, String> {
    let mut email = None;
    let mut password = None;
    let mut name = None;
    let mut role = None;
    let mut roll_number = None;
    let mut employee_id = None;
    let mut department = None;
    let mut semester = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--email" => email = Some(take_value(args, &mut idx, "--email")?.to_string()),
            "--password" => password = Some(take_value(args, &mut idx, "--password")?.to_string()),
            "--name" => name = Some(take_value(args, &mut idx, "--name")?.to_string()),
            "--role" => role = Some(parse_role(take_value(args, &mut idx, "--role")?)?),
            "--roll" => roll_number = Some(take_value(args, &mut idx, "--roll")?.to_string()),
            "--employee-id" => {
                employee_id = Some(take_value(args, &mut idx, "--employee-id")?.to_string());
            }
            "--department" => {
                department = Some(take_value(args, &mut idx, "--department")?.to_string());
            }
            "--semester" => semester = Some(parse_u32(take_value(args, &mut idx, "--semester")?)?),
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    Ok(Command::Register(RegisterRequest {
        email: email.ok_or_else(|| "--email is required".to_string())?,
        password: password.ok_or_else(|| "--password is required".to_string())?,
        name: name.ok_or_else(|| "--name is required".to_string())?,
        role: role.ok_or_else(|| "--role is required (teacher or student)".to_string())?,
        roll_number,
        employee_id,
        department,
        semester,
    }))
}

fn parse_detect(args: &[String]) -> Result<Command, String> {
    let mut photo = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--photo" => photo = Some(PathBuf::from(take_value(args, &mut idx, "--photo")?)),
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    let photo = photo.ok_or_else(|| "--photo is required".to_string())?;
    Ok(Command::Detect { photo })
}

fn parse_mark(args: &[String]) -> Result<Command, String> {
    let mut photo = None;
    let mut date = None;
    let mut subject = None;
    let mut marks = 1u32;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--photo" => photo = Some(PathBuf::from(take_value(args, &mut idx, "--photo")?)),
            "--date" => date = Some(take_value(args, &mut idx, "--date")?.to_string()),
            "--subject" => subject = Some(take_value(args, &mut idx, "--subject")?.to_string()),
            "--marks" => marks = parse_u32(take_value(args, &mut idx, "--marks")?)?,
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    Ok(Command::Mark {
        photo: photo.ok_or_else(|| "--photo is required".to_string())?,
        date: date.unwrap_or_else(today),
        subject: subject.ok_or_else(|| "--subject is required".to_string())?,
        marks,
    })
}

fn parse_history(args: &[String]) -> Result<HistoryFilter, String> {
    let mut filter = HistoryFilter::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--subject" => {
                filter.subject_code = take_value(args, &mut idx, "--subject")?.to_string();
            }
            "--from" => filter.date_from = take_value(args, &mut idx, "--from")?.to_string(),
            "--to" => filter.date_to = take_value(args, &mut idx, "--to")?.to_string(),
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    Ok(filter)
}

fn parse_export(args: &[String]) -> Result<Command, String> {
    let mut out = PathBuf::from("attendance_export.xlsx");
    // `--out` can appear between filter flags; everything else is handed to
    // the filter parser.
    let mut filter_args = Vec::new();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--out" => out = PathBuf::from(take_value(args, &mut idx, "--out")?),
            _ => filter_args.push(args[idx].clone()),
        }
        idx += 1;
    }
    let filter = parse_history(&filter_args)?;
    Ok(Command::Export { filter, out })
}

fn parse_register_student(args: &[String]) -> Result<Command, String> {
    let mut name = None;
    let mut email = None;
    let mut roll_number = None;
    let mut photo = None;
    let mut department = "Computer Science".to_string();
    let mut semester = 1u32;
    let mut academic_year = "2024-2025".to_string();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--name" => name = Some(take_value(args, &mut idx, "--name")?.to_string()),
            "--email" => email = Some(take_value(args, &mut idx, "--email")?.to_string()),
            "--roll" => roll_number = Some(take_value(args, &mut idx, "--roll")?.to_string()),
            "--photo" => photo = Some(PathBuf::from(take_value(args, &mut idx, "--photo")?)),
            "--department" => department = take_value(args, &mut idx, "--department")?.to_string(),
            "--semester" => semester = parse_u32(take_value(args, &mut idx, "--semester")?)?,
            "--year" => academic_year = take_value(args, &mut idx, "--year")?.to_string(),
            unknown => return Err(format!("Unknown argument: {unknown}")),
        }
        idx += 1;
    }
    Ok(Command::RegisterStudent {
        registration: StudentRegistration {
            name: name.ok_or_else(|| "--name is required".to_string())?,
            email: email.ok_or_else(|| "--email is required".to_string())?,
            roll_number: roll_number.ok_or_else(|| "--roll is required".to_string())?,
            department,
            semester,
            academic_year,
        },
        photo: photo.ok_or_else(|| "--photo is required".to_string())?,
    })
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value {
        "teacher" => Ok(Role::Teacher),
        "student" => Ok(Role::Student),
        other => Err(format!("Unknown role: {other} (expected teacher or student)")),
    }
}

fn parse_u32(value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|err| format!("Invalid number {value:?}: {err}"))
}

fn today() -> String {
    use time::macros::format_description;
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

fn help_text() -> String {
    [
        "rollcall: attendance client",
        "",
        "Usage:",
        "  rollcall login --email <email> --password <password>",
        "  rollcall logout",
        "  rollcall whoami",
        "  rollcall register --email <email> --password <password> --name <name> --role <teacher|student> [--roll <n>] [--employee-id <id>] [--department <d>] [--semester <n>]",
        "  rollcall subjects",
        "  rollcall roster",
        "  rollcall stats",
        "  rollcall detect --photo <path>",
        "  rollcall mark --photo <path> --subject <code> [--date <YYYY-MM-DD>] [--marks <n>]",
        "  rollcall history [--subject <code>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>]",
        "  rollcall export [--subject <code>] [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>] [--out <path>]",
        "  rollcall register-student --name <name> --email <email> --roll <n> --photo <path> [--department <d>] [--semester <n>] [--year <YYYY-YYYY>]",
        "",
        "The backend URL comes from config.toml in the app directory or the",
        "ROLLCALL_BACKEND_URL environment variable.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_history_builds_a_filter_from_flags() {
        let args: Vec<String> = ["--subject", "CS101", "--to", "2024-01-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let filter = parse_history(&args).unwrap();
        assert_eq!(filter.subject_code, "CS101");
        assert_eq!(filter.date_from, "");
        assert_eq!(filter.date_to, "2024-01-01");
    }

    #[test]
    fn parse_export_accepts_out_between_filter_flags() {
        let args: Vec<String> = ["--subject", "CS101", "--out", "report.xlsx", "--to", "2024-01-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let Command::Export { filter, out } = parse_export(&args).unwrap() else {
            panic!("expected export command");
        };
        assert_eq!(out, PathBuf::from("report.xlsx"));
        assert_eq!(filter.subject_code, "CS101");
        assert_eq!(filter.date_to, "2024-01-01");
    }

    #[test]
    fn parse_mark_defaults_marks_and_date() {
        let args: Vec<String> = ["--photo", "class.jpg", "--subject", "CS101"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let Command::Mark {
            photo,
            date,
            subject,
            marks,
        } = parse_mark(&args).unwrap()
        else {
            panic!("expected mark command");
        };
        assert_eq!(photo, PathBuf::from("class.jpg"));
        assert_eq!(subject, "CS101");
        assert_eq!(marks, 1);
        assert_eq!(date.len(), 10);
    }

    #[test]
    fn missing_required_flags_are_reported() {
        let err = parse_login(&["--email".to_string(), "a@b.c".to_string()]).unwrap_err();
        assert!(err.contains("--password is required"));
    }

    #[test]
    fn unknown_commands_are_rejected_with_help() {
        let err = parse_args(vec!["frobnicate".to_string()]).unwrap_err();
        assert!(err.contains("Unknown command"));
        assert!(err.contains("Usage:"));
    }
}
