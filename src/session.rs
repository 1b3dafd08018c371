//! Authentication state with an explicit lifecycle and persisted restore.
//!
//! The store starts in `Loading` and resolves exactly once, synchronously, by
//! reading a persisted credential pair: a subject-id file and a serialized
//! profile. A session exists iff BOTH halves are present and the profile
//! deserializes; anything partial or corrupt resolves to `Anonymous` and the
//! leftovers are erased (fail-safe, not fail-open). The store is handed to
//! consumers explicitly rather than imported as ambient global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_dirs;

/// Filename holding the persisted subject identifier.
pub const SUBJECT_FILE_NAME: &str = "subject";
/// Filename holding the persisted serialized profile.
pub const PROFILE_FILE_NAME: &str = "profile.json";

/// Role attached to an authenticated subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Marks attendance, views and exports history.
    Teacher,
    /// Views own attendance statistics.
    Student,
}

impl Role {
    /// Wire and route spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// The role-appropriate home dashboard route.
    pub fn home_route(self) -> &'static str {
        match self {
            Self::Teacher => "/teacher/dashboard",
            Self::Student => "/student/dashboard",
        }
    }
}

/// Role-specific subject record as returned by the backend on login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Backend user id.
    pub id: u64,
    /// Login email.
    pub email: String,
    /// Subject role.
    pub role: Role,
    /// Human-readable display name.
    pub name: String,
}

/// An authenticated session: opaque subject id plus its profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Opaque identifier sent with every protected request.
    pub subject_id: String,
    /// Role-specific record from login.
    pub profile: Profile,
}

impl Session {
    /// Role of the signed-in subject.
    pub fn role(&self) -> Role {
        self.profile.role
    }

    /// Display name of the signed-in subject.
    pub fn display_name(&self) -> &str {
        &self.profile.name
    }
}

/// Lifecycle state of the session store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted credentials have not been read yet. Callers must not read
    /// session fields in this state; screens render a neutral placeholder.
    Loading,
    /// A valid persisted or freshly created session.
    Authenticated(Session),
    /// No session; protected navigation redirects to login.
    Anonymous,
}

/// Errors raised by login/logout persistence. Restore never surfaces errors;
/// malformed persisted state self-heals to `Anonymous`.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// The session directory could not be resolved or created.
    #[error("No usable session directory: {0}")]
    SessionDir(#[from] app_dirs::AppDirError),
    /// Serializing the profile for persistence failed.
    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Writing a credential file failed.
    #[error("Failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Erasing a credential file failed.
    #[error("Failed to clear session file {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Process-wide session store backed by a pair of files.
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    state: SessionState,
}

impl SessionStore {
    /// Open a store rooted at the default app session directory.
    ///
    /// The state starts `Loading`; call [`SessionStore::restore`] once at
    /// startup to resolve it.
    pub fn open_default() -> Result<Self, SessionStoreError> {
        Ok(Self::at(app_dirs::session_dir()?))
    }

    /// Open a store rooted at an explicit directory (injectable for tests).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: SessionState::Loading,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The session, if resolved and authenticated. `None` while `Loading` or
    /// `Anonymous`.
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Resolve `Loading` from the persisted credential pair.
    ///
    /// Happens at most once; later calls return the already-resolved state.
    /// A missing half or a profile that fails to deserialize resolves to
    /// `Anonymous` and erases whatever was left behind, without surfacing an
    /// error to the caller.
    pub fn restore(&mut self) -> &SessionState {
        if self.state != SessionState::Loading {
            return &self.state;
        }
        self.state = match self.read_persisted() {
            Some(session) => SessionState::Authenticated(session),
            None => {
                self.erase_best_effort();
                SessionState::Anonymous
            }
        };
        &self.state
    }

    /// Persist a new session and transition to `Authenticated`.
    ///
    /// Any prior persisted session is overwritten unconditionally.
    pub fn login(&mut self, subject_id: &str, profile: Profile) -> Result<(), SessionStoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SessionStoreError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let serialized = serde_json::to_vec_pretty(&profile)?;
        write_file(&self.subject_path(), subject_id.as_bytes())?;
        write_file(&self.profile_path(), &serialized)?;
        self.state = SessionState::Authenticated(Session {
            subject_id: subject_id.to_string(),
            profile,
        });
        tracing::info!("Signed in as {}", self.state_display());
        Ok(())
    }

    /// Erase persisted credentials and transition to `Anonymous`.
    ///
    /// Idempotent; calling while already `Anonymous` is a no-op.
    pub fn logout(&mut self) -> Result<(), SessionStoreError> {
        remove_file(&self.subject_path())?;
        remove_file(&self.profile_path())?;
        self.state = SessionState::Anonymous;
        Ok(())
    }

    fn read_persisted(&self) -> Option<Session> {
        let subject_id = std::fs::read_to_string(self.subject_path()).ok()?;
        let subject_id = subject_id.trim().to_string();
        if subject_id.is_empty() {
            return None;
        }
        let raw = std::fs::read(self.profile_path()).ok()?;
        let profile = match serde_json::from_slice::<Profile>(&raw) {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!("Discarding corrupt persisted profile: {err}");
                return None;
            }
        };
        Some(Session {
            subject_id,
            profile,
        })
    }

    fn erase_best_effort(&self) {
        for path in [self.subject_path(), self.profile_path()] {
            if let Err(err) = std::fs::remove_file(&path)
                && err.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!("Failed to clear stale session file {}: {err}", path.display());
            }
        }
    }

    fn subject_path(&self) -> PathBuf {
        self.dir.join(SUBJECT_FILE_NAME)
    }

    fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE_NAME)
    }

    fn state_display(&self) -> String {
        match &self.state {
            SessionState::Authenticated(session) => {
                format!("{} ({})", session.display_name(), session.role().as_str())
            }
            SessionState::Anonymous => "anonymous".to_string(),
            SessionState::Loading => "loading".to_string(),
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SessionStoreError> {
    std::fs::write(path, bytes).map_err(|source| SessionStoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_file(path: &Path) -> Result<(), SessionStoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionStoreError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
