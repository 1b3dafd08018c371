//! Pending/resolved state for independent asynchronous operations.
//!
//! Each user-triggered operation (roster fetch, upload, history fetch,
//! export) owns its own `OpState`, so concurrent operations stay independent
//! while each one's own start/finish is strictly ordered. A failure resolves
//! to `Failed` with the user-facing message and the operation can simply be
//! re-triggered; nothing here is cancellable.

/// Lifecycle of one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OpState<T> {
    /// Never started.
    #[default]
    Idle,
    /// Started, not yet resolved; the UI shows this as loading.
    Pending,
    /// Resolved successfully.
    Ready(T),
    /// Resolved with a user-facing failure message.
    Failed(String),
}

impl<T> OpState<T> {
    /// Mark the operation as started.
    pub fn start(&mut self) {
        *self = Self::Pending;
    }

    /// Resolve with a value.
    pub fn resolve(&mut self, value: T) {
        *self = Self::Ready(value);
    }

    /// Resolve with a failure message.
    pub fn fail(&mut self, message: impl Into<String>) {
        *self = Self::Failed(message.into());
    }

    /// Whether the operation has started but not resolved.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}
