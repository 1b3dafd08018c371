//! Role-gated navigation decisions, taken before any remote data exists.

use crate::session::{Role, SessionState};

/// Route of the login screen, used for redirect decisions.
pub const LOGIN_ROUTE: &str = "/login";

/// What a protected screen should do for the current session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session restoration has not resolved; show a neutral placeholder.
    /// Protected content is never rendered in this state, so there is no
    /// flash of unauthorized content before restore completes.
    Pending,
    /// No session; go to the login screen.
    RedirectToLogin,
    /// Render the guarded content.
    Render,
    /// Authenticated but with the wrong role; go to the subject's own home.
    RedirectToHome(Role),
}

impl RouteDecision {
    /// Redirect target route, if this decision is a redirect.
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::RedirectToLogin => Some(LOGIN_ROUTE),
            Self::RedirectToHome(role) => Some(role.home_route()),
            Self::Pending | Self::Render => None,
        }
    }
}

/// Decide what to do for a protected screen.
///
/// `required` of `None` means any authenticated role may enter.
pub fn decide(state: &SessionState, required: Option<Role>) -> RouteDecision {
    match state {
        SessionState::Loading => RouteDecision::Pending,
        SessionState::Anonymous => RouteDecision::RedirectToLogin,
        SessionState::Authenticated(session) => match required {
            None => RouteDecision::Render,
            Some(role) if session.role() == role => RouteDecision::Render,
            Some(_) => RouteDecision::RedirectToHome(session.role()),
        },
    }
}
