use std::fmt;
use std::sync::Arc;

use crate::credentials::CredentialVerifier;
use crate::error::{ClientError, Result};
use crate::session::{Role, Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    UserLogin,
    CompanyLogin,
    CompanyDashboard,
    RequestCall,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::UserLogin => "/",
            Route::CompanyLogin => "/company-login",
            Route::CompanyDashboard => "/company-dashboard",
            Route::RequestCall => "/request-call",
        }
    }

    /// Unknown paths land on the user login.
    pub fn from_path(path: &str) -> Route {
        match path.trim_end_matches('/') {
            "/company-login" => Route::CompanyLogin,
            "/company-dashboard" => Route::CompanyDashboard,
            "/request-call" => Route::RequestCall,
            _ => Route::UserLogin,
        }
    }

    /// The role a protected route requires.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Route::CompanyDashboard => Some(Role::Company),
            Route::RequestCall => Some(Role::User),
            Route::UserLogin | Route::CompanyLogin => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl Role {
    pub fn entry_point(self) -> Route {
        match self {
            Role::Company => Route::CompanyLogin,
            Role::User => Route::UserLogin,
        }
    }

    pub fn home(self) -> Route {
        match self {
            Role::Company => Route::CompanyDashboard,
            Role::User => Route::RequestCall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(Session),
    Redirect(Route),
}

/// Gatekeeper for protected views. Nothing is cached: each `check` consults
/// the session store again.
#[derive(Clone)]
pub struct AccessGuard {
    sessions: Arc<SessionStore>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccessGuard {
    pub fn new(sessions: Arc<SessionStore>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { sessions, verifier }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Signs in through `portal`'s login. Credentials belonging to the other
    /// role are refused here. On success the other role's session is gone.
    pub fn sign_in(&self, portal: Role, username: &str, password: &str) -> Result<Route> {
        match self.verifier.verify(username, password) {
            Some(role) if role == portal => {
                self.sessions.set_role(role)?;
                Ok(role.home())
            }
            _ => {
                log::info!("{} sign-in rejected", portal);
                let message = match self.verifier.hint(portal) {
                    Some(hint) => format!("Invalid credentials (Hint: {})", hint),
                    None => "Invalid credentials".to_string(),
                };
                Err(ClientError::Rejected(message))
            }
        }
    }

    pub fn sign_out(&self, role: Role) -> Result<Route> {
        self.sessions.clear(role)?;
        Ok(role.entry_point())
    }

    /// Grants `required` or names where to go instead. Asking for one role's
    /// view while the other role is signed in ends that other session.
    pub fn check(&self, required: Role) -> Access {
        match self.sessions.current() {
            Some(session) if session.role == required => Access::Granted(session),
            Some(session) => {
                log::info!("{} view requested, ending {} session", required, session.role);
                if let Err(e) = self.sessions.clear(session.role) {
                    log::warn!("could not clear {} session: {}", session.role, e);
                }
                Access::Redirect(required.entry_point())
            }
            None => Access::Redirect(required.entry_point()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::storage::MemorySessionStorage;

    fn guard() -> AccessGuard {
        let store = SessionStore::new(Box::new(MemorySessionStorage::default()), 3600);
        AccessGuard::new(Arc::new(store), Arc::new(StaticCredentials::demo()))
    }

    #[test]
    fn redirects_without_session() {
        let guard = guard();
        assert_eq!(guard.check(Role::Company), Access::Redirect(Route::CompanyLogin));
        assert_eq!(guard.check(Role::User), Access::Redirect(Route::UserLogin));
    }

    #[test]
    fn sign_in_grants_home() {
        let guard = guard();
        assert_eq!(guard.sign_in(Role::Company, "admin", "pass").unwrap(), Route::CompanyDashboard);
        assert!(matches!(guard.check(Role::Company), Access::Granted(s) if s.role == Role::Company));
    }

    #[test]
    fn wrong_portal_is_rejected() {
        let guard = guard();
        let err = guard.sign_in(Role::Company, "user", "pass").unwrap_err();
        assert_eq!(err, ClientError::Rejected("Invalid credentials (Hint: admin/pass)".into()));
        assert_eq!(guard.sessions().current(), None);
    }

    #[test]
    fn other_role_view_ends_session() {
        let guard = guard();
        guard.sign_in(Role::Company, "admin", "pass").unwrap();
        assert_eq!(guard.check(Role::User), Access::Redirect(Route::UserLogin));
        assert!(!guard.sessions().is_authenticated(Role::Company));
    }

    #[test]
    fn check_sees_external_logout() {
        let guard = guard();
        guard.sign_in(Role::User, "user", "pass").unwrap();
        assert!(matches!(guard.check(Role::User), Access::Granted(_)));
        guard.sessions().clear(Role::User).unwrap();
        assert_eq!(guard.check(Role::User), Access::Redirect(Route::UserLogin));
    }

    #[test]
    fn sign_out_returns_entry_point() {
        let guard = guard();
        guard.sign_in(Role::User, "user", "pass").unwrap();
        assert_eq!(guard.sign_out(Role::User).unwrap(), Route::UserLogin);
    }

    #[test]
    fn paths() {
        assert_eq!(Route::from_path("/request-call/"), Route::RequestCall);
        assert_eq!(Route::from_path("/nowhere"), Route::UserLogin);
        assert_eq!(Route::CompanyDashboard.to_string(), "/company-dashboard");
    }
}
