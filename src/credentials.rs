use crate::session::Role;

/// Decides which role, if any, a username/password pair belongs to.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<Role>;

    /// Extra text appended to the rejection message for a portal.
    fn hint(&self, _portal: Role) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
struct Account {
    username: String,
    password: String,
    role: Role,
}

/// Fixed account table. Stand-in until a real authenticator is wired in.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    accounts: Vec<Account>,
    show_hints: bool,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// `admin/pass` for the company portal, `user/pass` for end users.
    pub fn demo() -> Self {
        Self::new()
            .with_account("admin", "pass", Role::Company)
            .with_account("user", "pass", Role::User)
            .with_hints(true)
    }

    pub fn with_account(mut self, username: &str, password: &str, role: Role) -> Self {
        self.accounts.push(Account {
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
        self
    }

    pub fn with_hints(mut self, show: bool) -> Self {
        self.show_hints = show;
        self
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> Option<Role> {
        self.accounts
            .iter()
            .find(|a| a.username == username && a.password == password)
            .map(|a| a.role)
    }

    fn hint(&self, portal: Role) -> Option<String> {
        if !self.show_hints {
            return None;
        }
        self.accounts
            .iter()
            .find(|a| a.role == portal)
            .map(|a| format!("{}/{}", a.username, a.password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_accounts() {
        let creds = StaticCredentials::demo();
        assert_eq!(creds.verify("admin", "pass"), Some(Role::Company));
        assert_eq!(creds.verify("user", "pass"), Some(Role::User));
        assert_eq!(creds.verify("admin", "nope"), None);
        assert_eq!(creds.hint(Role::Company).as_deref(), Some("admin/pass"));
    }

    #[test]
    fn hints_off_by_default() {
        let creds = StaticCredentials::new().with_account("ops", "secret", Role::Company);
        assert_eq!(creds.hint(Role::Company), None);
    }
}
