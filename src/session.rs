use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::storage::SessionStorage;
use crate::utils::now_secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Company administrator.
    Company,
    /// End user requesting a call.
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Company, Role::User];

    pub fn other(self) -> Role {
        match self {
            Role::Company => Role::User,
            Role::User => Role::Company,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Company => f.write_str("company"),
            Role::User => f.write_str("user"),
        }
    }
}

/// An authenticated actor. At most one exists per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,
    pub issued_at: u64,
    pub ttl_secs: u64,
}

impl Session {
    pub fn issue(role: Role, ttl_secs: u64) -> Self {
        Self { role, issued_at: now_secs(), ttl_secs }
    }

    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.ttl_secs)
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.issued_at && now < self.expires_at()
    }
}

/// Process-wide record of who is signed in.
///
/// Storage is the source of truth: every query re-reads it, so a session
/// cleared elsewhere (another process sharing the file) is seen on the next
/// check. The mutex serializes read-modify-write cycles in this process.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    ttl_secs: u64,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn SessionStorage>, ttl_secs: u64) -> Self {
        Self { storage, ttl_secs, write_lock: Mutex::new(()) }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `role` authenticated. Replacing the single stored record also
    /// drops the other role's session in the same write.
    pub fn set_role(&self, role: Role) -> Result<Session> {
        let _guard = self.lock();
        let session = Session::issue(role, self.ttl_secs);
        self.storage.save(Some(&session))?;
        log::info!("{} session started (ttl {}s)", role, self.ttl_secs);
        Ok(session)
    }

    /// Removes `role`'s session. A session for the other role is left alone.
    pub fn clear(&self, role: Role) -> Result<()> {
        let _guard = self.lock();
        match self.storage.load() {
            Ok(Some(current)) if current.role == role => {
                self.storage.save(None)?;
                log::info!("{} session cleared", role);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("session storage unreadable, resetting it: {}", e);
                self.storage.save(None)?;
            }
        }
        Ok(())
    }

    /// The live session, if any. Expired or unreadable state counts as none.
    pub fn current(&self) -> Option<Session> {
        match self.storage.load() {
            Ok(Some(session)) if session.is_valid_at(now_secs()) => Some(session),
            Ok(_) => None,
            Err(e) => {
                log::warn!("could not read session state: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self, role: Role) -> bool {
        self.current().is_some_and(|s| s.role == role)
    }
}
