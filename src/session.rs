use std::{fmt, fs, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::Snapshot;
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub display_name: String,
}

/// A session plus the epoch it was issued under. Every read takes one of
/// these; results carry the epoch back so stale ones can be dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub session: Session,
    pub epoch: u64,
}

impl SessionContext {
    pub fn token(&self) -> &str {
        &self.session.token
    }
}

/// What to do when a read reports an expired token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Drop the stored session immediately.
    AutoLogout,
    /// Keep the session and let the caller decide.
    #[default]
    Surface,
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto-logout" | "auto_logout" | "logout" => Ok(ExpiryPolicy::AutoLogout),
            "surface" => Ok(ExpiryPolicy::Surface),
            other => Err(format!(
                "unknown expiry policy '{other}', expected 'surface' or 'auto-logout'"
            )),
        }
    }
}

/// File-backed token and display name.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.token.trim().is_empty() => Ok(Some(session)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn(Session),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::LoggedOut => "logged out",
            SessionState::Authenticating => "authenticating",
            SessionState::LoggedIn(_) => "logged in",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    /// Issued under an older session; discarded.
    Stale,
    /// Token expired and the policy logged the user out.
    LoggedOut,
}

/// Owns the session lifecycle and the view state derived from it.
#[derive(Debug)]
pub struct SessionController {
    store: SessionStore,
    policy: ExpiryPolicy,
    state: SessionState,
    epoch: u64,
    snapshot: Option<Snapshot>,
    /// Session kept while a re-login is in flight, restored if it fails.
    previous: Option<Session>,
}

impl SessionController {
    pub fn new(store: SessionStore, policy: ExpiryPolicy) -> Self {
        Self {
            store,
            policy,
            state: SessionState::LoggedOut,
            epoch: 0,
            snapshot: None,
            previous: None,
        }
    }

    /// Rehydrates from the store, once at startup.
    pub fn restore(store: SessionStore, policy: ExpiryPolicy) -> Result<Self> {
        let mut controller = Self::new(store, policy);
        if let Some(session) = controller.store.load()? {
            debug!("Restored session for {}", session.display_name);
            controller.enter(SessionState::LoggedIn(session));
        }
        Ok(controller)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn context(&self) -> Option<SessionContext> {
        match &self.state {
            SessionState::LoggedIn(session) => Some(SessionContext {
                session: session.clone(),
                epoch: self.epoch,
            }),
            _ => None,
        }
    }

    pub fn require_context(&self) -> Result<SessionContext> {
        self.context().ok_or(DashboardError::NotLoggedIn)
    }

    /// Starts an exchange. A logged-in session stays on disk until the new
    /// one is saved.
    pub fn begin_login(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Authenticating) {
            SessionState::LoggedOut => Ok(()),
            SessionState::LoggedIn(session) => {
                debug!("Re-authenticating, keeping session for {}", session.display_name);
                self.previous = Some(session);
                Ok(())
            }
            SessionState::Authenticating => Err(self.invalid("begin login")),
        }
    }

    pub fn complete_login(&mut self, token: String, display_name: String) -> Result<SessionContext> {
        if self.state != SessionState::Authenticating {
            return Err(self.invalid("complete login"));
        }

        let session = Session {
            token,
            display_name,
        };
        if let Err(e) = self.store.save(&session) {
            self.restore_previous();
            return Err(e);
        }

        info!("Logged in as {}", session.display_name);
        self.previous = None;
        self.snapshot = None;
        self.enter(SessionState::LoggedIn(session));
        self.require_context()
    }

    /// Back to the state before `begin_login`; returns the error to surface
    /// to the user.
    pub fn fail_login(&mut self, reason: String) -> DashboardError {
        if self.state == SessionState::Authenticating {
            self.restore_previous();
        }
        warn!("Login failed: {reason}");
        DashboardError::AuthFailure(reason)
    }

    /// Clears the persisted session and all derived view state.
    pub fn logout(&mut self) -> Result<()> {
        self.store.clear()?;
        self.snapshot = None;
        self.enter(SessionState::LoggedOut);
        Ok(())
    }

    /// Applies the expiry policy. Returns true when the session was dropped.
    pub fn handle_expired(&mut self) -> Result<bool> {
        match self.policy {
            ExpiryPolicy::AutoLogout => {
                info!("Session expired, logging out");
                self.logout()?;
                Ok(true)
            }
            ExpiryPolicy::Surface => {
                warn!("Session expired; run `login` again");
                Ok(false)
            }
        }
    }

    pub fn accept(&mut self, snapshot: Snapshot) -> Result<SnapshotOutcome> {
        if snapshot.epoch != self.epoch || self.context().is_none() {
            warn!(
                "Discarding snapshot from session epoch {} (current {})",
                snapshot.epoch, self.epoch
            );
            return Ok(SnapshotOutcome::Stale);
        }

        if snapshot.session_expired() && self.handle_expired()? {
            return Ok(SnapshotOutcome::LoggedOut);
        }

        self.snapshot = Some(snapshot);
        Ok(SnapshotOutcome::Applied)
    }

    fn restore_previous(&mut self) {
        self.state = match self.previous.take() {
            Some(session) => SessionState::LoggedIn(session),
            None => SessionState::LoggedOut,
        };
    }

    fn enter(&mut self, state: SessionState) {
        self.state = state;
        self.epoch += 1;
    }

    fn invalid(&self, action: &'static str) -> DashboardError {
        DashboardError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
