//! Session gate: the static-secret login screen and its persisted "logged in" flag.
//!
//! The flag is trusted on read (no expiry, no re-validation). There is no lockout or
//! attempt counter; every wrong password is just an inline error.

use crate::storage::KeyValueStore;

/// Storage key holding `"true"` while authenticated.
pub const SESSION_FLAG_KEY: &str = "isLoggedIn";

/// Error text shown under the password field after a mismatch.
pub const INVALID_PASSWORD: &str = "Invalid password";

const ADMIN_PASSWORD: &str = "*6J^o!kqIXsK^oK#";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid password")]
    Mismatch,
}

/// Decides whether a submitted credential is accepted.
pub trait CredentialCheck {
    fn verify(&self, candidate: &str) -> bool;
}

/// Exact string comparison against a fixed secret.
#[derive(Debug, Clone)]
pub struct StaticSecret {
    secret: String,
}

impl StaticSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Default for StaticSecret {
    /// The compiled-in admin secret.
    fn default() -> Self {
        Self::new(ADMIN_PASSWORD)
    }
}

impl CredentialCheck for StaticSecret {
    fn verify(&self, candidate: &str) -> bool {
        candidate == self.secret
    }
}

/// Login state plus the store it is mirrored into.
pub struct SessionGate<S, C = StaticSecret> {
    store: S,
    credentials: C,
    is_logged_in: bool,
    login_error: String,
}

impl<S: KeyValueStore> SessionGate<S, StaticSecret> {
    /// Gate checking against the compiled-in secret.
    pub fn new(store: S) -> Self {
        Self::with_credentials(store, StaticSecret::default())
    }
}

impl<S: KeyValueStore, C: CredentialCheck> SessionGate<S, C> {
    /// Starts logged out; call [`restore_session`](Self::restore_session) once at start-up.
    pub fn with_credentials(store: S, credentials: C) -> Self {
        Self {
            store,
            credentials,
            is_logged_in: false,
            login_error: String::new(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// Inline error from the last failed login; empty when there is none.
    pub fn login_error(&self) -> &str {
        &self.login_error
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply a previously persisted login. Only the exact value `"true"` counts.
    pub fn restore_session(&mut self) {
        if self.store.get(SESSION_FLAG_KEY).as_deref() == Some("true") {
            log::debug!("restored persisted session");
            self.is_logged_in = true;
        }
    }

    pub fn login(&mut self, password: &str) -> Result<(), AuthError> {
        if !self.credentials.verify(password) {
            log::info!("login rejected");
            self.login_error = INVALID_PASSWORD.to_string();
            return Err(AuthError::Mismatch);
        }
        self.is_logged_in = true;
        self.login_error.clear();
        if let Err(e) = self.store.set(SESSION_FLAG_KEY, "true") {
            log::warn!("login succeeded but the session flag was not persisted: {}", e);
        }
        log::info!("logged in");
        Ok(())
    }

    pub fn logout(&mut self) {
        self.is_logged_in = false;
        if let Err(e) = self.store.remove(SESSION_FLAG_KEY) {
            log::warn!("failed to remove persisted session flag: {}", e);
        }
        log::info!("logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    #[test]
    fn correct_secret_logs_in_and_persists() {
        let mut gate = SessionGate::new(MemoryStore::new());
        gate.login("*6J^o!kqIXsK^oK#").unwrap();
        assert!(gate.is_logged_in());
        assert_eq!(gate.login_error(), "");
        assert_eq!(gate.store().get(SESSION_FLAG_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn wrong_secret_sets_error_and_leaves_store_alone() {
        let mut gate = SessionGate::new(MemoryStore::new());
        for attempt in ["", "admin", "*6J^o!kqIXsK^oK# ", "*6j^o!kqixsk^ok#"] {
            assert_eq!(gate.login(attempt), Err(AuthError::Mismatch));
            assert!(!gate.is_logged_in());
            assert_eq!(gate.login_error(), INVALID_PASSWORD);
        }
        assert_eq!(gate.store().get(SESSION_FLAG_KEY), None);
    }

    #[test]
    fn successful_login_clears_previous_error() {
        let mut gate = SessionGate::new(MemoryStore::new());
        let _ = gate.login("nope");
        assert!(!gate.login_error().is_empty());
        gate.login("*6J^o!kqIXsK^oK#").unwrap();
        assert_eq!(gate.login_error(), "");
    }

    #[test]
    fn logout_clears_memory_and_store() {
        let mut gate = SessionGate::new(MemoryStore::new());
        gate.login("*6J^o!kqIXsK^oK#").unwrap();
        gate.logout();
        assert!(!gate.is_logged_in());

        let store = gate.store().clone();
        assert_eq!(store.get(SESSION_FLAG_KEY), None);
        let mut fresh = SessionGate::new(store);
        fresh.restore_session();
        assert!(!fresh.is_logged_in());
    }

    #[test]
    fn restore_requires_exact_true() {
        for (value, expected) in [("true", true), ("TRUE", false), ("1", false), ("", false)] {
            let mut store = MemoryStore::new();
            store.set(SESSION_FLAG_KEY, value).unwrap();
            let mut gate = SessionGate::new(store);
            gate.restore_session();
            assert_eq!(gate.is_logged_in(), expected, "value {:?}", value);
        }
    }

    #[test]
    fn injected_credentials_replace_the_static_secret() {
        let mut gate =
            SessionGate::with_credentials(MemoryStore::new(), StaticSecret::new("hunter2"));
        assert!(gate.login("*6J^o!kqIXsK^oK#").is_err());
        gate.login("hunter2").unwrap();
        assert!(gate.is_logged_in());
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "read-only".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.set(key, "")
        }
    }

    #[test]
    fn storage_failure_does_not_block_login_or_logout() {
        let mut gate = SessionGate::new(ReadOnlyStore);
        gate.login("*6J^o!kqIXsK^oK#").unwrap();
        assert!(gate.is_logged_in());
        gate.logout();
        assert!(!gate.is_logged_in());
    }
}
