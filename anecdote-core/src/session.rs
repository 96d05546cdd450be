//! Session store: who is using the app right now.
//!
//! Exactly one [`User`] is active at a time. It is written to durable
//! storage under [`SESSION_KEY`] as soon as it is created and replaced
//! wholesale on the next login.

use crate::error::ValidationError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key holding the serialized active user.
pub const SESSION_KEY: &str = "session";

/// Display name used for guest sessions.
pub const GUEST_NAME: &str = "Guest";

/// The identity history is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub is_guest: bool,
}

impl User {
    /// A named user. The name is trimmed and must not be empty.
    pub fn named(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            is_guest: false,
        })
    }

    /// The guest identity.
    pub fn guest() -> Self {
        Self {
            name: GUEST_NAME.to_string(),
            is_guest: true,
        }
    }

    /// Name to show in the interface.
    pub fn display_name(&self) -> &str {
        if self.is_guest {
            GUEST_NAME
        } else {
            &self.name
        }
    }

    fn is_well_formed(&self) -> bool {
        self.is_guest || !self.name.trim().is_empty()
    }
}

/// Owns the active user and its durable record.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    current: Option<User>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            current: None,
        }
    }

    /// The active user, if anyone is logged in.
    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Log in under `name`, replacing any prior session.
    pub fn login(&mut self, name: &str) -> Result<&User, ValidationError> {
        let user = User::named(name)?;
        Ok(self.activate(user))
    }

    /// Log in as the guest.
    pub fn login_as_guest(&mut self) -> &User {
        self.activate(User::guest())
    }

    /// Forget the active user, in memory and in storage.
    pub fn logout(&mut self) {
        self.current = None;
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "failed to clear stored session");
        }
    }

    /// Resume the session stored by a previous run.
    ///
    /// An already active session is kept as is, even when it could not be
    /// written to storage. Otherwise a missing, unreadable or corrupt record
    /// yields no session. Corrupt records are left in place.
    pub fn restore(&mut self) -> Option<&User> {
        if self.current.is_some() {
            return self.current.as_ref();
        }
        self.current = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) if user.is_well_formed() => Some(user),
                Ok(_) => {
                    warn!("stored session has an empty name; ignoring it");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "stored session is corrupt; ignoring it");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to read stored session");
                None
            }
        };
        self.current.as_ref()
    }

    fn activate(&mut self, user: User) -> &User {
        match serde_json::to_string(&user) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(SESSION_KEY, &raw) {
                    warn!(error = %e, "failed to persist session; continuing in memory");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session"),
        }
        debug!(user = %user.display_name(), guest = user.is_guest, "session started");
        self.current.insert(user)
    }
}
