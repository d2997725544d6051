//! # Registration Storage
//!
//! Session-scoped storage of registrations, keyed by handle. Stored
//! registrations are shared behind `Arc` and never mutated in place, so
//! concurrent requests on the same handle read the same immutable value.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::errors::{DataTablesError, DataTablesResult};
use super::registration::{Handle, Registration, SessionId};

/// Storage collaborator for registrations
pub trait RegistrationStore: Send + Sync {
    /// Store a registration, replacing any with the same session and handle
    fn put(&self, registration: Arc<Registration>) -> DataTablesResult<()>;

    fn get(&self, session: &SessionId, handle: &Handle)
        -> DataTablesResult<Option<Arc<Registration>>>;

    /// Remove one registration; returns whether it existed
    fn remove(&self, session: &SessionId, handle: &Handle) -> DataTablesResult<bool>;

    /// Drop every registration of a session; returns how many were dropped
    fn invalidate_session(&self, session: &SessionId) -> DataTablesResult<usize>;

    /// Registrations of a session, in no particular order
    fn list(&self, session: &SessionId) -> DataTablesResult<Vec<Arc<Registration>>>;
}

/// In-process registration store
///
/// Entries live until their session is invalidated; nothing expires on its own.
#[derive(Debug, Default)]
pub struct MemoryRegistrationStore {
    sessions: RwLock<HashMap<SessionId, HashMap<Handle, Arc<Registration>>>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions holding at least one registration
    pub fn session_count(&self) -> DataTablesResult<usize> {
        Ok(self.sessions.read().map_err(|_| poisoned())?.len())
    }
}

fn poisoned() -> DataTablesError {
    DataTablesError::Internal("Lock poisoned".to_string())
}

impl RegistrationStore for MemoryRegistrationStore {
    fn put(&self, registration: Arc<Registration>) -> DataTablesResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions
            .entry(registration.session().clone())
            .or_default()
            .insert(registration.handle().clone(), registration);
        Ok(())
    }

    fn get(
        &self,
        session: &SessionId,
        handle: &Handle,
    ) -> DataTablesResult<Option<Arc<Registration>>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions
            .get(session)
            .and_then(|registrations| registrations.get(handle))
            .cloned())
    }

    fn remove(&self, session: &SessionId, handle: &Handle) -> DataTablesResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let Some(registrations) = sessions.get_mut(session) else {
            return Ok(false);
        };

        let removed = registrations.remove(handle).is_some();
        if registrations.is_empty() {
            sessions.remove(session);
        }
        Ok(removed)
    }

    fn invalidate_session(&self, session: &SessionId) -> DataTablesResult<usize> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        Ok(sessions.remove(session).map(|r| r.len()).unwrap_or(0))
    }

    fn list(&self, session: &SessionId) -> DataTablesResult<Vec<Arc<Registration>>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions
            .get(session)
            .map(|registrations| registrations.values().cloned().collect())
            .unwrap_or_default())
    }
}
