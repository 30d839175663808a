//! In-memory table of live runs, keyed by script id.
//!
//! An entry is created when a run is accepted and removed when its
//! [`Registration`] is dropped, which happens once the child process has
//! terminated or the run was cancelled before spawning. At most one entry
//! exists per script id.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;

use crate::prelude::*;

/// Lifecycle state of a registered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for a concurrency permit.
    Queued { cancelled: bool },
    /// Child process is alive; `pid` also names its process group.
    Running { pid: u32 },
}

/// What a stop request found in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTarget {
    NotRegistered,
    /// The run had not spawned yet and will be cancelled before it does.
    Queued,
    Running { pid: u32, token: u64 },
}

#[derive(Debug)]
struct Entry {
    token: u64,
    state: RunState,
}

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_token: AtomicU64,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new run for `id`, rejecting it if one is already registered.
    pub fn reserve(self: &Arc<Self>, id: &str) -> Result<Registration> {
        let mut entries = self.lock();
        if entries.contains_key(id) {
            return Err(Error::AlreadyRunning(String::from(id)));
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            String::from(id),
            Entry {
                token,
                state: RunState::Queued { cancelled: false },
            },
        );
        debug!("Registered run {token} for {id}");
        Ok(Registration {
            registry: Arc::clone(self),
            id: String::from(id),
            token,
        })
    }

    pub fn state(&self, id: &str) -> Option<RunState> {
        self.lock().get(id).map(|entry| entry.state)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Registered script ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up the target of a stop request. Queued runs are flagged as
    /// cancelled here; running ones are left for the caller to signal.
    pub fn request_stop(&self, id: &str) -> StopTarget {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(id) else {
            return StopTarget::NotRegistered;
        };
        match entry.state {
            RunState::Queued { .. } => {
                entry.state = RunState::Queued { cancelled: true };
                StopTarget::Queued
            }
            RunState::Running { pid } => StopTarget::Running {
                pid,
                token: entry.token,
            },
        }
    }

    /// True while the run identified by `token` is still registered under `id`.
    pub fn is_current(&self, id: &str, token: u64) -> bool {
        self.lock()
            .get(id)
            .is_some_and(|entry| entry.token == token)
    }

    fn update<T>(&self, id: &str, token: u64, f: impl FnOnce(&mut Entry) -> T) -> Option<T> {
        let mut entries = self.lock();
        entries
            .get_mut(id)
            .filter(|entry| entry.token == token)
            .map(f)
    }

    fn release(&self, id: &str, token: u64) {
        let mut entries = self.lock();
        if entries.get(id).is_some_and(|entry| entry.token == token) {
            entries.remove(id);
            debug!("Released run {token} for {id}");
        }
    }
}

/// Ownership of a registry entry; dropping it removes the entry.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ProcessRegistry>,
    id: String,
    token: u64,
}

impl Registration {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Whether a stop was requested while the run was queued.
    pub fn is_cancelled(&self) -> bool {
        self.registry
            .update(&self.id, self.token, |entry| {
                matches!(entry.state, RunState::Queued { cancelled: true })
            })
            .unwrap_or(false)
    }

    /// Record the spawned process. Returns true if a stop request arrived
    /// after the last [`Registration::is_cancelled`] check, in which case the
    /// caller must signal the process itself.
    pub fn mark_running(&self, pid: u32) -> bool {
        self.registry
            .update(&self.id, self.token, |entry| {
                let cancelled = matches!(entry.state, RunState::Queued { cancelled: true });
                entry.state = RunState::Running { pid };
                cancelled
            })
            .unwrap_or(false)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(&self.id, self.token);
    }
}
