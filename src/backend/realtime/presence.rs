//! Presence Tracker
//!
//! In-memory mapping of identity to its set of live transport connections.
//! An identity is online iff it has at least one connection; multiple
//! simultaneous connections (multi-tab, multi-device) are expected, and
//! closing one must not flip the identity offline while others remain.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug)]
struct PresenceEntry {
    connections: HashSet<Uuid>,
    last_seen: DateTime<Utc>,
}

/// Tracks which identities currently hold live connections
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    inner: Arc<Mutex<HashMap<Uuid, PresenceEntry>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for an identity.
    ///
    /// Returns `true` when this was the identity's first live connection,
    /// i.e. the identity just came online.
    pub fn register_connection(&self, identity_id: Uuid, connection_id: Uuid) -> bool {
        let mut map = self.inner.lock().unwrap();
        let entry = map.entry(identity_id).or_insert_with(|| PresenceEntry {
            connections: HashSet::new(),
            last_seen: Utc::now(),
        });
        let came_online = entry.connections.is_empty();
        entry.connections.insert(connection_id);
        entry.last_seen = Utc::now();
        came_online
    }

    /// Remove a connection wherever it is registered.
    ///
    /// Returns the identity that just went offline, if removing this
    /// connection emptied its connection set.
    pub fn remove_connection(&self, connection_id: Uuid) -> Option<Uuid> {
        let mut map = self.inner.lock().unwrap();
        let mut went_offline = None;
        for (identity, entry) in map.iter_mut() {
            if entry.connections.remove(&connection_id) {
                entry.last_seen = Utc::now();
                if entry.connections.is_empty() {
                    went_offline = Some(*identity);
                }
                break;
            }
        }
        if let Some(identity) = went_offline {
            map.remove(&identity);
        }
        went_offline
    }

    /// Whether an identity currently has at least one live connection
    pub fn is_online(&self, identity_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap()
            .get(&identity_id)
            .map(|entry| !entry.connections.is_empty())
            .unwrap_or(false)
    }

    /// Snapshot of every online identity
    pub fn online_snapshot(&self) -> HashSet<Uuid> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, entry)| !entry.connections.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Last time the identity's connection set changed, while it is online
    pub fn last_seen(&self, identity_id: Uuid) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .unwrap()
            .get(&identity_id)
            .map(|entry| entry.last_seen)
    }
}
