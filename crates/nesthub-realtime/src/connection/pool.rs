//! Live-connection pool, one active connection per user.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of all live connections.
///
/// The pool enforces a single active connection per user id: inserting a
/// connection for a user who already has one displaces the prior handle,
/// which is returned so the caller can run the takeover protocol.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → their single active connection.
    by_user: DashMap<Uuid, Arc<ConnectionHandle>>,
    /// Connection ID → handle, for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Create a new empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection, displacing any prior connection for the same
    /// user. Returns the displaced handle, if any.
    pub fn insert(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        self.by_id.insert(handle.id, handle.clone());
        let displaced = self.by_user.insert(handle.user_id, handle);
        if let Some(prev) = &displaced {
            self.by_id.remove(&prev.id);
        }
        displaced
    }

    /// Remove a connection by ID.
    ///
    /// The user entry is only cleared if it still points at this
    /// connection; a displaced connection's late disconnect must not evict
    /// its replacement.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        self.by_user
            .remove_if(&handle.user_id, |_, current| current.id == *conn_id);
        Some(handle)
    }

    /// Look up a connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Look up a user's active connection.
    pub fn get_by_user(&self, user_id: &Uuid) -> Option<Arc<ConnectionHandle>> {
        self.by_user.get(user_id).map(|entry| entry.value().clone())
    }

    /// Whether a user currently has a live connection.
    pub fn is_user_connected(&self, user_id: &Uuid) -> bool {
        self.by_user.contains_key(user_id)
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// All live connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nesthub_entity::user::{FamilyRole, User};
    use tokio::sync::mpsc;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Robin".to_string(),
            role: FamilyRole::Parent,
            family_id: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn handle_for(user: &User) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ConnectionHandle::new(user, tx))
    }

    #[test]
    fn test_insert_displaces_prior_connection() {
        let pool = ConnectionPool::new();
        let user = test_user();
        let first = handle_for(&user);
        let second = handle_for(&user);

        assert!(pool.insert(first.clone()).is_none());
        let displaced = pool.insert(second.clone()).expect("first is displaced");
        assert_eq!(displaced.id, first.id);

        assert_eq!(pool.connection_count(), 1);
        assert_eq!(pool.get_by_user(&user.id).unwrap().id, second.id);
        assert!(pool.get(&first.id).is_none());
    }

    #[test]
    fn test_stale_remove_keeps_replacement() {
        let pool = ConnectionPool::new();
        let user = test_user();
        let first = handle_for(&user);
        let second = handle_for(&user);

        pool.insert(first.clone());
        pool.insert(second.clone());

        // The displaced connection's disconnect arrives late.
        pool.remove(&first.id);
        assert!(pool.is_user_connected(&user.id));
        assert_eq!(pool.get_by_user(&user.id).unwrap().id, second.id);
    }

    #[test]
    fn test_remove_clears_user_entry() {
        let pool = ConnectionPool::new();
        let user = test_user();
        let handle = handle_for(&user);

        pool.insert(handle.clone());
        pool.remove(&handle.id);
        assert!(!pool.is_user_connected(&user.id));
        assert_eq!(pool.connection_count(), 0);
    }
}
