//! Room membership registry for fan-out.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use super::handle::ConnectionId;

/// In-memory map of room id → connections currently joined to it.
///
/// Membership here is session-scoped: it records who is joined over the
/// live connection, not the persistent room membership rows.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<Uuid, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room.
    pub fn add(&self, room_id: Uuid, conn_id: ConnectionId) {
        self.rooms.entry(room_id).or_default().insert(conn_id);
    }

    /// Remove a connection from a room. Empty rooms are dropped.
    pub fn remove(&self, room_id: &Uuid, conn_id: &ConnectionId) -> bool {
        let Some(mut members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(conn_id);
        let empty = members.is_empty();
        drop(members);
        if empty {
            self.rooms.remove_if(room_id, |_, members| members.is_empty());
        }
        removed
    }

    /// Remove a connection from every room it joined, returning the room
    /// ids it was a member of.
    pub fn remove_connection(&self, conn_id: &ConnectionId) -> Vec<Uuid> {
        let mut left = Vec::new();
        for entry in self.rooms.iter() {
            if entry.value().contains(conn_id) {
                left.push(*entry.key());
            }
        }
        for room_id in &left {
            self.remove(room_id, conn_id);
        }
        left
    }

    /// Whether a connection is joined to a room.
    pub fn contains(&self, room_id: &Uuid, conn_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .map(|members| members.contains(conn_id))
            .unwrap_or(false)
    }

    /// Snapshot of a room's member connection ids.
    pub fn members(&self, room_id: &Uuid) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_membership() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let conn = Uuid::new_v4();

        registry.add(room, conn);
        assert!(registry.contains(&room, &conn));
        assert!(registry.remove(&room, &conn));
        assert!(!registry.contains(&room, &conn));
        // Empty room is reclaimed.
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_remove_connection_leaves_all_rooms() {
        let registry = RoomRegistry::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();

        registry.add(room_a, conn);
        registry.add(room_b, conn);
        registry.add(room_b, other);

        let mut left = registry.remove_connection(&conn);
        left.sort();
        let mut expected = vec![room_a, room_b];
        expected.sort();
        assert_eq!(left, expected);

        assert!(!registry.contains(&room_b, &conn));
        assert!(registry.contains(&room_b, &other));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_remove_from_unknown_room() {
        let registry = RoomRegistry::new();
        assert!(!registry.remove(&Uuid::new_v4(), &Uuid::new_v4()));
    }
}
