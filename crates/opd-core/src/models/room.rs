//! Room registry models.

use serde::{Deserialize, Serialize};

/// How many rooms the synthesized fallback registry contains.
pub const FALLBACK_ROOM_COUNT: u32 = 10;

/// A physical consultation room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    /// Unique room key, e.g. "Room 3"
    pub room_number: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Inactive rooms are hidden from selection but never deleted
    pub is_active: bool,
}

impl Room {
    /// Create a new active room.
    pub fn new(room_number: impl Into<String>) -> Self {
        Self {
            room_number: room_number.into(),
            description: None,
            is_active: true,
        }
    }

    /// Synthesized default registry ("Room 1".."Room 10").
    ///
    /// Used when the configured registry is empty so the clinic is never
    /// blocked from operating on missing configuration.
    pub fn fallback_rooms() -> Vec<Room> {
        (1..=FALLBACK_ROOM_COUNT)
            .map(|n| Room::new(format!("Room {}", n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_is_active() {
        let room = Room::new("Room 3");
        assert_eq!(room.room_number, "Room 3");
        assert!(room.is_active);
    }

    #[test]
    fn test_fallback_rooms() {
        let rooms = Room::fallback_rooms();
        assert_eq!(rooms.len(), 10);
        assert_eq!(rooms[0].room_number, "Room 1");
        assert_eq!(rooms[9].room_number, "Room 10");
        assert!(rooms.iter().all(|r| r.is_active));
    }
}
