//! Room registry database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Room;

impl Database {
    /// Insert or update a room.
    pub fn upsert_room(&self, room: &Room) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO rooms (room_number, description, is_active)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(room_number) DO UPDATE SET
                description = excluded.description,
                is_active = excluded.is_active,
                updated_at = datetime('now')
            "#,
            params![room.room_number, room.description, room.is_active as i64],
        )?;
        Ok(())
    }

    /// Get a room by number.
    pub fn get_room(&self, room_number: &str) -> DbResult<Option<Room>> {
        self.conn
            .query_row(
                "SELECT room_number, description, is_active FROM rooms WHERE room_number = ?",
                [room_number],
                |row| {
                    Ok(Room {
                        room_number: row.get(0)?,
                        description: row.get(1)?,
                        is_active: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List active rooms in natural "Room N" order.
    pub fn list_active_rooms(&self) -> DbResult<Vec<Room>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT room_number, description, is_active
            FROM rooms
            WHERE is_active = 1
            ORDER BY LENGTH(room_number), room_number
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Room {
                room_number: row.get(0)?,
                description: row.get(1)?,
                is_active: row.get::<_, i64>(2)? != 0,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Activate or deactivate a room. Rooms are never deleted while
    /// historical assignments may reference them.
    pub fn set_room_active(&self, room_number: &str, active: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE rooms SET is_active = ?2, updated_at = datetime('now') WHERE room_number = ?1",
            params![room_number, active as i64],
        )?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup_db();

        let mut room = Room::new("Room 3");
        room.description = Some("Child OPD".into());
        db.upsert_room(&room).unwrap();

        let retrieved = db.get_room("Room 3").unwrap().unwrap();
        assert_eq!(retrieved.description, Some("Child OPD".into()));
        assert!(retrieved.is_active);

        // Upsert replaces
        room.description = Some("Adult OPD".into());
        db.upsert_room(&room).unwrap();
        let retrieved = db.get_room("Room 3").unwrap().unwrap();
        assert_eq!(retrieved.description, Some("Adult OPD".into()));
    }

    #[test]
    fn test_list_active_natural_order() {
        let db = setup_db();
        for n in [10, 2, 1] {
            db.upsert_room(&Room::new(format!("Room {}", n))).unwrap();
        }

        let rooms = db.list_active_rooms().unwrap();
        let numbers: Vec<&str> = rooms.iter().map(|r| r.room_number.as_str()).collect();
        assert_eq!(numbers, vec!["Room 1", "Room 2", "Room 10"]);
    }

    #[test]
    fn test_deactivated_room_hidden() {
        let db = setup_db();
        db.upsert_room(&Room::new("Room 1")).unwrap();
        db.upsert_room(&Room::new("Room 2")).unwrap();

        assert!(db.set_room_active("Room 2", false).unwrap());

        let rooms = db.list_active_rooms().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_number, "Room 1");

        // Still present, just inactive
        let room = db.get_room("Room 2").unwrap().unwrap();
        assert!(!room.is_active);
    }
}
