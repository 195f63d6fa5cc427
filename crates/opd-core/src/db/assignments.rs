//! Doctor room assignment database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::DoctorRoomAssignment;

impl Database {
    /// Insert or replace a doctor's assignment row.
    pub fn upsert_assignment(&self, assignment: &DoctorRoomAssignment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO doctor_room_assignments (doctor_id, doctor_name, room_number, assignment_time)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(doctor_id) DO UPDATE SET
                doctor_name = excluded.doctor_name,
                room_number = excluded.room_number,
                assignment_time = excluded.assignment_time,
                updated_at = datetime('now')
            "#,
            params![
                assignment.doctor_id,
                assignment.doctor_name,
                assignment.room_number,
                assignment.assignment_time,
            ],
        )?;
        Ok(())
    }

    /// Get a doctor's assignment row.
    pub fn get_assignment(&self, doctor_id: &str) -> DbResult<Option<DoctorRoomAssignment>> {
        self.conn
            .query_row(
                r#"
                SELECT doctor_id, doctor_name, room_number, assignment_time
                FROM doctor_room_assignments
                WHERE doctor_id = ?
                "#,
                [doctor_id],
                |row| {
                    Ok(DoctorRoomAssignment {
                        doctor_id: row.get(0)?,
                        doctor_name: row.get(1)?,
                        room_number: row.get(2)?,
                        assignment_time: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List every assignment row that names a room.
    pub fn list_assignments(&self) -> DbResult<Vec<DoctorRoomAssignment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT doctor_id, doctor_name, room_number, assignment_time
            FROM doctor_room_assignments
            WHERE room_number IS NOT NULL
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DoctorRoomAssignment {
                doctor_id: row.get(0)?,
                doctor_name: row.get(1)?,
                room_number: row.get(2)?,
                assignment_time: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Unconditionally clear a doctor's room. The row stays (it is the
    /// doctor's current-state record), only the room and time are dropped.
    pub fn clear_assignment(&self, doctor_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE doctor_room_assignments
            SET room_number = NULL, assignment_time = NULL, updated_at = datetime('now')
            WHERE doctor_id = ? AND room_number IS NOT NULL
            "#,
            [doctor_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Clear a doctor's room only if the row still carries the assignment
    /// time the caller observed. The stale-assignment sweep uses this so it
    /// can never clobber a selection made between the read and the clear.
    pub fn clear_assignment_if_time_matches(
        &self,
        doctor_id: &str,
        expected_time: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE doctor_room_assignments
            SET room_number = NULL, assignment_time = NULL, updated_at = datetime('now')
            WHERE doctor_id = ?1 AND assignment_time = ?2
            "#,
            params![doctor_id, expected_time],
        )?;
        Ok(rows_affected > 0)
    }
}
