//! Occupancy resolution and room selection.
//!
//! Occupancy is always recomputed from the assignment store at read time;
//! nothing is cached across a day boundary. A row whose assignment time is
//! not today is treated exactly like an unassigned doctor, and is cleared
//! the first time it is observed stale so clock skew cannot resurface it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info};

use crate::clock;
use crate::db::{Database, DbResult};
use crate::models::{MyRoom, Room, RoomOccupant};
use crate::{ClinicError, ClinicResult};

/// The active registry, or the synthesized fallback set when the clinic
/// has no rooms configured at all.
pub(crate) fn registry_rooms(db: &Database) -> DbResult<Vec<Room>> {
    let rooms = db.list_active_rooms()?;
    if rooms.is_empty() {
        Ok(Room::fallback_rooms())
    } else {
        Ok(rooms)
    }
}

/// Read-side resolver over the assignment store.
pub struct Occupancy<'a> {
    db: &'a Database,
}

impl<'a> Occupancy<'a> {
    /// Create a new occupancy resolver.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Current room -> occupying doctor mapping, valid for the clinic-local
    /// day containing `now`. Stale rows encountered along the way are
    /// swept with an optimistic conditional clear.
    pub fn snapshot(&self, now: DateTime<Utc>) -> ClinicResult<BTreeMap<String, RoomOccupant>> {
        let mut occupancy = BTreeMap::new();

        for assignment in self.db.list_assignments()? {
            let (Some(room), Some(time)) = (&assignment.room_number, &assignment.assignment_time)
            else {
                continue;
            };

            if clock::is_today(time, now) {
                occupancy.insert(
                    room.clone(),
                    RoomOccupant {
                        doctor_id: assignment.doctor_id.clone(),
                        doctor_name: assignment.doctor_name.clone(),
                        assignment_time: time.clone(),
                    },
                );
            } else if self.db.clear_assignment_if_time_matches(&assignment.doctor_id, time)? {
                debug!(doctor_id = %assignment.doctor_id, room = %room, "cleared stale assignment");
            }
        }

        Ok(occupancy)
    }

    /// Active rooms not occupied today. A doctor re-opening the selector
    /// still sees the room they themselves hold.
    pub fn available_rooms(
        &self,
        now: DateTime<Utc>,
        viewer_doctor_id: Option<&str>,
    ) -> ClinicResult<Vec<Room>> {
        let occupancy = self.snapshot(now)?;
        let rooms = registry_rooms(self.db)?;

        Ok(rooms
            .into_iter()
            .filter(|room| match occupancy.get(&room.room_number) {
                None => true,
                Some(occupant) => viewer_doctor_id == Some(occupant.doctor_id.as_str()),
            })
            .collect())
    }

    /// The viewer's own current room, if they hold one today. A stale
    /// assignment reads as `None` (the selection UI must re-prompt) and is
    /// cleared on the spot.
    pub fn my_room(&self, doctor_id: &str, now: DateTime<Utc>) -> ClinicResult<Option<MyRoom>> {
        let Some(assignment) = self.db.get_assignment(doctor_id)? else {
            return Ok(None);
        };
        let (Some(room), Some(time)) = (assignment.room_number, assignment.assignment_time) else {
            return Ok(None);
        };

        if clock::is_today(&time, now) {
            Ok(Some(MyRoom {
                room_number: room,
                assignment_time: time,
            }))
        } else {
            self.db.clear_assignment_if_time_matches(doctor_id, &time)?;
            Ok(None)
        }
    }

    /// Claim a room for a doctor for the calendar day of `assignment_time`.
    ///
    /// The collision check and the write run inside one transaction so two
    /// doctors racing for the same room cannot both succeed. Selecting a new
    /// room fully replaces any prior room the doctor held; the doctor's own
    /// stale yesterday-row never blocks (stale rows are logically absent).
    pub fn select_room(
        &self,
        doctor_id: &str,
        doctor_name: &str,
        room_number: &str,
        assignment_time: DateTime<Utc>,
    ) -> ClinicResult<()> {
        let rooms = registry_rooms(self.db)?;
        if !rooms.iter().any(|r| r.room_number == room_number) {
            return Err(ClinicError::RoomNotFound(room_number.to_string()));
        }

        let stamp = assignment_time.to_rfc3339();
        let tx = self.db.transaction()?;

        let holders: Vec<(String, String, Option<String>)> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT doctor_id, doctor_name, assignment_time
                FROM doctor_room_assignments
                WHERE room_number = ?
                "#,
            )?;
            let rows = stmt
                .query_map([room_number], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for (holder_id, holder_name, holder_time) in holders {
            if holder_id == doctor_id {
                continue;
            }
            if let Some(time) = &holder_time {
                if clock::same_calendar_day(time, &stamp) {
                    return Err(ClinicError::RoomAlreadyAssigned {
                        room: room_number.to_string(),
                        occupied_by: holder_name,
                    });
                }
            }
        }

        tx.execute(
            r#"
            INSERT INTO doctor_room_assignments (doctor_id, doctor_name, room_number, assignment_time)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(doctor_id) DO UPDATE SET
                doctor_name = excluded.doctor_name,
                room_number = excluded.room_number,
                assignment_time = excluded.assignment_time,
                updated_at = datetime('now')
            "#,
            params![doctor_id, doctor_name, room_number, stamp],
        )?;
        tx.commit()?;

        info!(doctor_id, room = room_number, "room selected");
        Ok(())
    }

    /// Drop the doctor's current assignment. Idempotent.
    pub fn clear_room(&self, doctor_id: &str) -> ClinicResult<()> {
        if self.db.clear_assignment(doctor_id)? {
            info!(doctor_id, "room cleared");
        }
        Ok(())
    }
}
