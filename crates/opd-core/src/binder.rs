//! Patient-room binding and the doctor-change cascade.
//!
//! The patient row carries a denormalized doctor snapshot (legacy query
//! shape). Invariant: the snapshot only ever changes in the same statement
//! or transaction as the room it was derived from. The reassignment
//! cascade is the one multi-row write in the subsystem and runs as a
//! single transaction.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::info;

use crate::clock;
use crate::db::Database;
use crate::models::{PatientRecord, RoomOccupant, VisitStatus};
use crate::occupancy::{registry_rooms, Occupancy};
use crate::{ClinicError, ClinicResult};

/// Writes room bindings into patient records.
pub struct Binder<'a> {
    db: &'a Database,
}

impl<'a> Binder<'a> {
    /// Create a new binder.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn validate_room(&self, room_number: &str) -> ClinicResult<()> {
        let rooms = registry_rooms(self.db)?;
        if rooms.iter().any(|r| r.room_number == room_number) {
            Ok(())
        } else {
            Err(ClinicError::InvalidRoom(room_number.to_string()))
        }
    }

    fn occupant_of(&self, room_number: &str, now: DateTime<Utc>) -> ClinicResult<Option<RoomOccupant>> {
        Ok(Occupancy::new(self.db).snapshot(now)?.remove(room_number))
    }

    /// Bind a room at registration time and insert the patient. Binding to
    /// a room nobody holds yet is allowed; the patient waits for a doctor
    /// to claim it.
    pub fn bind_on_create(
        &self,
        mut patient: PatientRecord,
        room_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> ClinicResult<PatientRecord> {
        if let Some(room) = room_number {
            self.validate_room(room)?;
            let occupant = self.occupant_of(room, now)?;

            patient.assigned_room = Some(room.to_string());
            patient.assigned_doctor_id = occupant.as_ref().map(|o| o.doctor_id.clone());
            patient.assigned_doctor = occupant.map(|o| o.doctor_name);
            patient.last_assigned_date = Some(now.to_rfc3339());
        }

        self.db.insert_patient(&patient)?;
        info!(patient_id = %patient.id, room = ?patient.assigned_room, "patient registered");
        Ok(patient)
    }

    /// Pull a previously-registered patient into today's queue. Bumping
    /// `updated_at` is what makes the queue builder pick the record up
    /// without a separate visit table; the visit resets to pending.
    ///
    /// A visit completed earlier *today* stays completed: re-adding then
    /// only moves the room. The pending reset is for returns on a later
    /// day.
    pub fn add_existing_to_today(
        &self,
        patient_id: &str,
        room_number: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<()> {
        self.validate_room(room_number)?;
        let Some(existing) = self.db.get_patient(patient_id)? else {
            return Err(ClinicError::PatientNotFound(patient_id.to_string()));
        };
        let occupant = self.occupant_of(room_number, now)?;
        let stamp = now.to_rfc3339();

        let completed_today = existing.visit_status == VisitStatus::Completed
            && (clock::is_today(&existing.created_at, now)
                || clock::is_today(&existing.updated_at, now)
                || existing
                    .visit_date
                    .as_deref()
                    .is_some_and(|d| clock::is_today(d, now)));

        let updated = if completed_today {
            self.db.update_patient_room(
                patient_id,
                room_number,
                occupant.as_ref().map(|o| o.doctor_id.as_str()),
                occupant.as_ref().map(|o| o.doctor_name.as_str()),
                &stamp,
            )?
        } else {
            self.db.rebind_patient_for_today(
                patient_id,
                room_number,
                occupant.as_ref().map(|o| o.doctor_id.as_str()),
                occupant.as_ref().map(|o| o.doctor_name.as_str()),
                &stamp,
            )?
        };
        if !updated {
            return Err(ClinicError::PatientNotFound(patient_id.to_string()));
        }

        info!(patient_id, room = room_number, "patient added to today's queue");
        Ok(())
    }

    /// Move a single patient to a different room. The patient's doctor
    /// becomes whoever occupies the new room right now, possibly nobody.
    pub fn change_room(
        &self,
        patient_id: &str,
        new_room: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<()> {
        self.validate_room(new_room)?;
        let occupant = self.occupant_of(new_room, now)?;

        let updated = self.db.update_patient_room(
            patient_id,
            new_room,
            occupant.as_ref().map(|o| o.doctor_id.as_str()),
            occupant.as_ref().map(|o| o.doctor_name.as_str()),
            &now.to_rfc3339(),
        )?;
        if !updated {
            return Err(ClinicError::PatientNotFound(patient_id.to_string()));
        }

        info!(patient_id, room = new_room, "patient moved");
        Ok(())
    }

    /// Administratively move a doctor to a new room and re-point every
    /// patient bound to the old room today. One transaction: a reader can
    /// never observe the doctor moved with the patients left behind.
    ///
    /// Returns the number of patients moved, computed from current state at
    /// execution time so a retried call moves only what is still true. An
    /// existing same-day holder of the new room is displaced (admin action
    /// wins), unlike `select_room` which rejects.
    pub fn change_doctor_room(
        &self,
        doctor_id: &str,
        doctor_name: &str,
        new_room: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<usize> {
        let rooms = registry_rooms(self.db)?;
        if !rooms.iter().any(|r| r.room_number == new_room) {
            return Err(ClinicError::RoomNotFound(new_room.to_string()));
        }

        let stamp = now.to_rfc3339();
        let tx = self.db.transaction()?;

        let old_room: Option<String> = {
            let mut stmt = tx.prepare(
                "SELECT room_number FROM doctor_room_assignments WHERE doctor_id = ?",
            )?;
            let mut rows = stmt.query([doctor_id])?;
            match rows.next()? {
                Some(row) => row.get(0)?,
                None => None,
            }
        };

        // Displace any other doctor holding the new room today
        let holders: Vec<(String, Option<String>)> = {
            let mut stmt = tx.prepare(
                "SELECT doctor_id, assignment_time FROM doctor_room_assignments WHERE room_number = ?",
            )?;
            let rows = stmt
                .query_map([new_room], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        for (holder_id, holder_time) in holders {
            if holder_id == doctor_id {
                continue;
            }
            let same_day = holder_time
                .as_deref()
                .is_some_and(|t| clock::same_calendar_day(t, &stamp));
            if same_day {
                tx.execute(
                    r#"
                    UPDATE doctor_room_assignments
                    SET room_number = NULL, assignment_time = NULL, updated_at = datetime('now')
                    WHERE doctor_id = ?
                    "#,
                    [&holder_id],
                )?;
            }
        }

        // Move the doctor's own assignment
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
            params![doctor_id, doctor_name, new_room, stamp],
        )?;

        // Re-point the old room's patients, today only. The read runs on
        // the transaction's connection, so it sees the writes above.
        let mut moved = 0usize;
        if let Some(old_room) = old_room.filter(|r| r != new_room) {
            for patient in self.db.list_patients_in_room(&old_room)? {
                let today = clock::is_today(&patient.created_at, now)
                    || clock::is_today(&patient.updated_at, now);
                if !today {
                    continue;
                }
                tx.execute(
                    r#"
                    UPDATE patients SET
                        assigned_room = ?2,
                        assigned_doctor_id = ?3,
                        assigned_doctor = ?4,
                        updated_at = ?5,
                        last_assigned_date = ?5
                    WHERE id = ?1
                    "#,
                    params![patient.id, new_room, doctor_id, doctor_name, stamp],
                )?;
                moved += 1;
            }
        }

        tx.commit()?;
        info!(doctor_id, room = new_room, patients_moved = moved, "doctor room changed");
        Ok(moved)
    }

    /// Mark today's visit completed. Terminal for the day; completing an
    /// already-completed visit is a no-op so client retries are safe.
    pub fn complete_visit(&self, patient_id: &str, now: DateTime<Utc>) -> ClinicResult<()> {
        let Some(patient) = self.db.get_patient(patient_id)? else {
            return Err(ClinicError::NoActiveVisit(patient_id.to_string()));
        };

        let has_visit_today = clock::is_today(&patient.created_at, now)
            || (clock::is_today(&patient.updated_at, now) && patient.has_room());
        if !has_visit_today {
            return Err(ClinicError::NoActiveVisit(patient_id.to_string()));
        }

        if patient.visit_status == VisitStatus::Completed {
            return Ok(());
        }

        self.db.set_visit_status(patient_id, VisitStatus::Completed)?;
        info!(patient_id, "visit completed");
        Ok(())
    }
}
