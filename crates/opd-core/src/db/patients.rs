//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{PatientRecord, PatientType, VisitStatus};

const PATIENT_COLUMNS: &str = "id, name, sex, age_group, locality, patient_type, \
     assigned_room, assigned_doctor_id, assigned_doctor, visit_status, \
     created_at, updated_at, visit_date, last_assigned_date";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        sex: row.get(2)?,
        age_group: row.get(3)?,
        locality: row.get(4)?,
        patient_type: PatientType::parse(&row.get::<_, String>(5)?),
        assigned_room: row.get(6)?,
        assigned_doctor_id: row.get(7)?,
        assigned_doctor: row.get(8)?,
        visit_status: VisitStatus::parse(&row.get::<_, String>(9)?),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        visit_date: row.get(12)?,
        last_assigned_date: row.get(13)?,
    })
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &PatientRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, sex, age_group, locality, patient_type,
                assigned_room, assigned_doctor_id, assigned_doctor, visit_status,
                created_at, updated_at, visit_date, last_assigned_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                patient.id,
                patient.name,
                patient.sex,
                patient.age_group,
                patient.locality,
                patient.patient_type.as_str(),
                patient.assigned_room,
                patient.assigned_doctor_id,
                patient.assigned_doctor,
                patient.visit_status.as_str(),
                patient.created_at,
                patient.updated_at,
                patient.visit_date,
                patient.last_assigned_date,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<PatientRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients, oldest registration first.
    pub fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY created_at, id",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List patients currently bound to a room.
    pub fn list_patients_in_room(&self, room_number: &str) -> DbResult<Vec<PatientRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients WHERE assigned_room = ? ORDER BY created_at, id",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([room_number], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Move a patient to a room, replacing the doctor snapshot in the same
    /// statement. The snapshot may only ever change together with the room;
    /// a split update is the one partial state this schema cannot tolerate.
    pub fn update_patient_room(
        &self,
        id: &str,
        room_number: &str,
        doctor_id: Option<&str>,
        doctor_name: Option<&str>,
        stamp: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                assigned_room = ?2,
                assigned_doctor_id = ?3,
                assigned_doctor = ?4,
                updated_at = ?5,
                last_assigned_date = ?5
            WHERE id = ?1
            "#,
            params![id, room_number, doctor_id, doctor_name, stamp],
        )?;
        Ok(rows_affected > 0)
    }

    /// Re-bind an existing patient into today's queue: room plus doctor
    /// snapshot, and the visit resets to pending for the fresh day.
    pub fn rebind_patient_for_today(
        &self,
        id: &str,
        room_number: &str,
        doctor_id: Option<&str>,
        doctor_name: Option<&str>,
        stamp: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                assigned_room = ?2,
                assigned_doctor_id = ?3,
                assigned_doctor = ?4,
                visit_status = 'pending',
                updated_at = ?5,
                last_assigned_date = ?5,
                visit_date = ?5
            WHERE id = ?1
            "#,
            params![id, room_number, doctor_id, doctor_name, stamp],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set a patient's visit status.
    pub fn set_visit_status(&self, id: &str, status: VisitStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET visit_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
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
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = PatientRecord::new("Asha", PatientType::Adult);
        patient.sex = Some("F".into());
        patient.assigned_room = Some("Room 1".into());
        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved, patient);
    }

    #[test]
    fn test_update_room_replaces_snapshot() {
        let db = setup_db();

        let mut patient = PatientRecord::new("Asha", PatientType::Adult);
        patient.assigned_room = Some("Room 1".into());
        patient.assigned_doctor_id = Some("d1".into());
        patient.assigned_doctor = Some("Dr. A".into());
        db.insert_patient(&patient).unwrap();

        db.update_patient_room(&patient.id, "Room 2", Some("d2"), Some("Dr. B"), "2024-03-11T10:00:00+05:30")
            .unwrap();

        let moved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(moved.assigned_room, Some("Room 2".into()));
        assert_eq!(moved.assigned_doctor_id, Some("d2".into()));
        assert_eq!(moved.assigned_doctor, Some("Dr. B".into()));
        assert_eq!(moved.updated_at, "2024-03-11T10:00:00+05:30");
        assert_eq!(moved.last_assigned_date, Some("2024-03-11T10:00:00+05:30".into()));
    }

    #[test]
    fn test_rebind_resets_completion() {
        let db = setup_db();

        let mut patient = PatientRecord::new("Asha", PatientType::Child);
        patient.visit_status = VisitStatus::Completed;
        db.insert_patient(&patient).unwrap();

        db.rebind_patient_for_today(&patient.id, "Room 3", None, None, "2024-03-12T09:00:00+05:30")
            .unwrap();

        let rebound = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(rebound.visit_status, VisitStatus::Pending);
        assert_eq!(rebound.assigned_room, Some("Room 3".into()));
        // Doctor snapshot cleared: nobody holds Room 3 yet
        assert_eq!(rebound.assigned_doctor_id, None);
    }

    #[test]
    fn test_set_visit_status_unknown_patient() {
        let db = setup_db();
        assert!(!db.set_visit_status("missing", VisitStatus::Completed).unwrap());
    }
}
