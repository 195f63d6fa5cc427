//! Patient record models.
//!
//! Only the fields the room/queue subsystem reads or writes live here;
//! clinical proformas, prescriptions and intake records are sibling tables
//! owned by other parts of the system.

use serde::{Deserialize, Serialize};

/// Per-day visit state. One-way: once completed there is no un-completing
/// within the same clinic day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Pending,
    Completed,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Pending => "pending",
            VisitStatus::Completed => "completed",
        }
    }

    /// Parse a stored status; anything unrecognized is treated as pending
    /// (legacy rows carry a few spellings).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" => VisitStatus::Completed,
            _ => VisitStatus::Pending,
        }
    }
}

/// Adult vs child decides which clinical proforma is consulted, not how
/// the queue itself behaves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatientType {
    Adult,
    Child,
}

impl PatientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientType::Adult => "adult",
            PatientType::Child => "child",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "child" | "paediatric" | "pediatric" => PatientType::Child,
            _ => PatientType::Adult,
        }
    }
}

/// A patient record as the queue subsystem sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// UUID, generated at registration
    pub id: String,
    /// Patient name
    pub name: String,
    /// Demographics used by the queue's UI filters
    pub sex: Option<String>,
    pub age_group: Option<String>,
    pub locality: Option<String>,
    /// Adult or child
    pub patient_type: PatientType,
    /// Room the patient is currently bound to, if any (full replace on change)
    pub assigned_room: Option<String>,
    /// Denormalized doctor snapshot; must only ever change in the same
    /// operation as a room change
    pub assigned_doctor_id: Option<String>,
    /// Legacy name-field snapshot of the assigned doctor
    pub assigned_doctor: Option<String>,
    /// Today's visit state
    pub visit_status: VisitStatus,
    /// Registration timestamp; authoritative for "new patient" and FCFS order
    pub created_at: String,
    /// Bumped when an existing patient is pulled into today's queue
    pub updated_at: String,
    /// FCFS fallback when created_at is missing or unreadable
    pub visit_date: Option<String>,
    /// Last time a room was attached; second FCFS fallback
    pub last_assigned_date: Option<String>,
}

impl PatientRecord {
    /// Create a new, unbound patient registered now.
    pub fn new(name: impl Into<String>, patient_type: PatientType) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self::new_at(name, patient_type, now)
    }

    /// Create a new patient with an explicit registration timestamp.
    pub fn new_at(name: impl Into<String>, patient_type: PatientType, created_at: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            sex: None,
            age_group: None,
            locality: None,
            patient_type,
            assigned_room: None,
            assigned_doctor_id: None,
            assigned_doctor: None,
            visit_status: VisitStatus::Pending,
            updated_at: created_at.clone(),
            created_at,
            visit_date: None,
            last_assigned_date: None,
        }
    }

    /// Whether the patient currently has a non-empty room binding.
    pub fn has_room(&self) -> bool {
        self.assigned_room.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Whether any doctor is explicitly named on this record, by id or by
    /// the legacy name field.
    pub fn has_named_doctor(&self) -> bool {
        self.assigned_doctor_id.as_deref().is_some_and(|d| !d.trim().is_empty())
            || self.assigned_doctor.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}
