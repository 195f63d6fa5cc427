//! Daily queue builder.
//!
//! A pure function of all patients + today + viewer role + occupancy.
//! Pipeline, in order: dedup, date filter, counts, completion filter,
//! role visibility, UI field filters, FCFS sort. No database access; the
//! service layer feeds it.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::models::{PatientRecord, Role, RoomOccupant, VisitStatus};

/// Who is asking for the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Viewer {
    pub user_id: String,
    /// Display name; the legacy doctor snapshot sometimes carries only a
    /// name, so visibility matches on it too
    pub user_name: String,
    pub role: Role,
}

/// Field filters applied by the queue UI. All optional; applied after role
/// filtering so the visible counts reflect the filtered set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueFilters {
    pub sex: Option<String>,
    pub age_group: Option<String>,
    pub locality: Option<String>,
}

/// New/existing breakdown for today.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub total: usize,
    pub new: usize,
    pub existing: usize,
}

/// The ordered, role-filtered queue plus its counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyQueue {
    pub patients: Vec<PatientRecord>,
    pub counts: QueueCounts,
}

/// A patient belongs to today iff registered today, or re-added to a room
/// today. An unrelated same-day update without a room must not qualify.
fn in_today(patient: &PatientRecord, now: DateTime<Utc>) -> bool {
    clock::is_today(&patient.created_at, now)
        || (clock::is_today(&patient.updated_at, now) && patient.has_room())
}

/// FCFS ordering instant: registration time, falling back to visit date,
/// then last room attachment. `None` sorts last.
fn fcfs_instant(patient: &PatientRecord) -> Option<DateTime<FixedOffset>> {
    clock::parse_timestamp(&patient.created_at)
        .or_else(|| patient.visit_date.as_deref().and_then(clock::parse_timestamp))
        .or_else(|| {
            patient
                .last_assigned_date
                .as_deref()
                .and_then(clock::parse_timestamp)
        })
}

fn visible_to(
    patient: &PatientRecord,
    viewer: &Viewer,
    occupancy: &BTreeMap<String, RoomOccupant>,
    now: DateTime<Utc>,
) -> bool {
    if viewer.role.sees_all() {
        return true;
    }
    if !viewer.role.is_clinical() {
        // Deny by default
        return false;
    }

    // Explicit assignment to the viewer, by id or by the legacy name field
    if patient.assigned_doctor_id.as_deref() == Some(viewer.user_id.as_str()) {
        return true;
    }
    if !viewer.user_name.is_empty()
        && patient.assigned_doctor.as_deref() == Some(viewer.user_name.as_str())
    {
        return true;
    }

    // Explicit assignment to a named, different doctor wins over room
    // co-location: the patient is hidden
    if patient.has_named_doctor() {
        return false;
    }

    // Unclaimed walk-in in a room the viewer occupies, created or updated today
    let in_viewers_room = patient
        .assigned_room
        .as_deref()
        .and_then(|room| occupancy.get(room))
        .is_some_and(|occupant| occupant.doctor_id == viewer.user_id);
    in_viewers_room
        && (clock::is_today(&patient.created_at, now) || clock::is_today(&patient.updated_at, now))
}

fn matches_filters(patient: &PatientRecord, filters: &QueueFilters) -> bool {
    let field_eq = |value: &Option<String>, wanted: &Option<String>| match wanted {
        None => true,
        Some(w) => value
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case(w.trim())),
    };

    if !field_eq(&patient.sex, &filters.sex) {
        return false;
    }
    if !field_eq(&patient.age_group, &filters.age_group) {
        return false;
    }
    match &filters.locality {
        None => true,
        Some(wanted) => patient
            .locality
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(&wanted.trim().to_lowercase())),
    }
}

/// Build today's queue for a viewer.
pub fn build_daily_queue(
    patients: &[PatientRecord],
    occupancy: &BTreeMap<String, RoomOccupant>,
    viewer: &Viewer,
    filters: &QueueFilters,
    now: DateTime<Utc>,
) -> DailyQueue {
    // 1. Dedup by id (upstream pagination merges can repeat rows),
    // 2. keep today's patients
    let mut seen = HashSet::new();
    let todays: Vec<&PatientRecord> = patients
        .iter()
        .filter(|p| seen.insert(p.id.as_str()) && in_today(p, now))
        .collect();

    // Counts come from the post-date-filter, pre-completion set, classified
    // against the same clinic-local day window the list uses
    let (day_start, day_end) = clock::day_bounds(now);
    let new = todays
        .iter()
        .filter(|p| {
            clock::parse_timestamp(&p.created_at)
                .map(|t| t.with_timezone(&Utc))
                .is_some_and(|t| day_start <= t && t < day_end)
        })
        .count();
    let counts = QueueCounts {
        total: todays.len(),
        new,
        existing: todays.len() - new,
    };

    // 3. Completed visits leave the queue (the record itself survives)
    // 4. Role visibility
    // 5. UI field filters
    let mut visible: Vec<&PatientRecord> = todays
        .into_iter()
        .filter(|p| p.visit_status != VisitStatus::Completed)
        .filter(|p| visible_to(p, viewer, occupancy, now))
        .filter(|p| matches_filters(p, filters))
        .collect();

    // 6. First-come-first-served, stable across re-renders: timestamp then id
    visible.sort_by(|a, b| {
        let ka = (fcfs_instant(a).is_none(), fcfs_instant(a));
        let kb = (fcfs_instant(b).is_none(), fcfs_instant(b));
        ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
    });

    DailyQueue {
        patients: visible.into_iter().cloned().collect(),
        counts,
    }
}
