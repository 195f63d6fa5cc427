//! OPD Core Library
//!
//! Server-owned core for an outpatient clinic's room assignment and daily
//! patient queue.
//!
//! # Architecture
//!
//! ```text
//!  Room Registry        Assignment Store
//!       │  (rooms)            │  (one row per doctor)
//!       └────────┬────────────┘
//!                ▼
//!        Occupancy Resolver ──── room -> doctor, valid for today only;
//!                │               stale rows cleared lazily on read
//!        ┌───────┴────────┐
//!        ▼                ▼
//!  Room Selection    Daily Queue Builder ◄── patients (created/updated today)
//!  (available/my)         │
//!                         ▼
//!              ordered, role-filtered FCFS queue + counts
//! ```
//!
//! # Core principle
//!
//! **There is no midnight job.** "Daily reset" is computed lazily and
//! idempotently on every read by comparing stored timestamps against the
//! clinic-local calendar day (fixed UTC+05:30). Every derived view is cheap
//! to recompute from scratch; nothing is incrementally maintained.
//!
//! # Modules
//!
//! - [`clock`]: clinic-local calendar day resolution
//! - [`db`]: SQLite storage layer
//! - [`models`]: domain types (Room, DoctorRoomAssignment, PatientRecord, Role)
//! - [`occupancy`]: occupancy resolver and room selection
//! - [`binder`]: patient-room binding and the doctor-change cascade
//! - [`queue`]: the pure daily queue builder

pub mod binder;
pub mod clock;
pub mod db;
pub mod models;
pub mod occupancy;
pub mod queue;

// Re-export commonly used types
pub use binder::Binder;
pub use db::Database;
pub use models::{
    DoctorRoomAssignment, MyRoom, PatientRecord, PatientType, Role, Room, RoomOccupant,
    VisitStatus,
};
pub use occupancy::Occupancy;
pub use queue::{build_daily_queue, DailyQueue, QueueCounts, QueueFilters, Viewer};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =========================================================================
// Error Type
// =========================================================================

/// Domain errors surfaced to callers as typed, user-displayable conditions.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("{room} is already assigned to {occupied_by} for today")]
    RoomAlreadyAssigned { room: String, occupied_by: String },

    #[error("Invalid room: {0}")]
    InvalidRoom(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("No visit found today for patient {0}")]
    NoActiveVisit(String),

    #[error("Not authorized for this action")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl From<rusqlite::Error> for ClinicError {
    fn from(e: rusqlite::Error) -> Self {
        ClinicError::Database(db::DbError::Sqlite(e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::LockPoisoned(e.to_string())
    }
}

// =========================================================================
// Stale-view signalling
// =========================================================================

/// Views dependent clients poll; any mutation bumps the generations of the
/// views it invalidates, and a poller refetches when a generation moved.
#[derive(Debug, Default)]
struct ViewGenerations {
    occupancy: AtomicU64,
    queue: AtomicU64,
    my_room: AtomicU64,
}

/// Snapshot of the per-view generation counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewStamps {
    pub occupancy: u64,
    pub queue: u64,
    pub my_room: u64,
}

// =========================================================================
// Service surface
// =========================================================================

/// Response shape of the available-rooms view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomAvailability {
    /// Rooms open for selection (the viewer's own room stays listed)
    pub rooms: Vec<Room>,
    /// Today's patient count per room
    pub distribution_today: BTreeMap<String, usize>,
    /// Current room -> doctor mapping
    pub occupied_rooms: BTreeMap<String, RoomOccupant>,
}

/// Thread-safe service object over the clinic database. What an HTTP layer
/// would hold and call; every operation is a single round trip, safe to
/// retry, and recomputes freshness on the way in.
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
    views: ViewGenerations,
}

impl ClinicCore {
    /// Open or create a clinic database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> ClinicResult<Self> {
        Ok(Self::wrap(Database::open(path)?))
    }

    /// Create an in-memory instance (for testing).
    pub fn open_in_memory() -> ClinicResult<Self> {
        Ok(Self::wrap(Database::open_in_memory()?))
    }

    fn wrap(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            views: ViewGenerations::default(),
        }
    }

    /// Every mutation marks all three views stale: assignment changes feed
    /// the queue's doctor derivation, and patient bindings feed the
    /// per-room distribution the occupancy view reports.
    fn invalidate_views(&self) {
        self.views.occupancy.fetch_add(1, Ordering::Relaxed);
        self.views.my_room.fetch_add(1, Ordering::Relaxed);
        self.views.queue.fetch_add(1, Ordering::Relaxed);
    }

    /// Current stale-view generations. Pollers compare against their last
    /// seen stamps and refetch what moved.
    pub fn view_stamps(&self) -> ViewStamps {
        ViewStamps {
            occupancy: self.views.occupancy.load(Ordering::Relaxed),
            queue: self.views.queue.load(Ordering::Relaxed),
            my_room: self.views.my_room.load(Ordering::Relaxed),
        }
    }

    // =====================================================================
    // Room administration
    // =====================================================================

    /// Create or update a room. Admin only.
    pub fn upsert_room(&self, role: Role, room: &Room) -> ClinicResult<()> {
        if role != Role::Admin {
            return Err(ClinicError::Unauthorized);
        }
        let db = self.db.lock()?;
        db.upsert_room(room)?;
        self.invalidate_views();
        Ok(())
    }

    /// Activate or deactivate a room. Admin only; rooms are never deleted.
    pub fn set_room_active(&self, role: Role, room_number: &str, active: bool) -> ClinicResult<bool> {
        if role != Role::Admin {
            return Err(ClinicError::Unauthorized);
        }
        let db = self.db.lock()?;
        let changed = db.set_room_active(room_number, active)?;
        if changed {
            self.invalidate_views();
        }
        Ok(changed)
    }

    // =====================================================================
    // Occupancy views
    // =====================================================================

    /// Rooms available for selection, plus today's distribution and the
    /// current occupancy. Degrades to the synthesized registry rather than
    /// erroring when no rooms are configured.
    pub fn available_rooms(
        &self,
        viewer_doctor_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> ClinicResult<RoomAvailability> {
        let db = self.db.lock()?;
        let occupancy = Occupancy::new(&db);

        let rooms = occupancy.available_rooms(now, viewer_doctor_id)?;
        let occupied_rooms = occupancy.snapshot(now)?;

        let mut distribution_today: BTreeMap<String, usize> = BTreeMap::new();
        for patient in db.list_patients()? {
            if !clock::is_today(&patient.created_at, now)
                && !(clock::is_today(&patient.updated_at, now) && patient.has_room())
            {
                continue;
            }
            if let Some(room) = &patient.assigned_room {
                *distribution_today.entry(room.clone()).or_default() += 1;
            }
        }

        Ok(RoomAvailability {
            rooms,
            distribution_today,
            occupied_rooms,
        })
    }

    /// The doctor's own current room, or `None` when unassigned or stale.
    pub fn my_room(&self, doctor_id: &str, now: DateTime<Utc>) -> ClinicResult<Option<MyRoom>> {
        let db = self.db.lock()?;
        Occupancy::new(&db).my_room(doctor_id, now)
    }

    // =====================================================================
    // Assignment mutations
    // =====================================================================

    /// Doctor claims a room for today.
    pub fn select_room(
        &self,
        doctor_id: &str,
        doctor_name: &str,
        room_number: &str,
        assignment_time: DateTime<Utc>,
    ) -> ClinicResult<()> {
        {
            let db = self.db.lock()?;
            Occupancy::new(&db).select_room(doctor_id, doctor_name, room_number, assignment_time)?;
        }
        self.invalidate_views();
        Ok(())
    }

    /// Doctor gives up their room. Idempotent.
    pub fn clear_room(&self, doctor_id: &str) -> ClinicResult<()> {
        {
            let db = self.db.lock()?;
            Occupancy::new(&db).clear_room(doctor_id)?;
        }
        self.invalidate_views();
        Ok(())
    }

    /// Administratively move a doctor (and today's patients of their old
    /// room) to a new room. Returns the number of patients re-pointed.
    pub fn change_doctor_room(
        &self,
        role: Role,
        doctor_id: &str,
        doctor_name: &str,
        new_room: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<usize> {
        if role != Role::Admin {
            return Err(ClinicError::Unauthorized);
        }
        let moved = {
            let db = self.db.lock()?;
            Binder::new(&db).change_doctor_room(doctor_id, doctor_name, new_room, now)?
        };
        self.invalidate_views();
        Ok(moved)
    }

    // =====================================================================
    // Patient bindings
    // =====================================================================

    /// Register a patient, optionally binding a room in the same call.
    pub fn register_patient(
        &self,
        patient: PatientRecord,
        room_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> ClinicResult<PatientRecord> {
        let registered = {
            let db = self.db.lock()?;
            Binder::new(&db).bind_on_create(patient, room_number, now)?
        };
        self.invalidate_views();
        Ok(registered)
    }

    /// Bring a previously-registered patient into today's queue.
    pub fn add_patient_to_today(
        &self,
        patient_id: &str,
        room_number: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<()> {
        {
            let db = self.db.lock()?;
            Binder::new(&db).add_existing_to_today(patient_id, room_number, now)?;
        }
        self.invalidate_views();
        Ok(())
    }

    /// Move a single patient to a different room.
    pub fn change_patient_room(
        &self,
        patient_id: &str,
        new_room: &str,
        now: DateTime<Utc>,
    ) -> ClinicResult<()> {
        {
            let db = self.db.lock()?;
            Binder::new(&db).change_room(patient_id, new_room, now)?;
        }
        self.invalidate_views();
        Ok(())
    }

    /// Mark today's visit completed; the patient leaves the queue for the
    /// rest of the clinic day.
    pub fn mark_visit_completed(&self, patient_id: &str, now: DateTime<Utc>) -> ClinicResult<()> {
        {
            let db = self.db.lock()?;
            Binder::new(&db).complete_visit(patient_id, now)?;
        }
        self.invalidate_views();
        Ok(())
    }

    // =====================================================================
    // Queue
    // =====================================================================

    /// Today's ordered, role-filtered queue for a viewer.
    pub fn todays_queue(
        &self,
        viewer: &Viewer,
        filters: &QueueFilters,
        now: DateTime<Utc>,
    ) -> ClinicResult<DailyQueue> {
        let db = self.db.lock()?;
        let occupancy = Occupancy::new(&db).snapshot(now)?;
        let patients = db.list_patients()?;
        debug!(candidates = patients.len(), "building daily queue");
        Ok(build_daily_queue(&patients, &occupancy, viewer, filters, now))
    }

    /// Fetch a patient record.
    pub fn get_patient(&self, patient_id: &str) -> ClinicResult<Option<PatientRecord>> {
        let db = self.db.lock()?;
        Ok(db.get_patient(patient_id)?)
    }
}
