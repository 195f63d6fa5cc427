//! Doctor-to-room assignment models.

use serde::{Deserialize, Serialize};

/// Current-state record of which room a doctor is sitting in.
///
/// One row per doctor, not a log. `room_number` absent means unassigned;
/// an `assignment_time` on a prior clinic-local day means the row is stale
/// and is treated as absent everywhere (and cleared on first observation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRoomAssignment {
    /// Doctor user id (key)
    pub doctor_id: String,
    /// Display name, kept for occupancy views and collision messages
    pub doctor_name: String,
    /// Currently held room, if any
    pub room_number: Option<String>,
    /// When the doctor claims to have started sitting (RFC 3339)
    pub assignment_time: Option<String>,
}

impl DoctorRoomAssignment {
    /// Create an assignment row for a doctor holding a room.
    pub fn new(
        doctor_id: impl Into<String>,
        doctor_name: impl Into<String>,
        room_number: impl Into<String>,
        assignment_time: impl Into<String>,
    ) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            doctor_name: doctor_name.into(),
            room_number: Some(room_number.into()),
            assignment_time: Some(assignment_time.into()),
        }
    }
}

/// Occupancy projection value: who holds a room right now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomOccupant {
    pub doctor_id: String,
    pub doctor_name: String,
    pub assignment_time: String,
}

/// A doctor's own current room, as returned by the my-room view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MyRoom {
    pub room_number: String,
    pub assignment_time: String,
}
