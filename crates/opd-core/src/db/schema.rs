//! SQLite schema definition.

/// Complete database schema for opd-core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Rooms (clinic configuration; read-only to the rest of the core)
-- ============================================================================

CREATE TABLE IF NOT EXISTS rooms (
    room_number TEXT PRIMARY KEY,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Doctor Room Assignments (current state, one row per doctor; not a log)
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctor_room_assignments (
    doctor_id TEXT PRIMARY KEY,
    doctor_name TEXT NOT NULL,
    room_number TEXT,                            -- NULL means unassigned
    assignment_time TEXT,                        -- RFC 3339; stale if not today
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_assignments_room ON doctor_room_assignments(room_number);

-- ============================================================================
-- Patients (the fields the room/queue subsystem owns; clinical proformas
-- and prescriptions live in sibling tables owned elsewhere)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sex TEXT,
    age_group TEXT,
    locality TEXT,
    patient_type TEXT NOT NULL DEFAULT 'adult',  -- adult, child
    assigned_room TEXT,
    assigned_doctor_id TEXT,                     -- denormalized snapshot
    assigned_doctor TEXT,                        -- legacy name-field snapshot
    visit_status TEXT NOT NULL DEFAULT 'pending',-- pending, completed
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    visit_date TEXT,
    last_assigned_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_patients_room ON patients(assigned_room);
CREATE INDEX IF NOT EXISTS idx_patients_created ON patients(created_at);
CREATE INDEX IF NOT EXISTS idx_patients_updated ON patients(updated_at);
"#;
