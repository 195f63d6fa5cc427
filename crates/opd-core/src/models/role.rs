//! User roles.
//!
//! A closed enum replaces the legacy system's scattered string checks.
//! Visibility decisions live in the queue builder; admin-only gates live
//! on the service surface. Anything unrecognized denies by default.

use serde::{Deserialize, Serialize};

/// The five role tiers the subsystem distinguishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Administrator: sees everything, may move doctors between rooms
    Admin,
    /// Registration / intake staff (medical welfare officer): global
    /// visibility, routes new patients
    Mwo,
    /// Senior clinician
    SeniorDoctor,
    /// Junior clinician
    JuniorDoctor,
    /// Unrecognized role: sees nothing, may do nothing
    Unknown,
}

impl Role {
    /// Parse a legacy role string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "mwo" | "registration" | "intake" => Role::Mwo,
            "sr" | "senior" | "senior_doctor" | "sr_doctor" => Role::SeniorDoctor,
            "jr" | "junior" | "junior_doctor" | "jr_doctor" => Role::JuniorDoctor,
            _ => Role::Unknown,
        }
    }

    /// Clinical staff see only their own patients (plus unclaimed walk-ins
    /// in a room they occupy).
    pub fn is_clinical(&self) -> bool {
        matches!(self, Role::SeniorDoctor | Role::JuniorDoctor)
    }

    /// Roles with global queue visibility.
    pub fn sees_all(&self) -> bool {
        matches!(self, Role::Admin | Role::Mwo)
    }
}
