//! Domain models for the outpatient room and queue subsystem.

mod assignment;
mod patient;
mod role;
mod room;

pub use assignment::*;
pub use patient::*;
pub use role::*;
pub use room::*;
