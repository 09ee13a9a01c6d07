//! Healthcare backend contract and mock implementation for CareFlow.
//!
//! This crate owns the clinical entities (patients, insurance records, time
//! slots, appointments) and the [`HealthcareBackend`] trait through which the
//! workflow engine reads and mutates them.  The engine never touches entity
//! storage directly; everything goes through the trait so a real clinical
//! system can replace the bundled [`MockHealthcareApi`] without touching the
//! orchestration core.
//!
//! ## Modules
//!
//! - [`types`] -- Entity types and status enums.
//! - [`api`] -- The `HealthcareBackend` trait (the backend function contract).
//! - [`mock`] -- Deterministic in-memory backend for demos and tests.
//! - [`error`] -- Backend error types.

pub mod api;
pub mod error;
pub mod mock;
pub mod types;

pub use api::HealthcareBackend;
pub use error::{BackendError, Result};
pub use mock::MockHealthcareApi;
pub use types::{
    Appointment, AppointmentStatus, InsuranceEligibility, InsuranceStatus, Patient, TimeSlot,
};
