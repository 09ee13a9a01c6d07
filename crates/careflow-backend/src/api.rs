//! The backend function contract.
//!
//! The workflow engine consumes exactly these four operations.  Implementors
//! must serialize identifier assignment internally; the engine never locks
//! around backend calls.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Appointment, InsuranceEligibility, Patient, TimeSlot};

/// Administrative operations exposed by a clinical backend.
///
/// All calls may block on I/O and may fail; callers are expected to bound
/// them with their own timeouts.
#[async_trait]
pub trait HealthcareBackend: Send + Sync {
    /// Look up a patient by name (case-insensitive substring) or by exact id.
    ///
    /// Returns `Ok(None)` when nothing matches -- an absent patient is not a
    /// backend fault.
    async fn search_patient(
        &self,
        name: Option<&str>,
        patient_id: Option<&str>,
    ) -> Result<Option<Patient>>;

    /// Check insurance eligibility for a patient.
    async fn check_insurance_eligibility(&self, patient_id: &str) -> Result<InsuranceEligibility>;

    /// Find open appointment slots for a specialty within a date window.
    async fn find_available_slots(
        &self,
        specialty: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        provider: Option<&str>,
    ) -> Result<Vec<TimeSlot>>;

    /// Book a previously offered slot for a patient.
    async fn book_appointment(
        &self,
        patient_id: &str,
        slot_id: &str,
        reason: &str,
    ) -> Result<Appointment>;
}
