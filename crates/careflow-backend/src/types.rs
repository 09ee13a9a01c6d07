//! Clinical entity types.
//!
//! Wire shapes follow the backend function contract: everything serializes to
//! snake_case JSON, dates as `YYYY-MM-DD`, timestamps as RFC 3339.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Insurance coverage status for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceStatus {
    Active,
    Inactive,
    Pending,
}

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Pending,
    Cancelled,
    Completed,
}

/// A patient record.
///
/// Patient identifiers follow the `P\d{3,}` format (e.g. `P001`); the backend
/// is the sole authority for assigning them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_id: Option<String>,
}

/// Result of an insurance eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceEligibility {
    pub patient_id: String,
    pub insurance_id: String,
    pub status: InsuranceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_end: Option<NaiveDate>,
    pub copay_amount: f64,
    pub message: String,
}

/// An available appointment time slot.
///
/// Slot identifiers are backend-assigned and stable for the lifetime of the
/// backend instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub slot_id: String,
    pub provider: String,
    pub specialty: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
}

/// A booked appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub provider: String,
    pub specialty: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
