//! Deterministic in-memory healthcare backend.
//!
//! Seeds a small patient roster and fabricates appointment slots on demand.
//! Slot and appointment identifiers come from persistent counters so they
//! stay unique for the lifetime of the instance, and booking resolves the
//! provider, specialty, and times from the slot that was actually offered.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::HealthcareBackend;
use crate::error::{BackendError, Result};
use crate::types::{
    Appointment, AppointmentStatus, InsuranceEligibility, InsuranceStatus, Patient, TimeSlot,
};

/// At most this many slots are returned per search.
const MAX_SLOTS_PER_SEARCH: usize = 5;

/// Consultation hours offered each weekday.
const SLOT_HOURS: [u32; 4] = [9, 11, 14, 16];

/// Providers on staff per specialty.
const PROVIDERS: [(&str, &[&str]); 4] = [
    ("cardiology", &["Dr. Mehta", "Dr. Patel"]),
    ("orthopedics", &["Dr. Singh", "Dr. Reddy"]),
    ("dermatology", &["Dr. Rao", "Dr. Iyer"]),
    ("general", &["Dr. Kumar", "Dr. Gupta"]),
];

/// Mutable backend state, guarded by a single mutex.
struct MockState {
    /// Patient roster keyed by id (ordered, so name search is deterministic).
    patients: BTreeMap<String, Patient>,
    /// Every slot ever offered, keyed by slot id.
    offered_slots: HashMap<String, TimeSlot>,
    /// Booked appointments keyed by appointment id.
    appointments: HashMap<String, Appointment>,
    slot_counter: u32,
    appointment_counter: u32,
}

/// Simulated healthcare backend for demos and tests.
pub struct MockHealthcareApi {
    state: Mutex<MockState>,
}

impl MockHealthcareApi {
    /// Create a backend seeded with the demo patient roster.
    pub fn new() -> Self {
        let mut patients = BTreeMap::new();
        for patient in seed_patients() {
            patients.insert(patient.id.clone(), patient);
        }

        Self {
            state: Mutex::new(MockState {
                patients,
                offered_slots: HashMap::new(),
                appointments: HashMap::new(),
                slot_counter: 1,
                appointment_counter: 1000,
            }),
        }
    }

    /// Number of appointments booked so far.
    pub async fn appointment_count(&self) -> usize {
        self.state.lock().await.appointments.len()
    }
}

impl Default for MockHealthcareApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthcareBackend for MockHealthcareApi {
    async fn search_patient(
        &self,
        name: Option<&str>,
        patient_id: Option<&str>,
    ) -> Result<Option<Patient>> {
        let state = self.state.lock().await;

        if let Some(id) = patient_id {
            debug!(patient_id = id, "patient lookup by id");
            return Ok(state.patients.get(id).cloned());
        }

        if let Some(name) = name {
            let needle = name.to_lowercase();
            let found = state
                .patients
                .values()
                .find(|p| p.name.to_lowercase().contains(&needle))
                .cloned();
            debug!(name, found = found.is_some(), "patient lookup by name");
            return Ok(found);
        }

        Ok(None)
    }

    async fn check_insurance_eligibility(&self, patient_id: &str) -> Result<InsuranceEligibility> {
        let state = self.state.lock().await;

        let insurance_id = state
            .patients
            .get(patient_id)
            .and_then(|p| p.insurance_id.clone());

        match insurance_id {
            Some(insurance_id) => Ok(InsuranceEligibility {
                patient_id: patient_id.to_string(),
                insurance_id,
                status: InsuranceStatus::Active,
                coverage_start: NaiveDate::from_ymd_opt(2024, 1, 1),
                coverage_end: NaiveDate::from_ymd_opt(2024, 12, 31),
                copay_amount: 500.0,
                message: "Patient is eligible for coverage".into(),
            }),
            None => Ok(InsuranceEligibility {
                patient_id: patient_id.to_string(),
                insurance_id: "N/A".into(),
                status: InsuranceStatus::Inactive,
                coverage_start: None,
                coverage_end: None,
                copay_amount: 0.0,
                message: "No insurance found for patient".into(),
            }),
        }
    }

    async fn find_available_slots(
        &self,
        specialty: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        provider: Option<&str>,
    ) -> Result<Vec<TimeSlot>> {
        let mut state = self.state.lock().await;

        let specialty_lower = specialty.to_lowercase();
        let staff = PROVIDERS
            .iter()
            .find(|(s, _)| *s == specialty_lower)
            .map(|(_, providers)| *providers)
            .unwrap_or(&["Dr. General"]);

        // An explicitly requested provider narrows the pool only if they
        // actually work in this specialty.
        let pool: Vec<&str> = match provider {
            Some(p) if staff.contains(&p) => vec![p],
            _ => staff.to_vec(),
        };

        let location = format!("{} Department, Main Hospital", title_case(&specialty_lower));

        let mut slots = Vec::new();
        let mut current = start_date;
        while current <= end_date && slots.len() < MAX_SLOTS_PER_SEARCH {
            // Weekdays only.
            if current.weekday().num_days_from_monday() < 5 {
                for hour in SLOT_HOURS {
                    if slots.len() >= MAX_SLOTS_PER_SEARCH {
                        break;
                    }
                    let Some(start_time) = current.and_hms_opt(hour, 0, 0) else {
                        continue;
                    };
                    let start_time = start_time.and_utc();

                    let slot = TimeSlot {
                        slot_id: format!("SLOT-{:04}", state.slot_counter),
                        provider: pool[slots.len() % pool.len()].to_string(),
                        specialty: specialty_lower.clone(),
                        start_time,
                        end_time: start_time + Duration::hours(1),
                        location: location.clone(),
                    };
                    state.slot_counter += 1;
                    state.offered_slots.insert(slot.slot_id.clone(), slot.clone());
                    slots.push(slot);
                }
            }
            current = current + Duration::days(1);
        }

        info!(
            specialty = %specialty_lower,
            start = %start_date,
            end = %end_date,
            count = slots.len(),
            "slot search completed"
        );
        Ok(slots)
    }

    async fn book_appointment(
        &self,
        patient_id: &str,
        slot_id: &str,
        reason: &str,
    ) -> Result<Appointment> {
        let mut state = self.state.lock().await;

        let patient = state
            .patients
            .get(patient_id)
            .cloned()
            .ok_or_else(|| BackendError::PatientNotFound {
                patient_id: patient_id.to_string(),
            })?;

        let slot = state
            .offered_slots
            .get(slot_id)
            .cloned()
            .ok_or_else(|| BackendError::SlotNotFound {
                slot_id: slot_id.to_string(),
            })?;

        let appointment_id = format!("APT-{:06}", state.appointment_counter);
        state.appointment_counter += 1;

        let appointment = Appointment {
            appointment_id: appointment_id.clone(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            provider: slot.provider.clone(),
            specialty: slot.specialty.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
            location: slot.location.clone(),
            status: AppointmentStatus::Booked,
            reason: reason.to_string(),
            notes: Some(format!("Slot ID: {slot_id}")),
        };

        state
            .appointments
            .insert(appointment_id.clone(), appointment.clone());

        info!(
            appointment_id = %appointment_id,
            patient_id = %patient.id,
            slot_id = %slot_id,
            "appointment booked"
        );
        Ok(appointment)
    }
}

/// The demo patient roster.
fn seed_patients() -> Vec<Patient> {
    vec![
        Patient {
            id: "P001".into(),
            name: "Ravi Kumar".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 15).expect("static date is valid"),
            gender: "male".into(),
            phone: "+91-9876543210".into(),
            email: Some("ravi.kumar@email.com".into()),
            insurance_id: Some("INS-RK-2024".into()),
        },
        Patient {
            id: "P002".into(),
            name: "Priya Sharma".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 7, 22).expect("static date is valid"),
            gender: "female".into(),
            phone: "+91-9876543211".into(),
            email: Some("priya.sharma@email.com".into()),
            insurance_id: Some("INS-PS-2024".into()),
        },
        Patient {
            id: "P003".into(),
            name: "Amit Singh".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 5).expect("static date is valid"),
            gender: "male".into(),
            phone: "+91-9876543212".into(),
            email: Some("amit.singh@email.com".into()),
            insurance_id: Some("INS-AS-2024".into()),
        },
    ]
}

/// Capitalize the first character ("cardiology" -> "Cardiology").
fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
