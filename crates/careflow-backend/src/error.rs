//! Backend error types.

/// Errors raised by a [`crate::HealthcareBackend`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The referenced patient does not exist.
    #[error("patient {patient_id} not found")]
    PatientNotFound { patient_id: String },

    /// The referenced slot was never offered by this backend.
    #[error("slot {slot_id} not found")]
    SlotNotFound { slot_id: String },

    /// The backend rejected the call (bad identifier, closed schedule, ...).
    #[error("backend rejected call: {reason}")]
    Rejected { reason: String },

    /// The backend could not be reached or failed internally.
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Convenience alias used throughout the backend crate.
pub type Result<T> = std::result::Result<T, BackendError>;
