//! Action backend adapter.
//!
//! Every operation follows the same shape: validate arguments
//! deterministically, short-circuit in dry-run mode, audit the call, dispatch
//! to the backend, and return the backend's canonical JSON representation.
//! Validation failures never reach the backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Value, json};

use careflow_backend::HealthcareBackend;

use crate::audit::AuditSink;
use crate::error::{AgentError, Result};
use crate::intent::ActionKind;

/// Dispatches validated actions to the healthcare backend.
pub struct ActionDispatcher {
    backend: Arc<dyn HealthcareBackend>,
    audit: Arc<dyn AuditSink>,
    dry_run: bool,
    patient_id_re: Regex,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn HealthcareBackend>, audit: Arc<dyn AuditSink>, dry_run: bool) -> Self {
        Self {
            backend,
            audit,
            dry_run,
            patient_id_re: Regex::new(r"^P\d{3,}$").expect("static pattern always compiles"),
        }
    }

    /// Validate and execute one action, returning its canonical payload.
    ///
    /// `today` anchors the "not in the past" date check.
    pub async fn dispatch(
        &self,
        request_id: &str,
        action: ActionKind,
        args: &BTreeMap<String, String>,
        today: NaiveDate,
    ) -> Result<Value> {
        if let Err(e) = self.validate(action, args, today) {
            self.audit
                .error(request_id, &format!("Validation failed: {e}"));
            return Err(e);
        }

        self.audit
            .function_call(request_id, action.name(), args, self.dry_run);

        if self.dry_run {
            return Ok(json!({
                "dry_run": true,
                "message": format!("Would execute {action}"),
                "args": args,
            }));
        }

        let result = self.call_backend(action, args).await;

        match &result {
            Ok(payload) => self.audit.function_result(request_id, action.name(), payload),
            Err(e) => self.audit.error(request_id, &e.to_string()),
        }

        result
    }

    fn validate(&self, action: ActionKind, args: &BTreeMap<String, String>, today: NaiveDate) -> Result<()> {
        match action {
            ActionKind::SearchPatient => {
                let name = args.get("name");
                let patient_id = args.get("patient_id");

                if name.is_none() && patient_id.is_none() {
                    return Err(validation("Either 'name' or 'patient_id' must be provided"));
                }
                if let Some(id) = patient_id
                    && !self.patient_id_re.is_match(id)
                {
                    return Err(validation("Invalid patient_id format. Expected format: P001"));
                }
                Ok(())
            }
            ActionKind::CheckInsurance => {
                let Some(id) = args.get("patient_id") else {
                    return Err(validation("patient_id is required"));
                };
                if !self.patient_id_re.is_match(id) {
                    return Err(validation("Invalid patient_id format. Expected format: P001"));
                }
                Ok(())
            }
            ActionKind::FindSlots => {
                if args.get("specialty").is_none_or(|s| s.is_empty()) {
                    return Err(validation("specialty is required"));
                }
                let (start, end) = parse_window(args)?;
                if start > end {
                    return Err(validation("start_date must be on or before end_date"));
                }
                if start < today {
                    return Err(validation("Cannot book appointments in the past"));
                }
                Ok(())
            }
            ActionKind::BookAppointment => {
                let Some(id) = args.get("patient_id") else {
                    return Err(validation("patient_id is required"));
                };
                if !self.patient_id_re.is_match(id) {
                    return Err(validation("Invalid patient_id format. Expected format: P001"));
                }
                if args.get("slot_id").is_none_or(|s| s.is_empty()) {
                    return Err(validation("slot_id is required"));
                }
                Ok(())
            }
        }
    }

    async fn call_backend(&self, action: ActionKind, args: &BTreeMap<String, String>) -> Result<Value> {
        match action {
            ActionKind::SearchPatient => {
                let name = args.get("name").map(String::as_str);
                let patient_id = args.get("patient_id").map(String::as_str);

                match self.backend.search_patient(name, patient_id).await? {
                    Some(patient) => Ok(serde_json::to_value(patient)?),
                    None => {
                        let query = patient_id.or(name).unwrap_or_default().to_string();
                        Err(AgentError::Backend(
                            careflow_backend::BackendError::PatientNotFound { patient_id: query },
                        ))
                    }
                }
            }
            ActionKind::CheckInsurance => {
                // Validation guarantees the id is present and well-formed.
                let patient_id = args.get("patient_id").map(String::as_str).unwrap_or_default();
                let eligibility = self.backend.check_insurance_eligibility(patient_id).await?;
                Ok(serde_json::to_value(eligibility)?)
            }
            ActionKind::FindSlots => {
                let specialty = args.get("specialty").map(String::as_str).unwrap_or_default();
                let provider = args.get("provider").map(String::as_str);
                let (start, end) = parse_window(args)?;

                let slots = self
                    .backend
                    .find_available_slots(specialty, start, end, provider)
                    .await?;
                Ok(json!({ "slots": serde_json::to_value(slots)? }))
            }
            ActionKind::BookAppointment => {
                let patient_id = args.get("patient_id").map(String::as_str).unwrap_or_default();
                let slot_id = args.get("slot_id").map(String::as_str).unwrap_or_default();
                let reason = args
                    .get("reason")
                    .map(String::as_str)
                    .unwrap_or("Follow-up consultation");

                let appointment = self
                    .backend
                    .book_appointment(patient_id, slot_id, reason)
                    .await?;
                Ok(serde_json::to_value(appointment)?)
            }
        }
    }
}

fn validation(reason: &str) -> AgentError {
    AgentError::Validation {
        reason: reason.to_string(),
    }
}

/// Parse the `start_date`/`end_date` argument pair.
fn parse_window(args: &BTreeMap<String, String>) -> Result<(NaiveDate, NaiveDate)> {
    let (Some(start), Some(end)) = (args.get("start_date"), args.get("end_date")) else {
        return Err(validation("Both start_date and end_date are required"));
    };

    let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d");
    match (parse(start), parse(end)) {
        (Ok(start), Ok(end)) => Ok((start, end)),
        _ => Err(validation("Dates must be in YYYY-MM-DD format")),
    }
}
