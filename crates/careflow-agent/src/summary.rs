//! Human-readable summaries of workflow runs.
//!
//! One block per step, keyed by action kind; steps with nothing representable
//! are omitted.  Works off the canonical JSON payloads so it stays decoupled
//! from the backend types.

use serde_json::Value;

use crate::intent::ActionKind;
use crate::workflow::{StepOutcome, StepResult};

/// Render a multi-line summary of an executed plan.
pub fn summarize(steps: &[StepResult]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for step in steps {
        match &step.outcome {
            StepOutcome::Failure { reason } => {
                lines.push(format!("✗ {}: {reason}", step.action));
            }
            StepOutcome::Success { payload } => {
                if payload["dry_run"].as_bool() == Some(true) {
                    let message = payload["message"].as_str().unwrap_or("dry run");
                    lines.push(format!("• {}: {message} (dry run)", step.action));
                    continue;
                }

                match ActionKind::from_name(&step.action) {
                    Some(ActionKind::SearchPatient) => summarize_patient(payload, &mut lines),
                    Some(ActionKind::CheckInsurance) => summarize_insurance(payload, &mut lines),
                    Some(ActionKind::FindSlots) => summarize_slots(payload, &mut lines),
                    Some(ActionKind::BookAppointment) => summarize_booking(payload, &mut lines),
                    None => {}
                }
            }
        }
    }

    if lines.is_empty() {
        "No actions completed".to_string()
    } else {
        lines.join("\n")
    }
}

fn summarize_patient(payload: &Value, lines: &mut Vec<String>) {
    let (Some(name), Some(id)) = (payload["name"].as_str(), payload["id"].as_str()) else {
        return;
    };
    lines.push(format!("✓ Found patient: {name} (ID: {id})"));
    if let (Some(dob), Some(phone)) = (payload["date_of_birth"].as_str(), payload["phone"].as_str())
    {
        lines.push(format!("  DOB: {dob}, Phone: {phone}"));
    }
}

fn summarize_insurance(payload: &Value, lines: &mut Vec<String>) {
    let status = payload["status"].as_str().unwrap_or("unknown");
    lines.push(format!("✓ Insurance status: {}", status.to_uppercase()));

    if status == "active" {
        if let (Some(start), Some(end)) = (
            payload["coverage_start"].as_str(),
            payload["coverage_end"].as_str(),
        ) {
            lines.push(format!("  Coverage: {start} to {end}"));
        }
        if let Some(copay) = payload["copay_amount"].as_f64() {
            lines.push(format!("  Co-pay: ₹{copay}"));
        }
    }
}

fn summarize_slots(payload: &Value, lines: &mut Vec<String>) {
    let count = payload["slots"].as_array().map_or(0, Vec::len);
    lines.push(format!("✓ Found {count} available slot(s)"));

    if let Some(first) = payload["slots"][0].as_object() {
        let start = first.get("start_time").and_then(Value::as_str).unwrap_or("?");
        let provider = first.get("provider").and_then(Value::as_str).unwrap_or("?");
        lines.push(format!("  Next available: {start} with {provider}"));
    }
}

fn summarize_booking(payload: &Value, lines: &mut Vec<String>) {
    let Some(appointment_id) = payload["appointment_id"].as_str() else {
        return;
    };
    lines.push("✓ Appointment booked successfully!".to_string());
    lines.push(format!("  Appointment ID: {appointment_id}"));
    if let Some(patient) = payload["patient_name"].as_str() {
        lines.push(format!("  Patient: {patient}"));
    }
    if let (Some(provider), Some(specialty)) =
        (payload["provider"].as_str(), payload["specialty"].as_str())
    {
        lines.push(format!("  Provider: {provider} ({specialty})"));
    }
    if let Some(start) = payload["start_time"].as_str() {
        lines.push(format!("  Time: {start}"));
    }
    if let Some(location) = payload["location"].as_str() {
        lines.push(format!("  Location: {location}"));
    }
}
