//! Rule-based interpreter — the deterministic planner fallback.
//!
//! Produces the same ordered-intents shape as the model-backed planner using
//! keyword and pattern matching only.  It never fails: unrecognizable text
//! simply yields fewer (possibly zero) intents, and the coordinator turns an
//! empty plan into a structured error outcome.

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::intent::{
    ActionKind, DateWindow, Intent, PATIENT_ID_PLACEHOLDER, SLOT_ID_PLACEHOLDER,
};

/// Patient names the interpreter can recognize literally (the backend roster).
const KNOWN_PATIENTS: [&str; 3] = ["Ravi Kumar", "Priya Sharma", "Amit Singh"];

/// Keyword stems mapped to canonical specialty names.
const SPECIALTY_STEMS: [(&str, &str); 4] = [
    ("cardio", "cardiology"),
    ("ortho", "orthopedics"),
    ("derma", "dermatology"),
    ("general", "general"),
];

/// Terms that signal an insurance/eligibility question.
const INSURANCE_TERMS: [&str; 3] = ["insurance", "eligibility", "coverage"];

/// Terms that signal a scheduling request.
const APPOINTMENT_TERMS: [&str; 4] = ["appointment", "slot", "schedule", "book"];

/// Deterministic keyword/pattern interpreter.
pub struct RuleBasedInterpreter {
    patient_id_re: Regex,
}

impl RuleBasedInterpreter {
    pub fn new() -> Self {
        Self {
            patient_id_re: Regex::new(r"(?i)P\d{3,}").expect("static pattern always compiles"),
        }
    }

    /// Interpret free text into an ordered intent list.
    ///
    /// `today` anchors the date-window computation; passing the same date and
    /// text always yields the same intents.
    pub fn interpret(&self, text: &str, today: NaiveDate) -> Vec<Intent> {
        let lowered = text.to_lowercase();
        let mut intents = Vec::new();

        // 1. Patient identification: literal name or explicit id token.
        let patient_name = KNOWN_PATIENTS
            .iter()
            .find(|name| lowered.contains(&name.to_lowercase()))
            .map(|name| name.to_string());

        let patient_id = self
            .patient_id_re
            .find(text)
            .map(|m| m.as_str().to_uppercase());

        let patient_identified = patient_name.is_some() || patient_id.is_some();

        if patient_identified {
            let mut search = Intent::new(ActionKind::SearchPatient);
            if let Some(name) = &patient_name {
                search = search.arg("name", name);
            }
            if let Some(id) = &patient_id {
                search = search.arg("patient_id", id);
            }
            intents.push(search);
        }

        // The id a later step should use: explicit token if present, otherwise
        // the placeholder the search step will fill in.
        let patient_ref = patient_id
            .clone()
            .unwrap_or_else(|| PATIENT_ID_PLACEHOLDER.to_string());

        // 2. Insurance check.
        if patient_identified && INSURANCE_TERMS.iter().any(|t| lowered.contains(t)) {
            intents.push(Intent::new(ActionKind::CheckInsurance).arg("patient_id", &patient_ref));
        }

        // 3. Slot search.
        let specialty = SPECIALTY_STEMS
            .iter()
            .find(|(stem, _)| lowered.contains(stem))
            .map(|(_, canonical)| *canonical);

        let wants_appointment = APPOINTMENT_TERMS.iter().any(|t| lowered.contains(t));

        let mut slots_planned = false;
        if let Some(specialty) = specialty
            && wants_appointment
        {
            let window = if lowered.contains("next month") {
                DateWindow::next_month(today)
            } else if lowered.contains("next week") {
                DateWindow::next_week(today)
            } else {
                DateWindow::default_from(today)
            };

            intents.push(
                Intent::new(ActionKind::FindSlots)
                    .arg("specialty", specialty)
                    .arg("start_date", window.start_string())
                    .arg("end_date", window.end_string()),
            );
            slots_planned = true;
        }

        // 4. Booking: first returned slot wins, no further ranking.
        if patient_identified
            && slots_planned
            && let Some(specialty) = specialty
        {
            intents.push(
                Intent::new(ActionKind::BookAppointment)
                    .arg("patient_id", &patient_ref)
                    .arg("slot_id", SLOT_ID_PLACEHOLDER)
                    .arg("reason", format!("{} follow-up consultation", title_case(specialty))),
            );
        }

        debug!(intents = intents.len(), "rule-based interpretation complete");
        intents
    }
}

impl Default for RuleBasedInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
