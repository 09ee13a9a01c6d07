//! Planned intents and the closed action vocabulary.
//!
//! Both interpreters (model-backed and rule-based) emit the same shape: an
//! ordered list of [`Intent`] values, each naming an action and carrying
//! string arguments.  Argument values may contain placeholder markers that
//! the orchestrator substitutes with identifiers discovered by earlier steps.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Marker substring identifying a patient-id placeholder (`{PATIENT_ID}`).
pub const PATIENT_ID_MARKER: &str = "PATIENT_ID";

/// Marker substring identifying a slot-id placeholder (`{SLOT_ID}`).
pub const SLOT_ID_MARKER: &str = "SLOT_ID";

/// Literal placeholder emitted by the rule-based interpreter.
pub const PATIENT_ID_PLACEHOLDER: &str = "{PATIENT_ID}";

/// Literal placeholder emitted by the rule-based interpreter.
pub const SLOT_ID_PLACEHOLDER: &str = "{SLOT_ID}";

/// The closed set of administrative actions the engine can dispatch.
///
/// Wire names match the backend function contract; anything else a planner
/// invents becomes an explicit "unsupported action" step outcome rather than
/// a silent lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "search_patient")]
    SearchPatient,
    #[serde(rename = "check_insurance_eligibility")]
    CheckInsurance,
    #[serde(rename = "find_available_slots")]
    FindSlots,
    #[serde(rename = "book_appointment")]
    BookAppointment,
}

impl ActionKind {
    /// Resolve a wire-format function name to an action.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "search_patient" => Some(Self::SearchPatient),
            "check_insurance_eligibility" => Some(Self::CheckInsurance),
            "find_available_slots" => Some(Self::FindSlots),
            "book_appointment" => Some(Self::BookAppointment),
            _ => None,
        }
    }

    /// The wire-format function name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchPatient => "search_patient",
            Self::CheckInsurance => "check_insurance_eligibility",
            Self::FindSlots => "find_available_slots",
            Self::BookAppointment => "book_appointment",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single planned action with its arguments, before execution.
///
/// `action` holds the raw function name as produced by the interpreter; the
/// orchestrator resolves it against [`ActionKind`] at dispatch time so that
/// unknown names surface as structured step failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl Intent {
    /// Create an intent for a known action.
    pub fn new(action: ActionKind) -> Self {
        Self {
            action: action.name().to_string(),
            args: BTreeMap::new(),
        }
    }

    /// Builder: add an argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// An inclusive calendar window for slot searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Default window: starts tomorrow, spans 14 days.
    pub fn default_from(today: NaiveDate) -> Self {
        Self {
            start: today + Duration::days(1),
            end: today + Duration::days(15),
        }
    }

    /// "Next week": 7 to 14 days out.
    pub fn next_week(today: NaiveDate) -> Self {
        Self {
            start: today + Duration::days(7),
            end: today + Duration::days(14),
        }
    }

    /// "Next month": 30 to 60 days out.
    pub fn next_month(today: NaiveDate) -> Self {
        Self {
            start: today + Duration::days(30),
            end: today + Duration::days(60),
        }
    }

    /// Defensive replacement window for unresolved planner date tokens.
    pub fn fallback(today: NaiveDate) -> Self {
        Self {
            start: today + Duration::days(7),
            end: today + Duration::days(14),
        }
    }

    /// `YYYY-MM-DD` rendering of the start date.
    pub fn start_string(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD` rendering of the end date.
    pub fn end_string(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}
