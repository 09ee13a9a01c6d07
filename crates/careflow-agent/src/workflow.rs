//! Workflow orchestrator.
//!
//! Executes an ordered intent list against the action dispatcher, threading an
//! [`ExecutionContext`] through the steps so identifiers discovered early
//! (a patient id, the first offered slot) can satisfy placeholders later in
//! the plan.  Steps run strictly in order; a failed step is recorded and
//! execution continues with the next intent.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::actions::ActionDispatcher;
use crate::intent::{ActionKind, DateWindow, Intent, PATIENT_ID_MARKER, SLOT_ID_MARKER};

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Identifiers discovered during the current run.
///
/// Scoped to one request and never persisted.  Later discoveries overwrite
/// earlier ones; placeholder resolution always sees the latest value.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub patient_id: Option<String>,
    pub slot_id: Option<String>,
}

impl ExecutionContext {
    /// Substitute placeholder markers in argument values.
    ///
    /// A value containing a marker is replaced wholesale with the context
    /// value.  Unresolvable placeholders are left as literal text (the
    /// backend will reject them) and reported back as warnings.
    fn resolve(&self, args: &BTreeMap<String, String>) -> (BTreeMap<String, String>, Vec<String>) {
        let mut resolved = BTreeMap::new();
        let mut warnings = Vec::new();

        for (key, value) in args {
            let new_value = if value.contains(PATIENT_ID_MARKER) {
                match &self.patient_id {
                    Some(id) => id.clone(),
                    None => {
                        warnings.push(format!(
                            "placeholder in `{key}` but no patient_id in context yet"
                        ));
                        value.clone()
                    }
                }
            } else if value.contains(SLOT_ID_MARKER) {
                match &self.slot_id {
                    Some(id) => id.clone(),
                    None => {
                        warnings.push(format!(
                            "placeholder in `{key}` but no slot_id in context yet"
                        ));
                        value.clone()
                    }
                }
            } else {
                value.clone()
            };
            resolved.insert(key.clone(), new_value);
        }

        (resolved, warnings)
    }
}

// ---------------------------------------------------------------------------
// Step results
// ---------------------------------------------------------------------------

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The action ran and returned its canonical payload.
    Success { payload: Value },
    /// The action failed validation, dispatch, or execution.
    Failure { reason: String },
}

/// The recorded outcome of executing one intent.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Wire name of the action that was attempted.
    pub action: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    /// The success payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            StepOutcome::Success { payload } => Some(payload),
            StepOutcome::Failure { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failure { .. })
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs intent lists step by step with partial-failure semantics.
pub struct WorkflowExecutor {
    dispatcher: ActionDispatcher,
}

impl WorkflowExecutor {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Execute all intents in order.  Output ordering matches input ordering;
    /// one result per intent, no retries.
    pub async fn execute(
        &self,
        request_id: &str,
        intents: &[Intent],
        today: NaiveDate,
    ) -> Vec<StepResult> {
        let mut ctx = ExecutionContext::default();
        let mut results = Vec::with_capacity(intents.len());

        for (index, intent) in intents.iter().enumerate() {
            debug!(step = index, action = %intent.action, "executing step");
            let result = self.execute_intent(request_id, intent, &mut ctx, today).await;
            results.push(result);
        }

        results
    }

    async fn execute_intent(
        &self,
        request_id: &str,
        intent: &Intent,
        ctx: &mut ExecutionContext,
        today: NaiveDate,
    ) -> StepResult {
        let Some(kind) = ActionKind::from_name(&intent.action) else {
            warn!(action = %intent.action, "skipping unsupported action");
            return StepResult {
                action: intent.action.clone(),
                outcome: StepOutcome::Failure {
                    reason: format!("unsupported action: {}", intent.action),
                },
            };
        };

        let (mut args, warnings) = ctx.resolve(&intent.args);
        for warning in &warnings {
            warn!(action = %intent.action, warning, "unresolved placeholder");
        }

        if kind == ActionKind::FindSlots {
            sanitize_date_window(&mut args, today);
        }

        match self.dispatcher.dispatch(request_id, kind, &args, today).await {
            Ok(payload) => {
                capture_context(kind, &payload, ctx);
                StepResult {
                    action: kind.name().to_string(),
                    outcome: StepOutcome::Success { payload },
                }
            }
            Err(e) => StepResult {
                action: kind.name().to_string(),
                outcome: StepOutcome::Failure {
                    reason: e.to_string(),
                },
            },
        }
    }
}

/// Record identifiers a successful step discovered.
fn capture_context(kind: ActionKind, payload: &Value, ctx: &mut ExecutionContext) {
    match kind {
        ActionKind::SearchPatient => {
            if let Some(id) = payload["id"].as_str() {
                debug!(patient_id = id, "captured patient_id");
                ctx.patient_id = Some(id.to_string());
            }
        }
        ActionKind::FindSlots => {
            // First slot wins; no further ranking.
            if let Some(id) = payload["slots"][0]["slot_id"].as_str() {
                debug!(slot_id = id, "captured slot_id");
                ctx.slot_id = Some(id.to_string());
            }
        }
        ActionKind::CheckInsurance | ActionKind::BookAppointment => {}
    }
}

/// Replace obviously-unresolved date tokens with a safe default window.
///
/// Imperfect planners sometimes emit literal `20XX-..` style dates or leave a
/// placeholder in the range; rather than guaranteeing a validation failure we
/// normalize to a 7-14 day window.
fn sanitize_date_window(args: &mut BTreeMap<String, String>, today: NaiveDate) {
    let junk = |key: &str| {
        args.get(key)
            .is_some_and(|v| v.contains("XX") || v.contains("YY") || v.contains('{'))
    };

    if junk("start_date") || junk("end_date") {
        let window = DateWindow::fallback(today);
        warn!(
            start = %window.start_string(),
            end = %window.end_string(),
            "unresolved date tokens replaced with default window"
        );
        args.insert("start_date".into(), window.start_string());
        args.insert("end_date".into(), window.end_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use careflow_backend::MockHealthcareApi;

    use crate::audit::MemoryAudit;
    use crate::intent::{PATIENT_ID_PLACEHOLDER, SLOT_ID_PLACEHOLDER};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    fn executor() -> WorkflowExecutor {
        let dispatcher = ActionDispatcher::new(
            Arc::new(MockHealthcareApi::new()),
            Arc::new(MemoryAudit::new()),
            false,
        );
        WorkflowExecutor::new(dispatcher)
    }

    fn schedule_plan() -> Vec<Intent> {
        vec![
            Intent::new(ActionKind::SearchPatient).arg("name", "Ravi Kumar"),
            Intent::new(ActionKind::FindSlots)
                .arg("specialty", "cardiology")
                .arg("start_date", "2026-09-02")
                .arg("end_date", "2026-09-09"),
            Intent::new(ActionKind::BookAppointment)
                .arg("patient_id", PATIENT_ID_PLACEHOLDER)
                .arg("slot_id", SLOT_ID_PLACEHOLDER)
                .arg("reason", "Cardiology follow-up consultation"),
        ]
    }

    #[tokio::test]
    async fn full_plan_resolves_placeholders_across_steps() {
        let results = executor().execute("r1", &schedule_plan(), today()).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.is_failure()));

        // The booked appointment's patient id equals the id the search found.
        let searched_id = results[0].payload().unwrap()["id"].as_str().unwrap();
        let booked_id = results[2].payload().unwrap()["patient_id"].as_str().unwrap();
        assert_eq!(searched_id, booked_id);
        assert_eq!(booked_id, "P001");

        // The booked slot is the first offered slot.
        let first_slot = results[1].payload().unwrap()["slots"][0]["slot_id"]
            .as_str()
            .unwrap();
        let notes = results[2].payload().unwrap()["notes"].as_str().unwrap();
        assert!(notes.contains(first_slot));
    }

    #[tokio::test]
    async fn failed_slot_search_fails_booking_but_not_earlier_steps() {
        let mut plan = schedule_plan();
        // Force the slot search to fail validation (inverted window).
        plan[1].args.insert("end_date".into(), "2026-08-01".into());

        let results = executor().execute("r1", &plan, today()).await;

        assert_eq!(results.len(), 3);
        assert!(!results[0].is_failure());
        assert!(results[1].is_failure());
        // Booking proceeds with the literal placeholder and is rejected.
        assert!(results[2].is_failure());
    }

    #[tokio::test]
    async fn unsupported_action_is_recorded_not_fatal() {
        let plan = vec![
            Intent {
                action: "order_lab_tests".into(),
                args: BTreeMap::new(),
            },
            Intent::new(ActionKind::SearchPatient).arg("patient_id", "P002"),
        ];

        let results = executor().execute("r1", &plan, today()).await;

        assert_eq!(results.len(), 2);
        match &results[0].outcome {
            StepOutcome::Failure { reason } => assert!(reason.contains("unsupported action")),
            StepOutcome::Success { .. } => panic!("expected a failure"),
        }
        assert!(!results[1].is_failure());
    }

    #[tokio::test]
    async fn garbled_planner_dates_are_sanitized() {
        let plan = vec![
            Intent::new(ActionKind::FindSlots)
                .arg("specialty", "general")
                .arg("start_date", "20XX-01-01")
                .arg("end_date", "20YY-01-08"),
        ];

        let results = executor().execute("r1", &plan, today()).await;
        assert!(!results[0].is_failure(), "sanitized window should dispatch cleanly");
    }

    #[tokio::test]
    async fn later_discoveries_overwrite_context() {
        let mut ctx = ExecutionContext::default();
        ctx.patient_id = Some("P001".into());

        capture_context(
            ActionKind::SearchPatient,
            &serde_json::json!({"id": "P002"}),
            &mut ctx,
        );
        assert_eq!(ctx.patient_id.as_deref(), Some("P002"));
    }

    #[test]
    fn unresolved_placeholder_keeps_literal_and_warns() {
        let ctx = ExecutionContext::default();
        let mut args = BTreeMap::new();
        args.insert("patient_id".to_string(), PATIENT_ID_PLACEHOLDER.to_string());

        let (resolved, warnings) = ctx.resolve(&args);
        assert_eq!(
            resolved.get("patient_id").map(String::as_str),
            Some(PATIENT_ID_PLACEHOLDER)
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn step_result_serializes_flat() {
        let result = StepResult {
            action: "search_patient".into(),
            outcome: StepOutcome::Success {
                payload: serde_json::json!({"id": "P001"}),
            },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["action"], "search_patient");
        assert_eq!(value["status"], "success");
        assert_eq!(value["payload"]["id"], "P001");
    }
}
