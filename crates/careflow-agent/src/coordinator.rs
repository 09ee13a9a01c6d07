//! Top-level request coordinator.
//!
//! Wires the full pipeline: safety gate → plan selection (model-backed
//! planner with total fallback to the rule-based interpreter) → ordered step
//! execution → summary.  Every request gets a fresh id and its own execution
//! context; nothing is shared between in-flight requests except the backend
//! itself.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use careflow_backend::HealthcareBackend;

use crate::actions::ActionDispatcher;
use crate::audit::AuditSink;
use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::intent::Intent;
use crate::planner::{HttpPlannerBackend, PlanIntent, Planner, PlannerBackend};
use crate::rules::RuleBasedInterpreter;
use crate::safety::{SafetyFilter, SafetyVerdict};
use crate::summary::summarize;
use crate::workflow::{StepResult, WorkflowExecutor};

// ---------------------------------------------------------------------------
// Outcome envelope
// ---------------------------------------------------------------------------

/// Terminal status of a processed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Success,
    Refused,
    Error,
}

/// The terminal value returned to the caller, serializable as the
/// success/refused/error envelope.
#[derive(Debug, Serialize)]
pub struct WorkflowOutcome {
    pub status: WorkflowStatus,
    /// Opaque token correlating this outcome with its audit entries.
    pub request_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Refusal reason (status = refused only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Error message (status = error only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowOutcome {
    fn success(request_id: String, steps: Vec<StepResult>, summary: String) -> Self {
        Self {
            status: WorkflowStatus::Success,
            request_id,
            steps,
            summary: Some(summary),
            reason: None,
            error: None,
        }
    }

    fn refused(request_id: String, reason: String) -> Self {
        Self {
            status: WorkflowStatus::Refused,
            request_id,
            steps: Vec::new(),
            summary: None,
            reason: Some(reason),
            error: None,
        }
    }

    fn error(request_id: String, message: String) -> Self {
        Self {
            status: WorkflowStatus::Error,
            request_id,
            steps: Vec::new(),
            summary: None,
            reason: None,
            error: Some(message),
        }
    }
}

/// How the plan for a request was settled.
enum PlanSelection {
    /// The planner declined the request.
    Refused(String),
    /// An ordered intent list, from whichever interpreter produced it.
    Intents(Vec<Intent>),
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Coordinates the intent-to-action workflow for one backend.
pub struct Coordinator {
    safety: SafetyFilter,
    planner: Option<Planner>,
    rules: RuleBasedInterpreter,
    executor: WorkflowExecutor,
    audit: Arc<dyn AuditSink>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator.  The planner is enabled only when the config
    /// carries an API key; without one every request takes the rule-based
    /// path.
    pub fn new(
        config: CoordinatorConfig,
        backend: Arc<dyn HealthcareBackend>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let planner_backend = config.planner_api_key.as_ref().map(|key| {
            Arc::new(HttpPlannerBackend::new(
                config.planner_base_url.clone(),
                key.clone(),
                config.model.clone(),
            )) as Arc<dyn PlannerBackend>
        });

        Self::with_planner_backend(config, backend, audit, planner_backend)
    }

    /// Create a coordinator over an explicit planner backend (or none).
    pub fn with_planner_backend(
        config: CoordinatorConfig,
        backend: Arc<dyn HealthcareBackend>,
        audit: Arc<dyn AuditSink>,
        planner_backend: Option<Arc<dyn PlannerBackend>>,
    ) -> Self {
        let dispatcher = ActionDispatcher::new(backend, audit.clone(), config.dry_run);

        Self {
            safety: SafetyFilter::new(),
            planner: planner_backend.map(Planner::new),
            rules: RuleBasedInterpreter::new(),
            executor: WorkflowExecutor::new(dispatcher),
            audit,
            config,
        }
    }

    /// Process a free-text request end to end.
    pub async fn process_request(&self, text: &str) -> WorkflowOutcome {
        self.process_request_at(text, Utc::now().date_naive()).await
    }

    /// Process a request with an explicit "today" anchor for all date
    /// computation.  Identical inputs produce identical plans.
    pub async fn process_request_at(&self, text: &str, today: NaiveDate) -> WorkflowOutcome {
        let request_id = new_request_id();
        self.audit.request(&request_id, text);

        // The safety gate runs before any interpreter or backend call.
        if let SafetyVerdict::Blocked { reason, .. } = self.safety.check(text) {
            self.audit.refusal(&request_id, &reason);
            return WorkflowOutcome::refused(request_id, reason);
        }

        match self.run(&request_id, text, today).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Agent execution failed: {e}");
                self.audit.error(&request_id, &message);
                WorkflowOutcome::error(request_id, message)
            }
        }
    }

    async fn run(&self, request_id: &str, text: &str, today: NaiveDate) -> Result<WorkflowOutcome> {
        let mut intents = match self.select_plan(text, today).await {
            PlanSelection::Refused(reason) => {
                self.audit.refusal(request_id, &reason);
                return Ok(WorkflowOutcome::refused(request_id.to_string(), reason));
            }
            PlanSelection::Intents(intents) => intents,
        };

        if intents.len() > self.config.max_actions {
            warn!(
                planned = intents.len(),
                max = self.config.max_actions,
                "plan exceeds action cap; truncating"
            );
            intents.truncate(self.config.max_actions);
        }

        if intents.is_empty() {
            let message =
                "Could not understand request. Please specify patient and desired action."
                    .to_string();
            self.audit.error(request_id, &message);
            return Ok(WorkflowOutcome::error(request_id.to_string(), message));
        }

        info!(request_id, intents = intents.len(), "executing workflow");
        let steps = self.executor.execute(request_id, &intents, today).await;
        let summary = summarize(&steps);

        Ok(WorkflowOutcome::success(request_id.to_string(), steps, summary))
    }

    /// Pick an intent list: try the planner first, fall back to the rules.
    ///
    /// The fallback is total -- planner unavailability, timeout, transport
    /// failure, and unusable output all land on the rule-based path; none of
    /// them ever surface to the caller.
    async fn select_plan(&self, text: &str, today: NaiveDate) -> PlanSelection {
        if let Some(planner) = &self.planner {
            match tokio::time::timeout(self.config.planner_timeout, planner.plan(text)).await {
                Ok(Ok(plan)) => match plan.intent {
                    PlanIntent::Refuse => return PlanSelection::Refused(plan.reasoning),
                    PlanIntent::Error => {
                        warn!(reasoning = %plan.reasoning, "planner output unusable; using rule-based fallback");
                    }
                    _ => return PlanSelection::Intents(plan.actions),
                },
                Ok(Err(e)) => {
                    warn!(error = %e, "planner failed; using rule-based fallback");
                }
                Err(_) => {
                    warn!(timeout = ?self.config.planner_timeout, "planner timed out; using rule-based fallback");
                }
            }
        }

        PlanSelection::Intents(self.rules.interpret(text, today))
    }
}

/// Short random token correlating audit entries for one request.
///
/// v4, not v7: the leading hex of a v7 id is a millisecond timestamp, so a
/// truncated one would repeat for every request in the same time window.
fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use careflow_backend::MockHealthcareApi;

    use crate::audit::{AuditEvent, MemoryAudit};
    use crate::error::AgentError;

    struct CannedPlanner(String);

    #[async_trait]
    impl PlannerBackend for CannedPlanner {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct UnreachablePlanner;

    #[async_trait]
    impl PlannerBackend for UnreachablePlanner {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(AgentError::Planner {
                reason: "connection refused".into(),
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    fn coordinator(planner: Option<Arc<dyn PlannerBackend>>) -> (Coordinator, Arc<MemoryAudit>) {
        let audit = Arc::new(MemoryAudit::new());
        let coordinator = Coordinator::with_planner_backend(
            CoordinatorConfig::default(),
            Arc::new(MockHealthcareApi::new()),
            audit.clone(),
            planner,
        );
        (coordinator, audit)
    }

    #[tokio::test]
    async fn scheduling_request_succeeds_via_rule_based_path() {
        let (coordinator, _) = coordinator(None);
        let outcome = coordinator
            .process_request_at("Schedule a cardiology appointment for Ravi Kumar next week", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(outcome.steps.len(), 3);
        assert!(outcome.steps.iter().all(|s| !s.is_failure()));

        let booked = outcome.steps[2].payload().unwrap();
        assert_eq!(booked["patient_id"], "P001");
        assert_eq!(booked["specialty"], "cardiology");

        let summary = outcome.summary.unwrap();
        assert!(summary.contains("Found patient: Ravi Kumar"));
        assert!(summary.contains("Appointment booked successfully"));
    }

    #[tokio::test]
    async fn medical_advice_is_refused_with_zero_backend_calls() {
        let (coordinator, audit) = coordinator(None);
        let outcome = coordinator
            .process_request_at("What medication should I take for headache?", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Refused);
        assert!(outcome.reason.as_deref().unwrap().contains("'medication'"));
        assert!(outcome.steps.is_empty());

        let events = audit.events();
        assert!(events.iter().all(|e| !matches!(e, AuditEvent::Call { .. })));
        assert!(events.iter().any(|e| matches!(e, AuditEvent::Refusal { .. })));
    }

    #[tokio::test]
    async fn insurance_check_by_id_reports_active_coverage() {
        let (coordinator, _) = coordinator(None);
        let outcome = coordinator
            .process_request_at("Check insurance for P001", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        let insurance = outcome
            .steps
            .iter()
            .find(|s| s.action == "check_insurance_eligibility")
            .and_then(StepResult::payload)
            .unwrap();
        assert_eq!(insurance["status"], "active");
        assert_eq!(insurance["copay_amount"], 500.0);
    }

    #[tokio::test]
    async fn unrecognizable_request_yields_error_with_guidance() {
        let (coordinator, _) = coordinator(None);
        let outcome = coordinator
            .process_request_at("hello there, nice weather today", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Error);
        assert!(outcome.error.as_deref().unwrap().contains("Could not understand"));
        assert!(!outcome.request_id.is_empty());
        assert!(outcome.steps.is_empty());
    }

    #[tokio::test]
    async fn planner_refusal_short_circuits_execution() {
        let response = r#"{"intent": "refuse", "reasoning": "This is a medical advice request which I cannot handle", "actions": []}"#;
        let (coordinator, audit) = coordinator(Some(Arc::new(CannedPlanner(response.into()))));

        let outcome = coordinator
            .process_request_at("Help my uncle feel better", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Refused);
        assert!(outcome.reason.as_deref().unwrap().contains("medical advice"));
        assert!(audit.events().iter().all(|e| !matches!(e, AuditEvent::Call { .. })));
    }

    #[tokio::test]
    async fn planner_garbage_falls_back_to_rules() {
        let (coordinator, _) = coordinator(Some(Arc::new(CannedPlanner(
            "sorry, I don't feel like JSON today".into(),
        ))));

        let outcome = coordinator
            .process_request_at("Schedule a cardiology appointment for Ravi Kumar next week", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(outcome.steps.len(), 3);
    }

    #[tokio::test]
    async fn unreachable_planner_falls_back_to_rules() {
        let (coordinator, _) = coordinator(Some(Arc::new(UnreachablePlanner)));

        let outcome = coordinator
            .process_request_at("Check insurance for P002", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert!(outcome
            .steps
            .iter()
            .any(|s| s.action == "check_insurance_eligibility"));
    }

    #[tokio::test]
    async fn planner_plan_is_executed_with_placeholder_resolution() {
        let response = r#"{
            "intent": "schedule_appointment",
            "reasoning": "book orthopedics for Priya Sharma",
            "actions": [
                {"function": "search_patient", "args": {"name": "Priya Sharma"}},
                {"function": "find_available_slots", "args": {"specialty": "orthopedics", "start_date": "20XX-01-01", "end_date": "20YY-01-01"}},
                {"function": "book_appointment", "args": {"patient_id": "{PATIENT_ID}", "slot_id": "{SLOT_ID}", "reason": "Orthopedics follow-up"}}
            ]
        }"#;
        let (coordinator, _) = coordinator(Some(Arc::new(CannedPlanner(response.into()))));

        let outcome = coordinator.process_request_at("irrelevant", today()).await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(outcome.steps.len(), 3);
        let booked = outcome.steps[2].payload().unwrap();
        assert_eq!(booked["patient_id"], "P002");
    }

    #[tokio::test]
    async fn oversized_plans_are_truncated() {
        let (audit, backend) = (Arc::new(MemoryAudit::new()), Arc::new(MockHealthcareApi::new()));
        let config = CoordinatorConfig {
            max_actions: 2,
            ..CoordinatorConfig::default()
        };
        let coordinator =
            Coordinator::with_planner_backend(config, backend, audit, None);

        let outcome = coordinator
            .process_request_at("Schedule a cardiology appointment for Ravi Kumar next week", today())
            .await;

        // The three-step rule plan is cut to search + slot search.
        assert_eq!(outcome.steps.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_reports_without_mutating() {
        let backend = Arc::new(MockHealthcareApi::new());
        let config = CoordinatorConfig {
            dry_run: true,
            ..CoordinatorConfig::default()
        };
        let coordinator = Coordinator::with_planner_backend(
            config,
            backend.clone(),
            Arc::new(MemoryAudit::new()),
            None,
        );

        let outcome = coordinator
            .process_request_at("Schedule a cardiology appointment for Ravi Kumar next week", today())
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert!(outcome.summary.unwrap().contains("(dry run)"));
        assert_eq!(backend.appointment_count().await, 0);
    }

    #[test]
    fn request_ids_are_short_and_unique() {
        // Back-to-back generation lands in the same millisecond; ids must
        // still differ.
        let ids: Vec<String> = (0..64).map(|_| new_request_id()).collect();
        for id in &ids {
            assert_eq!(id.len(), 8);
        }
        let distinct: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());
    }

    #[tokio::test]
    async fn outcome_serializes_to_envelope() {
        let (coordinator, _) = coordinator(None);
        let outcome = coordinator
            .process_request_at("What medication should I take?", today())
            .await;

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "refused");
        assert!(value.get("steps").is_none());
        assert!(value.get("summary").is_none());
        assert!(value["reason"].as_str().is_some());
    }
}
