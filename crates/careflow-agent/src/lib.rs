//! # careflow-agent
//!
//! Intent-to-action workflow orchestration for clinical administration:
//! free-text requests become validated calls against a
//! [`HealthcareBackend`](careflow_backend::HealthcareBackend).
//!
//! The pipeline a request travels:
//!
//! 1. [`safety`] — keyword gate refusing medical-advice requests before any
//!    interpretation happens.
//! 2. [`planner`] / [`rules`] — a model-backed planner produces an ordered
//!    intent list; the deterministic rule-based interpreter is the total
//!    fallback when the planner is absent, slow, or wrong.
//! 3. [`workflow`] — executes the intents in order, resolving `{PATIENT_ID}`
//!    and `{SLOT_ID}` placeholders from earlier step results, continuing past
//!    failed steps.
//! 4. [`actions`] — validates arguments and dispatches each step to the
//!    backend (or short-circuits it in dry-run mode).
//! 5. [`summary`] — renders a human-readable account of what happened.
//!
//! [`audit`] records every request, call, result, refusal, and error along
//! the way; [`coordinator`] ties the pipeline together behind a single
//! [`Coordinator::process_request`] entry point.

pub mod actions;
pub mod audit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intent;
pub mod planner;
pub mod rules;
pub mod safety;
pub mod summary;
pub mod workflow;

pub use audit::{AuditEvent, AuditSink, MemoryAudit, TracingAudit};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, WorkflowOutcome, WorkflowStatus};
pub use error::{AgentError, Result};
pub use intent::{ActionKind, Intent};
pub use planner::{HttpPlannerBackend, Planner, PlannerBackend};
pub use rules::RuleBasedInterpreter;
pub use safety::{SafetyFilter, SafetyVerdict};
pub use workflow::{StepOutcome, StepResult, WorkflowExecutor};
