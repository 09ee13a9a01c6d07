//! Audit trail boundary.
//!
//! Every request, function call, result, refusal, and error is reported to an
//! [`AuditSink`] tagged with the request id.  From the engine's perspective
//! the sink is fire-and-forget: it must never fail the workflow.  Persistence
//! is an external concern; the default sink emits structured `tracing` events
//! under the `audit` target.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

/// Receives audit events for a workflow run.
pub trait AuditSink: Send + Sync {
    /// An incoming user request.
    fn request(&self, request_id: &str, text: &str);

    /// A function call about to be issued (after validation).
    fn function_call(
        &self,
        request_id: &str,
        action: &str,
        args: &BTreeMap<String, String>,
        dry_run: bool,
    );

    /// The result of a function call.
    fn function_result(&self, request_id: &str, action: &str, result: &Value);

    /// The agent declined to act.
    fn refusal(&self, request_id: &str, reason: &str);

    /// A request-level or step-level error.
    fn error(&self, request_id: &str, message: &str);
}

/// Default sink: structured `tracing` events under the `audit` target.
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn request(&self, request_id: &str, text: &str) {
        tracing::info!(target: "audit", request_id, user_input = text, "request received");
    }

    fn function_call(
        &self,
        request_id: &str,
        action: &str,
        args: &BTreeMap<String, String>,
        dry_run: bool,
    ) {
        let mode = if dry_run { "dry_run" } else { "execute" };
        let args = serde_json::to_string(args).unwrap_or_default();
        tracing::info!(target: "audit", request_id, action, %args, mode, "function call");
    }

    fn function_result(&self, request_id: &str, action: &str, result: &Value) {
        tracing::info!(target: "audit", request_id, action, result = %result, "function result");
    }

    fn refusal(&self, request_id: &str, reason: &str) {
        tracing::warn!(target: "audit", request_id, reason, "request refused");
    }

    fn error(&self, request_id: &str, message: &str) {
        tracing::error!(target: "audit", request_id, message, "error");
    }
}

/// A single recorded audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Request { request_id: String, text: String },
    Call { request_id: String, action: String, dry_run: bool },
    Result { request_id: String, action: String },
    Refusal { request_id: String, reason: String },
    Error { request_id: String, message: String },
}

/// In-memory sink that records events for later inspection.  Used by tests
/// and embeddable hosts that want to surface the trail themselves.
#[derive(Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit lock poisoned").clone()
    }

    fn push(&self, event: AuditEvent) {
        self.events.lock().expect("audit lock poisoned").push(event);
    }
}

impl AuditSink for MemoryAudit {
    fn request(&self, request_id: &str, text: &str) {
        self.push(AuditEvent::Request {
            request_id: request_id.to_string(),
            text: text.to_string(),
        });
    }

    fn function_call(
        &self,
        request_id: &str,
        action: &str,
        _args: &BTreeMap<String, String>,
        dry_run: bool,
    ) {
        self.push(AuditEvent::Call {
            request_id: request_id.to_string(),
            action: action.to_string(),
            dry_run,
        });
    }

    fn function_result(&self, request_id: &str, action: &str, _result: &Value) {
        self.push(AuditEvent::Result {
            request_id: request_id.to_string(),
            action: action.to_string(),
        });
    }

    fn refusal(&self, request_id: &str, reason: &str) {
        self.push(AuditEvent::Refusal {
            request_id: request_id.to_string(),
            reason: reason.to_string(),
        });
    }

    fn error(&self, request_id: &str, message: &str) {
        self.push(AuditEvent::Error {
            request_id: request_id.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_audit_records_in_order() {
        let audit = MemoryAudit::new();
        audit.request("r1", "hello");
        audit.refusal("r1", "nope");

        let events = audit.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AuditEvent::Request { .. }));
        assert!(matches!(events[1], AuditEvent::Refusal { .. }));
    }
}
