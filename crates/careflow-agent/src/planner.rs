//! Model-backed plan interpreter.
//!
//! Turns free text into an ordered intent list by prompting a text-generation
//! backend with an instructional template and a fixed action catalog.  The
//! response is untrusted: parsing strips code fences, locates the first
//! balanced `{...}` span, and attempts a structured decode.  Every decode
//! failure yields an `error` plan (which the coordinator answers with the
//! rule-based fallback) rather than a fault.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::intent::Intent;

// ---------------------------------------------------------------------------
// Planner backend boundary
// ---------------------------------------------------------------------------

/// Text-in/text-out boundary to the generation backend.
///
/// The engine only ever sends a prompt and reads back raw text; everything
/// else (transport, auth, model selection) lives behind this trait.
#[async_trait]
pub trait PlannerBackend: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Planner backend speaking the OpenAI-compatible Chat Completions API.
pub struct HttpPlannerBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpPlannerBackend {
    /// Create a backend for an OpenAI-compatible endpoint.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl PlannerBackend for HttpPlannerBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
            "max_tokens": 1024,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value: Value = response.json().await?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| AgentError::Planner {
                reason: "completion response missing message content".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// The planner's high-level classification of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanIntent {
    ScheduleAppointment,
    CheckInsurance,
    SearchPatient,
    /// The planner declined the request; treated exactly like a safety-filter
    /// refusal.
    Refuse,
    /// The planner's output was unusable; the coordinator falls back to the
    /// rule-based interpreter.
    Error,
}

impl PlanIntent {
    fn from_wire(s: &str) -> Self {
        match s {
            "schedule_appointment" => Self::ScheduleAppointment,
            "check_insurance" => Self::CheckInsurance,
            "search_patient" => Self::SearchPatient,
            "refuse" => Self::Refuse,
            _ => Self::Error,
        }
    }
}

/// A plan decoded from the planner's response.
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub intent: PlanIntent,
    pub reasoning: String,
    pub actions: Vec<Intent>,
}

impl ParsedPlan {
    fn error(reasoning: impl Into<String>) -> Self {
        Self {
            intent: PlanIntent::Error,
            reasoning: reasoning.into(),
            actions: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Decomposes free text into ordered intents using a generation backend.
pub struct Planner {
    backend: Arc<dyn PlannerBackend>,
}

impl Planner {
    /// Create a planner over the given backend.
    pub fn new(backend: Arc<dyn PlannerBackend>) -> Self {
        Self { backend }
    }

    /// Ask the backend for a plan.
    ///
    /// Transport failures surface as [`AgentError::Planner`]; malformed
    /// response text is absorbed into an `error` plan instead.
    pub async fn plan(&self, user_input: &str) -> Result<ParsedPlan> {
        let prompt = build_prompt(user_input);
        let raw = self.backend.complete(&prompt).await?;

        let plan = parse_response(&raw);
        tracing::info!(
            intent = ?plan.intent,
            actions = plan.actions.len(),
            reasoning = %plan.reasoning,
            "planner response parsed"
        );
        Ok(plan)
    }
}

/// Build the instruction prompt embedding the action catalog and user text.
fn build_prompt(user_input: &str) -> String {
    format!(
        r#"You are a clinical workflow coordinator AI. Your job is to help schedule appointments and perform administrative tasks.

CRITICAL RULES:
1. You CANNOT provide medical advice, diagnosis, or treatment recommendations
2. You CAN ONLY coordinate appointments and check administrative information
3. You must respond ONLY in valid JSON format

Available functions:
- search_patient: Find a patient by name or ID
  Args: {{"name": "patient name"}} OR {{"patient_id": "P001"}}

- check_insurance_eligibility: Check insurance coverage
  Args: {{"patient_id": "P001"}}

- find_available_slots: Search for appointment slots
  Args: {{"specialty": "cardiology", "start_date": "2025-12-20", "end_date": "2025-12-27"}}

- book_appointment: Book an appointment
  Args: {{"patient_id": "P001", "slot_id": "SLOT-0001", "reason": "Follow-up"}}

Your response must be a JSON object with this structure:
{{
  "intent": "schedule_appointment" | "check_insurance" | "search_patient" | "refuse",
  "reasoning": "brief explanation of what you understood",
  "actions": [
    {{"function": "function_name", "args": {{"param": "value"}}}}
  ]
}}

Arguments may reference values discovered by earlier actions with the
placeholders {{PATIENT_ID}} and {{SLOT_ID}}.

If the request is about medical advice (diagnosis, treatment, medication), respond:
{{
  "intent": "refuse",
  "reasoning": "This is a medical advice request which I cannot handle",
  "actions": []
}}

Example:

User: "Schedule a cardiology appointment for Ravi Kumar next week"
Response:
{{
  "intent": "schedule_appointment",
  "reasoning": "User wants to book a cardiology appointment for patient Ravi Kumar in the next week",
  "actions": [
    {{"function": "search_patient", "args": {{"name": "Ravi Kumar"}}}},
    {{"function": "find_available_slots", "args": {{"specialty": "cardiology", "start_date": "2025-12-26", "end_date": "2026-01-02"}}}},
    {{"function": "book_appointment", "args": {{"patient_id": "{{PATIENT_ID}}", "slot_id": "{{SLOT_ID}}", "reason": "Cardiology follow-up"}}}}
  ]
}}

Now process this request:
User: {user_input}

Response (JSON only):"#
    )
}

/// Decode the planner's raw text into a [`ParsedPlan`].
///
/// Never fails: any unusable input comes back as an `error` plan.
pub fn parse_response(text: &str) -> ParsedPlan {
    let stripped = strip_code_fences(text);

    let Some(span) = find_balanced_json(&stripped) else {
        return ParsedPlan::error("could not find a JSON object in planner response");
    };

    let value: Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => return ParsedPlan::error(format!("planner JSON did not decode: {e}")),
    };

    let intent = value["intent"]
        .as_str()
        .map(PlanIntent::from_wire)
        .unwrap_or(PlanIntent::Error);

    let reasoning = value["reasoning"].as_str().unwrap_or_default().to_string();

    let actions = value["actions"]
        .as_array()
        .map(|entries| entries.iter().filter_map(decode_action).collect())
        .unwrap_or_default();

    ParsedPlan {
        intent,
        reasoning,
        actions,
    }
}

/// Decode a single `{function, args}` entry; entries without a function name
/// are dropped.
fn decode_action(entry: &Value) -> Option<Intent> {
    let function = entry["function"].as_str()?.to_string();

    let mut args = BTreeMap::new();
    if let Some(map) = entry["args"].as_object() {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                // Nested structures are not part of the argument schema.
                _ => continue,
            };
            args.insert(key.clone(), rendered);
        }
    }

    Some(Intent {
        action: function,
        args,
    })
}

/// Remove markdown code-fence markers the model may wrap its JSON in.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Find the first balanced `{...}` span, honoring JSON string escapes.
fn find_balanced_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ActionKind;

    struct CannedBackend(String);

    #[async_trait]
    impl PlannerBackend for CannedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl PlannerBackend for FailingBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(AgentError::Planner {
                reason: "endpoint unreachable".into(),
            })
        }
    }

    const SCHEDULE_RESPONSE: &str = r#"{
        "intent": "schedule_appointment",
        "reasoning": "book cardiology for Ravi Kumar",
        "actions": [
            {"function": "search_patient", "args": {"name": "Ravi Kumar"}},
            {"function": "find_available_slots", "args": {"specialty": "cardiology", "start_date": "2026-09-02", "end_date": "2026-09-09"}},
            {"function": "book_appointment", "args": {"patient_id": "{PATIENT_ID}", "slot_id": "{SLOT_ID}"}}
        ]
    }"#;

    #[test]
    fn parse_plain_plan() {
        let plan = parse_response(SCHEDULE_RESPONSE);
        assert_eq!(plan.intent, PlanIntent::ScheduleAppointment);
        assert_eq!(plan.actions.len(), 3);
        assert_eq!(plan.actions[0].action, ActionKind::SearchPatient.name());
        assert_eq!(
            plan.actions[2].args.get("slot_id").map(String::as_str),
            Some("{SLOT_ID}")
        );
    }

    #[test]
    fn parse_fenced_plan_with_surrounding_prose() {
        let text = format!("Here is my plan:\n```json\n{SCHEDULE_RESPONSE}\n```\nLet me know!");
        let plan = parse_response(&text);
        assert_eq!(plan.intent, PlanIntent::ScheduleAppointment);
        assert_eq!(plan.actions.len(), 3);
    }

    #[test]
    fn parse_refusal_plan() {
        let text = r#"{"intent": "refuse", "reasoning": "medical advice request", "actions": []}"#;
        let plan = parse_response(text);
        assert_eq!(plan.intent, PlanIntent::Refuse);
        assert_eq!(plan.reasoning, "medical advice request");
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn parse_garbage_yields_error_plan() {
        let plan = parse_response("I am sorry, I cannot produce JSON today.");
        assert_eq!(plan.intent, PlanIntent::Error);
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn parse_unbalanced_json_yields_error_plan() {
        let plan = parse_response(r#"{"intent": "search_patient", "actions": ["#);
        assert_eq!(plan.intent, PlanIntent::Error);
    }

    #[test]
    fn parse_unknown_intent_yields_error_plan() {
        let text = r#"{"intent": "write_poetry", "reasoning": "", "actions": []}"#;
        assert_eq!(parse_response(text).intent, PlanIntent::Error);
    }

    #[test]
    fn numeric_args_are_stringified() {
        let text = r#"{"intent": "search_patient", "reasoning": "",
            "actions": [{"function": "search_patient", "args": {"name": "Ravi", "limit": 3}}]}"#;
        let plan = parse_response(text);
        assert_eq!(
            plan.actions[0].args.get("limit").map(String::as_str),
            Some("3")
        );
    }

    #[test]
    fn actions_without_function_are_dropped() {
        let text = r#"{"intent": "search_patient", "reasoning": "",
            "actions": [{"args": {"name": "Ravi"}}, {"function": "search_patient", "args": {}}]}"#;
        let plan = parse_response(text);
        assert_eq!(plan.actions.len(), 1);
    }

    #[test]
    fn balanced_finder_respects_braces_in_strings() {
        let text = r#"noise {"reasoning": "use {PATIENT_ID} here", "intent": "search_patient", "actions": []} trailing"#;
        let span = find_balanced_json(text).unwrap();
        assert!(span.starts_with('{') && span.ends_with('}'));
        let plan = parse_response(text);
        assert_eq!(plan.intent, PlanIntent::SearchPatient);
    }

    #[test]
    fn prompt_embeds_catalog_and_user_text() {
        let prompt = build_prompt("Check insurance for P001");
        assert!(prompt.contains("check_insurance_eligibility"));
        assert!(prompt.contains("book_appointment"));
        assert!(prompt.contains("Check insurance for P001"));
    }

    #[tokio::test]
    async fn plan_via_backend() {
        let planner = Planner::new(Arc::new(CannedBackend(SCHEDULE_RESPONSE.to_string())));
        let plan = planner.plan("schedule cardiology for Ravi Kumar").await.unwrap();
        assert_eq!(plan.intent, PlanIntent::ScheduleAppointment);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_planner_error() {
        let planner = Planner::new(Arc::new(FailingBackend));
        let err = planner.plan("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Planner { .. }));
    }
}
