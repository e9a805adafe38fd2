//! Decision Engine: parsed query plus clauses to an approve/reject decision

use crate::error::EngineError;
use crate::generate_with_timeout;
use crate::json::first_json_object;
use crate::prompt::decision_prompt;
use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use adjudicator_domain::{Decision, DecisionOutcome, ParsedQuery, RetrievedClause, Verdict};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Asks the LLM for a decision on a parsed query
pub struct DecisionEngine<L> {
    llm: Arc<L>,
    timeout: Duration,
}

impl<L> DecisionEngine<L>
where
    L: LlmProvider,
{
    /// Create an engine whose LLM calls give up after `timeout`
    pub fn new(llm: Arc<L>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Decide a parsed query against the retrieved clauses
    ///
    /// Uses the most deterministic sampling the provider offers. A reply
    /// without a well-formed decision object yields
    /// [`DecisionOutcome::Unstructured`], meaning manual review.
    pub async fn decide(
        &self,
        parsed: &ParsedQuery,
        clauses: &[RetrievedClause],
    ) -> Result<DecisionOutcome, EngineError> {
        let prompt = decision_prompt(parsed, clauses)
            .map_err(|e| EngineError::Internal(format!("Failed to encode query: {}", e)))?;

        let reply = generate_with_timeout(
            self.llm.as_ref(),
            &prompt,
            &GenerationOptions::deterministic(),
            self.timeout,
            "Decision",
        )
        .await?;

        let outcome = parse_decision_response(&reply);
        match outcome.decision() {
            Some(decision) => info!(decision = %decision.decision, clauses = clauses.len(), "Decision made"),
            None => info!(clauses = clauses.len(), "Decision pending manual review"),
        }
        Ok(outcome)
    }
}

/// Interpret the decision engine's reply
///
/// # Examples
///
/// ```
/// use adjudicator_engine::decision::parse_decision_response;
/// use adjudicator_domain::Verdict;
///
/// let outcome = parse_decision_response(
///     r#"Here you go: {"decision": "rejected", "amount": "", "justification": "Clause 4 requires 90 days"}"#,
/// );
/// assert_eq!(outcome.decision().unwrap().decision, Verdict::Rejected);
///
/// assert!(parse_decision_response("Looks covered to me.").is_pending_review());
/// ```
pub fn parse_decision_response(reply: &str) -> DecisionOutcome {
    match structured_decision(reply) {
        Ok(decision) => DecisionOutcome::Structured(decision),
        Err(reason) => {
            warn!(reason, raw_response = reply, "Decision reply is not a decision object");
            DecisionOutcome::Unstructured(reply.trim().to_string())
        }
    }
}

fn structured_decision(reply: &str) -> Result<Decision, &'static str> {
    let object = first_json_object(reply).ok_or("no JSON object")?;
    let value: Value = serde_json::from_str(object).map_err(|_| "invalid JSON")?;
    let fields = value.as_object().ok_or("not an object")?;

    let decision = fields
        .get("decision")
        .and_then(Value::as_str)
        .and_then(Verdict::parse)
        .ok_or("decision is not Approved or Rejected")?;

    let justification = fields
        .get("justification")
        .and_then(Value::as_str)
        .ok_or("missing justification")?
        .to_string();

    let amount = match fields.get("amount") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err("amount is not a string or number"),
    };

    Ok(Decision {
        decision,
        amount,
        justification,
    })
}
