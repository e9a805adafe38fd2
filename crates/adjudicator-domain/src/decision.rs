//! Approve/reject decisions

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two possible verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The claim is covered
    Approved,
    /// The claim is not covered
    Rejected,
}

impl Verdict {
    /// Parse a verdict label, ignoring case and surrounding whitespace
    ///
    /// Anything other than "approved" or "rejected" is `None`; in particular
    /// the template placeholder "Approved/Rejected" is rejected.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Verdict::Approved),
            "rejected" => Some(Verdict::Rejected),
            _ => None,
        }
    }

    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "Approved",
            Verdict::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured decision returned by the decision engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Approved or Rejected
    pub decision: Verdict,

    /// Payable amount, may be empty or "N/A"
    #[serde(default)]
    pub amount: String,

    /// Reason for the decision, referencing a clause
    pub justification: String,
}

/// Outcome of the decision step
///
/// The LLM may ignore the requested answer format. In that case the raw
/// reply is kept and the request must be treated as pending manual review.
/// Serializes as the decision object or as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionOutcome {
    /// The reply contained a well-formed decision object
    Structured(Decision),
    /// The raw reply text
    Unstructured(String),
}

impl DecisionOutcome {
    /// The structured decision, if any
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            DecisionOutcome::Structured(decision) => Some(decision),
            DecisionOutcome::Unstructured(_) => None,
        }
    }

    /// True when a human has to look at the raw reply
    pub fn is_pending_review(&self) -> bool {
        matches!(self, DecisionOutcome::Unstructured(_))
    }
}
