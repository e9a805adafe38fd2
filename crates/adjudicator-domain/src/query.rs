//! Parsed insurance queries
//!
//! A free-text query such as "46-year-old male, knee surgery in Pune,
//! 3-month policy" is turned into a [`ParsedQuery`] by an LLM. The LLM is not
//! trusted to follow the requested format, so the outcome of parsing is a
//! [`QueryOutcome`] that may carry the raw reply instead.

use serde::{Deserialize, Serialize};

/// Error message carried by an unparsed query outcome
pub const QUERY_PARSE_ERROR: &str = "Failed to parse query";

/// Gender of the insured person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
}

impl Gender {
    /// Parse a gender label, ignoring case and surrounding whitespace
    ///
    /// Returns `None` for anything other than "male" or "female".
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Lowercase label used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Structured fields extracted from a free-text query
///
/// Every field is optional: a field the LLM did not produce is absent from
/// the result, never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Age of the insured person in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    /// Gender of the insured person
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    /// Medical procedure, e.g. "knee surgery"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,

    /// City or state where the procedure happens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// How long the policy has been held, e.g. "3-month"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_duration: Option<String>,
}

impl ParsedQuery {
    /// True when no field was extracted
    pub fn is_empty(&self) -> bool {
        self.age.is_none()
            && self.gender.is_none()
            && self.procedure.is_none()
            && self.location.is_none()
            && self.policy_duration.is_none()
    }
}

/// Result of asking the LLM to parse a query
///
/// Serializes either as the parsed fields or as
/// `{"error": "Failed to parse query", "raw_response": "..."}`. Callers must
/// check for the error shape before using the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    /// The LLM reply was not a JSON object
    Unparsed {
        /// Always [`QUERY_PARSE_ERROR`]
        error: String,
        /// The reply text as received
        raw_response: String,
    },

    /// The LLM reply parsed into structured fields
    Parsed(ParsedQuery),
}

impl QueryOutcome {
    /// Build the error record for a reply that could not be parsed
    pub fn unparsed(raw_response: impl Into<String>) -> Self {
        QueryOutcome::Unparsed {
            error: QUERY_PARSE_ERROR.to_string(),
            raw_response: raw_response.into(),
        }
    }

    /// The parsed fields, if parsing succeeded
    pub fn parsed(&self) -> Option<&ParsedQuery> {
        match self {
            QueryOutcome::Parsed(query) => Some(query),
            QueryOutcome::Unparsed { .. } => None,
        }
    }

    /// True when this outcome is the error record
    pub fn is_error(&self) -> bool {
        matches!(self, QueryOutcome::Unparsed { .. })
    }
}
