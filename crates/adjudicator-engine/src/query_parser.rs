//! Query Parser: free text to structured query fields

use crate::error::EngineError;
use crate::json::strip_code_fence;
use crate::prompt::query_parser_prompt;
use crate::generate_with_timeout;
use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use adjudicator_domain::{Gender, ParsedQuery, QueryOutcome};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Asks the LLM to extract structured fields from a query
pub struct QueryParser<L> {
    llm: Arc<L>,
    timeout: Duration,
}

impl<L> QueryParser<L>
where
    L: LlmProvider,
{
    /// Create a parser whose LLM calls give up after `timeout`
    pub fn new(llm: Arc<L>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Parse a free-text query
    ///
    /// A reply that is not a JSON object yields [`QueryOutcome::Unparsed`]
    /// rather than an error. The call is not retried on a bad reply.
    pub async fn parse(&self, query: &str) -> Result<QueryOutcome, EngineError> {
        let prompt = query_parser_prompt(query);
        let reply = generate_with_timeout(
            self.llm.as_ref(),
            &prompt,
            &GenerationOptions::default(),
            self.timeout,
            "Query parsing",
        )
        .await?;

        debug!(reply_chars = reply.len(), "Query parser replied");
        Ok(parse_query_response(&reply))
    }
}

/// Interpret the query parser's reply
///
/// # Examples
///
/// ```
/// use adjudicator_engine::query_parser::parse_query_response;
///
/// let outcome = parse_query_response(r#"{"age": 46, "gender": "Male", "location": "Pune"}"#);
/// let parsed = outcome.parsed().unwrap();
/// assert_eq!(parsed.age, Some(46));
/// assert_eq!(parsed.location.as_deref(), Some("Pune"));
///
/// assert!(parse_query_response("Sorry, I can't help.").is_error());
/// ```
pub fn parse_query_response(reply: &str) -> QueryOutcome {
    let output = reply.trim();

    match serde_json::from_str::<Value>(strip_code_fence(output)) {
        Ok(Value::Object(fields)) => QueryOutcome::Parsed(fields_from_object(&fields)),
        Ok(_) | Err(_) => {
            warn!(raw_response = output, "LLM response could not be parsed as a JSON object");
            QueryOutcome::unparsed(output)
        }
    }
}

fn fields_from_object(fields: &Map<String, Value>) -> ParsedQuery {
    ParsedQuery {
        age: fields.get("age").and_then(parse_age),
        gender: fields.get("gender").and_then(parse_gender),
        procedure: string_field(fields, "procedure"),
        location: string_field(fields, "location"),
        policy_duration: string_field(fields, "policy_duration"),
    }
}

fn parse_age(value: &Value) -> Option<u32> {
    let age = match value {
        Value::Null => return None,
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .and_then(|age| u32::try_from(age).ok());

    if age.is_none() {
        warn!(value = %value, "Dropping age that is not a non-negative integer");
    }
    age
}

fn parse_gender(value: &Value) -> Option<Gender> {
    let gender = match value {
        Value::Null => return None,
        Value::String(s) => Gender::parse(s),
        _ => None,
    };

    if gender.is_none() {
        warn!(value = %value, "Dropping unrecognized gender");
    }
    gender
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            warn!(field = name, value = %other, "Dropping field that is not a string");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjudicator_llm::MockProvider;

    #[test]
    fn test_full_reply() {
        let outcome = parse_query_response(
            r#"{"age": 46, "gender": "male", "procedure": "knee surgery", "location": "Pune", "policy_duration": "3-month"}"#,
        );
        assert_eq!(
            outcome,
            QueryOutcome::Parsed(ParsedQuery {
                age: Some(46),
                gender: Some(Gender::Male),
                procedure: Some("knee surgery".to_string()),
                location: Some("Pune".to_string()),
                policy_duration: Some("3-month".to_string()),
            })
        );
    }

    #[test]
    fn test_missing_fields_not_defaulted() {
        let outcome = parse_query_response(r#"{"procedure": "cataract"}"#);
        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.procedure.as_deref(), Some("cataract"));
        assert!(parsed.age.is_none());
        assert!(parsed.gender.is_none());

        let json = serde_json::to_value(parsed).unwrap();
        assert_eq!(json, serde_json::json!({"procedure": "cataract"}));
    }

    #[test]
    fn test_code_fence_stripped() {
        let outcome = parse_query_response("```json\n{\"age\": 30}\n```");
        assert_eq!(outcome.parsed().unwrap().age, Some(30));
    }

    #[test]
    fn test_age_variants() {
        let age = |v: &str| {
            parse_query_response(&format!("{{\"age\": {}}}", v))
                .parsed()
                .unwrap()
                .age
        };
        assert_eq!(age("46"), Some(46));
        assert_eq!(age("46.0"), Some(46));
        assert_eq!(age("\"46\""), Some(46));
        assert_eq!(age("-3"), None);
        assert_eq!(age("46.5"), None);
        assert_eq!(age("\"forty\""), None);
        assert_eq!(age("null"), None);
    }

    #[test]
    fn test_gender_case_insensitive_and_unknown_dropped() {
        let gender = |v: &str| {
            parse_query_response(&format!("{{\"gender\": \"{}\"}}", v))
                .parsed()
                .unwrap()
                .gender
        };
        assert_eq!(gender("FEMALE"), Some(Gender::Female));
        assert_eq!(gender("Male"), Some(Gender::Male));
        assert_eq!(gender("unknown"), None);
    }

    #[test]
    fn test_wrong_type_string_field_dropped() {
        let outcome = parse_query_response(r#"{"policy_duration": 3, "location": "Pune"}"#);
        let parsed = outcome.parsed().unwrap();
        assert!(parsed.policy_duration.is_none());
        assert_eq!(parsed.location.as_deref(), Some("Pune"));
    }

    #[test]
    fn test_prose_is_unparsed() {
        let outcome = parse_query_response("  I think the patient is 46.  ");
        match outcome {
            QueryOutcome::Unparsed {
                error,
                raw_response,
            } => {
                assert_eq!(error, "Failed to parse query");
                assert_eq!(raw_response, "I think the patient is 46.");
            }
            other => panic!("expected unparsed outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json_is_unparsed() {
        assert!(parse_query_response("[1, 2, 3]").is_error());
        assert!(parse_query_response("\"male\"").is_error());
    }

    #[tokio::test]
    async fn test_parse_sends_query_in_prompt() {
        let llm = Arc::new(MockProvider::new(
            r#"{"age": 46, "gender": "male", "procedure": "knee surgery", "location": "Pune", "policy_duration": "3-month"}"#,
        ));
        let parser = QueryParser::new(Arc::clone(&llm), Duration::from_secs(5));

        let query = "46-year-old male, knee surgery in Pune, 3-month policy";
        let outcome = parser.parse(query).await.unwrap();

        let parsed = outcome.parsed().unwrap();
        assert_eq!(parsed.age, Some(46));
        assert_eq!(parsed.gender, Some(Gender::Male));
        assert_eq!(parsed.location.as_deref(), Some("Pune"));

        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompts()[0].contains(query));
        assert_eq!(llm.last_options().unwrap().temperature, None);
    }

    #[tokio::test]
    async fn test_llm_failure_is_external_service_error() {
        let mut llm = MockProvider::default();
        llm.add_error("query parser");
        let parser = QueryParser::new(Arc::new(llm), Duration::from_secs(5));

        let result = parser.parse("anything").await;
        assert!(matches!(result, Err(EngineError::ExternalService(_))));
    }
}
