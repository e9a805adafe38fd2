//! LLM prompts for query parsing and decisions

use adjudicator_domain::{ParsedQuery, RetrievedClause};

/// Builds the structured-extraction prompt for a free-text query
///
/// # Examples
///
/// ```
/// use adjudicator_engine::prompt::query_parser_prompt;
///
/// let prompt = query_parser_prompt("46M, knee surgery, Pune, 3-month policy");
/// assert!(prompt.contains("Input: \"46M, knee surgery, Pune, 3-month policy\""));
/// ```
pub fn query_parser_prompt(query: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(QUERY_PARSER_INSTRUCTIONS);
    prompt.push_str(&format!("\nInput: \"{}\"\n\n", query));
    prompt.push_str(QUERY_PARSER_FORMAT);
    prompt
}

/// Builds the decision prompt from the parsed query and retrieved clauses
///
/// The parsed query is embedded verbatim as JSON so the decision is made on
/// exactly the fields the parser produced.
pub fn decision_prompt(
    parsed: &ParsedQuery,
    clauses: &[RetrievedClause],
) -> Result<String, serde_json::Error> {
    let mut prompt = String::new();

    prompt.push_str("Query Info:\n");
    prompt.push_str(&serde_json::to_string_pretty(parsed)?);
    prompt.push_str("\n\n");

    prompt.push_str("Relevant Clauses:\n");
    if clauses.is_empty() {
        prompt.push_str("(none)\n");
    }
    for (n, clause) in clauses.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", n + 1, clause.text.trim()));
    }
    prompt.push('\n');

    prompt.push_str(DECISION_FORMAT);
    Ok(prompt)
}

const QUERY_PARSER_INSTRUCTIONS: &str = r#"You are an expert insurance query parser.
Extract these fields from the input query:
- age (as number)
- gender (male/female)
- procedure (surgery, consultation etc.)
- location (city or state)
- policy_duration (e.g. '3-month', '1 year')"#;

const QUERY_PARSER_FORMAT: &str = r#"Respond ONLY with JSON like this (no explanation, no markdown):

{
  "age": 46,
  "gender": "male",
  "procedure": "knee surgery",
  "location": "Pune",
  "policy_duration": "3-month"
}
"#;

const DECISION_FORMAT: &str = r#"Answer in this JSON format:
{
  "decision": "Approved/Rejected",
  "amount": "Amount in INR if applicable",
  "justification": "Reason for decision with referenced clause"
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use adjudicator_domain::Gender;

    #[test]
    fn test_query_prompt_lists_fields() {
        let prompt = query_parser_prompt("knee surgery");
        for field in ["age", "gender", "procedure", "location", "policy_duration"] {
            assert!(prompt.contains(field), "prompt should mention {}", field);
        }
        assert!(prompt.contains("Respond ONLY with JSON"));
    }

    #[test]
    fn test_decision_prompt_contains_parsed_query_verbatim() {
        let parsed = ParsedQuery {
            age: Some(46),
            gender: Some(Gender::Male),
            location: Some("Pune".to_string()),
            ..Default::default()
        };
        let clauses = vec![RetrievedClause {
            rank: 0,
            chunk_index: 2,
            text: "  Knee surgery is covered.  ".to_string(),
            distance: 0.1,
        }];

        let prompt = decision_prompt(&parsed, &clauses).unwrap();

        assert!(prompt.contains(&serde_json::to_string_pretty(&parsed).unwrap()));
        assert!(prompt.contains("[1] Knee surgery is covered.\n"));
        assert!(prompt.contains("\"decision\": \"Approved/Rejected\""));
    }

    #[test]
    fn test_decision_prompt_without_clauses() {
        let prompt = decision_prompt(&ParsedQuery::default(), &[]).unwrap();
        assert!(prompt.contains("Relevant Clauses:\n(none)"));
    }
}
