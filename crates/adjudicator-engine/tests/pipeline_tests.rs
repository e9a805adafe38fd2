//! End-to-end pipeline tests with a mock LLM and the feature-hash embedder

use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use adjudicator_domain::{Gender, Verdict};
use adjudicator_engine::{EngineConfig, EngineError, Pipeline, QueryRequest};
use adjudicator_extractor::{DocumentExtractor, DocumentFormat};
use adjudicator_llm::{LlmError, MockProvider};
use adjudicator_store::{DecisionLog, HashEmbeddingModel, IndexRegistry};
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::Arc;
use std::time::Duration;

const KNEE_CLAUSE: &str =
    "Knee surgery is covered up to INR 150000 for policies older than 90 days";

const PUNE_QUERY: &str = "46-year-old male, knee surgery in Pune, 3-month-old insurance policy";

const PARSER_REPLY: &str = r#"{"age": 46, "gender": "male", "procedure": "knee surgery", "location": "Pune", "policy_duration": "3-month"}"#;

const DECISION_REPLY: &str = "```json\n{\"decision\": \"Rejected\", \"amount\": \"\", \"justification\": \"Knee surgery is covered only for policies older than 90 days; this policy is 3 months old.\"}\n```";

fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![40.into(), 780.into()]),
        ];
        for line in lines.iter() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn policy_pdf() -> Vec<u8> {
    build_pdf(&[
        &[
            "Section 1. General conditions.",
            "Claims must be filed within 30 days of discharge.",
        ],
        &[KNEE_CLAUSE],
    ])
}

fn scripted_llm() -> MockProvider {
    let mut llm = MockProvider::default();
    llm.add_response("expert insurance query parser", PARSER_REPLY);
    llm.add_response("Relevant Clauses", DECISION_REPLY);
    llm
}

fn pipeline_with<L: LlmProvider + 'static>(
    llm: L,
    config: EngineConfig,
) -> Pipeline<L, HashEmbeddingModel> {
    Pipeline::new(
        Arc::new(llm),
        Arc::new(HashEmbeddingModel::default()),
        DocumentExtractor::default(),
        Arc::new(IndexRegistry::default()),
        config,
    )
}

#[tokio::test]
async fn test_upload_then_query() {
    let llm = scripted_llm();
    let pipeline = pipeline_with(llm.clone(), EngineConfig::default());

    let ingest = pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();
    assert_eq!(ingest.format, DocumentFormat::Pdf);
    assert!(ingest.chunk_count >= 1);
    assert_eq!(pipeline.registry().len(), 1);

    let report = pipeline
        .query(QueryRequest::new(PUNE_QUERY).for_document(ingest.document_id))
        .await
        .unwrap();

    assert_eq!(report.document_id, ingest.document_id);
    assert!(report.id.is_none(), "no decision log configured");

    let parsed = report.parsed.parsed().expect("query should parse");
    assert_eq!(parsed.age, Some(46));
    assert_eq!(parsed.gender, Some(Gender::Male));
    assert_eq!(parsed.location.as_deref(), Some("Pune"));

    assert!(!report.retrieved_clauses.is_empty());
    assert!(report.retrieved_clauses.len() <= 5);
    let retrieved: String = report
        .retrieved_clauses
        .iter()
        .map(|c| c.text.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");
    assert!(retrieved.contains("Knee surgery is covered"));

    let decision = report
        .decision
        .as_ref()
        .and_then(|d| d.decision())
        .expect("structured decision");
    assert_eq!(decision.decision, Verdict::Rejected);
    assert!(decision.justification.contains("90 days"));

    // One parse call and one decision call
    assert_eq!(llm.call_count(), 2);

    let prompts = llm.prompts();
    let decision_prompt = prompts
        .iter()
        .find(|p| p.contains("Relevant Clauses"))
        .expect("decision prompt sent");
    let parsed_json = serde_json::to_string_pretty(parsed).unwrap();
    assert!(decision_prompt.contains(&parsed_json));
    assert!(decision_prompt.contains("[1] "));
}

#[tokio::test]
async fn test_query_defaults_to_latest_upload() {
    let pipeline = pipeline_with(scripted_llm(), EngineConfig::default());

    pipeline.ingest("old.pdf", policy_pdf()).await.unwrap();
    let latest = pipeline.ingest("new.pdf", policy_pdf()).await.unwrap();

    let report = pipeline.query(QueryRequest::new(PUNE_QUERY)).await.unwrap();
    assert_eq!(report.document_id, latest.document_id);
}

#[tokio::test]
async fn test_top_k_limits_clauses() {
    let pipeline = pipeline_with(scripted_llm(), EngineConfig::default());
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let report = pipeline
        .query(QueryRequest::new(PUNE_QUERY).with_top_k(1))
        .await
        .unwrap();

    assert_eq!(report.retrieved_clauses.len(), 1);
    assert_eq!(report.retrieved_clauses[0].rank, 0);
}

#[tokio::test]
async fn test_unparsed_query_skips_decision() {
    let mut llm = MockProvider::default();
    llm.add_response("expert insurance query parser", "Sorry, I cannot help with that.");
    let pipeline = pipeline_with(llm.clone(), EngineConfig::default());
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let report = pipeline.query(QueryRequest::new(PUNE_QUERY)).await.unwrap();

    assert!(report.parsed.is_error());
    assert!(report.decision.is_none());
    assert!(!report.retrieved_clauses.is_empty());
    assert_eq!(llm.call_count(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["parsed"]["raw_response"], "Sorry, I cannot help with that.");
    assert!(json["decision"].is_null());
}

#[tokio::test]
async fn test_query_with_no_extracted_fields_still_decided() {
    let mut llm = MockProvider::default();
    llm.add_response("expert insurance query parser", "{}");
    llm.add_response("Relevant Clauses", DECISION_REPLY);
    let pipeline = pipeline_with(llm.clone(), EngineConfig::default());
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let report = pipeline.query(QueryRequest::new("knee")).await.unwrap();

    let parsed = report.parsed.parsed().unwrap();
    assert!(parsed.is_empty());
    assert!(report.decision.is_some());
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_free_text_decision_needs_review() {
    let mut llm = MockProvider::default();
    llm.add_response("expert insurance query parser", PARSER_REPLY);
    llm.add_response("Relevant Clauses", "It depends on the waiting period.");
    let pipeline = pipeline_with(llm, EngineConfig::default());
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let report = pipeline.query(QueryRequest::new(PUNE_QUERY)).await.unwrap();

    let decision = report.decision.unwrap();
    assert!(decision.is_pending_review());
    assert_eq!(
        serde_json::to_value(&decision).unwrap(),
        "It depends on the waiting period."
    );
}

#[tokio::test]
async fn test_llm_failure_is_external_service_error() {
    let mut llm = MockProvider::default();
    llm.add_error("expert insurance query parser");
    let pipeline = pipeline_with(llm, EngineConfig::default());
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let result = pipeline.query(QueryRequest::new(PUNE_QUERY)).await;
    assert!(matches!(result, Err(EngineError::ExternalService(_))));
}

#[tokio::test]
async fn test_unknown_document_after_upload() {
    let pipeline = pipeline_with(scripted_llm(), EngineConfig::default());
    let ingest = pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();
    pipeline.registry().remove(ingest.document_id);

    let result = pipeline
        .query(QueryRequest::new(PUNE_QUERY).for_document(ingest.document_id))
        .await;

    assert!(matches!(result, Err(EngineError::DocumentNotFound(id)) if id == ingest.document_id));
}

#[tokio::test]
async fn test_empty_pdf_rejected() {
    let pipeline = pipeline_with(scripted_llm(), EngineConfig::default());
    let result = pipeline.ingest("blank.pdf", build_pdf(&[&[]])).await;

    assert!(matches!(result, Err(EngineError::Extraction(_))));
    assert!(pipeline.registry().is_empty());
}

#[tokio::test]
async fn test_decision_log_records_queries() {
    let dir = tempfile::tempdir().unwrap();
    let log = DecisionLog::new(dir.path().join("decisions.db")).unwrap();
    let pipeline =
        pipeline_with(scripted_llm(), EngineConfig::default()).with_decision_log(log);
    assert!(pipeline.decision_log_enabled());

    let ingest = pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();
    let first = pipeline.query(QueryRequest::new(PUNE_QUERY)).await.unwrap();
    let second = pipeline
        .query(QueryRequest::new("knee surgery for a 60 year old woman"))
        .await
        .unwrap();

    let first_id = first.id.expect("logged");
    let second_id = second.id.expect("logged");
    assert!(second_id > first_id);
    assert_eq!(pipeline.decision_count().await.unwrap(), 2);

    let stored = pipeline.decision(first_id).await.unwrap().unwrap();
    assert_eq!(stored.query, PUNE_QUERY);
    assert_eq!(stored.document_id, Some(ingest.document_id));
    assert_eq!(stored.retrieved_clauses, first.retrieved_clauses);
    assert_eq!(stored.decision, first.decision);

    let recent = pipeline.recent_decisions(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, second_id);

    assert!(pipeline.decision(9999).await.unwrap().is_none());
}

/// An LLM that never answers within the test's patience
struct StalledProvider;

#[async_trait]
impl LlmProvider for StalledProvider {
    type Error = LlmError;

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, Self::Error> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(PARSER_REPLY.to_string())
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test]
async fn test_llm_timeout() {
    let config = EngineConfig {
        llm_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let pipeline = pipeline_with(StalledProvider, config);
    pipeline.ingest("policy.pdf", policy_pdf()).await.unwrap();

    let result = pipeline.query(QueryRequest::new(PUNE_QUERY)).await;

    match result {
        Err(e @ EngineError::Timeout(_)) => assert_eq!(e.kind(), "timeout"),
        other => panic!("expected timeout, got {:?}", other),
    }
}
