//! Match analysis tests: validation, scoring and the generative cascade

mod helpers;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use helpers::*;
use kinmatch_common::model::{FamilyContext, PersonName, PersonRecord, Subject};
use kinmatch_resolver::analysis::{
    ChatCompletionsProvider, GenerativeProvider, MatchAnalysisOrchestrator, ModelEndpoint,
};
use kinmatch_resolver::names::{MatchOptions, NameMatcher};
use kinmatch_resolver::scoring::{ConfidenceScorer, SearchContext};
use kinmatch_resolver::types::{AnalysisMethod, Recommendation};
use kinmatch_resolver::validators::RecordValidator;
use serde_json::{json, Value};
use std::sync::Arc;

const STRATEGY: &str = r#"{
    "nameVariations": ["William Smith", "Wm Smith"],
    "locationVariations": ["Suffolk, England"],
    "dateRanges": [{"start": 1848, "end": 1852}],
    "recordTypes": ["Census", "Parish register"],
    "searchTerms": ["Ipswich"]
}"#;

const JUDGMENT: &str = r#"{"confidence": 0.92, "reasoning": "Names, dates and place agree",
    "matchingFactors": ["Exact name", "Same birth year"], "concerns": [],
    "recommendation": "accept"}"#;

#[test]
fn test_parent_too_young_is_flagged() {
    let person = PersonRecord::new("Alice", "Green").born(Some("1920-03-15"), None);
    let family = FamilyContext {
        father: Some(PersonRecord::new("Tom", "Green").born(Some("1955-01-01"), None)),
        ..Default::default()
    };
    let subject = Subject::new("I5", person).with_family(family);

    let result = RecordValidator::new().validate_subject(&subject);

    assert!(!result.is_valid);
    assert!(result.has_issue("parent_too_young"));
    assert!(result.validation_score < 1.0);
}

#[test]
fn test_overall_confidence_is_weighted_factor_sum() {
    let scorer = ConfidenceScorer::default();
    let subject = william_smith();
    let records = [
        candidate("a", "William Smith", Some("1850"), Some("Ipswich, Suffolk, England")),
        candidate("b", "Bill Smyth", Some("1853"), Some("Norfolk, England")),
        candidate("c", "Henrietta Olsen", None, None),
    ];

    for record in &records {
        let result = scorer.calculate_confidence(&subject, record, &SearchContext::default());
        assert!((result.overall_confidence - result.scores.weighted_sum()).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&result.overall_confidence));
    }
}

#[test]
fn test_nickname_scores_above_unrelated_name() {
    let names = NameMatcher::default();
    let options = MatchOptions::default();
    assert!(names.match_names("William", "Bill", &options) > names.match_names("William", "Henry", &options));
    assert_eq!(names.match_names("Smith", "smith", &options), 1.0);

    let full = names.match_full_names(
        &PersonName::new("William", "Smith"),
        &PersonName::new("Bill", "Smith"),
        &options,
    );
    assert!(full.given_name_score >= 0.85);
    assert_eq!(full.family_name_score, 1.0);
}

#[tokio::test]
async fn test_mock_cemetery_candidate_is_rejected() {
    let generator = ScriptedGenerator::new(&["primary"], vec![("primary", Ok(JUDGMENT))]);
    let orchestrator =
        MatchAnalysisOrchestrator::new(Some(generator.clone() as Arc<dyn GenerativeProvider>));
    let record = candidate("c9", "William Smith", Some("1850"), Some("Mock Cemetery, Mock City"));

    let analysis = orchestrator.analyze_record_match(&william_smith(), &record).await;

    assert_eq!(analysis.final_recommendation.recommendation, Recommendation::Reject);
    assert_eq!(analysis.ai.confidence, 0.0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_ai_strategy_from_scripted_provider() {
    let generator = ScriptedGenerator::new(
        &["primary"],
        vec![("primary", Ok(STRATEGY))],
    );
    let orchestrator = MatchAnalysisOrchestrator::new(Some(generator.clone() as Arc<dyn GenerativeProvider>));

    let strategy = orchestrator.generate_search_queries(&william_smith()).await;

    assert_eq!(strategy.method, AnalysisMethod::Ai);
    assert_eq!(strategy.name_variations[1], "Wm Smith");
    assert_eq!(strategy.date_ranges[0].start, 1848);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_strategy_reply_that_is_not_json_falls_back() {
    let generator = ScriptedGenerator::new(&["primary"], vec![("primary", Ok("I cannot help"))]);
    let orchestrator = MatchAnalysisOrchestrator::new(Some(generator as Arc<dyn GenerativeProvider>));

    let strategy = orchestrator.generate_search_queries(&william_smith()).await;

    assert_eq!(strategy.method, AnalysisMethod::EnhancedFallback);
    assert_eq!(strategy.name_variations[0], "William Smith");
}

async fn chat_completions(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer sk-test");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"}))).into_response();
    }
    match body["model"].as_str() {
        Some("retired-model") => {
            (StatusCode::NOT_FOUND, Json(json!({"error": "model not found"}))).into_response()
        }
        _ => Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": JUDGMENT } }]
        }))
        .into_response(),
    }
}

#[tokio::test]
async fn test_chat_completions_cascade_against_fake_service() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/v1/chat/completions", post(chat_completions));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let provider = ChatCompletionsProvider::new(
        reqwest::Client::new(),
        "sk-test",
        format!("http://{}/v1/chat/completions", addr),
        vec![ModelEndpoint::new("retired-model"), ModelEndpoint::new("current-model")],
    );
    let orchestrator = MatchAnalysisOrchestrator::new(Some(Arc::new(provider)));
    let record = candidate("c1", "William Smith", Some("1850"), Some("Ipswich, Suffolk, England"));

    let analysis = orchestrator.analyze_record_match(&william_smith(), &record).await;

    assert_eq!(analysis.ai.method, AnalysisMethod::Ai);
    assert_eq!(analysis.ai.model.as_deref(), Some("current-model"));
    assert!((analysis.ai.confidence - 0.92).abs() < 1e-9);
    assert_eq!(analysis.ai.recommendation, Recommendation::Accept);
    assert_eq!(orchestrator.resolved_model().as_deref(), Some("current-model"));

    let expected = 0.6 * 0.92 + 0.4 * analysis.confidence.overall_confidence;
    assert!((analysis.final_recommendation.score - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_rejected_key_uses_enhanced_fallback() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/v1/chat/completions", post(chat_completions));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let provider = ChatCompletionsProvider::new(
        reqwest::Client::new(),
        "sk-wrong",
        format!("http://{}/v1/chat/completions", addr),
        vec![ModelEndpoint::new("current-model")],
    );
    let orchestrator = MatchAnalysisOrchestrator::new(Some(Arc::new(provider)));
    let record = candidate("c1", "William Smith", Some("1850"), None);

    let analysis = orchestrator.analyze_record_match(&william_smith(), &record).await;

    assert_eq!(analysis.ai.method, AnalysisMethod::EnhancedFallback);
    assert!(analysis.ai.model.is_none());
    assert!(orchestrator.resolved_model().is_none());
}
