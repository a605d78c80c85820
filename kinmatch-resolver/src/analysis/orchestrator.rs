//! Match Analysis Orchestrator
//!
//! Combines the deterministic components (NameMatcher, RecordValidator,
//! ConfidenceScorer) with an optional generative provider. Every call yields
//! a complete result: when no provider is configured, or every model in the
//! cascade fails, a deterministic fallback fills the generative slot.
//!
//! # Cascade
//! One attempt closure per model endpoint, evaluated in order. The model that
//! last produced a structurally valid response is tried first next time.
//! 400/404-class, network and shape failures move on to the next model;
//! 401/403/429 abandon the provider for the current call.

use super::generative::{
    ChatCompletionsProvider, Disposition, GenerationRequest, GenerativeError, GenerativeProvider,
    ModelEndpoint,
};
use super::placeholder_guard::PlaceholderGuard;
use super::prompts::{match_analysis_prompt, search_strategy_prompt};
use super::response_contract::{
    match_analysis_schema, parse_match_analysis, parse_search_strategy, search_strategy_schema,
};
use crate::names::{split_display_name, MatchOptions, NameMatcher};
use crate::scoring::{ConfidenceScorer, SearchContext};
use crate::types::{
    AiJudgment, AnalysisMethod, ConfidenceResult, DateRange, FinalRecommendation, MatchAnalysis,
    Recommendation, SearchStrategy, Severity, ValidationResult,
};
use crate::validators::RecordValidator;
use futures::future::{BoxFuture, FutureExt};
use kinmatch_common::config::TomlConfig;
use kinmatch_common::dates::{current_year, year_of};
use kinmatch_common::model::{CandidateRecord, RecordType, Subject};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Years either side of a known birth or death year searched by default
const DATE_WINDOW_RADIUS: i32 = 5;
/// Fallback blend of rule-based confidence and name similarity
const FALLBACK_RULE_WEIGHT: f64 = 0.7;
const FALLBACK_NAME_WEIGHT: f64 = 0.3;
/// Fallback confidence multiplier for internally inconsistent candidates
const INVALID_CANDIDATE_FACTOR: f64 = 0.5;

type Attempt = Box<dyn FnOnce() -> BoxFuture<'static, Result<(String, String), GenerativeError>> + Send>;

/// Result of running the model cascade
enum CascadeOutcome<T> {
    Success { value: T, model: String },
    /// No provider configured
    Unavailable,
    /// Provider configured, every attempt failed
    Exhausted(Option<GenerativeError>),
}

/// Match Analysis Orchestrator
pub struct MatchAnalysisOrchestrator {
    generator: Option<Arc<dyn GenerativeProvider>>,
    names: NameMatcher,
    validator: RecordValidator,
    scorer: ConfidenceScorer,
    guard: PlaceholderGuard,
    max_tokens: u32,
    temperature: f32,
    /// Last model id that produced a valid response
    resolved_model: Mutex<Option<String>>,
}

impl MatchAnalysisOrchestrator {
    pub fn new(generator: Option<Arc<dyn GenerativeProvider>>) -> Self {
        let names = NameMatcher::default();
        Self {
            generator,
            scorer: ConfidenceScorer::new(names.clone()),
            names,
            validator: RecordValidator::default(),
            guard: PlaceholderGuard::default(),
            max_tokens: 1500,
            temperature: 0.2,
            resolved_model: Mutex::new(None),
        }
    }

    /// Orchestrator wired from `[generative]`; deterministic only when no key resolves
    pub fn from_config(config: &TomlConfig, client: reqwest::Client) -> Self {
        let generator = ChatCompletionsProvider::from_config(config, client)
            .map(|p| Arc::new(p) as Arc<dyn GenerativeProvider>);
        if generator.is_none() {
            info!("No generative provider configured, analysis will use deterministic fallback");
        }
        Self::new(generator).with_generation_params(
            config.generative.max_tokens,
            config.generative.temperature,
        )
    }

    pub fn with_generation_params(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_names(mut self, names: NameMatcher) -> Self {
        self.scorer = ConfidenceScorer::new(names.clone());
        self.names = names;
        self
    }

    pub fn with_validator(mut self, validator: RecordValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_guard(mut self, guard: PlaceholderGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Model id cached from the last valid response
    pub fn resolved_model(&self) -> Option<String> {
        self.resolved_model.lock().ok().and_then(|m| m.clone())
    }

    /// Forget the cached model id
    pub fn invalidate_resolved_model(&self) {
        if let Ok(mut cached) = self.resolved_model.lock() {
            *cached = None;
        }
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn validator(&self) -> &RecordValidator {
        &self.validator
    }

    // ========================================================================
    // Search strategy
    // ========================================================================

    /// Plan searches for `subject`
    pub async fn generate_search_queries(&self, subject: &Subject) -> SearchStrategy {
        let (system_prompt, user_prompt) = search_strategy_prompt(subject);
        let request = GenerationRequest {
            system_prompt,
            user_prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_schema: Some(search_strategy_schema()),
        };

        match self.run_cascade(&request, parse_search_strategy).await {
            CascadeOutcome::Success { value, model } => {
                info!(subject = %subject.id, model = %model, "Search strategy generated");
                value
            }
            CascadeOutcome::Unavailable => self.fallback_strategy(subject, AnalysisMethod::Fallback),
            CascadeOutcome::Exhausted(last) => {
                warn!(
                    subject = %subject.id,
                    error = %describe(&last),
                    "Generative search planning failed, using fallback strategy"
                );
                self.fallback_strategy(subject, AnalysisMethod::EnhancedFallback)
            }
        }
    }

    /// Deterministic search strategy built from the subject's own data
    pub fn fallback_strategy(&self, subject: &Subject, method: AnalysisMethod) -> SearchStrategy {
        let person = &subject.person;
        let full = person.name.full();

        let mut name_variations = vec![full.clone()];
        let mut push_name = |name: String| {
            if !name.is_empty() && !name_variations.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                name_variations.push(name);
            }
        };
        for variant in self.names.generate_variants(&full).all() {
            push_name(variant);
        }
        if let Some(maiden) = crate::names::extract_maiden_name(&person.name) {
            push_name(format!("{} {}", person.name.given.trim(), maiden));
        }

        let mut location_variations: Vec<String> = Vec::new();
        for place in [person.birth.place_text(), person.death.place_text()]
            .into_iter()
            .flatten()
        {
            let mut add = |p: &str| {
                let p = p.trim();
                if !p.is_empty() && !location_variations.iter().any(|l| l.eq_ignore_ascii_case(p)) {
                    location_variations.push(p.to_string());
                }
            };
            add(place);
            for component in place.split(',') {
                add(component);
            }
        }

        let birth_year = year_of(person.birth.date_text());
        let death_year = year_of(person.death.date_text());
        let mut date_ranges = Vec::new();
        if let Some(year) = birth_year {
            date_ranges.push(DateRange::around(year, DATE_WINDOW_RADIUS));
        }
        if let Some(year) = death_year {
            let window = DateRange::around(year, DATE_WINDOW_RADIUS);
            if !date_ranges.contains(&window) {
                date_ranges.push(window);
            }
        }

        let mut search_terms = vec![full.clone()];
        if let Some(year) = birth_year {
            search_terms.push(format!("{} {}", full, year));
        }
        if let Some(place) = person.birth.place_text() {
            search_terms.push(format!("{} {}", full, place));
        }
        if death_year.is_some() {
            search_terms.push(format!("{} obituary", full));
        }

        SearchStrategy {
            name_variations,
            location_variations,
            date_ranges,
            record_types: record_types_for_era(birth_year, death_year),
            search_terms,
            method,
        }
    }

    // ========================================================================
    // Match analysis
    // ========================================================================

    /// Analyze whether `candidate` describes `subject`
    pub async fn analyze_record_match(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
    ) -> MatchAnalysis {
        self.analyze_with_context(subject, candidate, &SearchContext::default())
            .await
    }

    /// Analyze with the name and location variations the search used
    pub async fn analyze_with_context(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
        context: &SearchContext,
    ) -> MatchAnalysis {
        let validation = self.validator.validate_candidate(candidate);
        let confidence = self.scorer.calculate_confidence(subject, candidate, context);
        let name_match = self.names.match_full_names(
            &subject.person.name,
            &split_display_name(&candidate.name),
            &MatchOptions::default(),
        );

        let placeholder_hits = self.guard.scan(candidate);
        if !placeholder_hits.is_empty() {
            warn!(
                subject = %subject.id,
                candidate = %candidate.id,
                hits = ?placeholder_hits,
                "Candidate contains placeholder data, rejecting"
            );
            let ai = AiJudgment {
                confidence: 0.0,
                reasoning: "Candidate record contains placeholder or test data".to_string(),
                matching_factors: Vec::new(),
                concerns: placeholder_hits
                    .iter()
                    .map(|hit| format!("Placeholder content in {}", hit))
                    .collect(),
                recommendation: Recommendation::Reject,
                method: self.fallback_method(),
                model: None,
            };
            return MatchAnalysis {
                subject_id: subject.id.clone(),
                candidate_id: candidate.id.clone(),
                ai,
                confidence,
                validation,
                name_match,
                final_recommendation: FinalRecommendation {
                    score: 0.0,
                    recommendation: Recommendation::Reject,
                },
                placeholder_hits,
            };
        }

        let (system_prompt, user_prompt) =
            match_analysis_prompt(subject, candidate, &confidence, &validation);
        let request = GenerationRequest {
            system_prompt,
            user_prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_schema: Some(match_analysis_schema()),
        };

        let ai = match self.run_cascade(&request, parse_match_analysis).await {
            CascadeOutcome::Success { value, model } => AiJudgment {
                confidence: value.confidence,
                reasoning: value.reasoning,
                matching_factors: value.matching_factors,
                concerns: value.concerns,
                recommendation: value.recommendation,
                method: AnalysisMethod::Ai,
                model: Some(model),
            },
            CascadeOutcome::Unavailable => fallback_judgment(
                &confidence,
                &validation,
                name_match.overall_score,
                AnalysisMethod::Fallback,
            ),
            CascadeOutcome::Exhausted(last) => {
                warn!(
                    subject = %subject.id,
                    candidate = %candidate.id,
                    error = %describe(&last),
                    "Generative analysis failed, using fallback"
                );
                fallback_judgment(
                    &confidence,
                    &validation,
                    name_match.overall_score,
                    AnalysisMethod::EnhancedFallback,
                )
            }
        };

        let final_recommendation =
            FinalRecommendation::blend(ai.confidence, confidence.overall_confidence);

        debug!(
            subject = %subject.id,
            candidate = %candidate.id,
            method = ai.method.as_str(),
            score = final_recommendation.score,
            recommendation = final_recommendation.recommendation.as_str(),
            "Match analysis complete"
        );

        MatchAnalysis {
            subject_id: subject.id.clone(),
            candidate_id: candidate.id.clone(),
            ai,
            confidence,
            validation,
            name_match,
            final_recommendation,
            placeholder_hits,
        }
    }

    fn fallback_method(&self) -> AnalysisMethod {
        if self.generator.is_some() {
            AnalysisMethod::EnhancedFallback
        } else {
            AnalysisMethod::Fallback
        }
    }

    // ========================================================================
    // Cascade
    // ========================================================================

    fn ordered_models(&self, generator: &dyn GenerativeProvider) -> Vec<ModelEndpoint> {
        let mut models = generator.models().to_vec();
        if let Some(cached) = self.resolved_model() {
            if let Some(pos) = models.iter().position(|m| m.model == cached) {
                let preferred = models.remove(pos);
                models.insert(0, preferred);
            }
        }
        models
    }

    async fn run_cascade<T, F>(&self, request: &GenerationRequest, parse: F) -> CascadeOutcome<T>
    where
        F: Fn(&str) -> Result<T, GenerativeError>,
    {
        let Some(generator) = self.generator.clone() else {
            return CascadeOutcome::Unavailable;
        };

        let attempts: Vec<Attempt> = self
            .ordered_models(generator.as_ref())
            .into_iter()
            .map(|endpoint| {
                let generator = Arc::clone(&generator);
                let request = request.clone();
                Box::new(move || {
                    async move {
                        let text = generator.generate(&request, &endpoint).await?;
                        Ok((endpoint.model, text))
                    }
                    .boxed()
                }) as Attempt
            })
            .collect();

        if attempts.is_empty() {
            return CascadeOutcome::Exhausted(Some(GenerativeError::NotConfigured));
        }

        let mut last_error = None;
        for attempt in attempts {
            let result = attempt()
                .await
                .and_then(|(model, text)| parse(&text).map(|value| (model, value)));

            match result {
                Ok((model, value)) => {
                    if let Ok(mut cached) = self.resolved_model.lock() {
                        *cached = Some(model.clone());
                    }
                    return CascadeOutcome::Success { value, model };
                }
                Err(e) => {
                    let disposition = e.disposition();
                    debug!(error = %e, disposition = ?disposition, "Generative attempt failed");
                    last_error = Some(e);
                    if disposition == Disposition::Abandon {
                        break;
                    }
                }
            }
        }

        CascadeOutcome::Exhausted(last_error)
    }
}

/// Deterministic judgment from the rule-based components
fn fallback_judgment(
    confidence: &ConfidenceResult,
    validation: &ValidationResult,
    name_score: f64,
    method: AnalysisMethod,
) -> AiJudgment {
    let mut score =
        FALLBACK_RULE_WEIGHT * confidence.overall_confidence + FALLBACK_NAME_WEIGHT * name_score;
    let mut concerns = confidence.concerns.clone();
    if !validation.is_valid {
        score *= INVALID_CANDIDATE_FACTOR;
        concerns.extend(
            validation
                .issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .map(|i| i.message.clone()),
        );
    }
    let score = score.clamp(0.0, 1.0);

    AiJudgment {
        confidence: score,
        reasoning: format!(
            "Deterministic analysis: rule-based confidence {:.2}, name similarity {:.2}{}",
            confidence.overall_confidence,
            name_score,
            if validation.is_valid {
                ""
            } else {
                ", candidate record is internally inconsistent"
            }
        ),
        matching_factors: confidence.matching_factors.clone(),
        concerns,
        recommendation: Recommendation::from_score(score),
        method,
        model: None,
    }
}

/// Record types worth searching for someone living in the given years
fn record_types_for_era(birth: Option<i32>, death: Option<i32>) -> Vec<RecordType> {
    let now = current_year();
    let start = birth.or(death.map(|d| d - 70));
    let end = death.or(birth.map(|b| (b + 90).min(now)));

    let mut types = vec![RecordType::VitalRecord];
    let (Some(start), Some(end)) = (start, end) else {
        types.extend([
            RecordType::Census,
            RecordType::Cemetery,
            RecordType::Newspaper,
            RecordType::FamilyTree,
        ]);
        return types;
    };
    let overlaps = |from: i32, until: i32| start <= until && end >= from;

    // Publicly released census years
    if overlaps(1790, 1950) {
        types.push(RecordType::Census);
    }
    if start <= 1930 && end >= 1755 {
        types.push(RecordType::Military);
    }
    if overlaps(1820, 1960) {
        types.push(RecordType::Immigration);
    }
    if death.is_some() || end < now {
        types.push(RecordType::Cemetery);
    }
    if overlaps(1770, 1963) {
        types.push(RecordType::Newspaper);
    }
    types.push(RecordType::FamilyTree);
    types
}

fn describe(error: &Option<GenerativeError>) -> String {
    error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no attempts made".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kinmatch_common::model::PersonRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies per model id; unknown models get a 404
    struct ScriptedProvider {
        models: Vec<ModelEndpoint>,
        replies: Vec<(&'static str, Result<&'static str, u16>)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeProvider for ScriptedProvider {
        fn models(&self) -> &[ModelEndpoint] {
            &self.models
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
            model: &ModelEndpoint,
        ) -> Result<String, GenerativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.iter().find(|(m, _)| *m == model.model) {
                Some((_, Ok(text))) => Ok(text.to_string()),
                Some((_, Err(status))) => Err(GenerativeError::Status(*status, String::new())),
                None => Err(GenerativeError::Status(404, "unknown model".to_string())),
            }
        }
    }

    const VALID: &str = r#"{"confidence": 0.9, "reasoning": "Same person",
        "matchingFactors": ["Exact name"], "concerns": [], "recommendation": "accept"}"#;

    fn scripted(
        models: &[&str],
        replies: Vec<(&'static str, Result<&'static str, u16>)>,
    ) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider {
            models: models.iter().map(|m| ModelEndpoint::new(*m)).collect(),
            replies,
            calls: AtomicUsize::new(0),
        })
    }

    fn subject() -> Subject {
        Subject::new(
            "I1",
            PersonRecord::new("John", "Smith").born(Some("1850-03-02"), Some("Boston, Massachusetts")),
        )
    }

    fn candidate() -> CandidateRecord {
        let mut c = CandidateRecord::new("c1", "wikitree", "John Smith");
        c.birth_date = Some("1850".to_string());
        c.location = Some("Boston, Massachusetts".to_string());
        c
    }

    #[tokio::test]
    async fn test_no_provider_uses_fallback() {
        let orchestrator = MatchAnalysisOrchestrator::new(None);
        let analysis = orchestrator.analyze_record_match(&subject(), &candidate()).await;
        assert_eq!(analysis.ai.method, AnalysisMethod::Fallback);
        assert!(analysis.ai.confidence > 0.5);
        let expected = FinalRecommendation::blend(
            analysis.ai.confidence,
            analysis.confidence.overall_confidence,
        );
        assert!((analysis.final_recommendation.score - expected.score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cascade_skips_failed_model_and_caches_winner() {
        let provider = scripted(&["m1", "m2"], vec![("m1", Err(404)), ("m2", Ok(VALID))]);
        let orchestrator =
            MatchAnalysisOrchestrator::new(Some(provider.clone() as Arc<dyn GenerativeProvider>));

        let analysis = orchestrator.analyze_record_match(&subject(), &candidate()).await;
        assert_eq!(analysis.ai.method, AnalysisMethod::Ai);
        assert_eq!(analysis.ai.model.as_deref(), Some("m2"));
        assert_eq!(orchestrator.resolved_model().as_deref(), Some("m2"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        // The cached model goes first on the next call
        orchestrator.analyze_record_match(&subject(), &candidate()).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_abandons_provider() {
        let provider = scripted(&["m1", "m2"], vec![("m1", Err(429)), ("m2", Ok(VALID))]);
        let orchestrator =
            MatchAnalysisOrchestrator::new(Some(provider.clone() as Arc<dyn GenerativeProvider>));

        let analysis = orchestrator.analyze_record_match(&subject(), &candidate()).await;
        assert_eq!(analysis.ai.method, AnalysisMethod::EnhancedFallback);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back() {
        let provider = scripted(&["m1"], vec![("m1", Ok("I think they match!"))]);
        let orchestrator = MatchAnalysisOrchestrator::new(Some(provider as Arc<dyn GenerativeProvider>));

        let analysis = orchestrator.analyze_record_match(&subject(), &candidate()).await;
        assert_eq!(analysis.ai.method, AnalysisMethod::EnhancedFallback);
        assert!(!analysis.ai.reasoning.is_empty());
        assert!(orchestrator.resolved_model().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_forces_reject_without_calling_provider() {
        let provider = scripted(&["m1"], vec![("m1", Ok(VALID))]);
        let orchestrator =
            MatchAnalysisOrchestrator::new(Some(provider.clone() as Arc<dyn GenerativeProvider>));

        let mut c = candidate();
        c.location = Some("Mock Cemetery, Mock City".to_string());
        let analysis = orchestrator.analyze_record_match(&subject(), &c).await;

        assert_eq!(analysis.ai.confidence, 0.0);
        assert_eq!(analysis.ai.recommendation, Recommendation::Reject);
        assert_eq!(analysis.final_recommendation.recommendation, Recommendation::Reject);
        assert_eq!(analysis.placeholder_hits.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_strategy() {
        let orchestrator = MatchAnalysisOrchestrator::new(None);
        let subject = Subject::new(
            "I2",
            PersonRecord::new("William", "Smith")
                .born(Some("12 Mar 1850"), Some("Boston, Suffolk, Massachusetts"))
                .died(Some("1910"), None),
        );
        let strategy = orchestrator.generate_search_queries(&subject).await;

        assert_eq!(strategy.method, AnalysisMethod::Fallback);
        assert_eq!(strategy.name_variations[0], "William Smith");
        assert!(strategy.name_variations.iter().any(|n| n == "Bill Smith"));
        assert_eq!(strategy.location_variations[0], "Boston, Suffolk, Massachusetts");
        assert!(strategy.location_variations.contains(&"Suffolk".to_string()));
        assert_eq!(
            strategy.date_ranges,
            vec![DateRange::new(1845, 1855), DateRange::new(1905, 1915)]
        );
        assert!(strategy.record_types.contains(&RecordType::Census));
        assert!(strategy.search_terms.contains(&"William Smith obituary".to_string()));
    }

    #[tokio::test]
    async fn test_ai_strategy() {
        let reply = r#"{"nameVariations": ["John Smith", "Jon Smyth"], "locationVariations": ["Boston"],
            "dateRanges": [{"start": 1848, "end": 1852}], "recordTypes": ["census"], "searchTerms": []}"#;
        let provider = scripted(&["m1"], vec![("m1", Ok(reply))]);
        let orchestrator = MatchAnalysisOrchestrator::new(Some(provider as Arc<dyn GenerativeProvider>));

        let strategy = orchestrator.generate_search_queries(&subject()).await;
        assert_eq!(strategy.method, AnalysisMethod::Ai);
        assert_eq!(strategy.name_variations.len(), 2);
    }

    #[test]
    fn test_record_types_for_era() {
        let modern = record_types_for_era(Some(1990), None);
        assert!(!modern.contains(&RecordType::Census));
        assert!(!modern.contains(&RecordType::Cemetery));

        let victorian = record_types_for_era(Some(1850), Some(1910));
        assert!(victorian.contains(&RecordType::Census));
        assert!(victorian.contains(&RecordType::Military));
        assert!(victorian.contains(&RecordType::Cemetery));
    }
}
