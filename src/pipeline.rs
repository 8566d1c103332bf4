//! Query pipeline orchestration.
//!
//! Sequences one query through
//! `CacheCheck → Classify → Retrieve → Reason → Compose → CacheWrite`,
//! short-circuiting on a cache hit. No state is revisited, and every
//! terminal path — including an unanticipated stage failure — yields a
//! [`PipelineResult`]: the caller never sees an error, only a result
//! whose `department` is `"System"` when something went wrong inside.
//!
//! The pipeline also owns the session context (counters, history,
//! feedback log) and runs synchronous maintenance — cache eviction and
//! a re-tune of the generation parameters — every N queries.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

use crate::cache::{CacheStats, ResponseCache};
use crate::classify;
use crate::compose;
use crate::config::Config;
use crate::failure::FailureKind;
use crate::feedback::{FeedbackLog, Interaction};
use crate::generate::{self, GenerationParams, GenerationProvider};
use crate::graph::CivicGraph;
use crate::knowledge::CivicKnowledge;
use crate::models::{AreaKind, CivicQuery, IssueCategory, PipelineResult};
use crate::reason;
use crate::retrieve::Retriever;
use crate::tune::{self, ParameterTuner, RandomSearchTuner, PARAMETER_BOUNDS};

/// Message returned when the pipeline absorbs an internal fault.
const FAULT_MESSAGE: &str = "I apologize, but I encountered an error processing your query. \
     Please try again or contact support.";

/// One completed exchange kept in the session history.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub query: String,
    pub response: String,
    pub department: String,
    pub cache_hit: bool,
    pub timestamp: DateTime<Utc>,
    pub processing_time: f64,
}

/// Explicit per-session state. Everything a dashboard caller needs to
/// compute its counters lives here; there is no ambient state.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub query_count: u64,
    pub response_times: Vec<f64>,
    pub category_counts: HashMap<&'static str, u64>,
    pub classification_defaults: u64,
    pub history: Vec<ChatTurn>,
}

impl SessionContext {
    pub fn average_response_time(&self) -> Option<f64> {
        if self.response_times.is_empty() {
            return None;
        }
        Some(self.response_times.iter().sum::<f64>() / self.response_times.len() as f64)
    }
}

/// The assembled pipeline and its collaborators.
pub struct Pipeline {
    config: Config,
    knowledge: CivicKnowledge,
    graph: CivicGraph,
    cache: ResponseCache,
    retriever: Retriever,
    provider: Box<dyn GenerationProvider>,
    params: GenerationParams,
    tuner: Box<dyn ParameterTuner>,
    pub session: SessionContext,
    feedback: FeedbackLog,
}

impl Pipeline {
    /// Assemble the pipeline from config. Never fails: a missing
    /// knowledge file falls back to the embedded dataset, and an
    /// unusable generation provider degrades to the disabled one.
    pub fn new(config: Config) -> Self {
        let knowledge = CivicKnowledge::load(&config.knowledge);
        let graph = CivicGraph::build(&knowledge);
        let cache = ResponseCache::open(&config.cache);
        let retriever = Retriever::from_config(&config.retrieval);

        let provider: Box<dyn GenerationProvider> = match generate::create_provider(&config.generation) {
            Ok(provider) => provider,
            Err(e) => {
                eprintln!("Warning: could not create generation provider: {}", e);
                Box::new(generate::DisabledProvider)
            }
        };

        Self {
            config,
            knowledge,
            graph,
            cache,
            retriever,
            provider,
            params: GenerationParams::default(),
            tuner: Box::new(RandomSearchTuner::default()),
            session: SessionContext::default(),
            feedback: FeedbackLog::new(),
        }
    }

    /// Replace the tuner capability.
    pub fn with_tuner(mut self, tuner: Box<dyn ParameterTuner>) -> Self {
        self.tuner = tuner;
        self
    }

    /// Process one query to completion. Always returns a result.
    pub async fn process(&mut self, text: &str) -> PipelineResult {
        let query = CivicQuery::new(text);
        let started = Instant::now();

        let result = match self.process_inner(&query, &started).await {
            Ok(result) => result,
            Err(failure) => {
                eprintln!("Warning: {}", failure);
                self.fault_result(&started)
            }
        };

        self.record_session(&query, &result);

        if self.session.query_count % self.config.pipeline.maintenance_interval == 0 {
            self.maintain();
        }

        result
    }

    async fn process_inner(
        &mut self,
        query: &CivicQuery,
        started: &Instant,
    ) -> Result<PipelineResult, FailureKind> {
        // CacheCheck: a hit short-circuits the whole pipeline.
        if let Some(entry) = self.cache.lookup(&query.text) {
            return Ok(PipelineResult {
                response: entry.response,
                department: entry.department,
                sources: entry.sources,
                processing_time: started.elapsed().as_secs_f64(),
                cache_hit: true,
                area: None,
                issue_category: None,
            });
        }

        // Classify.
        let (area, issue) = classify::classify(&query.text, &self.knowledge);
        if area.kind == AreaKind::General && issue == IssueCategory::General {
            self.session.classification_defaults += 1;
        }

        // Retrieve: enrichment failures are absorbed inside.
        let retrieval = self
            .retriever
            .retrieve(&query.text, &area, issue, &self.knowledge)
            .await;

        // Reason: a failed graph lookup maps to the generic fallback.
        let reasoning = match reason::reason(&area, issue, &self.graph, &self.knowledge) {
            Ok(reasoning) => reasoning,
            Err(failure) => {
                eprintln!("Warning: {}", failure);
                reason::fallback_reasoning(&area, issue)
            }
        };

        // Compose: generation failures fall back to the template inside.
        let response_time = self.knowledge.response_time(issue);
        let (response, _generated) = compose::compose(
            &query.text,
            &area,
            issue,
            &retrieval,
            &reasoning,
            response_time.as_deref(),
            self.provider.as_ref(),
            &self.config.generation,
            &self.params,
        )
        .await;

        // CacheWrite: exactly once per miss, after compose succeeded.
        self.cache.store(
            &query.text,
            &response,
            &retrieval.department.name,
            &retrieval.sources,
        );

        Ok(PipelineResult {
            response,
            department: retrieval.department.name,
            sources: retrieval.sources,
            processing_time: started.elapsed().as_secs_f64(),
            cache_hit: false,
            area: Some(area.name),
            issue_category: Some(issue.key().to_string()),
        })
    }

    /// The apologetic result produced for any absorbed pipeline fault.
    fn fault_result(&self, started: &Instant) -> PipelineResult {
        PipelineResult {
            response: FAULT_MESSAGE.to_string(),
            department: "System".to_string(),
            sources: Vec::new(),
            processing_time: started.elapsed().as_secs_f64(),
            cache_hit: false,
            area: None,
            issue_category: None,
        }
    }

    fn record_session(&mut self, query: &CivicQuery, result: &PipelineResult) {
        self.session.query_count += 1;
        self.session.response_times.push(result.processing_time);

        let category = result
            .issue_category
            .as_deref()
            .and_then(IssueCategory::from_key)
            .unwrap_or(IssueCategory::General);
        *self.session.category_counts.entry(category.key()).or_insert(0) += 1;

        self.session.history.push(ChatTurn {
            query: query.text.clone(),
            response: result.response.clone(),
            department: result.department.clone(),
            cache_hit: result.cache_hit,
            timestamp: query.received_at,
            processing_time: result.processing_time,
        });

        self.feedback.record_interaction(Interaction {
            query: query.text.clone(),
            issue_category: category,
            department: result.department.clone(),
            response_seconds: result.processing_time,
            cache_hit: result.cache_hit,
        });
    }

    /// Counter-triggered maintenance: evict the cache and propose new
    /// generation parameters. Idempotent, and never touches the
    /// triggering query's own result.
    fn maintain(&mut self) {
        self.cache.evict();

        let score = tune::objective_score(&self.feedback);
        let proposed = self
            .tuner
            .tune(PARAMETER_BOUNDS, &|_candidate| score);
        tune::apply_params(&proposed, &mut self.params);
    }

    /// Record user feedback for a past query. The query is reclassified
    /// to attribute the feedback to a category and department.
    pub fn record_feedback(&mut self, query: &str, is_helpful: bool) {
        let (_, issue) = classify::classify(query, &self.knowledge);
        let department = self.knowledge.department_name_for(issue);
        self.feedback
            .record_feedback(query, is_helpful, issue, &department);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn feedback(&self) -> &FeedbackLog {
        &self.feedback
    }

    pub fn knowledge(&self) -> &CivicKnowledge {
        &self.knowledge
    }

    pub fn graph(&self) -> &CivicGraph {
        &self.graph
    }

    pub fn generation_params(&self) -> &GenerationParams {
        &self.params
    }

    /// Run the cache `clear` maintenance operation.
    pub fn clear_cache(&mut self, older_than_hours: Option<i64>) -> usize {
        self.cache.clear(older_than_hours)
    }
}
