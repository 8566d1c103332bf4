//! Failure taxonomy for pipeline components.
//!
//! Every internal failure is absorbed at the component boundary that
//! produced it and converted into that component's documented fallback
//! value. [`FailureKind`] names the categories so callers can log and
//! count what they absorbed; only a pipeline fault is visible to the
//! caller, and then only structurally (`department = "System"` on the
//! result), never as an error.

use thiserror::Error;

/// Category of an absorbed internal failure.
#[derive(Debug, Clone, Error)]
pub enum FailureKind {
    /// No keyword or area matched. A defined fallback, not an error —
    /// recorded so the default rate can be observed.
    #[error("no keyword or area matched; defaults applied")]
    ClassificationDefault,

    /// Durable cache read or write failed. Treated as a miss or a
    /// best-effort write.
    #[error("cache I/O failed: {0}")]
    CacheIo(String),

    /// Live fetch or similarity ranking failed or is disabled.
    /// Retrieval degrades to static reference text.
    #[error("enrichment unavailable: {0}")]
    EnrichmentUnavailable(String),

    /// The external generative call failed, timed out, or has no
    /// credential configured. Composition uses the template path.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// An unanticipated failure anywhere in the pipeline. Converted to
    /// a generic apologetic result at the orchestrator boundary.
    #[error("pipeline fault: {0}")]
    PipelineFault(String),
}

impl FailureKind {
    /// Short stable label used in warning lines and counters.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::ClassificationDefault => "classification_default",
            FailureKind::CacheIo(_) => "cache_io",
            FailureKind::EnrichmentUnavailable(_) => "enrichment_unavailable",
            FailureKind::GenerationUnavailable(_) => "generation_unavailable",
            FailureKind::PipelineFault(_) => "pipeline_fault",
        }
    }
}
