//! Core data models used throughout CivicMind.
//!
//! These types represent the query, classification, and result values
//! that flow through the routing and caching pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single user query, immutable once created.
#[derive(Debug, Clone)]
pub struct CivicQuery {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl CivicQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// How the area in a query was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    /// Matched a corporation zone by display name.
    Zone,
    /// Matched a pincode digit string or its mapped area name.
    PincodeArea,
    /// Matched the fixed list of well-known area names.
    NamedArea,
    /// Nothing matched; city-wide default.
    General,
}

/// Resolved area for a query. One per query; `General/"Chennai"` when
/// nothing matched.
#[derive(Debug, Clone, Serialize)]
pub struct AreaMatch {
    pub kind: AreaKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wards: Vec<u32>,
}

impl AreaMatch {
    /// The city-wide default used when no area keyword fires.
    pub fn general() -> Self {
        Self {
            kind: AreaKind::General,
            name: "Chennai".to_string(),
            zone_id: None,
            wards: Vec::new(),
        }
    }
}

/// Civic issue category. Exactly one is assigned per query; `General`
/// is the fallback when no keyword matches.
///
/// The variant order here is the classification tie-break order: a
/// query matching several keyword sets takes the first listed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    WaterSupply,
    Electricity,
    Garbage,
    Roads,
    Transport,
    General,
}

impl IssueCategory {
    /// All categories in tie-break order, fallback last.
    pub const ALL: [IssueCategory; 6] = [
        IssueCategory::WaterSupply,
        IssueCategory::Electricity,
        IssueCategory::Garbage,
        IssueCategory::Roads,
        IssueCategory::Transport,
        IssueCategory::General,
    ];

    /// Stable snake_case key used in data files and JSON output.
    pub fn key(&self) -> &'static str {
        match self {
            IssueCategory::WaterSupply => "water_supply",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Garbage => "garbage",
            IssueCategory::Roads => "roads",
            IssueCategory::Transport => "transport",
            IssueCategory::General => "general",
        }
    }

    /// Human-readable label for response text.
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::WaterSupply => "water supply",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Garbage => "garbage collection",
            IssueCategory::Roads => "roads",
            IssueCategory::Transport => "transport",
            IssueCategory::General => "general civic",
        }
    }

    /// Parse a data-file key. Unknown keys map to `None` so the
    /// knowledge-store boundary can reject them with context.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }
}

/// Department responsible for a category of issues, sourced from the
/// knowledge store and immutable at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentInfo {
    pub name: String,
    pub contact: String,
    pub services: Vec<String>,
}

/// Externally observable output of one query through the pipeline.
///
/// `cache_hit` is true exactly when the response cache satisfied the
/// request without invoking the retriever, reasoner, or composer.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub response: String,
    pub department: String,
    pub sources: Vec<String>,
    /// Seconds from query receipt to result, on both hit and miss paths.
    pub processing_time: f64,
    pub cache_hit: bool,
    /// Resolved area name. Absent on the cache-hit path, where the
    /// classifier never runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Resolved issue category key. Absent on the cache-hit path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_category: Option<String>,
}

/// One user feedback event. Append-only; never mutates past results.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRecord {
    pub query: String,
    pub is_helpful: bool,
    pub issue_category: String,
    pub department: String,
    pub timestamp: DateTime<Utc>,
}
