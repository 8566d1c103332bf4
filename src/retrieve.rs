//! Information retrieval for a classified query.
//!
//! The retriever always resolves the responsible department from the
//! knowledge store. On top of that it attempts two best-effort
//! enrichment steps through pluggable capabilities:
//!
//! - **Live fetch** ([`LiveFetcher`]) — pull fresh snippets from the
//!   civic portals relevant to the issue, with a short timeout.
//! - **Similarity ranking** ([`SimilarityRanker`]) — rank the static
//!   reference corpus against the query.
//!
//! Both capabilities may be absent or failing; the retriever degrades
//! to fixed category-specific text and never fails the pipeline.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::failure::FailureKind;
use crate::knowledge::CivicKnowledge;
use crate::models::{AreaKind, AreaMatch, DepartmentInfo, IssueCategory};

/// A civic portal the live fetcher may consult.
#[derive(Debug, Clone)]
pub struct CivicSource {
    pub name: &'static str,
    pub url: &'static str,
    /// Which issue categories this portal is relevant for.
    pub categories: &'static [IssueCategory],
}

/// Portals consulted by the live fetcher, in priority order.
pub const CIVIC_SOURCES: &[CivicSource] = &[
    CivicSource {
        name: "Greater Chennai Corporation",
        url: "https://chennaicorporation.gov.in",
        categories: &[
            IssueCategory::Garbage,
            IssueCategory::Roads,
            IssueCategory::General,
        ],
    },
    CivicSource {
        name: "Chennai Metro Water",
        url: "https://cmwssb.tn.gov.in/latest-news",
        categories: &[IssueCategory::WaterSupply],
    },
    CivicSource {
        name: "TANGEDCO Chennai",
        url: "https://www.tangedco.gov.in",
        categories: &[IssueCategory::Electricity],
    },
];

/// Result bundle for one retrieval pass.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub department: DepartmentInfo,
    pub supporting_text: Vec<String>,
    pub sources: Vec<String>,
}

/// Capability: fetch fresh text snippets from a civic portal.
#[async_trait]
pub trait LiveFetcher: Send + Sync {
    async fn fetch(&self, source: &CivicSource) -> Result<Vec<String>>;
}

/// Capability: rank a reference corpus against a query.
pub trait SimilarityRanker: Send + Sync {
    fn rank(&self, query: &str, corpus: &[String], k: usize) -> Vec<String>;
}

/// No-op fetcher used when live fetching is disabled.
pub struct DisabledFetcher;

#[async_trait]
impl LiveFetcher for DisabledFetcher {
    async fn fetch(&self, _source: &CivicSource) -> Result<Vec<String>> {
        anyhow::bail!("live fetch is disabled")
    }
}

/// HTTP fetcher with a bounded timeout. Extracts plain-text lines from
/// the response body; anything under 50 visible characters is skipped.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_snippets: usize,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, max_snippets: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; civicmind)")
            .build()?;
        Ok(Self {
            client,
            max_snippets,
        })
    }
}

#[async_trait]
impl LiveFetcher for HttpFetcher {
    async fn fetch(&self, source: &CivicSource) -> Result<Vec<String>> {
        let response = self.client.get(source.url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("{} returned {}", source.name, response.status());
        }
        let body = response.text().await?;

        let snippets: Vec<String> = body
            .lines()
            .map(strip_markup)
            .filter(|line| line.len() > 50)
            .take(self.max_snippets)
            .map(|line| {
                let snippet: String = line.chars().take(200).collect();
                format!("{}: {}", source.name, snippet)
            })
            .collect();

        Ok(snippets)
    }
}

/// Drop anything between `<` and `>` and collapse the remainder.
fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Default similarity capability: keyword overlap. A corpus document
/// matches when it contains any query word longer than three
/// characters; the first `k` matches are returned, or the first `k`
/// documents when nothing matches.
pub struct KeywordRanker;

impl SimilarityRanker for KeywordRanker {
    fn rank(&self, query: &str, corpus: &[String], k: usize) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .collect();

        let mut matches = Vec::new();
        for doc in corpus {
            let doc_lower = doc.to_lowercase();
            if words.iter().any(|w| doc_lower.contains(w)) {
                matches.push(doc.clone());
                if matches.len() >= k {
                    break;
                }
            }
        }

        if matches.is_empty() {
            corpus.iter().take(k).cloned().collect()
        } else {
            matches
        }
    }
}

/// The retriever: fixed department resolution plus best-effort
/// enrichment through the configured capabilities.
pub struct Retriever {
    fetcher: Box<dyn LiveFetcher>,
    ranker: Box<dyn SimilarityRanker>,
    max_snippets: usize,
}

impl Retriever {
    /// Build from config: live fetch wires up the HTTP fetcher, and the
    /// keyword ranker is the default similarity capability.
    pub fn from_config(config: &RetrievalConfig) -> Self {
        let fetcher: Box<dyn LiveFetcher> = if config.live_fetch {
            match HttpFetcher::new(config.fetch_timeout_secs, config.max_snippets) {
                Ok(fetcher) => Box::new(fetcher),
                Err(e) => {
                    eprintln!("Warning: could not create live fetcher: {}", e);
                    Box::new(DisabledFetcher)
                }
            }
        } else {
            Box::new(DisabledFetcher)
        };

        Self {
            fetcher,
            ranker: Box::new(KeywordRanker),
            max_snippets: config.max_snippets,
        }
    }

    /// Replace the capabilities (used by custom callers and tests).
    pub fn with_capabilities(
        fetcher: Box<dyn LiveFetcher>,
        ranker: Box<dyn SimilarityRanker>,
        max_snippets: usize,
    ) -> Self {
        Self {
            fetcher,
            ranker,
            max_snippets,
        }
    }

    /// Retrieve the department bundle and supporting text for a query.
    /// Enrichment failures are absorbed here; the returned bundle is
    /// always usable.
    pub async fn retrieve(
        &self,
        query: &str,
        area: &AreaMatch,
        issue: IssueCategory,
        knowledge: &CivicKnowledge,
    ) -> Retrieval {
        let department = knowledge.department_for(issue);

        let mut supporting_text = Vec::new();
        let mut sources = Vec::new();

        match self.fetch_live(issue).await {
            Ok(snippets) if !snippets.is_empty() => {
                supporting_text.extend(snippets);
                sources.push("Live data from Chennai civic portals".to_string());
            }
            Ok(_) => {}
            Err(failure) => {
                eprintln!("Warning: {}", failure);
            }
        }

        let corpus = knowledge.reference_corpus();
        let ranked = self.ranker.rank(query, &corpus, self.max_snippets);
        if ranked.is_empty() {
            supporting_text.push(static_supporting_text(issue));
            sources.push("Offline civic reference data".to_string());
        } else {
            supporting_text.extend(ranked);
            sources.push("Official department reference data".to_string());
        }

        if area.kind == AreaKind::Zone {
            if let Some(zone) = knowledge.zones().iter().find(|z| Some(z.id) == area.zone_id) {
                supporting_text.push(format!(
                    "{} is corporation zone {} with {} wards",
                    zone.name,
                    zone.id,
                    zone.wards.len()
                ));
            }
        }

        Retrieval {
            department,
            supporting_text,
            sources,
        }
    }

    /// Try relevant portals in order; the first one that yields
    /// snippets wins. All failures collapse into one enrichment
    /// failure for the caller to log.
    async fn fetch_live(&self, issue: IssueCategory) -> Result<Vec<String>, FailureKind> {
        let mut last_error = None;
        for source in CIVIC_SOURCES {
            if !source.categories.contains(&issue) {
                continue;
            }
            match self.fetcher.fetch(source).await {
                Ok(snippets) if !snippets.is_empty() => return Ok(snippets),
                Ok(_) => continue,
                Err(e) => last_error = Some(format!("{}: {e}", source.name)),
            }
        }
        match last_error {
            Some(err) => Err(FailureKind::EnrichmentUnavailable(err)),
            None => Ok(Vec::new()),
        }
    }
}

/// Fixed degraded text used when no enrichment is available.
fn static_supporting_text(issue: IssueCategory) -> String {
    format!("Standard guidance for {} issues", issue.label())
}
