//! Response composition.
//!
//! Two paths: the generative provider with a bounded prompt, and a
//! deterministic template built entirely from retrieval and reasoning
//! output. Any provider failure (timeout, auth, quota, disabled)
//! switches to the template, so composition always succeeds and the
//! template path is fully testable offline.

use crate::config::GenerationConfig;
use crate::failure::FailureKind;
use crate::generate::{generate_text, GenerationParams, GenerationProvider};
use crate::models::{AreaMatch, IssueCategory};
use crate::reason::Reasoning;
use crate::retrieve::Retrieval;

/// Default expectation when the knowledge store has no response time
/// for the category.
const DEFAULT_RESPONSE_TIME: &str = "24-48 hours";

/// Compose the response text. Returns the text and whether the
/// generative path produced it.
pub async fn compose(
    query: &str,
    area: &AreaMatch,
    issue: IssueCategory,
    retrieval: &Retrieval,
    reasoning: &Reasoning,
    response_time: Option<&str>,
    provider: &dyn GenerationProvider,
    config: &GenerationConfig,
    params: &GenerationParams,
) -> (String, bool) {
    if config.is_enabled() {
        let prompt = build_system_prompt(retrieval);
        match generate_text(provider, config, params, &prompt, query).await {
            Ok(text) => return (text, true),
            Err(e) => {
                let failure = FailureKind::GenerationUnavailable(e.to_string());
                eprintln!("Warning: {}", failure);
            }
        }
    }

    (
        template_response(area, issue, retrieval, reasoning, response_time),
        false,
    )
}

/// Bounded system prompt: department, contact, and services only — the
/// provider never sees more of the store than the answer needs.
fn build_system_prompt(retrieval: &Retrieval) -> String {
    format!(
        "You are CivicMind, an expert Chennai civic assistant. Provide helpful, \
         accurate, and actionable responses about civic issues in Chennai.\n\
         \n\
         Current civic information:\n\
         - Department: {}\n\
         - Contact: {}\n\
         - Services: {}\n\
         \n\
         Guidelines:\n\
         1. Be specific and actionable\n\
         2. Include contact numbers and procedures\n\
         3. Mention estimated timeframes\n\
         4. Provide escalation steps if needed\n\
         5. Keep the response under 200 words",
        retrieval.department.name,
        retrieval.department.contact,
        retrieval.department.services.join(", "),
    )
}

/// The deterministic template path. Fixed structure: department and
/// contact, a three-step immediate-action list, the expected response
/// time, and an escalation note.
pub fn template_response(
    area: &AreaMatch,
    issue: IssueCategory,
    retrieval: &Retrieval,
    reasoning: &Reasoning,
    response_time: Option<&str>,
) -> String {
    let department = &retrieval.department.name;
    let contact = &retrieval.department.contact;
    let expected = response_time.unwrap_or(DEFAULT_RESPONSE_TIME);

    let escalation = match reasoning.escalation_chain.first() {
        Some(first) => format!(
            "If no response within the expected time, escalate starting with the {} \
             or visit the department in person.",
            first
        ),
        None => "If no response within the expected time, contact the zone office or visit \
                 the department in person."
            .to_string(),
    };

    let mut out = format!(
        "For {} issues in {}, please contact {} at {}.\n\
         \n\
         Immediate steps:\n\
         1. Call {} to register your complaint\n\
         2. Note down the complaint number for tracking\n\
         3. Provide the exact address and a description of the issue\n\
         \n\
         Expected response time: {}\n\
         \n\
         Escalation: {}",
        issue.label(),
        area.name,
        department,
        contact,
        contact,
        expected,
        escalation,
    );

    if !reasoning.recommendations.is_empty() {
        out.push_str("\n\nRecommendations:");
        for rec in &reasoning.recommendations {
            out.push_str("\n- ");
            out.push_str(rec);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CivicGraph;
    use crate::knowledge::CivicKnowledge;
    use crate::reason;
    use crate::retrieve::{DisabledFetcher, KeywordRanker, Retriever};

    async fn fixtures(issue: IssueCategory) -> (Retrieval, Reasoning) {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        let retriever =
            Retriever::with_capabilities(Box::new(DisabledFetcher), Box::new(KeywordRanker), 3);
        let retrieval = retriever
            .retrieve("test", &AreaMatch::general(), issue, &store)
            .await;
        let reasoning = reason::reason(&AreaMatch::general(), issue, &graph, &store).unwrap();
        (retrieval, reasoning)
    }

    #[tokio::test]
    async fn template_contains_contract_sections() {
        let (retrieval, reasoning) = fixtures(IssueCategory::WaterSupply).await;
        let text = template_response(
            &AreaMatch::general(),
            IssueCategory::WaterSupply,
            &retrieval,
            &reasoning,
            Some("24 hours"),
        );
        assert!(text.contains("Chennai Metro Water"));
        assert!(text.contains("044-4567-4567"));
        assert!(text.contains("1. Call"));
        assert!(text.contains("3. Provide"));
        assert!(text.contains("Expected response time: 24 hours"));
        assert!(text.contains("Escalation:"));
    }

    #[tokio::test]
    async fn template_defaults_response_time() {
        let (retrieval, reasoning) = fixtures(IssueCategory::General).await;
        let text = template_response(
            &AreaMatch::general(),
            IssueCategory::General,
            &retrieval,
            &reasoning,
            None,
        );
        assert!(text.contains("24-48 hours"));
    }

    #[tokio::test]
    async fn template_is_deterministic() {
        let (retrieval, reasoning) = fixtures(IssueCategory::Garbage).await;
        let a = template_response(
            &AreaMatch::general(),
            IssueCategory::Garbage,
            &retrieval,
            &reasoning,
            None,
        );
        let b = template_response(
            &AreaMatch::general(),
            IssueCategory::Garbage,
            &retrieval,
            &reasoning,
            None,
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn compose_falls_back_when_disabled() {
        let (retrieval, reasoning) = fixtures(IssueCategory::Transport).await;
        let config = GenerationConfig::default();
        let (text, generated) = compose(
            "bus route complaint",
            &AreaMatch::general(),
            IssueCategory::Transport,
            &retrieval,
            &reasoning,
            None,
            &crate::generate::DisabledProvider,
            &config,
            &GenerationParams::default(),
        )
        .await;
        assert!(!generated);
        assert!(text.contains("TNSTC"));
    }
}
