//! Contextual reasoning over the civic graph.
//!
//! Produces the escalation chain and actionable recommendations for a
//! classified query, plus related entities and zone cross-references
//! when the area resolved to a zone. Lookup failures degrade to a
//! generic chain and generic recommendations — the reasoner never
//! returns empty output.

use crate::failure::FailureKind;
use crate::graph::CivicGraph;
use crate::knowledge::CivicKnowledge;
use crate::models::{AreaKind, AreaMatch, IssueCategory};

/// Output of one reasoning pass.
#[derive(Debug, Clone)]
pub struct Reasoning {
    /// Escalation roles, lowest level first. Never empty.
    pub escalation_chain: Vec<String>,
    /// Actionable recommendations. Never empty.
    pub recommendations: Vec<String>,
    /// Entities adjacent to the responsible department.
    pub related_entities: Vec<String>,
    /// Constituency cross-references when the area is a zone.
    pub zone_connections: Option<ZoneConnections>,
}

#[derive(Debug, Clone)]
pub struct ZoneConnections {
    pub zone_id: u32,
    pub ward_count: usize,
    pub assembly_constituency: Option<String>,
    pub parliament_constituency: Option<String>,
}

/// Most recommendations shown per response.
const MAX_RECOMMENDATIONS: usize = 6;

/// Reason over the graph for a classified query.
///
/// Errors only when the responsible department cannot be located in the
/// graph at all; the caller maps that to [`fallback_reasoning`].
pub fn reason(
    area: &AreaMatch,
    issue: IssueCategory,
    graph: &CivicGraph,
    knowledge: &CivicKnowledge,
) -> Result<Reasoning, FailureKind> {
    let department = knowledge.department_name_for(issue);

    let mut escalation_chain = graph.escalation_chain(&department);
    if escalation_chain.is_empty() {
        escalation_chain = knowledge.escalation_chain(&department);
    }
    if escalation_chain.is_empty() {
        escalation_chain = generic_chain();
    }

    let related_entities = graph.related_entities(&department, 5);
    if related_entities.is_empty() && graph.node_count() == 0 {
        return Err(FailureKind::PipelineFault(format!(
            "graph has no node for department '{department}'"
        )));
    }

    let mut recommendations = category_recommendations(issue);
    if area.kind != AreaKind::General {
        recommendations.push(format!(
            "Mention {} location clearly when reporting",
            area.name
        ));
        if area.kind == AreaKind::Zone {
            recommendations.push("Contact the zone office for faster resolution".to_string());
        }
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    let zone_connections = zone_connections(area, knowledge);

    Ok(Reasoning {
        escalation_chain,
        recommendations,
        related_entities,
        zone_connections,
    })
}

/// Generic, non-empty reasoning used when graph lookup fails.
pub fn fallback_reasoning(area: &AreaMatch, issue: IssueCategory) -> Reasoning {
    let mut recommendations = vec![
        format!("Contact the appropriate department for {} issues", issue.label()),
        "Provide detailed location information".to_string(),
        "Keep the complaint reference number".to_string(),
        "Follow up if no response within the expected timeframe".to_string(),
    ];
    if area.kind != AreaKind::General {
        recommendations.push(format!(
            "Mention {} location clearly when reporting",
            area.name
        ));
    }

    Reasoning {
        escalation_chain: generic_chain(),
        recommendations,
        related_entities: vec!["Greater Chennai Corporation".to_string()],
        zone_connections: None,
    }
}

fn generic_chain() -> Vec<String> {
    vec![
        "First Level Officer".to_string(),
        "Senior Officer".to_string(),
        "Department Head".to_string(),
    ]
}

/// Fixed per-category recommendation templates.
fn category_recommendations(issue: IssueCategory) -> Vec<String> {
    let lines: &[&str] = match issue {
        IssueCategory::WaterSupply => &[
            "Contact Chennai Metro Water at 044-4567-4567",
            "Check if the area has scheduled maintenance",
            "Request tanker service if this is an emergency",
            "Escalate to the Superintending Engineer if there is no response",
        ],
        IssueCategory::Electricity => &[
            "Call TANGEDCO at 94987-94987 for power failures",
            "Report via WhatsApp at 94458508111 with a photo",
            "Check the estimated restoration time",
            "Claim compensation for delays over 1 hour",
        ],
        IssueCategory::Garbage => &[
            "Contact GCC at 1913 or use the Namma Chennai app",
            "Ensure waste segregation at source",
            "Note down the complaint number",
            "Follow up with the zone office if needed",
        ],
        IssueCategory::Roads => &[
            "Report the exact stretch to GCC at 1913",
            "Attach a photo of the damage if possible",
            "Note down the complaint number",
        ],
        IssueCategory::Transport => &[
            "Call TNSTC at 1800-599-1500 with the route number",
            "Note the bus registration and time of incident",
            "Use WhatsApp 94450-14448 for written complaints",
        ],
        IssueCategory::General => &[
            "Contact the relevant department for assistance",
            "Provide the exact location and issue description",
            "Keep the complaint number for tracking",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

fn zone_connections(area: &AreaMatch, knowledge: &CivicKnowledge) -> Option<ZoneConnections> {
    if area.kind != AreaKind::Zone {
        return None;
    }
    let zone_id = area.zone_id?;
    let zone = knowledge.zones().iter().find(|z| z.id == zone_id)?;
    Some(ZoneConnections {
        zone_id,
        ward_count: zone.wards.len(),
        assembly_constituency: zone.assembly_constituency.clone(),
        parliament_constituency: zone.parliament_constituency.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AreaMatch;

    fn setup() -> (CivicKnowledge, CivicGraph) {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        (store, graph)
    }

    #[test]
    fn water_issue_gets_metro_water_chain() {
        let (store, graph) = setup();
        let reasoning = reason(
            &AreaMatch::general(),
            IssueCategory::WaterSupply,
            &graph,
            &store,
        )
        .unwrap();
        assert_eq!(reasoning.escalation_chain[0], "Area Engineer");
        assert_eq!(reasoning.escalation_chain.last().unwrap(), "Chief Engineer");
        assert!(!reasoning.recommendations.is_empty());
    }

    #[test]
    fn department_without_chain_gets_generic_chain() {
        let (store, graph) = setup();
        // TNSTC has no escalation roles in the fallback dataset.
        let reasoning = reason(
            &AreaMatch::general(),
            IssueCategory::Transport,
            &graph,
            &store,
        )
        .unwrap();
        assert_eq!(
            reasoning.escalation_chain,
            vec!["First Level Officer", "Senior Officer", "Department Head"]
        );
    }

    #[test]
    fn area_match_adds_location_recommendation() {
        let (store, graph) = setup();
        let area = AreaMatch {
            kind: crate::models::AreaKind::NamedArea,
            name: "Guindy".to_string(),
            zone_id: None,
            wards: Vec::new(),
        };
        let reasoning = reason(&area, IssueCategory::Garbage, &graph, &store).unwrap();
        assert!(reasoning
            .recommendations
            .iter()
            .any(|r| r.contains("Guindy")));
        assert!(reasoning.recommendations.len() <= MAX_RECOMMENDATIONS);
    }

    #[test]
    fn fallback_reasoning_is_never_empty() {
        let reasoning = fallback_reasoning(&AreaMatch::general(), IssueCategory::General);
        assert!(!reasoning.escalation_chain.is_empty());
        assert!(!reasoning.recommendations.is_empty());
    }
}
