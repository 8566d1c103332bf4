//! Query classification: area and issue resolution.
//!
//! Pure keyword matching against the knowledge store. Area resolution
//! is first-match-wins over zones, then pincodes, then a fixed list of
//! well-known area names; issue resolution walks the store's ordered
//! keyword table. Both default rather than fail: an unmatched query is
//! `General/"Chennai"` with category `General`.

use crate::knowledge::CivicKnowledge;
use crate::models::{AreaKind, AreaMatch, IssueCategory};

/// Well-known area names checked after zones and pincodes.
const NAMED_AREAS: &[&str] = &[
    "adyar",
    "t nagar",
    "anna nagar",
    "velachery",
    "mylapore",
    "kodambakkam",
    "nungambakkam",
    "guindy",
    "chrompet",
    "tambaram",
    "perambur",
    "royapuram",
    "egmore",
    "kilpauk",
    "saidapet",
];

/// Classify a query into an area and an issue category.
///
/// Deterministic given the knowledge-store snapshot; no side effects.
/// Empty or whitespace-only input yields the general defaults.
pub fn classify(query: &str, knowledge: &CivicKnowledge) -> (AreaMatch, IssueCategory) {
    let lowered = query.to_lowercase();
    let area = match_area(query, &lowered, knowledge);
    let issue = match_issue(&lowered, knowledge);
    (area, issue)
}

/// Resolve the area, first match wins: zone display name, pincode
/// digits or mapped area name, then the fixed named-area list.
fn match_area(raw: &str, lowered: &str, knowledge: &CivicKnowledge) -> AreaMatch {
    if lowered.trim().is_empty() {
        return AreaMatch::general();
    }

    for zone in knowledge.zones() {
        if lowered.contains(&zone.name.to_lowercase()) {
            return AreaMatch {
                kind: AreaKind::Zone,
                name: zone.name.clone(),
                zone_id: Some(zone.id),
                wards: zone.wards.clone(),
            };
        }
    }

    for (pincode, area) in knowledge.pincodes() {
        if raw.contains(pincode.as_str()) || lowered.contains(&area.to_lowercase()) {
            return AreaMatch {
                kind: AreaKind::PincodeArea,
                name: area.clone(),
                zone_id: None,
                wards: Vec::new(),
            };
        }
    }

    for area in NAMED_AREAS {
        if lowered.contains(area) {
            return AreaMatch {
                kind: AreaKind::NamedArea,
                name: title_case(area),
                zone_id: None,
                wards: Vec::new(),
            };
        }
    }

    AreaMatch::general()
}

/// Resolve the issue category: first table row with any keyword present
/// as a substring of the lowercased query wins.
fn match_issue(lowered: &str, knowledge: &CivicKnowledge) -> IssueCategory {
    for rule in knowledge.issue_rules() {
        if rule.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return rule.category;
        }
    }
    IssueCategory::General
}

/// Uppercase the first letter of each word ("t nagar" → "T Nagar").
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnowledgeConfig;

    fn full_store() -> CivicKnowledge {
        CivicKnowledge::load(&KnowledgeConfig {
            civic_data_path: "./data/civic_data.json".into(),
            pincode_path: "./data/pincodes.json".into(),
        })
    }

    #[test]
    fn zone_name_resolves_to_zone_match() {
        let store = full_store();
        let (area, _) = classify("Water supply issue in Adyar", &store);
        assert_eq!(area.kind, AreaKind::Zone);
        assert_eq!(area.name, "Adyar");
        assert_eq!(area.zone_id, Some(13));
        assert!(!area.wards.is_empty());
    }

    #[test]
    fn zone_takes_precedence_over_pincode_in_same_query() {
        let store = full_store();
        let (area, _) = classify("Garbage problem near 600004 in Ambattur", &store);
        assert_eq!(area.kind, AreaKind::Zone);
        assert_eq!(area.name, "Ambattur");
    }

    #[test]
    fn pincode_digits_resolve_area() {
        let store = full_store();
        let (area, _) = classify("No streetlights at 600004", &store);
        assert_eq!(area.kind, AreaKind::PincodeArea);
        assert_eq!(area.name, "Mylapore");
    }

    #[test]
    fn named_area_fires_when_store_has_no_zones() {
        let store = CivicKnowledge::fallback();
        let (area, _) = classify("pothole in guindy please fix", &store);
        assert_eq!(area.kind, AreaKind::NamedArea);
        assert_eq!(area.name, "Guindy");
    }

    #[test]
    fn no_area_defaults_to_general_chennai() {
        let store = full_store();
        let (area, issue) = classify("Bus route complaint", &store);
        assert_eq!(area.kind, AreaKind::General);
        assert_eq!(area.name, "Chennai");
        assert_eq!(issue, IssueCategory::Transport);
    }

    #[test]
    fn exactly_one_category_general_fallback() {
        let store = full_store();
        let (_, issue) = classify("xzqvw blorp nonsense", &store);
        assert_eq!(issue, IssueCategory::General);
    }

    #[test]
    fn multi_match_resolves_by_table_order() {
        let store = full_store();
        // Mentions both water and power; the table lists water first.
        let (_, issue) = classify("water and power both down", &store);
        assert_eq!(issue, IssueCategory::WaterSupply);
    }

    #[test]
    fn empty_and_whitespace_input_defaults() {
        let store = full_store();
        for q in ["", "   ", "\t\n"] {
            let (area, issue) = classify(q, &store);
            assert_eq!(area.kind, AreaKind::General);
            assert_eq!(issue, IssueCategory::General);
        }
    }

    #[test]
    fn title_case_capitalizes_words() {
        assert_eq!(title_case("t nagar"), "T Nagar");
        assert_eq!(title_case("anna nagar"), "Anna Nagar");
    }
}
