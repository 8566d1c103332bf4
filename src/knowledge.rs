//! Civic knowledge store.
//!
//! Loads two static JSON documents — the civic-data document
//! (administrative structure, zones with wards, departments with
//! contacts, issue-keyword table) and the pincode-to-area mapping —
//! validates them at this boundary, and serves read-only lookups to the
//! classifier, retriever, and reasoner.
//!
//! Missing or unreadable files are not fatal: the store substitutes an
//! embedded minimal dataset (4 departments, 5 pincodes) and keeps
//! operating. Record fields that the documents may omit have explicit
//! defaults here rather than being probed ad hoc downstream.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::KnowledgeConfig;
use crate::models::{DepartmentInfo, IssueCategory};

/// Top-level shape of the civic-data document.
#[derive(Debug, Clone, Deserialize)]
pub struct CivicData {
    #[serde(default)]
    pub administrative_structure: AdminStructure,
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
    #[serde(default)]
    pub departments: BTreeMap<String, DepartmentRecord>,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminStructure {
    #[serde(default = "default_total_zones")]
    pub total_zones: u32,
    #[serde(default = "default_total_wards")]
    pub total_wards: u32,
}

impl Default for AdminStructure {
    fn default() -> Self {
        Self {
            total_zones: default_total_zones(),
            total_wards: default_total_wards(),
        }
    }
}

fn default_total_zones() -> u32 {
    15
}
fn default_total_wards() -> u32 {
    200
}

/// One corporation zone. `wards` and the constituency fields are
/// optional in the document; absent means unknown, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub wards: Vec<u32>,
    #[serde(default)]
    pub assembly_constituency: Option<String>,
    #[serde(default)]
    pub parliament_constituency: Option<String>,
}

/// One civic department. Only `contact` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentRecord {
    pub contact: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub mobile_app: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub escalation: Vec<String>,
}

/// One row of the issue-keyword table. Document order is the
/// classification tie-break order.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRecord {
    pub category: String,
    pub keywords: Vec<String>,
    pub department: String,
    #[serde(default)]
    pub response_time: Option<String>,
}

/// A validated issue-table row with its parsed category.
#[derive(Debug, Clone)]
pub struct IssueRule {
    pub category: IssueCategory,
    pub keywords: Vec<String>,
    pub department: String,
    pub response_time: Option<String>,
}

/// Read-only civic knowledge shared by the pipeline components.
#[derive(Debug, Clone)]
pub struct CivicKnowledge {
    data: CivicData,
    pincodes: BTreeMap<String, String>,
    issue_rules: Vec<IssueRule>,
}

impl CivicKnowledge {
    /// Load the store from the configured document paths. Any failure
    /// is reported and answered with the embedded fallback dataset —
    /// the store always comes up.
    pub fn load(config: &KnowledgeConfig) -> Self {
        match Self::from_files(config) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Warning: could not load civic data ({e:#}); using embedded fallback");
                Self::fallback()
            }
        }
    }

    fn from_files(config: &KnowledgeConfig) -> Result<Self> {
        let civic_raw = std::fs::read_to_string(&config.civic_data_path).with_context(|| {
            format!(
                "Failed to read civic data: {}",
                config.civic_data_path.display()
            )
        })?;
        let data: CivicData =
            serde_json::from_str(&civic_raw).with_context(|| "Failed to parse civic data")?;

        let pin_raw = std::fs::read_to_string(&config.pincode_path).with_context(|| {
            format!(
                "Failed to read pincode mapping: {}",
                config.pincode_path.display()
            )
        })?;
        let pincodes: BTreeMap<String, String> =
            serde_json::from_str(&pin_raw).with_context(|| "Failed to parse pincode mapping")?;

        Self::validate(data, pincodes)
    }

    /// Boundary validation: issue categories must parse, referenced
    /// departments must exist, zone ids must be unique.
    fn validate(data: CivicData, pincodes: BTreeMap<String, String>) -> Result<Self> {
        let mut issue_rules = Vec::with_capacity(data.issues.len());
        for record in &data.issues {
            let category = IssueCategory::from_key(&record.category).with_context(|| {
                format!("Unknown issue category in civic data: '{}'", record.category)
            })?;
            if record.keywords.is_empty() {
                anyhow::bail!("Issue category '{}' has no keywords", record.category);
            }
            if !data.departments.contains_key(&record.department) {
                anyhow::bail!(
                    "Issue category '{}' references unknown department '{}'",
                    record.category,
                    record.department
                );
            }
            issue_rules.push(IssueRule {
                category,
                keywords: record.keywords.clone(),
                department: record.department.clone(),
                response_time: record.response_time.clone(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for zone in &data.zones {
            if !seen.insert(zone.id) {
                anyhow::bail!("Duplicate zone id {} in civic data", zone.id);
            }
        }

        Ok(Self {
            data,
            pincodes,
            issue_rules,
        })
    }

    /// Embedded minimal dataset: 4 departments, 5 pincodes, the
    /// standard keyword table, no zone detail.
    pub fn fallback() -> Self {
        let json = include_str!("fallback_data.json");
        let data: CivicData =
            serde_json::from_str(json).expect("embedded fallback data is well-formed");

        let mut pincodes = BTreeMap::new();
        for (pin, area) in [
            ("600001", "Parrys Corner"),
            ("600004", "Mylapore"),
            ("600017", "T. Nagar"),
            ("600020", "Adyar"),
            ("600040", "Anna Nagar"),
        ] {
            pincodes.insert(pin.to_string(), area.to_string());
        }

        Self::validate(data, pincodes).expect("embedded fallback data validates")
    }

    pub fn zones(&self) -> &[ZoneRecord] {
        &self.data.zones
    }

    /// Pincode → area name, ordered by pincode.
    pub fn pincodes(&self) -> &BTreeMap<String, String> {
        &self.pincodes
    }

    /// The issue-keyword table in tie-break order.
    pub fn issue_rules(&self) -> &[IssueRule] {
        &self.issue_rules
    }

    pub fn departments(&self) -> &BTreeMap<String, DepartmentRecord> {
        &self.data.departments
    }

    pub fn admin(&self) -> &AdminStructure {
        &self.data.administrative_structure
    }

    /// Department name responsible for a category. `General` and any
    /// category missing from the table route to the corporation.
    pub fn department_name_for(&self, category: IssueCategory) -> String {
        self.issue_rules
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.department.clone())
            .unwrap_or_else(|| "Greater Chennai Corporation".to_string())
    }

    /// Full department bundle for a category. Always resolves: a
    /// department absent from the store falls back to fixed contact
    /// data so the retriever can never come up empty.
    pub fn department_for(&self, category: IssueCategory) -> DepartmentInfo {
        let name = self.department_name_for(category);
        match self.data.departments.get(&name) {
            Some(record) => DepartmentInfo {
                name,
                contact: record.contact.clone(),
                services: record.services.clone(),
            },
            None => builtin_department(&name),
        }
    }

    /// Escalation chain for a department, lowest role first. Empty when
    /// the store has none; the reasoner supplies the generic chain.
    pub fn escalation_chain(&self, department: &str) -> Vec<String> {
        self.data
            .departments
            .get(department)
            .map(|d| d.escalation.clone())
            .unwrap_or_default()
    }

    pub fn response_time(&self, category: IssueCategory) -> Option<String> {
        self.issue_rules
            .iter()
            .find(|r| r.category == category)
            .and_then(|r| r.response_time.clone())
    }

    /// Static reference corpus used by similarity ranking: a fixed set
    /// of civic facts plus one line per department in the store.
    pub fn reference_corpus(&self) -> Vec<String> {
        let mut docs: Vec<String> = BASE_REFERENCE_DOCS.iter().map(|s| s.to_string()).collect();
        for (name, record) in &self.data.departments {
            docs.push(format!(
                "{} provides {}. Contact: {}",
                name,
                record.services.join(", "),
                record.contact
            ));
        }
        docs
    }
}

/// Fixed contact data used when a routed department is missing from the
/// loaded documents.
fn builtin_department(name: &str) -> DepartmentInfo {
    let (contact, services): (&str, &[&str]) = match name {
        "Chennai Metro Water" => (
            "044-4567-4567",
            &["Water supply", "Sewerage", "New connections"],
        ),
        "TANGEDCO" => ("94987-94987", &["Power supply", "Billing", "Complaints"]),
        "TNSTC" => ("1800-599-1500", &["Bus transport", "Route complaints"]),
        _ => ("1913", &["General civic services"]),
    };
    DepartmentInfo {
        name: name.to_string(),
        contact: contact.to_string(),
        services: services.iter().map(|s| s.to_string()).collect(),
    }
}

/// Baseline civic facts for the reference corpus.
const BASE_REFERENCE_DOCS: &[&str] = &[
    "Greater Chennai Corporation handles garbage collection, road maintenance, and building approvals. Contact: 1913",
    "Chennai Metro Water (CMWSSB) manages water supply and sewerage. 24x7 Complaint Cell: 044-4567-4567",
    "TANGEDCO handles electricity supply and billing. Emergency: 94987-94987, Power complaints: 1912",
    "TNSTC operates bus transport services. Contact: 1800-599-1500, WhatsApp: 94450-14448",
    "Adyar area falls under Zone 13 with wards 170-182. Common issues: water supply, flooding",
    "T. Nagar falls under Zone 9-10, managed by Urbaser Sumeet for waste collection",
    "Velachery area in Zone 14-15 commonly faces power outages and water shortage",
    "Anna Nagar in Zone 6-7 has mixed waste management by GCC and Ramky",
    "Water supply complaints typically take 24 hours response time",
    "Electricity restoration should happen within 1 hour in urban areas",
    "Garbage collection is done daily door-to-door using Battery Operated Vehicles",
    "Property tax and building approvals are handled by respective zone offices",
    "Emergency water tankers can be requested during shortage periods",
    "Street lighting issues should be reported to zone offices with exact location",
    "Traffic signal problems are handled by Chennai Traffic Police coordination",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_store_has_four_departments_and_five_pincodes() {
        let store = CivicKnowledge::fallback();
        assert_eq!(store.departments().len(), 4);
        assert_eq!(store.pincodes().len(), 5);
        assert!(!store.issue_rules().is_empty());
    }

    #[test]
    fn fallback_routes_water_to_metro_water() {
        let store = CivicKnowledge::fallback();
        let dept = store.department_for(IssueCategory::WaterSupply);
        assert_eq!(dept.name, "Chennai Metro Water");
        assert_eq!(dept.contact, "044-4567-4567");
    }

    #[test]
    fn general_category_routes_to_corporation() {
        let store = CivicKnowledge::fallback();
        let dept = store.department_for(IssueCategory::General);
        assert_eq!(dept.name, "Greater Chennai Corporation");
        assert_eq!(dept.contact, "1913");
    }

    #[test]
    fn corpus_includes_department_lines() {
        let store = CivicKnowledge::fallback();
        let corpus = store.reference_corpus();
        assert!(corpus.len() > BASE_REFERENCE_DOCS.len());
        assert!(corpus.iter().any(|d| d.contains("TNSTC")));
    }
}
