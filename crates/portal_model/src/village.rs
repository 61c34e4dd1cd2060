//! Village profiles and ranked development interventions.

use serde::{Deserialize, Serialize};

/// Response of `GET /dss/village-profile?village=...`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VillageProfile {
    #[serde(default)]
    pub socioeconomic_data: Socioeconomic,
    #[serde(default)]
    pub infrastructure_data: Infrastructure,
    #[serde(default)]
    pub fra_claims_summary: ClaimsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Socioeconomic {
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub households: u64,
    #[serde(default)]
    pub literacy_rate: f64,
    #[serde(default)]
    pub employment_rate: f64,
    #[serde(default)]
    pub poverty_index: f64,
}

/// Access shares in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    #[serde(default)]
    pub water_access: f64,
    #[serde(default)]
    pub electricity_access: f64,
    #[serde(default)]
    pub road_connectivity: f64,
    #[serde(default)]
    pub health_facilities: f64,
    #[serde(default)]
    pub education_facilities: f64,
}

impl Infrastructure {
    /// `(name, access %)` pairs, weakest first.
    pub fn weakest_first(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![
            ("water_access", self.water_access),
            ("electricity_access", self.electricity_access),
            ("road_connectivity", self.road_connectivity),
            ("health_facilities", self.health_facilities),
            ("education_facilities", self.education_facilities),
        ];
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsSummary {
    #[serde(default)]
    pub total_claims: u64,
    #[serde(default)]
    pub approved_claims: u64,
    #[serde(default)]
    pub pending_claims: u64,
    #[serde(default)]
    pub rejected_claims: u64,
    #[serde(default)]
    pub total_area_hectares: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionPriority {
    pub intervention_type: String,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default)]
    pub deficit_percentage: f64,
    #[serde(default)]
    pub estimated_cost: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub expected_impact: String,
    #[serde(default)]
    pub beneficiaries: u64,
}

/// Response of `GET /dss/intervention-priority?village=...`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterventionPlan {
    #[serde(default)]
    pub priority_interventions: Vec<InterventionPriority>,
}

impl InterventionPlan {
    /// Highest priority score first.
    pub fn ranked(&self) -> Vec<&InterventionPriority> {
        let mut out: Vec<&InterventionPriority> = self.priority_interventions.iter().collect();
        out.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
        out
    }
}
