//! Decision-support scheme recommendations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub scheme_name: String,
    #[serde(default)]
    pub eligibility_status: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub nearest_match_similarity: Option<f64>,
}

impl Recommendation {
    /// Confidence clamped into `[0, 1]`; non-finite reads as zero.
    pub fn confidence(&self) -> f64 {
        if self.confidence_score.is_finite() {
            self.confidence_score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Recommendations for one claim or beneficiary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(default)]
    pub subject_id: Option<RecordId>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationSet {
    /// Highest confidence first; equal scores keep input order.
    pub fn ranked(&self) -> Vec<&Recommendation> {
        let mut out: Vec<&Recommendation> = self.recommendations.iter().collect();
        out.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQuery {
    pub query: String,
}

/// Response of `POST /dss/chat-recommendations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRecommendations {
    #[serde(default)]
    pub user_query: String,
    /// Profile attributes the model read out of the free-text query.
    #[serde(default)]
    pub features_extracted: BTreeMap<String, Value>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Hypothetical beneficiary for `POST /dss/recommend_development_schemes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryProfile {
    pub age: u32,
    pub gender: String,
    pub tribal_group: String,
    pub village: String,
    pub claim_area_ha: f64,
    pub total_assets: u32,
    pub family_members: u32,
}

impl Default for BeneficiaryProfile {
    fn default() -> Self {
        Self {
            age: 0,
            gender: "Male".to_string(),
            tribal_group: "Gond".to_string(),
            village: "Devigarh".to_string(),
            claim_area_ha: 0.0,
            total_assets: 0,
            family_members: 0,
        }
    }
}
