//! OCR/NER document analysis results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `POST /analyze-document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    pub analysis_result: AnalysisResult,
    #[serde(default)]
    pub raw_text_preview: String,
    #[serde(default)]
    pub processing_info: Option<ProcessingInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub form_type: String,
    #[serde(default)]
    pub extracted_data: ExtractedData,
    #[serde(default)]
    pub all_entities: Entities,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub total_entities_found: u32,
    #[serde(default)]
    pub structured_fields: u32,
}

/// Structured fields pulled from an FRA form.
///
/// Fields the model emits beyond the known set are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    #[serde(default)]
    pub claimant_name: Option<String>,
    #[serde(default)]
    pub additional_claimants: Vec<String>,
    #[serde(default)]
    pub spouse_name: Option<String>,
    #[serde(default)]
    pub father_mother_name: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub additional_villages: Vec<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub tehsil: Option<String>,
    #[serde(default)]
    pub claim_area: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExtractedData {
    /// Known fields that carry a value, in form order.
    pub fn known_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("claimant_name", self.claimant_name.as_deref()),
            ("spouse_name", self.spouse_name.as_deref()),
            ("father_mother_name", self.father_mother_name.as_deref()),
            ("village", self.village.as_deref()),
            ("district", self.district.as_deref()),
            ("tehsil", self.tehsil.as_deref()),
            ("claim_area", self.claim_area.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.filter(|s| !s.trim().is_empty()).map(|s| (name, s)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.known_fields().is_empty()
            && self.additional_claimants.is_empty()
            && self.additional_villages.is_empty()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub claimant_names: Vec<String>,
    #[serde(default)]
    pub spouse_names: Vec<String>,
    #[serde(default)]
    pub father_names: Vec<String>,
    #[serde(default)]
    pub villages: Vec<String>,
    #[serde(default)]
    pub districts: Vec<String>,
    #[serde(default)]
    pub tehsils: Vec<String>,
    #[serde(default)]
    pub claim_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    #[serde(default)]
    pub model_path: String,
    #[serde(default)]
    pub entities_found: u32,
    #[serde(default)]
    pub structured_fields: u32,
    #[serde(default)]
    pub confidence: f64,
}
