//! Land-cover segmentation and computer-vision asset detection results.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Response of `POST /imagery/segment-land-cover`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverSegmentation {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub segmentation_mask_base64: String,
    /// Class name to area share as sent, e.g. `"Forest": "42.5%"`.
    #[serde(default)]
    pub land_cover_statistics: BTreeMap<String, String>,
    #[serde(default)]
    pub original_size: Option<ImageSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Parses `"42.5%"`, `"42.5"` or `" 42.5 % "` into `42.5`.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

impl LandCoverSegmentation {
    /// Decoded PNG bytes of the mask. A `data:image/png;base64,` prefix is
    /// tolerated.
    pub fn mask_png(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let raw = self.segmentation_mask_base64.trim();
        let payload = match raw.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        STANDARD.decode(payload)
    }

    pub fn has_mask(&self) -> bool {
        !self.segmentation_mask_base64.trim().is_empty()
    }

    /// Numeric class shares, largest first. Unparsable entries are skipped.
    pub fn class_percentages(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .land_cover_statistics
            .iter()
            .filter_map(|(class, raw)| parse_percentage(raw).map(|p| (class.as_str(), p)))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }
}

/// Response of `POST /imagery/detect-assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDetection {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub detected_assets: Vec<DetectedAsset>,
    #[serde(default)]
    pub water_detected: bool,
    #[serde(default)]
    pub water_percentage: Option<String>,
}

impl AssetDetection {
    pub fn water_share(&self) -> Option<f64> {
        self.water_percentage.as_deref().and_then(parse_percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedAsset {
    pub asset_type: String,
    #[serde(default)]
    pub confidence: f64,
    /// Pixel box as `[x_min, y_min, x_max, y_max]`.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}
