//! Dashboard aggregates and the number formatting the widgets use.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reads a JSON number, or a numeric string with thousands separators.
/// Anything else reads as zero.
pub fn lenient_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => s
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn de_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value))
}

/// State-scoped response of `GET /dashboard/?state=...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub state: String,
    pub official_stats: OfficialStats,
    #[serde(default)]
    pub district_drilldown_stats: Vec<DistrictClaims>,
}

/// Official MoTA figures for one state. Field names follow the upstream
/// dataset columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficialStats {
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Individual_Claims", default, deserialize_with = "de_lenient")]
    pub individual_claims: f64,
    #[serde(rename = "Community_Claims", default, deserialize_with = "de_lenient")]
    pub community_claims: f64,
    #[serde(rename = "Total_Claims", default, deserialize_with = "de_lenient")]
    pub total_claims: f64,
    #[serde(rename = "Individual_Titles", default, deserialize_with = "de_lenient")]
    pub individual_titles: f64,
    #[serde(rename = "Community_Titles", default, deserialize_with = "de_lenient")]
    pub community_titles: f64,
    #[serde(rename = "Total_Titles", default, deserialize_with = "de_lenient")]
    pub total_titles: f64,
    #[serde(rename = "Individual_Forest_Land", default, deserialize_with = "de_lenient")]
    pub individual_forest_land: f64,
    #[serde(rename = "Community_Forest_Land", default, deserialize_with = "de_lenient")]
    pub community_forest_land: f64,
    #[serde(rename = "Total_Forest_Land", default, deserialize_with = "de_lenient")]
    pub total_forest_land: f64,
    #[serde(rename = "Claims_Rejected", default, deserialize_with = "de_lenient")]
    pub claims_rejected: f64,
    #[serde(rename = "Total_Claims_Disposed", default, deserialize_with = "de_lenient")]
    pub total_claims_disposed: f64,
    #[serde(rename = "Percent_Claims_Disposed", default, deserialize_with = "de_lenient")]
    pub percent_claims_disposed: f64,
    #[serde(rename = "Percent_Titles_Distributed", default, deserialize_with = "de_lenient")]
    pub percent_titles_distributed: f64,
}

impl OfficialStats {
    /// Claims neither titled nor rejected.
    pub fn pending_claims(&self) -> f64 {
        (self.total_claims - self.total_titles - self.claims_rejected).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictClaims {
    pub district: String,
    #[serde(default, deserialize_with = "de_lenient")]
    pub total_claims: f64,
}

/// Unscoped response of `GET /dashboard/` used by the landing widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default, deserialize_with = "de_lenient")]
    pub total_claims: f64,
    #[serde(default, deserialize_with = "de_lenient")]
    pub approval_rate: f64,
    #[serde(default, deserialize_with = "de_lenient")]
    pub pending_claims: f64,
    #[serde(default, deserialize_with = "de_lenient")]
    pub rejected_claims: f64,
    #[serde(default, deserialize_with = "de_lenient")]
    pub district_count: f64,
    #[serde(default, deserialize_with = "de_lenient")]
    pub village_count: f64,
}

/// Districts by descending claim count; ties keep input order.
pub fn top_districts(stats: &[DistrictClaims], limit: usize) -> Vec<&DistrictClaims> {
    let mut sorted: Vec<&DistrictClaims> = stats.iter().collect();
    sorted.sort_by(|a, b| b.total_claims.total_cmp(&a.total_claims));
    sorted.truncate(limit);
    sorted
}

/// en-IN digit grouping of the rounded value: `627513` -> `6,27,513`.
///
/// Non-finite input renders as `N/A`.
pub fn format_indian(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, right) = rest.split_at(rest.len() - 2);
            groups.push(right);
            rest = left;
        }
        if !rest.is_empty() {
            groups.push(rest);
        }
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Short form for chart axes: `L` (lakh) at or above 100000, `K` at or above
/// 1000, one decimal place. Smaller values print as-is.
pub fn format_compact(value: f64) -> String {
    if value >= 100_000.0 {
        format!("{:.1}L", value / 100_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Keeps `current` if the fetched list still offers it, otherwise falls back
/// to the first entry, otherwise to no selection.
pub fn select_state<'a>(available: &'a [String], current: &str) -> Option<&'a str> {
    available
        .iter()
        .find(|s| s.as_str() == current)
        .or_else(|| available.first())
        .map(String::as_str)
}
