//! Claims-database rows and the explorer's local filtering.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::choice::{normalize_choice, query_pairs};
use crate::records::RecordId;

/// A row from `GET /claims/`.
///
/// Identity-document columns the API may also return (Aadhaar, bank account,
/// mobile) are deliberately not modelled and are dropped on parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: RecordId,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub claimant_name: String,
    #[serde(default)]
    pub father_husband_name: Option<String>,
    #[serde(default)]
    pub tribal_group: Option<String>,
    #[serde(default)]
    pub claim_type: String,
    #[serde(default)]
    pub claim_area_ha: f64,
    #[serde(default)]
    pub survey_number: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub claim_date: Option<String>,
    #[serde(default)]
    pub verification_date: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub patta_number: Option<String>,
    #[serde(default)]
    pub title_date: Option<String>,
    #[serde(default)]
    pub land_type: Option<String>,
    #[serde(default)]
    pub forest_division: Option<String>,
    #[serde(default)]
    pub gram_sabha_resolution_no: Option<String>,
    #[serde(default)]
    pub family_members: Option<u32>,
}

/// Remote query for `GET /claims/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsQuery {
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
}

impl ClaimsQuery {
    pub fn for_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::default()
        }
    }

    /// Query pairs with unset and sentinel values elided.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = query_pairs([
            ("state", self.state.as_deref()),
            ("district", self.district.as_deref()),
            ("village", self.village.as_deref()),
            ("status", self.status.as_deref()),
        ]);
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Explorer-side filter over an already fetched claim list.
///
/// Every field accepts the `all` sentinel or blank for "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsFilter {
    pub status: String,
    pub district: String,
    pub village: String,
    pub claim_type: String,
    pub tribal_group: String,
    pub search_term: String,
}

impl ClaimsFilter {
    pub fn matches(&self, claim: &Claim) -> bool {
        let exact = |want: &str, have: Option<&str>| match normalize_choice(want) {
            None => true,
            Some(want) => have == Some(want),
        };

        exact(&self.status, Some(&claim.status))
            && exact(&self.district, Some(&claim.district))
            && exact(&self.village, Some(&claim.village))
            && exact(&self.claim_type, Some(&claim.claim_type))
            && exact(&self.tribal_group, claim.tribal_group.as_deref())
            && self.matches_search(claim)
    }

    fn matches_search(&self, claim: &Claim) -> bool {
        let term = self.search_term.trim();
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        [
            claim.claimant_name.as_str(),
            claim.claim_id.as_str(),
            claim.village.as_str(),
            claim.district.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Matching claims in input order.
    pub fn apply<'a>(&self, claims: &'a [Claim]) -> Vec<&'a Claim> {
        claims.iter().filter(|c| self.matches(c)).collect()
    }

    pub fn is_active(&self) -> bool {
        [
            &self.status,
            &self.district,
            &self.village,
            &self.claim_type,
            &self.tribal_group,
        ]
        .iter()
        .any(|v| normalize_choice(v).is_some())
            || !self.search_term.trim().is_empty()
    }
}

/// Select options derived from a claim list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimFacets {
    pub districts: Vec<String>,
    pub villages: Vec<String>,
    pub tribal_groups: Vec<String>,
}

impl ClaimFacets {
    /// Sorted unique values; blank values are skipped.
    pub fn from_claims(claims: &[Claim]) -> Self {
        fn collect<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
            values
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        }

        Self {
            districts: collect(claims.iter().map(|c| c.district.as_str())),
            villages: collect(claims.iter().map(|c| c.village.as_str())),
            tribal_groups: collect(claims.iter().filter_map(|c| c.tribal_group.as_deref())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClaimStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
    pub other: usize,
    pub total_area_ha: f64,
}

impl ClaimStats {
    pub fn from_claims<'a>(claims: impl IntoIterator<Item = &'a Claim>) -> Self {
        let mut stats = Self::default();
        for claim in claims {
            stats.total += 1;
            if claim.claim_area_ha.is_finite() {
                stats.total_area_ha += claim.claim_area_ha;
            }
            match claim.status.trim().to_ascii_lowercase().as_str() {
                "approved" => stats.approved += 1,
                "pending" => stats.pending += 1,
                "rejected" => stats.rejected += 1,
                _ => stats.other += 1,
            }
        }
        stats
    }

    /// Share of approved claims in percent, `None` for an empty list.
    pub fn approval_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.approved as f64 * 100.0 / self.total as f64)
    }
}
