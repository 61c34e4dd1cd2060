//! Geo-tagged records returned by the `spatial/*` endpoints.
//!
//! Shapes are owned by the remote API. Coordinates are optional on the wire;
//! `position()` is the only way to get a displayable point, and it fails for
//! missing or non-finite values.

use foundation::LatLon;
use serde::{Deserialize, Serialize};

/// Opaque record identifier.
///
/// The backends send either strings (`"FRA-OCR-1a2b3c4d"`) or integers; both
/// are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct RecordId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
}

impl From<IdRepr> for RecordId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(s) => RecordId(s),
            IdRepr::Int(n) => RecordId(n.to_string()),
        }
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rows may carry the table key `id` next to `claim_id`; `claim_id` wins and
/// `id` is only used when it is the sole identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClaimPointRepr")]
pub struct ClaimPoint {
    pub claim_id: RecordId,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub claimant_name: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub claim_type: Option<String>,
    #[serde(default)]
    pub claim_area_ha: Option<f64>,
}

/// Same key rule as `ClaimPoint`, with `asset_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssetPointRepr")]
pub struct AssetPoint {
    pub asset_id: RecordId,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
}

/// Land-use classification sample. Some deployments send `pixel_id`, some
/// `id`, some both (`pixel_id` wins), some neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LandUsePointRepr")]
pub struct LandUsePoint {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub land_use_class: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub area_ha: Option<f64>,
}

#[derive(Deserialize)]
struct ClaimPointRepr {
    #[serde(default)]
    claim_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    claimant_name: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    claim_type: Option<String>,
    #[serde(default)]
    claim_area_ha: Option<f64>,
}

impl TryFrom<ClaimPointRepr> for ClaimPoint {
    type Error = &'static str;

    fn try_from(r: ClaimPointRepr) -> Result<Self, Self::Error> {
        let claim_id = r.claim_id.or(r.id).ok_or("missing field `claim_id`")?;
        Ok(ClaimPoint {
            claim_id,
            latitude: r.latitude,
            longitude: r.longitude,
            status: r.status,
            claimant_name: r.claimant_name,
            village: r.village,
            district: r.district,
            claim_type: r.claim_type,
            claim_area_ha: r.claim_area_ha,
        })
    }
}

#[derive(Deserialize)]
struct AssetPointRepr {
    #[serde(default)]
    asset_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    district: Option<String>,
}

impl TryFrom<AssetPointRepr> for AssetPoint {
    type Error = &'static str;

    fn try_from(r: AssetPointRepr) -> Result<Self, Self::Error> {
        let asset_id = r.asset_id.or(r.id).ok_or("missing field `asset_id`")?;
        Ok(AssetPoint {
            asset_id,
            latitude: r.latitude,
            longitude: r.longitude,
            asset_type: r.asset_type,
            condition: r.condition,
            village: r.village,
            district: r.district,
        })
    }
}

#[derive(Deserialize)]
struct LandUsePointRepr {
    #[serde(default)]
    pixel_id: Option<RecordId>,
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    land_use_class: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    area_ha: Option<f64>,
}

impl From<LandUsePointRepr> for LandUsePoint {
    fn from(r: LandUsePointRepr) -> Self {
        LandUsePoint {
            id: r.pixel_id.or(r.id),
            latitude: r.latitude,
            longitude: r.longitude,
            land_use_class: r.land_use_class,
            district: r.district,
            area_ha: r.area_ha,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpatialRecord {
    Claim(ClaimPoint),
    Asset(AssetPoint),
    LandUse(LandUsePoint),
}

impl SpatialRecord {
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            SpatialRecord::Claim(c) => Some(&c.claim_id),
            SpatialRecord::Asset(a) => Some(&a.asset_id),
            SpatialRecord::LandUse(l) => l.id.as_ref(),
        }
    }

    pub fn position(&self) -> Option<LatLon> {
        let (lat, lon) = match self {
            SpatialRecord::Claim(c) => (c.latitude, c.longitude),
            SpatialRecord::Asset(a) => (a.latitude, a.longitude),
            SpatialRecord::LandUse(l) => (l.latitude, l.longitude),
        };
        LatLon::from_parts(lat, lon)
    }

    /// Status for claims, type for assets, class for land use.
    pub fn classification(&self) -> Option<&str> {
        match self {
            SpatialRecord::Claim(c) => c.status.as_deref(),
            SpatialRecord::Asset(a) => a.asset_type.as_deref(),
            SpatialRecord::LandUse(l) => l.land_use_class.as_deref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SpatialRecord::Claim(c) => c.claimant_name.as_deref(),
            SpatialRecord::Asset(a) => a.asset_type.as_deref(),
            SpatialRecord::LandUse(l) => l.land_use_class.as_deref(),
        }
    }

    pub fn village(&self) -> Option<&str> {
        match self {
            SpatialRecord::Claim(c) => c.village.as_deref(),
            SpatialRecord::Asset(a) => a.village.as_deref(),
            SpatialRecord::LandUse(_) => None,
        }
    }

    pub fn district(&self) -> Option<&str> {
        match self {
            SpatialRecord::Claim(c) => c.district.as_deref(),
            SpatialRecord::Asset(a) => a.district.as_deref(),
            SpatialRecord::LandUse(l) => l.district.as_deref(),
        }
    }

    pub fn area_ha(&self) -> Option<f64> {
        match self {
            SpatialRecord::Claim(c) => c.claim_area_ha,
            SpatialRecord::Asset(_) => None,
            SpatialRecord::LandUse(l) => l.area_ha,
        }
    }

    /// Case-insensitive substring match over the descriptive attributes.
    ///
    /// An empty term matches everything.
    pub fn matches_text(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        let hay = [
            self.id().map(RecordId::as_str),
            self.name(),
            self.village(),
            self.district(),
            self.classification(),
        ];
        hay.iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetPoint, ClaimPoint, LandUsePoint, RecordId, SpatialRecord};
    use serde_json::json;

    #[test]
    fn record_id_accepts_text_and_integers() {
        let a: RecordId = serde_json::from_value(json!("FRA-OCR-1a2b")).unwrap();
        let b: RecordId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(a.as_str(), "FRA-OCR-1a2b");
        assert_eq!(b.as_str(), "42");
        assert_eq!(serde_json::to_value(&b).unwrap(), json!("42"));
        assert!(serde_json::from_value::<RecordId>(json!({"x": 1})).is_err());
    }

    #[test]
    fn claim_point_tolerates_missing_optional_fields() {
        let c: ClaimPoint = serde_json::from_value(json!({
            "claim_id": 7,
            "latitude": 23.1,
            "longitude": null,
            "status": "Pending",
            "unexpected": "ignored"
        }))
        .unwrap();
        assert_eq!(c.claim_id.as_str(), "7");
        assert_eq!(c.longitude, None);
        assert!(SpatialRecord::Claim(c).position().is_none());
    }

    #[test]
    fn claim_point_requires_an_id() {
        let r = serde_json::from_value::<ClaimPoint>(json!({"latitude": 1.0, "longitude": 2.0}));
        assert!(r.is_err());
    }

    #[test]
    fn land_use_accepts_pixel_id_alias() {
        let l: LandUsePoint = serde_json::from_value(json!({
            "pixel_id": 901,
            "latitude": 22.5,
            "longitude": 79.0,
            "land_use_class": "Dense Forest"
        }))
        .unwrap();
        assert_eq!(l.id, Some(RecordId::new("901")));
    }

    #[test]
    fn specific_key_wins_over_table_id() {
        let c: ClaimPoint = serde_json::from_value(json!({
            "id": 1,
            "claim_id": "FRA-1",
            "latitude": 23.0,
            "longitude": 79.0
        }))
        .unwrap();
        assert_eq!(c.claim_id.as_str(), "FRA-1");

        let a: AssetPoint = serde_json::from_value(json!({"asset_id": 5, "id": 99})).unwrap();
        assert_eq!(a.asset_id.as_str(), "5");
        let a: AssetPoint = serde_json::from_value(json!({"id": 99})).unwrap();
        assert_eq!(a.asset_id.as_str(), "99");

        let l: LandUsePoint = serde_json::from_value(json!({"id": 3, "pixel_id": "px-3"})).unwrap();
        assert_eq!(l.id, Some(RecordId::new("px-3")));
        let l: LandUsePoint = serde_json::from_value(json!({"latitude": 1.0})).unwrap();
        assert_eq!(l.id, None);
    }

    #[test]
    fn text_match_covers_descriptive_fields() {
        let c: ClaimPoint = serde_json::from_value(json!({
            "claim_id": "MP-0001",
            "claimant_name": "Ramesh Baiga",
            "village": "Devigarh",
            "district": "Mandla",
            "status": "Approved"
        }))
        .unwrap();
        let r = SpatialRecord::Claim(c);
        assert!(r.matches_text("baiga"));
        assert!(r.matches_text("DEVI"));
        assert!(r.matches_text("mp-00"));
        assert!(r.matches_text("  "));
        assert!(!r.matches_text("Odisha"));
    }
}
