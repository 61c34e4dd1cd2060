//! Pure projection of store contents into map markers.

use foundation::LatLon;
use portal_model::{RecordId, SpatialRecord};

use crate::layer::{LayerKind, LayerSet};
use crate::store::{LayerStore, StoredRecord};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerStyle {
    /// CSS colour used for stroke and fill.
    pub color: &'static str,
    pub fill_opacity: f32,
    pub radius: u8,
}

impl MarkerStyle {
    pub const fn new(color: &'static str, fill_opacity: f32, radius: u8) -> Self {
        Self {
            color,
            fill_opacity,
            radius,
        }
    }

    /// Legend colour for a record.
    pub fn for_record(record: &SpatialRecord) -> Self {
        match record {
            SpatialRecord::Claim(c) => {
                let color = match c.status.as_deref() {
                    Some("Approved") => "green",
                    Some("Rejected") => "red",
                    _ => "orange",
                };
                Self::new(color, 0.8, 6)
            }
            SpatialRecord::LandUse(l) => {
                let class = l.land_use_class.as_deref().unwrap_or("");
                let color = if class.contains("Forest") {
                    "#228B22"
                } else if class.contains("Agricultural") {
                    "#FFD700"
                } else {
                    "#A9A9A9"
                };
                Self::new(color, 0.6, 4)
            }
            SpatialRecord::Asset(a) => {
                let kind = a.asset_type.as_deref().unwrap_or("").to_lowercase();
                let color = if kind.contains("school") {
                    "#00008B"
                } else if kind.contains("health") {
                    "#DC143C"
                } else if kind.contains("water") {
                    "#1E90FF"
                } else {
                    "#4B0082"
                };
                Self::new(color, 0.9, 5)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub layer: LayerKind,
    pub id: RecordId,
    pub position: LatLon,
    pub label: String,
    pub style: MarkerStyle,
    pub selected: bool,
}

/// At most one selected record across all layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<(LayerKind, RecordId)>,
}

impl Selection {
    /// Replaces any previous selection.
    pub fn select(&mut self, layer: LayerKind, id: RecordId) {
        self.current = Some((layer, id));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn get(&self) -> Option<(LayerKind, &RecordId)> {
        self.current.as_ref().map(|(l, id)| (*l, id))
    }

    pub fn is_selected(&self, layer: LayerKind, id: &RecordId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|(l, sel)| *l == layer && sel == id)
    }

    /// The selected record, if it is still in the store.
    pub fn resolve<'a>(&self, store: &'a LayerStore) -> Option<&'a StoredRecord> {
        let (layer, id) = self.current.as_ref()?;
        store.slot(*layer).find(id)
    }
}

fn label(record: &SpatialRecord) -> String {
    let parts = match record {
        SpatialRecord::Claim(c) => [
            c.claimant_name.as_deref(),
            c.village.as_deref(),
            c.status.as_deref(),
        ],
        SpatialRecord::Asset(a) => [
            a.asset_type.as_deref(),
            a.village.as_deref(),
            a.condition.as_deref(),
        ],
        SpatialRecord::LandUse(l) => [l.land_use_class.as_deref(), l.district.as_deref(), None],
    };
    parts.into_iter().flatten().collect::<Vec<_>>().join(", ")
}

/// Markers for every visible layer in `LayerKind::ALL` order, records in
/// store order. `search` filters locally by `SpatialRecord::matches_text`.
pub fn render(
    store: &LayerStore,
    visible: LayerSet,
    selection: &Selection,
    search: &str,
) -> Vec<Marker> {
    visible
        .iter()
        .flat_map(move |layer| {
            store
                .records(layer)
                .iter()
                .filter(move |r| r.record.matches_text(search))
                .map(move |r| Marker {
                    layer,
                    id: r.id.clone(),
                    position: r.position,
                    label: label(&r.record),
                    style: MarkerStyle::for_record(&r.record),
                    selected: selection.is_selected(layer, &r.id),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Generation;
    use portal_model::{AssetPoint, ClaimPoint, LandUsePoint};
    use serde_json::json;

    fn store() -> LayerStore {
        let claims: Vec<SpatialRecord> = [
            json!({"claim_id": "c1", "latitude": 23.0, "longitude": 79.0, "status": "Approved",
                   "claimant_name": "Ramesh", "village": "Devigarh"}),
            json!({"claim_id": "c2", "latitude": 23.1, "longitude": 79.1, "status": "Pending",
                   "claimant_name": "Sita", "village": "Karanjia"}),
            json!({"claim_id": "c3", "latitude": null, "longitude": 79.1}),
        ]
        .into_iter()
        .filter_map(|v| serde_json::from_value::<ClaimPoint>(v).ok())
        .map(SpatialRecord::Claim)
        .collect();

        let asset: AssetPoint = serde_json::from_value(json!({
            "asset_id": 5, "latitude": 23.2, "longitude": 79.2, "asset_type": "Health Centre"
        }))
        .unwrap();
        let land: LandUsePoint = serde_json::from_value(json!({
            "latitude": 22.9, "longitude": 78.9, "land_use_class": "Dense Forest"
        }))
        .unwrap();

        let mut s = LayerStore::new();
        s.replace(LayerKind::Claims, Generation(1), claims);
        s.replace(LayerKind::Assets, Generation(1), vec![SpatialRecord::Asset(asset)]);
        s.replace(LayerKind::LandUse, Generation(1), vec![SpatialRecord::LandUse(land)]);
        s
    }

    #[test]
    fn markers_follow_visibility_and_legend() {
        let s = store();
        let markers = render(&s, LayerSet::default(), &Selection::default(), "");
        let summary: Vec<(&str, &str, u8)> = markers
            .iter()
            .map(|m| (m.id.as_str(), m.style.color, m.style.radius))
            .collect();
        assert_eq!(
            summary,
            vec![("c1", "green", 6), ("c2", "orange", 6), ("5", "#DC143C", 5)]
        );

        let all = render(&s, LayerSet::all(), &Selection::default(), "");
        let land = all.iter().find(|m| m.layer == LayerKind::LandUse).unwrap();
        assert_eq!(land.style, MarkerStyle::new("#228B22", 0.6, 4));
    }

    #[test]
    fn every_marker_has_a_finite_position() {
        let s = store();
        let markers = render(&s, LayerSet::all(), &Selection::default(), "");
        assert!(markers
            .iter()
            .all(|m| m.position.lat.is_finite() && m.position.lon.is_finite()));
        assert!(markers.iter().all(|m| m.id.as_str() != "c3"));
    }

    #[test]
    fn search_filters_locally() {
        let s = store();
        let markers = render(&s, LayerSet::all(), &Selection::default(), "karanjia");
        let ids: Vec<&str> = markers.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c2"]);
    }

    #[test]
    fn selection_marks_and_resolves() {
        let s = store();
        let mut sel = Selection::default();
        sel.select(LayerKind::Claims, RecordId::new("c1"));
        sel.select(LayerKind::Assets, RecordId::new("5"));

        let markers = render(&s, LayerSet::default(), &sel, "");
        let selected: Vec<&str> = markers
            .iter()
            .filter(|m| m.selected)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(selected, vec!["5"], "selection replaces the previous one");

        let record = sel.resolve(&s).unwrap();
        assert_eq!(record.record.classification(), Some("Health Centre"));

        sel.clear();
        assert!(sel.resolve(&s).is_none());
    }

    #[test]
    fn labels_join_available_parts() {
        let s = store();
        let markers = render(&s, LayerSet::default(), &Selection::default(), "");
        assert_eq!(markers[0].label, "Ramesh, Devigarh, Approved");
    }
}
