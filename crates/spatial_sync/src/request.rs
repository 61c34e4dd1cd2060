use foundation::GeoBounds;

use crate::layer::LayerSet;

/// Monotonic counter bumped each time a new descriptor is issued.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// Identifies one per-layer fetch. Never reused within a coordinator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketId(pub u64);

/// Everything that determines what the spatial endpoints should return.
///
/// Equality is field-wise; an equal descriptor never causes a refetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub bounds: GeoBounds,
    /// Remote filter parameters, unset keys already removed.
    pub params: Vec<(&'static str, String)>,
    pub layers: LayerSet,
}

impl RequestDescriptor {
    /// Query pairs with `bbox` first, then the filter parameters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 1);
        pairs.push(("bbox", self.bounds.to_bbox_string()));
        pairs.extend(self.params.iter().cloned());
        pairs
    }

    /// Unencoded `k=v&k=v` form, for logs.
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::RequestDescriptor;
    use crate::filter::{FilterKey, FilterState};
    use crate::layer::LayerSet;
    use foundation::GeoBounds;

    #[test]
    fn bbox_leads_and_sentinels_are_absent() {
        let mut filter = FilterState::new();
        filter.set_filter(FilterKey::State, "Madhya Pradesh");
        filter.set_filter(FilterKey::Status, "all");

        let d = RequestDescriptor {
            bounds: GeoBounds::new(78.0, 22.0, 80.0, 24.0).unwrap(),
            params: filter.remote_params(),
            layers: LayerSet::default(),
        };
        assert_eq!(d.query_string(), "bbox=78,22,80,24&state=Madhya Pradesh");
        assert!(d.query_pairs().iter().all(|(k, _)| *k != "status"));
    }

    #[test]
    fn equality_covers_every_field() {
        let base = RequestDescriptor {
            bounds: GeoBounds::new(78.0, 22.0, 80.0, 24.0).unwrap(),
            params: vec![("state", "Odisha".to_string())],
            layers: LayerSet::default(),
        };
        assert_eq!(base, base.clone());

        let mut other = base.clone();
        other.layers = LayerSet::all();
        assert_ne!(base, other);

        let mut other = base.clone();
        other.params.clear();
        assert_ne!(base, other);
    }
}
