use std::collections::BTreeMap;

use portal_model::normalize_choice;

/// Filterable attribute of the spatial layers.
///
/// Declaration order is the order parameters are sent in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    State,
    District,
    Village,
    Status,
    /// Free-text term; applied locally at render time, never sent.
    Search,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::State,
        FilterKey::District,
        FilterKey::Village,
        FilterKey::Status,
        FilterKey::Search,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            FilterKey::State => "state",
            FilterKey::District => "district",
            FilterKey::Village => "village",
            FilterKey::Status => "status",
            FilterKey::Search => "search",
        }
    }

    pub const fn is_remote(self) -> bool {
        !matches!(self, FilterKey::Search)
    }
}

/// User-selected constraints. Unset keys are absent; the `all` sentinel and
/// blank values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    values: BTreeMap<FilterKey, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or unsets `key`. Returns whether the state changed.
    pub fn set_filter(&mut self, key: FilterKey, value: &str) -> bool {
        match normalize_choice(value) {
            None => self.values.remove(&key).is_some(),
            Some(v) => {
                if self.values.get(&key).map(String::as_str) == Some(v) {
                    false
                } else {
                    self.values.insert(key, v.to_string());
                    true
                }
            }
        }
    }

    pub fn clear(&mut self, key: FilterKey) -> bool {
        self.values.remove(&key).is_some()
    }

    pub fn reset(&mut self) -> bool {
        let changed = !self.values.is_empty();
        self.values.clear();
        changed
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs for the set remote keys, in `FilterKey` order.
    pub fn remote_params(&self) -> Vec<(&'static str, String)> {
        self.values
            .iter()
            .filter(|(k, _)| k.is_remote())
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect()
    }

    pub fn search(&self) -> &str {
        self.get(FilterKey::Search).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterKey, FilterState};

    #[test]
    fn sentinel_unsets_every_key() {
        for key in FilterKey::ALL {
            let mut f = FilterState::new();
            assert!(f.set_filter(key, "Something"));
            assert!(f.set_filter(key, "all"));
            assert_eq!(f.get(key), None);
            assert!(f.remote_params().iter().all(|(name, _)| *name != key.as_str()));
        }
    }

    #[test]
    fn set_filter_reports_changes_and_trims() {
        let mut f = FilterState::new();
        assert!(f.set_filter(FilterKey::District, " Mandla "));
        assert!(!f.set_filter(FilterKey::District, "Mandla"));
        assert_eq!(f.get(FilterKey::District), Some("Mandla"));
        assert!(!f.set_filter(FilterKey::Village, "ALL"), "unset stays unset");
        assert!(f.set_filter(FilterKey::District, ""));
        assert!(f.is_empty());
    }

    #[test]
    fn remote_params_are_ordered_and_exclude_search() {
        let mut f = FilterState::new();
        f.set_filter(FilterKey::Status, "Pending");
        f.set_filter(FilterKey::Search, "ramesh");
        f.set_filter(FilterKey::State, "Madhya Pradesh");
        assert_eq!(
            f.remote_params(),
            vec![
                ("state", "Madhya Pradesh".to_string()),
                ("status", "Pending".to_string())
            ]
        );
        assert_eq!(f.search(), "ramesh");
    }

    #[test]
    fn reset_clears_everything() {
        let mut f = FilterState::new();
        assert!(!f.reset());
        f.set_filter(FilterKey::Village, "Devigarh");
        assert!(f.reset());
        assert!(f.is_empty());
    }
}
