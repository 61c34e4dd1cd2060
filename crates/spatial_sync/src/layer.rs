use std::str::FromStr;

/// One of the geo-tagged overlays the map can show.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    Claims,
    Assets,
    LandUse,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Claims, LayerKind::Assets, LayerKind::LandUse];

    pub const fn as_str(self) -> &'static str {
        match self {
            LayerKind::Claims => "claims",
            LayerKind::Assets => "assets",
            LayerKind::LandUse => "land-use",
        }
    }

    /// Position in `ALL`.
    pub const fn index(self) -> usize {
        match self {
            LayerKind::Claims => 0,
            LayerKind::Assets => 1,
            LayerKind::LandUse => 2,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            LayerKind::Claims => 1,
            LayerKind::Assets => 1 << 1,
            LayerKind::LandUse => 1 << 2,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLayer(pub String);

impl std::fmt::Display for UnknownLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown layer {:?} (expected claims, assets or land-use)",
            self.0
        )
    }
}

impl std::error::Error for UnknownLayer {}

impl FromStr for LayerKind {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claims" => Ok(LayerKind::Claims),
            "assets" => Ok(LayerKind::Assets),
            "land-use" | "land_use" | "landuse" => Ok(LayerKind::LandUse),
            _ => Err(UnknownLayer(s.to_string())),
        }
    }
}

/// Set of enabled layers, iterated in `LayerKind::ALL` order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerSet(u8);

impl Default for LayerSet {
    /// Claims and community assets; land use starts hidden.
    fn default() -> Self {
        Self::empty()
            .with(LayerKind::Claims)
            .with(LayerKind::Assets)
    }
}

impl LayerSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b111)
    }

    pub const fn with(self, layer: LayerKind) -> Self {
        Self(self.0 | layer.bit())
    }

    pub fn contains(&self, layer: LayerKind) -> bool {
        self.0 & layer.bit() != 0
    }

    /// Returns whether the set changed.
    pub fn set(&mut self, layer: LayerKind, enabled: bool) -> bool {
        let before = self.0;
        if enabled {
            self.0 |= layer.bit();
        } else {
            self.0 &= !layer.bit();
        }
        before != self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = LayerKind> + '_ {
        LayerKind::ALL.into_iter().filter(|l| self.contains(*l))
    }

    /// Parses a comma-separated list such as `claims,land-use`.
    pub fn parse_list(raw: &str) -> Result<Self, UnknownLayer> {
        raw.split(',')
            .filter(|s| !s.trim().is_empty())
            .try_fold(Self::empty(), |set, name| Ok(set.with(name.parse()?)))
    }
}

impl FromIterator<LayerKind> for LayerSet {
    fn from_iter<I: IntoIterator<Item = LayerKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), LayerSet::with)
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerKind, LayerSet};

    #[test]
    fn default_layers_hide_land_use() {
        let set = LayerSet::default();
        assert!(set.contains(LayerKind::Claims));
        assert!(set.contains(LayerKind::Assets));
        assert!(!set.contains(LayerKind::LandUse));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn set_reports_changes() {
        let mut set = LayerSet::empty();
        assert!(set.set(LayerKind::LandUse, true));
        assert!(!set.set(LayerKind::LandUse, true));
        assert!(set.set(LayerKind::LandUse, false));
        assert!(set.is_empty());
    }

    #[test]
    fn parses_names_and_lists() {
        assert_eq!("Land-Use".parse::<LayerKind>(), Ok(LayerKind::LandUse));
        assert!("roads".parse::<LayerKind>().is_err());

        let set = LayerSet::parse_list("land-use, claims").unwrap();
        let order: Vec<LayerKind> = set.iter().collect();
        assert_eq!(order, vec![LayerKind::Claims, LayerKind::LandUse]);
        assert!(LayerSet::parse_list("claims,roads").is_err());
    }
}
