use crate::geo::LatLon;

/// Axis-aligned geographic rectangle in WGS84 degrees.
///
/// Field order follows the `west,south,east,north` bbox convention used by
/// the spatial endpoints.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundsError {
    NonFinite,
    Inverted { axis: &'static str },
    Malformed(String),
}

impl std::fmt::Display for BoundsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundsError::NonFinite => write!(f, "bounds contain a non-finite coordinate"),
            BoundsError::Inverted { axis } => {
                write!(f, "bounds are inverted along the {axis} axis")
            }
            BoundsError::Malformed(raw) => {
                write!(f, "expected bbox as west,south,east,north, got {raw:?}")
            }
        }
    }
}

impl std::error::Error for BoundsError {}

impl GeoBounds {
    /// Builds validated bounds.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BoundsError> {
        let b = Self {
            west,
            south,
            east,
            north,
        };
        b.validate()?;
        Ok(b)
    }

    pub fn validate(&self) -> Result<(), BoundsError> {
        if ![self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(BoundsError::NonFinite);
        }
        if self.west > self.east {
            return Err(BoundsError::Inverted { axis: "longitude" });
        }
        if self.south > self.north {
            return Err(BoundsError::Inverted { axis: "latitude" });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Parses `west,south,east,north`. Whitespace around each value is ignored.
    pub fn parse_bbox(raw: &str) -> Result<Self, BoundsError> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BoundsError::Malformed(raw.to_string()));
        }
        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .map_err(|_| BoundsError::Malformed(raw.to_string()))?;
        }
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Query form, shortest decimal representation per value (`78,22,80,24`).
    pub fn to_bbox_string(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }

    pub fn contains(&self, p: LatLon) -> bool {
        p.lon >= self.west && p.lon <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    pub fn center(&self) -> LatLon {
        LatLon {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }
}
