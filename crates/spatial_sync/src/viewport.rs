use foundation::GeoBounds;

use crate::error::SyncError;

/// Last settled map bounding box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportState {
    bounds: Option<GeoBounds>,
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bounds` if valid and different from the current ones.
    ///
    /// Invalid bounds are rejected and leave the state untouched.
    pub fn on_viewport_settled(&mut self, bounds: GeoBounds) -> Result<bool, SyncError> {
        bounds.validate()?;
        if self.bounds == Some(bounds) {
            return Ok(false);
        }
        self.bounds = Some(bounds);
        Ok(true)
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.bounds
    }

    pub fn clear(&mut self) -> bool {
        self.bounds.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportState;
    use crate::error::SyncError;
    use foundation::GeoBounds;

    #[test]
    fn stores_valid_bounds_once() {
        let mut v = ViewportState::new();
        let b = GeoBounds::new(78.0, 22.0, 80.0, 24.0).unwrap();
        assert!(v.on_viewport_settled(b).unwrap());
        assert!(!v.on_viewport_settled(b).unwrap());
        assert_eq!(v.bounds(), Some(b));
    }

    #[test]
    fn invalid_bounds_leave_state_untouched() {
        let mut v = ViewportState::new();
        let good = GeoBounds::new(78.0, 22.0, 80.0, 24.0).unwrap();
        v.on_viewport_settled(good).unwrap();

        let bad = GeoBounds {
            west: 81.0,
            south: 22.0,
            east: 80.0,
            north: 24.0,
        };
        assert!(matches!(
            v.on_viewport_settled(bad),
            Err(SyncError::InvalidBounds(_))
        ));
        let nan = GeoBounds {
            north: f64::NAN,
            ..good
        };
        assert!(v.on_viewport_settled(nan).is_err());
        assert_eq!(v.bounds(), Some(good));
    }
}
