use foundation::GeoBounds;

/// Turns raw map movement events into "viewport settled" reports.
///
/// Time is passed in explicitly (milliseconds on any monotonic clock) so the
/// gate stays deterministic and testable.
///
/// Contract:
/// - Nothing is reported while a pan/zoom gesture is in progress.
/// - After `movement_ended`, the final bounds are reported once `poll` is
///   called at least `quiet_ms` later, provided no new movement started.
/// - Each settle produces at most one report.
#[derive(Debug, Clone)]
pub struct SettleGate {
    quiet_ms: u64,
    moving: bool,
    pending: Option<GeoBounds>,
    last_event_ms: u64,
}

impl SettleGate {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            moving: false,
            pending: None,
            last_event_ms: 0,
        }
    }

    pub fn quiet_ms(&self) -> u64 {
        self.quiet_ms
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Gesture ended and its bounds have not been reported yet.
    pub fn is_settling(&self) -> bool {
        !self.moving && self.pending.is_some()
    }

    pub fn movement_started(&mut self, now_ms: u64) {
        self.moving = true;
        self.pending = None;
        self.last_event_ms = now_ms;
    }

    /// Intermediate frame of a gesture; never reported on its own.
    pub fn moved(&mut self, _bounds: GeoBounds, now_ms: u64) {
        self.moving = true;
        self.last_event_ms = now_ms;
    }

    pub fn movement_ended(&mut self, bounds: GeoBounds, now_ms: u64) {
        self.moving = false;
        self.pending = Some(bounds);
        self.last_event_ms = now_ms;
    }

    /// Returns the settled bounds once the quiet period has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<GeoBounds> {
        if self.moving {
            return None;
        }
        if now_ms.saturating_sub(self.last_event_ms) < self.quiet_ms {
            return None;
        }
        self.pending.take()
    }
}
