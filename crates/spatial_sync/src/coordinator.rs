use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use foundation::GeoBounds;
use futures_util::future::{AbortHandle, AbortRegistration};
use portal_model::SpatialRecord;
use runtime::{Metrics, NoticeBoard, NoticeId};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::filter::{FilterKey, FilterState};
use crate::layer::{LayerKind, LayerSet};
use crate::request::{Generation, RequestDescriptor, TicketId};
use crate::source::SourceError;
use crate::store::{LayerStore, LoadState};
use crate::viewport::ViewportState;

pub const ISSUED: &str = "requests_issued";
pub const APPLIED: &str = "requests_applied";
pub const FAILED: &str = "requests_failed";
pub const CANCELLED: &str = "requests_cancelled";
pub const DISCARDED: &str = "results_discarded";
pub const FETCH_LATENCY: &str = "fetch_latency";

/// A fetch the caller should run: one layer of one descriptor.
///
/// The registration ties the fetch to its abort handle, which the coordinator
/// keeps and fires when the ticket is superseded.
#[derive(Debug)]
pub struct Ticket {
    pub id: TicketId,
    pub layer: LayerKind,
    pub generation: Generation,
    pub descriptor: Arc<RequestDescriptor>,
    pub registration: AbortRegistration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied {
        layer: LayerKind,
        kept: usize,
        dropped: usize,
    },
    Failed {
        layer: LayerKind,
        notice: NoticeId,
    },
    /// The ticket was cancelled or superseded; nothing changed.
    Discarded { layer: LayerKind },
}

#[derive(Debug)]
struct Pending {
    ticket: TicketId,
    generation: Generation,
    abort: AbortHandle,
    issued_at: Instant,
}

/// Combines filter and viewport into descriptors and decides which fetch
/// results may land in the store.
///
/// Synchronous and single-owner: the caller runs the fetches and reports back
/// through `complete`. For each layer only the most recently issued ticket is
/// current; anything else is discarded on arrival.
#[derive(Debug)]
pub struct RequestCoordinator {
    filter: FilterState,
    viewport: ViewportState,
    layers: LayerSet,
    current: Option<Arc<RequestDescriptor>>,
    generation: Generation,
    next_ticket: u64,
    pending: BTreeMap<LayerKind, Pending>,
    store: LayerStore,
    notices: NoticeBoard,
    metrics: Metrics,
    dirty: bool,
}

impl Default for RequestCoordinator {
    fn default() -> Self {
        Self::new(LayerSet::default())
    }
}

impl RequestCoordinator {
    pub fn new(layers: LayerSet) -> Self {
        Self {
            filter: FilterState::new(),
            viewport: ViewportState::new(),
            layers,
            current: None,
            generation: Generation::default(),
            next_ticket: 0,
            pending: BTreeMap::new(),
            store: LayerStore::new(),
            notices: NoticeBoard::new(),
            metrics: Metrics::new(),
            dirty: false,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn layers(&self) -> LayerSet {
        self.layers
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn current_descriptor(&self) -> Option<&Arc<RequestDescriptor>> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Fetches issued and neither resolved nor cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, layer: LayerKind) -> bool {
        self.pending.contains_key(&layer)
    }

    /// Whether state changed since the last `sync`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_filter(&mut self, key: FilterKey, value: &str) -> bool {
        let changed = self.filter.set_filter(key, value);
        self.dirty |= changed;
        changed
    }

    pub fn clear_filter(&mut self, key: FilterKey) -> bool {
        let changed = self.filter.clear(key);
        self.dirty |= changed;
        changed
    }

    pub fn reset_filters(&mut self) -> bool {
        let changed = self.filter.reset();
        self.dirty |= changed;
        changed
    }

    pub fn on_viewport_settled(&mut self, bounds: GeoBounds) -> Result<bool, SyncError> {
        let changed = self.viewport.on_viewport_settled(bounds)?;
        self.dirty |= changed;
        Ok(changed)
    }

    pub fn set_layer_enabled(&mut self, layer: LayerKind, enabled: bool) -> bool {
        let changed = self.layers.set(layer, enabled);
        self.dirty |= changed;
        changed
    }

    pub fn set_layers(&mut self, layers: LayerSet) -> bool {
        let changed = self.layers != layers;
        self.layers = layers;
        self.dirty |= changed;
        changed
    }

    pub fn dismiss_notice(&mut self, id: NoticeId) -> bool {
        self.notices.dismiss(id)
    }

    /// Descriptor for the current state; `None` until bounds have settled.
    pub fn build_descriptor(&self) -> Option<RequestDescriptor> {
        Some(RequestDescriptor {
            bounds: self.viewport.bounds()?,
            params: self.filter.remote_params(),
            layers: self.layers,
        })
    }

    /// Re-evaluates the state and returns the fetches to start.
    ///
    /// An unchanged descriptor yields nothing. A new one cancels every pending
    /// ticket and issues one per enabled layer.
    pub fn sync(&mut self) -> Vec<Ticket> {
        self.dirty = false;
        let Some(next) = self.build_descriptor() else {
            return Vec::new();
        };
        if self.current.as_deref() == Some(&next) {
            return Vec::new();
        }

        self.cancel_pending();
        self.generation = self.generation.next();
        let descriptor = Arc::new(next);
        self.current = Some(Arc::clone(&descriptor));
        debug!(
            "Issuing generation {} for {}",
            self.generation.0,
            descriptor.query_string()
        );

        let layers: Vec<LayerKind> = descriptor.layers.iter().collect();
        layers
            .into_iter()
            .map(|layer| self.issue(layer, &descriptor))
            .collect()
    }

    /// Re-issues layers whose last attempt failed, against the current
    /// descriptor. Layers with a fetch in flight are left alone.
    pub fn retry_failed(&mut self) -> Vec<Ticket> {
        let Some(descriptor) = self.current.clone() else {
            return Vec::new();
        };
        let failed: Vec<LayerKind> = descriptor
            .layers
            .iter()
            .filter(|l| self.store.slot(*l).state() == LoadState::Failed && !self.is_pending(*l))
            .collect();
        failed
            .into_iter()
            .map(|layer| self.issue(layer, &descriptor))
            .collect()
    }

    /// Re-issues every enabled layer of the current descriptor.
    pub fn force_refresh(&mut self) -> Vec<Ticket> {
        let Some(descriptor) = self.current.clone() else {
            return Vec::new();
        };
        self.cancel_pending();
        let layers: Vec<LayerKind> = descriptor.layers.iter().collect();
        layers
            .into_iter()
            .map(|layer| self.issue(layer, &descriptor))
            .collect()
    }

    /// Cancels every pending ticket. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        self.cancel_pending()
    }

    /// Applies the result of `ticket` if it is still current for its layer.
    pub fn complete(
        &mut self,
        ticket: TicketId,
        layer: LayerKind,
        result: Result<Vec<SpatialRecord>, SourceError>,
    ) -> Outcome {
        let is_current = self
            .pending
            .get(&layer)
            .is_some_and(|p| p.ticket == ticket);
        if !is_current {
            debug!("Discarding stale result for {layer} (ticket {})", ticket.0);
            self.metrics.inc(DISCARDED);
            return Outcome::Discarded { layer };
        }
        let Some(pending) = self.pending.remove(&layer) else {
            return Outcome::Discarded { layer };
        };
        self.metrics
            .record_latency(FETCH_LATENCY, pending.issued_at.elapsed());

        match result {
            Ok(records) => {
                let (kept, dropped) = self.store.replace(layer, pending.generation, records);
                if dropped > 0 {
                    debug!("Dropped {dropped} {layer} records without valid coordinates");
                }
                self.notices.clear_source(layer.as_str());
                self.metrics.inc(APPLIED);
                Outcome::Applied {
                    layer,
                    kept,
                    dropped,
                }
            }
            Err(err) => {
                warn!("Failed to load {layer} layer: {err}");
                let message = format!("Could not load {layer}: {err}");
                self.store.mark_failed(layer, err.to_string());
                let notice = self.notices.post(layer.as_str(), message);
                self.metrics.inc(FAILED);
                Outcome::Failed { layer, notice }
            }
        }
    }

    /// Drops all state except counters; layers return to their defaults.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.filter.reset();
        self.viewport.clear();
        self.layers = LayerSet::default();
        self.current = None;
        self.store.clear();
        self.notices.clear();
        self.dirty = false;
    }

    fn issue(&mut self, layer: LayerKind, descriptor: &Arc<RequestDescriptor>) -> Ticket {
        let id = TicketId(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let (abort, registration) = AbortHandle::new_pair();

        if let Some(prev) = self.pending.insert(
            layer,
            Pending {
                ticket: id,
                generation: self.generation,
                abort,
                issued_at: Instant::now(),
            },
        ) {
            prev.abort.abort();
            self.metrics.inc(CANCELLED);
        }
        self.store.mark_loading(layer);
        self.metrics.inc(ISSUED);

        Ticket {
            id,
            layer,
            generation: self.generation,
            descriptor: Arc::clone(descriptor),
            registration,
        }
    }

    fn cancel_pending(&mut self) -> usize {
        let cancelled = std::mem::take(&mut self.pending);
        let count = cancelled.len();
        for (layer, pending) in cancelled {
            debug!("Cancelled {layer} fetch (ticket {})", pending.ticket.0);
            pending.abort.abort();
            self.store.settle(layer);
        }
        self.metrics.add(CANCELLED, count as u64);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_model::{AssetPoint, ClaimPoint};
    use serde_json::json;

    fn bounds(west: f64) -> GeoBounds {
        GeoBounds::new(west, 22.0, west + 2.0, 24.0).unwrap()
    }

    fn claim(id: &str, lat: f64, lon: f64) -> SpatialRecord {
        let c: ClaimPoint =
            serde_json::from_value(json!({"claim_id": id, "latitude": lat, "longitude": lon}))
                .unwrap();
        SpatialRecord::Claim(c)
    }

    fn asset(id: &str) -> SpatialRecord {
        let a: AssetPoint = serde_json::from_value(
            json!({"asset_id": id, "latitude": 23.0, "longitude": 79.0, "asset_type": "School"}),
        )
        .unwrap();
        SpatialRecord::Asset(a)
    }

    fn ids(c: &RequestCoordinator, layer: LayerKind) -> Vec<String> {
        c.store()
            .records(layer)
            .iter()
            .map(|r| r.id.to_string())
            .collect()
    }

    fn ticket_for(tickets: Vec<Ticket>, layer: LayerKind) -> Ticket {
        tickets.into_iter().find(|t| t.layer == layer).unwrap()
    }

    #[test]
    fn no_fetch_without_bounds() {
        let mut c = RequestCoordinator::default();
        c.set_filter(FilterKey::State, "Odisha");
        assert!(c.is_dirty());
        assert!(c.sync().is_empty());
        assert_eq!(c.pending_count(), 0);
    }

    #[test]
    fn issues_one_ticket_per_enabled_layer() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        let tickets = c.sync();
        let layers: Vec<LayerKind> = tickets.iter().map(|t| t.layer).collect();
        assert_eq!(layers, vec![LayerKind::Claims, LayerKind::Assets]);
        assert!(tickets.iter().all(|t| t.generation == Generation(1)));
        assert_eq!(c.store().slot(LayerKind::Claims).state(), LoadState::Loading);
        assert_eq!(c.metrics().counter(ISSUED), 2);
    }

    #[test]
    fn equal_descriptor_does_not_refetch() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        c.set_filter(FilterKey::State, "Madhya Pradesh");
        let first = c.sync();
        assert_eq!(first.len(), 2);

        // Same values set again, and a sentinel on an unset key.
        c.on_viewport_settled(bounds(78.0)).unwrap();
        c.set_filter(FilterKey::State, "Madhya Pradesh");
        c.set_filter(FilterKey::Status, "all");
        assert!(c.sync().is_empty());
        assert_eq!(c.pending_count(), 2);
    }

    #[test]
    fn search_term_does_not_change_descriptor() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        c.sync();
        assert!(c.set_filter(FilterKey::Search, "ramesh"));
        assert!(c.sync().is_empty());
    }

    #[test]
    fn superseded_result_is_never_written() {
        let mut c = RequestCoordinator::new(LayerSet::empty().with(LayerKind::Claims));
        c.on_viewport_settled(bounds(78.0)).unwrap();
        let d1 = ticket_for(c.sync(), LayerKind::Claims);

        c.on_viewport_settled(bounds(70.0)).unwrap();
        let d2 = ticket_for(c.sync(), LayerKind::Claims);
        assert!(d1.registration.handle().is_aborted());
        assert_eq!(c.metrics().counter(CANCELLED), 1);

        let out = c.complete(d2.id, LayerKind::Claims, Ok(vec![claim("new", 23.0, 71.0)]));
        assert!(matches!(out, Outcome::Applied { kept: 1, .. }));

        // D1 resolves late, after the abort should have stopped it.
        let out = c.complete(d1.id, LayerKind::Claims, Ok(vec![claim("old", 23.0, 79.0)]));
        assert_eq!(out, Outcome::Discarded { layer: LayerKind::Claims });
        assert_eq!(ids(&c, LayerKind::Claims), vec!["new"]);
        assert_eq!(c.store().slot(LayerKind::Claims).generation(), Some(Generation(2)));
        assert_eq!(c.metrics().counter(DISCARDED), 1);
    }

    #[test]
    fn late_result_before_newer_one_is_also_discarded() {
        let mut c = RequestCoordinator::new(LayerSet::empty().with(LayerKind::Claims));
        c.on_viewport_settled(bounds(78.0)).unwrap();
        let d1 = ticket_for(c.sync(), LayerKind::Claims);
        c.on_viewport_settled(bounds(70.0)).unwrap();
        let d2 = ticket_for(c.sync(), LayerKind::Claims);

        let out = c.complete(d1.id, LayerKind::Claims, Ok(vec![claim("old", 23.0, 79.0)]));
        assert_eq!(out, Outcome::Discarded { layer: LayerKind::Claims });
        assert!(ids(&c, LayerKind::Claims).is_empty());
        assert_eq!(c.store().slot(LayerKind::Claims).state(), LoadState::Loading);

        c.complete(d2.id, LayerKind::Claims, Ok(vec![]));
        assert_eq!(c.store().slot(LayerKind::Claims).state(), LoadState::Ready);
    }

    #[test]
    fn failure_is_isolated_to_its_layer() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        let first = c.sync();
        let claims = first.iter().find(|t| t.layer == LayerKind::Claims).unwrap().id;
        let assets = first.iter().find(|t| t.layer == LayerKind::Assets).unwrap().id;
        c.complete(claims, LayerKind::Claims, Ok(vec![claim("c1", 23.0, 79.0)]));
        c.complete(assets, LayerKind::Assets, Ok(vec![]));

        c.set_filter(FilterKey::Status, "Approved");
        let second = c.sync();
        let claims = second.iter().find(|t| t.layer == LayerKind::Claims).unwrap().id;
        let assets = second.iter().find(|t| t.layer == LayerKind::Assets).unwrap().id;

        let out = c.complete(claims, LayerKind::Claims, Err(SourceError::new("HTTP 500")));
        assert!(matches!(out, Outcome::Failed { layer: LayerKind::Claims, .. }));
        c.complete(assets, LayerKind::Assets, Ok(vec![asset("a1")]));

        assert_eq!(ids(&c, LayerKind::Claims), vec!["c1"], "claims unchanged");
        assert_eq!(ids(&c, LayerKind::Assets), vec!["a1"]);
        let notices = c.notices().notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].source, "claims");
        assert!(notices[0].message.contains("HTTP 500"));
    }

    #[test]
    fn retry_reissues_only_failed_layers_and_clears_notice() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        for t in c.sync() {
            let result = match t.layer {
                LayerKind::Claims => Err(SourceError::new("timed out")),
                _ => Ok(vec![asset("a1")]),
            };
            c.complete(t.id, t.layer, result);
        }
        assert_eq!(c.notices().notices().len(), 1);

        let retry = c.retry_failed();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].layer, LayerKind::Claims);
        assert_eq!(retry[0].generation, c.generation());
        assert!(c.retry_failed().is_empty(), "already in flight");

        c.complete(retry[0].id, LayerKind::Claims, Ok(vec![claim("c1", 23.0, 79.0)]));
        assert!(c.notices().is_empty());
        assert_eq!(c.store().slot(LayerKind::Claims).last_error(), None);
    }

    #[test]
    fn same_descriptor_twice_yields_same_store() {
        let run = |c: &mut RequestCoordinator| {
            for t in c.force_refresh() {
                c.complete(t.id, t.layer, Ok(vec![claim("c1", 23.0, 79.0), claim("c2", 23.5, 79.5)]));
            }
            c.store().clone()
        };
        let mut c = RequestCoordinator::new(LayerSet::empty().with(LayerKind::Claims));
        c.on_viewport_settled(bounds(78.0)).unwrap();
        for t in c.sync() {
            c.complete(t.id, t.layer, Ok(vec![claim("c1", 23.0, 79.0), claim("c2", 23.5, 79.5)]));
        }
        let first = c.store().records(LayerKind::Claims).to_vec();
        let again = run(&mut c);
        assert_eq!(first, again.records(LayerKind::Claims));
    }

    #[test]
    fn cancel_all_and_reset() {
        let mut c = RequestCoordinator::default();
        c.on_viewport_settled(bounds(78.0)).unwrap();
        let tickets = c.sync();
        assert_eq!(c.cancel_all(), 2);
        assert!(tickets.iter().all(|t| t.registration.handle().is_aborted()));
        assert_eq!(c.store().slot(LayerKind::Claims).state(), LoadState::Idle);
        for t in tickets {
            assert!(matches!(c.complete(t.id, t.layer, Ok(vec![])), Outcome::Discarded { .. }));
        }

        c.set_layer_enabled(LayerKind::LandUse, true);
        c.reset();
        assert!(c.current_descriptor().is_none());
        assert!(c.filter().is_empty());
        assert_eq!(c.layers(), LayerSet::default());
        assert!(c.sync().is_empty());
    }
}
