//! Async shell around `RequestCoordinator`.
//!
//! One task owns the coordinator and applies results one at a time; only the
//! per-layer fetches run concurrently. Readers observe immutable snapshots
//! through a `watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use foundation::GeoBounds;
use futures_util::future::{Abortable, Aborted};
use portal_model::SpatialRecord;
use runtime::{MetricsSnapshot, Notice, NoticeId, SettleGate};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::coordinator::{Outcome, RequestCoordinator, Ticket};
use crate::error::SyncError;
use crate::filter::{FilterKey, FilterState};
use crate::layer::{LayerKind, LayerSet};
use crate::request::{RequestDescriptor, TicketId};
use crate::source::{SourceError, SpatialSource};
use crate::store::LayerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Changes arriving within this window are coalesced into one cycle.
    pub debounce: Duration,
    /// Quiet period after a pan/zoom gesture before its bounds count.
    pub settle_quiet: Duration,
    pub command_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(150),
            settle_quiet: Duration::from_millis(250),
            command_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFilter(FilterKey, String),
    ClearFilters,
    SetLayer(LayerKind, bool),
    SetLayers(LayerSet),
    ViewportSettled(GeoBounds),
    MovementStarted,
    Moved(GeoBounds),
    MovementEnded(GeoBounds),
    RetryFailed,
    ForceRefresh,
    DismissNotice(NoticeId),
    Reset,
}

/// Published state after each processed event.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    pub store: Arc<LayerStore>,
    pub notices: Vec<Notice>,
    pub filter: FilterState,
    pub layers: LayerSet,
    pub descriptor: Option<Arc<RequestDescriptor>>,
    pub metrics: MetricsSnapshot,
    pub in_flight: usize,
    /// Commands handled so far.
    pub processed: u64,
    /// No fetch in flight and no debounce or settle timer armed.
    pub idle: bool,
}

impl SyncSnapshot {
    fn of(coordinator: &RequestCoordinator, processed: u64, idle: bool) -> Self {
        Self {
            store: Arc::new(coordinator.store().clone()),
            notices: coordinator.notices().notices().to_vec(),
            filter: coordinator.filter().clone(),
            layers: coordinator.layers(),
            descriptor: coordinator.current_descriptor().cloned(),
            metrics: coordinator.metrics().snapshot(),
            in_flight: coordinator.pending_count(),
            processed,
            idle,
        }
    }
}

struct Finished {
    ticket: TicketId,
    layer: LayerKind,
    result: Result<Vec<SpatialRecord>, SourceError>,
}

/// Handle to a running synchronizer. Dropping it stops the driver task.
pub struct SpatialSync {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SyncSnapshot>,
    sent: AtomicU64,
    task: JoinHandle<()>,
}

impl SpatialSync {
    /// Spawns the driver on the current tokio runtime.
    pub fn spawn(source: Arc<dyn SpatialSource>, config: SyncConfig) -> Self {
        Self::spawn_with(source, config, RequestCoordinator::default())
    }

    pub fn spawn_with(
        source: Arc<dyn SpatialSource>,
        config: SyncConfig,
        coordinator: RequestCoordinator,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (done_tx, done_rx) = mpsc::channel(64);
        let (snapshot_tx, snapshot) = watch::channel(SyncSnapshot::of(&coordinator, 0, true));
        let quiet_ms = u64::try_from(config.settle_quiet.as_millis()).unwrap_or(u64::MAX);

        let driver = Driver {
            coordinator,
            source,
            config,
            commands: command_rx,
            done_tx,
            done_rx,
            snapshot: snapshot_tx,
            debounce_at: None,
            settle_at: None,
            gate: SettleGate::new(quiet_ms),
            epoch: Instant::now(),
            processed: 0,
        };
        let task = tokio::spawn(driver.run());

        Self {
            commands,
            snapshot,
            sent: AtomicU64::new(0),
            task,
        }
    }

    pub async fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub async fn set_filter(&self, key: FilterKey, value: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::SetFilter(key, value.into())).await
    }

    pub async fn clear_filters(&self) -> Result<(), SyncError> {
        self.send(Command::ClearFilters).await
    }

    pub async fn set_layer(&self, layer: LayerKind, enabled: bool) -> Result<(), SyncError> {
        self.send(Command::SetLayer(layer, enabled)).await
    }

    pub async fn set_layers(&self, layers: LayerSet) -> Result<(), SyncError> {
        self.send(Command::SetLayers(layers)).await
    }

    /// Settled bounds reported directly by the map. Invalid bounds are
    /// rejected here and never reach the driver.
    pub async fn viewport_settled(&self, bounds: GeoBounds) -> Result<(), SyncError> {
        bounds.validate()?;
        self.send(Command::ViewportSettled(bounds)).await
    }

    pub async fn movement_started(&self) -> Result<(), SyncError> {
        self.send(Command::MovementStarted).await
    }

    pub async fn moved(&self, bounds: GeoBounds) -> Result<(), SyncError> {
        self.send(Command::Moved(bounds)).await
    }

    pub async fn movement_ended(&self, bounds: GeoBounds) -> Result<(), SyncError> {
        bounds.validate()?;
        self.send(Command::MovementEnded(bounds)).await
    }

    pub async fn retry_failed(&self) -> Result<(), SyncError> {
        self.send(Command::RetryFailed).await
    }

    pub async fn force_refresh(&self) -> Result<(), SyncError> {
        self.send(Command::ForceRefresh).await
    }

    pub async fn dismiss_notice(&self, id: NoticeId) -> Result<(), SyncError> {
        self.send(Command::DismissNotice(id)).await
    }

    pub async fn reset(&self) -> Result<(), SyncError> {
        self.send(Command::Reset).await
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until every command sent so far has been handled and the
    /// driver has nothing in flight.
    pub async fn wait_idle(&self) -> Result<SyncSnapshot, SyncError> {
        let target = self.sent.load(Ordering::SeqCst);
        let mut rx = self.snapshot.clone();
        let snap = rx
            .wait_for(|s| s.idle && s.processed >= target)
            .await
            .map_err(|_| SyncError::Closed)?;
        Ok(snap.clone())
    }

    /// Stops the driver, cancelling anything in flight.
    pub async fn shutdown(self) {
        let SpatialSync { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!("Spatial sync driver ended abnormally: {e}");
        }
    }
}

struct Driver {
    coordinator: RequestCoordinator,
    source: Arc<dyn SpatialSource>,
    config: SyncConfig,
    commands: mpsc::Receiver<Command>,
    done_tx: mpsc::Sender<Finished>,
    done_rx: mpsc::Receiver<Finished>,
    snapshot: watch::Sender<SyncSnapshot>,
    debounce_at: Option<Instant>,
    settle_at: Option<Instant>,
    gate: SettleGate,
    epoch: Instant,
    processed: u64,
}

impl Driver {
    async fn run(mut self) {
        debug!("Spatial sync driver started");
        loop {
            let debounce_at = self.debounce_at;
            let settle_at = self.settle_at;

            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command);
                    self.processed += 1;
                }
                Some(finished) = self.done_rx.recv() => self.finish(finished),
                _ = sleep_until(debounce_at.unwrap_or_else(Instant::now)), if debounce_at.is_some() => {
                    self.debounce_at = None;
                    let tickets = self.coordinator.sync();
                    self.launch(tickets);
                }
                _ = sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                    self.settle_at = None;
                    self.poll_gate();
                }
            }

            self.publish();
        }

        let cancelled = self.coordinator.cancel_all();
        info!("Spatial sync driver stopped ({cancelled} fetches cancelled)");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetFilter(key, value) => {
                let changed = self.coordinator.set_filter(key, &value);
                self.schedule_if(changed);
            }
            Command::ClearFilters => {
                let changed = self.coordinator.reset_filters();
                self.schedule_if(changed);
            }
            Command::SetLayer(layer, enabled) => {
                let changed = self.coordinator.set_layer_enabled(layer, enabled);
                self.schedule_if(changed);
            }
            Command::SetLayers(layers) => {
                let changed = self.coordinator.set_layers(layers);
                self.schedule_if(changed);
            }
            Command::ViewportSettled(bounds) => self.apply_bounds(bounds),
            Command::MovementStarted => {
                let now = self.now_ms();
                self.gate.movement_started(now);
                self.settle_at = None;
            }
            Command::Moved(bounds) => {
                let now = self.now_ms();
                self.gate.moved(bounds, now);
            }
            Command::MovementEnded(bounds) => {
                let now = self.now_ms();
                self.gate.movement_ended(bounds, now);
                self.settle_at = Some(Instant::now() + self.config.settle_quiet);
            }
            Command::RetryFailed => {
                self.flush();
                let tickets = self.coordinator.retry_failed();
                self.launch(tickets);
            }
            Command::ForceRefresh => {
                if !self.flush() {
                    let tickets = self.coordinator.force_refresh();
                    self.launch(tickets);
                }
            }
            Command::DismissNotice(id) => {
                self.coordinator.dismiss_notice(id);
            }
            Command::Reset => {
                self.coordinator.reset();
                self.debounce_at = None;
                self.settle_at = None;
                self.gate = SettleGate::new(self.gate.quiet_ms());
            }
        }
    }

    fn apply_bounds(&mut self, bounds: GeoBounds) {
        match self.coordinator.on_viewport_settled(bounds) {
            Ok(changed) => self.schedule_if(changed),
            Err(e) => warn!("Ignoring viewport: {e}"),
        }
    }

    fn poll_gate(&mut self) {
        let now = self.now_ms();
        if let Some(bounds) = self.gate.poll(now) {
            self.apply_bounds(bounds);
        } else if self.gate.is_settling() {
            self.settle_at = Some(Instant::now() + Duration::from_millis(1));
        }
    }

    fn schedule_if(&mut self, changed: bool) {
        if changed {
            self.debounce_at = Some(Instant::now() + self.config.debounce);
        }
    }

    /// Runs a pending debounced sync now. Returns whether it issued fetches.
    fn flush(&mut self) -> bool {
        if self.debounce_at.take().is_none() {
            return false;
        }
        let tickets = self.coordinator.sync();
        let issued = !tickets.is_empty();
        self.launch(tickets);
        issued
    }

    fn launch(&self, tickets: Vec<Ticket>) {
        for ticket in tickets {
            let Ticket {
                id,
                layer,
                descriptor,
                registration,
                ..
            } = ticket;
            let source = Arc::clone(&self.source);
            let done = self.done_tx.clone();

            tokio::spawn(async move {
                let fetch = Abortable::new(source.fetch_layer(layer, &descriptor), registration);
                match fetch.await {
                    Ok(result) => {
                        let _ = done
                            .send(Finished {
                                ticket: id,
                                layer,
                                result,
                            })
                            .await;
                    }
                    Err(Aborted) => debug!("Fetch for {layer} aborted (ticket {})", id.0),
                }
            });
        }
    }

    fn finish(&mut self, finished: Finished) {
        let Finished {
            ticket,
            layer,
            result,
        } = finished;
        match self.coordinator.complete(ticket, layer, result) {
            Outcome::Applied {
                layer,
                kept,
                dropped,
            } => debug!("Applied {layer}: {kept} records ({dropped} dropped)"),
            Outcome::Failed { layer, .. } => debug!("Posted notice for {layer}"),
            Outcome::Discarded { .. } => {}
        }
    }

    fn is_idle(&self) -> bool {
        self.coordinator.pending_count() == 0 && self.debounce_at.is_none() && self.settle_at.is_none()
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn publish(&self) {
        self.snapshot
            .send_replace(SyncSnapshot::of(&self.coordinator, self.processed, self.is_idle()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CANCELLED, ISSUED};
    use crate::source::BoxFuture;
    use portal_model::ClaimPoint;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::oneshot;

    fn bounds(west: f64) -> GeoBounds {
        GeoBounds::new(west, 22.0, west + 2.0, 24.0).unwrap()
    }

    fn claim(id: &str, b: &GeoBounds) -> SpatialRecord {
        let centre = b.center();
        let c: ClaimPoint = serde_json::from_value(json!({
            "claim_id": id, "latitude": centre.lat, "longitude": centre.lon, "status": "Pending"
        }))
        .unwrap();
        SpatialRecord::Claim(c)
    }

    fn fast() -> SyncConfig {
        SyncConfig {
            debounce: Duration::ZERO,
            settle_quiet: Duration::from_millis(10),
            command_buffer: 16,
        }
    }

    fn claims_only() -> RequestCoordinator {
        RequestCoordinator::new(LayerSet::empty().with(LayerKind::Claims))
    }

    fn ids(snap: &SyncSnapshot, layer: LayerKind) -> Vec<String> {
        snap.store
            .records(layer)
            .iter()
            .map(|r| r.id.to_string())
            .collect()
    }

    #[derive(Default)]
    struct ScriptedSource {
        calls: Mutex<Vec<(LayerKind, String)>>,
        fail_claims_once: AtomicBool,
    }

    impl ScriptedSource {
        fn calls(&self) -> Vec<(LayerKind, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SpatialSource for ScriptedSource {
        fn fetch_layer<'a>(
            &'a self,
            layer: LayerKind,
            descriptor: &'a RequestDescriptor,
        ) -> BoxFuture<'a, Result<Vec<SpatialRecord>, SourceError>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((layer, descriptor.query_string()));
                if layer == LayerKind::Claims && self.fail_claims_once.swap(false, Ordering::SeqCst) {
                    return Err(SourceError::new("HTTP 500"));
                }
                let id = format!("{layer}-{}", descriptor.bounds.west);
                Ok(vec![claim(&id, &descriptor.bounds)])
            })
        }
    }

    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<HashMap<String, oneshot::Receiver<Vec<SpatialRecord>>>>,
        started: AtomicUsize,
    }

    impl GatedSource {
        fn gate(&self, b: &GeoBounds) -> oneshot::Sender<Vec<SpatialRecord>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(b.to_bbox_string(), rx);
            tx
        }

        async fn wait_started(&self, n: usize) {
            for _ in 0..500 {
                if self.started.load(Ordering::SeqCst) >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            panic!("fetch {n} never started");
        }
    }

    impl SpatialSource for GatedSource {
        fn fetch_layer<'a>(
            &'a self,
            _layer: LayerKind,
            descriptor: &'a RequestDescriptor,
        ) -> BoxFuture<'a, Result<Vec<SpatialRecord>, SourceError>> {
            Box::pin(async move {
                let gate = self
                    .gates
                    .lock()
                    .unwrap()
                    .remove(&descriptor.bounds.to_bbox_string());
                self.started.fetch_add(1, Ordering::SeqCst);
                match gate {
                    Some(rx) => rx.await.map_err(|_| SourceError::new("gate dropped")),
                    None => Ok(Vec::new()),
                }
            })
        }
    }

    #[tokio::test]
    async fn settled_viewport_populates_each_layer() {
        let source = Arc::new(ScriptedSource::default());
        let sync = SpatialSync::spawn(source.clone(), fast());

        sync.set_filter(FilterKey::State, "Madhya Pradesh").await.unwrap();
        sync.set_filter(FilterKey::Status, "all").await.unwrap();
        sync.viewport_settled(bounds(78.0)).await.unwrap();
        let snap = sync.wait_idle().await.unwrap();

        assert_eq!(ids(&snap, LayerKind::Claims), vec!["claims-78"]);
        assert_eq!(ids(&snap, LayerKind::Assets), vec!["assets-78"]);
        assert!(ids(&snap, LayerKind::LandUse).is_empty());
        let calls = source.calls();
        assert!(calls.iter().all(|(_, q)| q == "bbox=78,22,80,24&state=Madhya Pradesh"));
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn debounce_coalesces_rapid_changes() {
        let source = Arc::new(ScriptedSource::default());
        let config = SyncConfig {
            debounce: Duration::from_millis(40),
            ..fast()
        };
        let sync = SpatialSync::spawn_with(source.clone(), config, claims_only());

        sync.viewport_settled(bounds(70.0)).await.unwrap();
        sync.viewport_settled(bounds(74.0)).await.unwrap();
        sync.set_filter(FilterKey::District, "Mandla").await.unwrap();
        let snap = sync.wait_idle().await.unwrap();

        assert_eq!(
            source.calls(),
            vec![(LayerKind::Claims, "bbox=74,22,76,24&district=Mandla".to_string())]
        );
        assert_eq!(snap.metrics.counter(ISSUED), 1);
    }

    #[tokio::test]
    async fn equal_state_does_not_refetch() {
        let source = Arc::new(ScriptedSource::default());
        let sync = SpatialSync::spawn_with(source.clone(), fast(), claims_only());

        sync.viewport_settled(bounds(78.0)).await.unwrap();
        let first = sync.wait_idle().await.unwrap();
        sync.viewport_settled(bounds(78.0)).await.unwrap();
        sync.set_filter(FilterKey::Search, "ramesh").await.unwrap();
        let second = sync.wait_idle().await.unwrap();

        assert_eq!(source.calls().len(), 1);
        assert_eq!(first.store, second.store);
    }

    #[tokio::test]
    async fn superseded_fetch_never_lands() {
        let source = Arc::new(GatedSource::default());
        let (b1, b2) = (bounds(78.0), bounds(70.0));
        let first = source.gate(&b1);
        let second = source.gate(&b2);
        let sync = SpatialSync::spawn_with(source.clone(), fast(), claims_only());

        sync.viewport_settled(b1).await.unwrap();
        source.wait_started(1).await;
        sync.viewport_settled(b2).await.unwrap();
        source.wait_started(2).await;

        // Aborted before this lands; even a late send must not reach the store.
        let _ = first.send(vec![claim("old", &b1)]);
        second.send(vec![claim("new", &b2)]).unwrap();

        let snap = sync.wait_idle().await.unwrap();
        assert_eq!(ids(&snap, LayerKind::Claims), vec!["new"]);
        assert_eq!(snap.metrics.counter(CANCELLED), 1);
        assert!(snap.notices.is_empty());
    }

    #[tokio::test]
    async fn failure_posts_notice_and_retry_recovers() {
        let source = Arc::new(ScriptedSource::default());
        source.fail_claims_once.store(true, Ordering::SeqCst);
        let sync = SpatialSync::spawn(source.clone(), fast());

        sync.viewport_settled(bounds(78.0)).await.unwrap();
        let snap = sync.wait_idle().await.unwrap();
        assert!(ids(&snap, LayerKind::Claims).is_empty());
        assert_eq!(ids(&snap, LayerKind::Assets), vec!["assets-78"]);
        assert_eq!(snap.notices.len(), 1);
        assert_eq!(snap.notices[0].source, "claims");

        sync.retry_failed().await.unwrap();
        let snap = sync.wait_idle().await.unwrap();
        assert_eq!(ids(&snap, LayerKind::Claims), vec!["claims-78"]);
        assert!(snap.notices.is_empty());
        let claim_calls = source
            .calls()
            .into_iter()
            .filter(|(l, _)| *l == LayerKind::Claims)
            .count();
        assert_eq!(claim_calls, 2);
    }

    #[tokio::test]
    async fn gesture_reports_bounds_once_settled() {
        let source = Arc::new(ScriptedSource::default());
        let sync = SpatialSync::spawn_with(source.clone(), fast(), claims_only());

        sync.movement_started().await.unwrap();
        sync.moved(bounds(60.0)).await.unwrap();
        sync.moved(bounds(61.0)).await.unwrap();
        sync.movement_ended(bounds(62.0)).await.unwrap();
        let snap = sync.wait_idle().await.unwrap();

        assert_eq!(
            source.calls(),
            vec![(LayerKind::Claims, "bbox=62,22,64,24".to_string())]
        );
        assert_eq!(ids(&snap, LayerKind::Claims), vec!["claims-62"]);
    }

    #[tokio::test]
    async fn invalid_bounds_are_rejected_before_sending() {
        let source = Arc::new(ScriptedSource::default());
        let sync = SpatialSync::spawn(source.clone(), fast());
        let inverted = GeoBounds {
            west: 80.0,
            south: 22.0,
            east: 78.0,
            north: 24.0,
        };
        assert!(matches!(
            sync.viewport_settled(inverted).await,
            Err(SyncError::InvalidBounds(_))
        ));
        let snap = sync.wait_idle().await.unwrap();
        assert!(snap.descriptor.is_none());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_published_state() {
        let source = Arc::new(ScriptedSource::default());
        let sync = SpatialSync::spawn(source.clone(), fast());
        sync.set_filter(FilterKey::Village, "Devigarh").await.unwrap();
        sync.viewport_settled(bounds(78.0)).await.unwrap();
        sync.wait_idle().await.unwrap();

        sync.reset().await.unwrap();
        let snap = sync.wait_idle().await.unwrap();
        assert_eq!(snap.store.total_records(), 0);
        assert!(snap.filter.is_empty());
        assert!(snap.descriptor.is_none());
    }
}
