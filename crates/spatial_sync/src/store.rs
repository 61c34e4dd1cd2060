use foundation::LatLon;
use portal_model::{RecordId, SpatialRecord};

use crate::layer::LayerKind;
use crate::request::Generation;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// A record that passed the coordinate check, with its resolved id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub position: LatLon,
    pub record: SpatialRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSlot {
    records: Vec<StoredRecord>,
    generation: Option<Generation>,
    state: LoadState,
    last_error: Option<String>,
    dropped: usize,
}

impl LayerSlot {
    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    /// Generation that produced the current records; `None` before the first
    /// successful fetch.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records of the last applied result that lacked valid coordinates.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn find(&self, id: &RecordId) -> Option<&StoredRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    fn settled_state(&self) -> LoadState {
        if self.last_error.is_some() {
            LoadState::Failed
        } else if self.generation.is_some() {
            LoadState::Ready
        } else {
            LoadState::Idle
        }
    }
}

/// Per-layer result sets. Every layer always has a slot.
///
/// Mutation is reserved to the coordinator; readers get shared snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStore {
    slots: [LayerSlot; 3],
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, layer: LayerKind) -> &LayerSlot {
        &self.slots[layer.index()]
    }

    pub fn records(&self, layer: LayerKind) -> &[StoredRecord] {
        self.slot(layer).records()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &LayerSlot)> {
        LayerKind::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn total_records(&self) -> usize {
        self.slots.iter().map(|s| s.records.len()).sum()
    }

    fn slot_mut(&mut self, layer: LayerKind) -> &mut LayerSlot {
        &mut self.slots[layer.index()]
    }

    pub(crate) fn mark_loading(&mut self, layer: LayerKind) {
        self.slot_mut(layer).state = LoadState::Loading;
    }

    /// Undoes `mark_loading` after a cancellation.
    pub(crate) fn settle(&mut self, layer: LayerKind) {
        let slot = self.slot_mut(layer);
        slot.state = slot.settled_state();
    }

    /// Replaces the slot with a complete result. Records without a finite
    /// position are dropped; land-use samples without an id get a positional
    /// one. Returns `(kept, dropped)`.
    pub(crate) fn replace(
        &mut self,
        layer: LayerKind,
        generation: Generation,
        records: Vec<SpatialRecord>,
    ) -> (usize, usize) {
        let total = records.len();
        let kept: Vec<StoredRecord> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let position = record.position()?;
                let id = record
                    .id()
                    .cloned()
                    .unwrap_or_else(|| RecordId::new(format!("{}-{index}", layer.as_str())));
                Some(StoredRecord {
                    id,
                    position,
                    record,
                })
            })
            .collect();

        let dropped = total - kept.len();
        let kept_len = kept.len();
        let slot = self.slot_mut(layer);
        slot.records = kept;
        slot.generation = Some(generation);
        slot.state = LoadState::Ready;
        slot.last_error = None;
        slot.dropped = dropped;
        (kept_len, dropped)
    }

    /// Records the failure; existing records stay as they were.
    pub(crate) fn mark_failed(&mut self, layer: LayerKind, message: String) {
        let slot = self.slot_mut(layer);
        slot.state = LoadState::Failed;
        slot.last_error = Some(message);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
