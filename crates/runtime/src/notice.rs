/// Identifies a posted notice so the UI can dismiss it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoticeId(pub u64);

/// A non-fatal, dismissible failure report.
///
/// `source` names the widget or data layer that failed (e.g. `"claims"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub source: &'static str,
    pub message: String,
}

/// Ordered collection of active notices, at most one per source.
///
/// Posting for a source that already has a notice replaces it, so repeated
/// failures of the same layer never stack up.
#[derive(Debug, Default, Clone)]
pub struct NoticeBoard {
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, source: &'static str, message: impl Into<String>) -> NoticeId {
        self.next_id += 1;
        let id = NoticeId(self.next_id);
        self.notices.retain(|n| n.source != source);
        self.notices.push(Notice {
            id,
            source,
            message: message.into(),
        });
        id
    }

    /// Returns `true` if a notice with `id` was active.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Clears the notice of `source`, if any.
    pub fn clear_source(&mut self, source: &str) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.source != source);
        self.notices.len() != before
    }

    pub fn for_source(&self, source: &str) -> Option<&Notice> {
        self.notices.iter().find(|n| n.source == source)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}
