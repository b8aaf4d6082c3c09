//! Per-segment acceptance state.
//!
//! The store owns the immutable segment list of one comparison run and a
//! parallel acceptance vector indexed by segment id. It is the only mutable
//! state in the engine and is replaced wholesale on every new comparison.

use tracing::debug;

use crate::types::{InitialSelection, Segment, SegmentId, SegmentState};

#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    segments: Vec<Segment>,
    accepted: Vec<bool>,
}

impl SelectionStore {
    /// Seed acceptance for freshly materialized segments.
    pub fn new(segments: Vec<Segment>, policy: InitialSelection) -> Self {
        let accepted = segments.iter().map(|s| policy.accepts(s.kind())).collect();
        Self { segments, accepted }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn acceptance(&self) -> &[bool] {
        &self.accepted
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_accepted(&self, id: SegmentId) -> Option<bool> {
        self.accepted.get(id).copied()
    }

    /// Flip acceptance of `id`.
    ///
    /// Unknown ids are ignored: a click can land after a new comparison has
    /// replaced the list it referred to. Returns whether anything changed.
    pub fn toggle(&mut self, id: SegmentId) -> bool {
        match self.accepted.get_mut(id) {
            Some(flag) => {
                *flag = !*flag;
                debug!(id, accepted = *flag, "segment toggled");
                true
            }
            None => {
                debug!(id, len = self.segments.len(), "ignoring toggle of unknown segment");
                false
            }
        }
    }

    /// Set acceptance of `id` explicitly. Unknown ids are ignored.
    pub fn set(&mut self, id: SegmentId, accepted: bool) -> bool {
        match self.accepted.get_mut(id) {
            Some(flag) => {
                *flag = accepted;
                true
            }
            None => false,
        }
    }

    /// Re-seed every segment from `policy`, discarding individual toggles.
    pub fn select(&mut self, policy: InitialSelection) {
        for (flag, segment) in self.accepted.iter_mut().zip(&self.segments) {
            *flag = policy.accepts(segment.kind());
        }
        debug!(%policy, "selection reset");
    }

    /// Every segment with its current acceptance, in materialization order.
    pub fn snapshot(&self) -> Vec<SegmentState> {
        self.segments
            .iter()
            .zip(&self.accepted)
            .map(|(segment, &accepted)| SegmentState {
                id: segment.id(),
                kind: segment.kind(),
                content: segment.content().to_string(),
                accepted,
            })
            .collect()
    }
}
