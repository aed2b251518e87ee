//! Subscription bookkeeping for multi-segment path observers.
//!
//! The path observer owns the tokens; this module only decides which segments to release and
//! which to subscribe when the value feeding a segment changes.

use crate::foundation::value::Value;

/// Identity of the object a segment observes. Plain values share one id; they never notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

impl SourceId {
    /// `None` for null, which halts the chain.
    pub fn of(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        Some(Self(value.object_id().unwrap_or(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    #[default]
    Unsubscribed,
    Subscribed {
        source: SourceId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainState {
    segments: Vec<SegmentState>,
}

impl ChainState {
    pub fn new(len: usize) -> Self {
        Self {
            segments: vec![SegmentState::Unsubscribed; len],
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> SegmentState {
        self.segments.get(index).copied().unwrap_or_default()
    }

    pub fn subscribed(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, SegmentState::Subscribed { .. }))
            .count()
    }

    /// Every segment holds a subscription.
    pub fn is_complete(&self) -> bool {
        self.subscribed() == self.segments.len()
    }
}

/// Segment indices to release, then to subscribe, both ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionDiff {
    pub release: Vec<usize>,
    pub subscribe: Vec<usize>,
}

impl SubscriptionDiff {
    pub fn is_empty(&self) -> bool {
        self.release.is_empty() && self.subscribe.is_empty()
    }
}

/// Re-roots the chain at segment `from`.
///
/// `sources[k]` feeds segment `from + k`; the first `None` leaves it and every later segment
/// unsubscribed. Every subscription at or after `from` is released first, so a segment is never
/// subscribed twice. Segments before `from` are untouched.
pub fn rebuild(
    state: &ChainState,
    from: usize,
    sources: &[Option<SourceId>],
) -> (ChainState, SubscriptionDiff) {
    let mut next = state.clone();
    let mut diff = SubscriptionDiff::default();
    for index in from..state.len() {
        if let SegmentState::Subscribed { .. } = state.segments[index] {
            diff.release.push(index);
        }
        next.segments[index] = SegmentState::Unsubscribed;
    }
    for (index, source) in (from..state.len()).zip(sources) {
        let Some(source) = source else {
            break;
        };
        next.segments[index] = SegmentState::Subscribed { source: *source };
        diff.subscribe.push(index);
    }
    (next, diff)
}

#[cfg(test)]
#[path = "../../tests/unit/observation/chain.rs"]
mod tests;
