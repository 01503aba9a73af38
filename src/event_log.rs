//! Append-only log of completed jumps

use serde::Serialize;

use crate::types::JumpEvent;

/// Ordered record of emitted jump events.
///
/// Insertion order is detection order; past entries are never removed or
/// changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<JumpEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next recorded event receives
    pub fn next_sequence_number(&self) -> u32 {
        sequence_after(self.events.len())
    }

    pub fn record(&mut self, event: JumpEvent) {
        self.events.push(event);
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&JumpEvent> {
        self.events.last()
    }

    pub fn events(&self) -> &[JumpEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JumpEvent> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<JumpEvent> {
        self.events
    }
}

/// Saturates at `u32::MAX`
fn sequence_after(count: usize) -> u32 {
    u32::try_from(count)
        .ok()
        .and_then(|n| n.checked_add(1))
        .unwrap_or(u32::MAX)
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a JumpEvent;
    type IntoIter = std::slice::Iter<'a, JumpEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
