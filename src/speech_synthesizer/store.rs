//! Directive store: id→record map and FIFO pending queue (§4.2).
//!
//! Generalizes the teacher's `player::queue::PlayQueue` (a FIFO with a
//! current-position cursor) to a keyed store: directives are looked up by
//! `messageId` rather than addressed by queue position, and activation is
//! strict FIFO rather than skip/shuffle/repeat-aware.

use std::collections::{HashMap, VecDeque};

use super::record::{DirectiveRecord, MessageId};

/// Id→record map plus FIFO pending queue.
///
/// This struct does not itself decide *when* to activate a queued
/// directive — that decision depends on whether a record is currently
/// playing, which lives in [`super::state::StateInner`]. [`Self::enqueue`]
/// only reports whether the queue was empty at insertion time; the caller
/// (the executor, holding the state lock too) decides whether that also
/// means "activate immediately" per I1.
#[derive(Default)]
pub struct DirectiveStore {
    map: HashMap<MessageId, DirectiveRecord>,
    queue: VecDeque<MessageId>,
}

impl DirectiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record. Returns `false` if `message_id` is already
    /// mapped (duplicate pre-handle; §7 "silently drop the duplicate").
    pub fn register(&mut self, record: DirectiveRecord) -> bool {
        if self.map.contains_key(&record.message_id) {
            return false;
        }
        self.map.insert(record.message_id.clone(), record);
        true
    }

    pub fn lookup(&self, message_id: &MessageId) -> Option<&DirectiveRecord> {
        self.map.get(message_id)
    }

    pub fn lookup_mut(&mut self, message_id: &MessageId) -> Option<&mut DirectiveRecord> {
        self.map.get_mut(message_id)
    }

    pub fn remove(&mut self, message_id: &MessageId) -> Option<DirectiveRecord> {
        self.map.remove(message_id)
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.map.contains_key(message_id)
    }

    /// Append to the pending queue. Returns `true` if the queue was empty
    /// beforehand (the caller uses this, together with "no current
    /// record", to decide whether to schedule activation).
    pub fn enqueue(&mut self, message_id: MessageId) -> bool {
        let was_empty = self.queue.is_empty();
        self.queue.push_back(message_id);
        was_empty
    }

    /// Remove and return the head of the pending queue, strict FIFO.
    pub fn dequeue_head(&mut self) -> Option<MessageId> {
        self.queue.pop_front()
    }

    /// Remove a specific (queued but not necessarily head) entry — used by
    /// `cancel` on a directive that is queued but not current (§4.7).
    pub fn remove_from_queue(&mut self, message_id: &MessageId) -> bool {
        if let Some(pos) = self.queue.iter().position(|id| id == message_id) {
            self.queue.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued_ids(&self) -> impl Iterator<Item = &MessageId> {
        self.queue.iter()
    }

    pub fn drain_queue(&mut self) -> Vec<MessageId> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech_synthesizer::record::SpeakToken;

    fn record(id: &str) -> DirectiveRecord {
        DirectiveRecord::new(MessageId::new(id), SpeakToken::new(format!("tok-{id}")), format!("attach-{id}"), None)
    }

    #[test]
    fn register_rejects_duplicate_message_id() {
        let mut store = DirectiveStore::new();
        assert!(store.register(record("A")));
        assert!(!store.register(record("A")));
        assert_eq!(store.map.len(), 1);
    }

    #[test]
    fn enqueue_reports_whether_queue_was_empty() {
        let mut store = DirectiveStore::new();
        assert!(store.enqueue(MessageId::new("A"))); // was empty
        assert!(!store.enqueue(MessageId::new("B"))); // already had A
    }

    #[test]
    fn dequeue_head_is_strict_fifo() {
        let mut store = DirectiveStore::new();
        store.enqueue(MessageId::new("A"));
        store.enqueue(MessageId::new("B"));
        store.enqueue(MessageId::new("C"));

        assert_eq!(store.dequeue_head(), Some(MessageId::new("A")));
        assert_eq!(store.dequeue_head(), Some(MessageId::new("B")));
        assert_eq!(store.dequeue_head(), Some(MessageId::new("C")));
        assert_eq!(store.dequeue_head(), None);
    }

    #[test]
    fn remove_from_queue_removes_queued_non_head_entry() {
        let mut store = DirectiveStore::new();
        store.enqueue(MessageId::new("A"));
        store.enqueue(MessageId::new("B"));
        store.enqueue(MessageId::new("C"));

        assert!(store.remove_from_queue(&MessageId::new("B")));
        assert_eq!(store.dequeue_head(), Some(MessageId::new("A")));
        assert_eq!(store.dequeue_head(), Some(MessageId::new("C")));
    }

    #[test]
    fn register_lookup_remove_roundtrip() {
        let mut store = DirectiveStore::new();
        store.register(record("A"));
        assert!(store.lookup(&MessageId::new("A")).is_some());
        let removed = store.remove(&MessageId::new("A"));
        assert!(removed.is_some());
        assert!(store.lookup(&MessageId::new("A")).is_none());
    }

    proptest::proptest! {
        /// Whatever order ids are enqueued in, `dequeue_head` hands them
        /// back in exactly that order (I4: arrival-order activation).
        #[test]
        fn dequeue_order_matches_enqueue_order(ids in proptest::collection::vec(0u32..1000, 0..50)) {
            let mut store = DirectiveStore::new();
            let message_ids: Vec<MessageId> = ids.iter().map(|n| MessageId::new(n.to_string())).collect();
            for id in &message_ids {
                store.enqueue(id.clone());
            }
            let mut drained = Vec::new();
            while let Some(id) = store.dequeue_head() {
                drained.push(id);
            }
            proptest::prop_assert_eq!(drained, message_ids);
        }
    }
}
