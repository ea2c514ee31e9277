//! Typed fan-out of decoded records and lifecycle notifications.
//!
//! The dispatcher maps event-type names to sets of subscriber callbacks. A
//! small fixed set of lifecycle names is well known (see [`lifecycle`]),
//! and server-defined custom `event:` names route to subscribers registered
//! under that name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::StateChange;
use crate::sse::SseRecord;

/// Well-known lifecycle event names.
pub mod lifecycle {
    pub const OPEN: &str = "open";
    pub const MESSAGE: &str = "message";
    pub const ERROR: &str = "error";
    pub const DONE: &str = "done";
    pub const STATE_CHANGE: &str = "statechange";
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// The connection opened successfully.
    Open,
    /// A decoded record (under `"message"` or a custom event name).
    Message(SseRecord),
    /// The connection failed; a retry may follow.
    Error { reason: String },
    /// The server signaled stream completion via the `[DONE]` sentinel.
    Done,
    /// The connection state machine transitioned.
    StateChange(StateChange),
}

/// Handle returned by [`EventDispatcher::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Arc<dyn Fn(&EventPayload) + Send + Sync>;

#[derive(Default)]
struct DispatchTable {
    next_id: u64,
    subscribers: HashMap<String, Vec<(u64, Subscriber)>>,
}

/// Event-name to subscriber-set mapping with snapshot emission.
///
/// Each subscriber is invoked synchronously and exactly once per emission.
/// Emission iterates over a snapshot of the subscriber set, so
/// unsubscribing while dispatching does not affect the emission already in
/// progress.
#[derive(Default)]
pub struct EventDispatcher {
    table: Mutex<DispatchTable>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback under an event name.
    pub fn on<F>(&self, event: &str, callback: F) -> SubscriberId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let mut table = self.table.lock().unwrap();
        let id = table.next_id;
        table.next_id += 1;
        table
            .subscribers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriberId(id)
    }

    /// Remove a subscriber. Returns whether it was present.
    pub fn off(&self, event: &str, id: SubscriberId) -> bool {
        let mut table = self.table.lock().unwrap();
        if let Some(entries) = table.subscribers.get_mut(event) {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id.0);
            return entries.len() != before;
        }
        false
    }

    /// Emit a payload to every subscriber registered under `event`.
    pub fn emit(&self, event: &str, payload: &EventPayload) {
        // Snapshot under the lock, invoke outside it. A subscriber may call
        // off() (or on()) for this same event without deadlocking or
        // affecting this emission.
        let snapshot: Vec<Subscriber> = {
            let table = self.table.lock().unwrap();
            match table.subscribers.get(event) {
                Some(entries) => entries.iter().map(|(_, s)| Arc::clone(s)).collect(),
                None => return,
            }
        };
        for subscriber in snapshot {
            subscriber(payload);
        }
    }

    /// Number of subscribers currently registered under `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        let table = self.table.lock().unwrap();
        table.subscribers.get(event).map_or(0, |entries| entries.len())
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.lock().unwrap();
        let counts: HashMap<&str, usize> = table
            .subscribers
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("subscribers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_subscriber() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        dispatcher.on(lifecycle::OPEN, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);
        dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let dispatcher = EventDispatcher::new();
        dispatcher.emit(lifecycle::DONE, &EventPayload::Done);
    }

    #[test]
    fn test_custom_event_names_route_independently() {
        let dispatcher = EventDispatcher::new();
        let progress = Arc::new(AtomicUsize::new(0));
        let message = Arc::new(AtomicUsize::new(0));

        let progress_clone = progress.clone();
        dispatcher.on("progress", move |_| {
            progress_clone.fetch_add(1, Ordering::SeqCst);
        });
        let message_clone = message.clone();
        dispatcher.on(lifecycle::MESSAGE, move |_| {
            message_clone.fetch_add(1, Ordering::SeqCst);
        });

        let record = SseRecord {
            event: "progress".to_string(),
            data: "42".to_string(),
            id: None,
            last_event_id: None,
        };
        dispatcher.emit("progress", &EventPayload::Message(record));

        assert_eq!(progress.load(Ordering::SeqCst), 1);
        assert_eq!(message.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_subscriber() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let id = dispatcher.on(lifecycle::OPEN, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(dispatcher.off(lifecycle::OPEN, id));
        assert!(!dispatcher.off(lifecycle::OPEN, id));

        dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_does_not_affect_emission() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let second_ran = Arc::new(AtomicUsize::new(0));

        // Register the second subscriber first so we hold its id, then a
        // first subscriber that removes it mid-dispatch.
        let second_clone = second_ran.clone();
        let second_id = dispatcher.on(lifecycle::OPEN, move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });

        let dispatcher_clone = dispatcher.clone();
        // Registered after, so it dispatches after the second subscriber in
        // the snapshot; removing an already-invoked entry is the benign
        // direction. Removing itself mid-dispatch must also be safe.
        let self_id_holder = Arc::new(Mutex::new(None::<SubscriberId>));
        let holder_clone = self_id_holder.clone();
        let self_id = dispatcher.on(lifecycle::OPEN, move |_| {
            dispatcher_clone.off(lifecycle::OPEN, second_id);
            if let Some(own) = *holder_clone.lock().unwrap() {
                dispatcher_clone.off(lifecycle::OPEN, own);
            }
        });
        *self_id_holder.lock().unwrap() = Some(self_id);

        dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);
        // Snapshot semantics: the second subscriber already ran once.
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.subscriber_count(lifecycle::OPEN), 0);

        // Both gone on the next emission.
        dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_count() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.subscriber_count(lifecycle::MESSAGE), 0);
        dispatcher.on(lifecycle::MESSAGE, |_| {});
        dispatcher.on(lifecycle::MESSAGE, |_| {});
        assert_eq!(dispatcher.subscriber_count(lifecycle::MESSAGE), 2);
    }
}
