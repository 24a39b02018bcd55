//! Session events and the topic listener registry.

use super::message::ResponseEnvelope;
use coinex_core::error::CoinExError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::trace;

/// Lifecycle and data events emitted by a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Handshake finished; the session is ready.
    Open,
    /// The transport went away.
    Close,
    /// A transport failure or a rejected handshake.
    Error(CoinExError),
    /// Any decoded envelope that is not a handshake reply.
    Message(Arc<ResponseEnvelope>),
}

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type TopicCallback = Arc<dyn Fn(&Value) + Send + Sync>;
type EventCallback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    topics: DashMap<String, Vec<(ListenerId, TopicCallback)>>,
    events: DashMap<ListenerId, EventCallback>,
}

impl ListenerRegistry {
    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn remove(&self, id: ListenerId, topic: Option<&str>) -> bool {
        match topic {
            Some(topic) => {
                let Some(mut listeners) = self.topics.get_mut(topic) else {
                    return false;
                };
                let before = listeners.len();
                listeners.retain(|(listener, _)| *listener != id);
                let removed = listeners.len() != before;
                let empty = listeners.is_empty();
                drop(listeners);
                if empty {
                    self.topics.remove_if(topic, |_, l| l.is_empty());
                }
                removed
            }
            None => self.events.remove(&id).is_some(),
        }
    }
}

/// Deregisters a listener.
///
/// Dropping the handle leaves the listener in place; call [`remove`](Self::remove)
/// to stop deliveries.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    topic: Option<String>,
    registry: Weak<ListenerRegistry>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("topics", &self.topics.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl ListenerHandle {
    /// Returns the listener id.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Returns the topic, or `None` for a whole-session event listener.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Stops deliveries. Returns false if the listener was already gone.
    pub fn remove(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id, self.topic.as_deref()))
    }
}

/// Fan-out for one session: a broadcast of every [`SessionEvent`] plus
/// callbacks keyed by push topic.
#[derive(Debug)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    registry: Arc<ListenerRegistry>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            registry: Arc::new(ListenerRegistry::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Registers `callback` for every push whose method equals `topic`.
    pub fn listen<F>(&self, topic: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.registry.next_id();
        self.registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        ListenerHandle {
            id,
            topic: Some(topic.to_string()),
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Registers `callback` for every session event.
    pub fn on_event<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id();
        self.registry.events.insert(id, Arc::new(callback));
        ListenerHandle {
            id,
            topic: None,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn topic_listener_count(&self, topic: &str) -> usize {
        self.registry.topics.get(topic).map_or(0, |l| l.len())
    }

    pub fn emit(&self, event: SessionEvent) {
        // Callbacks may register or remove listeners, so no map guard is held
        // while they run.
        let callbacks: Vec<EventCallback> = self
            .registry
            .events
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for callback in callbacks {
            callback(&event);
        }
        let _ = self.sender.send(event);
    }

    /// Emits the generic message, then the named event carrying `data`.
    pub fn dispatch(&self, envelope: ResponseEnvelope) {
        let envelope = Arc::new(envelope);
        self.emit(SessionEvent::Message(Arc::clone(&envelope)));

        let Some(method) = envelope.push_method() else {
            return;
        };
        let callbacks: Vec<TopicCallback> = self
            .registry
            .topics
            .get(method)
            .map(|listeners| listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        trace!(method = %method, listeners = callbacks.len(), "Dispatching push");
        for callback in callbacks {
            callback(&envelope.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn push(method: &str) -> ResponseEnvelope {
        ResponseEnvelope {
            id: 0,
            code: 0,
            method: Some(method.to_string()),
            data: json!({"state_list": []}),
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn test_push_reaches_generic_and_named_once() {
        let bus = EventBus::new(16);
        let mut generic = bus.subscribe();
        let named = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&named);
        bus.listen("state.update", move |data| {
            assert!(data.get("state_list").is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.dispatch(push("state.update"));

        assert!(matches!(generic.recv().await.unwrap(), SessionEvent::Message(m) if m.push_method() == Some("state.update")));
        assert!(generic.try_recv().is_err());
        assert_eq!(named.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_other_topics_not_called() {
        let bus = EventBus::new(16);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.listen("deals.update", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.dispatch(push("depth.update"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_listener() {
        let bus = EventBus::new(16);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = bus.listen("bbo.update", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.topic(), Some("bbo.update"));
        assert_eq!(bus.topic_listener_count("bbo.update"), 1);

        assert!(handle.remove());
        assert!(!handle.remove());
        assert_eq!(bus.topic_listener_count("bbo.update"), 0);

        bus.dispatch(push("bbo.update"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_event_callback_and_removal() {
        let bus = EventBus::new(4);
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opens);
        let handle = bus.on_event(move |event| {
            if matches!(event, SessionEvent::Open) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit(SessionEvent::Open);
        bus.emit(SessionEvent::Close);
        assert!(handle.remove());
        bus.emit(SessionEvent::Open);

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(handle.topic(), None);
    }

    #[test]
    fn test_listener_may_register_from_callback() {
        let bus = Arc::new(EventBus::new(4));
        let inner = Arc::clone(&bus);
        bus.listen("order.update", move |_| {
            inner.listen("order.update", |_| {});
        });

        bus.dispatch(push("order.update"));
        assert_eq!(bus.topic_listener_count("order.update"), 2);
    }
}
