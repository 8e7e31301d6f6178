
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Event is implemented by the typed event enums of every entity. Kind is
/// the field-less mirror used to subscribe.
pub trait Event: Clone + Send + Sync + 'static {
    type Kind: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

pub type EventHdlrFn<E> =
    Box<dyn (FnMut(E) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<E: Event> {
    id: SubscriptionId,
    kind: E::Kind,
    once: bool,
    handler: Arc<Mutex<EventHdlrFn<E>>>,
}

/// EventEmitter delivers events to handlers subscribed by kind. Handlers
/// run one after another in subscription order, on the emitting task.
pub struct EventEmitter<E: Event> {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription<E>>>,
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        EventEmitter {
            next_id: AtomicU64::new(0),
            subscriptions: Mutex::new(vec![]),
        }
    }
}

impl<E: Event> EventEmitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    async fn subscribe(&self, kind: E::Kind, once: bool, handler: EventHdlrFn<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscriptions.lock().await.push(Subscription {
            id,
            kind,
            once,
            handler: Arc::new(Mutex::new(handler)),
        });
        id
    }

    /// on runs handler for every event of the given kind until `off`.
    pub async fn on(&self, kind: E::Kind, handler: EventHdlrFn<E>) -> SubscriptionId {
        self.subscribe(kind, false, handler).await
    }

    /// once runs handler for the next event of the given kind only.
    pub async fn once(&self, kind: E::Kind, handler: EventHdlrFn<E>) -> SubscriptionId {
        self.subscribe(kind, true, handler).await
    }

    /// off removes a subscription; false if it already fired or was removed.
    pub async fn off(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock().await;
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    pub async fn listener_count(&self, kind: E::Kind) -> usize {
        self.subscriptions
            .lock()
            .await
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }

    pub(crate) async fn emit(&self, event: E) {
        let kind = event.kind();
        let handlers: Vec<Arc<Mutex<EventHdlrFn<E>>>> = {
            let mut subscriptions = self.subscriptions.lock().await;
            let handlers = subscriptions
                .iter()
                .filter(|subscription| subscription.kind == kind)
                .map(|subscription| Arc::clone(&subscription.handler))
                .collect();
            subscriptions.retain(|subscription| !(subscription.once && subscription.kind == kind));
            handlers
        };

        if handlers.is_empty() {
            log::trace!("no handler for event {kind:?}");
        }

        for handler in handlers {
            let mut f = handler.lock().await;
            f(event.clone()).await;
        }
    }

    pub(crate) async fn clear(&self) {
        self.subscriptions.lock().await.clear();
    }
}
