//! Event multiplexer.
//!
//! One raw subscription on the shared connection feeds any number of typed
//! listeners. The raw subscription exists exactly while at least one listener
//! of any kind is registered:
//!
//! ```text
//!                add (first)                 remove (last)
//! Unsubscribed ──────────────▶ Subscribed ──────────────▶ Unsubscribed
//!                              │      ▲
//!                              └──────┘ add / remove not crossing zero,
//!                                       re-attach after reconnect
//! ```
//!
//! Adding the same callback twice registers it twice; each registration
//! gets its own `ListenerId` and fires once per event.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chain_core::{EventOrigin, RawEvent, RawEventSink, SubscriptionId};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::CallSettings;
use crate::error::CallError;
use crate::invoker::{CallKind, Lease, ReconnectHook, ResilientInvoker};
use crate::models::{ChainEvent, EventKind, NftEvent};

type ErasedListener = Arc<dyn Fn(&EventOrigin, &NftEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by `add_listener`, needed to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    kind: EventKind,
    id: u64,
}

impl ListenerId {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Default)]
struct Registry {
    listeners: HashMap<EventKind, Vec<(u64, ErasedListener)>>,
    next_id: u64,
}

impl Registry {
    fn insert(&mut self, kind: EventKind, listener: ErasedListener) -> ListenerId {
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((self.next_id, listener));
        ListenerId {
            kind,
            id: self.next_id,
        }
    }

    fn remove(&mut self, listener: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(&listener.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != listener.id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            self.listeners.remove(&listener.kind);
        }
        removed
    }

    fn total(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Listeners of `kind` in registration order.
    fn snapshot(&self, kind: EventKind) -> Vec<ErasedListener> {
        self.listeners
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }
}

struct Attachment {
    lease: Lease,
    subscription: SubscriptionId,
}

enum FeedState {
    Unsubscribed,

    /// `attachment` is `None` while the subscribed connection is lost and
    /// the next reconnect has not re-attached yet.
    Subscribed { attachment: Option<Attachment> },
}

/// Fans one raw event feed out to typed listeners.
pub struct EventMultiplexer {
    invoker: Arc<ResilientInvoker>,
    settings: CallSettings,
    registry: Arc<Mutex<Registry>>,

    /// Serializes listener add and remove, so the feed only changes between
    /// `Unsubscribed` and `Subscribed` under it. Held across network calls.
    membership: AsyncMutex<()>,

    /// Where the feed is attached. Reconnect hooks take this lock, so it is
    /// never held while the slot may open a connection.
    feed: AsyncMutex<FeedState>,
}

impl EventMultiplexer {
    /// Create a multiplexer and register it for reconnect notifications.
    ///
    /// The first subscribe runs through `invoker` under the same reconnect
    /// bound as any other read.
    pub fn new(invoker: Arc<ResilientInvoker>, settings: CallSettings) -> Arc<Self> {
        let slot = Arc::clone(invoker.slot());
        let multiplexer = Arc::new(Self {
            invoker,
            settings,
            registry: Arc::new(Mutex::new(Registry::default())),
            membership: AsyncMutex::new(()),
            feed: AsyncMutex::new(FeedState::Unsubscribed),
        });

        let weak = Arc::downgrade(&multiplexer);
        let hook: Weak<dyn ReconnectHook> = weak;
        slot.add_hook(hook);
        multiplexer
    }

    /// Register `callback` for events of type `E`.
    ///
    /// The first listener opens the raw subscription before it is registered;
    /// if that fails, nothing is registered.
    pub async fn add_listener<E, F>(&self, callback: F) -> Result<ListenerId, CallError>
    where
        E: ChainEvent,
        F: Fn(&EventOrigin, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let _membership = self.membership.lock().await;

        if !self.is_subscribed().await {
            // Outside the feed lock: a reconnect here notifies hooks, and this
            // multiplexer is one of them.
            let mut attachment = Some(self.subscribe().await?);
            let mut feed = self.feed.lock().await;
            self.catch_up(&mut attachment).await;
            *feed = FeedState::Subscribed { attachment };
        }

        let listener: ErasedListener = Arc::new(move |origin: &EventOrigin, event: &NftEvent| {
            match E::extract(event) {
                Some(typed) => callback(origin, typed),
                None => Ok(()),
            }
        });
        Ok(self.lock_registry().insert(E::KIND, listener))
    }

    /// Unregister a listener. Returns whether it was registered.
    ///
    /// Removing the last listener tears down the raw subscription.
    pub async fn remove_listener(&self, listener: ListenerId) -> bool {
        let _membership = self.membership.lock().await;

        let (removed, remaining) = {
            let mut registry = self.lock_registry();
            let removed = registry.remove(listener);
            (removed, registry.total())
        };
        if !removed || remaining > 0 {
            return removed;
        }

        let detached = std::mem::replace(&mut *self.feed.lock().await, FeedState::Unsubscribed);
        if let FeedState::Subscribed {
            attachment: Some(attachment),
        } = detached
        {
            let connection = &attachment.lease.connection;
            match connection.unsubscribe_events(attachment.subscription).await {
                Ok(()) => tracing::debug!("unsubscribed from events on {}", connection.id()),
                Err(e) => tracing::warn!(
                    "failed to unsubscribe from events on {}: {}",
                    connection.id(),
                    e
                ),
            }
        }

        removed
    }

    pub async fn is_subscribed(&self) -> bool {
        matches!(*self.feed.lock().await, FeedState::Subscribed { .. })
    }

    /// Registered listeners across all kinds.
    pub fn listener_count(&self) -> usize {
        self.lock_registry().total()
    }

    /// Open the raw subscription, reconnecting on transient failures.
    async fn subscribe(&self) -> Result<Attachment, CallError> {
        let attachment = self
            .invoker
            .invoke_leased(
                CallKind::Read,
                self.settings.max_reconnect_count,
                |lease| async move {
                    let subscription = lease.connection.subscribe_events(self.sink()).await?;
                    Ok(Attachment {
                        lease,
                        subscription,
                    })
                },
            )
            .await?;

        tracing::debug!(
            "subscribed to events on {}",
            attachment.lease.connection.id()
        );
        Ok(attachment)
    }

    /// Move a fresh attachment onto the current connection if the slot
    /// replaced it before the feed state was stored. Caller holds the feed lock.
    async fn catch_up(&self, attachment: &mut Option<Attachment>) {
        if let Some(current) = self.invoker.slot().current().await {
            self.attach(attachment, &current).await;
        }
    }

    /// Re-attach to `lease` unless `attachment` is already on it or newer.
    async fn attach(&self, attachment: &mut Option<Attachment>, lease: &Lease) {
        if let Some(existing) = attachment.as_ref()
            && existing.lease.generation >= lease.generation
        {
            return;
        }

        // The old connection is already closed; its feed ended with it.
        *attachment = None;

        match lease.connection.subscribe_events(self.sink()).await {
            Ok(subscription) => {
                tracing::debug!("re-attached events to {}", lease.connection.id());
                *attachment = Some(Attachment {
                    lease: lease.clone(),
                    subscription,
                });
            }
            Err(e) => tracing::warn!(
                "failed to re-attach events to {}, waiting for next reconnect: {}",
                lease.connection.id(),
                e
            ),
        }
    }

    fn sink(&self) -> RawEventSink {
        let registry = Arc::clone(&self.registry);
        Arc::new(move |origin: &EventOrigin, raw: &RawEvent| dispatch(&registry, origin, raw))
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReconnectHook for EventMultiplexer {
    async fn on_reconnect(&self, lease: &Lease) {
        let mut feed = self.feed.lock().await;
        if let FeedState::Subscribed { attachment } = &mut *feed {
            self.attach(attachment, lease).await;
        }
    }
}

/// Deliver one raw event to the listeners of its kind.
///
/// Listeners run outside the registry lock on a snapshot, so a listener
/// removed mid-dispatch still runs to completion for this event. A failing
/// or panicking listener does not stop the others.
fn dispatch(registry: &Mutex<Registry>, origin: &EventOrigin, raw: &RawEvent) {
    let event = NftEvent::decode(raw);
    let Some(kind) = event.kind() else {
        tracing::trace!("dropping unrecognized event {}::{}", raw.module, raw.name);
        return;
    };

    let listeners = registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .snapshot(kind);

    for listener in listeners {
        match panic::catch_unwind(AssertUnwindSafe(|| listener(origin, &event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("{} listener failed: {:#}", kind, e),
            Err(_) => tracing::error!("{} listener panicked", kind),
        }
    }
}
