//! Observer-addressed event fan-out.
//!
//! Every event is published once into a broadcast channel together with the
//! observer it is addressed to. Subscribers filter on their own observer id,
//! so broadcast events (no observer) reach everyone while analysis progress
//! only reaches the observer that asked for it. Events from a single producer
//! arrive in emission order.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_wasm::StationEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Opaque id of a connected observer session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(String);

impl ObserverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObserverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObserverId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event together with its recipient. `None` means every observer.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub observer: Option<ObserverId>,
    pub event: StationEvent,
}

impl Envelope {
    pub fn is_for(&self, observer: &ObserverId) -> bool {
        self.observer.as_ref().map_or(true, |target| target == observer)
    }
}

/// Destination for station events.
///
/// The orchestrator and telemetry producers only see this trait, so tests
/// can capture events without a running server.
pub trait EventSink: Send + Sync {
    /// Deliver `event` to `observer`, or to everyone when `observer` is `None`.
    fn emit(&self, observer: Option<&ObserverId>, event: StationEvent);
}

/// Broadcast hub shared by all producers and connected observers.
pub struct EventHub {
    tx: broadcast::Sender<Envelope>,
}

impl EventHub {
    /// Capacity bounds how far a slow observer may fall behind before it
    /// starts missing events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Receive every envelope, regardless of recipient.
    pub fn subscribe_all(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
            observer: None,
        }
    }

    /// Receive broadcasts plus events addressed to `observer`.
    pub fn subscribe(&self, observer: ObserverId) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
            observer: Some(observer),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventHub {
    fn emit(&self, observer: Option<&ObserverId>, event: StationEvent) {
        tracing::trace!(
            "emit {} to {}",
            event.name(),
            observer.map_or("all", |o| o.as_str())
        );
        // No subscribers is not an error; the event is simply dropped
        let _ = self.tx.send(Envelope {
            observer: observer.cloned(),
            event,
        });
    }
}

/// One observer's view of the hub.
pub struct EventSubscriber {
    rx: broadcast::Receiver<Envelope>,
    observer: Option<ObserverId>,
}

impl EventSubscriber {
    fn accepts(&self, envelope: &Envelope) -> bool {
        match &self.observer {
            Some(observer) => envelope.is_for(observer),
            None => true,
        }
    }

    /// Next event for this subscriber, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<StationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.accepts(&envelope) => return Some(envelope.event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Everything already queued for this subscriber, without waiting.
    pub fn drain(&mut self) -> Vec<StationEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    if self.accepts(&envelope) {
                        events.push(envelope.event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
            }
        }
    }

    /// Hand the raw receiver to a stream adapter along with the filter id.
    pub fn into_parts(self) -> (broadcast::Receiver<Envelope>, Option<ObserverId>) {
        (self.rx, self.observer)
    }
}
