//! # Event Bus System
//!
//! Broadcast channel the catalog repositories publish cache changes on.
//!
//! ## Overview
//!
//! Cached lists are read on demand; the bus only tells observers *that*
//! something changed so they can re-query. Every event is emitted after the
//! corresponding store transaction has committed.
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ Movie repository ├────────>│           ├────────────>│ Row view   │
//! └──────────────────┘         │ EventBus  │             └────────────┘
//! ┌──────────────────┐  emit   │           │  subscribe  ┌────────────┐
//! │ TV repository    ├────────>│           ├────────────>│ Detail view│
//! └──────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, EventBus};
//! use core_runtime::kinds::{MediaKind, OrderingKind};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut trending = bus
//!     .stream()
//!     .filter(|event| event.ordering() == Some(OrderingKind::Trending));
//!
//! bus.emit(CatalogEvent::OrderingRefreshed {
//!     media_kind: MediaKind::Movie,
//!     ordering: OrderingKind::Trending,
//!     page: 1,
//!     count: 20,
//! })
//! .ok();
//!
//! let event = trending.recv().await.unwrap();
//! assert_eq!(event.media_kind(), MediaKind::Movie);
//! # }
//! ```

use crate::kinds::{MediaKind, OrderingKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};
use tracing::warn;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Cache change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CatalogEvent {
    /// A detail payload or an edit was written for one record.
    RecordCached { media_kind: MediaKind, id: i64 },
    /// One page of an ordering was replaced.
    OrderingRefreshed {
        media_kind: MediaKind,
        ordering: OrderingKind,
        page: u32,
        count: usize,
    },
    RatingsUpdated { media_kind: MediaKind, id: i64 },
    ObsoleteDataCleared { media_kind: MediaKind, removed: u64 },
    /// A refresh failed; the ordering is unchanged.
    RefreshFailed {
        media_kind: MediaKind,
        ordering: OrderingKind,
        message: String,
    },
}

impl CatalogEvent {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            CatalogEvent::RecordCached { media_kind, .. }
            | CatalogEvent::OrderingRefreshed { media_kind, .. }
            | CatalogEvent::RatingsUpdated { media_kind, .. }
            | CatalogEvent::ObsoleteDataCleared { media_kind, .. }
            | CatalogEvent::RefreshFailed { media_kind, .. } => *media_kind,
        }
    }

    /// Ordering the event concerns, if any.
    pub fn ordering(&self) -> Option<OrderingKind> {
        match self {
            CatalogEvent::OrderingRefreshed { ordering, .. }
            | CatalogEvent::RefreshFailed { ordering, .. } => Some(*ordering),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            CatalogEvent::RecordCached { media_kind, id } => {
                format!("Cached {} {}", media_kind, id)
            }
            CatalogEvent::OrderingRefreshed {
                media_kind,
                ordering,
                page,
                count,
            } => format!(
                "Refreshed {} {} page {} ({} items)",
                media_kind, ordering, page, count
            ),
            CatalogEvent::RatingsUpdated { media_kind, id } => {
                format!("Updated ratings for {} {}", media_kind, id)
            }
            CatalogEvent::ObsoleteDataCleared {
                media_kind,
                removed,
            } => format!("Evicted {} obsolete {} records", removed, media_kind),
            CatalogEvent::RefreshFailed {
                media_kind,
                ordering,
                message,
            } => format!("Refresh of {} {} failed: {}", media_kind, ordering, message),
        }
    }
}

/// Central broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    /// Creates a bus buffering `capacity` events per subscriber.
    ///
    /// Subscribers that fall further behind see `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers, or an error when nobody is listening.
    pub fn emit(&self, event: CatalogEvent) -> Result<usize, SendError<CatalogEvent>> {
        self.sender.send(event)
    }

    /// Raw receiver for future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    /// Filterable stream over future events.
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CatalogEvent) -> bool + Send + Sync>;

/// `broadcast::Receiver` wrapper with optional filtering.
///
/// Lagged gaps are logged and skipped; since events only signal "re-query",
/// a missed event is recovered by the next one.
pub struct EventStream {
    receiver: Receiver<CatalogEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CatalogEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CatalogEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CatalogEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<CatalogEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, skipping missed events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<CatalogEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, skipping missed events");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refreshed(ordering: OrderingKind) -> CatalogEvent {
        CatalogEvent::OrderingRefreshed {
            media_kind: MediaKind::Movie,
            ordering,
            page: 1,
            count: 3,
        }
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _first = bus.subscribe();
        let _second = bus.stream();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let result = bus.emit(CatalogEvent::RecordCached {
            media_kind: MediaKind::Movie,
            id: 1,
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.stream();
        let mut second = bus.stream();

        let event = CatalogEvent::RatingsUpdated {
            media_kind: MediaKind::TvShow,
            id: 7,
        };
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(first.recv().await, Some(event.clone()));
        assert_eq!(second.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut popular = bus
            .stream()
            .filter(|event| event.ordering() == Some(OrderingKind::Popular));

        bus.emit(refreshed(OrderingKind::Trending)).unwrap();
        bus.emit(refreshed(OrderingKind::Popular)).unwrap();

        let event = popular.recv().await.unwrap();
        assert_eq!(event.ordering(), Some(OrderingKind::Popular));
        assert!(popular.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_ahead() {
        let bus = EventBus::new(2);
        let mut stream = bus.stream();

        for id in 0..5 {
            bus.emit(CatalogEvent::RecordCached {
                media_kind: MediaKind::Movie,
                id,
            })
            .unwrap();
        }

        let event = stream.recv().await.unwrap();
        assert_eq!(
            event,
            CatalogEvent::RecordCached {
                media_kind: MediaKind::Movie,
                id: 3
            }
        );
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = EventBus::new(4);
        let mut stream = bus.stream();
        drop(bus);

        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn test_event_serialization() {
        let event = CatalogEvent::ObsoleteDataCleared {
            media_kind: MediaKind::Movie,
            removed: 4,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ObsoleteDataCleared");
        assert_eq!(json["payload"]["removed"], 4);

        let back: CatalogEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_description() {
        let event = CatalogEvent::RefreshFailed {
            media_kind: MediaKind::TvShow,
            ordering: OrderingKind::OnTheAir,
            message: "timed out".to_string(),
        };
        assert_eq!(event.description(), "Refresh of tv on_the_air failed: timed out");
        assert_eq!(event.media_kind(), MediaKind::TvShow);
    }
}
