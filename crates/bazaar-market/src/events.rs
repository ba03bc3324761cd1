//! Market events and the sinks that receive them.
//!
//! Every state-changing ledger write emits exactly one [`MarketEvent`]
//! through an [`EventSink`]. Idempotent no-ops emit nothing.

use std::fmt;
use std::sync::Arc;

use bazaar_core::{BidId, LeaseId, OrderId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A domain event emitted by the keeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MarketEvent {
    /// An order was created.
    OrderCreated {
        /// The new order.
        id: OrderId,
    },
    /// An order was closed.
    OrderClosed {
        /// The closed order.
        id: OrderId,
    },
    /// A bid was placed.
    BidCreated {
        /// The new bid.
        id: BidId,
    },
    /// A bid was closed.
    BidClosed {
        /// The closed bid.
        id: BidId,
    },
    /// A lease was created from a matched bid.
    LeaseCreated {
        /// The new lease.
        id: LeaseId,
    },
    /// A lease was closed, or flagged for insufficient funds.
    ///
    /// Both transitions share this event so existing subscribers keep
    /// working; inspect the lease state to tell them apart.
    LeaseClosed {
        /// The affected lease.
        id: LeaseId,
    },
}

impl MarketEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order-created",
            Self::OrderClosed { .. } => "order-closed",
            Self::BidCreated { .. } => "bid-created",
            Self::BidClosed { .. } => "bid-closed",
            Self::LeaseCreated { .. } => "lease-created",
            Self::LeaseClosed { .. } => "lease-closed",
        }
    }

    /// Returns the display form of the affected entity's identifier.
    #[must_use]
    pub fn entity_id(&self) -> String {
        match self {
            Self::OrderCreated { id } | Self::OrderClosed { id } => id.to_string(),
            Self::BidCreated { id } | Self::BidClosed { id } => id.to_string(),
            Self::LeaseCreated { id } | Self::LeaseClosed { id } => id.to_string(),
        }
    }
}

impl fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.entity_id())
    }
}

/// Receiver of market events.
pub trait EventSink: Send + Sync {
    /// Emits one event.
    fn emit(&self, event: MarketEvent);
}

impl<E: EventSink + ?Sized> EventSink for &E {
    fn emit(&self, event: MarketEvent) {
        (**self).emit(event);
    }
}

impl<E: EventSink + ?Sized> EventSink for Arc<E> {
    fn emit(&self, event: MarketEvent) {
        (**self).emit(event);
    }
}

/// Event sink that writes every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// Creates a tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: MarketEvent) {
        tracing::info!(
            target: "bazaar_market::events",
            kind = event.kind(),
            id = %event.entity_id(),
            "market event"
        );
    }
}

/// Event sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<MarketEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Removes and returns every recorded event.
    pub fn drain(&self) -> Vec<MarketEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: MarketEvent) {
        self.events.lock().push(event);
    }
}

/// Event sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: MarketEvent) {}
}

/// Holds events back until the enclosing transaction commits.
#[derive(Debug)]
pub struct BufferedEventSink<E> {
    inner: E,
    pending: Mutex<Vec<MarketEvent>>,
}

impl<E: EventSink> BufferedEventSink<E> {
    /// Creates a buffer in front of `inner`.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of events waiting to be flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Forwards every buffered event to the inner sink, in emission order.
    pub fn flush(self) -> E {
        for event in self.pending.into_inner() {
            self.inner.emit(event);
        }
        self.inner
    }
}

impl<E: EventSink> EventSink for BufferedEventSink<E> {
    fn emit(&self, event: MarketEvent) {
        self.pending.lock().push(event);
    }
}
