//! Order ledger.
//!
//! Orders are keyed by [`OrderId`]. Each group has a persisted counter holding
//! the last sequence handed out, so a new order never reuses the sequence of
//! an earlier one, closed or not, and allocation does not scan the table.

use bazaar_core::{GroupId, GroupSpec, Order, OrderId, OrderState, keys};
use tracing::{debug, info};

use crate::error::{EntityKind, MarketError, Result};
use crate::events::{EventSink, MarketEvent};
use crate::ledger::{self, Transition};
use crate::store::Store;

/// Read/write view over the orders in a store.
pub struct OrderLedger<'a, S, E> {
    store: &'a mut S,
    events: &'a E,
    order_ttl: u64,
}

impl<'a, S: Store, E: EventSink> OrderLedger<'a, S, E> {
    /// Creates a view. New orders start `order_ttl` blocks after creation.
    pub fn new(store: &'a mut S, events: &'a E, order_ttl: u64) -> Self {
        Self {
            store,
            events,
            order_ttl,
        }
    }

    /// Creates the next order of `group` at `height`.
    ///
    /// # Errors
    ///
    /// Fails with `HeightOverflow` if `height + order_ttl` overflows,
    /// `SequenceExhausted` if the group has used every sequence, and
    /// `DuplicateEntity` if a record already sits under the allocated ID.
    pub fn create(&mut self, group: GroupId, spec: GroupSpec, height: u64) -> Result<Order> {
        let start_at = height
            .checked_add(self.order_ttl)
            .ok_or(MarketError::HeightOverflow {
                height,
                ttl: self.order_ttl,
            })?;

        let oseq = self
            .last_sequence(&group)?
            .checked_add(1)
            .ok_or(MarketError::SequenceExhausted(group))?;

        let order = Order {
            id: OrderId::new(group, oseq),
            spec,
            state: OrderState::Open,
            start_at,
        };

        let key = keys::order_key(&order.id);
        if self.store.has(&key) {
            return Err(MarketError::DuplicateEntity {
                kind: EntityKind::Order,
                id: order.id.to_string(),
            });
        }

        let bytes = bazaar_core::codec::encode(&order)?;
        self.store
            .set(keys::order_seq_key(&group), oseq.to_be_bytes().to_vec());
        self.store.set(key, bytes);

        info!(order = %order.id, start_at, "created order");
        self.events.emit(MarketEvent::OrderCreated { id: order.id });
        Ok(order)
    }

    /// Returns the last sequence allocated for `group`, or 0 if none.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the stored counter is corrupt.
    pub fn last_sequence(&self, group: &GroupId) -> Result<u32> {
        let Some(bytes) = self.store.get(&keys::order_seq_key(group)) else {
            return Ok(0);
        };
        let raw: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
            MarketError::Serialization(format!(
                "order sequence for group {group}: expected 4 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(u32::from_be_bytes(raw))
    }

    /// Looks up an order.
    pub fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        ledger::load(&*self.store, &keys::order_key(id))
    }

    /// Iterates every order in ID order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Order>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::orders_prefix()))
    }

    /// Iterates the orders of one group in sequence order.
    pub fn iter_group(&self, group: &GroupId) -> impl Iterator<Item = Result<Order>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::group_orders_prefix(group)))
    }

    /// Marks an open order as matched.
    ///
    /// The transition is decided on the stored record; `order` is refreshed
    /// from it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order and `InvalidStateTransition`
    /// for a closed one.
    pub fn mark_matched(&mut self, order: &mut Order) -> Result<Transition> {
        let mut stored = self.stored(&order.id)?;
        let transition = match stored.state {
            OrderState::Open => {
                stored.state = OrderState::Matched;
                self.update(&stored)?;
                debug!(order = %stored.id, "order matched");
                Transition::Applied
            }
            OrderState::Matched => Transition::Unchanged,
            OrderState::Closed => {
                return Err(MarketError::transition(
                    EntityKind::Order,
                    stored.state,
                    OrderState::Matched,
                ));
            }
        };
        *order = stored;
        Ok(transition)
    }

    /// Closes an order. A closed order is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order.
    pub fn mark_closed(&mut self, order: &mut Order) -> Result<Transition> {
        let mut stored = self.stored(&order.id)?;
        let transition = if stored.state == OrderState::Closed {
            Transition::Unchanged
        } else {
            stored.state = OrderState::Closed;
            self.update(&stored)?;
            debug!(order = %stored.id, "order closed");
            self.events.emit(MarketEvent::OrderClosed { id: stored.id });
            Transition::Applied
        };
        *order = stored;
        Ok(transition)
    }

    fn stored(&self, id: &OrderId) -> Result<Order> {
        self.get(id)?.ok_or_else(|| MarketError::NotFound {
            kind: EntityKind::Order,
            id: id.to_string(),
        })
    }

    fn update(&mut self, order: &Order) -> Result<()> {
        ledger::save(&mut *self.store, keys::order_key(&order.id), order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEventSink;
    use crate::store::MemoryStore;
    use bazaar_core::{ADDRESS_LEN, Address};
    use test_case::test_case;

    fn group(gseq: u32) -> GroupId {
        GroupId::new(Address::new([1; ADDRESS_LEN]), 100, gseq)
    }

    #[test]
    fn create_allocates_increasing_sequences() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);

        let first = orders.create(group(1), GroupSpec::default(), 10).unwrap();
        let second = orders.create(group(1), GroupSpec::default(), 11).unwrap();
        let other = orders.create(group(2), GroupSpec::default(), 11).unwrap();

        assert_eq!(first.id.oseq, 1);
        assert_eq!(second.id.oseq, 2);
        assert_eq!(other.id.oseq, 1);
        assert_eq!(first.start_at, 15);
        assert_eq!(first.state, OrderState::Open);
        assert_eq!(orders.last_sequence(&group(1)).unwrap(), 2);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn closed_orders_keep_their_sequence() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);

        let mut first = orders.create(group(1), GroupSpec::default(), 0).unwrap();
        assert!(orders.mark_closed(&mut first).unwrap().is_applied());
        let second = orders.create(group(1), GroupSpec::default(), 0).unwrap();

        assert_eq!(second.id.oseq, 2);
    }

    #[test]
    fn create_rejects_existing_record() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let order = Order {
            id: OrderId::new(group(1), 1),
            spec: GroupSpec::default(),
            state: OrderState::Open,
            start_at: 0,
        };
        ledger::save(&mut store, keys::order_key(&order.id), &order).unwrap();

        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        let err = orders.create(group(1), GroupSpec::default(), 0).unwrap_err();

        assert!(matches!(err, MarketError::DuplicateEntity { kind: EntityKind::Order, .. }));
        assert!(sink.is_empty());
        assert_eq!(orders.last_sequence(&group(1)).unwrap(), 0);
    }

    #[test]
    fn create_rejects_start_height_overflow() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);

        let err = orders
            .create(group(1), GroupSpec::default(), u64::MAX - 2)
            .unwrap_err();
        assert!(matches!(err, MarketError::HeightOverflow { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_exhausted_sequence() {
        let mut store = MemoryStore::new();
        store.set(keys::order_seq_key(&group(1)), u32::MAX.to_be_bytes().to_vec());
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);

        let err = orders.create(group(1), GroupSpec::default(), 0).unwrap_err();
        assert!(matches!(err, MarketError::SequenceExhausted(_)));
    }

    #[test]
    fn corrupt_sequence_counter_is_reported() {
        let mut store = MemoryStore::new();
        store.set(keys::order_seq_key(&group(1)), vec![1, 2]);
        let sink = RecordingEventSink::new();
        let orders = OrderLedger::new(&mut store, &sink, 5);

        assert!(matches!(
            orders.last_sequence(&group(1)),
            Err(MarketError::Serialization(_))
        ));
    }

    #[test]
    fn get_reports_absence() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let orders = OrderLedger::new(&mut store, &sink, 5);
        assert_eq!(orders.get(&OrderId::new(group(1), 1)).unwrap(), None);
    }

    #[test]
    fn iter_group_is_ordered_and_scoped() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        for _ in 0..3 {
            orders.create(group(1), GroupSpec::default(), 0).unwrap();
        }
        orders.create(group(2), GroupSpec::default(), 0).unwrap();

        let oseqs: Vec<u32> = orders
            .iter_group(&group(1))
            .map(|o| o.unwrap().id.oseq)
            .collect();
        assert_eq!(oseqs, vec![1, 2, 3]);
        assert_eq!(orders.iter().count(), 4);

        // Early exit leaves the rest unvisited.
        let found = orders
            .iter()
            .map(Result::unwrap)
            .find(|o| o.id.oseq == 2)
            .unwrap();
        assert_eq!(found.id.group, group(1));
    }

    #[test_case(OrderState::Open, Some(Transition::Applied) ; "open to matched")]
    #[test_case(OrderState::Matched, Some(Transition::Unchanged) ; "matched again")]
    #[test_case(OrderState::Closed, None ; "closed is rejected")]
    fn mark_matched_transitions(from: OrderState, expected: Option<Transition>) {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        let mut order = orders.create(group(1), GroupSpec::default(), 0).unwrap();
        order.state = from;
        ledger::save(&mut *orders.store, keys::order_key(&order.id), &order).unwrap();

        let result = orders.mark_matched(&mut order);
        match expected {
            Some(t) => assert_eq!(result.unwrap(), t),
            None => assert!(matches!(
                result,
                Err(MarketError::InvalidStateTransition { kind: EntityKind::Order, .. })
            )),
        }
    }

    #[test]
    fn mark_closed_is_idempotent() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        let mut order = orders.create(group(1), GroupSpec::default(), 0).unwrap();
        orders.mark_matched(&mut order).unwrap();

        assert_eq!(orders.mark_closed(&mut order).unwrap(), Transition::Applied);
        assert_eq!(orders.mark_closed(&mut order).unwrap(), Transition::Unchanged);

        let stored = orders.get(&order.id).unwrap().unwrap();
        assert_eq!(stored.state, OrderState::Closed);
        let closes = sink
            .events()
            .iter()
            .filter(|e| matches!(e, MarketEvent::OrderClosed { .. }))
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn stale_copy_cannot_reopen_closed_order() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        let mut order = orders.create(group(1), GroupSpec::default(), 0).unwrap();
        let mut stale = order.clone();
        stale.start_at = 9_999;

        orders.mark_closed(&mut order).unwrap();
        sink.drain();

        assert!(matches!(
            orders.mark_matched(&mut stale),
            Err(MarketError::InvalidStateTransition { kind: EntityKind::Order, .. })
        ));
        assert_eq!(orders.mark_closed(&mut stale).unwrap(), Transition::Unchanged);
        assert_eq!(stale, order);
        assert!(sink.is_empty());

        let stored = orders.get(&order.id).unwrap().unwrap();
        assert_eq!(stored.state, OrderState::Closed);
        assert_eq!(stored.start_at, 5);
    }

    #[test]
    fn mutators_require_stored_order() {
        let mut store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let mut orders = OrderLedger::new(&mut store, &sink, 5);
        let mut ghost = Order {
            id: OrderId::new(group(1), 1),
            spec: GroupSpec::default(),
            state: OrderState::Open,
            start_at: 0,
        };

        assert!(matches!(
            orders.mark_matched(&mut ghost),
            Err(MarketError::NotFound { kind: EntityKind::Order, .. })
        ));
        assert!(matches!(orders.mark_closed(&mut ghost), Err(MarketError::NotFound { .. })));
        assert!(sink.is_empty());
    }
}
