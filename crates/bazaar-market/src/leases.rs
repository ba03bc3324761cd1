//! Lease ledger.
//!
//! A lease is stored under the ID of the bid it was created from.
//! `InsufficientFunds` absorbs both further flagging and closing: once a
//! tenant runs dry the lease stays in that state.

use bazaar_core::{Bid, BidState, Lease, LeaseId, LeaseState, OrderId, keys};
use tracing::info;

use crate::error::{EntityKind, MarketError, Result};
use crate::events::{EventSink, MarketEvent};
use crate::ledger::{self, Transition};
use crate::store::Store;

/// Read/write view over the leases in a store.
pub struct LeaseLedger<'a, S, E> {
    store: &'a mut S,
    events: &'a E,
}

impl<'a, S: Store, E: EventSink> LeaseLedger<'a, S, E> {
    /// Creates a view.
    pub fn new(store: &'a mut S, events: &'a E) -> Self {
        Self { store, events }
    }

    /// Creates an active lease from the stored record of `bid`, at its
    /// stored price.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid, `BidNotMatched` if the stored
    /// bid is not matched, and `DuplicateEntity` if a lease already exists
    /// for the bid.
    pub fn create(&mut self, bid: &Bid) -> Result<Lease> {
        let stored: Bid = ledger::load(&*self.store, &keys::bid_key(&bid.id))?.ok_or_else(|| {
            MarketError::NotFound {
                kind: EntityKind::Bid,
                id: bid.id.to_string(),
            }
        })?;
        if stored.state != BidState::Matched {
            return Err(MarketError::BidNotMatched {
                id: stored.id,
                state: stored.state,
            });
        }

        let lease = Lease {
            id: LeaseId::from(stored.id),
            price: stored.price,
            state: LeaseState::Active,
        };

        let key = keys::lease_key(&lease.id);
        if self.store.has(&key) {
            return Err(MarketError::DuplicateEntity {
                kind: EntityKind::Lease,
                id: lease.id.to_string(),
            });
        }
        ledger::save(&mut *self.store, key, &lease)?;

        info!(lease = %lease.id, price = %lease.price, "created lease");
        self.events.emit(MarketEvent::LeaseCreated { id: lease.id });
        Ok(lease)
    }

    /// Looks up a lease.
    pub fn get(&self, id: &LeaseId) -> Result<Option<Lease>> {
        ledger::load(&*self.store, &keys::lease_key(id))
    }

    /// Iterates every lease in ID order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Lease>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::leases_prefix()))
    }

    /// Iterates the leases awarded on one order.
    pub fn iter_order(&self, order: &OrderId) -> impl Iterator<Item = Result<Lease>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::order_leases_prefix(order)))
    }

    /// Flags an active lease as underfunded.
    ///
    /// Emits `LeaseClosed`, the same event as a regular close. The
    /// transition is decided on the stored record; `lease` is refreshed
    /// from it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lease.
    pub fn mark_insufficient_funds(&mut self, lease: &mut Lease) -> Result<Transition> {
        self.finish(lease, LeaseState::InsufficientFunds)
    }

    /// Closes an active lease. Closed and underfunded leases are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lease.
    pub fn mark_closed(&mut self, lease: &mut Lease) -> Result<Transition> {
        self.finish(lease, LeaseState::Closed)
    }

    fn finish(&mut self, lease: &mut Lease, to: LeaseState) -> Result<Transition> {
        let mut stored: Lease = ledger::load(&*self.store, &keys::lease_key(&lease.id))?
            .ok_or_else(|| MarketError::NotFound {
                kind: EntityKind::Lease,
                id: lease.id.to_string(),
            })?;
        let transition = if stored.state.is_terminal() {
            Transition::Unchanged
        } else {
            stored.state = to;
            ledger::save(&mut *self.store, keys::lease_key(&stored.id), &stored)?;
            info!(lease = %stored.id, state = %to, "finished lease");
            self.events.emit(MarketEvent::LeaseClosed { id: stored.id });
            Transition::Applied
        };
        *lease = stored;
        Ok(transition)
    }
}
