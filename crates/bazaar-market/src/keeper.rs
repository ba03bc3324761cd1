//! The market keeper.
//!
//! [`MarketKeeper`] is the only entry point hosts call. It owns the injected
//! [`Store`], [`EventSink`] and [`Clock`], hands out ledger views over them,
//! and runs every operation that spans more than one ledger: matching,
//! lease lookup and cascading closure.
//!
//! Operations run to completion without suspending. The keeper assumes its
//! host serializes calls; see [`crate::shared::SharedKeeper`] for hosts that
//! do not.

use bazaar_core::{
    Address, Bid, BidId, BidState, Coin, GroupId, GroupSpec, Lease, LeaseId, Order, OrderId,
    OrderState, keys,
};
use tracing::{debug, info};

use crate::bids::BidLedger;
use crate::clock::Clock;
use crate::error::{EntityKind, MarketError, Result};
use crate::events::{BufferedEventSink, EventSink};
use crate::leases::LeaseLedger;
use crate::ledger::{self, Transition};
use crate::orders::OrderLedger;
use crate::params::MarketParams;
use crate::store::{CacheStore, Store};

/// What a cascading close actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Orders moved to `Closed`.
    pub orders_closed: usize,
    /// Bids moved to `Closed`.
    pub bids_closed: usize,
    /// Leases moved to `Closed`.
    pub leases_closed: usize,
}

impl CascadeReport {
    /// Returns true if the cascade changed nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.orders_closed == 0 && self.bids_closed == 0 && self.leases_closed == 0
    }
}

/// Keeper view used inside [`MarketKeeper::transact`].
pub type TxKeeper<'a, S, E, C> = MarketKeeper<CacheStore<&'a mut S>, BufferedEventSink<&'a E>, &'a C>;

/// Coordinates the order, bid and lease ledgers.
#[derive(Debug)]
pub struct MarketKeeper<S, E, C> {
    store: S,
    events: E,
    clock: C,
    params: MarketParams,
}

impl<S: Store, E: EventSink, C: Clock> MarketKeeper<S, E, C> {
    /// Creates a keeper with default parameters.
    pub fn new(store: S, events: E, clock: C) -> Self {
        Self {
            store,
            events,
            clock,
            params: MarketParams::default(),
        }
    }

    /// Creates a keeper with explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if the parameters fail validation.
    pub fn with_params(store: S, events: E, clock: C, params: MarketParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            events,
            clock,
            params,
        })
    }

    /// Returns the keeper parameters.
    pub const fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the event sink.
    pub const fn events(&self) -> &E {
        &self.events
    }

    /// Returns the clock.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Splits the keeper into its collaborators.
    pub fn into_parts(self) -> (S, E, C) {
        (self.store, self.events, self.clock)
    }

    /// Returns a view over the order ledger.
    pub fn order_ledger(&mut self) -> OrderLedger<'_, S, E> {
        OrderLedger::new(&mut self.store, &self.events, self.params.order_ttl)
    }

    /// Returns a view over the bid ledger.
    pub fn bid_ledger(&mut self) -> BidLedger<'_, S, E> {
        BidLedger::new(&mut self.store, &self.events)
    }

    /// Returns a view over the lease ledger.
    pub fn lease_ledger(&mut self) -> LeaseLedger<'_, S, E> {
        LeaseLedger::new(&mut self.store, &self.events)
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    /// Looks up an order.
    pub fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        ledger::load(&self.store, &keys::order_key(id))
    }

    /// Looks up a bid.
    pub fn get_bid(&self, id: &BidId) -> Result<Option<Bid>> {
        ledger::load(&self.store, &keys::bid_key(id))
    }

    /// Looks up a lease.
    pub fn get_lease(&self, id: &LeaseId) -> Result<Option<Lease>> {
        ledger::load(&self.store, &keys::lease_key(id))
    }

    /// Iterates every order in ID order.
    pub fn iter_orders(&self) -> impl Iterator<Item = Result<Order>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::orders_prefix()))
    }

    /// Iterates the orders of one group in sequence order.
    pub fn iter_group_orders(&self, group: &GroupId) -> impl Iterator<Item = Result<Order>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::group_orders_prefix(group)))
    }

    /// Iterates the bids on one order in provider order.
    pub fn iter_order_bids(&self, order: &OrderId) -> impl Iterator<Item = Result<Bid>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::order_bids_prefix(order)))
    }

    /// Iterates every lease in ID order.
    pub fn iter_leases(&self) -> impl Iterator<Item = Result<Lease>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::leases_prefix()))
    }

    /// Returns the lease of the matched bid on `order`.
    ///
    /// Returns `None` if no bid is matched or the matched bid has no lease
    /// yet. Bids are scanned in key order and the first matched one wins; the
    /// bid ledger refuses a second winner, so there is never more than one.
    pub fn lease_for_order(&self, order: &OrderId) -> Result<Option<Lease>> {
        let mut matched = self
            .iter_order_bids(order)
            .filter(|item| item.as_ref().map_or(true, |bid| bid.state == BidState::Matched));

        let Some(first) = matched.next() else {
            return Ok(None);
        };
        let bid = first?;
        debug_assert!(
            matched.next().is_none(),
            "order {order} has more than one matched bid"
        );
        self.get_lease(&LeaseId::from(bid.id))
    }

    /// Returns the IDs of open orders whose `start_at` height has been
    /// reached. An external sweeper polls this and closes them.
    pub fn expired_orders(&self) -> Result<Vec<OrderId>> {
        let height = self.clock.current_height();
        let mut expired = Vec::new();
        for item in self.iter_orders() {
            let order = item?;
            if order.is_expired(height) {
                expired.push(order.id);
            }
        }
        Ok(expired)
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    /// Opens the next order for `group` at the current height.
    pub fn create_order(&mut self, group: GroupId, spec: GroupSpec) -> Result<Order> {
        let height = self.clock.current_height();
        self.order_ledger().create(group, spec, height)
    }

    /// Places a bid from `provider` on an open order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order, `OrderNotOpen` if the order
    /// is matched or closed, and `DuplicateEntity` if the provider already
    /// bid on it.
    pub fn create_bid(&mut self, order: OrderId, provider: Address, price: Coin) -> Result<Bid> {
        let stored = self.require_order(&order)?;
        if stored.state != OrderState::Open {
            return Err(MarketError::OrderNotOpen {
                id: order,
                state: stored.state,
            });
        }
        self.bid_ledger().create(order, provider, price)
    }

    /// Creates the lease for a bid the caller has already marked matched.
    ///
    /// The stored bid is authoritative; the lease takes its price.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid, `BidNotMatched` if it is not
    /// matched, and `DuplicateEntity` if the lease already exists.
    pub fn create_lease(&mut self, bid: &Bid) -> Result<Lease> {
        self.lease_ledger().create(bid)
    }

    /// Matches an open order to its cheapest open bid.
    ///
    /// The winning bid is the lowest `price.amount`; ties go to the first bid
    /// in key order. Amounts are compared as plain numbers whatever their
    /// `denom`: a host that accepts bids in several denominations must
    /// normalize them before matching. The order and the winner become
    /// `Matched`, every other open bid becomes `Lost`, and the lease is
    /// created. Returns `None`, changing nothing, when the order has no open
    /// bids.
    ///
    /// Every precondition is checked before the first write, so an error
    /// leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order, `OrderNotOpen` if it is not
    /// open, and `OrderAlreadyMatched` if one of its bids was already marked
    /// matched.
    pub fn match_order(&mut self, order_id: &OrderId) -> Result<Option<Lease>> {
        let mut order = self.require_order(order_id)?;
        if order.state != OrderState::Open {
            return Err(MarketError::OrderNotOpen {
                id: order.id,
                state: order.state,
            });
        }

        let mut bids: Vec<Bid> = self.iter_order_bids(order_id).collect::<Result<_>>()?;
        if let Some(winner) = bids.iter().find(|bid| bid.state == BidState::Matched) {
            return Err(MarketError::OrderAlreadyMatched {
                order: order.id,
                winner: winner.id,
            });
        }
        let Some(winner) = bids
            .iter()
            .enumerate()
            .filter(|(_, bid)| bid.state == BidState::Open)
            .min_by_key(|(_, bid)| bid.price.amount)
            .map(|(index, _)| index)
        else {
            debug!(order = %order_id, "no open bids to match");
            return Ok(None);
        };

        self.order_ledger().mark_matched(&mut order)?;
        self.bid_ledger().mark_matched(&mut bids[winner])?;
        for (index, bid) in bids.iter_mut().enumerate() {
            if index != winner && bid.state == BidState::Open {
                self.bid_ledger().mark_lost(bid)?;
            }
        }
        let lease = self.lease_ledger().create(&bids[winner])?;

        info!(
            order = %order_id,
            lease = %lease.id,
            price = %lease.price,
            bids = bids.len(),
            "matched order"
        );
        Ok(Some(lease))
    }

    // ---------------------------------------------------------------------
    // Closure
    // ---------------------------------------------------------------------

    /// Closes every order of a group, every bid on those orders, and every
    /// lease awarded from those bids.
    ///
    /// Traversal is layered: the IDs of one layer are collected before any
    /// of them is written. Running it again finds everything terminal and
    /// returns an empty report without emitting events.
    pub fn close_group(&mut self, group: &GroupId) -> Result<CascadeReport> {
        let orders: Vec<Order> = self.iter_group_orders(group).collect::<Result<_>>()?;

        let mut report = CascadeReport::default();
        for order in orders {
            self.close_order_tree(order, &mut report)?;
        }

        debug!(
            group = %group,
            orders = report.orders_closed,
            bids = report.bids_closed,
            leases = report.leases_closed,
            "closed group"
        );
        Ok(report)
    }

    /// Closes one order together with its bids and leases.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order.
    pub fn close_order(&mut self, id: &OrderId) -> Result<CascadeReport> {
        let order = self.require_order(id)?;
        let mut report = CascadeReport::default();
        self.close_order_tree(order, &mut report)?;
        Ok(report)
    }

    /// Closes a single bid. Its lease, if any, is not touched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid.
    pub fn close_bid(&mut self, id: &BidId) -> Result<Transition> {
        let mut bid = self.require_bid(id)?;
        self.bid_ledger().mark_closed(&mut bid)
    }

    /// Closes a single lease.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lease.
    pub fn close_lease(&mut self, id: &LeaseId) -> Result<Transition> {
        let mut lease = self.require_lease(id)?;
        self.lease_ledger().mark_closed(&mut lease)
    }

    /// Flags a lease whose tenant can no longer pay.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown lease.
    pub fn mark_insufficient_funds(&mut self, id: &LeaseId) -> Result<Transition> {
        let mut lease = self.require_lease(id)?;
        self.lease_ledger().mark_insufficient_funds(&mut lease)
    }

    fn close_order_tree(&mut self, mut order: Order, report: &mut CascadeReport) -> Result<()> {
        if self.order_ledger().mark_closed(&mut order)?.is_applied() {
            report.orders_closed += 1;
        }

        let bids: Vec<Bid> = self.iter_order_bids(&order.id).collect::<Result<_>>()?;
        for mut bid in bids {
            if self.bid_ledger().mark_closed(&mut bid)?.is_applied() {
                report.bids_closed += 1;
            }
            if let Some(mut lease) = self.get_lease(&LeaseId::from(bid.id))? {
                if self.lease_ledger().mark_closed(&mut lease)?.is_applied() {
                    report.leases_closed += 1;
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    /// Runs `f` as one atomic unit.
    ///
    /// Writes are buffered in a [`CacheStore`] and events in a
    /// [`BufferedEventSink`]. If `f` returns `Ok`, both are applied in order;
    /// if it returns `Err`, neither is, and the error is passed through.
    pub fn transact<'s, T, F>(&'s mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TxKeeper<'s, S, E, C>) -> Result<T>,
    {
        let mut tx = MarketKeeper {
            store: CacheStore::new(&mut self.store),
            events: BufferedEventSink::new(&self.events),
            clock: &self.clock,
            params: self.params.clone(),
        };

        match f(&mut tx) {
            Ok(value) => {
                let MarketKeeper { store, events, .. } = tx;
                debug!(
                    writes = store.pending_writes(),
                    events = events.pending(),
                    "committing transaction"
                );
                store.commit();
                events.flush();
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "discarding transaction");
                Err(e)
            }
        }
    }

    fn require_order(&self, id: &OrderId) -> Result<Order> {
        self.get_order(id)?.ok_or_else(|| MarketError::NotFound {
            kind: EntityKind::Order,
            id: id.to_string(),
        })
    }

    fn require_bid(&self, id: &BidId) -> Result<Bid> {
        self.get_bid(id)?.ok_or_else(|| MarketError::NotFound {
            kind: EntityKind::Bid,
            id: id.to_string(),
        })
    }

    fn require_lease(&self, id: &LeaseId) -> Result<Lease> {
        self.get_lease(id)?.ok_or_else(|| MarketError::NotFound {
            kind: EntityKind::Lease,
            id: id.to_string(),
        })
    }
}
