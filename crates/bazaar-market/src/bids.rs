//! Bid ledger.
//!
//! A provider holds at most one bid per order. Bids sit under their order's
//! key, so the bids of an order form one contiguous prefix range.

use bazaar_core::{Address, Bid, BidId, BidState, Coin, OrderId, keys};
use tracing::debug;

use crate::error::{EntityKind, MarketError, Result};
use crate::events::{EventSink, MarketEvent};
use crate::ledger::{self, Transition};
use crate::store::Store;

/// Read/write view over the bids in a store.
pub struct BidLedger<'a, S, E> {
    store: &'a mut S,
    events: &'a E,
}

impl<'a, S: Store, E: EventSink> BidLedger<'a, S, E> {
    /// Creates a view.
    pub fn new(store: &'a mut S, events: &'a E) -> Self {
        Self { store, events }
    }

    /// Places an open bid from `provider` on `order`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntity` if the provider already bid on the order,
    /// whatever that bid's state. Bids are not revised in place.
    pub fn create(&mut self, order: OrderId, provider: Address, price: Coin) -> Result<Bid> {
        let bid = Bid {
            id: BidId::new(order, provider),
            price,
            state: BidState::Open,
        };

        let key = keys::bid_key(&bid.id);
        if self.store.has(&key) {
            return Err(MarketError::DuplicateEntity {
                kind: EntityKind::Bid,
                id: bid.id.to_string(),
            });
        }
        ledger::save(&mut *self.store, key, &bid)?;

        debug!(bid = %bid.id, price = %bid.price, "created bid");
        self.events.emit(MarketEvent::BidCreated { id: bid.id });
        Ok(bid)
    }

    /// Looks up a bid.
    pub fn get(&self, id: &BidId) -> Result<Option<Bid>> {
        ledger::load(&*self.store, &keys::bid_key(id))
    }

    /// Iterates every bid in ID order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Bid>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::bids_prefix()))
    }

    /// Iterates the bids on one order in provider order.
    pub fn iter_order(&self, order: &OrderId) -> impl Iterator<Item = Result<Bid>> + '_ {
        ledger::decode_all(self.store.iter_prefix(&keys::order_bids_prefix(order)))
    }

    /// Returns the matched bid on `order`, if any.
    pub fn matched_on(&self, order: &OrderId) -> Result<Option<Bid>> {
        for item in self.iter_order(order) {
            let bid = item?;
            if bid.state == BidState::Matched {
                return Ok(Some(bid));
            }
        }
        Ok(None)
    }

    /// Marks an open bid as the winner of its order.
    ///
    /// The transition is decided on the stored record; `bid` is refreshed
    /// from it. Nothing but the state is written.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid, `InvalidStateTransition` for a
    /// lost or closed bid, and `OrderAlreadyMatched` if another bid on the
    /// order already won.
    pub fn mark_matched(&mut self, bid: &mut Bid) -> Result<Transition> {
        let mut stored = self.stored(&bid.id)?;
        let transition = match stored.state {
            BidState::Open => {
                if let Some(winner) = self.matched_on(&stored.order_id())? {
                    return Err(MarketError::OrderAlreadyMatched {
                        order: stored.order_id(),
                        winner: winner.id,
                    });
                }
                stored.state = BidState::Matched;
                self.update(&stored)?;
                debug!(bid = %stored.id, "bid matched");
                Transition::Applied
            }
            BidState::Matched => Transition::Unchanged,
            BidState::Lost | BidState::Closed => {
                return Err(MarketError::transition(
                    EntityKind::Bid,
                    stored.state,
                    BidState::Matched,
                ));
            }
        };
        *bid = stored;
        Ok(transition)
    }

    /// Marks an open bid as lost.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid and `InvalidStateTransition`
    /// for a matched or closed bid.
    pub fn mark_lost(&mut self, bid: &mut Bid) -> Result<Transition> {
        let mut stored = self.stored(&bid.id)?;
        let transition = match stored.state {
            BidState::Open => {
                stored.state = BidState::Lost;
                self.update(&stored)?;
                debug!(bid = %stored.id, "bid lost");
                Transition::Applied
            }
            BidState::Lost => Transition::Unchanged,
            BidState::Matched | BidState::Closed => {
                return Err(MarketError::transition(
                    EntityKind::Bid,
                    stored.state,
                    BidState::Lost,
                ));
            }
        };
        *bid = stored;
        Ok(transition)
    }

    /// Closes a bid.
    ///
    /// Closed and lost bids are left untouched: a lost bid stays lost.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bid.
    pub fn mark_closed(&mut self, bid: &mut Bid) -> Result<Transition> {
        let mut stored = self.stored(&bid.id)?;
        let transition = if matches!(stored.state, BidState::Closed | BidState::Lost) {
            Transition::Unchanged
        } else {
            stored.state = BidState::Closed;
            self.update(&stored)?;
            debug!(bid = %stored.id, "bid closed");
            self.events.emit(MarketEvent::BidClosed { id: stored.id });
            Transition::Applied
        };
        *bid = stored;
        Ok(transition)
    }

    fn stored(&self, id: &BidId) -> Result<Bid> {
        self.get(id)?.ok_or_else(|| MarketError::NotFound {
            kind: EntityKind::Bid,
            id: id.to_string(),
        })
    }

    fn update(&mut self, bid: &Bid) -> Result<()> {
        ledger::save(&mut *self.store, keys::bid_key(&bid.id), bid)
    }
}
