//! Error types for bazaar-market.

use std::fmt;

use bazaar_core::{BidId, BidState, CoreError, GroupId, OrderId, OrderState};
use thiserror::Error;

/// The kind of ledger entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// An order.
    Order,
    /// A bid.
    Bid,
    /// A lease.
    Lease,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "order"),
            Self::Bid => write!(f, "bid"),
            Self::Lease => write!(f, "lease"),
        }
    }
}

/// Errors that can occur in market keeper operations.
///
/// Lookups report absence as `None` rather than [`MarketError::NotFound`];
/// the latter is only returned by operations that act on an ID.
#[derive(Debug, Error)]
pub enum MarketError {
    /// The referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity.
        kind: EntityKind,
        /// Display form of the identifier.
        id: String,
    },

    /// A create targeted a key that is already occupied.
    #[error("{kind} already exists: {id}")]
    DuplicateEntity {
        /// Kind of entity.
        kind: EntityKind,
        /// Display form of the identifier.
        id: String,
    },

    /// The requested state change is not part of the entity's state machine.
    #[error("invalid {kind} state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Kind of entity.
        kind: EntityKind,
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// Bids are only accepted on open orders.
    #[error("order {id} is not open: {state}")]
    OrderNotOpen {
        /// The order.
        id: OrderId,
        /// Its current state.
        state: OrderState,
    },

    /// Another bid on the order already won.
    #[error("order {order} already matched to bid {winner}")]
    OrderAlreadyMatched {
        /// The order.
        order: OrderId,
        /// The bid holding the match.
        winner: BidId,
    },

    /// Leases are only created from matched bids.
    #[error("bid {id} is not matched: {state}")]
    BidNotMatched {
        /// The bid.
        id: BidId,
        /// Its current state.
        state: BidState,
    },

    /// A group has used every order sequence number.
    #[error("order sequence exhausted for group {0}")]
    SequenceExhausted(GroupId),

    /// `height + order_ttl` does not fit a block height.
    #[error("order start height overflows: height {height} + ttl {ttl}")]
    HeightOverflow {
        /// Current height.
        height: u64,
        /// Configured order TTL.
        ttl: u64,
    },

    /// The current height moved backwards.
    #[error("clock moved backwards: {current} -> {requested}")]
    ClockRegression {
        /// Height before the update.
        current: u64,
        /// Rejected height.
        requested: u64,
    },

    /// Stored bytes could not be encoded or decoded. Unrecoverable: the
    /// enclosing transaction must be discarded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Market parameters are invalid.
    #[error("invalid market params: {0}")]
    InvalidParams(String),
}

impl MarketError {
    pub(crate) fn transition(kind: EntityKind, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::InvalidStateTransition {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<CoreError> for MarketError {
    fn from(e: CoreError) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for market operations.
pub type Result<T> = std::result::Result<T, MarketError>;
