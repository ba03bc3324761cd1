//! Persisted market entities.
//!
//! An [`Order`] requests capacity for a group, providers answer with [`Bid`]s,
//! and the matched bid becomes a [`Lease`]. Entities are never deleted; they
//! are retired by moving to a terminal state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{BidId, GroupId, LeaseId, OrderId};

/// A token amount in a named denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination, e.g. `"ubzr"`.
    pub denom: String,
    /// Amount in the smallest unit of `denom`.
    pub amount: u64,
}

impl Coin {
    /// Creates a coin.
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A key/value attribute a provider must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub key: String,
    /// Required value.
    pub value: String,
}

/// Compute resources of a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceUnit {
    /// CPU in millicores.
    pub cpu: u32,
    /// Memory in bytes.
    pub memory: u64,
    /// Storage in bytes.
    pub storage: u64,
}

/// A number of identical units and the price offered per unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceGroup {
    /// The unit being requested.
    pub unit: ResourceUnit,
    /// Number of units.
    pub count: u32,
    /// Maximum price per unit.
    pub price: Coin,
}

/// Capacity requirements of a group.
///
/// Opaque to the keeper: stored with the order and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Human readable group name.
    pub name: String,
    /// Provider attributes the group requires.
    pub requirements: Vec<Attribute>,
    /// Resources requested.
    pub resources: Vec<ResourceGroup>,
}

/// Lifecycle state of an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderState {
    /// Accepting bids.
    #[default]
    Open,
    /// A bid has been matched and a lease created.
    Matched,
    /// Retired.
    Closed,
}

impl OrderState {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Matched => write!(f, "Matched"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Lifecycle state of a [`Bid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BidState {
    /// Awaiting the matching decision.
    #[default]
    Open,
    /// Won the order; a lease exists under the same ID.
    Matched,
    /// Another bid won the order.
    Lost,
    /// Retired.
    Closed,
}

impl BidState {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Lost | Self::Closed)
    }
}

impl fmt::Display for BidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Matched => write!(f, "Matched"),
            Self::Lost => write!(f, "Lost"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Lifecycle state of a [`Lease`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeaseState {
    /// Running and paid for.
    #[default]
    Active,
    /// The tenant ran out of funds. Neither closable nor re-flaggable.
    InsufficientFunds,
    /// Retired.
    Closed,
}

impl LeaseState {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::InsufficientFunds | Self::Closed)
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::InsufficientFunds => write!(f, "InsufficientFunds"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// A request for capacity on behalf of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub id: OrderId,
    /// Requested capacity.
    pub spec: GroupSpec,
    /// Current state.
    pub state: OrderState,
    /// Height at which the order stops being eligible for matching.
    pub start_at: u64,
}

impl Order {
    /// Returns the group this order belongs to.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.id.group
    }

    /// Returns true if the order is still open at or past its `start_at`
    /// height and should be swept.
    #[must_use]
    pub fn is_expired(&self, height: u64) -> bool {
        self.state == OrderState::Open && height >= self.start_at
    }
}

/// A provider's offer against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid identifier.
    pub id: BidId,
    /// Offered price.
    pub price: Coin,
    /// Current state.
    pub state: BidState,
}

impl Bid {
    /// Returns the order this bid is placed on.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.id.order
    }
}

/// The award produced by matching a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Lease identifier, equal to the winning bid's.
    pub id: LeaseId,
    /// Agreed price, copied from the bid.
    pub price: Coin,
    /// Current state.
    pub state: LeaseState,
}

impl Lease {
    /// Returns the order this lease fulfils.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.id.0.order
    }
}
