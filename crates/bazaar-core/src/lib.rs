//! # bazaar-core
//!
//! Primitives for the Bazaar compute marketplace keeper.
//!
//! This crate provides:
//!
//! - [`GroupId`], [`OrderId`], [`BidId`], [`LeaseId`]: hierarchical identifiers
//! - [`keys`]: order-preserving binary ledger keys for those identifiers
//! - [`Order`], [`Bid`], [`Lease`]: the persisted market entities
//! - [`codec`]: deterministic encoding of entities for the replicated store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod id;
pub mod keys;
pub mod types;

pub use error::{CoreError, Result};
pub use id::{ADDRESS_LEN, Address, BidId, GroupId, LeaseId, OrderId};
pub use types::{
    Attribute, Bid, BidState, Coin, GroupSpec, Lease, LeaseState, Order, OrderState,
    ResourceGroup, ResourceUnit,
};
