//! # bazaar-market
//!
//! Deterministic order/bid/lease keeper for the Bazaar compute marketplace.
//!
//! This crate provides:
//!
//! - [`MarketKeeper`]: the coordinator hosts call for every market operation
//! - [`OrderLedger`], [`BidLedger`], [`LeaseLedger`]: per-entity state machines
//! - [`Store`], [`EventSink`], [`Clock`]: the injected collaborators
//! - [`SharedKeeper`]: a locked handle for hosts that call concurrently
//!
//! Every mutation is a pure function of the store contents, the call
//! arguments and the clock height, so replicas applying the same calls end
//! with byte-identical stores.
//!
//! ## Example
//!
//! ```rust
//! use bazaar_core::{Address, Coin, GroupId, GroupSpec, ADDRESS_LEN};
//! use bazaar_market::{FixedClock, MarketKeeper, MemoryStore, RecordingEventSink};
//!
//! let mut keeper = MarketKeeper::new(MemoryStore::new(), RecordingEventSink::new(), FixedClock(10));
//! let group = GroupId::new(Address::new([1; ADDRESS_LEN]), 1, 1);
//!
//! let order = keeper.create_order(group, GroupSpec::default())?;
//! keeper.create_bid(order.id, Address::new([2; ADDRESS_LEN]), Coin::new("ubzr", 100))?;
//! let lease = keeper.match_order(&order.id)?;
//!
//! assert_eq!(keeper.lease_for_order(&order.id)?, lease);
//! # Ok::<(), bazaar_market::MarketError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bids;
pub mod clock;
pub mod error;
pub mod events;
pub mod keeper;
pub mod leases;
pub mod ledger;
pub mod orders;
pub mod params;
pub mod shared;
pub mod store;

pub use bids::BidLedger;
pub use clock::{Clock, FixedClock, ManualClock};
pub use error::{EntityKind, MarketError, Result};
pub use events::{
    BufferedEventSink, EventSink, MarketEvent, NoopEventSink, RecordingEventSink,
    TracingEventSink,
};
pub use keeper::{CascadeReport, MarketKeeper, TxKeeper};
pub use leases::LeaseLedger;
pub use ledger::Transition;
pub use orders::OrderLedger;
pub use params::{DEFAULT_ORDER_TTL, MarketParams};
pub use shared::SharedKeeper;
pub use store::{CacheStore, KvIter, KvPair, MemoryStore, Store};
