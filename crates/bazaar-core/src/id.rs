//! Hierarchical market identifiers.
//!
//! Every identifier extends its parent: a [`GroupId`] names one workload group
//! of an owner's deployment, an [`OrderId`] adds the order sequence, a
//! [`BidId`] adds the bidding provider, and a [`LeaseId`] is the [`BidId`] of
//! the winning bid. The derived [`Ord`] implementations compare components in
//! declaration order, which is also the byte order of the ledger keys built in
//! [`crate::keys`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

/// A fixed-width account address.
///
/// Displayed and serialized as base58.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidAddress` if the slice is not exactly
    /// [`ADDRESS_LEN`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidAddress(format!(
                "expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(format!("{s}: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Identifies one workload group within an owner's deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId {
    /// Deployment owner.
    pub owner: Address,
    /// Deployment sequence.
    pub dseq: u64,
    /// Group sequence within the deployment.
    pub gseq: u32,
}

impl GroupId {
    /// Creates a group identifier.
    #[must_use]
    pub const fn new(owner: Address, dseq: u64, gseq: u32) -> Self {
        Self { owner, dseq, gseq }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.dseq, self.gseq)
    }
}

/// Identifies one order placed for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId {
    /// The group the order requests capacity for.
    pub group: GroupId,
    /// Order sequence, starting at 1 and never reused within the group.
    pub oseq: u32,
}

impl OrderId {
    /// Creates an order identifier.
    #[must_use]
    pub const fn new(group: GroupId, oseq: u32) -> Self {
        Self { group, oseq }
    }

    /// Returns the owning group.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.group
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.oseq)
    }
}

/// Identifies a provider's bid on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BidId {
    /// The order being bid on.
    pub order: OrderId,
    /// The bidding provider.
    pub provider: Address,
}

impl BidId {
    /// Creates a bid identifier.
    #[must_use]
    pub const fn new(order: OrderId, provider: Address) -> Self {
        Self { order, provider }
    }

    /// Returns the order this bid belongs to.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order
    }

    /// Returns the group this bid's order belongs to.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        self.order.group
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.order, self.provider)
    }
}

/// Identifies a lease. Always equal in value to the winning [`BidId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub BidId);

impl LeaseId {
    /// Returns the bid this lease was awarded from.
    #[must_use]
    pub const fn bid_id(&self) -> BidId {
        self.0
    }

    /// Returns the order this lease fulfils.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.0.order
    }

    /// Returns the leasing provider.
    #[must_use]
    pub const fn provider(&self) -> Address {
        self.0.provider
    }
}

impl From<BidId> for LeaseId {
    fn from(id: BidId) -> Self {
        Self(id)
    }
}

impl From<LeaseId> for BidId {
    fn from(id: LeaseId) -> Self {
        id.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; ADDRESS_LEN])
    }

    #[test]
    fn address_display_roundtrips_through_from_str() {
        let a = addr(7);
        let parsed: Address = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn address_from_slice_rejects_wrong_length() {
        assert!(Address::from_slice(&[1, 2, 3]).is_err());
        assert!(Address::from_slice(&[0u8; ADDRESS_LEN]).is_ok());
    }

    #[test]
    fn address_from_str_rejects_garbage() {
        assert!("not-base58-0OIl".parse::<Address>().is_err());
        // Valid base58, wrong length
        assert!("3mJr7AoUXx2Wqd".parse::<Address>().is_err());
    }

    #[test]
    fn address_serializes_as_string() {
        let a = addr(1);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{a}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn ids_display_as_paths() {
        let gid = GroupId::new(addr(1), 42, 3);
        let oid = OrderId::new(gid, 9);
        let bid = BidId::new(oid, addr(2));
        let lid = LeaseId::from(bid);

        assert_eq!(gid.to_string(), format!("{}/42/3", addr(1)));
        assert_eq!(oid.to_string(), format!("{}/42/3/9", addr(1)));
        assert_eq!(bid.to_string(), format!("{}/42/3/9/{}", addr(1), addr(2)));
        assert_eq!(lid.to_string(), bid.to_string());
    }

    #[test]
    fn lease_id_projects_bid_id() {
        let oid = OrderId::new(GroupId::new(addr(1), 1, 1), 1);
        let bid = BidId::new(oid, addr(5));
        let lid = LeaseId::from(bid);

        assert_eq!(lid.bid_id(), bid);
        assert_eq!(lid.order_id(), oid);
        assert_eq!(lid.provider(), addr(5));
        assert_eq!(BidId::from(lid), bid);
    }

    #[test]
    fn ids_order_by_components() {
        let g1 = GroupId::new(addr(1), 1, 2);
        let g2 = GroupId::new(addr(1), 2, 1);
        assert!(g1 < g2);
        assert!(OrderId::new(g1, 10) < OrderId::new(g1, 11));
        assert!(OrderId::new(g1, u32::MAX) < OrderId::new(g2, 1));
    }
}
