//! Binary ledger keys.
//!
//! A key is a one-byte table prefix followed by the identifier components in
//! fixed-width big-endian form:
//!
//! ```text
//! owner (20) | dseq (8) | gseq (4) | oseq (4) | provider (20)
//! ```
//!
//! Because every component has a fixed width, lexicographic byte order of keys
//! equals the derived [`Ord`] of the identifiers, and every key of a child
//! entity starts with the key body of its parent. Scanning the bids of one
//! order is therefore a plain prefix scan.

use crate::id::{ADDRESS_LEN, Address, BidId, GroupId, LeaseId, OrderId};

/// Table prefix for orders.
pub const ORDER_PREFIX: u8 = 0x01;
/// Table prefix for bids.
pub const BID_PREFIX: u8 = 0x02;
/// Table prefix for leases.
pub const LEASE_PREFIX: u8 = 0x03;
/// Table prefix for the per-group order sequence counters.
pub const ORDER_SEQ_PREFIX: u8 = 0x04;

const GROUP_LEN: usize = ADDRESS_LEN + 8 + 4;
const ORDER_LEN: usize = GROUP_LEN + 4;
const BID_LEN: usize = ORDER_LEN + ADDRESS_LEN;

fn put_address(buf: &mut Vec<u8>, address: &Address) {
    buf.extend_from_slice(address.as_bytes());
}

fn put_group(buf: &mut Vec<u8>, id: &GroupId) {
    put_address(buf, &id.owner);
    buf.extend_from_slice(&id.dseq.to_be_bytes());
    buf.extend_from_slice(&id.gseq.to_be_bytes());
}

fn put_order(buf: &mut Vec<u8>, id: &OrderId) {
    put_group(buf, &id.group);
    buf.extend_from_slice(&id.oseq.to_be_bytes());
}

fn put_bid(buf: &mut Vec<u8>, id: &BidId) {
    put_order(buf, &id.order);
    put_address(buf, &id.provider);
}

fn with_prefix(prefix: u8, body_len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + body_len);
    buf.push(prefix);
    buf
}

/// Key of an order record.
#[must_use]
pub fn order_key(id: &OrderId) -> Vec<u8> {
    let mut key = with_prefix(ORDER_PREFIX, ORDER_LEN);
    put_order(&mut key, id);
    key
}

/// Prefix covering every order.
#[must_use]
pub fn orders_prefix() -> Vec<u8> {
    vec![ORDER_PREFIX]
}

/// Prefix covering every order of one group.
#[must_use]
pub fn group_orders_prefix(id: &GroupId) -> Vec<u8> {
    let mut key = with_prefix(ORDER_PREFIX, GROUP_LEN);
    put_group(&mut key, id);
    key
}

/// Key of a bid record.
#[must_use]
pub fn bid_key(id: &BidId) -> Vec<u8> {
    let mut key = with_prefix(BID_PREFIX, BID_LEN);
    put_bid(&mut key, id);
    key
}

/// Prefix covering every bid.
#[must_use]
pub fn bids_prefix() -> Vec<u8> {
    vec![BID_PREFIX]
}

/// Prefix covering every bid on one order.
#[must_use]
pub fn order_bids_prefix(id: &OrderId) -> Vec<u8> {
    let mut key = with_prefix(BID_PREFIX, ORDER_LEN);
    put_order(&mut key, id);
    key
}

/// Key of a lease record.
#[must_use]
pub fn lease_key(id: &LeaseId) -> Vec<u8> {
    let mut key = with_prefix(LEASE_PREFIX, BID_LEN);
    put_bid(&mut key, &id.0);
    key
}

/// Prefix covering every lease.
#[must_use]
pub fn leases_prefix() -> Vec<u8> {
    vec![LEASE_PREFIX]
}

/// Prefix covering every lease awarded on one order.
#[must_use]
pub fn order_leases_prefix(id: &OrderId) -> Vec<u8> {
    let mut key = with_prefix(LEASE_PREFIX, ORDER_LEN);
    put_order(&mut key, id);
    key
}

/// Key of a group's last allocated order sequence.
#[must_use]
pub fn order_seq_key(id: &GroupId) -> Vec<u8> {
    let mut key = with_prefix(ORDER_SEQ_PREFIX, GROUP_LEN);
    put_group(&mut key, id);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(b: u8) -> Address {
        Address::new([b; ADDRESS_LEN])
    }

    fn order(owner: u8, dseq: u64, gseq: u32, oseq: u32) -> OrderId {
        OrderId::new(GroupId::new(addr(owner), dseq, gseq), oseq)
    }

    #[test]
    fn keys_have_fixed_widths() {
        let oid = order(1, 2, 3, 4);
        let bid = BidId::new(oid, addr(9));
        assert_eq!(order_key(&oid).len(), 1 + ORDER_LEN);
        assert_eq!(bid_key(&bid).len(), 1 + BID_LEN);
        assert_eq!(lease_key(&LeaseId(bid)).len(), 1 + BID_LEN);
        assert_eq!(order_seq_key(&oid.group).len(), 1 + GROUP_LEN);
    }

    #[test]
    fn order_key_layout_is_big_endian() {
        let key = order_key(&order(0xAA, 0x0102, 0x0304, 0x0506));
        assert_eq!(key[0], ORDER_PREFIX);
        assert_eq!(&key[1..=ADDRESS_LEN], &[0xAA; ADDRESS_LEN]);
        assert_eq!(&key[21..29], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(&key[29..33], &[0, 0, 0x03, 0x04]);
        assert_eq!(&key[33..37], &[0, 0, 0x05, 0x06]);
    }

    #[test]
    fn child_keys_extend_parent_prefixes() {
        let oid = order(1, 7, 2, 3);
        let bid = BidId::new(oid, addr(4));

        assert!(order_key(&oid).starts_with(&group_orders_prefix(&oid.group)));
        assert!(order_key(&oid).starts_with(&orders_prefix()));
        assert!(bid_key(&bid).starts_with(&order_bids_prefix(&oid)));
        assert!(bid_key(&bid).starts_with(&bids_prefix()));
        assert!(lease_key(&LeaseId(bid)).starts_with(&order_leases_prefix(&oid)));
        assert!(lease_key(&LeaseId(bid)).starts_with(&leases_prefix()));
    }

    #[test]
    fn group_prefix_excludes_neighbouring_groups() {
        let a = order(1, 7, 2, 1);
        let b = order(1, 7, 3, 1);
        assert!(!order_key(&b).starts_with(&group_orders_prefix(&a.group)));
    }

    #[test]
    fn tables_do_not_overlap() {
        let oid = order(1, 1, 1, 1);
        let bid = BidId::new(oid, addr(1));
        assert!(!bid_key(&bid).starts_with(&orders_prefix()));
        assert!(!lease_key(&LeaseId(bid)).starts_with(&bids_prefix()));
        assert!(!order_seq_key(&oid.group).starts_with(&orders_prefix()));
    }

    proptest! {
        #[test]
        fn order_key_order_matches_id_order(
            a in (any::<u8>(), any::<u64>(), any::<u32>(), any::<u32>()),
            b in (any::<u8>(), any::<u64>(), any::<u32>(), any::<u32>()),
        ) {
            let ia = order(a.0, a.1, a.2, a.3);
            let ib = order(b.0, b.1, b.2, b.3);
            prop_assert_eq!(ia.cmp(&ib), order_key(&ia).cmp(&order_key(&ib)));
        }

        #[test]
        fn bid_key_order_matches_id_order(
            oseq_a in any::<u32>(),
            oseq_b in any::<u32>(),
            provider_a in any::<[u8; ADDRESS_LEN]>(),
            provider_b in any::<[u8; ADDRESS_LEN]>(),
        ) {
            let ia = BidId::new(order(1, 1, 1, oseq_a), Address::new(provider_a));
            let ib = BidId::new(order(1, 1, 1, oseq_b), Address::new(provider_b));
            prop_assert_eq!(ia.cmp(&ib), bid_key(&ia).cmp(&bid_key(&ib)));
        }
    }
}
