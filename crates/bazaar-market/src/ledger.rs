//! Record access shared by the order, bid and lease ledgers.

use bazaar_core::codec;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::store::{KvIter, Store};

/// Outcome of a state mutation that did not fail.
///
/// Closing an already closed entity is not an error, it just changes
/// nothing. Callers that count work done (cascades, sweepers) inspect this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed and was persisted.
    Applied,
    /// The entity was already in a state that absorbs the request.
    Unchanged,
}

impl Transition {
    /// Returns true if the state changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

pub(crate) fn load<S, T>(store: &S, key: &[u8]) -> Result<Option<T>>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key) {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn save<S, T>(store: &mut S, key: Vec<u8>, value: &T) -> Result<()>
where
    S: Store + ?Sized,
    T: Serialize,
{
    let bytes = codec::encode(value)?;
    store.set(key, bytes);
    Ok(())
}

/// Lazily decodes the values of a prefix scan.
pub(crate) fn decode_all<'a, T>(iter: KvIter<'a>) -> impl Iterator<Item = Result<T>> + 'a
where
    T: DeserializeOwned + 'a,
{
    iter.map(|(_, bytes)| Ok(codec::decode(&bytes)?))
}
