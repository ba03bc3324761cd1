//! Keeper handle for hosts that invoke operations concurrently.
//!
//! Every call takes one exclusive lock over the whole keeper, so operations
//! are applied one at a time exactly as a serializing host would apply them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::keeper::MarketKeeper;

/// A cloneable, thread-safe handle to a [`MarketKeeper`].
#[derive(Debug)]
pub struct SharedKeeper<S, E, C> {
    inner: Arc<Mutex<MarketKeeper<S, E, C>>>,
}

impl<S, E, C> Clone for SharedKeeper<S, E, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, E, C> SharedKeeper<S, E, C> {
    /// Wraps a keeper.
    pub fn new(keeper: MarketKeeper<S, E, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(keeper)),
        }
    }

    /// Runs `f` with exclusive access to the keeper.
    pub fn with<T>(&self, f: impl FnOnce(&mut MarketKeeper<S, E, C>) -> T) -> T {
        let mut keeper = self.inner.lock();
        f(&mut keeper)
    }

    /// Returns the keeper if this is the last handle.
    ///
    /// # Errors
    ///
    /// Returns the handle back if other clones are still alive.
    pub fn try_unwrap(self) -> Result<MarketKeeper<S, E, C>, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner())
            .map_err(|inner| Self { inner })
    }
}
