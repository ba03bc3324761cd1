//! Logical block-height clocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MarketError, Result};

/// Source of the current block height.
///
/// Heights never decrease across calls within one execution context.
pub trait Clock: Send + Sync {
    /// Returns the current height.
    fn current_height(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn current_height(&self) -> u64 {
        (**self).current_height()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn current_height(&self) -> u64 {
        (**self).current_height()
    }
}

/// A clock pinned to one height, e.g. for the duration of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn current_height(&self) -> u64 {
        self.0
    }
}

/// A clock the host advances explicitly between blocks.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at `height`.
    #[must_use]
    pub const fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Moves the clock to `height`.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::ClockRegression` if `height` is below the
    /// current height.
    pub fn set(&self, height: u64) -> Result<()> {
        let current = self.height.load(Ordering::SeqCst);
        if height < current {
            return Err(MarketError::ClockRegression {
                current,
                requested: height,
            });
        }
        self.height.store(height, Ordering::SeqCst);
        Ok(())
    }

    /// Advances the clock by `blocks`, saturating at `u64::MAX`.
    pub fn advance(&self, blocks: u64) -> u64 {
        let next = self.height.load(Ordering::SeqCst).saturating_add(blocks);
        self.height.store(next, Ordering::SeqCst);
        next
    }
}

impl Clock for ManualClock {
    fn current_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_height() {
        assert_eq!(FixedClock(42).current_height(), 42);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.advance(5), 15);
        assert_eq!(clock.current_height(), 15);
        clock.set(20).unwrap();
        assert_eq!(clock.current_height(), 20);
    }

    #[test]
    fn manual_clock_rejects_regression() {
        let clock = ManualClock::new(10);
        assert!(matches!(
            clock.set(9),
            Err(MarketError::ClockRegression { current: 10, requested: 9 })
        ));
        assert_eq!(clock.current_height(), 10);
        clock.set(10).unwrap();
    }

    #[test]
    fn manual_clock_saturates() {
        let clock = ManualClock::new(u64::MAX - 1);
        assert_eq!(clock.advance(10), u64::MAX);
    }
}
