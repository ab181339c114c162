//! Shared allowance for report endpoint calls.

use std::sync::{Arc, Mutex};

/// Number of report calls the provider still allows.
///
/// Clones share the same counter, so one budget can be handed to several
/// clients for a single run.
#[derive(Debug, Clone)]
pub struct CallBudget {
    remaining: Arc<Mutex<u32>>,
}

impl CallBudget {
    /// Creates a budget with `calls` calls left.
    pub fn new(calls: u32) -> Self {
        Self {
            remaining: Arc::new(Mutex::new(calls)),
        }
    }

    /// Takes one call from the budget. Returns false when none are left.
    pub fn try_acquire(&self) -> bool {
        let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }

    /// Calls left.
    pub fn remaining(&self) -> u32 {
        *self.remaining.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CallBudget {
    /// The provider's daily allowance for report endpoints.
    fn default() -> Self {
        Self::new(2000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_exhausted() {
        let budget = CallBudget::new(2);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn clones_share_the_counter() {
        let budget = CallBudget::new(3);
        let other = budget.clone();
        assert!(other.try_acquire());
        assert_eq!(budget.remaining(), 2);

        assert!(budget.try_acquire());
        assert_eq!(other.remaining(), 1);
    }
}
