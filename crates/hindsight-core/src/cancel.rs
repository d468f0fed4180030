//! Cooperative cancellation for the refresh loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MirrorError, Result};

/// Shared cancellation flag.
///
/// Clones observe a cancellation requested through any other clone. The
/// refresh loop checks it at safe points (between refresh locations within a
/// cycle); nothing is preempted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `MirrorError::Cancelled` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MirrorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flag_not_cancelled() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        assert!(flag.check().is_ok());
    }

    #[test]
    fn test_cancel() {
        let flag = CancelFlag::new();
        flag.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(MirrorError::Cancelled)));
    }

    #[test]
    fn test_clone_shares_state() {
        let flag = CancelFlag::new();
        let clone = flag.clone();

        clone.cancel();

        assert!(flag.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
