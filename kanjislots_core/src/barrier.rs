//! Completion barrier between per-cell reveal animations and evaluation.

use crate::error::{Result, SlotError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierState {
    /// Animations still outstanding.
    Pending(usize),
    Released,
}

/// Counts outstanding reveal animations. Only the signal that brings the
/// count to zero observes `Released`, so evaluation runs exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionBarrier {
    outstanding: usize,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BarrierState {
        match self.outstanding {
            0 => BarrierState::Released,
            n => BarrierState::Pending(n),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding > 0
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Starts tracking `count` animations. Refused while pending.
    pub fn arm(&mut self, count: usize) -> Result<()> {
        if self.is_pending() {
            return Err(SlotError::SpinInProgress {
                outstanding: self.outstanding,
            });
        }
        self.outstanding = count;
        Ok(())
    }

    /// One animation finished.
    pub fn signal(&mut self) -> Result<BarrierState> {
        if self.outstanding == 0 {
            return Err(SlotError::NoSpinInProgress);
        }
        self.outstanding -= 1;
        Ok(self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_on_last_signal_only() {
        let mut barrier = CompletionBarrier::new();
        assert_eq!(barrier.state(), BarrierState::Released);
        barrier.arm(3).unwrap();
        assert_eq!(barrier.signal().unwrap(), BarrierState::Pending(2));
        assert_eq!(barrier.signal().unwrap(), BarrierState::Pending(1));
        assert_eq!(barrier.signal().unwrap(), BarrierState::Released);
        assert_eq!(barrier.signal(), Err(SlotError::NoSpinInProgress));
    }

    #[test]
    fn test_cannot_rearm_while_pending() {
        let mut barrier = CompletionBarrier::new();
        barrier.arm(2).unwrap();
        assert_eq!(
            barrier.arm(5),
            Err(SlotError::SpinInProgress { outstanding: 2 })
        );
        assert_eq!(barrier.outstanding(), 2);
    }
}
