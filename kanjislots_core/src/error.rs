use thiserror::Error;

/// Errors raised by the slot engine.
///
/// Every variant except `InvalidConfiguration` is a guard: the call that
/// returned it left the game state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("insufficient credits: have {credits}, spin costs {cost}")]
    InsufficientCredits { credits: u64, cost: u64 },
    #[error("a spin is still revealing ({outstanding} cells outstanding)")]
    SpinInProgress { outstanding: usize },
    #[error("no spin is being revealed")]
    NoSpinInProgress,
    #[error("reveal for spin {got} but current spin is {current}")]
    StaleSpin { got: u64, current: u64 },
    #[error("cell {cell} is outside a board of {cells} cells")]
    CellOutOfRange { cell: usize, cells: usize },
    #[error("cell {0} was already revealed")]
    AlreadyRevealed(usize),
}

impl SlotError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SlotError::InvalidConfiguration(msg.into())
    }

    /// Guards are non-fatal; callers treat them as a no-op.
    pub fn is_guard(&self) -> bool {
        !matches!(self, SlotError::InvalidConfiguration(_))
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;
