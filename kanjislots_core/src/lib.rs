pub mod barrier;
pub mod board;
pub mod config;
pub mod error;
pub mod machine;
pub mod patterns;
pub mod paytable;
pub mod reveal;
pub mod rng;
pub mod sampler;
pub mod symbols;
pub mod timing;

pub use crate::barrier::{BarrierState, CompletionBarrier};
pub use crate::board::Board;
pub use crate::config::MachineConfig;
pub use crate::error::{Result, SlotError};
pub use crate::machine::{board_for_seeds, evaluate_board, verify_board, GameState, RevealOutcome, RevealPlan, SpinEffects};
pub use crate::patterns::{detect, DetectionRules, Direction, Pattern, PatternKind};
pub use crate::paytable::{Evaluation, PatternKey, Paytable, ScoredPattern};
pub use crate::reveal::{run_reveals, spin_and_reveal, RevealObserver};
pub use crate::rng::{derive_hash_hex, ProvablyFairRng};
pub use crate::sampler::WeightedSampler;
pub use crate::symbols::{Symbol, SymbolCatalog, SymbolIndex};
pub use crate::timing::{TimingConfig, TimingProfile};
