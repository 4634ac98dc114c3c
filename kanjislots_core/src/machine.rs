//! Spin controller: the single owner of credits, the board and the reveal
//! barrier.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::barrier::{BarrierState, CompletionBarrier};
use crate::board::Board;
use crate::config::MachineConfig;
use crate::error::{Result, SlotError};
use crate::patterns::detect;
use crate::paytable::Evaluation;
use crate::rng::ProvablyFairRng;
use crate::sampler::WeightedSampler;
use crate::symbols::{SymbolCatalog, SymbolIndex};

/// Reveal of one cell: animate for `duration`, then show `symbol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPlan {
    pub cell: usize,
    pub symbol: SymbolIndex,
    pub duration: Duration,
}

/// What a started spin hands to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinEffects {
    pub spin_id: u64,
    pub cost: u64,
    /// Balance right after the cost was taken.
    pub credits: u64,
    pub board: Board,
    pub reveals: Vec<RevealPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    Pending { remaining: usize },
    /// The last reveal of the spin landed and the board was scored.
    Evaluated(Evaluation),
}

#[derive(Debug, Clone)]
pub struct GameState {
    config: MachineConfig,
    sampler: WeightedSampler,
    credits: u64,
    board: Board,
    barrier: CompletionBarrier,
    spin_id: u64,
    revealed: Vec<bool>,
    last_evaluation: Option<Evaluation>,
}

impl GameState {
    pub fn new(config: MachineConfig) -> Result<Self> {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Same as `new`, drawing the idle board from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(config: MachineConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let sampler = WeightedSampler::from_catalog(&config.symbols)?;
        let board = Board::idle(&config.symbols, config.width, config.height, rng);
        Ok(Self {
            credits: config.starting_credits,
            revealed: vec![true; board.len()],
            config,
            sampler,
            board,
            barrier: CompletionBarrier::new(),
            spin_id: 0,
            last_evaluation: None,
        })
    }

    pub fn credits(&self) -> u64 {
        self.credits
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.config.symbols
    }

    /// Id of the latest spin, 0 before the first one.
    pub fn spin_id(&self) -> u64 {
        self.spin_id
    }

    pub fn is_spinning(&self) -> bool {
        self.barrier.is_pending()
    }

    pub fn outstanding(&self) -> usize {
        self.barrier.outstanding()
    }

    pub fn barrier_state(&self) -> BarrierState {
        self.barrier.state()
    }

    pub fn is_revealed(&self, cell: usize) -> bool {
        self.revealed.get(cell).copied().unwrap_or(false)
    }

    pub fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    pub fn can_spin(&self) -> bool {
        !self.is_spinning() && self.credits >= self.config.spin_cost
    }

    /// Starts a round: takes the cost, draws a new board and arms the barrier
    /// with one reveal per cell. Returns at once; scoring happens in
    /// `complete_reveal` once every cell has landed. Refused spins change
    /// nothing.
    pub fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SpinEffects> {
        if self.barrier.is_pending() {
            debug!(outstanding = self.barrier.outstanding(), "spin refused, reveal in progress");
            return Err(SlotError::SpinInProgress {
                outstanding: self.barrier.outstanding(),
            });
        }
        let cost = self.config.spin_cost;
        if self.credits < cost {
            debug!(credits = self.credits, cost, "spin refused, insufficient credits");
            return Err(SlotError::InsufficientCredits {
                credits: self.credits,
                cost,
            });
        }

        // board first: seed verification replays exactly these draws
        let board = Board::generate(&self.sampler, self.config.width, self.config.height, rng);
        let reveals: Vec<RevealPlan> = board
            .cells()
            .iter()
            .enumerate()
            .map(|(cell, &symbol)| RevealPlan {
                cell,
                symbol,
                duration: self.config.timing.reveal_duration(rng),
            })
            .collect();

        self.barrier.arm(board.len())?;
        self.credits -= cost;
        self.spin_id += 1;
        self.revealed = vec![false; board.len()];
        self.board = board;
        self.last_evaluation = None;

        debug!(spin_id = self.spin_id, credits = self.credits, "spin started");
        Ok(SpinEffects {
            spin_id: self.spin_id,
            cost,
            credits: self.credits,
            board: self.board.clone(),
            reveals,
        })
    }

    /// Records that one cell finished animating. The completion that drains
    /// the barrier scores the board and credits the payout.
    pub fn complete_reveal(&mut self, spin_id: u64, cell: usize) -> Result<RevealOutcome> {
        if !self.barrier.is_pending() {
            return Err(SlotError::NoSpinInProgress);
        }
        if spin_id != self.spin_id {
            return Err(SlotError::StaleSpin {
                got: spin_id,
                current: self.spin_id,
            });
        }
        match self.revealed.get(cell) {
            None => {
                return Err(SlotError::CellOutOfRange {
                    cell,
                    cells: self.revealed.len(),
                })
            }
            Some(true) => return Err(SlotError::AlreadyRevealed(cell)),
            Some(false) => {}
        }

        match self.barrier.signal()? {
            BarrierState::Pending(remaining) => {
                self.revealed[cell] = true;
                Ok(RevealOutcome::Pending { remaining })
            }
            BarrierState::Released => {
                self.revealed[cell] = true;
                Ok(RevealOutcome::Evaluated(self.settle()))
            }
        }
    }

    /// Spins and lands every reveal immediately. Used by simulations.
    pub fn play_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(SpinEffects, Evaluation)> {
        let effects = self.spin(rng)?;
        for plan in &effects.reveals {
            if let RevealOutcome::Evaluated(evaluation) = self.complete_reveal(effects.spin_id, plan.cell)? {
                return Ok((effects, evaluation));
            }
        }
        Err(SlotError::NoSpinInProgress)
    }

    fn settle(&mut self) -> Evaluation {
        let evaluation = evaluate_board(&self.config, &self.board);
        self.credits += evaluation.payout;
        info!(
            spin_id = self.spin_id,
            payout = evaluation.payout,
            patterns = evaluation.patterns.len(),
            credits = self.credits,
            "spin evaluated"
        );
        self.last_evaluation = Some(evaluation.clone());
        evaluation
    }
}

/// Detection plus scoring for a finished board.
pub fn evaluate_board(config: &MachineConfig, board: &Board) -> Evaluation {
    let patterns = detect(board, &config.rules);
    config.paytable.evaluate(patterns, &config.symbols)
}

/// Board a spin with these seeds draws.
pub fn board_for_seeds(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &MachineConfig,
) -> Result<Board> {
    let sampler = WeightedSampler::from_catalog(&config.symbols)?;
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    Ok(Board::generate(&sampler, config.width, config.height, &mut rng))
}

/// Checks a published board against what the seeds produce.
pub fn verify_board(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &MachineConfig,
    expected: &[SymbolIndex],
) -> bool {
    board_for_seeds(server_seed, client_seed, nonce, config)
        .map(|board| board.cells() == expected)
        .unwrap_or(false)
}
