//! Cooperative driver for the per-cell reveal animations.
//!
//! Every cell runs as its own local task on the current thread: it shows
//! scramble frames, sleeps between them, lands its final symbol and then
//! reports to the shared `GameState`. The report that drains the barrier
//! scores the board. All tasks are spawned before any of them is polled.
//!
//! The driver needs a `tokio::task::LocalSet` around it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::error::{Result, SlotError};
use crate::machine::{GameState, RevealOutcome, SpinEffects};
use crate::paytable::Evaluation;
use crate::symbols::SymbolIndex;

/// Receives everything a renderer needs during a round.
pub trait RevealObserver {
    fn on_spin(&self, _effects: &SpinEffects) {}

    /// A scramble frame: show `symbol` in `cell` for now.
    fn on_frame(&self, _cell: usize, _symbol: SymbolIndex) {}

    /// `cell` stopped on its final symbol.
    fn on_reveal(&self, cell: usize, symbol: SymbolIndex);

    fn on_evaluation(&self, evaluation: &Evaluation);
}

/// Starts a spin and drives it to evaluation.
pub async fn spin_and_reveal<R: Rng + ?Sized>(
    game: &Rc<RefCell<GameState>>,
    rng: &mut R,
    observer: Rc<dyn RevealObserver>,
) -> Result<Evaluation> {
    let effects = game.borrow_mut().spin(rng)?;
    observer.on_spin(&effects);
    let scramble_seed = rng.gen();
    run_reveals(Rc::clone(game), effects, observer, scramble_seed).await
}

/// Animates every reveal of `effects` and resolves with the evaluation
/// produced by the last one to land.
pub async fn run_reveals(
    game: Rc<RefCell<GameState>>,
    effects: SpinEffects,
    observer: Rc<dyn RevealObserver>,
    scramble_seed: u64,
) -> Result<Evaluation> {
    let (timing, symbol_count) = {
        let game = game.borrow();
        (game.config().timing.clone(), game.catalog().len())
    };
    let evaluated: Rc<RefCell<Option<Evaluation>>> = Rc::new(RefCell::new(None));
    let spin_id = effects.spin_id;

    let mut handles: Vec<JoinHandle<Result<()>>> = Vec::with_capacity(effects.reveals.len());
    for plan in effects.reveals {
        let game = Rc::clone(&game);
        let observer = Rc::clone(&observer);
        let evaluated = Rc::clone(&evaluated);
        let frames = timing.frame_offsets(plan.duration);
        let mut scramble = StdRng::seed_from_u64(scramble_seed ^ (plan.cell as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        handles.push(tokio::task::spawn_local(async move {
            let mut shown_at = Duration::ZERO;
            for offset in frames {
                pause(offset - shown_at).await;
                shown_at = offset;
                observer.on_frame(plan.cell, scramble.gen_range(0..symbol_count) as SymbolIndex);
            }
            pause(plan.duration.saturating_sub(shown_at)).await;

            observer.on_reveal(plan.cell, plan.symbol);
            let outcome = game.borrow_mut().complete_reveal(spin_id, plan.cell)?;
            match outcome {
                RevealOutcome::Pending { remaining } => {
                    trace!(cell = plan.cell, remaining, "cell landed");
                }
                RevealOutcome::Evaluated(evaluation) => {
                    debug!(cell = plan.cell, payout = evaluation.payout, "last cell landed");
                    observer.on_evaluation(&evaluation);
                    *evaluated.borrow_mut() = Some(evaluation);
                }
            }
            Ok(())
        }));
    }

    // every task is joined before the first error is reported
    let mut first_err = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(%err, "reveal task failed");
                first_err.get_or_insert(err);
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => debug!(%err, "reveal task did not finish"),
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }

    let evaluation = evaluated.borrow_mut().take();
    evaluation.ok_or(SlotError::NoSpinInProgress)
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
