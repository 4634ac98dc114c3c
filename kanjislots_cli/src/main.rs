use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use kanjislots_core::{
    board_for_seeds, evaluate_board, spin_and_reveal, Evaluation, GameState, MachineConfig, PatternKey,
    RevealObserver, SlotError, SpinEffects, SymbolCatalog, SymbolIndex, TimingConfig,
};

#[derive(Parser)]
#[command(name = "kanjislots", about = "Kanji slot machine in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Machine config (JSON). Defaults to the 6x4 kanji cabinet.
    #[arg(long, global = true, env = "KANJISLOTS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play rounds with animated reveals
    Play {
        /// Spin this many times without prompting
        #[arg(long)]
        spins: Option<u32>,
        #[arg(long, value_enum, default_value_t = Speed::Normal)]
        speed: Speed,
        /// Seed for a repeatable session
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run many instant spins and report the return to player
    Simulate {
        #[arg(long, default_value_t = 10_000)]
        spins: u32,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Write one row per spin to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Recompute the board of a provably-fair spin
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long)]
        nonce: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Speed {
    Normal,
    Turbo,
    Instant,
}

impl Speed {
    fn timing(self) -> TimingConfig {
        match self {
            Speed::Normal => TimingConfig::normal(),
            Speed::Turbo => TimingConfig::turbo(),
            Speed::Instant => TimingConfig::instant(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MachineConfig::load(path)?,
        None => MachineConfig::default(),
    };

    match cli.command {
        Commands::Play { spins, speed, seed } => {
            let config = MachineConfig {
                timing: speed.timing(),
                ..config
            };
            LocalSet::new().run_until(play(config, spins, seed)).await?;
        }
        Commands::Simulate { spins, seed, csv } => simulate(config, spins, seed, csv)?,
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
        } => {
            let board = board_for_seeds(&server_seed, &client_seed, nonce, &config)?;
            println!("server_seed_hash={}", kanjislots_core::derive_hash_hex(server_seed.as_bytes()));
            for row in board.glyph_rows(&config.symbols) {
                println!("{row}");
            }
            let evaluation = evaluate_board(&config, &board);
            print_evaluation(&evaluation, &config.symbols);
        }
    }

    Ok(())
}

async fn play(config: MachineConfig, spins: Option<u32>, seed: Option<u64>) -> anyhow::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let game = Rc::new(RefCell::new(GameState::with_rng(config, &mut rng)?));
    let renderer = Rc::new(TerminalRenderer::new(&game.borrow()));
    renderer.draw_initial(game.borrow().credits());

    let mut played = 0u32;
    let stdin = std::io::stdin();
    loop {
        match spins {
            Some(limit) if played >= limit => break,
            Some(_) => {}
            None => {
                print!("[enter] spin, [q] quit > ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 || line.trim() == "q" {
                    break;
                }
            }
        }

        match spin_and_reveal(&game, &mut rng, renderer.clone()).await {
            Ok(_) => played += 1,
            Err(SlotError::InsufficientCredits { credits, cost }) => {
                println!("Out of credits: {credits} left, a spin costs {cost}.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    println!("Final balance: {} credits after {played} spins", game.borrow().credits());
    Ok(())
}

/// Redraws the grid in place when attached to a terminal, otherwise only
/// prints the landed board.
struct TerminalRenderer {
    catalog: SymbolCatalog,
    width: usize,
    cells: RefCell<Vec<SymbolIndex>>,
    interactive: bool,
}

impl TerminalRenderer {
    fn new(game: &GameState) -> Self {
        Self {
            catalog: game.catalog().clone(),
            width: game.board().width(),
            cells: RefCell::new(game.board().cells().to_vec()),
            interactive: std::io::stdout().is_terminal(),
        }
    }

    fn rows(&self, winners: &[usize]) -> Vec<String> {
        let cells = self.cells.borrow();
        cells
            .chunks(self.width)
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, &s)| {
                        let glyph = self.catalog.glyph(s);
                        if winners.contains(&(r * self.width + c)) {
                            format!("[{glyph}]")
                        } else {
                            format!(" {glyph} ")
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn draw_initial(&self, credits: u64) {
        println!("{credits} credits");
        for row in self.rows(&[]) {
            println!("{row}");
        }
    }

    fn redraw(&self) {
        let rows = self.rows(&[]);
        // cursor up over the previous grid
        print!("\x1b[{}A", rows.len());
        for row in rows {
            println!("\r{row}\x1b[K");
        }
        let _ = std::io::stdout().flush();
    }
}

impl RevealObserver for TerminalRenderer {
    fn on_spin(&self, effects: &SpinEffects) {
        println!("Spin #{} - {} credits", effects.spin_id, effects.credits);
        if self.interactive {
            for row in self.rows(&[]) {
                println!("{row}");
            }
        }
    }

    fn on_frame(&self, cell: usize, symbol: SymbolIndex) {
        if let Some(slot) = self.cells.borrow_mut().get_mut(cell) {
            *slot = symbol;
        }
        if self.interactive {
            self.redraw();
        }
    }

    fn on_reveal(&self, cell: usize, symbol: SymbolIndex) {
        self.on_frame(cell, symbol);
    }

    fn on_evaluation(&self, evaluation: &Evaluation) {
        if self.interactive {
            print!("\x1b[{}A", self.cells.borrow().len() / self.width);
        }
        for row in self.rows(&evaluation.winning_cells) {
            println!("\r{row}\x1b[K");
        }
        print_evaluation(evaluation, &self.catalog);
    }
}

fn print_evaluation(evaluation: &Evaluation, catalog: &SymbolCatalog) {
    if !evaluation.is_win() {
        println!("No win.");
        return;
    }
    for scored in &evaluation.patterns {
        println!(
            "  {} {} x{} = {}",
            scored.key,
            catalog.glyph(scored.pattern.symbol),
            scored.multiplier,
            scored.payout
        );
    }
    println!("Payout: {} credits", evaluation.payout);
}

fn simulate(config: MachineConfig, spins: u32, seed: u64, csv: Option<PathBuf>) -> anyhow::Result<()> {
    let config = MachineConfig {
        timing: TimingConfig::instant(),
        starting_credits: config.spin_cost.saturating_mul(spins as u64),
        ..config
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = GameState::with_rng(config, &mut rng)?;
    let mut writer = match &csv {
        Some(path) => {
            let mut w = csv::Writer::from_path(path)?;
            w.write_record(["spin_id", "board", "cost", "payout", "patterns"])?;
            Some(w)
        }
        None => None,
    };

    let mut wagered = 0u64;
    let mut paid = 0u64;
    let mut hits = 0u32;
    let mut biggest = 0u64;
    let mut by_key: BTreeMap<PatternKey, (u64, u64)> = BTreeMap::new();

    for _ in 0..spins {
        let (effects, evaluation) = game.play_round(&mut rng)?;
        wagered += effects.cost;
        paid += evaluation.payout;
        biggest = biggest.max(evaluation.payout);
        if evaluation.is_win() {
            hits += 1;
        }
        for scored in &evaluation.patterns {
            let entry = by_key.entry(scored.key).or_default();
            entry.0 += 1;
            entry.1 += scored.payout;
        }
        if let Some(w) = writer.as_mut() {
            let patterns: Vec<String> = evaluation.patterns.iter().map(|s| s.key.to_string()).collect();
            w.write_record([
                effects.spin_id.to_string(),
                effects.board.ids(game.catalog()).join(" "),
                effects.cost.to_string(),
                evaluation.payout.to_string(),
                patterns.join(" "),
            ])?;
        }
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    let rtp = if wagered == 0 { 0.0 } else { paid as f64 / wagered as f64 };
    println!("spins:      {spins}");
    println!("wagered:    {wagered}");
    println!("paid:       {paid}");
    println!("rtp:        {:.2}%", rtp * 100.0);
    println!("hit rate:   {:.2}%", hits as f64 * 100.0 / spins.max(1) as f64);
    println!("biggest:    {biggest}");
    for (key, (count, total)) in by_key {
        println!("  {:<8} {count:>7} hits {total:>10} credits", key.to_string());
    }
    if let Some(path) = csv {
        println!("Exported {spins} rows to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::parse_from([
            "kanjislots",
            "verify",
            "--server-seed",
            "s",
            "--client-seed",
            "c",
            "--nonce",
            "3",
        ]);
        assert!(matches!(cli.command, Commands::Verify { nonce: 3, .. }));
    }

    #[test]
    fn test_simulate_with_huge_spin_cost() {
        // two spins of this cost cannot be funded up front
        let config = MachineConfig {
            spin_cost: u64::MAX / 2 + 1,
            ..MachineConfig::default()
        };
        if let Err(err) = simulate(config, 2, 2, None) {
            assert!(err.to_string().contains("insufficient credits"));
        }
    }

    #[test]
    fn test_simulate_writes_csv() {
        let path = std::env::temp_dir().join(format!("kanjislots-sim-{}.csv", std::process::id()));
        simulate(MachineConfig::default(), 50, 9, Some(path.clone())).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 51);
        assert!(text.starts_with("spin_id,board,cost,payout,patterns"));
        std::fs::remove_file(path).unwrap();
    }
}
