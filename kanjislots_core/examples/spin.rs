use kanjislots_core::{GameState, MachineConfig, ProvablyFairRng, TimingConfig};

fn main() {
    // One provably-fair round with instant reveals
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let nonce = 1u64;
    let config = MachineConfig {
        timing: TimingConfig::instant(),
        ..MachineConfig::default()
    };
    let mut game = match GameState::new(config) {
        Ok(game) => game,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    match game.play_round(&mut rng) {
        Ok((effects, evaluation)) => {
            println!("server_seed_hash={}", rng.server_seed_hash_hex());
            for row in effects.board.glyph_rows(game.catalog()) {
                println!("{row}");
            }
            println!("payout={} credits={}", evaluation.payout, game.credits());
        }
        Err(err) => eprintln!("{err}"),
    }
}
