//! Console demo: play against computer seats in the terminal.
//!
//! ```text
//! cargo run --example console -- [config.toml]
//! ```
//!
//! Human players claim slots with their key row (see `player_keys`); Esc
//! quits. Logs go to stderr, filtered by `RUST_LOG`.

use crossbeam_channel::{bounded, RecvTimeoutError};
use crossterm::terminal;
use set_arena::{CardRules, ConsoleSink, GameBuilder, GameConfig, KeyCommand, KeyboardActor, Keymap};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let keymap = Keymap::from_config(&config);
    let sink = Arc::new(ConsoleSink::stdout(CardRules::from_config(&config)));

    terminal::enable_raw_mode()?;
    let outcome = play(config, keymap, sink);
    terminal::disable_raw_mode()?;

    let standings = outcome?;
    println!("{standings}");
    Ok(())
}

fn play(
    config: GameConfig,
    keymap: Keymap,
    sink: Arc<ConsoleSink>,
) -> Result<set_arena::Standings, Box<dyn std::error::Error>> {
    let game = GameBuilder::new(config).sink(sink).start()?;
    let (key_tx, key_rx) = bounded(16);
    let keyboard = KeyboardActor::spawn(key_tx, keymap, Duration::from_millis(10))?;

    while !game.is_finished() {
        match key_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(KeyCommand::Claim { player, slot }) => {
                game.request_slot(player, slot);
            }
            Ok(KeyCommand::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    keyboard.join();
    game.terminate();
    Ok(game.join()?)
}
