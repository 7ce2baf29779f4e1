//! Keyboard Actor: dedicated thread turning key presses into slot requests.
//!
//! The actor polls crossterm events with a timeout so it can notice
//! shutdown, maps each press through a [`Keymap`] and forwards the resulting
//! [`KeyCommand`] to the main loop.

use crate::board::{PlayerId, Slot};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// A human player wants to toggle a slot.
    Claim {
        /// The player the key belongs to.
        player: PlayerId,
        /// The slot the key stands for.
        slot: Slot,
    },
    /// End the game.
    Quit,
}

/// Mapping from characters to (player, slot) pairs.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<char, (PlayerId, Slot)>,
}

impl Keymap {
    /// One row of keys per human player; the n-th key of a row is slot n.
    ///
    /// A key bound twice keeps its first binding.
    pub fn from_config(config: &GameConfig) -> Self {
        let mut bindings = HashMap::new();
        for (player, row) in config.player_keys.iter().enumerate().take(config.human_players) {
            for (slot, key) in row.chars().enumerate() {
                if let Some((owner, _)) = bindings.get(&key) {
                    tracing::warn!(%key, player, owner, "key already bound");
                    continue;
                }
                bindings.insert(key, (player, slot));
            }
        }
        Self { bindings }
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no key is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Translate a key event. Only presses count.
    pub fn command(&self, key: &KeyEvent) -> Option<KeyCommand> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Esc => Some(KeyCommand::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyCommand::Quit)
            }
            KeyCode::Char(c) => self
                .bindings
                .get(&c)
                .or_else(|| self.bindings.get(&c.to_ascii_lowercase()))
                .map(|&(player, slot)| KeyCommand::Claim { player, slot }),
            _ => None,
        }
    }
}

/// Keyboard actor handle.
#[derive(Debug)]
pub struct KeyboardActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl KeyboardActor {
    /// Spawn the keyboard thread.
    ///
    /// The terminal should already be in raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the thread cannot be started.
    pub fn spawn(sender: Sender<KeyCommand>, keymap: Keymap, poll_timeout: Duration) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let name = "keyboard".to_string();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::run_loop(&sender, &keymap, &flag, poll_timeout))
            .map_err(|source| GameError::Spawn { name, source })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the thread to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the thread and wait for it.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(sender: &Sender<KeyCommand>, keymap: &Keymap, shutdown: &AtomicBool, poll_timeout: Duration) {
        while !shutdown.load(Ordering::Relaxed) {
            match event::poll(poll_timeout) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        let Some(command) = keymap.command(&key) else {
                            continue;
                        };
                        if sender.send(command).is_err() || command == KeyCommand::Quit {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "failed to read terminal event"),
                },
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(%err, "terminal polling failed");
                    let _ = sender.send(KeyCommand::Quit);
                    break;
                }
            }
        }
        tracing::debug!("keyboard actor stopped");
    }
}

impl Drop for KeyboardActor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
