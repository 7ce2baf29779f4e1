//! Terminal front end: a console sink and a keyboard actor for human seats.

mod console;
mod keyboard;

pub use console::ConsoleSink;
pub use keyboard::{KeyCommand, KeyboardActor, Keymap};
