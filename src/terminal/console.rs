//! Console sink: prints notices as coloured lines.
//!
//! Lines end in `\r\n` so the output stays aligned while the terminal is in
//! raw mode for the keyboard actor.

use crate::board::{ItemId, PlayerId, Slot};
use crate::rules::CardRules;
use crate::sink::{NoticeKind, Sink};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use parking_lot::Mutex;
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// Sink that writes one line per notice.
pub struct ConsoleSink<W = Stdout> {
    out: Mutex<W>,
    rules: CardRules,
    mask: NoticeKind,
}

impl ConsoleSink<Stdout> {
    /// Print to stdout, skipping countdown and token chatter.
    pub fn stdout(rules: CardRules) -> Self {
        Self::with_mask(
            io::stdout(),
            rules,
            NoticeKind::all() - NoticeKind::COUNTDOWN - NoticeKind::TOKENS,
        )
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Print every kind of notice to `out`.
    pub fn new(out: W, rules: CardRules) -> Self {
        Self::with_mask(out, rules, NoticeKind::all())
    }

    /// Print only notices whose kind is in `mask`.
    pub fn with_mask(out: W, rules: CardRules, mask: NoticeKind) -> Self {
        Self {
            out: Mutex::new(out),
            rules,
            mask,
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, kind: NoticeKind, color: Color, text: &str) {
        if !self.mask.intersects(kind) {
            return;
        }
        let mut out = self.out.lock();
        let written = queue!(
            out,
            SetForegroundColor(color),
            Print(text),
            ResetColor,
            Print("\r\n")
        )
        .and_then(|()| out.flush());
        if let Err(err) = written {
            tracing::warn!(%err, "console write failed");
        }
    }

    fn card(&self, item: ItemId) -> String {
        let features: Vec<String> = self.rules.features(item).iter().map(u32::to_string).collect();
        format!("#{item} [{}]", features.join(" "))
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn item_placed(&self, item: ItemId, slot: Slot) {
        let text = format!("slot {slot:>2} <- {}", self.card(item));
        self.line(NoticeKind::BOARD, Color::White, &text);
    }

    fn item_removed(&self, slot: Slot) {
        self.line(NoticeKind::BOARD, Color::DarkGrey, &format!("slot {slot:>2} cleared"));
    }

    fn token_placed(&self, player: PlayerId, slot: Slot) {
        self.line(NoticeKind::TOKENS, Color::Cyan, &format!("player {player} marks slot {slot}"));
    }

    fn token_removed(&self, player: PlayerId, slot: Slot) {
        self.line(NoticeKind::TOKENS, Color::DarkCyan, &format!("player {player} unmarks slot {slot}"));
    }

    fn countdown(&self, remaining: Duration, urgent: bool) {
        let (color, text) = if urgent {
            (Color::Red, format!("{:.2}s left", remaining.as_secs_f64()))
        } else {
            (Color::Green, format!("{}s left", remaining.as_secs()))
        };
        self.line(NoticeKind::COUNTDOWN, color, &text);
    }

    fn freeze(&self, player: PlayerId, remaining: Duration) {
        let text = if remaining.is_zero() {
            format!("player {player} is back")
        } else {
            format!("player {player} frozen for {}s", remaining.as_secs().max(1))
        };
        self.line(NoticeKind::FREEZE, Color::Yellow, &text);
    }

    fn score(&self, player: PlayerId, score: u32) {
        self.line(NoticeKind::SCORE, Color::Magenta, &format!("player {player} now has {score}"));
    }

    fn winners(&self, players: &[PlayerId]) {
        let text = match players {
            [winner] => format!("player {winner} wins"),
            _ => format!("tie between players {players:?}"),
        };
        self.line(NoticeKind::WINNERS, Color::Magenta, &text);
    }
}

impl<W> std::fmt::Debug for ConsoleSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("rules", &self.rules)
            .field("mask", &self.mask)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(sink: ConsoleSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_card_features_printed() {
        let sink = ConsoleSink::new(Vec::new(), CardRules::new(4, 3));
        sink.item_placed(5, 3);
        let out = text(sink);
        assert!(out.contains("slot  3 <- #5 [2 1 0 0]"));
        assert!(out.ends_with("\r\n"));
    }

    #[test]
    fn test_mask_filters_kinds() {
        let sink = ConsoleSink::with_mask(Vec::new(), CardRules::new(4, 3), NoticeKind::WINNERS);
        sink.countdown(Duration::from_secs(3), true);
        sink.token_placed(0, 1);
        sink.winners(&[0, 2]);
        let out = text(sink);
        assert!(!out.contains("left"));
        assert!(!out.contains("marks"));
        assert!(out.contains("tie between players [0, 2]"));
    }

    #[test]
    fn test_freeze_end_reported() {
        let sink = ConsoleSink::new(Vec::new(), CardRules::new(4, 3));
        sink.freeze(1, Duration::from_millis(2500));
        sink.freeze(1, Duration::ZERO);
        let out = text(sink);
        assert!(out.contains("player 1 frozen for 2s"));
        assert!(out.contains("player 1 is back"));
    }
}
