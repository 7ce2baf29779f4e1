//! Final leaderboard.

use crate::board::PlayerId;
use std::fmt;

/// Scores at the end of a game and the players sharing first place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Standings {
    scores: Vec<u32>,
    winners: Vec<PlayerId>,
}

impl Standings {
    /// Build standings from per-player scores, indexed by player id.
    ///
    /// Every player with the top score is a winner, including when nobody
    /// scored at all.
    pub fn from_scores(scores: Vec<u32>) -> Self {
        let top = scores.iter().copied().max();
        let winners = scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| Some(score) == top)
            .map(|(player, _)| player)
            .collect();
        Self { scores, winners }
    }

    /// Scores indexed by player id.
    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    /// Players sharing first place, in id order.
    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    /// Score of one player.
    pub fn score(&self, player: PlayerId) -> Option<u32> {
        self.scores.get(player).copied()
    }
}

impl fmt::Display for Standings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (player, score) in self.scores.iter().enumerate() {
            writeln!(f, "Player {player} has {score} points")?;
        }
        match self.winners.as_slice() {
            [winner] => write!(f, "Player {winner} won"),
            winners => write!(f, "Tie between players {winners:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_winner() {
        let standings = Standings::from_scores(vec![1, 4, 2]);
        assert_eq!(standings.winners(), &[1]);
        assert_eq!(standings.score(1), Some(4));
        assert_eq!(standings.score(5), None);
    }

    #[test]
    fn test_ties_share_first_place() {
        let standings = Standings::from_scores(vec![3, 1, 3, 0]);
        assert_eq!(standings.winners(), &[0, 2]);
        assert!(standings.to_string().ends_with("Tie between players [0, 2]"));
    }

    #[test]
    fn test_nobody_scored() {
        let standings = Standings::from_scores(vec![0, 0]);
        assert_eq!(standings.winners(), &[0, 1]);
        assert!(Standings::from_scores(Vec::new()).winners().is_empty());
    }

    #[test]
    fn test_display_lists_every_player() {
        let text = Standings::from_scores(vec![2, 5]).to_string();
        assert_eq!(text, "Player 0 has 2 points\nPlayer 1 has 5 points\nPlayer 1 won");
    }
}
