/// Final result of one round, from the player's point of view.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Tie = 1,
    Loss = 2,
    Win = 3,
}

impl TryFrom<u8> for Outcome {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Outcome::Tie),
            2 => Ok(Outcome::Loss),
            3 => Ok(Outcome::Win),
            other => Err(other),
        }
    }
}

/// Outcome of a resolved round plus both final totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundSummary {
    pub outcome: Outcome,
    pub player_total: u8,
    pub dealer_total: u8,
}

/// Running win/loss/tie counts for one session.
///
/// A session never exceeds 255 rounds (the round count is one byte on the
/// wire), so each counter fits in a `u8`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u8,
    pub losses: u8,
    pub ties: u8,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Win => &mut self.wins,
            Outcome::Loss => &mut self.losses,
            Outcome::Tie => &mut self.ties,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn rounds(&self) -> u16 {
        u16::from(self.wins) + u16::from(self.losses) + u16::from(self.ties)
    }

    /// Percentage of decisive rounds won; ties are excluded.
    pub fn win_rate(&self) -> Option<f64> {
        let decisive = u16::from(self.wins) + u16::from(self.losses);
        if decisive == 0 {
            return None;
        }
        Some(f64::from(self.wins) * 100.0 / f64::from(decisive))
    }
}
