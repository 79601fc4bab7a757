use serde::{Deserialize, Serialize};
use crate::error::{FootyError, Result};

/// Decimal 1X2 odds quoted for a fixture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Odds-implied outcome probabilities with the bookmaker margin removed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImpliedProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    /// Sum of the raw reciprocals before normalization.
    pub overround: f64,
}

impl MatchOdds {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    fn prices(&self) -> [(&'static str, f64); 3] {
        [("home", self.home), ("draw", self.draw), ("away", self.away)]
    }

    /// Rejects zero, negative and non-finite prices.
    pub fn validate(&self) -> Result<()> {
        for (outcome, value) in self.prices() {
            if !value.is_finite() || value <= 0.0 {
                return Err(FootyError::InvalidOdds { outcome, value });
            }
        }
        Ok(())
    }

    /// Reciprocals of the prices. A price so small that its reciprocal
    /// overflows is rejected like a non-positive one.
    pub fn raw_implied(&self) -> Result<(f64, f64, f64)> {
        self.validate()?;
        let mut raw = [0.0; 3];
        for (slot, (outcome, value)) in raw.iter_mut().zip(self.prices()) {
            *slot = 1.0 / value;
            if !slot.is_finite() {
                return Err(FootyError::InvalidOdds { outcome, value });
            }
        }
        if !raw.iter().sum::<f64>().is_finite() {
            let (outcome, value) = self
                .prices()
                .into_iter()
                .fold(("home", self.home), |low, next| if next.1 < low.1 { next } else { low });
            return Err(FootyError::InvalidOdds { outcome, value });
        }
        Ok((raw[0], raw[1], raw[2]))
    }

    pub fn implied_probabilities(&self) -> Result<ImpliedProbabilities> {
        let (home, draw, away) = self.raw_implied()?;
        let total = home + draw + away;

        Ok(ImpliedProbabilities {
            home: home / total,
            draw: draw / total,
            away: away / total,
            overround: total,
        })
    }
}
