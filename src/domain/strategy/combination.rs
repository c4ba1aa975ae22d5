//! Voting over several sub-strategies.
//!
//! Sub-strategies produce their own (already de-duplicated) signals; the vote
//! for each bar is then passed through the combination's own crossing state.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::StratError;
use crate::domain::signal::{CrossingState, Signal};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombinationMode {
    All,
    Any,
    #[default]
    Majority,
}

impl FromStr for CombinationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "and" => Ok(CombinationMode::All),
            "any" | "or" => Ok(CombinationMode::Any),
            "majority" => Ok(CombinationMode::Majority),
            other => Err(format!("unknown combination mode '{}'", other)),
        }
    }
}

impl fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationMode::All => write!(f, "ALL"),
            CombinationMode::Any => write!(f, "ANY"),
            CombinationMode::Majority => write!(f, "MAJORITY"),
        }
    }
}

/// How a conflicting vote is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    Hold,
    /// The first sub-strategy in list order that voted BUY or SELL wins.
    FirstVoter,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" => Ok(TieBreak::Hold),
            "first_voter" | "first" => Ok(TieBreak::FirstVoter),
            other => Err(format!("unknown tie break '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinationParams {
    pub sub_strategies: Vec<StrategyConfig>,
    pub mode: CombinationMode,
    pub tie_break: TieBreak,
    pub weights: Option<Vec<f64>>,
}

impl CombinationParams {
    pub fn new(sub_strategies: Vec<StrategyConfig>, mode: CombinationMode) -> Self {
        Self {
            sub_strategies,
            mode,
            tie_break: TieBreak::default(),
            weights: None,
        }
    }

    pub fn validate(&self) -> Result<(), StratError> {
        if self.sub_strategies.len() < 2 {
            return Err(StratError::invalid(
                "strategy",
                "sub_strategies",
                "a combination needs at least two sub-strategies",
            ));
        }
        if let Some(weights) = &self.weights {
            if weights.len() != self.sub_strategies.len() {
                return Err(StratError::invalid(
                    "strategy",
                    "weights",
                    format!(
                        "expected {} weights, got {}",
                        self.sub_strategies.len(),
                        weights.len()
                    ),
                ));
            }
            if weights.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
                return Err(StratError::invalid(
                    "strategy",
                    "weights",
                    "weights must be positive",
                ));
            }
        }
        for sub in &self.sub_strategies {
            sub.validate()?;
        }
        Ok(())
    }

    pub fn minimum_bars(&self) -> usize {
        self.sub_strategies
            .iter()
            .map(StrategyConfig::minimum_bars)
            .max()
            .unwrap_or(0)
    }

    fn weight(&self, i: usize) -> f64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(i).copied())
            .unwrap_or(1.0)
    }

    /// Combine one bar's sub-strategy votes into a single candidate signal.
    pub fn tally(&self, votes: &[Signal]) -> Signal {
        let buys = votes.iter().filter(|v| **v == Signal::Buy).count();
        let sells = votes.iter().filter(|v| **v == Signal::Sell).count();

        let outcome = match self.mode {
            CombinationMode::All => {
                if !votes.is_empty() && buys == votes.len() {
                    Vote::Decided(Signal::Buy)
                } else if !votes.is_empty() && sells == votes.len() {
                    Vote::Decided(Signal::Sell)
                } else {
                    Vote::Decided(Signal::Hold)
                }
            }
            CombinationMode::Any => match (buys > 0, sells > 0) {
                (true, false) => Vote::Decided(Signal::Buy),
                (false, true) => Vote::Decided(Signal::Sell),
                (true, true) => Vote::Conflict,
                (false, false) => Vote::Decided(Signal::Hold),
            },
            CombinationMode::Majority => {
                let mut buy_weight = 0.0;
                let mut sell_weight = 0.0;
                let mut total = 0.0;
                for (i, vote) in votes.iter().enumerate() {
                    let w = self.weight(i);
                    total += w;
                    match vote {
                        Signal::Buy => buy_weight += w,
                        Signal::Sell => sell_weight += w,
                        Signal::Hold => {}
                    }
                }
                let half = total / 2.0;
                if buy_weight > half {
                    Vote::Decided(Signal::Buy)
                } else if sell_weight > half {
                    Vote::Decided(Signal::Sell)
                } else if buy_weight > 0.0 && buy_weight == sell_weight {
                    Vote::Conflict
                } else {
                    Vote::Decided(Signal::Hold)
                }
            }
        };

        match outcome {
            Vote::Decided(signal) => signal,
            Vote::Conflict => match self.tie_break {
                TieBreak::Hold => Signal::Hold,
                TieBreak::FirstVoter => votes
                    .iter()
                    .copied()
                    .find(|v| *v != Signal::Hold)
                    .unwrap_or(Signal::Hold),
            },
        }
    }
}

enum Vote {
    Decided(Signal),
    Conflict,
}

/// Votes a set of per-bar sub-strategy streams into one stream.
pub(crate) fn combine(
    params: &CombinationParams,
    sub_streams: &[Vec<Signal>],
    len: usize,
) -> Vec<Signal> {
    let mut state = CrossingState::default();
    let mut votes = Vec::with_capacity(sub_streams.len());
    (0..len)
        .map(|i| {
            votes.clear();
            votes.extend(sub_streams.iter().map(|s| s.get(i).copied().unwrap_or(Signal::Hold)));
            state.apply(params.tally(&votes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{MaCrossoverParams, RsiParams};
    use Signal::{Buy, Hold, Sell};

    fn two_subs(mode: CombinationMode) -> CombinationParams {
        CombinationParams::new(
            vec![
                StrategyConfig::MaCrossover(MaCrossoverParams::default()),
                StrategyConfig::Rsi(RsiParams::default()),
            ],
            mode,
        )
    }

    fn three_subs(mode: CombinationMode) -> CombinationParams {
        let mut p = two_subs(mode);
        p.sub_strategies.push(StrategyConfig::Rsi(RsiParams::default()));
        p
    }

    #[test]
    fn requires_two_sub_strategies() {
        let mut p = two_subs(CombinationMode::All);
        p.sub_strategies.pop();
        assert!(matches!(
            p.validate(),
            Err(StratError::InvalidConfig { ref key, .. }) if key == "sub_strategies"
        ));
    }

    #[test]
    fn weights_must_match_and_be_positive() {
        let mut p = two_subs(CombinationMode::Majority);
        p.weights = Some(vec![1.0]);
        assert!(p.validate().is_err());
        p.weights = Some(vec![1.0, 0.0]);
        assert!(p.validate().is_err());
        p.weights = Some(vec![1.0, 2.5]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn invalid_sub_strategy_fails_combination() {
        let mut p = two_subs(CombinationMode::Any);
        p.sub_strategies[0] = StrategyConfig::MaCrossover(MaCrossoverParams {
            fast_period: 50,
            slow_period: 20,
            ..MaCrossoverParams::default()
        });
        assert!(p.validate().is_err());
    }

    #[test]
    fn all_needs_unanimity() {
        let p = two_subs(CombinationMode::All);
        assert_eq!(p.tally(&[Buy, Buy]), Buy);
        assert_eq!(p.tally(&[Sell, Sell]), Sell);
        assert_eq!(p.tally(&[Buy, Hold]), Hold);
        assert_eq!(p.tally(&[Buy, Sell]), Hold);
    }

    #[test]
    fn any_takes_one_sided_votes() {
        let p = two_subs(CombinationMode::Any);
        assert_eq!(p.tally(&[Hold, Buy]), Buy);
        assert_eq!(p.tally(&[Sell, Hold]), Sell);
        assert_eq!(p.tally(&[Hold, Hold]), Hold);
        assert_eq!(p.tally(&[Buy, Sell]), Hold);
    }

    #[test]
    fn any_conflict_with_first_voter() {
        let mut p = two_subs(CombinationMode::Any);
        p.tie_break = TieBreak::FirstVoter;
        assert_eq!(p.tally(&[Sell, Buy]), Sell);
        assert_eq!(p.tally(&[Buy, Sell]), Buy);
    }

    #[test]
    fn majority_split_is_hold_by_default() {
        let p = two_subs(CombinationMode::Majority);
        assert_eq!(p.tally(&[Buy, Sell]), Hold);
    }

    #[test]
    fn majority_split_with_first_voter_buys() {
        let mut p = two_subs(CombinationMode::Majority);
        p.tie_break = TieBreak::FirstVoter;
        assert_eq!(p.tally(&[Buy, Sell]), Buy);
    }

    #[test]
    fn majority_needs_more_than_half() {
        let p = three_subs(CombinationMode::Majority);
        assert_eq!(p.tally(&[Buy, Buy, Hold]), Buy);
        assert_eq!(p.tally(&[Buy, Hold, Hold]), Hold);
        assert_eq!(p.tally(&[Sell, Sell, Buy]), Sell);
        // 1 vs 1 with an abstention is a conflict
        assert_eq!(p.tally(&[Hold, Sell, Buy]), Hold);
    }

    #[test]
    fn weighted_majority() {
        let mut p = three_subs(CombinationMode::Majority);
        p.weights = Some(vec![3.0, 1.0, 1.0]);
        assert_eq!(p.tally(&[Buy, Sell, Sell]), Buy);
        assert_eq!(p.tally(&[Hold, Sell, Sell]), Hold);
    }

    #[test]
    fn combine_dedupes_through_crossing_state() {
        let p = two_subs(CombinationMode::Any);
        let a = vec![Buy, Hold, Hold, Sell, Hold];
        let b = vec![Hold, Buy, Hold, Hold, Sell];
        let out = combine(&p, &[a, b], 5);
        assert_eq!(out, vec![Buy, Hold, Hold, Sell, Hold]);
    }

    #[test]
    fn minimum_bars_is_max_of_subs() {
        let p = two_subs(CombinationMode::All);
        assert_eq!(p.minimum_bars(), 50);
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("AND".parse::<CombinationMode>().unwrap(), CombinationMode::All);
        assert_eq!("or".parse::<CombinationMode>().unwrap(), CombinationMode::Any);
        assert_eq!("Majority".parse::<CombinationMode>().unwrap(), CombinationMode::Majority);
        assert!("most".parse::<CombinationMode>().is_err());
        assert_eq!("first_voter".parse::<TieBreak>().unwrap(), TieBreak::FirstVoter);
    }
}
