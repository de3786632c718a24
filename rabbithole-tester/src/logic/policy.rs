use std::fmt;

use clap::ValueEnum;
use rabbithole_engine::{ManualCandidate, PlayerState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub candidate_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(candidate_index: usize, rationale: Option<String>) -> Self {
        Self {
            candidate_index,
            rationale,
        }
    }
}

/// Stand-in for a player picking among manual candidates.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select one of `candidates`, which is never empty.
    fn pick(&mut self, state: &PlayerState, candidates: &[ManualCandidate]) -> PolicyDecision;
}

/// How a simulated run is driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum GameplayStrategy {
    /// The engine picks events and choices itself.
    Autonomous,
    /// Manual turns, always taking the first candidate.
    FirstOffer,
    /// Manual turns, picking uniformly from a seeded stream.
    Random,
    /// Manual turns, following the dominant worldview.
    Devout,
    /// Manual turns, avoiding specials and large swings.
    Cautious,
}

impl GameplayStrategy {
    pub const ALL: [Self; 5] = [
        Self::Autonomous,
        Self::FirstOffer,
        Self::Random,
        Self::Devout,
        Self::Cautious,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Autonomous => "Autonomous",
            Self::FirstOffer => "First Offer",
            Self::Random => "Random",
            Self::Devout => "Devout",
            Self::Cautious => "Cautious",
        }
    }

    #[must_use]
    pub const fn is_manual(self) -> bool {
        !matches!(self, Self::Autonomous)
    }

    /// Policy for manual strategies; `None` for autonomous play.
    #[must_use]
    pub fn create_policy(self, seed: u64) -> Option<Box<dyn PlayerPolicy + Send>> {
        match self {
            Self::Autonomous => None,
            Self::FirstOffer => Some(Box::new(FirstOfferPolicy)),
            Self::Random => Some(Box::new(RandomPolicy::new(seed))),
            Self::Devout => Some(Box::new(DevoutPolicy)),
            Self::Cautious => Some(Box::new(CautiousPolicy)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct FirstOfferPolicy;
struct DevoutPolicy;
struct CautiousPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for FirstOfferPolicy {
    fn name(&self) -> &'static str {
        "First Offer"
    }

    fn pick(&mut self, _state: &PlayerState, _candidates: &[ManualCandidate]) -> PolicyDecision {
        PolicyDecision::new(0, None)
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick(&mut self, _state: &PlayerState, candidates: &[ManualCandidate]) -> PolicyDecision {
        let idx = self.rng.gen_range(0..candidates.len().max(1));
        PolicyDecision::new(idx, Some(format!("roll {idx}/{}", candidates.len())))
    }
}

impl PlayerPolicy for DevoutPolicy {
    fn name(&self) -> &'static str {
        "Devout"
    }

    fn pick(&mut self, state: &PlayerState, candidates: &[ManualCandidate]) -> PolicyDecision {
        let axis = state.dominant_worldview().key();
        let best = candidates
            .iter()
            .enumerate()
            .map(|(idx, candidate)| {
                let choice = &candidate.choice;
                let aligned = choice.worldview.as_deref() == Some(axis);
                let pull = choice.tendency(state) * choice.magnitude();
                (idx, aligned, pull)
            })
            .max_by(|a, b| a.1.cmp(&b.1).then(a.2.total_cmp(&b.2)).then(b.0.cmp(&a.0)));
        match best {
            Some((idx, aligned, pull)) => PolicyDecision::new(
                idx,
                Some(format!(
                    "{axis} {} pull {pull:.1}",
                    if aligned { "aligned" } else { "unaligned" }
                )),
            ),
            None => PolicyDecision::new(0, None),
        }
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn pick(&mut self, _state: &PlayerState, candidates: &[ManualCandidate]) -> PolicyDecision {
        let best = candidates
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| {
                a.choice
                    .is_special
                    .cmp(&b.choice.is_special)
                    .then(a.choice.magnitude().abs().total_cmp(&b.choice.magnitude().abs()))
                    .then(ia.cmp(ib))
            })
            .map_or(0, |(idx, _)| idx);
        PolicyDecision::new(best, Some("smallest swing".to_string()))
    }
}
