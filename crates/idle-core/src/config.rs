use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// How temporary boosts are treated when catching up on time spent away.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineBoostPolicy {
    /// Boosts keep multiplying production and run down exactly as live ticks would.
    #[default]
    Replay,
    /// Boosts are dropped at resume; offline production is unboosted.
    Discard,
}

/// Runtime configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Scheduler period in milliseconds (default: 100).
    pub tick_ms: u32,
    /// Autosave period in milliseconds (default: 1000).
    pub autosave_ms: u32,
    /// Upper bound on the offline window that is credited at resume.
    pub offline_cap_secs: u64,
    /// Boost handling during offline reconciliation.
    pub offline_boosts: OfflineBoostPolicy,
    /// Suppress per-level notifications produced by offline catch-up.
    pub silent_offline_level_ups: bool,
    /// Seed for deterministic click XP and repository names.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            autosave_ms: 1_000,
            offline_cap_secs: 24 * 60 * 60,
            offline_boosts: OfflineBoostPolicy::Replay,
            silent_offline_level_ups: true,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Scheduler period in seconds.
    pub fn tick_secs(&self) -> f64 {
        f64::from(self.tick_ms) / 1000.0
    }

    pub fn offline_cap_ms(&self) -> i64 {
        i64::try_from(self.offline_cap_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_ms == 0 {
            return Err(ValidationError::ZeroPeriod("tick_ms"));
        }
        if self.autosave_ms == 0 {
            return Err(ValidationError::ZeroPeriod("autosave_ms"));
        }
        Ok(())
    }
}
