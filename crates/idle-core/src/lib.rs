#![deny(warnings)]

//! Core domain model for the idle commits game.
//!
//! This crate defines the serializable state shared by the economy, the
//! runtime and the save layer, the static upgrade catalog, and validation
//! helpers that guard the basic invariants.

pub mod catalog;
mod config;

pub use catalog::{
    BoostId, BoostSpec, Effect, RepositoryEffect, UpgradeFamily, UpgradeId, UpgradeSpec,
};
pub use config::{GameConfig, OfflineBoostPolicy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Wall-clock timestamp or duration in milliseconds.
pub type Millis = i64;

/// A running instance of a temporary boost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBoost {
    /// Boost this instance was started from.
    pub id: BoostId,
    /// Factor applied to production and click output while active.
    pub multiplier: f64,
    /// Seconds left before expiry.
    pub remaining_secs: f64,
    /// Full duration the instance started with.
    pub duration_secs: f64,
}

impl ActiveBoost {
    pub fn start(id: BoostId) -> Self {
        let spec = id.spec();
        Self {
            id,
            multiplier: spec.multiplier,
            remaining_secs: spec.duration_secs,
            duration_secs: spec.duration_secs,
        }
    }
}

/// Counters of the player's economy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyState {
    /// Spendable resource (>= 0).
    pub commits: f64,
    /// Passive commits per second before boosts (>= 0).
    pub production_rate: f64,
    /// Passive experience per second (>= 0).
    pub xp_rate: f64,
    /// Player level (>= 1); doubles as base click power.
    pub level: u32,
    /// Experience towards the next level, always below the threshold once settled.
    pub experience: f64,
    /// Experience needed for the next level (> 0).
    pub experience_to_next_level: f64,
    /// Additive click multiplier derived from click upgrades (>= 1).
    pub click_multiplier: f64,
    /// Boost instances in activation order.
    pub active_boosts: Vec<ActiveBoost>,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self {
            commits: 0.0,
            production_rate: 0.0,
            xp_rate: 0.0,
            level: 1,
            experience: 0.0,
            experience_to_next_level: catalog::INITIAL_XP_THRESHOLD,
            click_multiplier: 1.0,
            active_boosts: Vec::new(),
        }
    }
}

impl EconomyState {
    /// Base click power is the level itself; it is never stored separately.
    pub fn click_base_power(&self) -> f64 {
        f64::from(self.level)
    }

    /// Product of every active boost factor (1 when none are active).
    pub fn boost_factor(&self) -> f64 {
        self.active_boosts.iter().map(|b| b.multiplier).product()
    }

    pub fn is_boost_active(&self, id: BoostId) -> bool {
        self.active_boosts.iter().any(|b| b.id == id)
    }
}

/// Purchase record of a single upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub count: u32,
    /// Price of the next purchase.
    pub cost: f64,
}

impl Holding {
    pub fn fresh(id: UpgradeId) -> Self {
        Self {
            count: 0,
            cost: id.spec().base_cost,
        }
    }
}

/// Cooldown bookkeeping for one boost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostStatus {
    /// Wall-clock time the cooldown clears; `None` when the boost can be bought.
    pub cooldown_until: Option<Millis>,
}

impl BoostStatus {
    pub fn cooldown_active(&self) -> bool {
        self.cooldown_until.is_some()
    }
}

/// A timed repository build. Jobs only move from pending to completed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryJob {
    pub id: u64,
    /// Cosmetic display name.
    pub name: String,
    pub started_at: Millis,
    pub duration_ms: Millis,
    /// Build progress in [0, 100].
    pub progress: f64,
    pub completed: bool,
}

impl RepositoryJob {
    pub fn finishes_at(&self) -> Millis {
        self.started_at.saturating_add(self.duration_ms)
    }
}

/// Repository builds in flight plus spawn bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    pub jobs: Vec<RepositoryJob>,
    pub next_id: u64,
    /// Due time of the next automatic spawn while automation is owned.
    pub next_auto_spawn_at: Option<Millis>,
}

impl Default for RepositoryState {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            next_auto_spawn_at: None,
        }
    }
}

impl RepositoryState {
    pub fn pending_count(&self) -> usize {
        self.jobs.iter().filter(|j| !j.completed).count()
    }

    /// Move the id counter past every job id in use.
    pub fn repair_next_id(&mut self) {
        if let Some(max_id) = self.jobs.iter().map(|j| j.id).max() {
            self.next_id = self.next_id.max(max_id.saturating_add(1));
        }
    }
}

/// Complete game state: everything that is persisted between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub economy: EconomyState,
    pub upgrades: BTreeMap<UpgradeId, Holding>,
    pub boosts: BTreeMap<BoostId, BoostStatus>,
    pub repositories: RepositoryState,
    /// Last time the scheduler or reconciliation advanced this state.
    pub last_update: Millis,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameState {
    /// Fresh game with every catalog entry at its base price.
    pub fn new(now: Millis) -> Self {
        Self {
            economy: EconomyState::default(),
            upgrades: UpgradeId::ALL
                .into_iter()
                .map(|id| (id, Holding::fresh(id)))
                .collect(),
            boosts: BoostId::ALL
                .into_iter()
                .map(|id| (id, BoostStatus::default()))
                .collect(),
            repositories: RepositoryState::default(),
            last_update: now,
        }
    }

    pub fn holding(&self, id: UpgradeId) -> Holding {
        self.upgrades
            .get(&id)
            .copied()
            .unwrap_or_else(|| Holding::fresh(id))
    }

    pub fn count(&self, id: UpgradeId) -> u32 {
        self.holding(id).count
    }

    pub fn boost_status(&self, id: BoostId) -> BoostStatus {
        self.boosts.get(&id).copied().unwrap_or_default()
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    /// Amounts, rates and costs must be non-negative.
    #[error("negative value in {0}")]
    Negative(&'static str),
    /// Level starts at 1.
    #[error("level must be >= 1")]
    LevelZero,
    /// The XP threshold must be at least one whole point.
    #[error("experience threshold must be >= 1")]
    ThresholdBelowOne,
    /// Progress is a percentage.
    #[error("repository {0} progress out of [0, 100]")]
    ProgressOutOfRange(u64),
    /// Durations must be strictly positive.
    #[error("repository {0} has a non-positive duration")]
    NonPositiveDuration(u64),
    /// Repository ids must be unique.
    #[error("duplicate repository id {0}")]
    DuplicateRepository(u64),
    /// The id counter must be past every id in use.
    #[error("next repository id {next_id} is not above existing id {max_id}")]
    StaleRepositoryCounter { next_id: u64, max_id: u64 },
    /// Timer periods must be strictly positive.
    #[error("{0} must be > 0")]
    ZeroPeriod(&'static str),
}

fn check_amount(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

/// Validate the economy counters.
pub fn validate_economy(e: &EconomyState) -> Result<(), ValidationError> {
    check_amount(e.commits, "commits")?;
    check_amount(e.production_rate, "production rate")?;
    check_amount(e.xp_rate, "xp rate")?;
    check_amount(e.experience, "experience")?;
    check_amount(e.click_multiplier, "click multiplier")?;
    if e.level == 0 {
        return Err(ValidationError::LevelZero);
    }
    if !e.experience_to_next_level.is_finite() {
        return Err(ValidationError::NonFinite("experience threshold"));
    }
    if e.experience_to_next_level < 1.0 {
        return Err(ValidationError::ThresholdBelowOne);
    }
    for b in &e.active_boosts {
        check_amount(b.multiplier, "boost multiplier")?;
        if !b.remaining_secs.is_finite() || !b.duration_secs.is_finite() {
            return Err(ValidationError::NonFinite("boost duration"));
        }
    }
    Ok(())
}

/// Validate a single repository job.
pub fn validate_job(j: &RepositoryJob) -> Result<(), ValidationError> {
    if !j.progress.is_finite() || !(0.0..=100.0).contains(&j.progress) {
        return Err(ValidationError::ProgressOutOfRange(j.id));
    }
    if j.duration_ms <= 0 {
        return Err(ValidationError::NonPositiveDuration(j.id));
    }
    Ok(())
}

/// Validate the full state, including upgrade prices and repository ids.
pub fn validate_state(s: &GameState) -> Result<(), ValidationError> {
    validate_economy(&s.economy)?;
    for h in s.upgrades.values() {
        check_amount(h.cost, "upgrade cost")?;
    }
    let mut seen = std::collections::BTreeSet::new();
    for j in &s.repositories.jobs {
        validate_job(j)?;
        if !seen.insert(j.id) {
            return Err(ValidationError::DuplicateRepository(j.id));
        }
    }
    if let Some(&max_id) = seen.last() {
        if s.repositories.next_id <= max_id {
            return Err(ValidationError::StaleRepositoryCounter {
                next_id: s.repositories.next_id,
                max_id,
            });
        }
    }
    Ok(())
}

/// Why a purchase or activation was refused. Several may apply at once.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DenyReason {
    #[error("costs {cost} commits, only {available} available")]
    Unaffordable { cost: f64, available: f64 },
    #[error("unlocks at level {required} (currently {current})")]
    LevelLocked { required: u32, current: u32 },
}

/// Failure of a player command. The state is untouched when one is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CommandError {
    /// Every failed affordability or level check, reported together.
    #[error("cannot buy {target}: {}", join_reasons(.reasons))]
    Denied {
        target: String,
        reasons: Vec<DenyReason>,
    },
    #[error("{0} is still on cooldown")]
    OnCooldown(BoostId),
    #[error("all {max_slots} repository slots are busy")]
    NoSlotAvailable { max_slots: u32 },
}

fn join_reasons(reasons: &[DenyReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CommandError {
    pub fn is_unaffordable(&self) -> bool {
        matches!(self, CommandError::Denied { reasons, .. }
            if reasons.iter().any(|r| matches!(r, DenyReason::Unaffordable { .. })))
    }

    pub fn is_level_locked(&self) -> bool {
        matches!(self, CommandError::Denied { reasons, .. }
            if reasons.iter().any(|r| matches!(r, DenyReason::LevelLocked { .. })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_state_is_valid() {
        let s = GameState::new(1_000);
        validate_state(&s).unwrap();
        assert_eq!(s.economy.level, 1);
        assert_eq!(s.economy.click_base_power(), 1.0);
        assert_eq!(s.economy.boost_factor(), 1.0);
        assert_eq!(s.holding(UpgradeId::Intern), Holding { count: 0, cost: 10.0 });
        assert_eq!(s.upgrades.len(), UpgradeId::ALL.len());
        assert!(!s.boost_status(BoostId::CoffeeRush).cooldown_active());
    }

    #[test]
    fn boost_factors_multiply() {
        let mut e = EconomyState::default();
        e.active_boosts.push(ActiveBoost::start(BoostId::CoffeeRush));
        e.active_boosts.push(ActiveBoost::start(BoostId::Hackathon));
        assert_eq!(e.boost_factor(), 6.0);
        assert!(e.is_boost_active(BoostId::Hackathon));
        assert!(!e.is_boost_active(BoostId::FlowState));
    }

    #[test]
    fn state_snapshot_roundtrip() {
        let mut s = GameState::new(5);
        s.economy.commits = 42.5;
        s.repositories.jobs.push(RepositoryJob {
            id: 1,
            name: "dotfiles".into(),
            started_at: 5,
            duration_ms: 60_000,
            progress: 12.5,
            completed: false,
        });
        let text = serde_json::to_string_pretty(&s).unwrap();
        let back: GameState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.repositories.pending_count(), 1);
    }

    #[test]
    fn invalid_states_are_caught() {
        let mut s = GameState::default();
        s.economy.commits = -1.0;
        assert_eq!(validate_state(&s), Err(ValidationError::Negative("commits")));

        let mut s = GameState::default();
        s.economy.level = 0;
        assert_eq!(validate_state(&s), Err(ValidationError::LevelZero));

        let mut s = GameState::default();
        s.economy.xp_rate = f64::NAN;
        assert_eq!(validate_state(&s), Err(ValidationError::NonFinite("xp rate")));

        let mut s = GameState::default();
        let job = RepositoryJob {
            id: 3,
            name: "x".into(),
            started_at: 0,
            duration_ms: 1000,
            progress: 0.0,
            completed: false,
        };
        s.repositories.jobs = vec![job.clone(), job.clone()];
        assert_eq!(
            validate_state(&s),
            Err(ValidationError::DuplicateRepository(3))
        );

        let mut s = GameState::default();
        s.economy.experience_to_next_level = 0.5;
        assert_eq!(validate_state(&s), Err(ValidationError::ThresholdBelowOne));

        let mut s = GameState::default();
        s.repositories.jobs.push(job);
        assert_eq!(
            validate_state(&s),
            Err(ValidationError::StaleRepositoryCounter { next_id: 1, max_id: 3 })
        );
        s.repositories.repair_next_id();
        assert_eq!(s.repositories.next_id, 4);
        validate_state(&s).unwrap();
    }

    #[test]
    fn denial_reports_all_reasons() {
        let err = CommandError::Denied {
            target: "Hackathon".into(),
            reasons: vec![
                DenyReason::Unaffordable {
                    cost: 1000.0,
                    available: 10.0,
                },
                DenyReason::LevelLocked {
                    required: 5,
                    current: 1,
                },
            ],
        };
        assert!(err.is_unaffordable());
        assert!(err.is_level_locked());
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("level 5"));
        assert!(!CommandError::OnCooldown(BoostId::CoffeeRush).is_unaffordable());
    }

    proptest! {
        #[test]
        fn progress_bounds(p in -50.0f64..150.0) {
            let j = RepositoryJob { id: 1, name: "r".into(), started_at: 0, duration_ms: 10, progress: p, completed: false };
            prop_assert_eq!(validate_job(&j).is_ok(), (0.0..=100.0).contains(&p));
        }
    }
}
