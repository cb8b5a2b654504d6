//! Player commands and the per-tick economy step.
//!
//! Every command validates first and mutates only on success, so a returned
//! error always leaves the state as it was.

use idle_core::{ActiveBoost, BoostId, CommandError, EconomyState, GameState, Millis, UpgradeId};
use rand::Rng;
use tracing::debug;

use crate::rules::{check_eligibility, recompute_aggregates};
use crate::{click_xp, effective_click_power, next_cost, next_xp_threshold, EXPIRY_EPSILON};

/// Result of a single click.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickOutcome {
    pub commits: f64,
    pub experience: f64,
    /// Levels reached while settling, in order.
    pub levels: Vec<u32>,
}

/// Credit one click: commits at the effective click power plus random XP.
pub fn apply_click<R: Rng>(e: &mut EconomyState, rng: &mut R) -> ClickOutcome {
    let commits = effective_click_power(e);
    e.commits += commits;
    let experience = click_xp(rng.gen_range(1..=5), e.level);
    gain_experience(e, experience);
    let levels = settle_experience(e);
    ClickOutcome {
        commits,
        experience,
        levels,
    }
}

/// Add experience without settling. Non-positive or non-finite amounts are ignored.
pub fn gain_experience(e: &mut EconomyState, amount: f64) -> bool {
    if !(amount.is_finite() && amount > 0.0) {
        return false;
    }
    e.experience += amount;
    true
}

/// Resolve accumulated experience into level-ups.
///
/// Loops because the threshold grows with every level. Returns each level
/// reached so callers can emit one event per level.
pub fn settle_experience(e: &mut EconomyState) -> Vec<u32> {
    let mut reached = Vec::new();
    while e.experience >= e.experience_to_next_level && e.experience_to_next_level > 0.0 {
        e.experience -= e.experience_to_next_level;
        e.experience_to_next_level = next_xp_threshold(e.experience_to_next_level);
        e.level = e.level.saturating_add(1);
        reached.push(e.level);
    }
    reached
}

/// Buy one unit of an upgrade.
///
/// Debits the cost, grows it by the family factor and rebuilds the derived
/// aggregates. Returns the new holding.
pub fn purchase_upgrade(
    state: &mut GameState,
    id: UpgradeId,
) -> Result<idle_core::Holding, CommandError> {
    let spec = id.spec();
    let mut holding = state.holding(id);
    check_eligibility(spec.name, holding.cost, spec.unlock_level, &state.economy)?;

    state.economy.commits = (state.economy.commits - holding.cost).max(0.0);
    holding.count = holding.count.saturating_add(1);
    holding.cost = next_cost(holding.cost, id.family().cost_growth());
    state.upgrades.insert(id, holding);
    recompute_aggregates(state);
    debug!(upgrade = id.key(), count = holding.count, cost = holding.cost, "upgrade bought");
    Ok(holding)
}

/// Start a temporary boost and put it on cooldown until `now + cooldown`.
pub fn activate_boost(
    state: &mut GameState,
    id: BoostId,
    now: Millis,
) -> Result<ActiveBoost, CommandError> {
    let spec = id.spec();
    if state.boost_status(id).cooldown_active() || state.economy.is_boost_active(id) {
        return Err(CommandError::OnCooldown(id));
    }
    check_eligibility(spec.name, spec.cost, spec.unlock_level, &state.economy)?;

    state.economy.commits = (state.economy.commits - spec.cost).max(0.0);
    let boost = ActiveBoost::start(id);
    state.economy.active_boosts.push(boost.clone());
    let cooldown_ms = (spec.cooldown_secs * 1000.0).round() as Millis;
    state.boosts.entry(id).or_default().cooldown_until = Some(now.saturating_add(cooldown_ms));
    debug!(boost = id.key(), multiplier = spec.multiplier, "boost activated");
    Ok(boost)
}

/// What a scheduler tick changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub produced: f64,
    pub experience: f64,
    pub levels: Vec<u32>,
    pub expired: Vec<BoostId>,
}

/// Advance passive production, XP and boost timers by `secs`.
///
/// Production uses the boosts active at the start of the step.
pub fn tick(e: &mut EconomyState, secs: f64) -> TickReport {
    if !(secs.is_finite() && secs > 0.0) {
        return TickReport::default();
    }
    let produced = e.production_rate * secs * e.boost_factor();
    e.commits += produced;
    let experience = e.xp_rate * secs;
    gain_experience(e, experience);
    let levels = settle_experience(e);
    let expired = decay_boosts(e, secs);
    TickReport {
        produced,
        experience,
        levels,
        expired,
    }
}

/// Run boost timers down by `secs`, dropping and returning the expired ones.
pub fn decay_boosts(e: &mut EconomyState, secs: f64) -> Vec<BoostId> {
    let mut expired = Vec::new();
    e.active_boosts.retain_mut(|b| {
        b.remaining_secs -= secs;
        if b.remaining_secs <= EXPIRY_EPSILON {
            expired.push(b.id);
            false
        } else {
            true
        }
    });
    expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::Holding;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn buying_first_intern() {
        let mut s = GameState::default();
        s.economy.commits = 10.0;
        let h = purchase_upgrade(&mut s, UpgradeId::Intern).unwrap();
        assert_eq!(s.economy.commits, 0.0);
        assert_eq!(h, Holding { count: 1, cost: 11.0 });
        assert_eq!(s.holding(UpgradeId::Intern), h);
        assert!((s.economy.production_rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn click_upgrades_use_steeper_growth() {
        let mut s = GameState::default();
        s.economy.commits = 200.0;
        let h = purchase_upgrade(&mut s, UpgradeId::MechanicalKeyboard).unwrap();
        assert_eq!(h.cost, 75.0);
        assert_eq!(s.economy.click_multiplier, 1.5);
        purchase_upgrade(&mut s, UpgradeId::MechanicalKeyboard).unwrap();
        assert_eq!(s.economy.click_multiplier, 2.0);
        assert_eq!(s.holding(UpgradeId::MechanicalKeyboard).cost, 112.0);
    }

    #[test]
    fn denied_purchase_leaves_state_untouched() {
        let mut s = GameState::default();
        s.economy.commits = 100.0;
        let before = s.clone();
        let err = purchase_upgrade(&mut s, UpgradeId::CiBot).unwrap_err();
        assert!(err.is_unaffordable() && err.is_level_locked());
        assert_eq!(s, before);
    }

    #[test]
    fn first_click_yields_one_commit() {
        let mut e = EconomyState::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let out = apply_click(&mut e, &mut rng);
        assert_eq!(out.commits, 1.0);
        assert_eq!(e.commits, 1.0);
        assert!((1.0..=5.0).contains(&out.experience));
        assert!(out.levels.is_empty());
    }

    #[test]
    fn unaffordable_boost_changes_nothing() {
        let mut s = GameState::default();
        s.economy.commits = 150.0;
        let before = s.clone();
        let err = activate_boost(&mut s, BoostId::CoffeeRush, 0).unwrap_err();
        assert!(err.is_unaffordable());
        assert!(!err.is_level_locked());
        assert_eq!(s, before);
        assert!(!s.boost_status(BoostId::CoffeeRush).cooldown_active());
    }

    #[test]
    fn boost_activation_sets_cooldown() {
        let mut s = GameState::default();
        s.economy.commits = 500.0;
        let b = activate_boost(&mut s, BoostId::CoffeeRush, 1_000).unwrap();
        assert_eq!(b.remaining_secs, 30.0);
        assert_eq!(s.economy.commits, 300.0);
        assert_eq!(
            s.boost_status(BoostId::CoffeeRush).cooldown_until,
            Some(61_000)
        );
        assert_eq!(
            activate_boost(&mut s, BoostId::CoffeeRush, 2_000),
            Err(CommandError::OnCooldown(BoostId::CoffeeRush))
        );
    }

    #[test]
    fn settle_runs_multiple_levels() {
        let mut e = EconomyState::default();
        gain_experience(&mut e, 100.0 + 150.0 + 10.0);
        let levels = settle_experience(&mut e);
        assert_eq!(levels, vec![2, 3]);
        assert_eq!(e.experience, 10.0);
        assert_eq!(e.experience_to_next_level, 225.0);
        assert_eq!(e.click_base_power(), 3.0);
    }

    #[test]
    fn tiny_threshold_settles_below_threshold() {
        let mut e = EconomyState::default();
        e.experience_to_next_level = 1.0;
        gain_experience(&mut e, 3.5);
        assert_eq!(settle_experience(&mut e), vec![2, 3, 4]);
        assert_eq!(e.experience_to_next_level, 1.0);
        assert_eq!(e.experience, 0.5);
        assert!(idle_core::validate_economy(&e).is_ok());
    }

    #[test]
    fn invalid_xp_is_ignored() {
        let mut e = EconomyState::default();
        assert!(!gain_experience(&mut e, -5.0));
        assert!(!gain_experience(&mut e, f64::NAN));
        assert!(!gain_experience(&mut e, 0.0));
        assert_eq!(e.experience, 0.0);
    }

    #[test]
    fn tick_expires_boosts_after_full_duration() {
        let mut e = EconomyState::default();
        e.production_rate = 10.0;
        e.active_boosts.push(ActiveBoost::start(BoostId::CoffeeRush));
        let mut expired_at = None;
        for i in 1..=400 {
            let r = tick(&mut e, 0.1);
            if !r.expired.is_empty() {
                expired_at = Some(i);
                break;
            }
        }
        assert_eq!(expired_at, Some(300));
        assert!((e.commits - 600.0).abs() < 1e-6, "{}", e.commits);
    }

    #[test]
    fn tick_ignores_bad_deltas() {
        let mut e = EconomyState::default();
        e.production_rate = 1.0;
        assert_eq!(tick(&mut e, -1.0), TickReport::default());
        assert_eq!(tick(&mut e, f64::INFINITY), TickReport::default());
        assert_eq!(e.commits, 0.0);
    }

    proptest! {
        #[test]
        fn level_invariant_after_settle(xp in 0.0f64..1e9) {
            let mut e = EconomyState::default();
            gain_experience(&mut e, xp);
            let levels = settle_experience(&mut e);
            prop_assert!(e.experience >= 0.0);
            prop_assert!(e.experience < e.experience_to_next_level);
            prop_assert_eq!(e.click_base_power(), f64::from(e.level));
            prop_assert_eq!(levels.len() as u32, e.level - 1);
        }

        #[test]
        fn purchase_grows_cost(commits in 0.0f64..1e7, idx in 0usize..14) {
            let id = UpgradeId::ALL[idx];
            let mut s = GameState::default();
            s.economy.commits = commits;
            s.economy.level = 20;
            let before = s.holding(id);
            match purchase_upgrade(&mut s, id) {
                Ok(after) => {
                    prop_assert_eq!(after.cost, (before.cost * id.family().cost_growth()).floor());
                    prop_assert!(after.cost > before.cost);
                    prop_assert!(s.economy.commits >= 0.0);
                }
                Err(e) => {
                    prop_assert!(e.is_unaffordable());
                    prop_assert_eq!(s.holding(id), before);
                }
            }
        }
    }
}
