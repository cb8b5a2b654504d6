#![deny(warnings)]

//! Economic models for the idle commits game.
//!
//! This crate provides the arithmetic behind the economy:
//! - Cost growth per purchase and the XP threshold curve
//! - Click power and click XP
//! - Composition of temporary boosts, including exact piecewise integration
//!   of boosted production over an interval
//! - Repository build time, output and reward formulas
//!
//! The [`rules`] module holds the eligibility checks and aggregate
//! recomputation shared by every upgrade family, and [`commands`] applies
//! player intents and scheduler ticks to a [`idle_core::GameState`].

pub mod commands;
pub mod rules;

pub use commands::{
    activate_boost, apply_click, decay_boosts, gain_experience, purchase_upgrade,
    settle_experience, tick, ClickOutcome, TickReport,
};
pub use rules::{check_eligibility, recompute_aggregates, repository_params, RepositoryParams};

use idle_core::catalog::{REPOSITORY_BASE_CREATION_MS, REPOSITORY_BASE_OUTPUT};
use idle_core::{ActiveBoost, EconomyState, Millis};

/// Growth of the XP threshold per level.
pub const XP_THRESHOLD_GROWTH: f64 = 1.5;
/// Largest total build-time reduction speed upgrades can reach.
pub const MAX_SPEED_REDUCTION: f64 = 0.8;
/// Remaining boost time at or below which a boost counts as expired.
pub const EXPIRY_EPSILON: f64 = 1e-9;

/// Price after one purchase: `floor(cost * growth)`.
///
/// Example:
/// assert_eq!(next_cost(10.0, 1.15), 11.0);
pub fn next_cost(cost: f64, growth: f64) -> f64 {
    (cost * growth).floor()
}

/// Threshold for the level after the one `threshold` leads to. Never below one.
pub fn next_xp_threshold(threshold: f64) -> f64 {
    (threshold * XP_THRESHOLD_GROWTH).floor().max(1.0)
}

/// XP for one click given the random base roll in 1..=5.
pub fn click_xp(base_roll: u32, level: u32) -> f64 {
    f64::from(base_roll) + (f64::from(level) * 0.5).floor()
}

/// Commits per click: `floor(level * click_multiplier * boosts)`.
///
/// Recomputed on every call so expired boosts never linger.
pub fn effective_click_power(e: &EconomyState) -> f64 {
    (e.click_base_power() * e.click_multiplier * e.boost_factor()).floor()
}

/// Production over `secs` seconds while the given boosts run down.
///
/// Boosts are split into segments at each expiry point so the result matches
/// stepping the scheduler in small ticks.
pub fn boosted_production(rate: f64, boosts: &[ActiveBoost], secs: f64) -> f64 {
    if !(rate > 0.0 && secs > 0.0 && secs.is_finite()) {
        return 0.0;
    }
    let mut by_expiry: Vec<(f64, f64)> = boosts
        .iter()
        .filter(|b| b.remaining_secs > EXPIRY_EPSILON)
        .map(|b| (b.remaining_secs, b.multiplier))
        .collect();
    by_expiry.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut total = 0.0;
    let mut t = 0.0;
    for (i, &(ends_at, _)) in by_expiry.iter().enumerate() {
        let factor: f64 = by_expiry[i..].iter().map(|(_, m)| m).product();
        let end = ends_at.min(secs);
        total += rate * factor * (end - t);
        t = end;
        if t >= secs {
            return total;
        }
    }
    total + rate * (secs - t)
}

/// Build time of a new repository given the summed speed bonus.
pub fn creation_duration_ms(speed_bonus: f64) -> Millis {
    let reduction = speed_bonus.clamp(0.0, MAX_SPEED_REDUCTION);
    (REPOSITORY_BASE_CREATION_MS as f64 * (1.0 - reduction)).round() as Millis
}

/// Commits paid out by a finished repository given the summed output bonus.
pub fn repository_output(output_bonus: f64) -> f64 {
    REPOSITORY_BASE_OUTPUT * (1.0 + output_bonus.max(0.0))
}

/// XP paid out alongside a repository's commits; never below 1.
pub fn repository_xp(output: f64) -> f64 {
    (output * 0.5).floor().max(1.0)
}
