//! Eligibility rules and derived aggregates shared by all upgrade families.

use idle_core::catalog::REPOSITORY_BASE_SLOTS;
use idle_core::{
    CommandError, DenyReason, EconomyState, Effect, GameState, RepositoryEffect, UpgradeId,
};

/// Check affordability and level unlock together.
///
/// Both failures are collected so the caller can report them at once.
pub fn check_eligibility(
    target: &str,
    cost: f64,
    unlock_level: u32,
    e: &EconomyState,
) -> Result<(), CommandError> {
    let mut reasons = Vec::new();
    if e.commits < cost {
        reasons.push(DenyReason::Unaffordable {
            cost,
            available: e.commits,
        });
    }
    if e.level < unlock_level {
        reasons.push(DenyReason::LevelLocked {
            required: unlock_level,
            current: e.level,
        });
    }
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Denied {
            target: target.to_string(),
            reasons,
        })
    }
}

/// Rebuild production rate, XP rate and click multiplier from the ledger.
///
/// Always computed from scratch so repeated purchases cannot drift.
pub fn recompute_aggregates(state: &mut GameState) {
    let mut rate = 0.0;
    let mut xp_rate = 0.0;
    let mut click = 1.0;
    for id in UpgradeId::ALL {
        let count = f64::from(state.count(id));
        if count == 0.0 {
            continue;
        }
        match id.spec().effect {
            Effect::Production {
                rate: r,
                xp_rate: x,
            } => {
                rate += count * r;
                xp_rate += count * x;
            }
            Effect::Click { multiplier } => click += count * multiplier,
            Effect::Repository(_) => {}
        }
    }
    let e = &mut state.economy;
    e.production_rate = rate;
    e.xp_rate = xp_rate;
    e.click_multiplier = click;
}

/// Repository parameters implied by the purchased repository upgrades.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepositoryParams {
    /// Summed build-time reduction before the cap.
    pub speed_bonus: f64,
    /// Summed output bonus.
    pub output_bonus: f64,
    pub max_slots: u32,
    pub automation: bool,
}

impl RepositoryParams {
    pub fn duration_ms(&self) -> idle_core::Millis {
        crate::creation_duration_ms(self.speed_bonus)
    }

    pub fn output(&self) -> f64 {
        crate::repository_output(self.output_bonus)
    }
}

pub fn repository_params(state: &GameState) -> RepositoryParams {
    let mut p = RepositoryParams {
        speed_bonus: 0.0,
        output_bonus: 0.0,
        max_slots: REPOSITORY_BASE_SLOTS,
        automation: false,
    };
    for id in UpgradeId::ALL {
        let count = state.count(id);
        if count == 0 {
            continue;
        }
        if let Effect::Repository(effect) = id.spec().effect {
            match effect {
                RepositoryEffect::CreationSpeed(v) => p.speed_bonus += f64::from(count) * v,
                RepositoryEffect::Output(v) => p.output_bonus += f64::from(count) * v,
                RepositoryEffect::Slots(n) => {
                    p.max_slots = p.max_slots.saturating_add(n.saturating_mul(count))
                }
                RepositoryEffect::Automation => p.automation = true,
            }
        }
    }
    p
}
