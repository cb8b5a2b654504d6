//! Catch-up for time spent away, computed in one shot.
//!
//! The result matches running the scheduler over the same window: production
//! is integrated piecewise across boost expiries, repository completions and
//! auto-spawns are replayed in time order, and experience is settled once.

use idle_core::{BoostId, Millis, OfflineBoostPolicy};
use idle_econ::{boosted_production, decay_boosts, gain_experience, settle_experience};
use serde::Serialize;
use tracing::info;

use crate::game::Game;
use crate::notify::{Notification, Severity};
use crate::repository;

/// Aggregate outcome of one reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSummary {
    /// Wall-clock time since the last update.
    pub elapsed_ms: Millis,
    /// Portion of `elapsed_ms` that was credited.
    pub credited_ms: Millis,
    pub commits_gained: f64,
    pub experience_gained: f64,
    pub jobs_completed: u32,
    pub jobs_spawned: u32,
    pub levels_gained: u32,
    pub boosts_expired: Vec<BoostId>,
}

impl OfflineSummary {
    pub fn capped(&self) -> bool {
        self.credited_ms < self.elapsed_ms
    }

    /// True when nothing worth telling the player happened.
    pub fn is_empty(&self) -> bool {
        self.commits_gained <= 0.0
            && self.experience_gained <= 0.0
            && self.jobs_completed == 0
            && self.levels_gained == 0
    }

    pub fn to_notification(&self) -> Notification {
        let mut details = vec![
            format!("+{} commits", self.commits_gained.floor()),
            format!("+{} XP", self.experience_gained.floor()),
        ];
        if self.jobs_completed > 0 {
            details.push(format!("{} repositories finished", self.jobs_completed));
        }
        if self.levels_gained > 0 {
            details.push(format!("{} levels gained", self.levels_gained));
        }
        if self.capped() {
            details.push(format!("only the last {} were counted", human(self.credited_ms)));
        }
        let message = format!("Welcome back! You were away for {}", human(self.elapsed_ms));
        Notification::new(message, Severity::Default).with_details(details)
    }
}

fn human(ms: Millis) -> String {
    let secs = ms / 1000;
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

impl Game {
    /// Credit the time between the last update and `now` without ticking.
    pub fn reconcile(&mut self, now: Millis) -> OfflineSummary {
        let last = self.state.last_update;
        let elapsed = now.saturating_sub(last).max(0);
        let window = elapsed.min(self.config.offline_cap_ms());
        let mut summary = OfflineSummary {
            elapsed_ms: elapsed,
            credited_ms: window,
            ..OfflineSummary::default()
        };
        if window == 0 {
            self.state.last_update = self.state.last_update.max(now);
            return summary;
        }
        let secs = window as f64 / 1000.0;

        let e = &mut self.state.economy;
        let level_before = e.level;
        summary.commits_gained = match self.config.offline_boosts {
            OfflineBoostPolicy::Replay => {
                let produced = boosted_production(e.production_rate, &e.active_boosts, secs);
                summary.boosts_expired = decay_boosts(e, secs);
                produced
            }
            OfflineBoostPolicy::Discard => {
                summary.boosts_expired = e.active_boosts.drain(..).map(|b| b.id).collect();
                e.production_rate * secs
            }
        };
        e.commits += summary.commits_gained;
        summary.experience_gained = e.xp_rate * secs;
        gain_experience(e, summary.experience_gained);

        let replay = repository::replay(&mut self.state, last, window, now, &mut self.rng);
        summary.commits_gained += replay.collected.commits;
        summary.experience_gained += replay.collected.experience;
        summary.jobs_completed = replay.collected.names.len() as u32;
        summary.jobs_spawned = replay.spawned;

        let levels = settle_experience(&mut self.state.economy);
        summary.levels_gained = self.state.economy.level - level_before;
        if !self.config.silent_offline_level_ups {
            for level in levels {
                self.notify(Notification::new(
                    format!("Level up! You reached level {level}"),
                    Severity::LevelUp,
                ));
            }
        }
        self.state.last_update = now;
        info!(
            elapsed_ms = summary.elapsed_ms,
            credited_ms = summary.credited_ms,
            commits = summary.commits_gained,
            jobs = summary.jobs_completed,
            levels = summary.levels_gained,
            "offline progress applied"
        );
        summary
    }

    /// Reconcile, post the consolidated summary, then arm timers from `now`.
    pub fn resume(&mut self, now: Millis) -> OfflineSummary {
        let summary = self.reconcile(now);
        if !summary.is_empty() {
            self.notify(summary.to_notification());
        }
        self.start(now);
        summary
    }
}
