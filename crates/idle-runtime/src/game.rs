//! The explicit game context: state, timers, randomness and the outbox.

use idle_core::catalog::AUTO_SPAWN_INTERVAL_MS;
use idle_core::{BoostId, CommandError, GameConfig, GameState, Holding, Millis, UpgradeId};
use idle_econ::{
    effective_click_power, recompute_aggregates, repository_params, settle_experience,
    ClickOutcome, RepositoryParams,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::notify::{Notification, Notifier, Severity};
use crate::repository::{self, Collected};
use crate::timers::{TimerId, TimerKind, TimerQueue};
use crate::RuntimeError;

/// What a call to [`Game::advance_to`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceReport {
    pub ticks: u32,
    pub produced: f64,
    pub levels: Vec<u32>,
    pub expired: Vec<BoostId>,
    pub repositories_completed: u32,
    pub repositories_spawned: u32,
    pub cooldowns_cleared: Vec<BoostId>,
    /// At least one autosave timer fired.
    pub autosave_due: bool,
}

pub struct Game {
    pub(crate) state: GameState,
    pub(crate) config: GameConfig,
    pub(crate) rng: ChaCha8Rng,
    timers: TimerQueue,
    autosave: Option<TimerId>,
    autosave_enabled: bool,
    outbox: Vec<Notification>,
}

impl Game {
    /// Fresh game with timers armed from `now`.
    pub fn new(config: GameConfig, now: Millis) -> Result<Self, RuntimeError> {
        let mut game = Self::from_state(GameState::new(now), config)?;
        game.start(now);
        Ok(game)
    }

    /// Wrap a loaded state without arming timers.
    ///
    /// Derived aggregates are rebuilt and pending experience is settled
    /// silently. Call [`Game::resume`] or [`Game::start`] next.
    pub fn from_state(mut state: GameState, config: GameConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        recompute_aggregates(&mut state);
        settle_experience(&mut state.economy);
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            state,
            config,
            rng,
            timers: TimerQueue::new(),
            autosave: None,
            autosave_enabled: true,
            outbox: Vec::new(),
        })
    }

    /// (Re)arm every timer relative to `now`.
    ///
    /// Cooldowns that ended before `now` are lifted immediately.
    pub fn start(&mut self, now: Millis) {
        self.timers.cancel_all();
        self.timers
            .schedule(now + Millis::from(self.config.tick_ms), TimerKind::Tick);
        self.autosave = None;
        if self.autosave_enabled {
            self.arm_autosave(now);
        }
        for (id, status) in self.state.boosts.iter_mut() {
            match status.cooldown_until {
                Some(until) if until <= now => status.cooldown_until = None,
                Some(until) => {
                    self.timers.schedule(until, TimerKind::CooldownClear(*id));
                }
                None => {}
            }
        }
        if repository_params(&self.state).automation {
            self.arm_auto_spawn(now);
        }
    }

    /// Drop every pending timer.
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.autosave = None;
    }

    fn arm_autosave(&mut self, from: Millis) {
        let due = from + Millis::from(self.config.autosave_ms);
        self.autosave = Some(self.timers.schedule(due, TimerKind::Autosave));
    }

    /// Turn periodic autosave requests on or off.
    ///
    /// Disabling cancels the pending request. Enabling arms a fresh one a
    /// full period after `now`.
    pub fn set_autosave(&mut self, enabled: bool, now: Millis) {
        self.autosave_enabled = enabled;
        match (enabled, self.autosave) {
            (false, Some(id)) => {
                self.timers.cancel(id);
                self.autosave = None;
                debug!("autosave disabled");
            }
            (true, None) => {
                self.arm_autosave(now);
                debug!("autosave enabled");
            }
            _ => {}
        }
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave_enabled
    }

    fn arm_auto_spawn(&mut self, now: Millis) {
        let due = *self
            .state
            .repositories
            .next_auto_spawn_at
            .get_or_insert(now + AUTO_SPAWN_INTERVAL_MS);
        self.timers.schedule(due, TimerKind::AutoSpawn);
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn click_power(&self) -> f64 {
        effective_click_power(&self.state.economy)
    }

    pub fn repository_params(&self) -> RepositoryParams {
        repository_params(&self.state)
    }

    pub fn next_timer_due(&mut self) -> Option<Millis> {
        self.timers.next_due()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Log and queue a notification for the UI.
    pub fn notify(&mut self, n: Notification) {
        n.log();
        self.outbox.push(n);
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    /// Hand queued notifications to `sink`, oldest first. Returns how many.
    pub fn forward_notifications<N: Notifier + ?Sized>(&mut self, sink: &mut N) -> usize {
        let notes = self.drain_notifications();
        let count = notes.len();
        for n in notes {
            sink.notify(n);
        }
        count
    }

    fn announce_levels(&mut self, levels: &[u32]) {
        for &level in levels {
            info!(level, "level up");
            self.notify(
                Notification::new(format!("Level up! You reached level {level}"), Severity::LevelUp)
                    .with_detail(format!("Base click power is now {level}")),
            );
        }
    }

    fn announce_collected(&mut self, c: &Collected) {
        if c.is_empty() {
            return;
        }
        let message = match c.names.as_slice() {
            [one] => format!("Repository {one} is finished"),
            many => format!("{} repositories finished", many.len()),
        };
        self.notify(Notification::new(message, Severity::Default).with_details([
            format!("+{} commits", c.commits.floor()),
            format!("+{} XP", c.experience.floor()),
        ]));
    }

    pub fn click(&mut self) -> ClickOutcome {
        let out = idle_econ::apply_click(&mut self.state.economy, &mut self.rng);
        self.announce_levels(&out.levels);
        out
    }

    pub fn purchase(&mut self, id: UpgradeId, now: Millis) -> Result<Holding, CommandError> {
        let had_automation = repository_params(&self.state).automation;
        let holding = idle_econ::purchase_upgrade(&mut self.state, id)?;
        if !had_automation && repository_params(&self.state).automation {
            self.arm_auto_spawn(now);
        }
        Ok(holding)
    }

    pub fn activate_boost(&mut self, id: BoostId, now: Millis) -> Result<(), CommandError> {
        let boost = idle_econ::activate_boost(&mut self.state, id, now)?;
        if let Some(until) = self.state.boost_status(id).cooldown_until {
            self.timers.schedule(until, TimerKind::CooldownClear(id));
        }
        self.notify(
            Notification::new(format!("{id} activated"), Severity::Boost).with_detail(format!(
                "x{} for {}s",
                boost.multiplier, boost.duration_secs
            )),
        );
        Ok(())
    }

    pub fn create_repository(&mut self, now: Millis) -> Result<u64, CommandError> {
        repository::create_job(&mut self.state, now, &mut self.rng)
    }

    /// Fire every timer due at or before `now`, in order.
    pub fn advance_to(&mut self, now: Millis) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        while let Some((due, kind)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Tick => {
                    self.run_tick(due, &mut report);
                    self.timers
                        .schedule(due + Millis::from(self.config.tick_ms), TimerKind::Tick);
                }
                TimerKind::CooldownClear(id) => {
                    self.state.boosts.entry(id).or_default().cooldown_until = None;
                    debug!(boost = id.key(), "cooldown cleared");
                    report.cooldowns_cleared.push(id);
                }
                TimerKind::AutoSpawn => self.run_auto_spawn(due, &mut report),
                TimerKind::Autosave => {
                    report.autosave_due = true;
                    self.arm_autosave(due);
                }
            }
        }
        report
    }

    fn run_tick(&mut self, at: Millis, report: &mut AdvanceReport) {
        let tick = idle_econ::tick(&mut self.state.economy, self.config.tick_secs());
        for id in &tick.expired {
            self.notify(Notification::new(format!("{id} wore off"), Severity::Default));
        }
        let collected = repository::advance_and_collect(&mut self.state, at);
        let mut levels = tick.levels;
        levels.extend(settle_experience(&mut self.state.economy));
        self.announce_collected(&collected);
        self.announce_levels(&levels);
        self.state.last_update = at;

        report.ticks += 1;
        report.produced += tick.produced;
        report.expired.extend(tick.expired);
        report.repositories_completed += collected.names.len() as u32;
        report.levels.extend(levels);
    }

    fn run_auto_spawn(&mut self, at: Millis, report: &mut AdvanceReport) {
        if !repository_params(&self.state).automation {
            self.state.repositories.next_auto_spawn_at = None;
            return;
        }
        let collected = repository::advance_and_collect(&mut self.state, at);
        let levels = settle_experience(&mut self.state.economy);
        self.announce_collected(&collected);
        self.announce_levels(&levels);
        report.repositories_completed += collected.names.len() as u32;
        report.levels.extend(levels);

        match repository::create_job(&mut self.state, at, &mut self.rng) {
            Ok(id) => {
                debug!(id, "repository auto-spawned");
                report.repositories_spawned += 1;
            }
            Err(e) => debug!(error = %e, "auto-spawn skipped"),
        }
        let next = at + AUTO_SPAWN_INTERVAL_MS;
        self.state.repositories.next_auto_spawn_at = Some(next);
        self.timers.schedule(next, TimerKind::AutoSpawn);
    }
}
