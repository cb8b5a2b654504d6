//! Repository builds: bounded concurrent jobs with independent timers.
//!
//! All functions take explicit timestamps, so the same code serves live
//! ticks and the offline replay (which runs on a relative timeline).

use idle_core::{CommandError, GameState, Millis, RepositoryJob, RepositoryState};
use idle_econ::{gain_experience, repository_params, repository_xp};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

const NAMES: &[&str] = &[
    "dotfiles",
    "todo-app",
    "awesome-list",
    "left-pad",
    "hello-world",
    "blog-engine",
    "game-of-life",
    "url-shortener",
    "weather-cli",
    "chat-bot",
    "static-site",
    "yet-another-framework",
];

/// Rewards paid out by one collection pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collected {
    pub names: Vec<String>,
    pub commits: f64,
    pub experience: f64,
}

impl Collected {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn absorb(&mut self, other: Collected) {
        self.names.extend(other.names);
        self.commits += other.commits;
        self.experience += other.experience;
    }
}

/// Start a build at `now` if a slot is free.
pub fn create_job<R: Rng>(
    state: &mut GameState,
    now: Millis,
    rng: &mut R,
) -> Result<u64, CommandError> {
    let params = repository_params(state);
    if state.repositories.pending_count() >= params.max_slots as usize {
        return Err(CommandError::NoSlotAvailable {
            max_slots: params.max_slots,
        });
    }
    let repos = &mut state.repositories;
    let id = repos.next_id;
    repos.next_id += 1;
    let base = NAMES.choose(rng).copied().unwrap_or("repo");
    let job = RepositoryJob {
        id,
        name: format!("{base}-{id}"),
        started_at: now,
        duration_ms: params.duration_ms(),
        progress: 0.0,
        completed: false,
    };
    debug!(id, name = %job.name, duration_ms = job.duration_ms, "repository started");
    repos.jobs.push(job);
    Ok(id)
}

fn progress_at(job: &RepositoryJob, now: Millis) -> f64 {
    let elapsed = now.saturating_sub(job.started_at).max(0) as f64;
    (elapsed / job.duration_ms as f64 * 100.0).min(100.0)
}

/// Update progress of pending jobs; returns how many finished at `now`.
pub fn advance(repos: &mut RepositoryState, now: Millis) -> usize {
    let mut finished = 0;
    for job in repos.jobs.iter_mut().filter(|j| !j.completed) {
        if now >= job.finishes_at() {
            job.progress = 100.0;
            job.completed = true;
            finished += 1;
        } else {
            job.progress = progress_at(job, now);
        }
    }
    finished
}

/// Pay out and remove every completed job. Experience is added but not settled.
pub fn collect_completed(state: &mut GameState) -> Collected {
    let output = repository_params(state).output();
    let xp = repository_xp(output);
    let mut collected = Collected::default();
    state.repositories.jobs.retain(|j| {
        if j.completed {
            collected.names.push(j.name.clone());
            false
        } else {
            true
        }
    });
    let n = collected.names.len() as f64;
    collected.commits = output * n;
    collected.experience = xp * n;
    state.economy.commits += collected.commits;
    gain_experience(&mut state.economy, collected.experience);
    collected
}

/// Advance to `now` and collect in one step.
pub fn advance_and_collect(state: &mut GameState, now: Millis) -> Collected {
    if advance(&mut state.repositories, now) == 0
        && !state.repositories.jobs.iter().any(|j| j.completed)
    {
        return Collected::default();
    }
    collect_completed(state)
}

/// What an offline replay did to the repositories.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Replay {
    pub collected: Collected,
    pub spawned: u32,
}

/// Replay `window` milliseconds of builds and automatic spawns, then rebase
/// every timestamp so the end of the window lands on `now`.
///
/// Pending jobs keep the time they already spent building (derived from
/// their progress). Completions and spawns interleave in time order, and a
/// spawn only happens when a slot is free at its due time.
pub fn replay<R: Rng>(
    state: &mut GameState,
    last_update: Millis,
    window: Millis,
    now: Millis,
    rng: &mut R,
) -> Replay {
    let params = repository_params(state);
    for job in state.repositories.jobs.iter_mut() {
        let spent = if job.completed {
            job.duration_ms
        } else {
            (job.progress / 100.0 * job.duration_ms as f64).round() as Millis
        };
        job.started_at = -spent;
    }
    let mut next_spawn = params.automation.then(|| {
        state
            .repositories
            .next_auto_spawn_at
            .map_or(idle_core::catalog::AUTO_SPAWN_INTERVAL_MS, |t| {
                (t - last_update).max(0)
            })
    });

    let mut out = Replay::default();
    loop {
        let due = next_spawn.filter(|t| *t <= window);
        let horizon = due.unwrap_or(window);
        out.collected.absorb(advance_and_collect(state, horizon));
        let Some(t) = due else { break };
        if create_job(state, t, rng).is_ok() {
            out.spawned += 1;
        }
        next_spawn = Some(t + idle_core::catalog::AUTO_SPAWN_INTERVAL_MS);
    }

    let shift = now - window;
    for job in state.repositories.jobs.iter_mut() {
        job.started_at += shift;
    }
    if params.automation {
        state.repositories.next_auto_spawn_at = next_spawn.map(|t| t + shift);
    }
    out
}
