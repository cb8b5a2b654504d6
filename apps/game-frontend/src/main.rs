#![deny(warnings)]

//! Headless HUD: the game session driven by a Bevy ECS schedule.

use bevy_ecs::prelude::*;
use idle_core::{GameConfig, Millis};
use idle_runtime::{Intent, Notification, Notifier, Session};
use persistence::MemoryStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Resource)]
struct GameSession(Session<MemoryStorage>);

#[derive(Resource)]
struct SimClock {
    now: Millis,
    frame_ms: Millis,
}

/// Intents queued by the UI since the last frame.
#[derive(Resource, Default)]
struct PendingIntents(Vec<Intent>);

#[derive(Clone, Debug)]
struct Toast {
    notification: Notification,
    shown_at: Millis,
}

#[derive(Resource, Default)]
struct HudState {
    commits: f64,
    rate: f64,
    level: u32,
    experience: f64,
    experience_to_next_level: f64,
    click_power: f64,
    repositories: String,
    toasts: Vec<Toast>,
    /// Frame time new toasts are stamped with.
    now: Millis,
}

impl HudState {
    /// Close a sticky toast.
    fn dismiss(&mut self, index: usize) {
        if index < self.toasts.len() {
            self.toasts.remove(index);
        }
    }
}

impl Notifier for HudState {
    fn notify(&mut self, notification: Notification) {
        self.toasts.push(Toast {
            notification,
            shown_at: self.now,
        });
    }
}

fn advance_clock_system(mut clock: ResMut<SimClock>) {
    clock.now += clock.frame_ms;
}

fn apply_intents_system(
    mut intents: ResMut<PendingIntents>,
    mut session: ResMut<GameSession>,
    clock: Res<SimClock>,
) {
    for intent in intents.0.drain(..) {
        // Refusals surface as error toasts.
        let _ = session.0.dispatch(intent, clock.now);
    }
}

fn advance_game_system(mut session: ResMut<GameSession>, clock: Res<SimClock>) {
    session.0.advance_to(clock.now);
}

fn toast_system(mut session: ResMut<GameSession>, mut hud: ResMut<HudState>, clock: Res<SimClock>) {
    let now = clock.now;
    hud.now = now;
    session.0.forward_notifications(&mut *hud);
    hud.toasts.retain(|t| match t.notification.severity.auto_dismiss_after() {
        Some(after) => now - t.shown_at < after.as_millis() as Millis,
        None => true,
    });
}

fn refresh_hud_system(session: Res<GameSession>, mut hud: ResMut<HudState>) {
    let game = session.0.game();
    let s = game.state();
    let e = &s.economy;
    hud.commits = e.commits.floor();
    hud.rate = e.production_rate * e.boost_factor();
    hud.level = e.level;
    hud.experience = e.experience.floor();
    hud.experience_to_next_level = e.experience_to_next_level;
    hud.click_power = game.click_power();
    hud.repositories = format!(
        "{}/{}",
        s.repositories.pending_count(),
        game.repository_params().max_slots
    );
}

fn build(config: GameConfig, start: Millis) -> Result<(World, Schedule), idle_runtime::RuntimeError> {
    let frame_ms = Millis::from(config.tick_ms);
    let session = Session::open(MemoryStorage::new(), config, start)?;
    let mut world = World::new();
    world.insert_resource(GameSession(session));
    world.insert_resource(SimClock {
        now: start,
        frame_ms,
    });
    world.insert_resource(PendingIntents::default());
    world.insert_resource(HudState::default());
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            advance_clock_system,
            apply_intents_system,
            advance_game_system,
            toast_system,
            refresh_hud_system,
        )
            .chain(),
    );
    Ok((world, schedule))
}

fn main() -> Result<(), idle_runtime::RuntimeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (mut world, mut schedule) = build(GameConfig::default(), 0)?;
    // Ten seconds of frames with a click on every other one.
    for frame in 0..100 {
        if frame % 2 == 0 {
            world.resource_mut::<PendingIntents>().0.push(Intent::Click);
        }
        schedule.run(&mut world);
    }
    let mut hud = world.resource_mut::<HudState>();
    info!(level = hud.level, commits = hud.commits, "headless run finished");
    println!(
        "game-frontend: HUD ready | commits={} level={} xp={}/{} click={} repos={}",
        hud.commits,
        hud.level,
        hud.experience,
        hud.experience_to_next_level,
        hud.click_power,
        hud.repositories,
    );
    while let Some(toast) = hud.toasts.first().cloned() {
        println!("  toast [{:?}] {}", toast.notification.severity, toast.notification.message);
        hud.dismiss(0);
    }
    Ok(())
}
