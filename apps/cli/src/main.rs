#![deny(warnings)]

//! Headless driver: load a save, catch up, play for a while, save again.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use idle_core::{BoostId, GameConfig, Millis, UpgradeId};
use idle_runtime::{Clock, Intent, ManualClock, Notification, Notifier, Session, SystemClock};
use persistence::{FileStorage, EXPORT_FILE_NAME};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    seconds: u64,
    offline_secs: u64,
    autoplay: bool,
    reset: bool,
    no_autosave: bool,
    export: Option<PathBuf>,
    json: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--save-dir" => args.save_dir = it.next().map(PathBuf::from),
            "--seconds" => args.seconds = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--offline-secs" => {
                args.offline_secs = it.next().and_then(|s| s.parse().ok()).unwrap_or(0)
            }
            "--autoplay" => args.autoplay = true,
            "--reset" => args.reset = true,
            "--no-autosave" => args.no_autosave = true,
            "--export" => {
                args.export = Some(
                    it.next()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME)),
                )
            }
            "--json" => args.json = true,
            "--version" => args.version = true,
            _ => {}
        }
    }
    args
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: GameConfig =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Greedy bot: click, then spend on whatever is cheapest and unlocked.
fn autoplay(session: &mut Session<FileStorage>, now: Millis) {
    let _ = session.dispatch(Intent::Click, now);

    let s = session.state();
    let e = &s.economy;
    let cheapest = UpgradeId::ALL
        .into_iter()
        .filter(|id| id.spec().unlock_level <= e.level && s.holding(*id).cost <= e.commits)
        .min_by(|a, b| s.holding(*a).cost.total_cmp(&s.holding(*b).cost));
    let boost = BoostId::ALL.into_iter().find(|id| {
        let spec = id.spec();
        spec.unlock_level <= e.level
            && spec.cost <= e.commits / 2.0
            && !s.boost_status(*id).cooldown_active()
            && !e.is_boost_active(*id)
    });
    let slot_free =
        s.repositories.pending_count() < session.game().repository_params().max_slots as usize;

    if let Some(id) = cheapest {
        let _ = session.dispatch(Intent::Buy(id), now);
    }
    if let Some(id) = boost {
        let _ = session.dispatch(Intent::Activate(id), now);
    }
    if slot_free {
        let _ = session.dispatch(Intent::CreateRepository, now);
    }
}

/// Prints notifications to stdout as they are forwarded.
struct Console;

impl Notifier for Console {
    fn notify(&mut self, n: Notification) {
        if n.details.is_empty() {
            println!("[{:?}] {}", n.severity, n.message);
        } else {
            println!("[{:?}] {} ({})", n.severity, n.message, n.details.join(", "));
        }
    }
}

fn timestamp(ms: Millis) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    if args.version {
        println!("idle-commits cli {}", env!("GIT_SHA"));
        return Ok(());
    }
    info!(?args, "starting CLI");

    let config = load_config(args.config.as_ref())?;
    let tick_ms = Millis::from(config.tick_ms);
    let save_dir = args.save_dir.unwrap_or_else(|| PathBuf::from("saves"));
    let offline_ms = Millis::try_from(args.offline_secs.saturating_mul(1000))?;
    let clock = ManualClock::new(SystemClock.now_ms() + offline_ms);

    let mut session = Session::open(FileStorage::new(&save_dir), config, clock.now_ms())?;
    if args.no_autosave {
        // Periodic saves off; the save on exit still happens.
        session.set_autosave(false, clock.now_ms());
    }
    if args.reset {
        session.reset(clock.now_ms())?;
    }

    let steps = args.seconds.saturating_mul(1000) / tick_ms.unsigned_abs();
    for _ in 0..steps {
        let now = clock.advance(tick_ms);
        if args.autoplay {
            autoplay(&mut session, now);
        }
        session.advance_to(now);
    }
    session.save();

    session.forward_notifications(&mut Console);

    let s = session.state();
    let e = &s.economy;
    let params = session.game().repository_params();
    if args.json {
        let status = serde_json::json!({
            "commits": e.commits.floor(),
            "commitsPerSecond": e.production_rate * e.boost_factor(),
            "level": e.level,
            "experience": e.experience.floor(),
            "experienceToNextLevel": e.experience_to_next_level,
            "clickPower": session.game().click_power(),
            "repositories": s.repositories.pending_count(),
            "maxSlots": params.max_slots,
            "lastUpdate": timestamp(s.last_update),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!(
            "Status | level: {} ({:.0}/{:.0} XP) | commits: {:.0} | rate: {:.1}/s | click: {} | repos: {}/{} | at: {}",
            e.level,
            e.experience,
            e.experience_to_next_level,
            e.commits,
            e.production_rate * e.boost_factor(),
            session.game().click_power(),
            s.repositories.pending_count(),
            params.max_slots,
            timestamp(s.last_update),
        );
    }

    if let Some(path) = args.export {
        match session.export()? {
            Some(blob) => {
                std::fs::write(&path, blob)
                    .with_context(|| format!("writing export {}", path.display()))?;
                println!("Exported save to {}", path.display());
            }
            None => println!("Nothing to export yet"),
        }
    }
    Ok(())
}
