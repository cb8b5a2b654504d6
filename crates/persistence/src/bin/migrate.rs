#![deny(warnings)]

//! Rewrites a save directory's blob in the current schema version.

use anyhow::{bail, Context};
use persistence::{FileStorage, SaveSlot, Storage, SAVE_KEY, SCHEMA_VERSION};

fn main() -> anyhow::Result<()> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| "./saves".to_string());
    let storage = FileStorage::new(&dir);
    let Some(blob) = storage.get(SAVE_KEY)? else {
        bail!("no save found at {}", storage.path_for(SAVE_KEY).display());
    };
    let before: serde_json::Value =
        serde_json::from_str(&blob).context("save is not valid JSON")?;
    let from_version = before.get("version").and_then(|v| v.as_u64()).unwrap_or(1);

    let mut slot = SaveSlot::new(storage);
    let state = slot
        .load()?
        .context("save disappeared while migrating")?;
    slot.save(&state)?;
    println!(
        "Migrated {} from v{} to v{} (level {}, {:.0} commits)",
        slot.storage().path_for(SAVE_KEY).display(),
        from_version,
        SCHEMA_VERSION,
        state.economy.level,
        state.economy.commits
    );
    Ok(())
}
