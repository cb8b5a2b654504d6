//! JSON save format.
//!
//! The blob is a single camelCase object. Loading merges whatever the blob
//! contains onto a serialized default game field by field, so older or
//! partial saves keep every value they do carry and default the rest.

use idle_core::{
    validate_state, ActiveBoost, BoostId, BoostStatus, GameState, Holding, Millis, RepositoryJob,
    RepositoryState, UpgradeFamily, UpgradeId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::PersistError;

/// Current layout version written by [`encode`].
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub count: u32,
    pub cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostRecord {
    pub cooldown_until: Option<Millis>,
}

/// On-disk representation of a [`GameState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub version: u32,
    pub commits: f64,
    pub commits_per_second: f64,
    pub xp_per_second: f64,
    pub level: u32,
    pub experience: f64,
    pub experience_to_next_level: f64,
    pub click_multiplier: f64,
    /// Production upgrades keyed by id.
    pub upgrades: BTreeMap<String, HoldingRecord>,
    pub click_upgrades: BTreeMap<String, HoldingRecord>,
    pub repository_upgrades: BTreeMap<String, HoldingRecord>,
    pub boosts: BTreeMap<String, BoostRecord>,
    pub active_boosts: Vec<ActiveBoost>,
    pub repositories: Vec<RepositoryJob>,
    pub next_repository_id: u64,
    pub next_auto_spawn_at: Option<Millis>,
    pub last_update: Millis,
}

impl SaveFile {
    pub fn from_state(s: &GameState) -> Self {
        let mut upgrades = BTreeMap::new();
        let mut click_upgrades = BTreeMap::new();
        let mut repository_upgrades = BTreeMap::new();
        for id in UpgradeId::ALL {
            let h = s.holding(id);
            let rec = HoldingRecord {
                count: h.count,
                cost: h.cost,
            };
            let target = match id.family() {
                UpgradeFamily::Production => &mut upgrades,
                UpgradeFamily::Click => &mut click_upgrades,
                UpgradeFamily::Repository => &mut repository_upgrades,
            };
            target.insert(id.key().to_string(), rec);
        }
        let boosts = BoostId::ALL
            .into_iter()
            .map(|id| {
                (
                    id.key().to_string(),
                    BoostRecord {
                        cooldown_until: s.boost_status(id).cooldown_until,
                    },
                )
            })
            .collect();
        let e = &s.economy;
        Self {
            version: SCHEMA_VERSION,
            commits: e.commits,
            commits_per_second: e.production_rate,
            xp_per_second: e.xp_rate,
            level: e.level,
            experience: e.experience,
            experience_to_next_level: e.experience_to_next_level,
            click_multiplier: e.click_multiplier,
            upgrades,
            click_upgrades,
            repository_upgrades,
            boosts,
            active_boosts: e.active_boosts.clone(),
            repositories: s.repositories.jobs.clone(),
            next_repository_id: s.repositories.next_id,
            next_auto_spawn_at: s.repositories.next_auto_spawn_at,
            last_update: s.last_update,
        }
    }

    /// Rebuild the typed state. Ids the catalog no longer knows are skipped.
    pub fn into_state(self) -> GameState {
        let mut state = GameState::new(self.last_update);
        let holdings = self
            .upgrades
            .into_iter()
            .chain(self.click_upgrades)
            .chain(self.repository_upgrades);
        for (key, rec) in holdings {
            match UpgradeId::from_key(&key) {
                Some(id) => {
                    state.upgrades.insert(
                        id,
                        Holding {
                            count: rec.count,
                            cost: rec.cost,
                        },
                    );
                }
                None => warn!(upgrade = %key, "skipping unknown upgrade in save"),
            }
        }
        for (key, rec) in self.boosts {
            match BoostId::from_key(&key) {
                Some(id) => {
                    state.boosts.insert(
                        id,
                        BoostStatus {
                            cooldown_until: rec.cooldown_until,
                        },
                    );
                }
                None => warn!(boost = %key, "skipping unknown boost in save"),
            }
        }
        let e = &mut state.economy;
        e.commits = self.commits;
        e.production_rate = self.commits_per_second;
        e.xp_rate = self.xp_per_second;
        e.level = self.level;
        e.experience = self.experience;
        e.experience_to_next_level = self.experience_to_next_level;
        e.click_multiplier = self.click_multiplier;
        e.active_boosts = self.active_boosts;
        state.repositories = RepositoryState {
            jobs: self.repositories,
            next_id: self.next_repository_id,
            next_auto_spawn_at: self.next_auto_spawn_at,
        };
        // Saves written before the counter existed carry jobs without it.
        state.repositories.repair_next_id();
        state
    }
}

/// Serialize a state into the save blob.
pub fn encode(state: &GameState) -> Result<String, PersistError> {
    serde_json::to_string(&SaveFile::from_state(state))
        .map_err(|e| PersistError::CorruptSave(format!("cannot encode state: {e}")))
}

/// Parse a save blob, filling anything it lacks from a fresh game.
pub fn decode(blob: &str) -> Result<GameState, PersistError> {
    let saved: Value = serde_json::from_str(blob)
        .map_err(|e| PersistError::CorruptSave(format!("unparseable save: {e}")))?;
    let Value::Object(saved) = saved else {
        return Err(PersistError::CorruptSave("save is not a JSON object".into()));
    };
    if !saved.contains_key("version") {
        info!("loading legacy save without a version field");
    }

    let mut merged = serde_json::to_value(SaveFile::from_state(&GameState::default()))
        .map_err(|e| PersistError::CorruptSave(format!("cannot build defaults: {e}")))?;
    if let Value::Object(base) = &mut merged {
        merge_into(base, saved);
    }
    let file: SaveFile = serde_json::from_value(merged)
        .map_err(|e| PersistError::CorruptSave(format!("bad field in save: {e}")))?;
    let state = file.into_state();
    validate_state(&state).map_err(|e| PersistError::CorruptSave(e.to_string()))?;
    Ok(state)
}

/// Recursively overlay `patch` onto `base`. Objects merge key by key; every
/// other value replaces the default. A `null` never overrides a default.
fn merge_into(base: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (base.get_mut(&key), value) {
            (_, Value::Null) => {}
            (Some(Value::Object(b)), Value::Object(p)) => merge_into(b, p),
            (_, v) => {
                base.insert(key, v);
            }
        }
    }
}

/// Re-indent a stored blob for download; the live state is not involved.
pub fn pretty(blob: &str) -> Result<String, PersistError> {
    let value: Value = serde_json::from_str(blob)
        .map_err(|e| PersistError::CorruptSave(format!("unparseable save: {e}")))?;
    serde_json::to_string_pretty(&value)
        .map_err(|e| PersistError::CorruptSave(format!("cannot format save: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encoded_state_decodes_unchanged() {
        let mut s = GameState::new(1_700_000_000_000);
        s.economy.commits = 1234.5;
        s.economy.level = 4;
        s.economy.active_boosts.push(ActiveBoost::start(BoostId::Hackathon));
        s.upgrades.insert(UpgradeId::Intern, Holding { count: 2, cost: 13.0 });
        s.boosts.insert(
            BoostId::Hackathon,
            BoostStatus {
                cooldown_until: Some(1_700_000_300_000),
            },
        );
        s.repositories.jobs.push(RepositoryJob {
            id: 7,
            name: "left-pad".into(),
            started_at: 1_699_999_990_000,
            duration_ms: 60_000,
            progress: 16.0,
            completed: false,
        });
        s.repositories.next_id = 8;
        let blob = encode(&s).unwrap();
        assert_eq!(decode(&blob).unwrap(), s);
    }

    #[test]
    fn blob_groups_upgrades_by_family() {
        let blob = encode(&GameState::default()).unwrap();
        let v: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(v["version"], 2);
        assert_eq!(v["upgrades"]["intern"]["cost"], 10.0);
        assert!(v["upgrades"].get("vimMastery").is_none());
        assert_eq!(v["clickUpgrades"]["vimMastery"]["count"], 0);
        assert!(v["repositoryUpgrades"].get("githubActions").is_some());
        assert!(v["boosts"]["coffeeRush"]["cooldownUntil"].is_null());
    }

    #[test]
    fn legacy_save_loads() {
        let legacy = r#"{
            "commits": 57.3,
            "commitsPerSecond": 1.2,
            "clickPower": 1,
            "upgrades": {
                "intern": {"count": 2, "cost": 13, "rate": 0.1},
                "juniorDev": {"count": 1, "cost": 115, "rate": 1},
                "seniorDev": {"count": 0, "cost": 1000, "rate": 5},
                "ciBot": {"count": 0, "cost": 5000, "rate": 10}
            }
        }"#;
        let s = decode(legacy).unwrap();
        assert_eq!(s.economy.commits, 57.3);
        assert_eq!(s.economy.level, 1);
        assert_eq!(s.holding(UpgradeId::Intern), Holding { count: 2, cost: 13.0 });
        assert_eq!(s.holding(UpgradeId::JuniorDev).count, 1);
        assert_eq!(s.holding(UpgradeId::VimMastery), Holding::fresh(UpgradeId::VimMastery));
        assert_eq!(s.economy.experience_to_next_level, 100.0);
    }

    #[test]
    fn partial_upgrade_entries_merge_per_field() {
        let s = decode(r#"{"upgrades": {"intern": {"count": 4}}, "level": 3}"#).unwrap();
        assert_eq!(s.holding(UpgradeId::Intern), Holding { count: 4, cost: 10.0 });
        assert_eq!(s.economy.level, 3);
    }

    #[test]
    fn nulls_and_unknown_ids_are_tolerated() {
        let s = decode(
            r#"{"commits": null, "upgrades": {"quantumIntern": {"count": 9, "cost": 1}},
                "boosts": {"nap": {"cooldownUntil": 5}}}"#,
        )
        .unwrap();
        assert_eq!(s.economy.commits, 0.0);
        assert_eq!(s.upgrades.len(), UpgradeId::ALL.len());
        assert_eq!(s.boosts.len(), BoostId::ALL.len());
    }

    #[test]
    fn missing_repository_counter_moves_past_saved_jobs() {
        let s = decode(
            r#"{"repositoryUpgrades": {"moreSlots": {"count": 1}},
                "repositories": [
                    {"id": 1, "name": "a", "startedAt": 0, "durationMs": 1000, "progress": 0, "completed": false},
                    {"id": 4, "name": "b", "startedAt": 0, "durationMs": 1000, "progress": 100, "completed": true}
                ]}"#,
        )
        .unwrap();
        assert_eq!(s.repositories.next_id, 5);

        let kept = decode(r#"{"repositories": [], "nextRepositoryId": 9}"#).unwrap();
        assert_eq!(kept.repositories.next_id, 9);
    }

    #[test]
    fn corrupt_saves_are_rejected() {
        for blob in [
            "{not json",
            "[1, 2, 3]",
            "\"idle\"",
            r#"{"commits": "many"}"#,
            r#"{"commits": -5}"#,
            r#"{"level": 0}"#,
            r#"{"experience": 0.6, "experienceToNextLevel": 0.5}"#,
            r#"{"activeBoosts": [{"id": "nap", "multiplier": 2, "remainingSecs": 1, "durationSecs": 1}]}"#,
        ] {
            assert!(
                matches!(decode(blob), Err(PersistError::CorruptSave(_))),
                "{blob}"
            );
        }
    }

    #[test]
    fn pretty_uses_two_space_indent() {
        let out = pretty(r#"{"commits":1,"level":2}"#).unwrap();
        assert!(out.contains("\n  \"commits\": 1"));
        assert!(pretty("nope").is_err());
    }

    proptest! {
        #[test]
        fn provided_fields_survive_merge(commits in 0.0f64..1e12, level in 1u32..200, count in 0u32..500) {
            let blob = format!(r#"{{"commits": {commits}, "level": {level}, "clickUpgrades": {{"dualMonitors": {{"count": {count}}}}}}}"#);
            let s = decode(&blob).unwrap();
            prop_assert_eq!(s.economy.commits, commits);
            prop_assert_eq!(s.economy.level, level);
            prop_assert_eq!(s.count(UpgradeId::DualMonitors), count);
            prop_assert_eq!(s.holding(UpgradeId::DualMonitors).cost, 1000.0);
        }
    }
}
