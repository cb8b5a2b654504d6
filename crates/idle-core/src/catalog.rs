//! Static definitions of everything the player can buy.
//!
//! Upgrades and boosts are closed enums; each id resolves to a fixed spec
//! whose [`Effect`] decides how purchases feed the derived aggregates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// XP needed to go from level 1 to level 2.
pub const INITIAL_XP_THRESHOLD: f64 = 100.0;
/// Build time of a repository before speed upgrades.
pub const REPOSITORY_BASE_CREATION_MS: i64 = 60_000;
/// Commits paid out per finished repository before output upgrades.
pub const REPOSITORY_BASE_OUTPUT: f64 = 50.0;
/// Concurrent builds allowed before slot upgrades.
pub const REPOSITORY_BASE_SLOTS: u32 = 1;
/// Real-time period between automatic repository spawns.
pub const AUTO_SPAWN_INTERVAL_MS: i64 = 120_000;

/// Cost family of an upgrade; decides how the price grows per purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeFamily {
    Production,
    Click,
    Repository,
}

impl UpgradeFamily {
    /// Factor applied to the cost after every purchase.
    pub fn cost_growth(self) -> f64 {
        match self {
            UpgradeFamily::Production => 1.15,
            UpgradeFamily::Click | UpgradeFamily::Repository => 1.5,
        }
    }
}

/// Parameter of the repository subsystem that an upgrade improves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepositoryEffect {
    /// Fractional reduction of build time per purchase.
    CreationSpeed(f64),
    /// Fractional output bonus per purchase.
    Output(f64),
    /// Extra concurrent builds per purchase.
    Slots(u32),
    /// Any purchase enables periodic auto-spawn.
    Automation,
}

/// Per-unit contribution of one purchase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    Production { rate: f64, xp_rate: f64 },
    Click { multiplier: f64 },
    Repository(RepositoryEffect),
}

impl Effect {
    pub fn family(&self) -> UpgradeFamily {
        match self {
            Effect::Production { .. } => UpgradeFamily::Production,
            Effect::Click { .. } => UpgradeFamily::Click,
            Effect::Repository(_) => UpgradeFamily::Repository,
        }
    }
}

/// Fixed definition of a purchasable upgrade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpgradeSpec {
    pub name: &'static str,
    pub base_cost: f64,
    pub effect: Effect,
    pub unlock_level: u32,
}

/// Every upgrade in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeId {
    Intern,
    JuniorDev,
    SeniorDev,
    CiBot,
    TechLead,
    AiPairProgrammer,
    MechanicalKeyboard,
    ErgonomicChair,
    DualMonitors,
    VimMastery,
    FasterBuilds,
    BetterReadmes,
    MoreSlots,
    GithubActions,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 14] = [
        UpgradeId::Intern,
        UpgradeId::JuniorDev,
        UpgradeId::SeniorDev,
        UpgradeId::CiBot,
        UpgradeId::TechLead,
        UpgradeId::AiPairProgrammer,
        UpgradeId::MechanicalKeyboard,
        UpgradeId::ErgonomicChair,
        UpgradeId::DualMonitors,
        UpgradeId::VimMastery,
        UpgradeId::FasterBuilds,
        UpgradeId::BetterReadmes,
        UpgradeId::MoreSlots,
        UpgradeId::GithubActions,
    ];

    pub fn spec(self) -> UpgradeSpec {
        use RepositoryEffect::*;
        let (name, base_cost, effect, unlock_level) = match self {
            UpgradeId::Intern => ("Intern", 10.0, production(0.1, 0.05), 1),
            UpgradeId::JuniorDev => ("Junior Dev", 100.0, production(1.0, 0.2), 1),
            UpgradeId::SeniorDev => ("Senior Dev", 1_000.0, production(5.0, 1.0), 3),
            UpgradeId::CiBot => ("CI Bot", 5_000.0, production(10.0, 2.0), 5),
            UpgradeId::TechLead => ("Tech Lead", 25_000.0, production(50.0, 5.0), 8),
            UpgradeId::AiPairProgrammer => {
                ("AI Pair Programmer", 100_000.0, production(200.0, 15.0), 12)
            }
            UpgradeId::MechanicalKeyboard => ("Mechanical Keyboard", 50.0, click(0.5), 1),
            UpgradeId::ErgonomicChair => ("Ergonomic Chair", 250.0, click(1.0), 2),
            UpgradeId::DualMonitors => ("Dual Monitors", 1_000.0, click(2.0), 4),
            UpgradeId::VimMastery => ("Vim Mastery", 5_000.0, click(5.0), 7),
            UpgradeId::FasterBuilds => {
                ("Faster Builds", 500.0, Effect::Repository(CreationSpeed(0.1)), 3)
            }
            UpgradeId::BetterReadmes => {
                ("Better READMEs", 750.0, Effect::Repository(Output(0.25)), 3)
            }
            UpgradeId::MoreSlots => ("More Slots", 2_000.0, Effect::Repository(Slots(1)), 5),
            UpgradeId::GithubActions => {
                ("GitHub Actions", 10_000.0, Effect::Repository(Automation), 8)
            }
        };
        UpgradeSpec {
            name,
            base_cost,
            effect,
            unlock_level,
        }
    }

    pub fn family(self) -> UpgradeFamily {
        self.spec().effect.family()
    }

    /// Stable key used in save files.
    pub fn key(self) -> &'static str {
        match self {
            UpgradeId::Intern => "intern",
            UpgradeId::JuniorDev => "juniorDev",
            UpgradeId::SeniorDev => "seniorDev",
            UpgradeId::CiBot => "ciBot",
            UpgradeId::TechLead => "techLead",
            UpgradeId::AiPairProgrammer => "aiPairProgrammer",
            UpgradeId::MechanicalKeyboard => "mechanicalKeyboard",
            UpgradeId::ErgonomicChair => "ergonomicChair",
            UpgradeId::DualMonitors => "dualMonitors",
            UpgradeId::VimMastery => "vimMastery",
            UpgradeId::FasterBuilds => "fasterBuilds",
            UpgradeId::BetterReadmes => "betterReadmes",
            UpgradeId::MoreSlots => "moreSlots",
            UpgradeId::GithubActions => "githubActions",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

fn production(rate: f64, xp_rate: f64) -> Effect {
    Effect::Production { rate, xp_rate }
}

fn click(multiplier: f64) -> Effect {
    Effect::Click { multiplier }
}

/// Fixed definition of a temporary boost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoostSpec {
    pub name: &'static str,
    pub cost: f64,
    pub duration_secs: f64,
    pub multiplier: f64,
    pub cooldown_secs: f64,
    pub unlock_level: u32,
}

/// Every temporary boost in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoostId {
    CoffeeRush,
    Hackathon,
    FlowState,
}

impl BoostId {
    pub const ALL: [BoostId; 3] = [BoostId::CoffeeRush, BoostId::Hackathon, BoostId::FlowState];

    pub fn spec(self) -> BoostSpec {
        let (name, cost, duration_secs, multiplier, cooldown_secs, unlock_level) = match self {
            BoostId::CoffeeRush => ("Coffee Rush", 200.0, 30.0, 2.0, 60.0, 1),
            BoostId::Hackathon => ("Hackathon", 1_000.0, 60.0, 3.0, 300.0, 5),
            BoostId::FlowState => ("Flow State", 5_000.0, 120.0, 5.0, 900.0, 10),
        };
        BoostSpec {
            name,
            cost,
            duration_secs,
            multiplier,
            cooldown_secs,
            unlock_level,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            BoostId::CoffeeRush => "coffeeRush",
            BoostId::Hackathon => "hackathon",
            BoostId::FlowState => "flowState",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for BoostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_serde_names() {
        for id in UpgradeId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
            assert_eq!(UpgradeId::from_key(id.key()), Some(id));
        }
        for id in BoostId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
            assert_eq!(BoostId::from_key(id.key()), Some(id));
        }
        assert_eq!(UpgradeId::from_key("clickPower"), None);
    }

    #[test]
    fn families_follow_effects() {
        assert_eq!(UpgradeId::Intern.family(), UpgradeFamily::Production);
        assert_eq!(UpgradeId::VimMastery.family(), UpgradeFamily::Click);
        assert_eq!(UpgradeId::GithubActions.family(), UpgradeFamily::Repository);
        assert_eq!(UpgradeFamily::Production.cost_growth(), 1.15);
        assert_eq!(UpgradeFamily::Repository.cost_growth(), 1.5);
    }

    #[test]
    fn boost_cooldown_covers_duration() {
        // A boost must not be re-buyable while its previous instance runs.
        for id in BoostId::ALL {
            let s = id.spec();
            assert!(s.cooldown_secs >= s.duration_secs, "{id}");
            assert!(s.multiplier > 1.0);
        }
    }

    #[test]
    fn base_costs_are_at_least_ten() {
        for id in UpgradeId::ALL {
            assert!(id.spec().base_cost >= 10.0, "{id}");
        }
    }
}
