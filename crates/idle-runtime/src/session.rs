//! A play session: one game bound to one save slot.
//!
//! UI intents come in through [`Session::dispatch`]; failures are turned
//! into error notifications so the caller only has to render the outbox.

use idle_core::{BoostId, CommandError, GameConfig, GameState, Millis, UpgradeId};
use persistence::{PersistError, SaveSlot, Storage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::{AdvanceReport, Game};
use crate::notify::{Notification, Notifier};
use crate::RuntimeError;

/// Player intents accepted by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "id", rename_all = "camelCase")]
pub enum Intent {
    Click,
    Buy(UpgradeId),
    Activate(BoostId),
    CreateRepository,
}

pub struct Session<S> {
    game: Game,
    slot: SaveSlot<S>,
    saving: bool,
}

fn load_failure(err: &PersistError) -> Notification {
    let message = match err {
        PersistError::CorruptSave(_) => "Your save could not be loaded. Starting a new game.",
        PersistError::StorageUnavailable(_) => {
            "Storage is unavailable. Progress will not be saved this session."
        }
    };
    Notification::error(message).with_detail(err.to_string())
}

impl<S: Storage> Session<S> {
    /// Load the saved game (or start fresh) and catch up on time spent away.
    pub fn open(storage: S, config: GameConfig, now: Millis) -> Result<Self, RuntimeError> {
        config.validate()?;
        let mut slot = SaveSlot::new(storage);
        let game = match slot.load() {
            Ok(Some(state)) => {
                let mut game = Game::from_state(state, config)?;
                game.resume(now);
                game
            }
            Ok(None) => Game::new(config, now)?,
            Err(e) => {
                let mut game = Game::new(config, now)?;
                game.notify(load_failure(&e));
                game
            }
        };
        Ok(Self {
            game,
            slot,
            saving: true,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn state(&self) -> &GameState {
        self.game.state()
    }

    pub fn slot(&self) -> &SaveSlot<S> {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut SaveSlot<S> {
        &mut self.slot
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.game.drain_notifications()
    }

    pub fn forward_notifications<N: Notifier + ?Sized>(&mut self, sink: &mut N) -> usize {
        self.game.forward_notifications(sink)
    }

    /// Apply one intent. Errors are also posted as notifications.
    pub fn dispatch(&mut self, intent: Intent, now: Millis) -> Result<(), CommandError> {
        let result = match intent {
            Intent::Click => {
                self.game.click();
                Ok(())
            }
            Intent::Buy(id) => self.game.purchase(id, now).map(drop),
            Intent::Activate(id) => self.game.activate_boost(id, now),
            Intent::CreateRepository => self.game.create_repository(now).map(drop),
        };
        match &result {
            Ok(()) if intent != Intent::Click => {
                self.save();
            }
            Ok(()) => {}
            Err(e) => {
                debug!(?intent, error = %e, "intent refused");
                self.game.notify(Notification::error(e.to_string()));
            }
        }
        result
    }

    /// Run timers up to `now`, saving when an autosave comes due.
    pub fn advance_to(&mut self, now: Millis) -> AdvanceReport {
        let report = self.game.advance_to(now);
        if report.autosave_due {
            self.save();
        }
        report
    }

    /// Write the current state. Returns whether anything was written.
    pub fn save(&mut self) -> bool {
        if !self.saving {
            return false;
        }
        match self.slot.save(self.game.state()) {
            Ok(written) => written,
            Err(e) => {
                self.game.notify(
                    Notification::error("Progress can no longer be saved this session")
                        .with_detail(e.to_string()),
                );
                false
            }
        }
    }

    pub fn saving_enabled(&self) -> bool {
        self.saving
    }

    /// Pause or resume periodic saves. Explicit saves still go through.
    pub fn set_autosave(&mut self, enabled: bool, now: Millis) {
        self.game.set_autosave(enabled, now);
    }

    /// Wipe the save and start over.
    ///
    /// Saves are suppressed and every timer is cancelled before the stored
    /// entry is removed, so nothing from the old game can be written back.
    pub fn reset(&mut self, now: Millis) -> Result<(), RuntimeError> {
        self.saving = false;
        let autosave = self.game.autosave_enabled();
        self.game.stop();
        let cleared = self.slot.clear();
        let fresh = Game::new(self.game.config().clone(), now);
        self.saving = true;
        self.game = fresh?;
        self.game.set_autosave(autosave, now);
        if let Err(e) = cleared {
            self.game.notify(
                Notification::error("The old save could not be removed").with_detail(e.to_string()),
            );
        }
        info!("game reset");
        Ok(())
    }

    /// Pretty-printed copy of the stored save, `None` when nothing was saved.
    pub fn export(&self) -> Result<Option<String>, PersistError> {
        self.slot.export()
    }
}
