//! The game engine: a phase-oriented state machine.
//!
//! One `GameEngine` exists per connected device. Each inbound action is
//! routed to the current phase's handler, which mutates state and emits an
//! ordered event list. Handlers are synchronous; long UX pauses are
//! expressed as emitted `pause` + Continue menu pairs, never by sleeping.

mod combat;
mod creation;
mod dungeon;
mod gamble;
mod shop;
mod town;

pub use combat::CombatStage;
pub use gamble::GambleStage;
pub use shop::ShopStage;

use crate::combat::Zone;
use crate::content::ContentTables;
use crate::dice::Dice;
use crate::events::{Event, HudState, MenuItem};
use crate::labyrinth::Room;
use crate::persist::{LeaderboardStore, ReviewSubmitter, SaveStore};
use crate::world::{Attribute, Character, CombatBuffs, Difficulty, MonsterDebuffs};
use serde_json::Value;
use std::sync::Arc;

/// Top-level phases of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    MainMenu,
    SelectDifficulty,
    Intro,
    CreateName,
    CreateAttrs,
    Town,
    Shop,
    Inventory,
    Dungeon,
    Combat,
}

/// Staged intro pages between difficulty selection and name entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntroStage {
    #[default]
    Story,
    Startup,
}

/// Character creation sub-state: rolls are serialized, each pending roll
/// must be assigned before the next is rolled.
#[derive(Debug, Clone, Default)]
pub struct CreationState {
    pub name: String,
    pub difficulty: Difficulty,
    pub pending_attrs: Vec<Attribute>,
    pub assignments: Vec<(Attribute, i32)>,
    pub pending_roll: Option<i32>,
    pub step: CreationStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationStep {
    #[default]
    AwaitRoll,
    AwaitAssign,
    Recap,
    HpGold,
    Summary,
}

/// Main-menu review sub-state.
#[derive(Debug, Clone, Default)]
pub struct ReviewState {
    pub active: bool,
    pub rating: Option<u8>,
}

/// Combat runtime state; exists only while a monster is engaged.
#[derive(Debug, Clone)]
pub struct CombatState {
    pub stage: CombatStage,
    pub buffs: CombatBuffs,
    pub debuffs: MonsterDebuffs,
    pub aim: Option<Zone>,
    /// Spell awaiting a power choice (Lightning Bolt).
    pub pending_spell: Option<String>,
}

impl CombatState {
    fn new() -> Self {
        Self {
            stage: CombatStage::SpawnPause,
            buffs: CombatBuffs::default(),
            debuffs: MonsterDebuffs::default(),
            aim: None,
            pending_spell: None,
        }
    }
}

/// Everything the engine owns for one session.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub character: Option<Character>,
    pub depth: u32,
    pub depth_history: Vec<u32>,
    /// Monsters engaged so far; drives the 50th-encounter Dragon.
    pub encounter_count: u32,
    pub current_room: Option<Room>,
    /// Set by a successful revival; applied on the next labyrinth entry.
    pub defer_depth_reset: bool,
    /// Next-room monster preview so Divine and Listen agree with reality.
    pub peek_next: Option<(u32, Option<String>)>,
    /// Monster name committed by the preview for the next descent.
    pub forced_next_monster: Option<String>,
    pub creation: CreationState,
    pub intro_stage: IntroStage,
    pub review: ReviewState,
}

pub struct GameEngine {
    pub(crate) phase: Phase,
    pub(crate) s: EngineState,
    pub(crate) combat: Option<CombatState>,
    pub(crate) shop: shop::ShopState,
    pub(crate) gamble: gamble::GambleState,
    pub(crate) naming_companion: bool,
    pub(crate) tables: Arc<ContentTables>,
    pub(crate) dice: Dice,
    pub(crate) saves: Arc<dyn SaveStore>,
    pub(crate) leaderboard: Arc<dyn LeaderboardStore>,
    pub(crate) reviews: Arc<dyn ReviewSubmitter>,
    pub(crate) device_id: String,
    buffer: Vec<Event>,
}

impl GameEngine {
    pub fn new(
        tables: Arc<ContentTables>,
        dice: Dice,
        saves: Arc<dyn SaveStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        reviews: Arc<dyn ReviewSubmitter>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            phase: Phase::MainMenu,
            s: EngineState {
                depth: 1,
                ..EngineState::default()
            },
            combat: None,
            shop: shop::ShopState::default(),
            gamble: gamble::GambleState::default(),
            naming_companion: false,
            tables,
            dice,
            saves,
            leaderboard,
            reviews,
            device_id: device_id.into(),
            buffer: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn character(&self) -> Option<&Character> {
        self.s.character.as_ref()
    }

    pub fn depth(&self) -> u32 {
        self.s.depth
    }

    /// Full engine state, read-only.
    pub fn state(&self) -> &EngineState {
        &self.s
    }

    /// Full engine state, mutable. The session host never needs this; it
    /// exists for harnesses that stage specific situations.
    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.s
    }

    /// Test hook: script upcoming rolls on the session dice.
    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    /// Run `f` with mutable access to the character and the session dice.
    /// Handlers compute outcomes here, then emit events afterwards so the
    /// borrow never overlaps the event buffer.
    pub(crate) fn with_character<R>(
        &mut self,
        f: impl FnOnce(&mut Character, &mut Dice) -> R,
    ) -> Option<R> {
        let character = self.s.character.as_mut()?;
        Some(f(character, &mut self.dice))
    }

    /// Initialize the session and emit the main menu.
    pub fn start(&mut self) -> Vec<Event> {
        self.buffer.clear();
        self.render_main_menu();
        self.flush()
    }

    /// Advance the state machine with one inbound action.
    pub fn handle_action(&mut self, action: &str, payload: Option<&Value>) -> Vec<Event> {
        self.buffer.clear();
        match self.phase {
            Phase::MainMenu => self.handle_main_menu(action, payload),
            Phase::SelectDifficulty => self.handle_difficulty(action),
            Phase::Intro => self.handle_intro(action),
            Phase::CreateName => self.handle_create_name(action, payload),
            Phase::CreateAttrs => self.handle_create_attrs(action),
            Phase::Town => self.handle_town(action, payload),
            Phase::Shop => self.handle_shop(action),
            Phase::Inventory => self.handle_inventory(action),
            Phase::Dungeon => self.handle_dungeon(action),
            Phase::Combat => self.handle_combat(action),
        }
        self.flush()
    }

    // ----- main menu -----

    pub(crate) fn render_main_menu(&mut self) {
        self.clear();
        self.scene("labyrinth.png");
        self.flavor("system", "main_menu_header", &[], "=== Labyrinth Adventure ===");
        self.menu([
            ("main:new_game", "1) New Game"),
            ("main:load", "2) Load Game"),
            ("main:leaderboard", "3) Leaderboard"),
            ("main:review", "4) Leave a Review"),
            ("main:howto", "5) How to Play"),
            ("main:quit", "6) Quit"),
        ]);
    }

    fn handle_main_menu(&mut self, action: &str, payload: Option<&Value>) {
        if self.s.review.active {
            self.handle_review(action, payload);
            return;
        }
        match action {
            "main:new_game" => {
                self.phase = Phase::SelectDifficulty;
                self.render_difficulty_menu();
            }
            "main:load" => self.load_saved_game(),
            "main:leaderboard" => self.render_leaderboard(),
            "main:review" => {
                self.s.review = ReviewState {
                    active: true,
                    rating: None,
                };
                self.say("How would you rate your adventures?");
                self.menu((1..=5).map(|n| (format!("review:rate:{n}"), format!("{n} star(s)"))));
            }
            "main:howto" => self.render_how_to_play(),
            "main:quit" => {
                self.say("Thanks for playing!");
                self.menu(Vec::<(String, String)>::new());
            }
            _ => self.render_main_menu(),
        }
    }

    fn load_saved_game(&mut self) {
        match self.saves.load(&self.device_id) {
            Ok(Some(record)) => match Character::from_record(record) {
                Ok(character) => {
                    self.say(format!("Welcome back, {}.", character.name));
                    self.s.character = Some(character);
                    self.s.depth = 1;
                    self.s.depth_history.clear();
                    self.enter_town();
                }
                Err(err) => {
                    tracing::warn!(%err, "saved record failed to deserialize");
                    self.say("The saved game could not be read.");
                    self.render_main_menu();
                }
            },
            Ok(None) => {
                self.say("No saved game found.");
                self.menu([("main:new_game", "New Game"), ("main:menu", "Back")]);
            }
            Err(err) => {
                tracing::warn!(%err, "save store failed on load");
                self.say("The saved game could not be read.");
                self.render_main_menu();
            }
        }
    }

    fn render_leaderboard(&mut self) {
        self.clear();
        self.say("=== Dragonslayers ===");
        match self.leaderboard.recent(10) {
            Ok(entries) if entries.is_empty() => {
                self.say("No one has slain the Dragon yet. The page waits for a name.");
            }
            Ok(entries) => {
                for entry in entries {
                    self.say(entry.summary_line());
                }
            }
            Err(err) => {
                tracing::warn!(%err, "leaderboard read failed");
                self.say("The leaderboard is unreadable right now.");
            }
        }
        self.pause();
        self.menu([("main:menu", "Back")]);
    }

    fn render_how_to_play(&mut self) {
        self.clear();
        for line in [
            "How to Play:",
            "- Choose options to explore rooms.",
            "- Rolls use your stats; higher is better.",
            "- Combat: Attack, Cast, Charm, Run, Examine.",
            "- Depth raises rewards and danger.",
            "- Heal with potions; rest in town.",
            "- Gold buys gear; train and level up.",
            "- Listen and Divine hint at the next room.",
            "- Charmed foes give a quarter of the rewards.",
            "- Press Continue to advance screens.",
        ] {
            self.say(line);
        }
        self.menu([("main:menu", "Back")]);
    }

    fn handle_review(&mut self, action: &str, payload: Option<&Value>) {
        if let Some(rating) = action.strip_prefix("review:rate:") {
            match rating.parse::<u8>() {
                Ok(n @ 1..=5) => {
                    self.s.review.rating = Some(n);
                    self.say("A few words for the guild ledger? (optional)");
                    self.prompt("review", "Your review:");
                    self.menu([("prompt:submit", "Submit")]);
                }
                _ => {
                    self.say("Pick between one and five stars.");
                    self.menu((1..=5).map(|n| (format!("review:rate:{n}"), format!("{n} star(s)"))));
                }
            }
            return;
        }
        if action == "prompt:submit" {
            let text = payload
                .and_then(|p| p.get("value"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let rating = self.s.review.rating.unwrap_or(5);
            self.s.review = ReviewState::default();
            match crate::persist::Review::new(rating, text) {
                Ok(review) => match self.reviews.submit(&review) {
                    Ok(receipt) => {
                        self.say(format!("Thank you! Your review was recorded as {}.", receipt.path));
                    }
                    Err(err) => {
                        tracing::warn!(%err, "review submission failed");
                        self.say(format!("The review could not be submitted: {err}"));
                    }
                },
                Err(err) => self.say(format!("The review could not be submitted: {err}")),
            }
            self.pause();
            self.menu([("main:menu", "Continue")]);
            return;
        }
        // Anything else abandons the review flow.
        self.s.review = ReviewState::default();
        self.render_main_menu();
    }

    // ----- difficulty -----

    fn render_difficulty_menu(&mut self) {
        self.clear();
        self.say("       SELECT YOUR DIFFICULTY LEVEL");
        for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            let dice = difficulty.stat_dice();
            self.say(format!(
                "- {}: roll {} ({}-{} range) for each attribute.",
                difficulty.name(),
                dice,
                dice.min(),
                dice.max()
            ));
        }
        self.say("This choice affects your starting attributes only.");
        self.menu([
            ("difficulty:easy", "Easy (6d5)"),
            ("difficulty:normal", "Normal (5d5)"),
            ("difficulty:hard", "Hard (4d5)"),
        ]);
    }

    fn handle_difficulty(&mut self, action: &str) {
        let Some(id) = action.strip_prefix("difficulty:") else {
            self.render_difficulty_menu();
            return;
        };
        match Difficulty::from_id(id) {
            Some(difficulty) => {
                self.s.creation = CreationState {
                    difficulty,
                    ..CreationState::default()
                };
                self.phase = Phase::Intro;
                self.s.intro_stage = IntroStage::Story;
                self.clear();
                self.scene("labyrinth.png");
                self.flavor(
                    "system",
                    "story_intro",
                    &[],
                    "In a world scarred by ancient betrayals, mysterious labyrinths spawn from wounds in reality itself...",
                );
                self.pause();
                self.menu([("intro:continue", "Continue")]);
            }
            None => {
                self.say(format!("Invalid difficulty: {id}"));
                self.render_difficulty_menu();
            }
        }
    }

    fn handle_intro(&mut self, action: &str) {
        if action != "intro:continue" {
            self.pause();
            self.menu([("intro:continue", "Continue")]);
            return;
        }
        match self.s.intro_stage {
            IntroStage::Story => {
                self.s.intro_stage = IntroStage::Startup;
                self.clear();
                self.flavor(
                    "system",
                    "startup",
                    &[],
                    "So you seek to become an Explorer? Few attempt this path, and fewer return.",
                );
                self.pause();
                self.menu([("intro:continue", "Continue")]);
            }
            IntroStage::Startup => {
                self.phase = Phase::CreateName;
                self.clear();
                self.flavor("system", "ask_name", &[], "What is your name?");
                self.prompt("name", "Enter your name:");
                self.menu([("prompt:submit", "OK")]);
            }
        }
    }

    // ----- emit helpers -----

    pub(crate) fn say(&mut self, text: impl Into<String>) {
        self.buffer.push(Event::dialogue(text));
    }

    pub(crate) fn log(&mut self, text: impl Into<String>) {
        self.buffer.push(Event::combat(text));
    }

    /// Emit a dialogue line from the content tables, falling back to the
    /// hard-coded default when the key is missing.
    pub(crate) fn flavor(
        &mut self,
        section: &str,
        key: &str,
        ctx: &[(&str, &str)],
        default: &str,
    ) {
        let tables = self.tables.clone();
        let line = tables.dialogue.pick(&mut self.dice, section, key, ctx);
        match line {
            Some(line) => self.say(line),
            None => {
                tracing::debug!(section, key, "dialogue key missing, using default");
                self.say(crate::content::render(default, ctx));
            }
        }
    }

    pub(crate) fn menu<I, S, L>(&mut self, items: I)
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        self.buffer.push(Event::Menu {
            items: items
                .into_iter()
                .map(|(id, label)| MenuItem::new(id, label))
                .collect(),
        });
    }

    pub(crate) fn prompt(&mut self, id: &str, label: &str) {
        self.buffer.push(Event::Prompt {
            id: id.to_string(),
            label: label.to_string(),
        });
    }

    pub(crate) fn pause(&mut self) {
        self.buffer.push(Event::Pause);
    }

    /// The standard result-page tail: pause, a single Continue option, and
    /// a HUD refresh.
    pub(crate) fn pause_continue(&mut self, id: &str) {
        self.pause();
        self.menu([(id, "Continue")]);
        self.update_stats();
    }

    pub(crate) fn clear(&mut self) {
        self.buffer.push(Event::Clear);
    }

    pub(crate) fn scene(&mut self, background: impl Into<String>) {
        self.buffer.push(Event::scene(background));
    }

    pub(crate) fn scene_reset(&mut self) {
        self.buffer.push(Event::scene_reset());
    }

    pub(crate) fn update_stats(&mut self) {
        let state = self.hud();
        self.buffer.push(Event::UpdateStats { state });
    }

    pub(crate) fn hud(&self) -> HudState {
        match &self.s.character {
            Some(c) => HudState {
                hp: c.hp,
                max_hp: c.max_hp,
                gold: c.gold,
                xp: c.xp as i32,
                level: c.level,
                depth: self.s.depth,
                summary: c.summary(),
            },
            None => HudState::default(),
        }
    }

    fn flush(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.buffer)
    }
}
