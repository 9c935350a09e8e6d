//! Shared harness for the QA flow tests: a seeded engine over in-memory
//! stores, plus action-driving and event-inspection helpers.
#![allow(dead_code)]

use labyrinth_core::dice::Dice;
use labyrinth_core::engine::GameEngine;
use labyrinth_core::events::{Event, HudState};
use labyrinth_core::persist::{MemoryLeaderboard, MemorySaveStore, UnconfiguredReviews};
use labyrinth_core::world::Attribute;
use labyrinth_core::ContentTables;
use serde_json::json;
use std::sync::Arc;

pub struct Harness {
    pub engine: GameEngine,
    pub saves: Arc<MemorySaveStore>,
    pub leaderboard: Arc<MemoryLeaderboard>,
}

pub fn harness(seed: u64) -> Harness {
    let saves = Arc::new(MemorySaveStore::new());
    let leaderboard = Arc::new(MemoryLeaderboard::new());
    let engine = GameEngine::new(
        ContentTables::shared(),
        Dice::seeded(seed),
        saves.clone(),
        leaderboard.clone(),
        Arc::new(UnconfiguredReviews),
        "qa-device",
    );
    Harness {
        engine,
        saves,
        leaderboard,
    }
}

pub fn submit(h: &mut Harness, action: &str) -> Vec<Event> {
    h.engine.handle_action(action, None)
}

pub fn submit_text(h: &mut Harness, action: &str, value: &str) -> Vec<Event> {
    let payload = json!({ "value": value });
    h.engine.handle_action(action, Some(&payload))
}

/// All dialogue and combat-log text joined into one searchable string.
pub fn text_of(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|ev| match ev {
            Event::Dialogue { text } | Event::CombatUpdate { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ids of the last menu emitted.
pub fn menu_ids(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .rev()
        .find_map(|ev| match ev {
            Event::Menu { items } => Some(items.iter().map(|i| i.id.clone()).collect()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Labels of the last menu emitted.
pub fn menu_labels(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .rev()
        .find_map(|ev| match ev {
            Event::Menu { items } => Some(items.iter().map(|i| i.label.clone()).collect()),
            _ => None,
        })
        .unwrap_or_default()
}

/// The last HUD snapshot emitted.
pub fn last_hud(events: &[Event]) -> Option<HudState> {
    events.iter().rev().find_map(|ev| match ev {
        Event::UpdateStats { state } => Some(state.clone()),
        _ => None,
    })
}

/// Attribute values in assignment order: STR, DEX, CON, INT, WIS, CHA, PER.
pub const ATTR_ORDER: [Attribute; 7] = [
    Attribute::Strength,
    Attribute::Dexterity,
    Attribute::Constitution,
    Attribute::Intelligence,
    Attribute::Wisdom,
    Attribute::Charisma,
    Attribute::Perception,
];

/// Drive a full character creation with pinned rolls.
///
/// `values` are assigned in [`ATTR_ORDER`]; `hp_bonus` is the 5d4 HP roll,
/// `base_gold` the 20d6, `cha_bonus` the charisma dice, `tier_bonus` the
/// low-HP bonus (queue only when the final HP lands under 60).
pub fn create_character(
    h: &mut Harness,
    name: &str,
    difficulty: &str,
    values: [i32; 7],
    hp_bonus: i32,
    base_gold: i32,
    cha_bonus: i32,
    tier_bonus: Option<i32>,
) -> Vec<Event> {
    h.engine.start();
    submit(h, "main:new_game");
    submit(h, &format!("difficulty:{difficulty}"));
    submit(h, "intro:continue");
    submit(h, "intro:continue");
    submit_text(h, "prompt:submit", name);

    h.engine.dice_mut().queue_rolls(values);
    for attr in ATTR_ORDER {
        submit(h, "create:roll");
        submit(h, &format!("create:assign:{}", attr.name()));
    }

    let mut rolls = vec![hp_bonus, base_gold, cha_bonus];
    rolls.extend(tier_bonus);
    h.engine.dice_mut().queue_rolls(rolls);
    submit(h, "create:continue"); // HP and gold page
    submit(h, "create:continue"); // summary page
    submit(h, "create:continue") // into town
}

/// A standard adventurer: STR 14, DEX 17, CON 16, INT 15, WIS 17, CHA 13,
/// PER 12; HP 62 (no low-HP tier), gold 100.
pub fn standard_character(h: &mut Harness) {
    create_character(
        h,
        "Ada",
        "easy",
        [14, 17, 16, 15, 17, 13, 12],
        14,
        70,
        30,
        None,
    );
}

/// Walk from town into the first room and through the spawn pause, winning
/// initiative with scripted rolls. Leaves the engine on the player menu.
pub fn enter_first_combat(h: &mut Harness) {
    submit(h, "town:enter");
    h.engine.dice_mut().queue_rolls([20, 5]);
    submit(h, "combat:spawn_continue");
}

/// Name of the monster currently engaged.
pub fn current_monster_name(h: &Harness) -> String {
    h.engine
        .state()
        .current_room
        .as_ref()
        .and_then(|r| r.monster.as_ref())
        .map(|m| m.name.clone())
        .unwrap_or_default()
}

pub fn current_monster_hp(h: &Harness) -> i32 {
    h.engine
        .state()
        .current_room
        .as_ref()
        .and_then(|r| r.monster.as_ref())
        .map(|m| m.hp)
        .unwrap_or(0)
}

/// Script one blocked monster swing: the monster aims head (queued index),
/// the player blocks head, nobody is hurt.
pub fn block_monster_swing(h: &mut Harness) -> Vec<Event> {
    h.engine.dice_mut().queue_rolls([10]);
    h.engine.dice_mut().queue_indices([0]);
    submit(h, "combat:block:head")
}

/// Batter the engaged monster down with scripted critical hits until the
/// victory pause is reached. Assumes an equipped weapon.
pub fn slay_current_monster(h: &mut Harness) {
    use labyrinth_core::engine::CombatStage;
    for _ in 0..100 {
        match h.engine.combat_stage() {
            Some(CombatStage::PlayerMenu) => {
                submit(h, "combat:attack");
            }
            Some(CombatStage::AttackAim) => {
                h.engine.dice_mut().queue_rolls([20, 999]);
                submit(h, "combat:aim:head");
            }
            Some(CombatStage::MonsterDefend) => {
                block_monster_swing(h);
            }
            Some(CombatStage::VictoryPause) => return,
            other => panic!("unexpected combat stage while slaying: {other:?}"),
        }
    }
    panic!("monster did not die within 100 rounds");
}

/// Arm the character with a heavy labyrinth blade for scripted kills.
pub fn arm_with_greatblade(h: &mut Harness) {
    use labyrinth_core::dice::DieSpec;
    use labyrinth_core::world::Weapon;
    let state = h.engine.state_mut();
    if let Some(c) = state.character.as_mut() {
        c.weapons.push(Weapon {
            name: "Stormbrand".into(),
            damage_die: DieSpec::new(3, 8),
            price: 0,
            damaged: false,
            labyrinth_drop: true,
        });
        c.equipped_weapon = Some(c.weapons.len() - 1);
    }
}
