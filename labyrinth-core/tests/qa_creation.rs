//! QA tests for the creation flow: difficulty, name, serialized attribute
//! assignment, and the starting HP/gold formulas.

mod common;

use common::*;
use labyrinth_core::engine::Phase;
use labyrinth_core::world::{Attribute, Difficulty};

#[test]
fn creation_easy_assigns_rolls_and_reaches_town() {
    let mut h = harness(7);
    let events = create_character(
        &mut h,
        "Ada",
        "easy",
        [18, 17, 16, 15, 14, 13, 12],
        14,
        70,
        30,
        None,
    );

    assert_eq!(h.engine.phase(), Phase::Town);
    let c = h.engine.character().expect("character exists");
    assert_eq!(c.name, "Ada");
    assert_eq!(c.difficulty, Difficulty::Easy);
    assert_eq!(c.attr(Attribute::Strength), 18);
    assert_eq!(c.attr(Attribute::Dexterity), 17);
    assert_eq!(c.attr(Attribute::Constitution), 16);
    assert_eq!(c.attr(Attribute::Intelligence), 15);
    assert_eq!(c.attr(Attribute::Wisdom), 14);
    assert_eq!(c.attr(Attribute::Charisma), 13);
    assert_eq!(c.attr(Attribute::Perception), 12);

    // HP = 3*CON + 5d4 = 48 + 14; gold = 20d6 + ceil(13/1.5)d6 = 70 + 30.
    assert_eq!(c.max_hp, 62);
    assert_eq!(c.hp, 62);
    assert_eq!(c.gold, 100);

    // The town page carries the HUD snapshot.
    let hud = last_hud(&events).expect("HUD emitted");
    assert_eq!(hud.hp, 62);
    assert_eq!(hud.max_hp, 62);
    assert_eq!(hud.gold, 100);
    assert_eq!(hud.level, 1);

    // Starting equipment: none.
    assert!(c.weapons.is_empty());
    assert!(c.armors.is_empty());
}

#[test]
fn low_hp_characters_get_the_tier_gold_bonus() {
    let mut h = harness(3);
    // Hard difficulty, CON 4: HP = 12 + 5 = 17, under the 25-HP tier.
    create_character(
        &mut h,
        "Glass",
        "hard",
        [10, 10, 4, 10, 10, 9, 10],
        5,
        60,
        20,
        Some(40), // 15d6 tier bonus
    );
    let c = h.engine.character().expect("character exists");
    assert_eq!(c.max_hp, 17);
    assert_eq!(c.gold, 120);
}

#[test]
fn each_roll_must_be_assigned_before_the_next() {
    let mut h = harness(5);
    h.engine.start();
    submit(&mut h, "main:new_game");
    submit(&mut h, "difficulty:normal");
    submit(&mut h, "intro:continue");
    submit(&mut h, "intro:continue");
    submit_text(&mut h, "prompt:submit", "Serial");

    h.engine.dice_mut().queue_rolls([12]);
    let events = submit(&mut h, "create:roll");
    let text = text_of(&events);
    assert!(text.contains("You rolled a 12!"));

    // Rolling again without assigning does not consume another roll; the
    // assignment menu is simply re-shown.
    let events = submit(&mut h, "create:roll");
    let ids = menu_ids(&events);
    assert!(ids.contains(&"create:assign:Strength".to_string()));
    assert!(ids.contains(&"create:assign:Perception".to_string()));

    let events = submit(&mut h, "create:assign:Strength");
    assert!(text_of(&events).contains("Assigned 12 to Strength!"));

    // Assigning with nothing pending falls back to the roll menu.
    let events = submit(&mut h, "create:assign:Dexterity");
    assert!(menu_ids(&events).contains(&"create:roll".to_string()));

    // Strength is no longer offered once taken.
    h.engine.dice_mut().queue_rolls([11]);
    let events = submit(&mut h, "create:roll");
    let ids = menu_ids(&events);
    assert!(!ids.contains(&"create:assign:Strength".to_string()));
    assert!(ids.contains(&"create:assign:Wisdom".to_string()));
}

#[test]
fn empty_name_defaults_to_adventurer() {
    let mut h = harness(11);
    create_character(
        &mut h,
        "   ",
        "normal",
        [12, 12, 12, 12, 12, 12, 12],
        10,
        70,
        20,
        Some(10), // HP 46 -> 5d6 tier
    );
    assert_eq!(h.engine.character().map(|c| c.name.as_str()), Some("Adventurer"));
}

#[test]
fn difficulty_sets_the_stat_dice_bounds() {
    // Queued rolls clamp to the difficulty dice range; a queued 3 on hard
    // (4d5) becomes the die minimum of 4.
    let mut h = harness(13);
    create_character(
        &mut h,
        "Clamp",
        "hard",
        [3, 3, 10, 10, 10, 9, 10],
        10,
        60,
        20,
        Some(20),
    );
    let c = h.engine.character().expect("character exists");
    assert_eq!(c.attr(Attribute::Strength), 4);
    assert_eq!(c.attr(Attribute::Dexterity), 4);
}

#[test]
fn abandoning_at_town_returns_to_main_menu() {
    let mut h = harness(17);
    standard_character(&mut h);
    assert_eq!(h.engine.phase(), Phase::Town);
    let events = submit(&mut h, "town:quit");
    assert_eq!(h.engine.phase(), Phase::MainMenu);
    assert!(h.engine.character().is_none());
    assert!(menu_ids(&events).contains(&"main:new_game".to_string()));
}
