//! QA tests for labyrinth navigation: forced Dragon spawns, the Divine and
//! Listen previews, depth-scoped flags, and the Dragon victory commit.

mod common;

use common::*;
use labyrinth_core::engine::{CombatStage, Phase};
use labyrinth_core::{LeaderboardStore, SaveStore};

/// Clear the first room so the navigation menu is reachable.
fn clear_first_room(h: &mut Harness) {
    arm_with_greatblade(h);
    enter_first_combat(h);
    slay_current_monster(h);
    submit(h, "combat:victory_continue");
    submit(h, "combat:continue");
    assert_eq!(h.engine.phase(), Phase::Dungeon);
}

#[test]
fn fiftieth_engaged_monster_is_the_dragon() {
    let mut h = harness(41);
    standard_character(&mut h);
    clear_first_room(&mut h);

    // 49 monsters engaged so far; the next door must hide the Dragon.
    h.engine.state_mut().encounter_count = 49;
    h.engine.state_mut().peek_next = None;
    submit(&mut h, "dng:deeper");

    let monster = h
        .engine
        .state()
        .current_room
        .as_ref()
        .and_then(|r| r.monster.clone())
        .expect("forced spawn");
    assert_eq!(monster.name, "Dragon");
    assert_eq!(monster.hp, 135);
    assert_eq!(monster.armor_class, 31);
    assert_eq!(h.engine.phase(), Phase::Combat);
}

#[test]
fn depth_five_is_always_the_dragon_and_charm_is_hidden() {
    let mut h = harness(42);
    standard_character(&mut h);
    clear_first_room(&mut h);

    // Jump the state to depth 4 and descend.
    h.engine.state_mut().depth = 4;
    h.engine.state_mut().peek_next = None;
    submit(&mut h, "dng:deeper");
    assert_eq!(h.engine.depth(), 5);
    let monster = h
        .engine
        .state()
        .current_room
        .as_ref()
        .and_then(|r| r.monster.clone())
        .expect("forced spawn");
    assert_eq!(monster.name, "Dragon");

    // The combat menu never offers Charm against the Dragon.
    h.engine.dice_mut().queue_rolls([20, 5]);
    let events = submit(&mut h, "combat:spawn_continue");
    let ids = menu_ids(&events);
    assert!(ids.contains(&"combat:attack".to_string()));
    assert!(!ids.contains(&"combat:charm".to_string()));
}

#[test]
fn dragon_victory_commits_save_and_leaderboard() {
    let mut h = harness(43);
    standard_character(&mut h);
    clear_first_room(&mut h);

    h.engine.state_mut().depth = 4;
    h.engine.state_mut().peek_next = None;
    submit(&mut h, "dng:deeper");
    h.engine.dice_mut().queue_rolls([20, 5]);
    submit(&mut h, "combat:spawn_continue");
    slay_current_monster(&mut h);
    let events = submit(&mut h, "combat:victory_continue");
    let text = text_of(&events);
    assert!(text.contains("You defeated the Dragon"));
    assert_eq!(h.engine.combat_stage(), Some(CombatStage::DragonVictory));

    // The run is committed: save written, leaderboard appended.
    assert!(h.saves.load("qa-device").unwrap().is_some());
    let entries = h.leaderboard.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Ada");
    assert!(entries[0].stats.monsters_defeated >= 2);

    // Continue ends the run at the main menu.
    let events = submit(&mut h, "combat:continue");
    assert_eq!(h.engine.phase(), Phase::MainMenu);
    assert!(h.engine.character().is_none());
    assert!(menu_ids(&events).contains(&"main:new_game".to_string()));
}

#[test]
fn divine_vision_matches_the_next_room() {
    let mut h = harness(44);
    standard_character(&mut h); // WIS 17, PER 12
    clear_first_room(&mut h);

    let predicted = h
        .engine
        .state()
        .peek_next
        .clone()
        .and_then(|(_, name)| name)
        .expect("preview exists");

    h.engine.dice_mut().queue_rolls([20]); // 20 + 17 > 25
    let events = submit(&mut h, "dng:divine");
    let text = text_of(&events);
    assert!(text.contains(&format!("A vision shows a {predicted} ahead.")));

    submit(&mut h, "dng:continue");
    submit(&mut h, "dng:deeper");
    assert_eq!(current_monster_name(&h), predicted);
}

#[test]
fn listen_reports_the_predicted_monsters_sound() {
    let mut h = harness(45);
    standard_character(&mut h);
    clear_first_room(&mut h);

    h.engine.dice_mut().queue_rolls([20]); // 20 + 12 > 25
    let events = submit(&mut h, "dng:listen");
    let text = text_of(&events);
    assert!(text.contains("You hear:"));
    assert!(h.engine.character().map(|c| c.depth_flags.listen).unwrap_or(false));

    // Listening twice at one depth is refused.
    let events = submit(&mut h, "dng:continue");
    assert!(menu_ids(&events).contains(&"dng:listen".to_string()));
    let events = submit(&mut h, "dng:listen");
    assert!(text_of(&events).contains("already listened"));
}

#[test]
fn depth_flags_reset_when_descending() {
    let mut h = harness(46);
    standard_character(&mut h);
    clear_first_room(&mut h);

    h.engine.dice_mut().queue_rolls([20]);
    submit(&mut h, "dng:divine");
    assert!(h.engine.character().map(|c| c.depth_flags.divine).unwrap_or(false));
    submit(&mut h, "dng:continue");

    submit(&mut h, "dng:deeper");
    // A monster is engaged at the new depth, but the flag already reset.
    assert!(!h.engine.character().map(|c| c.depth_flags.divine).unwrap_or(true));
    assert_eq!(h.engine.depth(), 2);
}

#[test]
fn going_back_from_depth_one_returns_to_town() {
    let mut h = harness(47);
    standard_character(&mut h);
    clear_first_room(&mut h);
    assert_eq!(h.engine.depth(), 1);
    submit(&mut h, "dng:back");
    assert_eq!(h.engine.phase(), Phase::Town);
}

#[test]
fn empty_room_reports_no_chest() {
    let mut h = harness(48);
    standard_character(&mut h);
    clear_first_room(&mut h);
    // Whatever the room rolled, claim its chest (if any), then try again.
    submit(&mut h, "dng:open_chest");
    submit(&mut h, "dng:continue");
    let events = submit(&mut h, "dng:open_chest");
    assert!(text_of(&events).contains("There is no chest in this room."));
}

#[test]
fn rewards_scale_with_depth() {
    let mut h = harness(49);
    standard_character(&mut h);
    arm_with_greatblade(&mut h);
    enter_first_combat(&mut h);
    // Pretend we are deep: depth 3 doubles rewards.
    h.engine.state_mut().depth = 3;
    let monster_xp = h
        .engine
        .state()
        .current_room
        .as_ref()
        .and_then(|r| r.monster.as_ref())
        .map(|m| m.xp)
        .unwrap_or(0);
    slay_current_monster(&mut h);
    submit(&mut h, "combat:victory_continue");
    let c = h.engine.character().expect("character exists");
    assert_eq!(c.xp, (monster_xp * 2) as i64);
}
