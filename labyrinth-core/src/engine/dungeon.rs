//! Labyrinth navigation and room utilities.

use super::{CombatStage, CombatState, GameEngine, Phase};
use crate::dice::CHECK_DIE;
use crate::labyrinth;
use crate::world::{Attribute, DepthFlags};

impl GameEngine {
    /// Step through the town gate into the labyrinth.
    pub(crate) fn enter_labyrinth(&mut self) {
        if self.s.defer_depth_reset {
            self.s.defer_depth_reset = false;
            self.s.depth = 1;
            self.s.depth_history.clear();
        }
        self.phase = Phase::Dungeon;
        self.s.current_room = None;
        self.s.peek_next = None;
        self.clear();
        self.scene("labyrinth.png");
        self.flavor(
            "town",
            "gate_guard",
            &[],
            "Gate Guard Garrick: Mind yourself down there. The deep rooms don't give people back.",
        );
        self.enter_room();
    }

    /// Generate (or re-render) the current room. A fresh room resolves its
    /// trap first; an engaged monster moves the machine into combat.
    pub(crate) fn enter_room(&mut self) {
        if self.s.current_room.is_none() {
            let tables = self.tables.clone();
            let mut room = labyrinth::generate_room(
                &mut self.dice,
                &tables,
                self.s.depth,
                self.s.encounter_count,
            );
            // A committed preview (Divine or Listen) pins the monster so
            // the hint stays honest.
            if let Some(name) = self.s.forced_next_monster.take() {
                if !room.monster.as_ref().map(|m| m.is_dragon()).unwrap_or(false) {
                    if let Some(spec) = tables.monster(&name) {
                        room.monster = Some(spec.spawn(&mut self.dice));
                    }
                }
            }
            if let Some(trap) = room.trap.take() {
                let outcome = self.with_character(|c, dice| {
                    let out = crate::traps::resolve_trap(dice, c, &trap);
                    (out, c.hp)
                });
                if let Some((outcome, hp)) = outcome {
                    self.render_trap(&outcome);
                    self.update_stats();
                    if hp <= 0 {
                        self.s.current_room = Some(room);
                        self.attempt_revival();
                        return;
                    }
                }
            }
            self.s.current_room = Some(room);
        }

        self.refresh_peek();

        let (description, background, monster_line, dragon) = {
            let Some(room) = self.s.current_room.as_ref() else {
                return;
            };
            (
                room.description.clone(),
                room.background.clone(),
                room.monster.as_ref().map(|m| m.name.clone()),
                room.monster.as_ref().map(|m| m.is_dragon()).unwrap_or(false),
            )
        };

        self.clear();
        self.scene(background);
        let summary = self.s.character.as_ref().map(|c| c.summary()).unwrap_or_default();
        let depth = self.s.depth;
        self.say(format!(
            "=== Labyrinth Depth {depth} ===\n\n{summary}\n\n{description}"
        ));

        if let Some(name) = monster_line {
            self.s.encounter_count += 1;
            if dragon {
                self.flavor(
                    "system",
                    "dragon_appears",
                    &[],
                    "A thunderous wingbeat shakes the cavern. The Dragon emerges from the dark!",
                );
            } else {
                self.say(format!("A {name} appears!"));
                self.flavor("combat", "monster_taunt", &[("name", &name)], "");
            }
            if let Some(c) = self.s.character.as_mut() {
                c.examine_used = false;
            }
            self.phase = Phase::Combat;
            self.combat = Some(CombatState::new());
            self.pause();
            self.menu([("combat:spawn_continue", "Continue")]);
            self.update_stats();
        } else {
            self.pause();
            let mut items = vec![("dng:deeper".to_string(), "1) Go deeper".to_string())];
            if self.s.depth > 1 || !self.s.depth_history.is_empty() {
                items.push(("dng:back".to_string(), "2) Go back".to_string()));
            } else {
                items.push(("dng:back".to_string(), "2) Return to town".to_string()));
            }
            items.push(("dng:divine".to_string(), "3) Ask for divine assistance".to_string()));
            items.push(("dng:listen".to_string(), "4) Listen at the door".to_string()));
            items.push(("dng:open_chest".to_string(), "5) Open a chest".to_string()));
            items.push(("dng:examine_items".to_string(), "6) Examine magic items".to_string()));
            items.push(("dng:use_potion".to_string(), "7) Use a potion".to_string()));
            self.menu(items);
            self.update_stats();
        }
    }

    fn render_trap(&mut self, outcome: &crate::traps::TrapOutcome) {
        self.say(format!("Trap! {}!", outcome.name));
        self.say(format!("Dodge roll: {} vs DC {}", outcome.roll, outcome.dc));
        if outcome.dodged {
            self.say("You avoid the trap!");
            return;
        }
        if outcome.damage > 0 {
            let hp = self
                .s
                .character
                .as_ref()
                .map(|c| c.hp.max(0))
                .unwrap_or(0);
            self.say(format!(
                "You are hit for {} damage. HP: {hp}",
                outcome.damage
            ));
        }
        use crate::traps::TrapEffectOutcome::*;
        match &outcome.effect {
            Some(GoldLost(amount)) => {
                self.say(format!("Some of your gold turns to dust! You lose {amount} gold."))
            }
            Some(Poisoned { duration }) => {
                self.say(format!("You have been poisoned! ({duration} turns)"))
            }
            Some(WeaponRusted { weapon }) => self.say(format!(
                "Your {weapon} is splattered with corrosive dust, but it holds for now."
            )),
            Some(DexteritySapped { .. }) => self.say("Your dexterity is sapped by the mist."),
            None => {}
        }
    }

    /// Keep the next-room monster preview in sync with the current depth.
    fn refresh_peek(&mut self) {
        let target = self.s.depth + 1;
        let stale = self
            .s
            .peek_next
            .as_ref()
            .map(|(depth, _)| *depth != target)
            .unwrap_or(true);
        if !stale {
            return;
        }
        // The next engagement is one past the current room's monster.
        let engaged_after_this = self.s.encounter_count
            + self
                .s
                .current_room
                .as_ref()
                .map(|r| r.monster.is_some() as u32)
                .unwrap_or(0);
        let name = if labyrinth::dragon_forced(target, engaged_after_this) {
            Some("Dragon".to_string())
        } else {
            let tables = self.tables.clone();
            tables.wandering_monster(&mut self.dice).map(|m| m.name.clone())
        };
        self.s.peek_next = Some((target, name));
    }

    pub(crate) fn handle_dungeon(&mut self, action: &str) {
        match action {
            "dng:deeper" => {
                self.s.depth_history.push(self.s.depth);
                // Commit the preview so Divine/Listen hints come true.
                if let Some((depth, name)) = self.s.peek_next.take() {
                    if depth == self.s.depth + 1 {
                        self.s.forced_next_monster = name;
                    }
                }
                self.s.depth += 1;
                self.reset_depth_flags();
                self.s.current_room = None;
                self.enter_room();
            }
            "dng:back" => {
                self.reset_depth_flags();
                self.s.peek_next = None;
                match self.s.depth_history.pop() {
                    Some(depth) => {
                        self.s.depth = depth.max(1);
                        self.s.current_room = None;
                        self.enter_room();
                    }
                    None if self.s.depth > 1 => {
                        self.s.depth -= 1;
                        self.s.current_room = None;
                        self.enter_room();
                    }
                    None => {
                        self.clear();
                        self.enter_town();
                    }
                }
            }
            "dng:continue" => self.enter_room(),
            "dng:divine" => self.dungeon_divine(),
            "dng:listen" => self.dungeon_listen(),
            "dng:open_chest" => self.dungeon_open_chest(),
            "dng:examine_items" => self.dungeon_examine_items(),
            "dng:use_potion" => self.dungeon_potion_menu(),
            _ => {
                if let Some(name) = action.strip_prefix("dng:potion:") {
                    self.dungeon_use_potion(name);
                } else {
                    self.enter_room();
                }
            }
        }
    }

    fn reset_depth_flags(&mut self) {
        if let Some(c) = self.s.character.as_mut() {
            c.depth_flags = DepthFlags::default();
        }
    }

    /// Pray for a vision of the next room: `5d4 + WIS > 25`, once per depth.
    fn dungeon_divine(&mut self) {
        let used = self
            .s
            .character
            .as_ref()
            .map(|c| c.depth_flags.divine)
            .unwrap_or(true);
        if used {
            self.say("You've already asked for divine assistance at this depth.");
            self.pause_continue("dng:continue");
            return;
        }
        let result = self.with_character(|c, dice| {
            c.depth_flags.divine = true;
            let wisdom = c.attr(Attribute::Wisdom);
            let base = dice.roll(CHECK_DIE);
            (base, base + wisdom, wisdom)
        });
        let Some((base, total, wisdom)) = result else {
            self.enter_room();
            return;
        };
        self.say(format!(
            "You pray for guidance... Roll {base} + WIS {wisdom} = {total} (need >25)"
        ));
        if total > 25 {
            let hint = self.s.peek_next.clone().and_then(|(_, name)| name);
            match hint {
                Some(name) => self.say(format!("A vision shows a {name} ahead.")),
                None => self.say("A vision shows an empty corridor ahead."),
            }
        } else {
            self.say("No vision comes.");
        }
        self.pause_continue("dng:continue");
    }

    /// Listen at the door: `5d4 + PER > 25`, once per depth. Reports the
    /// sound of whatever the preview says is next.
    fn dungeon_listen(&mut self) {
        let used = self
            .s
            .character
            .as_ref()
            .map(|c| c.depth_flags.listen)
            .unwrap_or(true);
        if used {
            self.say("You've already listened at this depth.");
            self.pause_continue("dng:continue");
            return;
        }
        let result = self.with_character(|c, dice| {
            c.depth_flags.listen = true;
            let perception = c.attr(Attribute::Perception);
            let base = dice.roll(CHECK_DIE);
            (base, base + perception, perception)
        });
        let Some((base, total, perception)) = result else {
            self.enter_room();
            return;
        };
        self.clear();
        self.say(format!(
            "You listen carefully... Roll {base} + PER {perception} = {total} (need >25)"
        ));
        if total > 25 {
            let hint = self.s.peek_next.clone().and_then(|(_, name)| name);
            match hint {
                Some(name) => {
                    let sound = self
                        .tables
                        .monster(&name)
                        .and_then(|m| m.sound.clone())
                        .unwrap_or_else(|| "something unfamiliar".to_string());
                    self.say(format!("You hear: {sound}."));
                }
                None => self.say("It sounds quiet ahead."),
            }
        } else {
            self.say("You hear nothing useful.");
        }
        self.pause_continue("dng:continue");
    }

    fn dungeon_open_chest(&mut self) {
        self.clear();
        let chest = self
            .s
            .current_room
            .as_mut()
            .and_then(|room| room.chest.take());
        let Some(chest) = chest else {
            self.say("There is no chest in this room.");
            self.pause_continue("dng:continue");
            return;
        };
        let gold = chest.gold;
        if let Some(c) = self.s.character.as_mut() {
            c.gain_gold(gold);
        }
        self.say(format!("You open the chest and find {gold} gold!"));
        if let Some(spec) = chest.ring {
            let line = self.with_character(|c, dice| {
                let delta = spec.roll_delta(dice);
                c.bind_ring(crate::world::Ring {
                    name: spec.name.clone(),
                    attribute: spec.attribute,
                    delta,
                    cursed: spec.cursed,
                })
            });
            if let Some(line) = line {
                self.say(format!("Inside lies a {}!", spec.name));
                self.say(line);
                if spec.cursed {
                    self.say("A chill crawls up your arm. The ring is cursed!");
                }
            }
        }
        self.pause_continue("dng:continue");
    }

    fn dungeon_examine_items(&mut self) {
        self.clear();
        let rows = self
            .s
            .character
            .as_ref()
            .map(|c| {
                c.rings
                    .iter()
                    .map(|r| {
                        let status = if r.cursed { "CURSED" } else { "Blessed" };
                        let sign = if r.delta >= 0 { "+" } else { "" };
                        format!(
                            "{} ({status}) - {} {sign}{}",
                            r.name,
                            r.attribute.name(),
                            r.delta
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if rows.is_empty() {
            self.say("You have no magic items to examine.");
        } else {
            self.say("Magic items in your possession:");
            for (i, line) in rows.into_iter().enumerate() {
                self.say(format!("{}) {line}", i + 1));
            }
        }
        self.pause_continue("dng:continue");
    }

    /// Outside combat only Healing and Antidote make sense.
    fn dungeon_potion_menu(&mut self) {
        let Some((legacy, healing, antidote)) = self.s.character.as_ref().map(|c| {
            (
                c.potions,
                c.named_potion_count("Healing"),
                c.named_potion_count("Antidote"),
            )
        }) else {
            self.enter_room();
            return;
        };
        if legacy == 0 && healing == 0 && antidote == 0 {
            self.say("You don't have any potions fit for the road.");
            self.pause_continue("dng:continue");
            return;
        }
        self.say("Choose a potion to use:");
        let mut items: Vec<(String, String)> = Vec::new();
        let mut n = 1;
        if legacy > 0 {
            items.push((
                "dng:potion:found".to_string(),
                format!("{n}) Healing (found) ({legacy} uses)"),
            ));
            n += 1;
        }
        if healing > 0 {
            items.push((
                "dng:potion:Healing".to_string(),
                format!("{n}) Healing ({healing} uses)"),
            ));
            n += 1;
        }
        if antidote > 0 {
            items.push((
                "dng:potion:Antidote".to_string(),
                format!("{n}) Antidote ({antidote} uses)"),
            ));
            n += 1;
        }
        items.push(("dng:continue".to_string(), format!("{n}) Back")));
        self.menu(items);
        self.update_stats();
    }

    fn dungeon_use_potion(&mut self, name: &str) {
        enum Applied {
            Healed(i32),
            Cured,
            Nothing,
        }
        let applied = self.with_character(|c, dice| match name {
            "found" => {
                if c.potions > 0 {
                    c.potions -= 1;
                    c.stats.potions_used += 1;
                    let amount = crate::combat::healing_amount(dice, c.attr(Attribute::Constitution));
                    Applied::Healed(c.heal(amount))
                } else {
                    Applied::Nothing
                }
            }
            "Healing" => {
                if c.consume_potion("Healing") {
                    let amount = crate::combat::healing_amount(dice, c.attr(Attribute::Constitution));
                    Applied::Healed(c.heal(amount))
                } else {
                    Applied::Nothing
                }
            }
            "Antidote" => {
                if c.consume_potion("Antidote") {
                    c.poison_turns = 0;
                    Applied::Cured
                } else {
                    Applied::Nothing
                }
            }
            _ => Applied::Nothing,
        });
        match applied {
            Some(Applied::Healed(amount)) => {
                self.say(format!("You drink a healing potion and recover {amount} HP."))
            }
            Some(Applied::Cured) => {
                self.say("You drink the antidote and feel the poison leave your system.")
            }
            Some(Applied::Nothing) => self.say("This potion can only be used in combat."),
            None => {}
        }
        self.pause_continue("dng:continue");
    }
}

impl GameEngine {
    /// Current combat stage, if a fight is underway.
    pub fn combat_stage(&self) -> Option<CombatStage> {
        self.combat.as_ref().map(|c| c.stage)
    }
}
