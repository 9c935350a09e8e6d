//! Character creation: name entry, serialized attribute assignment, and
//! the staged HP/gold reveal.

use super::{CreationStep, GameEngine, Phase};
use crate::dice::DieSpec;
use crate::world::{Attribute, Character};
use serde_json::Value;

impl GameEngine {
    pub(crate) fn handle_create_name(&mut self, action: &str, payload: Option<&Value>) {
        if action != "prompt:submit" {
            self.prompt("name", "Enter your name:");
            self.menu([("prompt:submit", "OK")]);
            return;
        }
        let name = payload
            .and_then(|p| p.get("value"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Adventurer")
            .to_string();

        self.phase = Phase::CreateAttrs;
        self.s.creation.name = name;
        self.s.creation.pending_attrs = Attribute::all().to_vec();
        self.s.creation.assignments.clear();
        self.s.creation.pending_roll = None;
        self.s.creation.step = CreationStep::AwaitRoll;

        self.clear();
        let difficulty = self.s.creation.difficulty;
        self.say(format!(
            "Difficulty: {} ({} stat rolls)",
            difficulty.name(),
            difficulty.stat_dice()
        ));
        self.say("Rolling your attributes...");
        self.menu([("create:roll", "Roll for attribute 1 of 7")]);
    }

    pub(crate) fn handle_create_attrs(&mut self, action: &str) {
        match self.s.creation.step {
            CreationStep::AwaitRoll if action == "create:roll" => self.creation_roll(),
            CreationStep::AwaitAssign if action.starts_with("create:assign:") => {
                let name = &action["create:assign:".len()..];
                match Attribute::from_name(name) {
                    Some(attr) => self.creation_assign(attr),
                    None => self.creation_show_assign_menu(),
                }
            }
            CreationStep::Recap if action == "create:continue" => self.creation_hp_gold(),
            CreationStep::HpGold if action == "create:continue" => self.creation_summary(),
            CreationStep::Summary if action == "create:continue" => {
                self.clear();
                self.enter_town();
            }
            CreationStep::AwaitRoll => {
                self.menu([(
                    "create:roll",
                    format!(
                        "Roll for attribute {} of 7",
                        self.s.creation.assignments.len() + 1
                    ),
                )]);
            }
            CreationStep::AwaitAssign => self.creation_show_assign_menu(),
            _ => self.pause_continue("create:continue"),
        }
    }

    fn creation_roll(&mut self) {
        let dice_spec = self.s.creation.difficulty.stat_dice();
        let roll = self.dice.roll(dice_spec);
        self.s.creation.pending_roll = Some(roll);
        self.s.creation.step = CreationStep::AwaitAssign;
        self.clear();
        self.say(format!(
            "Rolling for attribute {} of 7...",
            self.s.creation.assignments.len() + 1
        ));
        self.say(format!("You rolled a {roll}!"));
        self.say("Choose which attribute to assign this value to:");
        self.creation_show_assign_menu();
    }

    fn creation_show_assign_menu(&mut self) {
        let items: Vec<(String, String)> = self
            .s
            .creation
            .pending_attrs
            .iter()
            .map(|attr| (format!("create:assign:{}", attr.name()), attr.name().to_string()))
            .collect();
        self.menu(items);
    }

    fn creation_assign(&mut self, attr: Attribute) {
        let Some(position) = self.s.creation.pending_attrs.iter().position(|a| *a == attr) else {
            self.creation_show_assign_menu();
            return;
        };
        let Some(roll) = self.s.creation.pending_roll.take() else {
            self.s.creation.step = CreationStep::AwaitRoll;
            return;
        };
        self.s.creation.pending_attrs.remove(position);
        self.s.creation.assignments.push((attr, roll));

        if self.s.creation.pending_attrs.is_empty() {
            self.s.creation.step = CreationStep::Recap;
            self.clear();
            self.say(format!("Assigned {roll} to {}!", attr.name()));
            self.say("Final stats:");
            let lines: Vec<String> = Attribute::all()
                .iter()
                .filter_map(|a| {
                    self.s
                        .creation
                        .assignments
                        .iter()
                        .find(|(assigned, _)| assigned == a)
                        .map(|(_, value)| format!("{}: {}", a.name(), value))
                })
                .collect();
            for line in lines {
                self.say(line);
            }
            self.pause();
            self.menu([("create:continue", "Continue")]);
        } else {
            self.s.creation.step = CreationStep::AwaitRoll;
            self.clear();
            self.say(format!("Assigned {roll} to {}!", attr.name()));
            self.menu([(
                "create:roll",
                format!(
                    "Roll for attribute {} of 7",
                    self.s.creation.assignments.len() + 1
                ),
            )]);
        }
    }

    /// Starting HP is `3*CON + 5d4`; gold is `20d6 + ceil(CHA/1.5)d6` plus
    /// a tiered bonus favoring fragile characters.
    fn creation_hp_gold(&mut self) {
        let assigned = |attr: Attribute| {
            self.s
                .creation
                .assignments
                .iter()
                .find(|(a, _)| *a == attr)
                .map(|(_, v)| *v)
                .unwrap_or(10)
        };
        let con = assigned(Attribute::Constitution);
        let cha = assigned(Attribute::Charisma);

        self.clear();
        self.say("Calculating your starting HP and Gold...");
        self.say(format!("Your Constitution is {con}..."));
        let base_hp = 3 * con;
        let hp_bonus = self.dice.roll(DieSpec::new(5, 4));
        let hp = base_hp + hp_bonus;
        self.say(format!("Base HP: {base_hp} + Bonus: {hp_bonus} = {hp} HP!"));

        self.say("Rolling 20d6 for starting gold...");
        let base_gold = self.dice.roll(DieSpec::new(20, 6));
        let cha_dice = charisma_gold_dice(cha);
        let cha_bonus = if cha_dice > 0 {
            self.say(format!("Charisma bonus: rolling {cha_dice}d6..."));
            self.dice.roll(DieSpec::new(cha_dice, 6))
        } else {
            0
        };
        let tier = match hp {
            hp if hp < 25 => Some(DieSpec::new(15, 6)),
            hp if hp < 30 => Some(DieSpec::new(10, 6)),
            hp if hp < 40 => Some(DieSpec::new(7, 6)),
            hp if hp < 50 => Some(DieSpec::new(5, 6)),
            hp if hp < 60 => Some(DieSpec::new(3, 6)),
            _ => None,
        };
        let low_hp_bonus = match tier {
            Some(die) => {
                self.say(format!("Low-HP bonus: +{die} (because HP {hp})"));
                self.dice.roll(die)
            }
            None => 0,
        };
        let gold = base_gold + cha_bonus + low_hp_bonus;
        self.say(format!(
            "Base Gold: {base_gold} + CHA Bonus: {cha_bonus} + Low-HP Bonus: {low_hp_bonus} = {gold} Gold!"
        ));

        let mut character = Character::new(
            self.s.creation.name.clone(),
            self.s.creation.difficulty,
            self.device_id.clone(),
        );
        for (attr, value) in &self.s.creation.assignments {
            character.attributes.set(*attr, *value);
        }
        character.max_hp = hp;
        character.hp = hp;
        character.gold = gold;
        self.s.character = Some(character);
        self.s.depth = 1;
        self.s.depth_history.clear();
        self.s.encounter_count = 0;
        self.s.defer_depth_reset = false;

        self.s.creation.step = CreationStep::HpGold;
        self.pause_continue("create:continue");
    }

    fn creation_summary(&mut self) {
        self.s.creation.step = CreationStep::Summary;
        self.clear();
        self.say("Character creation complete!");
        let (name, hp, gold) = match &self.s.character {
            Some(c) => (c.name.clone(), c.hp, c.gold),
            None => ("Adventurer".to_string(), 0, 0),
        };
        self.say(format!("Name: {name}"));
        self.say(format!("HP: {hp}"));
        self.say(format!("Gold: {gold}"));
        self.say(
            "You start with no weapons or armor - visit the shop to equip yourself! Best of luck, Explorer.",
        );
        self.pause();
        self.menu([("create:continue", "Continue")]);
    }
}

/// Gold dice granted for the charisma score, spelled `ceil(CHA/1.5)`.
pub fn charisma_gold_dice(cha: i32) -> u32 {
    ((cha as f64) / 1.5).ceil() as u32
}
