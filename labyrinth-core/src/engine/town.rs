//! Town hub services.
//!
//! Every service follows the same shape: compute the outcome against the
//! character, then emit the result page gated by a Continue menu. Gold
//! shortfalls are reported with the explicit amounts.

use super::{GameEngine, Phase};
use crate::dice::{DieSpec, CHECK_DIE};
use crate::world::{Attribute, TownFlags, TrainError};
use serde_json::Value;

/// Once-per-visit recovery services and their check attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Rest,
    Eat,
    Tavern,
    Pray,
    Sleep,
}

impl Recovery {
    fn cost(&self) -> i32 {
        match self {
            Recovery::Rest | Recovery::Eat | Recovery::Tavern => 10,
            Recovery::Pray | Recovery::Sleep => 0,
        }
    }

    fn attribute(&self) -> Attribute {
        match self {
            Recovery::Rest | Recovery::Sleep => Attribute::Constitution,
            Recovery::Eat | Recovery::Tavern => Attribute::Charisma,
            Recovery::Pray => Attribute::Wisdom,
        }
    }

    fn scene(&self) -> &'static str {
        match self {
            Recovery::Rest | Recovery::Sleep => "town_menu/inn.png",
            Recovery::Eat => "town_menu/eat.png",
            Recovery::Tavern => "town_menu/tavern.png",
            Recovery::Pray => "town_menu/temple.png",
        }
    }

    fn flag<'a>(&self, flags: &'a mut TownFlags) -> &'a mut bool {
        match self {
            Recovery::Rest => &mut flags.rest,
            Recovery::Eat => &mut flags.eat,
            Recovery::Tavern => &mut flags.tavern,
            Recovery::Pray => &mut flags.pray,
            Recovery::Sleep => &mut flags.sleep,
        }
    }

    fn greeting(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Recovery::Rest => ("town", "innkeeper", "You take a rest at the inn..."),
            Recovery::Eat => (
                "town",
                "cook",
                "Hera: Sit, eat. Heroes fight worse on an empty stomach.",
            ),
            Recovery::Tavern => ("town", "bartender", "Roth: What'll it be?"),
            Recovery::Pray => (
                "town",
                "priestess",
                "Eira: Kneel, and speak your worries to the quiet.",
            ),
            Recovery::Sleep => ("town", "innkeeper", "You settle in to sleep..."),
        }
    }
}

/// Result of a recovery attempt, computed before any event is emitted.
enum RecoveryOutcome {
    AlreadyUsed,
    NotEnoughGold { cost: i32, gold: i32 },
    Checked { attr: Attribute, total: i32, healed: Option<i32> },
}

impl GameEngine {
    /// Arrive in town: reset the per-visit flags and show the hub menu.
    pub(crate) fn enter_town(&mut self) {
        self.phase = Phase::Town;
        self.combat = None;
        self.gamble = Default::default();
        self.shop = Default::default();
        self.naming_companion = false;
        if let Some(c) = self.s.character.as_mut() {
            c.town = TownFlags::default();
        }
        self.render_town_menu();
    }

    pub(crate) fn render_town_menu(&mut self) {
        self.scene("town_menu/town.png");
        self.say("=== Town ===");
        let summary = self.s.character.as_ref().map(|c| c.summary());
        if let Some(summary) = summary {
            self.say(summary);
        }
        self.menu([
            ("town:enter", "1) Venture into the Labyrinth"),
            ("town:shop", "2) Visit Shop"),
            ("town:inventory", "3) Inventory"),
            ("town:rest", "4) Rest at the Inn (10g)"),
            ("town:healer", "5) Visit Healer (40g)"),
            ("town:tavern", "6) Tavern (10g)"),
            ("town:eat", "7) Eat (10g)"),
            ("town:gamble", "8) Gamble"),
            ("town:pray", "9) Temple"),
            ("town:level", "10) Level Up"),
            ("town:quests", "11) Quests"),
            ("town:train", "12) Train"),
            ("town:sleep", "13) Sleep"),
            ("town:companion", "14) Companion"),
            ("town:repair", "15) Repair (30g)"),
            ("town:remove_curses", "16) Remove Curses (10g)"),
            ("town:save", "17) Save"),
            ("town:quit", "18) Quit"),
        ]);
        self.update_stats();
    }

    pub(crate) fn handle_town(&mut self, action: &str, payload: Option<&Value>) {
        if self.gamble.active() {
            self.handle_gamble(action, payload);
            return;
        }
        if self.naming_companion {
            self.companion_submit_name(action, payload);
            return;
        }
        if let Some(attr) = action.strip_prefix("train:") {
            self.train_attribute(attr);
            return;
        }
        if let Some(attr) = action.strip_prefix("level:") {
            self.level_attribute(attr);
            return;
        }
        if let Some(rest) = action.strip_prefix("repair:") {
            self.repair_item(rest);
            return;
        }
        if let Some(index) = action.strip_prefix("curse:") {
            self.remove_curse(index);
            return;
        }
        match action {
            "town" => {
                self.clear();
                self.render_town_menu();
            }
            "town:enter" => self.enter_labyrinth(),
            "town:shop" => {
                self.phase = Phase::Shop;
                self.shop_show_categories();
            }
            "town:inventory" => {
                self.phase = Phase::Inventory;
                self.inventory_show();
            }
            "town:rest" => self.town_recovery(Recovery::Rest),
            "town:eat" => self.town_recovery(Recovery::Eat),
            "town:tavern" => self.town_recovery(Recovery::Tavern),
            "town:pray" => self.town_recovery(Recovery::Pray),
            "town:sleep" => self.town_recovery(Recovery::Sleep),
            "town:healer" => self.town_healer(),
            "town:train" => self.train_menu(),
            "town:level" => self.level_menu(),
            "town:quests" | "quests:continue" => self.quests_menu(),
            "quests:new" => self.quests_request(),
            "town:companion" => self.companion_menu(),
            "comp:name" => self.companion_ask_name(),
            "comp:heal" => self.companion_heal(),
            "town:repair" => self.repair_menu(),
            "town:remove_curses" => self.remove_curses_menu(),
            "town:gamble" => self.gamble_start(),
            "town:save" => self.town_save(),
            "town:quit" => self.abandon_to_main_menu(),
            _ => {
                self.clear();
                self.render_town_menu();
            }
        }
    }

    /// Leave the character behind and return to the main menu. The save on
    /// disk, if any, is untouched.
    fn abandon_to_main_menu(&mut self) {
        self.s.character = None;
        self.s.current_room = None;
        self.s.depth = 1;
        self.s.depth_history.clear();
        self.s.encounter_count = 0;
        self.phase = Phase::MainMenu;
        self.render_main_menu();
    }

    fn town_recovery(&mut self, kind: Recovery) {
        self.clear();
        self.scene(kind.scene());
        let cost = kind.cost();
        let outcome = self.with_character(|c, dice| {
            if *kind.flag(&mut c.town) {
                return RecoveryOutcome::AlreadyUsed;
            }
            if c.gold < cost {
                return RecoveryOutcome::NotEnoughGold { cost, gold: c.gold };
            }
            *kind.flag(&mut c.town) = true;
            c.spend_gold(cost);
            let attr = kind.attribute();
            let total = dice.roll(CHECK_DIE) + c.attr(attr);
            let healed = if total > 25 {
                let heal = ((c.max_hp + 2) / 3).max(1);
                Some(c.heal(heal))
            } else {
                None
            };
            RecoveryOutcome::Checked { attr, total, healed }
        });
        let Some(outcome) = outcome else {
            self.render_town_menu();
            return;
        };
        match outcome {
            RecoveryOutcome::AlreadyUsed => {
                self.say("You've already refreshed in town this visit.");
            }
            RecoveryOutcome::NotEnoughGold { cost, gold } => {
                self.say("You don't have enough gold.");
                self.say(format!("You need {cost}g but have {gold}g."));
            }
            RecoveryOutcome::Checked { attr, total, healed } => {
                let (section, key, default) = kind.greeting();
                self.flavor(section, key, &[], default);
                if cost > 0 {
                    self.say(format!("Paid {cost}g."));
                }
                self.say(format!("{} check: roll {total} (need >25)", attr.abbr()));
                match healed {
                    Some(actual) => self.say(format!("You feel restored and recover {actual} HP.")),
                    None => self.say("You don't feel much better."),
                }
            }
        }
        self.pause_continue("town");
    }

    fn town_healer(&mut self) {
        self.clear();
        self.scene("town_menu/healer.png");
        let outcome = self.with_character(|c, _| {
            if c.gold < 40 {
                Err(c.gold)
            } else {
                c.spend_gold(40);
                c.hp = c.max_hp;
                c.poison_turns = 0;
                Ok(())
            }
        });
        match outcome {
            Some(Ok(())) => {
                self.flavor(
                    "town",
                    "healer",
                    &[],
                    "Sister Elwen: The townsfolk heal your wounds and cleanse harmful effects.",
                );
                self.say("Paid 40g.");
            }
            Some(Err(gold)) => {
                self.say("You don't have enough gold.");
                self.say(format!("You need 40g but have {gold}g."));
            }
            None => {
                self.render_town_menu();
                return;
            }
        }
        self.pause_continue("town");
    }

    // ----- training -----

    fn train_menu(&mut self) {
        self.clear();
        self.scene("town_menu/training.png");
        let Some((capped, cost, values)) = self
            .s
            .character
            .as_ref()
            .map(|c| {
                (
                    c.trained_total() >= crate::world::TRAINING_CAP,
                    c.train_cost(),
                    Attribute::all().map(|a| c.attr(a)),
                )
            })
        else {
            self.render_town_menu();
            return;
        };
        self.flavor("town", "trainer", &[], "Garron: Sweat now, bleed less below.");
        if capped {
            self.say("Garron: You cannot train any further.");
            self.pause_continue("town");
            return;
        }
        self.say(format!("Garron: Choose an attribute to train ({cost}g):"));
        let mut items = vec![("town".to_string(), "Back".to_string())];
        for (i, attr) in Attribute::all().iter().enumerate() {
            items.push((
                format!("train:{}", attr.name()),
                format!("{}) {} ({})", i + 1, attr.name(), values[i]),
            ));
        }
        self.menu(items);
        self.update_stats();
    }

    fn train_attribute(&mut self, name: &str) {
        let Some(attr) = Attribute::from_name(name) else {
            self.train_menu();
            return;
        };
        let outcome = self.with_character(|c, _| c.train(attr).map(|cost| (cost, c.attr(attr), c.gold)));
        match outcome {
            Some(Ok((cost, value, _))) => {
                self.say(format!("Paid {cost}g."));
                self.say(format!("You train {} to {}.", attr.name(), value));
                self.pause_continue("town");
            }
            Some(Err(TrainError::CapReached)) => {
                self.say("Garron: You cannot train any further.");
                self.pause_continue("town");
            }
            Some(Err(TrainError::NotEnoughGold { cost })) => {
                let gold = self.s.character.as_ref().map(|c| c.gold).unwrap_or(0);
                self.say(format!(
                    "Garron: Training costs {cost}g; you don't have enough."
                ));
                self.say(format!("You need {cost}g but have {gold}g."));
                self.pause_continue("town");
            }
            None => self.render_town_menu(),
        }
    }

    // ----- level up -----

    fn level_menu(&mut self) {
        self.clear();
        let Some((unspent, values)) = self
            .s
            .character
            .as_ref()
            .map(|c| (c.unspent_stat_points, Attribute::all().map(|a| c.attr(a))))
        else {
            self.render_town_menu();
            return;
        };
        if unspent == 0 {
            self.say("You have no unspent stat points.");
            self.render_town_menu();
            return;
        }
        self.say(format!("Allocate a stat point ({unspent} unspent):"));
        let mut items = vec![("town".to_string(), "Back".to_string())];
        for (i, attr) in Attribute::all().iter().enumerate() {
            items.push((
                format!("level:{}", attr.name()),
                format!("{}) {} ({})", i + 1, attr.name(), values[i]),
            ));
        }
        self.menu(items);
        self.update_stats();
    }

    fn level_attribute(&mut self, name: &str) {
        let Some(attr) = Attribute::from_name(name) else {
            self.level_menu();
            return;
        };
        let outcome = self.with_character(|c, _| {
            if c.spend_point(attr) {
                Some((c.attr(attr), c.unspent_stat_points))
            } else {
                None
            }
        });
        match outcome {
            Some(Some((value, remaining))) => {
                self.say(format!("You increase {} to {}.", attr.name(), value));
                self.update_stats();
                if remaining > 0 {
                    self.level_menu();
                } else {
                    self.say("Level-up allocation complete.");
                    self.pause_continue("town");
                }
            }
            Some(None) => self.level_menu(),
            None => self.render_town_menu(),
        }
    }

    // ----- quests -----

    fn quests_menu(&mut self) {
        self.clear();
        let Some(lines) = self.s.character.as_ref().map(|c| {
            c.quests
                .iter()
                .map(|q| format!("- {} - Reward: {}g", q.describe(), q.reward))
                .collect::<Vec<_>>()
        }) else {
            self.render_town_menu();
            return;
        };
        self.say("Town Bulletin: === Side Quests ===");
        if lines.is_empty() {
            self.say("You have no active side quests.");
        } else {
            self.say("Current side quests:");
            for line in lines {
                self.say(line);
            }
        }
        self.menu([
            ("quests:new", "1) Ask for New Side Quests"),
            ("town", "2) Back"),
        ]);
        self.update_stats();
    }

    fn quests_request(&mut self) {
        let tables = self.tables.clone();
        let added = self.with_character(|c, dice| {
            if !crate::quests::can_offer(c) {
                None
            } else {
                Some(crate::quests::generate_offers(dice, &tables, c))
            }
        });
        match added {
            Some(None) => self.say("You already have three side quests."),
            Some(Some(added)) if added.is_empty() => {
                self.say("The bulletin has nothing new today.")
            }
            Some(Some(added)) => {
                self.say("New side quest offers have been posted:");
                for quest in added {
                    self.say(format!("- {} - Reward: {}g", quest.describe(), quest.reward));
                }
            }
            None => {
                self.render_town_menu();
                return;
            }
        }
        self.pause();
        self.menu([("quests:continue", "Continue")]);
    }

    // ----- companion -----

    fn companion_menu(&mut self) {
        self.clear();
        self.say("=== Companion ===");
        let line = self.s.character.as_ref().and_then(|c| {
            c.companion.as_ref().map(|comp| {
                format!(
                    "{} ({} tier) | HP {}/{}",
                    comp.name,
                    comp.tier.name(),
                    comp.hp,
                    comp.max_hp
                )
            })
        });
        match line {
            Some(line) => self.say(line),
            None => self.say("No creature walks beside you. A Summon Creature scroll can change that."),
        }
        self.menu([
            ("comp:name", "1) Name companion"),
            ("comp:heal", "2) Heal companion (uses a Healing potion)"),
            ("town", "3) Back"),
        ]);
    }

    fn companion_ask_name(&mut self) {
        let has_companion = self
            .s
            .character
            .as_ref()
            .map(|c| c.companion.is_some())
            .unwrap_or(false);
        if !has_companion {
            self.say("You have no companion to name.");
            self.companion_menu();
            return;
        }
        self.naming_companion = true;
        self.say("What will you call your companion?");
        self.prompt("name", "Enter new name:");
        self.menu([("prompt:submit", "OK"), ("town", "Back")]);
    }

    fn companion_submit_name(&mut self, action: &str, payload: Option<&Value>) {
        self.naming_companion = false;
        if action != "prompt:submit" {
            self.clear();
            self.render_town_menu();
            return;
        }
        let new_name = payload
            .and_then(|p| p.get("value"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let renamed = self.with_character(|c, _| match (c.companion.as_mut(), new_name) {
            (Some(comp), Some(name)) => {
                comp.name = name.clone();
                Ok(name)
            }
            (None, _) => Err("You have no companion to name."),
            (_, None) => Err("That name won't stick."),
        });
        match renamed {
            Some(Ok(name)) => self.say(format!("Your companion is now named {name}.")),
            Some(Err(reason)) => self.say(reason),
            None => {}
        }
        self.companion_menu();
    }

    fn companion_heal(&mut self) {
        let outcome = self.with_character(|c, dice| {
            if c.companion.is_none() {
                return Err("You have no companion.");
            }
            let consumed = if c.potions > 0 {
                c.potions -= 1;
                c.stats.potions_used += 1;
                true
            } else {
                c.consume_potion("Healing")
            };
            if !consumed {
                return Err("You have no healing potions.");
            }
            let heal = dice.roll(DieSpec::new(2, 4)).max(1);
            let comp = c.companion.as_mut().ok_or("You have no companion.")?;
            let before = comp.hp;
            comp.hp = (comp.hp + heal).min(comp.max_hp);
            Ok(comp.hp - before)
        });
        match outcome {
            Some(Ok(actual)) => {
                self.say(format!("You heal your companion for {actual} HP."));
                self.pause_continue("town");
            }
            Some(Err(reason)) => {
                self.say(reason);
                self.companion_menu();
            }
            None => self.render_town_menu(),
        }
    }

    // ----- repair and curses -----

    fn repair_menu(&mut self) {
        self.clear();
        self.scene("town_menu/weaponsmith.png");
        let Some((gold, damaged_weapons, damaged_armors)) = self.s.character.as_ref().map(|c| {
            let weapons: Vec<(usize, String)> = c
                .weapons
                .iter()
                .enumerate()
                .filter(|(_, w)| w.damaged)
                .map(|(i, w)| (i, w.name.clone()))
                .collect();
            let armors: Vec<(usize, String)> = c
                .armors
                .iter()
                .enumerate()
                .filter(|(_, a)| a.damaged)
                .map(|(i, a)| (i, a.name.clone()))
                .collect();
            (c.gold, weapons, armors)
        }) else {
            self.render_town_menu();
            return;
        };
        self.flavor("town", "weaponsmith", &[], "Thorin: Blacksmith at your service.");
        self.say(format!("Gold: {gold}g"));
        if damaged_weapons.is_empty() && damaged_armors.is_empty() {
            self.say("All your equipment is in good condition.");
            self.render_town_menu();
            return;
        }
        let mut items = vec![("town".to_string(), "1) Back".to_string())];
        let mut n = 2;
        for (i, name) in damaged_weapons {
            items.push((
                format!("repair:w:{i}"),
                format!("{n}) {name} (reduced effectiveness)"),
            ));
            n += 1;
        }
        for (i, name) in damaged_armors {
            items.push((
                format!("repair:a:{i}"),
                format!("{n}) {name} (reduced protection)"),
            ));
            n += 1;
        }
        self.menu(items);
        self.update_stats();
    }

    fn repair_item(&mut self, rest: &str) {
        const COST: i32 = 30;
        let Some((kind, index)) = rest.split_once(':') else {
            self.repair_menu();
            return;
        };
        let Ok(index) = index.parse::<usize>() else {
            self.repair_menu();
            return;
        };
        let is_weapon = kind == "w";
        let outcome = self.with_character(|c, _| {
            if c.gold < COST {
                return Err(c.gold);
            }
            let repaired = if is_weapon {
                c.weapons.get_mut(index).filter(|w| w.damaged).map(|w| {
                    w.damaged = false;
                    w.name.clone()
                })
            } else {
                c.armors.get_mut(index).filter(|a| a.damaged).map(|a| {
                    a.damaged = false;
                    a.name.clone()
                })
            };
            if repaired.is_some() {
                c.spend_gold(COST);
            }
            Ok(repaired)
        });
        match outcome {
            Some(Ok(Some(name))) => {
                self.say(format!("Paid {COST}g."));
                self.say(format!("Your {name} has been repaired!"));
                self.update_stats();
                self.repair_menu();
            }
            Some(Ok(None)) => self.repair_menu(),
            Some(Err(gold)) => {
                self.say(format!("Repair costs {COST}g; you don't have enough."));
                self.say(format!("You need {COST}g but have {gold}g."));
                self.repair_menu();
            }
            None => self.render_town_menu(),
        }
    }

    fn remove_curses_menu(&mut self) {
        self.clear();
        self.scene("town_menu/healer.png");
        let Some(cursed) = self.s.character.as_ref().map(|c| {
            c.rings
                .iter()
                .enumerate()
                .filter(|(_, r)| r.cursed)
                .map(|(i, r)| (i, r.name.clone()))
                .collect::<Vec<_>>()
        }) else {
            self.render_town_menu();
            return;
        };
        if cursed.is_empty() {
            self.say("You have no cursed items.");
            self.render_town_menu();
            return;
        }
        self.say("Which curse should be lifted? (10g each)");
        let mut items = vec![("town".to_string(), "1) Back".to_string())];
        for (n, (i, name)) in cursed.into_iter().enumerate() {
            items.push((format!("curse:{i}"), format!("{}) {name}", n + 2)));
        }
        self.menu(items);
    }

    fn remove_curse(&mut self, index: &str) {
        const COST: i32 = 10;
        let Ok(index) = index.parse::<usize>() else {
            self.remove_curses_menu();
            return;
        };
        let outcome = self.with_character(|c, _| {
            if c.gold < COST {
                return Err(c.gold);
            }
            let cleansed = c.cleanse_ring(index);
            if cleansed.is_some() {
                c.spend_gold(COST);
            }
            Ok(cleansed)
        });
        match outcome {
            Some(Ok(Some(line))) => {
                self.say(format!("Paid {COST}g."));
                self.say(line);
                self.pause_continue("town");
            }
            Some(Ok(None)) => self.remove_curses_menu(),
            Some(Err(gold)) => {
                self.say(format!("Cleansing costs {COST}g; you have {gold}g."));
                self.pause_continue("town");
            }
            None => self.render_town_menu(),
        }
    }

    // ----- save -----

    fn town_save(&mut self) {
        let Some(record) = self.s.character.as_ref().map(|c| c.to_record()) else {
            self.render_town_menu();
            return;
        };
        match self.saves.save(&self.device_id, &record) {
            Ok(()) => self.say("Game saved."),
            Err(err) => {
                tracing::warn!(%err, "save failed");
                self.say("Saving failed; your progress stays in this session only.");
            }
        }
        self.pause_continue("town");
    }
}
