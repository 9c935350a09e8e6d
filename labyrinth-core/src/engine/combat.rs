//! Combat orchestration, victory resolution, and the revival flow.
//!
//! The resolver in `crate::combat` owns the rules; this module owns the
//! turn loop, the contextual menus, and the pause-gated result pages.

use super::{CombatState, GameEngine, Phase};
use crate::combat::{
    self, AttackKind, MonsterAttackKind, PotionApplied, SpellApplied, Zone,
};
use crate::content::{PotionKind, SpellKind};
use crate::labyrinth::monster_background;
use crate::persist::LeaderboardEntry;
use crate::world::{Attribute, Monster};

/// Where the combat sub-machine currently waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatStage {
    SpawnPause,
    PlayerMenu,
    AttackAim,
    MonsterDefend,
    PotionMenu,
    SpellMenu,
    LightningMode,
    ExaminePause,
    CharmFailPause,
    CharmSuccessPause,
    RunFailPause,
    RunSuccessPause,
    VictoryPause,
    VictorySummary,
    DragonVictory,
    RevivalSuccess,
    RevivalFail,
}

impl GameEngine {
    /// Shared battle access: character, engaged monster, combat state, dice.
    fn with_battle<R>(
        &mut self,
        f: impl FnOnce(
            &mut crate::world::Character,
            &mut Monster,
            &mut CombatState,
            &mut crate::dice::Dice,
        ) -> R,
    ) -> Option<R> {
        let character = self.s.character.as_mut()?;
        let monster = self.s.current_room.as_mut()?.monster.as_mut()?;
        let combat = self.combat.as_mut()?;
        Some(f(character, monster, combat, &mut self.dice))
    }

    fn monster_snapshot(&self) -> Option<Monster> {
        self.s
            .current_room
            .as_ref()
            .and_then(|r| r.monster.as_ref())
            .cloned()
    }

    fn set_stage(&mut self, stage: CombatStage) {
        if let Some(combat) = self.combat.as_mut() {
            combat.stage = stage;
        }
    }

    pub(crate) fn handle_combat(&mut self, action: &str) {
        let Some(stage) = self.combat.as_ref().map(|c| c.stage) else {
            // No combat state; fall back to the room view.
            self.phase = Phase::Dungeon;
            self.enter_room();
            return;
        };
        match stage {
            CombatStage::SpawnPause if action == "combat:spawn_continue" => {
                self.combat_initiative()
            }
            CombatStage::PlayerMenu => self.combat_player_action(action),
            CombatStage::AttackAim => {
                if let Some(zone) = action.strip_prefix("combat:aim:").and_then(Zone::from_id) {
                    self.combat_resolve_player_attack(zone);
                } else {
                    self.emit_aim_menu();
                }
            }
            CombatStage::MonsterDefend => {
                if let Some(zone) = action.strip_prefix("combat:block:").and_then(Zone::from_id) {
                    self.combat_resolve_monster_attack(zone);
                } else {
                    self.emit_block_menu();
                }
            }
            CombatStage::PotionMenu => self.combat_potion_action(action),
            CombatStage::SpellMenu => self.combat_spell_action(action),
            CombatStage::LightningMode => self.combat_lightning_action(action),
            CombatStage::ExaminePause if action == "combat:after_examine" => {
                // Examine does not end the turn; back to the menu directly.
                self.set_stage(CombatStage::PlayerMenu);
                self.emit_player_menu();
            }
            CombatStage::CharmFailPause | CombatStage::RunFailPause
                if action == "combat:continue" =>
            {
                self.to_monster_turn()
            }
            CombatStage::CharmSuccessPause if action == "combat:continue" => {
                self.combat = None;
                self.phase = Phase::Dungeon;
                self.enter_room();
            }
            CombatStage::RunSuccessPause if action == "combat:continue" => {
                self.combat = None;
                self.s.current_room = None;
                self.clear();
                self.enter_town();
            }
            CombatStage::VictoryPause if action == "combat:victory_continue" => {
                self.combat_victory()
            }
            CombatStage::VictorySummary if action == "combat:continue" => {
                self.combat = None;
                self.phase = Phase::Dungeon;
                self.enter_room();
            }
            CombatStage::DragonVictory if action == "combat:continue" => {
                self.clear();
                self.scene_reset();
                self.flavor(
                    "system",
                    "dragon_epilogue",
                    &[],
                    "You have conquered the Labyrinth. Peace returns to the realm.",
                );
                self.s.character = None;
                self.s.current_room = None;
                self.combat = None;
                self.phase = Phase::MainMenu;
                self.render_main_menu();
            }
            CombatStage::RevivalSuccess if action == "combat:continue" => {
                self.combat = None;
                self.clear();
                self.scene_reset();
                self.enter_town();
            }
            CombatStage::RevivalFail if action == "combat:continue" => {
                self.s.character = None;
                self.s.current_room = None;
                self.combat = None;
                self.s.depth = 1;
                self.s.depth_history.clear();
                self.s.encounter_count = 0;
                self.phase = Phase::MainMenu;
                self.clear();
                self.scene_reset();
                self.render_main_menu();
            }
            _ => self.emit_current_menu(),
        }
    }

    fn emit_current_menu(&mut self) {
        match self.combat.as_ref().map(|c| c.stage) {
            Some(CombatStage::PlayerMenu) => self.emit_player_menu(),
            Some(CombatStage::AttackAim) => self.emit_aim_menu(),
            Some(CombatStage::MonsterDefend) => self.emit_block_menu(),
            Some(CombatStage::PotionMenu) => self.emit_potion_menu(),
            Some(CombatStage::SpellMenu) => self.emit_spell_menu(),
            Some(CombatStage::SpawnPause) => {
                self.pause();
                self.menu([("combat:spawn_continue", "Continue")]);
            }
            Some(CombatStage::VictoryPause) => {
                self.pause();
                self.menu([("combat:victory_continue", "Continue")]);
            }
            Some(CombatStage::ExaminePause) => {
                self.pause();
                self.menu([("combat:after_examine", "Continue")]);
            }
            _ => {
                self.pause();
                self.menu([("combat:continue", "Continue")]);
            }
        }
    }

    // ----- round flow -----

    fn combat_initiative(&mut self) {
        let Some(monster) = self.monster_snapshot() else {
            self.phase = Phase::Dungeon;
            self.enter_room();
            return;
        };
        self.scene(monster_background(&monster));
        let init = self
            .with_character(|c, dice| {
                (
                    combat::initiative(dice, c, &monster),
                    c.attr(Attribute::Dexterity),
                )
            });
        let Some((init, dex)) = init else {
            return;
        };
        self.log(format!(
            "Initiative - You: {} (roll + {dex}) vs {}: {} (roll + {})",
            init.player_roll, monster.name, init.monster_roll, monster.dexterity
        ));
        if init.player_first {
            self.log("You win initiative and act first.");
            self.begin_player_turn();
        } else {
            self.log(format!("{} wins initiative and acts first.", monster.name));
            self.to_monster_defend();
        }
    }

    /// Start of the player's round: poison ticks, then the action menu.
    fn begin_player_turn(&mut self) {
        let tick = self.with_character(|c, dice| {
            combat::poison_tick(dice, c).map(|damage| (damage, c.poison_turns, c.hp))
        });
        if let Some(Some((damage, remaining, hp))) = tick {
            self.log(format!(
                "Poison saps you for {damage} damage. ({remaining} turns remain)"
            ));
            self.update_stats();
            if hp <= 0 {
                self.attempt_revival();
                return;
            }
        }
        self.set_stage(CombatStage::PlayerMenu);
        self.emit_player_menu();
    }

    fn emit_player_menu(&mut self) {
        let Some(monster) = self.monster_snapshot() else {
            return;
        };
        let (examine_used, divine_used) = self
            .s
            .character
            .as_ref()
            .map(|c| (c.examine_used, c.depth_flags.divine))
            .unwrap_or((false, false));
        let mut items = vec![
            ("combat:attack".to_string(), "1) Attack".to_string()),
            ("combat:use_potion".to_string(), "2) Drink Potion".to_string()),
            ("combat:cast_spell".to_string(), "3) Cast Spell".to_string()),
        ];
        if divine_used {
            items.push((
                "combat:divine".to_string(),
                "4) Divine Aid (used this depth)".to_string(),
            ));
        } else {
            items.push(("combat:divine".to_string(), "4) Divine Aid".to_string()));
        }
        // Dragons cannot be charmed; the option is not offered at all.
        if !monster.is_dragon() {
            items.push(("combat:charm".to_string(), "5) Charm Monster".to_string()));
        }
        items.push(("combat:run".to_string(), "6) Run Away".to_string()));
        if examine_used {
            items.push((
                "combat:examine".to_string(),
                "7) Examine Monster (already used)".to_string(),
            ));
        } else {
            items.push(("combat:examine".to_string(), "7) Examine Monster".to_string()));
        }
        self.menu(items);
        self.update_stats();
    }

    fn combat_player_action(&mut self, action: &str) {
        match action {
            "combat:attack" => {
                self.set_stage(CombatStage::AttackAim);
                self.log("Choose where to aim your attack.");
                self.emit_aim_menu();
            }
            "combat:use_potion" => {
                self.set_stage(CombatStage::PotionMenu);
                self.emit_potion_menu();
            }
            "combat:cast_spell" => {
                self.set_stage(CombatStage::SpellMenu);
                self.emit_spell_menu();
            }
            "combat:divine" => self.combat_divine(),
            "combat:charm" => self.combat_charm(),
            "combat:run" => self.combat_run(),
            "combat:examine" => self.combat_examine(),
            _ => self.emit_player_menu(),
        }
    }

    fn emit_aim_menu(&mut self) {
        let items: Vec<(String, String)> = Zone::all()
            .iter()
            .enumerate()
            .map(|(i, z)| (format!("combat:aim:{}", z.id()), format!("{}) {}", i + 1, z.label())))
            .collect();
        self.menu(items);
    }

    fn emit_block_menu(&mut self) {
        let items: Vec<(String, String)> = Zone::all()
            .iter()
            .enumerate()
            .map(|(i, z)| {
                (
                    format!("combat:block:{}", z.id()),
                    format!("{}) {}", i + 1, z.label()),
                )
            })
            .collect();
        self.menu(items);
    }

    fn combat_resolve_player_attack(&mut self, aim: Zone) {
        let Some(monster_name) = self.monster_snapshot().map(|m| m.name) else {
            return;
        };
        let strength = self
            .s
            .character
            .as_ref()
            .map(|c| c.attr(Attribute::Strength))
            .unwrap_or(10);
        let outcome = self.with_battle(|c, m, cs, dice| {
            cs.aim = Some(aim);
            let out = combat::player_attack(dice, c, &cs.buffs, m, &cs.debuffs, aim);
            (out, m.hp, c.hp)
        });
        let Some((out, monster_hp, player_hp)) = outcome else {
            return;
        };
        self.log(format!(
            "You aim {} and roll: {} + Strength({strength}) = {} vs AC {}",
            aim.id(),
            out.raw,
            out.total,
            out.enemy_ac
        ));
        self.log(format!(
            "The {monster_name} braces to defend {}.",
            out.monster_block.id()
        ));
        match out.kind {
            AttackKind::Fumble => {
                self.log(format!(
                    "Massive fail! You injure yourself for {} HP. Your HP: {}",
                    out.self_injury,
                    player_hp.max(0)
                ));
            }
            AttackKind::Critical => {
                self.log(format!(
                    "Critical hit! You deal {} damage. {monster_name} HP: {}",
                    out.damage,
                    monster_hp.max(0)
                ));
            }
            AttackKind::Blocked => {
                self.log(format!(
                    "Your attack is blocked by the {} guard!",
                    out.monster_block.id()
                ));
            }
            AttackKind::Hit => {
                self.log(format!(
                    "Hit! You deal {} damage. {monster_name} HP: {}",
                    out.damage,
                    monster_hp.max(0)
                ));
            }
            AttackKind::Miss => self.log("You miss!"),
        }
        if out.weapon_damaged {
            let name = self
                .s
                .character
                .as_ref()
                .and_then(|c| c.equipped_weapon())
                .map(|w| w.name.clone())
                .unwrap_or_else(|| "weapon".to_string());
            self.log(format!("Unlucky! Your {name} is damaged and now less effective."));
        }
        self.update_stats();

        if player_hp <= 0 {
            self.attempt_revival();
            return;
        }
        if monster_hp <= 0 {
            self.to_victory_pause();
            return;
        }
        // A Speed potion charge grants an immediate extra strike.
        let extra = self
            .combat
            .as_mut()
            .filter(|cs| cs.buffs.extra_attack_charges > 0)
            .map(|cs| {
                cs.buffs.extra_attack_charges -= 1;
            })
            .is_some();
        if extra {
            self.log("Your speed grants you an extra strike!");
            self.set_stage(CombatStage::AttackAim);
            self.emit_aim_menu();
            return;
        }
        self.to_monster_turn();
    }

    /// Companion acts after the player, then the monster readies its swing.
    fn to_monster_turn(&mut self) {
        let companion_result = self.with_battle(|c, m, _, dice| {
            c.companion
                .as_ref()
                .filter(|comp| comp.hp > 0 && m.hp > 0)
                .cloned()
                .map(|comp| {
                    let out = combat::companion_turn(dice, &comp, m);
                    (comp.name, out, m.hp, m.name.clone())
                })
        });
        if let Some(Some((name, out, monster_hp, monster_name))) = companion_result {
            if out.hit {
                self.log(format!(
                    "{name} attacks for {} damage. {monster_name} HP: {}",
                    out.damage,
                    monster_hp.max(0)
                ));
                if monster_hp <= 0 {
                    self.to_victory_pause();
                    return;
                }
            } else {
                self.log(format!("{name} misses."));
            }
        }
        self.to_monster_defend();
    }

    fn to_monster_defend(&mut self) {
        self.set_stage(CombatStage::MonsterDefend);
        self.log("Prepare your guard before the attack lands.");
        self.emit_block_menu();
        self.update_stats();
    }

    fn combat_resolve_monster_attack(&mut self, block: Zone) {
        let Some(monster_name) = self.monster_snapshot().map(|m| m.name) else {
            return;
        };
        self.log(format!("You brace to defend {}.", block.id()));
        let outcome = self.with_battle(|c, m, cs, dice| {
            let out = combat::monster_attack(dice, c, &mut cs.buffs, m, &mut cs.debuffs, block);
            (out, c.hp, m.hp, m.strength)
        });
        let Some((out, player_hp, monster_hp, monster_strength)) = outcome else {
            return;
        };
        match out.kind {
            MonsterAttackKind::Frozen => {
                self.log("The monster is frozen and cannot act!");
                self.begin_player_turn();
                return;
            }
            MonsterAttackKind::InvisibleMiss => {
                self.log("The monster swings wildly but hits nothing!");
                self.begin_player_turn();
                return;
            }
            _ => {}
        }
        self.log(format!(
            "{monster_name} attacks {}: roll {} + Strength/2({}) = {} vs AC {}",
            out.monster_zone.id(),
            out.raw,
            monster_strength / 2,
            out.total,
            out.player_ac
        ));
        match out.kind {
            MonsterAttackKind::Fumble => self.log(format!(
                "{monster_name} blunders and injures itself for {} HP!",
                out.self_injury
            )),
            MonsterAttackKind::Critical => self.log(format!(
                "Critical hit! You take {} damage. Your HP: {}",
                out.damage,
                player_hp.max(0)
            )),
            MonsterAttackKind::Blocked => self.log(format!(
                "You successfully defend against the {} attack!",
                out.monster_zone.id()
            )),
            MonsterAttackKind::Hit => self.log(format!(
                "You are hit for {} damage. Your HP: {}",
                out.damage,
                player_hp.max(0)
            )),
            MonsterAttackKind::Miss => self.log(format!("{monster_name} misses!")),
            MonsterAttackKind::Frozen | MonsterAttackKind::InvisibleMiss => {}
        }
        if out.armor_damaged {
            let name = self
                .s
                .character
                .as_ref()
                .and_then(|c| c.equipped_armor())
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "armor".to_string());
            self.log(format!(
                "Ouch! Your {name} is damaged and provides reduced protection."
            ));
        }
        self.update_stats();
        if player_hp <= 0 {
            self.attempt_revival();
        } else if monster_hp <= 0 {
            self.to_victory_pause();
        } else {
            self.begin_player_turn();
        }
    }

    // ----- potions -----

    fn emit_potion_menu(&mut self) {
        let Some((legacy, named)) = self.s.character.as_ref().map(|c| {
            (
                c.potions,
                c.potion_uses
                    .iter()
                    .map(|(name, uses)| (name.clone(), *uses))
                    .collect::<Vec<_>>(),
            )
        }) else {
            return;
        };
        if legacy == 0 && named.is_empty() {
            self.log("You have no potions.");
            self.set_stage(CombatStage::PlayerMenu);
            self.emit_player_menu();
            return;
        }
        let mut items: Vec<(String, String)> = Vec::new();
        let mut n = 1;
        if legacy > 0 {
            items.push((
                "combat:potion:found".to_string(),
                format!("{n}) Healing (found) ({legacy} uses)"),
            ));
            n += 1;
        }
        for (name, uses) in named {
            items.push((
                format!("combat:potion:{name}"),
                format!("{n}) {name} ({uses} uses left)"),
            ));
            n += 1;
        }
        items.push(("combat:potion:back".to_string(), format!("{n}) Back")));
        self.menu(items);
    }

    fn combat_potion_action(&mut self, action: &str) {
        let Some(name) = action.strip_prefix("combat:potion:") else {
            self.emit_potion_menu();
            return;
        };
        if name == "back" {
            self.set_stage(CombatStage::PlayerMenu);
            self.emit_player_menu();
            return;
        }
        let kind = if name == "found" {
            Some(PotionKind::Healing)
        } else {
            self.tables.potion(name).map(|p| p.kind)
        };
        let Some(kind) = kind else {
            self.log("Nothing happens...");
            self.emit_potion_menu();
            return;
        };
        let name = name.to_string();
        let applied = self.with_battle(|c, _, cs, dice| {
            let consumed = if name == "found" {
                if c.potions > 0 {
                    c.potions -= 1;
                    c.stats.potions_used += 1;
                    true
                } else {
                    false
                }
            } else {
                c.consume_potion(&name)
            };
            consumed.then(|| combat::apply_potion(dice, c, &mut cs.buffs, kind))
        });
        let Some(Some(applied)) = applied else {
            self.emit_potion_menu();
            return;
        };
        let ends_turn = !matches!(applied, PotionApplied::PoisonCured);
        match applied {
            PotionApplied::Healed(amount) => {
                self.log(format!("You drink a healing potion and recover {amount} HP."))
            }
            PotionApplied::DamageBonus(2) => {
                self.log("Your muscles surge. (+2 damage this combat)")
            }
            PotionApplied::DamageBonus(_) => {
                self.log("You feel more focused. (+1 damage this combat)")
            }
            PotionApplied::ExtraAttack => {
                self.log("Your reflexes quicken. (1 extra attack this combat)")
            }
            PotionApplied::AcBonus(_) => {
                self.log("A shimmering barrier surrounds you. (+3 AC this combat)")
            }
            PotionApplied::Invisibility => {
                self.log("You fade from sight. (Monster's next attack automatically misses)")
            }
            PotionApplied::PoisonCured => {
                self.log("You drink the antidote and feel the poison leave your system.")
            }
        }
        self.update_stats();
        if ends_turn {
            self.to_monster_turn();
        } else {
            self.set_stage(CombatStage::PlayerMenu);
            self.emit_player_menu();
        }
    }

    // ----- spells -----

    fn emit_spell_menu(&mut self) {
        let spells = self
            .s
            .character
            .as_ref()
            .map(|c| {
                c.spell_uses
                    .iter()
                    .map(|(name, uses)| (name.clone(), *uses))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if spells.is_empty() {
            self.log("You don't know any spells.");
            self.set_stage(CombatStage::PlayerMenu);
            self.emit_player_menu();
            return;
        }
        let mut items: Vec<(String, String)> = spells
            .into_iter()
            .enumerate()
            .map(|(i, (name, uses))| {
                (
                    format!("combat:spell:{name}"),
                    format!("{}) {name} ({uses} uses left)", i + 1),
                )
            })
            .collect();
        items.push(("combat:spell:back".to_string(), format!("{}) Back", items.len() + 1)));
        self.menu(items);
    }

    fn combat_spell_action(&mut self, action: &str) {
        let Some(name) = action.strip_prefix("combat:spell:") else {
            self.emit_spell_menu();
            return;
        };
        if name == "back" {
            self.set_stage(CombatStage::PlayerMenu);
            self.emit_player_menu();
            return;
        }
        let Some(kind) = self.tables.spell(name).map(|s| s.kind) else {
            // Unknown rows from older saves fizzle but still burn the use.
            let name = name.to_string();
            let _ = self.with_character(|c, _| c.consume_spell(&name));
            self.log("The spell fizzles...");
            self.to_monster_turn();
            return;
        };
        if kind == SpellKind::LightningBolt {
            self.set_stage(CombatStage::LightningMode);
            if let Some(cs) = self.combat.as_mut() {
                cs.pending_spell = Some(name.to_string());
            }
            self.menu([
                ("combat:lightning:full", "1) Full power"),
                ("combat:lightning:half", "2) Half power"),
                ("combat:lightning:back", "3) Back"),
            ]);
            return;
        }
        self.combat_cast(name.to_string(), kind, false);
    }

    fn combat_lightning_action(&mut self, action: &str) {
        match action {
            "combat:lightning:back" => {
                self.set_stage(CombatStage::SpellMenu);
                self.emit_spell_menu();
            }
            "combat:lightning:full" | "combat:lightning:half" => {
                let full = action.ends_with("full");
                let name = self
                    .combat
                    .as_mut()
                    .and_then(|cs| cs.pending_spell.take())
                    .unwrap_or_else(|| "Lightning Bolt".to_string());
                self.combat_cast(name, SpellKind::LightningBolt, full);
            }
            _ => self.emit_current_menu(),
        }
    }

    fn combat_cast(&mut self, name: String, kind: SpellKind, lightning_full: bool) {
        // Summoning with a companion already at your side wastes nothing.
        if kind == SpellKind::Summon {
            let already = self
                .s
                .character
                .as_ref()
                .map(|c| c.companion.is_some())
                .unwrap_or(false);
            if already {
                self.log("You already have a companion.");
                self.set_stage(CombatStage::PlayerMenu);
                self.emit_player_menu();
                return;
            }
        }
        let outcome = self.with_battle(|c, m, cs, dice| {
            if !c.consume_spell(&name) {
                return None;
            }
            let applied = combat::apply_spell(dice, c, m, &mut cs.debuffs, kind, lightning_full);
            if let SpellApplied::Summoned(companion) = &applied {
                c.companion = Some(companion.clone());
            }
            Some((applied, m.hp, m.name.clone()))
        });
        let Some(Some((applied, monster_hp, monster_name))) = outcome else {
            self.emit_spell_menu();
            return;
        };
        match &applied {
            SpellApplied::Damage { label, amount } => self.log(format!(
                "{label} for {amount} damage. {monster_name} HP: {}",
                monster_hp.max(0)
            )),
            SpellApplied::MonsterAcDown(n) => {
                self.log(format!("Cracks appear in its defenses. (-{n} AC this combat)"))
            }
            SpellApplied::MonsterDamageDown(n) => {
                self.log(format!("The foe looks feebler. (-{n} damage this combat)"))
            }
            SpellApplied::Frozen => self.log("Ice binds the monster. (It skips its next turn)"),
            SpellApplied::Summoned(companion) => {
                self.log(format!("A {} answers your call and joins you!", companion.name))
            }
            SpellApplied::SummonFailed { roll } => self.log(format!(
                "You attempt to summon a companion... Roll {roll}. No creature answers your call."
            )),
            SpellApplied::Portal => {}
        }
        self.update_stats();
        if matches!(applied, SpellApplied::Portal) {
            self.log("A portal whisks you away to town!");
            self.combat = None;
            self.s.current_room = None;
            self.clear();
            self.enter_town();
            return;
        }
        if monster_hp <= 0 {
            self.to_victory_pause();
        } else {
            self.to_monster_turn();
        }
    }

    // ----- utility actions -----

    fn combat_divine(&mut self) {
        let used = self
            .s
            .character
            .as_ref()
            .map(|c| c.depth_flags.divine)
            .unwrap_or(true);
        if used {
            self.log("You've already called for divine aid at this depth.");
            self.emit_player_menu();
            return;
        }
        let outcome = self.with_battle(|c, m, _, dice| {
            c.depth_flags.divine = true;
            let out = combat::divine_aid(dice, c, m);
            (out, m.hp, m.name.clone())
        });
        let Some((out, monster_hp, monster_name)) = outcome else {
            return;
        };
        self.log(format!("You call for divine aid... Roll {}", out.total));
        match out.answer {
            Some((manifestation, damage)) => {
                self.log(format!(
                    "The gods answer with {manifestation} for {damage} damage! {monster_name} HP: {}",
                    monster_hp.max(0)
                ));
            }
            None => self.log("Your plea goes unanswered."),
        }
        self.update_stats();
        if monster_hp <= 0 {
            self.to_victory_pause();
        } else {
            // The monster always acts after Divine, answered or not.
            self.to_monster_turn();
        }
    }

    fn combat_charm(&mut self) {
        let outcome = self.with_battle(|c, m, _, dice| {
            let out = combat::charm(dice, c, m);
            (out, m.name.clone())
        });
        let Some((out, monster_name)) = outcome else {
            return;
        };
        self.clear();
        self.log(format!(
            "You attempt to charm the {monster_name}... Roll {} vs {}",
            out.total, out.dc
        ));
        if out.immune {
            self.log(format!("The {monster_name} is beyond charming."));
            self.set_stage(CombatStage::CharmFailPause);
            self.pause_continue("combat:continue");
            return;
        }
        if !out.success {
            self.log("Your charm attempt fails.");
            self.set_stage(CombatStage::CharmFailPause);
            self.pause_continue("combat:continue");
            return;
        }
        self.log(format!("The {monster_name} is charmed and leaves peacefully."));
        // A quarter of the depth-scaled rewards; no drops, no quest credit.
        let depth = self.s.depth;
        let rewards = self.with_battle(|c, m, _, _| {
            let xp = combat::scale_reward(m.xp, depth) / 4;
            let gold = combat::scale_reward(m.gold_reward, depth) / 4;
            let messages = c.gain_xp(xp as i64);
            c.gain_gold(gold);
            (xp, gold, messages)
        });
        if let Some((xp, gold, messages)) = rewards {
            self.log(format!(
                "Charmed reward: +{xp} XP and +{gold} gold (no loot or quest credit)."
            ));
            for message in messages {
                self.log(message);
            }
        }
        if let Some(room) = self.s.current_room.as_mut() {
            room.monster = None;
        }
        self.set_stage(CombatStage::CharmSuccessPause);
        self.pause_continue("combat:continue");
    }

    fn combat_run(&mut self) {
        let outcome = self.with_battle(|c, m, _, dice| combat::flee(dice, c, m));
        let Some(out) = outcome else {
            return;
        };
        self.clear();
        self.log(format!(
            "You attempt to run away... Roll {} (need >{})",
            out.total, out.threshold
        ));
        if out.success {
            self.log("You successfully escape!");
            self.set_stage(CombatStage::RunSuccessPause);
        } else {
            self.log("You fail to escape!");
            self.set_stage(CombatStage::RunFailPause);
        }
        self.pause_continue("combat:continue");
    }

    fn combat_examine(&mut self) {
        let already = self
            .s
            .character
            .as_ref()
            .map(|c| c.examine_used)
            .unwrap_or(false);
        if already {
            self.log("You've already examined this creature.");
            self.emit_player_menu();
            return;
        }
        let outcome = self.with_battle(|c, m, _, dice| {
            c.examine_used = true;
            (combat::examine(dice, c), m.clone())
        });
        let Some((out, monster)) = outcome else {
            return;
        };
        self.clear();
        self.log(format!(
            "You examine the {}... (Wisdom check: {} vs 25)",
            monster.name, out.total
        ));
        if out.success {
            self.log(format!(
                "You can see: HP {}, AC {}",
                monster.hp.max(0),
                monster.armor_class
            ));
            self.log(format!("Dexterity: {}", monster.dexterity));
            if !monster.abilities.is_empty() {
                self.log(format!("Special abilities: {}", monster.abilities.join(", ")));
            }
            if let Some(description) = &monster.description {
                self.log(format!("It's a {} - {description}", monster.name));
            }
        } else {
            self.log("You can't make out the creature's capabilities clearly.");
        }
        self.set_stage(CombatStage::ExaminePause);
        self.pause();
        self.menu([("combat:after_examine", "Continue")]);
        self.update_stats();
    }

    // ----- victory and death -----

    fn to_victory_pause(&mut self) {
        self.set_stage(CombatStage::VictoryPause);
        self.pause_continue("combat:victory_continue");
    }

    fn combat_victory(&mut self) {
        let Some(monster) = self.monster_snapshot() else {
            self.phase = Phase::Dungeon;
            self.enter_room();
            return;
        };
        self.clear();
        let depth = self.s.depth;
        let xp = combat::scale_reward(monster.xp, depth);
        let gold = combat::scale_reward(monster.gold_reward, depth);
        let level_messages = self.with_character(|c, _| {
            c.stats.monsters_defeated += 1;
            c.gain_gold(gold);
            c.gain_xp(xp as i64)
        });
        self.log(format!(
            "You defeated the {} and gain {xp} XP!",
            monster.name
        ));
        for message in level_messages.unwrap_or_default() {
            self.log(message);
        }
        self.log(format!("You loot {gold} gold!"));

        // Quest credit pays immediately.
        let completed = self
            .with_character(|c, _| crate::quests::credit_kill(c, &monster.name))
            .unwrap_or_default();
        for quest in completed {
            self.log(format!(
                "Quest complete - you receive {} gold.",
                quest.reward
            ));
        }

        self.roll_victory_drops(&monster);

        if let Some(room) = self.s.current_room.as_mut() {
            room.monster = None;
        }
        self.update_stats();

        if monster.is_dragon() {
            self.dragon_victory();
            return;
        }
        self.set_stage(CombatStage::VictorySummary);
        self.pause_continue("combat:continue");
    }

    /// Independent drop rolls: potion, scroll, then a 25% magic-gear roll
    /// split ring/armor/weapon at 40/30/30.
    fn roll_victory_drops(&mut self, monster: &Monster) {
        let tables = self.tables.clone();
        let consumable_chance = (0.05 + 0.01 * monster.difficulty as f64).min(0.20);

        if self.dice.chance(consumable_chance) {
            if let Some(c) = self.s.character.as_mut() {
                c.potions += 1;
            }
            self.log("You find a healing potion!");
        }
        if self.dice.chance(consumable_chance) {
            if let Some(name) = tables.random_spell(&mut self.dice).map(|s| s.name.clone()) {
                let _ = self.with_character(|c, _| c.add_spell_uses(&name, 1));
                self.log(format!("You find a scroll of {name}!"));
            }
        }
        if self.dice.chance(0.25) {
            let split = self.dice.uniform(0.0, 1.0);
            if split < 0.40 {
                if let Some(spec) = tables.random_ring(&mut self.dice).cloned() {
                    let line = self.with_character(|c, dice| {
                        let delta = spec.roll_delta(dice);
                        c.bind_ring(crate::world::Ring {
                            name: spec.name.clone(),
                            attribute: spec.attribute,
                            delta,
                            cursed: spec.cursed,
                        })
                    });
                    self.log(format!("You discover a {}!", spec.name));
                    if let Some(line) = line {
                        self.log(line);
                    }
                    if spec.cursed {
                        self.log("A chill crawls up your arm. The ring is cursed!");
                    }
                }
            } else if split < 0.70 {
                if let Some(spec) = tables.drop_armor(&mut self.dice).cloned() {
                    let _ = self.with_character(|c, _| {
                        c.armors.push(crate::world::Armor {
                            name: spec.name.clone(),
                            armor_class: spec.armor_class,
                            price: spec.price,
                            damaged: false,
                            labyrinth_drop: true,
                        });
                    });
                    self.log(format!("You pull a {} from the remains!", spec.name));
                }
            } else if let Some(spec) = tables.drop_weapon(&mut self.dice).cloned() {
                let _ = self.with_character(|c, _| {
                    c.weapons.push(crate::world::Weapon {
                        name: spec.name.clone(),
                        damage_die: spec.damage_die,
                        price: spec.price,
                        damaged: false,
                        labyrinth_drop: true,
                    });
                });
                self.log(format!("You pull a {} from the remains!", spec.name));
            }
        }
    }

    fn dragon_victory(&mut self) {
        self.clear();
        self.scene("victory.png");
        self.flavor(
            "system",
            "dragon_victory",
            &[],
            "With a final roar, the Dragon falls. The labyrinth grows still.",
        );
        self.say("Legends will speak of your name for generations.");

        // Commit the run: save the character, append the leaderboard.
        let committed = self
            .s
            .character
            .as_ref()
            .map(|c| (c.to_record(), LeaderboardEntry::from_character(c)));
        if let Some((record, entry)) = committed {
            if let Err(err) = self.saves.save(&self.device_id, &record) {
                tracing::warn!(%err, "victory save failed");
                self.say("(The chronicler's ink ran dry; the save could not be written.)");
            }
            if let Err(err) = self.leaderboard.append(&entry) {
                tracing::warn!(%err, "leaderboard append failed");
            }
        }
        self.set_stage(CombatStage::DragonVictory);
        self.pause_continue("combat:continue");
    }

    /// Lethal damage lands here, from combat or traps. `5d4 + WIS` against
    /// a DC that climbs 5 per prior death.
    pub(crate) fn attempt_revival(&mut self) {
        self.phase = Phase::Combat;
        if self.combat.is_none() {
            self.combat = Some(CombatState::new());
        }
        self.clear();
        self.scene("death.png");
        let outcome = self.with_character(|c, dice| {
            c.death_count += 1;
            let wisdom = c.attr(Attribute::Wisdom);
            let roll = dice.roll(crate::dice::CHECK_DIE) + wisdom;
            let dc = 15 + 5 * c.death_count as i32;
            let survived = roll >= dc;
            if survived {
                for attr in Attribute::all() {
                    c.attributes.adjust(attr, -1);
                }
                c.hp = 1;
                c.depth_flags = Default::default();
            }
            (c.death_count, wisdom, roll, dc, survived)
        });
        let Some((death_count, wisdom, roll, dc, survived)) = outcome else {
            self.phase = Phase::MainMenu;
            self.render_main_menu();
            return;
        };
        self.log(format!("=== DEATH #{death_count} ==="));
        self.log("You have fallen...");
        self.log(format!("Revival attempt: {roll} (5d4 + WIS {wisdom}) vs {dc}"));
        if survived {
            self.log("MIRACULOUS REVIVAL!");
            self.log("Every limb is weaker for it. All attributes suffer.");
            self.s.defer_depth_reset = true;
            self.s.current_room = None;
            self.s.depth_history.clear();
            self.set_stage(CombatStage::RevivalSuccess);
        } else {
            self.log("PERMANENT DEATH");
            self.log("The labyrinth keeps what it kills.");
            if let Err(err) = self.saves.delete(&self.device_id) {
                tracing::warn!(%err, "death wipe failed; proceeding to main menu");
            }
            self.set_stage(CombatStage::RevivalFail);
        }
        self.pause_continue("combat:continue");
    }
}
