//! Immutable content tables.
//!
//! Loaded once at startup and shared read-only across sessions. The engine
//! only ever queries these tables; where a lookup misses, callers substitute
//! a safe default and play continues.

use crate::dice::{Dice, DieSpec};
use crate::world::{Attribute, Monster};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Records
// ============================================================================

/// A monster table row. Base stats are used directly; no depth scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsterSpec {
    pub name: String,
    pub hp: i32,
    pub armor_class: i32,
    pub dexterity: i32,
    pub strength: i32,
    pub damage_die: DieSpec,
    pub xp: i32,
    pub gold: (i32, i32),
    /// Weight for wandering selection; rows at or below 0.02 never wander
    /// and are excluded from quest targeting.
    pub wander_chance: f64,
    pub difficulty: i32,
    #[serde(default)]
    pub spell_resistance: i32,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// What Listen reports when this monster waits behind the next door.
    #[serde(default)]
    pub sound: Option<String>,
}

impl MonsterSpec {
    /// Create a combat instance, rolling the gold reward from the row range.
    pub fn spawn(&self, dice: &mut Dice) -> Monster {
        Monster {
            name: self.name.clone(),
            hp: self.hp,
            max_hp: self.hp,
            armor_class: self.armor_class,
            strength: self.strength,
            dexterity: self.dexterity,
            damage_die: self.damage_die,
            xp: self.xp,
            gold_reward: dice.range_inclusive(self.gold.0, self.gold.1),
            difficulty: self.difficulty,
            spell_resistance: self.spell_resistance,
            abilities: self.abilities.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    pub damage_die: DieSpec,
    pub price: i32,
    /// Weight for labyrinth drop selection.
    pub chance: f64,
    pub labyrinth_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorSpec {
    pub name: String,
    pub armor_class: i32,
    pub price: i32,
    pub chance: f64,
    pub labyrinth_only: bool,
}

/// Combat effect of a potion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotionKind {
    Healing,
    Strength,
    Intelligence,
    Speed,
    Protection,
    Invisibility,
    Antidote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotionSpec {
    pub name: String,
    pub kind: PotionKind,
    pub price: i32,
    pub uses: u32,
}

/// Effect of a spell scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellKind {
    MagicMissile,
    Fireball,
    LightningBolt,
    Freeze,
    Vulnerability,
    Weakness,
    Slowness,
    Summon,
    Portal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellSpec {
    pub name: String,
    pub kind: SpellKind,
    pub price: i32,
    pub uses: u32,
}

/// On-fail effect of a trap, beyond direct damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrapEffect {
    GoldDust { amount: i32 },
    Poison { duration: u32 },
    RustWeapon,
    DexDown { amount: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapSpec {
    pub name: String,
    pub dc: i32,
    #[serde(default)]
    pub damage: Option<DieSpec>,
    #[serde(default)]
    pub effect: Option<TrapEffect>,
}

/// A magic ring row. The applied magnitude is rolled at bind time from the
/// weighted bands (bonus 2/3/4-5 at 50/30/20%, penalty 1/2/3 at 50/30/20%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSpec {
    pub name: String,
    pub attribute: Attribute,
    pub cursed: bool,
    pub chance: f64,
}

impl RingSpec {
    /// Roll the signed attribute delta this ring applies on binding.
    pub fn roll_delta(&self, dice: &mut Dice) -> i32 {
        let band = dice.uniform(0.0, 1.0);
        if self.cursed {
            if band < 0.5 {
                -1
            } else if band < 0.8 {
                -2
            } else {
                -3
            }
        } else if band < 0.5 {
            2
        } else if band < 0.8 {
            3
        } else {
            dice.range_inclusive(4, 5)
        }
    }
}

// ============================================================================
// Dialogue
// ============================================================================

/// Flavor line variants keyed by `section.key`. Missing keys fall back to
/// the hard-coded defaults at each call site; the miss is logged once.
#[derive(Debug, Clone, Default)]
pub struct DialogueTable {
    lines: HashMap<String, Vec<String>>,
}

impl DialogueTable {
    pub fn insert(&mut self, section: &str, key: &str, variants: Vec<String>) {
        self.lines.insert(format!("{section}.{key}"), variants);
    }

    /// Pick one variant and substitute `{field}` placeholders from `ctx`.
    pub fn pick(
        &self,
        dice: &mut Dice,
        section: &str,
        key: &str,
        ctx: &[(&str, &str)],
    ) -> Option<String> {
        let variants = self.lines.get(&format!("{section}.{key}"))?;
        let template = dice.choose(variants)?;
        Some(render(template, ctx))
    }
}

/// Substitute `{name}`-style placeholders from a context map. Unknown
/// placeholders are left untouched.
pub fn render(template: &str, ctx: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (field, value) in ctx {
        out = out.replace(&format!("{{{field}}}"), value);
    }
    out
}

// ============================================================================
// Tables
// ============================================================================

/// All content tables for one process, shared read-only.
#[derive(Debug, Clone)]
pub struct ContentTables {
    pub monsters: Vec<MonsterSpec>,
    pub weapons: Vec<WeaponSpec>,
    pub armors: Vec<ArmorSpec>,
    pub potions: Vec<PotionSpec>,
    pub spells: Vec<SpellSpec>,
    pub traps: Vec<TrapSpec>,
    pub rings: Vec<RingSpec>,
    pub dialogue: DialogueTable,
}

impl ContentTables {
    pub fn shared() -> Arc<ContentTables> {
        Arc::new(Self::builtin())
    }

    pub fn monster(&self, name: &str) -> Option<&MonsterSpec> {
        self.monsters
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn weapon(&self, name: &str) -> Option<&WeaponSpec> {
        self.weapons
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
    }

    pub fn armor(&self, name: &str) -> Option<&ArmorSpec> {
        self.armors
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn potion(&self, name: &str) -> Option<&PotionSpec> {
        self.potions
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn spell(&self, name: &str) -> Option<&SpellSpec> {
        self.spells
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Weighted wandering pick. Rows with zero wander weight (the Dragon,
    /// the Necromancer) never appear here.
    pub fn wandering_monster(&self, dice: &mut Dice) -> Option<&MonsterSpec> {
        dice.choose_weighted(&self.monsters, |m| m.wander_chance)
    }

    /// Monsters eligible as quest targets.
    pub fn quest_candidates(&self) -> Vec<&MonsterSpec> {
        self.monsters
            .iter()
            .filter(|m| m.wander_chance > 0.02)
            .collect()
    }

    /// Shop stock: priced, non-labyrinth rows.
    pub fn shop_weapons(&self) -> Vec<&WeaponSpec> {
        self.weapons
            .iter()
            .filter(|w| w.price > 0 && !w.labyrinth_only)
            .collect()
    }

    pub fn shop_armors(&self) -> Vec<&ArmorSpec> {
        self.armors
            .iter()
            .filter(|a| a.price > 0 && !a.labyrinth_only)
            .collect()
    }

    /// Labyrinth drop pools, weighted by `chance`.
    pub fn drop_weapon(&self, dice: &mut Dice) -> Option<&WeaponSpec> {
        let pool: Vec<&WeaponSpec> = self.weapons.iter().filter(|w| w.labyrinth_only).collect();
        dice.choose_weighted(&pool, |w| w.chance).copied()
    }

    pub fn drop_armor(&self, dice: &mut Dice) -> Option<&ArmorSpec> {
        let pool: Vec<&ArmorSpec> = self.armors.iter().filter(|a| a.labyrinth_only).collect();
        dice.choose_weighted(&pool, |a| a.chance).copied()
    }

    pub fn random_ring(&self, dice: &mut Dice) -> Option<&RingSpec> {
        dice.choose_weighted(&self.rings, |r| r.chance)
    }

    pub fn random_trap(&self, dice: &mut Dice) -> Option<&TrapSpec> {
        dice.choose(&self.traps)
    }

    pub fn random_spell(&self, dice: &mut Dice) -> Option<&SpellSpec> {
        dice.choose(&self.spells)
    }

    /// The built-in data set.
    pub fn builtin() -> ContentTables {
        let d = DieSpec::new;
        let monsters = vec![
            MonsterSpec {
                name: "Giant Rat".into(),
                hp: 9,
                armor_class: 11,
                dexterity: 12,
                strength: 6,
                damage_die: d(1, 4),
                xp: 8,
                gold: (2, 10),
                wander_chance: 0.20,
                difficulty: 1,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("A dog-sized rodent with yellowed teeth.".into()),
                sound: Some("frantic scratching and squeaks".into()),
            },
            MonsterSpec {
                name: "Goblin".into(),
                hp: 20,
                armor_class: 15,
                dexterity: 12,
                strength: 8,
                damage_die: d(1, 6),
                xp: 12,
                gold: (5, 20),
                wander_chance: 0.18,
                difficulty: 2,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("Small, vicious, and fond of ambushes.".into()),
                sound: Some("high-pitched cackling".into()),
            },
            MonsterSpec {
                name: "Skeleton".into(),
                hp: 16,
                armor_class: 13,
                dexterity: 10,
                strength: 10,
                damage_die: d(1, 6),
                xp: 14,
                gold: (4, 18),
                wander_chance: 0.16,
                difficulty: 2,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("Bones held together by old malice.".into()),
                sound: Some("a dry clatter of bone on stone".into()),
            },
            MonsterSpec {
                name: "Zombie".into(),
                hp: 24,
                armor_class: 10,
                dexterity: 6,
                strength: 12,
                damage_die: d(1, 8),
                xp: 16,
                gold: (5, 20),
                wander_chance: 0.13,
                difficulty: 3,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("Slow, relentless, and already dead.".into()),
                sound: Some("a wet, dragging shuffle".into()),
            },
            MonsterSpec {
                name: "Bandit".into(),
                hp: 22,
                armor_class: 14,
                dexterity: 13,
                strength: 11,
                damage_die: d(1, 8),
                xp: 18,
                gold: (15, 40),
                wander_chance: 0.12,
                difficulty: 3,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("An outlaw who picked the wrong hideout.".into()),
                sound: Some("coins being counted, then silence".into()),
            },
            MonsterSpec {
                name: "Orc".into(),
                hp: 30,
                armor_class: 15,
                dexterity: 11,
                strength: 15,
                damage_die: d(2, 6),
                xp: 24,
                gold: (10, 35),
                wander_chance: 0.09,
                difficulty: 4,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("Broad as a door and twice as mean.".into()),
                sound: Some("guttural war-chanting".into()),
            },
            MonsterSpec {
                name: "Ghoul".into(),
                hp: 28,
                armor_class: 14,
                dexterity: 14,
                strength: 13,
                damage_die: d(2, 6),
                xp: 28,
                gold: (8, 30),
                wander_chance: 0.07,
                difficulty: 4,
                spell_resistance: 1,
                abilities: vec!["paralyzing touch".into()],
                description: Some("It hungers, and it is fast.".into()),
                sound: Some("ragged breathing just behind the door".into()),
            },
            MonsterSpec {
                name: "Ogre".into(),
                hp: 42,
                armor_class: 16,
                dexterity: 8,
                strength: 18,
                damage_die: d(2, 8),
                xp: 36,
                gold: (20, 60),
                wander_chance: 0.05,
                difficulty: 5,
                spell_resistance: 0,
                abilities: vec![],
                description: Some("A walking appetite in crude hides.".into()),
                sound: Some("heavy footfalls that shake dust loose".into()),
            },
            MonsterSpec {
                name: "Troll".into(),
                hp: 55,
                armor_class: 17,
                dexterity: 10,
                strength: 19,
                damage_die: d(3, 6),
                xp: 48,
                gold: (25, 80),
                wander_chance: 0.04,
                difficulty: 6,
                spell_resistance: 2,
                abilities: vec!["regeneration".into()],
                description: Some("Its wounds knit shut while you watch.".into()),
                sound: Some("slow scraping of claws on rock".into()),
            },
            MonsterSpec {
                name: "Death Knight".into(),
                hp: 70,
                armor_class: 19,
                dexterity: 12,
                strength: 20,
                damage_die: d(3, 8),
                xp: 70,
                gold: (40, 120),
                wander_chance: 0.03,
                difficulty: 7,
                spell_resistance: 3,
                abilities: vec!["unholy aura".into()],
                description: Some("A fallen champion in blackened plate.".into()),
                sound: Some("armored steps in perfect rhythm".into()),
            },
            // Never wanders; quest tables skip it too.
            MonsterSpec {
                name: "Evil Necromancer".into(),
                hp: 60,
                armor_class: 16,
                dexterity: 12,
                strength: 10,
                damage_die: d(3, 6),
                xp: 90,
                gold: (60, 150),
                wander_chance: 0.0,
                difficulty: 8,
                spell_resistance: 4,
                abilities: vec!["raise dead".into()],
                description: Some("The labyrinth's keeper of corpses.".into()),
                sound: Some("faint chanting in a dead tongue".into()),
            },
            MonsterSpec {
                name: "Dragon".into(),
                hp: 135,
                armor_class: 31,
                dexterity: 18,
                strength: 22,
                damage_die: d(8, 7),
                xp: 500,
                gold: (400, 800),
                wander_chance: 0.0,
                difficulty: 10,
                spell_resistance: 5,
                abilities: vec!["firebreath".into(), "immune to charm".into()],
                description: Some("The heart of the labyrinth, awake and furious.".into()),
                sound: Some("a furnace-roar that warms the door".into()),
            },
        ];

        let weapons = vec![
            WeaponSpec { name: "Dagger".into(), damage_die: d(1, 4), price: 10, chance: 0.0, labyrinth_only: false },
            WeaponSpec { name: "Short Sword".into(), damage_die: d(1, 6), price: 25, chance: 0.0, labyrinth_only: false },
            WeaponSpec { name: "Sword".into(), damage_die: d(1, 8), price: 50, chance: 0.0, labyrinth_only: false },
            WeaponSpec { name: "Battle Axe".into(), damage_die: d(1, 10), price: 85, chance: 0.0, labyrinth_only: false },
            WeaponSpec { name: "Greatsword".into(), damage_die: d(2, 6), price: 130, chance: 0.0, labyrinth_only: false },
            WeaponSpec { name: "Runed Blade".into(), damage_die: d(2, 8), price: 0, chance: 3.0, labyrinth_only: true },
            WeaponSpec { name: "Obsidian Axe".into(), damage_die: d(3, 6), price: 0, chance: 2.0, labyrinth_only: true },
            WeaponSpec { name: "Stormbrand".into(), damage_die: d(3, 8), price: 0, chance: 1.0, labyrinth_only: true },
        ];

        let armors = vec![
            ArmorSpec { name: "Leather Armor".into(), armor_class: 2, price: 30, chance: 0.0, labyrinth_only: false },
            ArmorSpec { name: "Chainmail".into(), armor_class: 4, price: 70, chance: 0.0, labyrinth_only: false },
            ArmorSpec { name: "Scale Mail".into(), armor_class: 6, price: 120, chance: 0.0, labyrinth_only: false },
            ArmorSpec { name: "Plate Armor".into(), armor_class: 8, price: 200, chance: 0.0, labyrinth_only: false },
            ArmorSpec { name: "Shadowweave Vest".into(), armor_class: 7, price: 0, chance: 3.0, labyrinth_only: true },
            ArmorSpec { name: "Dragonbone Plate".into(), armor_class: 10, price: 0, chance: 1.0, labyrinth_only: true },
        ];

        let potions = vec![
            PotionSpec { name: "Healing".into(), kind: PotionKind::Healing, price: 25, uses: 1 },
            PotionSpec { name: "Strength".into(), kind: PotionKind::Strength, price: 30, uses: 2 },
            PotionSpec { name: "Intelligence".into(), kind: PotionKind::Intelligence, price: 25, uses: 2 },
            PotionSpec { name: "Speed".into(), kind: PotionKind::Speed, price: 35, uses: 2 },
            PotionSpec { name: "Protection".into(), kind: PotionKind::Protection, price: 35, uses: 2 },
            PotionSpec { name: "Invisibility".into(), kind: PotionKind::Invisibility, price: 45, uses: 1 },
            PotionSpec { name: "Antidote".into(), kind: PotionKind::Antidote, price: 20, uses: 2 },
        ];

        let spells = vec![
            SpellSpec { name: "Magic Missile".into(), kind: SpellKind::MagicMissile, price: 40, uses: 3 },
            SpellSpec { name: "Fireball".into(), kind: SpellKind::Fireball, price: 80, uses: 2 },
            SpellSpec { name: "Lightning Bolt".into(), kind: SpellKind::LightningBolt, price: 100, uses: 2 },
            SpellSpec { name: "Freeze".into(), kind: SpellKind::Freeze, price: 60, uses: 2 },
            SpellSpec { name: "Vulnerability".into(), kind: SpellKind::Vulnerability, price: 50, uses: 2 },
            SpellSpec { name: "Weakness".into(), kind: SpellKind::Weakness, price: 50, uses: 2 },
            SpellSpec { name: "Slowness".into(), kind: SpellKind::Slowness, price: 50, uses: 2 },
            SpellSpec { name: "Summon Creature".into(), kind: SpellKind::Summon, price: 120, uses: 1 },
            SpellSpec { name: "Magic Portal".into(), kind: SpellKind::Portal, price: 90, uses: 1 },
        ];

        let traps = vec![
            TrapSpec { name: "Dart Trap".into(), dc: 12, damage: Some(d(2, 4)), effect: None },
            TrapSpec { name: "Spike Pit".into(), dc: 15, damage: Some(d(3, 6)), effect: None },
            TrapSpec {
                name: "Poison Needle".into(),
                dc: 14,
                damage: Some(d(1, 4)),
                effect: Some(TrapEffect::Poison { duration: 3 }),
            },
            TrapSpec {
                name: "Gold-Dust Hex".into(),
                dc: 13,
                damage: None,
                effect: Some(TrapEffect::GoldDust { amount: 40 }),
            },
            TrapSpec {
                name: "Corrosive Mist".into(),
                dc: 12,
                damage: Some(d(1, 4)),
                effect: Some(TrapEffect::RustWeapon),
            },
            TrapSpec {
                name: "Sapping Mist".into(),
                dc: 15,
                damage: Some(d(1, 6)),
                effect: Some(TrapEffect::DexDown { amount: 1 }),
            },
        ];

        let rings = vec![
            RingSpec { name: "Ring of Might".into(), attribute: Attribute::Strength, cursed: false, chance: 3.0 },
            RingSpec { name: "Ring of the Cat".into(), attribute: Attribute::Dexterity, cursed: false, chance: 3.0 },
            RingSpec { name: "Ring of Vigor".into(), attribute: Attribute::Constitution, cursed: false, chance: 2.0 },
            RingSpec { name: "Ring of Clarity".into(), attribute: Attribute::Intelligence, cursed: false, chance: 2.0 },
            RingSpec { name: "Ring of the Owl".into(), attribute: Attribute::Wisdom, cursed: false, chance: 2.0 },
            RingSpec { name: "Ring of Charm".into(), attribute: Attribute::Charisma, cursed: false, chance: 2.0 },
            RingSpec { name: "Ring of the Eye".into(), attribute: Attribute::Perception, cursed: false, chance: 2.0 },
            RingSpec { name: "Leaden Ring".into(), attribute: Attribute::Strength, cursed: true, chance: 1.5 },
            RingSpec { name: "Ring of Fumbling".into(), attribute: Attribute::Dexterity, cursed: true, chance: 1.5 },
            RingSpec { name: "Ring of Dull Wits".into(), attribute: Attribute::Intelligence, cursed: true, chance: 1.0 },
        ];

        let mut dialogue = DialogueTable::default();
        dialogue.insert(
            "system",
            "main_menu_header",
            vec!["=== Labyrinth Adventure ===".into()],
        );
        dialogue.insert(
            "system",
            "story_intro",
            vec![
                "In a world scarred by ancient betrayals, mysterious labyrinths spawn from wounds in reality itself...".into(),
            ],
        );
        dialogue.insert(
            "system",
            "startup",
            vec![
                "So you seek to become an Explorer? Few attempt this path, and fewer return.".into(),
            ],
        );
        dialogue.insert("system", "ask_name", vec!["What is your name?".into()]);
        dialogue.insert(
            "town",
            "gate_guard",
            vec![
                "Gate Guard Garrick: Mind yourself down there. The deep rooms don't give people back.".into(),
                "Gate Guard Garrick: Back again? The labyrinth's been restless today.".into(),
            ],
        );
        dialogue.insert(
            "town",
            "healer",
            vec![
                "Sister Elwen: The townsfolk heal your wounds and cleanse harmful effects.".into(),
                "Sister Elwen: Hold still. The light does the rest.".into(),
            ],
        );
        dialogue.insert(
            "town",
            "cook",
            vec!["Hera: Sit, eat. Heroes fight worse on an empty stomach.".into()],
        );
        dialogue.insert(
            "town",
            "bartender",
            vec![
                "Roth: What'll it be?".into(),
                "Roth: First one's not free, but it's cold.".into(),
            ],
        );
        dialogue.insert(
            "town",
            "priestess",
            vec!["Eira: Kneel, and speak your worries to the quiet.".into()],
        );
        dialogue.insert(
            "town",
            "trainer",
            vec!["Garron: Sweat now, bleed less below.".into()],
        );
        dialogue.insert(
            "town",
            "weaponsmith",
            vec!["Thorin: Blacksmith at your service.".into()],
        );
        dialogue.insert(
            "town",
            "gambler",
            vec!["Seth: Feeling lucky, Explorer? The dice don't care either way.".into()],
        );
        dialogue.insert(
            "labyrinth",
            "rooms",
            vec![
                "A damp circular chamber with flickering torchlight.".into(),
                "A long rectangular hall; bones scatter the floor.".into(),
                "A hexagonal pillared room. You hear a low growl from the darkness.".into(),
                "A cramped triangular chamber; cold air spills from a cracked archway.".into(),
                "An oval gallery. Scratched runes glow faintly on the walls.".into(),
                "A square vault. Candles gutter in a circle, recently lit.".into(),
            ],
        );
        dialogue.insert(
            "combat",
            "monster_taunt",
            vec![
                "{name}: You smell of fear, little one.".into(),
                "{name}: Another trinket-carrier for the pile.".into(),
            ],
        );
        dialogue.insert(
            "system",
            "dragon_appears",
            vec![
                "A thunderous wingbeat shakes the cavern. The Dragon emerges from the dark!".into(),
            ],
        );
        dialogue.insert(
            "system",
            "dragon_victory",
            vec![
                "With a final roar, the Dragon falls. The labyrinth grows still.".into(),
            ],
        );
        dialogue.insert(
            "system",
            "dragon_epilogue",
            vec![
                "You have conquered the Labyrinth. Peace returns to the realm, and legends will speak of your name for generations.".into(),
            ],
        );

        ContentTables {
            monsters,
            weapons,
            armors,
            potions,
            spells,
            traps,
            rings,
            dialogue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_have_the_dragon() {
        let tables = ContentTables::builtin();
        let dragon = tables.monster("dragon").unwrap();
        assert_eq!(dragon.hp, 135);
        assert_eq!(dragon.armor_class, 31);
        assert_eq!(dragon.dexterity, 18);
        assert_eq!(dragon.strength, 22);
        assert_eq!(dragon.damage_die, DieSpec::new(8, 7));
        assert_eq!(dragon.wander_chance, 0.0);
    }

    #[test]
    fn wandering_pick_never_returns_zero_weight_rows() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(11);
        for _ in 0..300 {
            let m = tables.wandering_monster(&mut dice).unwrap();
            assert!(m.wander_chance > 0.0, "picked {}", m.name);
        }
    }

    #[test]
    fn quest_candidates_exclude_rare_monsters() {
        let tables = ContentTables::builtin();
        for m in tables.quest_candidates() {
            assert!(m.wander_chance > 0.02);
        }
        assert!(!tables
            .quest_candidates()
            .iter()
            .any(|m| m.name == "Dragon" || m.name == "Evil Necromancer"));
    }

    #[test]
    fn shop_stock_excludes_labyrinth_gear() {
        let tables = ContentTables::builtin();
        assert!(tables.shop_weapons().iter().all(|w| !w.labyrinth_only));
        assert!(tables.shop_armors().iter().all(|a| !a.labyrinth_only));
        let mut dice = Dice::seeded(5);
        assert!(tables.drop_weapon(&mut dice).unwrap().labyrinth_only);
        assert!(tables.drop_armor(&mut dice).unwrap().labyrinth_only);
    }

    #[test]
    fn ring_delta_stays_in_band() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(9);
        let blessed = tables.rings.iter().find(|r| !r.cursed).unwrap();
        let cursed = tables.rings.iter().find(|r| r.cursed).unwrap();
        for _ in 0..100 {
            let b = blessed.roll_delta(&mut dice);
            assert!((2..=5).contains(&b));
            let c = cursed.roll_delta(&mut dice);
            assert!((-3..=-1).contains(&c));
        }
    }

    #[test]
    fn dialogue_substitutes_placeholders() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(1);
        let line = tables
            .dialogue
            .pick(&mut dice, "combat", "monster_taunt", &[("name", "Goblin")])
            .unwrap();
        assert!(line.starts_with("Goblin:"));
        assert!(tables
            .dialogue
            .pick(&mut dice, "nope", "missing", &[])
            .is_none());
    }

    #[test]
    fn monster_spawn_rolls_gold_in_range() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(2);
        let spec = tables.monster("Bandit").unwrap();
        for _ in 0..50 {
            let m = spec.spawn(&mut dice);
            assert!((spec.gold.0..=spec.gold.1).contains(&m.gold_reward));
            assert_eq!(m.hp, spec.hp);
        }
    }
}
