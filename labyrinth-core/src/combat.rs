//! Combat resolution rules.
//!
//! Pure functions over the dice source and the combatants; no IO and no
//! event emission. The engine turns the typed outcomes returned here into
//! combat log lines. All checks ride on 5d4: the natural minimum (5) is a
//! fumble, the natural maximum (20) a critical.

use crate::content::{PotionKind, SpellKind};
use crate::dice::{Dice, DieSpec};
use crate::world::{
    ceil_half, Attribute, Character, CombatBuffs, Companion, CompanionTier, Monster,
    MonsterDebuffs,
};
use serde::{Deserialize, Serialize};

/// Chance that a resolved swing chips the gear involved.
pub const DEGRADE_CHANCE: f64 = 0.05;

/// Body zones for aimed attacks and blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Head,
    Torso,
    Legs,
}

impl Zone {
    pub fn all() -> [Zone; 3] {
        [Zone::Head, Zone::Torso, Zone::Legs]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Zone::Head => "head",
            Zone::Torso => "torso",
            Zone::Legs => "legs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Zone::Head => "Head/Upper",
            Zone::Torso => "Torso/Middle",
            Zone::Legs => "Legs/Lower",
        }
    }

    pub fn from_id(id: &str) -> Option<Zone> {
        match id {
            "head" => Some(Zone::Head),
            "torso" => Some(Zone::Torso),
            "legs" => Some(Zone::Legs),
            _ => None,
        }
    }

    pub fn random(dice: &mut Dice) -> Zone {
        Zone::all()[dice.index(3)]
    }
}

/// Reward multiplier for the current depth. The single place any future
/// depth rescaling would hook into.
pub fn depth_multiplier(depth: u32) -> f64 {
    1.0 + 0.5 * (depth.max(1) - 1) as f64
}

/// Scale a base reward by the depth multiplier, flooring.
pub fn scale_reward(base: i32, depth: u32) -> i32 {
    (base as f64 * depth_multiplier(depth)) as i32
}

/// Player armor class: `10 + ceil(CON/2) + armor` where bare skin counts
/// as +5, plus temporary bonuses.
pub fn armor_class(character: &Character, buffs: &CombatBuffs) -> i32 {
    let base = 10 + ceil_half(character.attr(Attribute::Constitution));
    let armor = character
        .equipped_armor()
        .map(|a| a.effective_ac())
        .unwrap_or(5);
    base + armor + buffs.ac_bonus
}

/// Initiative rolls; ties favor the player.
#[derive(Debug, Clone, Copy)]
pub struct Initiative {
    pub player_roll: i32,
    pub monster_roll: i32,
    pub player_first: bool,
}

pub fn initiative(dice: &mut Dice, character: &Character, monster: &Monster) -> Initiative {
    let player_roll = dice.roll(crate::dice::CHECK_DIE) + character.attr(Attribute::Dexterity);
    let monster_roll = dice.roll(crate::dice::CHECK_DIE) + monster.dexterity;
    Initiative {
        player_roll,
        monster_roll,
        player_first: player_roll >= monster_roll,
    }
}

/// How an attack resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    /// Natural minimum: the attacker injures itself and the swing misses.
    Fumble,
    /// Natural maximum: 1.5x damage, ignores the block.
    Critical,
    /// The declared zones matched; no damage.
    Blocked,
    Hit,
    Miss,
}

/// Outcome of the player's attack.
#[derive(Debug, Clone)]
pub struct PlayerAttack {
    pub raw: i32,
    pub total: i32,
    pub enemy_ac: i32,
    pub monster_block: Zone,
    pub kind: AttackKind,
    /// Damage dealt to the monster (already applied).
    pub damage: i32,
    /// Fumble self-injury dealt to the player (already applied).
    pub self_injury: i32,
    /// The wielded weapon got chipped by this exchange.
    pub weapon_damaged: bool,
}

/// Resolve the player's aimed attack against the monster. Mutates HP on
/// both sides and the weapon's damaged flag.
pub fn player_attack(
    dice: &mut Dice,
    character: &mut Character,
    buffs: &CombatBuffs,
    monster: &mut Monster,
    debuffs: &MonsterDebuffs,
    aim: Zone,
) -> PlayerAttack {
    let monster_block = Zone::random(dice);
    let enemy_ac = (monster.armor_class - debuffs.ac_penalty).max(1);
    let check = dice.check();
    let strength = character.attr(Attribute::Strength);
    let total = check.raw + strength;

    let mut outcome = PlayerAttack {
        raw: check.raw,
        total,
        enemy_ac,
        monster_block,
        kind: AttackKind::Miss,
        damage: 0,
        self_injury: 0,
        weapon_damaged: false,
    };

    if check.fumble {
        outcome.kind = AttackKind::Fumble;
        outcome.self_injury = dice.roll(DieSpec::new(1, 4)).max(1);
        character.hp -= outcome.self_injury;
        return outcome;
    }

    let weapon_die = character
        .equipped_weapon()
        .map(|w| w.damage_die)
        .unwrap_or(DieSpec::new(1, 2));
    let weapon_damaged_flag = character.equipped_weapon().map(|w| w.damaged).unwrap_or(false);

    let mut base_damage =
        dice.roll(weapon_die) + ceil_half(strength) + buffs.damage_bonus;
    if weapon_damaged_flag {
        base_damage = (base_damage / 2).max(1);
    }
    let base_damage = base_damage.max(1);

    if check.critical {
        outcome.kind = AttackKind::Critical;
        outcome.damage = (base_damage as f64 * 1.5) as i32;
        monster.hp -= outcome.damage;
    } else if monster_block == aim {
        outcome.kind = AttackKind::Blocked;
    } else if total >= enemy_ac {
        outcome.kind = AttackKind::Hit;
        outcome.damage = base_damage;
        monster.hp -= outcome.damage;
    }

    // Landed or blocked swings wear the blade.
    let connected = matches!(
        outcome.kind,
        AttackKind::Hit | AttackKind::Critical | AttackKind::Blocked
    );
    if connected && dice.chance(DEGRADE_CHANCE) {
        if let Some(idx) = character.equipped_weapon {
            if let Some(weapon) = character.weapons.get_mut(idx) {
                if !weapon.damaged {
                    weapon.damaged = true;
                    outcome.weapon_damaged = true;
                }
            }
        }
    }

    outcome
}

/// Outcome of the monster's attack.
#[derive(Debug, Clone)]
pub struct MonsterAttack {
    pub kind: MonsterAttackKind,
    pub raw: i32,
    pub total: i32,
    pub player_ac: i32,
    pub monster_zone: Zone,
    pub damage: i32,
    pub self_injury: i32,
    pub armor_damaged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonsterAttackKind {
    /// Freeze spell holds the monster; the turn is skipped.
    Frozen,
    /// Invisibility consumed; the swing misses outright.
    InvisibleMiss,
    Fumble,
    Critical,
    Blocked,
    Hit,
    Miss,
}

/// Resolve the monster's attack. Consumes freeze turns and invisibility
/// charges; mutates HP and the armor's damaged flag.
pub fn monster_attack(
    dice: &mut Dice,
    character: &mut Character,
    buffs: &mut CombatBuffs,
    monster: &mut Monster,
    debuffs: &mut MonsterDebuffs,
    block: Zone,
) -> MonsterAttack {
    let player_ac = armor_class(character, buffs);
    let mut outcome = MonsterAttack {
        kind: MonsterAttackKind::Miss,
        raw: 0,
        total: 0,
        player_ac,
        monster_zone: Zone::Torso,
        damage: 0,
        self_injury: 0,
        armor_damaged: false,
    };

    if debuffs.freeze_turns > 0 {
        debuffs.freeze_turns -= 1;
        outcome.kind = MonsterAttackKind::Frozen;
        return outcome;
    }
    if buffs.invisibility_charges > 0 {
        buffs.invisibility_charges -= 1;
        outcome.kind = MonsterAttackKind::InvisibleMiss;
        return outcome;
    }

    outcome.monster_zone = Zone::random(dice);
    let check = dice.check();
    outcome.raw = check.raw;
    outcome.total = check.raw + monster.strength / 2;

    let damage_die = monster.damage_die;
    let damage_penalty = debuffs.damage_penalty;
    let mut roll_damage =
        |dice: &mut Dice| -> i32 { (dice.roll(damage_die) - damage_penalty).max(1) };

    if check.fumble {
        outcome.kind = MonsterAttackKind::Fumble;
        outcome.self_injury = roll_damage(dice);
        monster.hp -= outcome.self_injury;
        return outcome;
    }
    if check.critical {
        outcome.kind = MonsterAttackKind::Critical;
        outcome.damage = (roll_damage(dice) as f64 * 1.5) as i32;
        character.hp -= outcome.damage;
    } else if block == outcome.monster_zone {
        outcome.kind = MonsterAttackKind::Blocked;
    } else if outcome.total >= player_ac {
        outcome.kind = MonsterAttackKind::Hit;
        outcome.damage = roll_damage(dice);
        character.hp -= outcome.damage;
    }

    let connected = matches!(
        outcome.kind,
        MonsterAttackKind::Hit | MonsterAttackKind::Critical | MonsterAttackKind::Blocked
    );
    if connected && dice.chance(DEGRADE_CHANCE) {
        if let Some(idx) = character.equipped_armor {
            if let Some(armor) = character.armors.get_mut(idx) {
                if !armor.damaged {
                    armor.damaged = true;
                    outcome.armor_damaged = true;
                }
            }
        }
    }

    outcome
}

/// Poison tick applied at the start of the player's turn while afflicted.
/// Returns the damage dealt, or `None` when not poisoned.
pub fn poison_tick(dice: &mut Dice, character: &mut Character) -> Option<i32> {
    if character.poison_turns == 0 {
        return None;
    }
    character.poison_turns -= 1;
    let damage = dice.roll(DieSpec::new(1, 4)).max(1);
    character.hp -= damage;
    Some(damage)
}

/// Examine: `5d4 + WIS > 25` reveals the monster's numbers. Does not end
/// the player's turn; allowed once per combat.
#[derive(Debug, Clone, Copy)]
pub struct Examine {
    pub total: i32,
    pub success: bool,
}

pub fn examine(dice: &mut Dice, character: &Character) -> Examine {
    let total = dice.roll(crate::dice::CHECK_DIE) + character.attr(Attribute::Wisdom);
    Examine {
        total,
        success: total > 25,
    }
}

/// Divine aid: `5d4 + (WIS - 10) >= 12` calls down 3d6, or 4d6 on 16+.
/// Either way the turn is consumed and the monster acts afterwards.
#[derive(Debug, Clone)]
pub struct DivineAid {
    pub total: i32,
    /// `(manifestation, damage)` when the plea was answered.
    pub answer: Option<(&'static str, i32)>,
}

pub fn divine_aid(dice: &mut Dice, character: &Character, monster: &mut Monster) -> DivineAid {
    let total = dice.roll(crate::dice::CHECK_DIE) + (character.attr(Attribute::Wisdom) - 10);
    if total < 12 {
        return DivineAid { total, answer: None };
    }
    let (name, die) = if total >= 16 {
        ("Fireball", DieSpec::new(4, 6))
    } else {
        ("Lightning Bolt", DieSpec::new(3, 6))
    };
    let damage = dice.roll(die).max(1);
    monster.hp -= damage;
    DivineAid {
        total,
        answer: Some((name, damage)),
    }
}

/// Charm: `5d4 + ceil(CHA/2) >= 20 + floor(difficulty/2)`. Dragons are
/// immune. Success pays 25% of the depth-scaled rewards, no drops.
#[derive(Debug, Clone, Copy)]
pub struct Charm {
    pub total: i32,
    pub dc: i32,
    pub immune: bool,
    pub success: bool,
}

pub fn charm(dice: &mut Dice, character: &Character, monster: &Monster) -> Charm {
    let dc = 20 + monster.difficulty / 2;
    let total = dice.roll(crate::dice::CHECK_DIE) + ceil_half(character.attr(Attribute::Charisma));
    if monster.is_dragon() {
        return Charm {
            total,
            dc,
            immune: true,
            success: false,
        };
    }
    Charm {
        total,
        dc,
        immune: false,
        success: total >= dc,
    }
}

/// Flee: `5d4 + ceil(DEX/2) > 15 + ceil(monster DEX/2)`.
#[derive(Debug, Clone, Copy)]
pub struct Flee {
    pub total: i32,
    pub threshold: i32,
    pub success: bool,
}

pub fn flee(dice: &mut Dice, character: &Character, monster: &Monster) -> Flee {
    let total = dice.roll(crate::dice::CHECK_DIE) + ceil_half(character.attr(Attribute::Dexterity));
    let threshold = 15 + ceil_half(monster.dexterity);
    Flee {
        total,
        threshold,
        success: total > threshold,
    }
}

/// Effect of drinking a potion in combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotionApplied {
    Healed(i32),
    DamageBonus(i32),
    ExtraAttack,
    AcBonus(i32),
    Invisibility,
    PoisonCured,
}

/// Apply a potion's effect. The caller is responsible for consuming the
/// use and for the turn economy (everything but Antidote ends the turn).
pub fn apply_potion(
    dice: &mut Dice,
    character: &mut Character,
    buffs: &mut CombatBuffs,
    kind: PotionKind,
) -> PotionApplied {
    match kind {
        PotionKind::Healing => {
            let healed = character.heal(healing_amount(dice, character.attr(Attribute::Constitution)));
            PotionApplied::Healed(healed)
        }
        PotionKind::Strength => {
            buffs.damage_bonus += 2;
            PotionApplied::DamageBonus(2)
        }
        PotionKind::Intelligence => {
            buffs.damage_bonus += 1;
            PotionApplied::DamageBonus(1)
        }
        PotionKind::Speed => {
            buffs.extra_attack_charges += 1;
            PotionApplied::ExtraAttack
        }
        PotionKind::Protection => {
            buffs.ac_bonus += 3;
            PotionApplied::AcBonus(3)
        }
        PotionKind::Invisibility => {
            buffs.invisibility_charges += 1;
            PotionApplied::Invisibility
        }
        PotionKind::Antidote => {
            character.poison_turns = 0;
            PotionApplied::PoisonCured
        }
    }
}

/// Healing potion potency: `ceil(CON/2)` rolls of 2d2.
pub fn healing_amount(dice: &mut Dice, constitution: i32) -> i32 {
    let rolls = ceil_half(constitution).max(1);
    (0..rolls).map(|_| dice.roll(DieSpec::new(2, 2)).max(1)).sum()
}

/// Effect of casting a spell in combat.
#[derive(Debug, Clone)]
pub enum SpellApplied {
    Damage { label: &'static str, amount: i32 },
    MonsterAcDown(i32),
    MonsterDamageDown(i32),
    Frozen,
    Summoned(Companion),
    SummonFailed { roll: i32 },
    Portal,
}

/// Apply a spell. Damage spells are reduced by the monster's innate spell
/// resistance (floor 0, but a landed spell always burns a use).
pub fn apply_spell(
    dice: &mut Dice,
    character: &mut Character,
    monster: &mut Monster,
    debuffs: &mut MonsterDebuffs,
    kind: SpellKind,
    lightning_full: bool,
) -> SpellApplied {
    let resist = monster.spell_resistance;
    let mut damage_spell = |dice: &mut Dice, label: &'static str, die: DieSpec| {
        let amount = (dice.roll(die).max(1) - resist).max(0);
        monster.hp -= amount;
        SpellApplied::Damage { label, amount }
    };
    match kind {
        SpellKind::MagicMissile => damage_spell(dice, "Magic missiles strike", DieSpec::new(2, 6)),
        SpellKind::Fireball => damage_spell(dice, "Fireball explodes", DieSpec::new(4, 6)),
        SpellKind::LightningBolt => {
            let die = if lightning_full {
                DieSpec::new(6, 6)
            } else {
                DieSpec::new(3, 6)
            };
            damage_spell(dice, "Lightning arcs", die)
        }
        SpellKind::Freeze => {
            debuffs.freeze_turns += 1;
            SpellApplied::Frozen
        }
        SpellKind::Vulnerability => {
            debuffs.ac_penalty += 2;
            SpellApplied::MonsterAcDown(2)
        }
        SpellKind::Weakness | SpellKind::Slowness => {
            debuffs.damage_penalty += 2;
            SpellApplied::MonsterDamageDown(2)
        }
        SpellKind::Summon => {
            let roll = dice.roll(crate::dice::CHECK_DIE)
                + character.attributes.modifier(Attribute::Intelligence)
                + character.attributes.modifier(Attribute::Charisma);
            match summon_companion(dice, roll) {
                Some(companion) => SpellApplied::Summoned(companion),
                None => SpellApplied::SummonFailed { roll },
            }
        }
        SpellKind::Portal => SpellApplied::Portal,
    }
}

/// Summon table: tier by the modified 5d4 roll, stats rolled per tier.
pub fn summon_companion(dice: &mut Dice, roll: i32) -> Option<Companion> {
    let (tier, species, damage_die, ac, strength, hp) = if roll >= 16 {
        let species = ["Lion", "Bear", "Tiger"];
        (
            CompanionTier::High,
            *dice.choose(&species)?,
            DieSpec::new(4, 6),
            dice.range_inclusive(12, 14),
            dice.range_inclusive(12, 15),
            dice.range_inclusive(50, 75),
        )
    } else if roll >= 12 {
        let species = ["Wolf", "Panther", "Eagle"];
        (
            CompanionTier::Mid,
            *dice.choose(&species)?,
            DieSpec::new(3, 6),
            dice.range_inclusive(10, 12),
            dice.range_inclusive(10, 12),
            dice.range_inclusive(30, 50),
        )
    } else if roll >= 8 {
        let species = ["Dog", "Cat", "Owl"];
        (
            CompanionTier::Low,
            *dice.choose(&species)?,
            DieSpec::new(2, 6),
            dice.range_inclusive(8, 10),
            dice.range_inclusive(8, 10),
            dice.range_inclusive(15, 30),
        )
    } else {
        return None;
    };
    Some(Companion {
        name: species.to_string(),
        tier,
        hp,
        max_hp: hp,
        strength,
        armor_class: ac,
        damage_die,
    })
}

/// Companion swing after the player's action: d20 + STR vs monster AC.
#[derive(Debug, Clone, Copy)]
pub struct CompanionAttack {
    pub hit: bool,
    pub damage: i32,
}

pub fn companion_turn(dice: &mut Dice, companion: &Companion, monster: &mut Monster) -> CompanionAttack {
    let attack = dice.roll(DieSpec::new(1, 20)) + companion.strength;
    if attack > monster.armor_class {
        let damage = dice.roll(companion.damage_die).max(1);
        monster.hp -= damage;
        CompanionAttack { hit: true, damage }
    } else {
        CompanionAttack { hit: false, damage: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Armor, Difficulty, Weapon};

    fn fighter() -> Character {
        let mut c = Character::new("Tess", Difficulty::Normal, "dev");
        c.attributes.strength = 14;
        c.attributes.dexterity = 12;
        c.attributes.constitution = 12;
        c.attributes.wisdom = 17;
        c.attributes.charisma = 14;
        c.max_hp = 40;
        c.hp = 40;
        c.weapons.push(Weapon {
            name: "Sword".into(),
            damage_die: DieSpec::new(1, 8),
            price: 50,
            ..Weapon::default()
        });
        c.equipped_weapon = Some(0);
        c
    }

    fn goblin() -> Monster {
        Monster {
            name: "Goblin".into(),
            hp: 20,
            max_hp: 20,
            armor_class: 15,
            strength: 8,
            dexterity: 12,
            damage_die: DieSpec::new(1, 6),
            xp: 12,
            gold_reward: 10,
            difficulty: 2,
            spell_resistance: 0,
            abilities: vec![],
            description: None,
        }
    }

    #[test]
    fn armor_class_formula() {
        let mut c = fighter();
        let buffs = CombatBuffs::default();
        // 10 + ceil(12/2)=6 + 5 unarmored = 21
        assert_eq!(armor_class(&c, &buffs), 21);
        c.armors.push(Armor {
            name: "Chainmail".into(),
            armor_class: 4,
            price: 70,
            ..Armor::default()
        });
        c.equipped_armor = Some(0);
        assert_eq!(armor_class(&c, &buffs), 20);
        c.armors[0].damaged = true;
        assert_eq!(armor_class(&c, &buffs), 18);
    }

    #[test]
    fn fumble_injures_the_attacker_and_misses() {
        let mut dice = Dice::seeded(0);
        // monster block zone, check total 5 (fumble), self-injury 1d4 -> 3
        dice.queue_indices([0]);
        dice.queue_rolls([5, 3]);
        let mut c = fighter();
        let mut m = goblin();
        let out = player_attack(
            &mut dice,
            &mut c,
            &CombatBuffs::default(),
            &mut m,
            &MonsterDebuffs::default(),
            Zone::Torso,
        );
        assert_eq!(out.kind, AttackKind::Fumble);
        assert_eq!(out.self_injury, 3);
        assert_eq!(c.hp, 37);
        assert_eq!(m.hp, 20);
    }

    #[test]
    fn critical_ignores_block_and_multiplies() {
        let mut dice = Dice::seeded(0);
        // block=head (index 0), raw 20, weapon damage roll 6
        dice.queue_indices([0]);
        dice.queue_rolls([20, 6]);
        let mut c = fighter();
        let mut m = goblin();
        let out = player_attack(
            &mut dice,
            &mut c,
            &CombatBuffs::default(),
            &mut m,
            &MonsterDebuffs::default(),
            Zone::Head, // aiming straight into the block
        );
        assert_eq!(out.kind, AttackKind::Critical);
        // 6 + ceil(14/2)=7 -> 13, crit 19
        assert_eq!(out.damage, 19);
        assert_eq!(m.hp, 1);
    }

    #[test]
    fn matching_zones_block_ordinary_hits() {
        let mut dice = Dice::seeded(0);
        dice.queue_indices([1]); // torso
        dice.queue_rolls([18]);
        let mut c = fighter();
        let mut m = goblin();
        let out = player_attack(
            &mut dice,
            &mut c,
            &CombatBuffs::default(),
            &mut m,
            &MonsterDebuffs::default(),
            Zone::Torso,
        );
        assert_eq!(out.kind, AttackKind::Blocked);
        assert_eq!(m.hp, 20);
    }

    #[test]
    fn damaged_weapon_halves_before_crit() {
        let mut dice = Dice::seeded(0);
        dice.queue_indices([0]);
        dice.queue_rolls([20, 6]);
        let mut c = fighter();
        c.weapons[0].damaged = true;
        let mut m = goblin();
        let out = player_attack(
            &mut dice,
            &mut c,
            &CombatBuffs::default(),
            &mut m,
            &MonsterDebuffs::default(),
            Zone::Legs,
        );
        // base 13 halved -> 6, crit 1.5x -> 9
        assert_eq!(out.damage, 9);
    }

    #[test]
    fn monster_freeze_and_invisibility_preempt_the_swing() {
        let mut dice = Dice::seeded(0);
        let mut c = fighter();
        let mut m = goblin();
        let mut buffs = CombatBuffs {
            invisibility_charges: 1,
            ..CombatBuffs::default()
        };
        let mut debuffs = MonsterDebuffs {
            freeze_turns: 1,
            ..MonsterDebuffs::default()
        };
        let frozen = monster_attack(&mut dice, &mut c, &mut buffs, &mut m, &mut debuffs, Zone::Head);
        assert_eq!(frozen.kind, MonsterAttackKind::Frozen);
        assert_eq!(debuffs.freeze_turns, 0);
        let unseen = monster_attack(&mut dice, &mut c, &mut buffs, &mut m, &mut debuffs, Zone::Head);
        assert_eq!(unseen.kind, MonsterAttackKind::InvisibleMiss);
        assert_eq!(buffs.invisibility_charges, 0);
    }

    #[test]
    fn divine_aid_tiers() {
        let mut c = fighter(); // WIS 17 -> +7
        c.attributes.wisdom = 15; // +5

        let mut m = goblin();
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([8, 10]); // total 13 -> Lightning Bolt 3d6=10
        let out = divine_aid(&mut dice, &c, &mut m);
        assert_eq!(out.answer, Some(("Lightning Bolt", 10)));
        assert_eq!(m.hp, 10);

        let mut dice = Dice::seeded(0);
        dice.queue_rolls([11, 12]); // total 16 -> Fireball
        let out = divine_aid(&mut dice, &c, &mut m);
        assert_eq!(out.answer.unwrap().0, "Fireball");

        let mut dice = Dice::seeded(0);
        dice.queue_rolls([6]); // total 11 -> unanswered
        let out = divine_aid(&mut dice, &c, &mut m);
        assert!(out.answer.is_none());
    }

    #[test]
    fn charm_uses_difficulty_dc_and_dragons_are_immune() {
        let c = fighter(); // CHA 14 -> +7
        let m = goblin(); // difficulty 2 -> DC 21
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([14]);
        let out = charm(&mut dice, &c, &m);
        assert_eq!(out.dc, 21);
        assert!(out.success);

        let mut dragon = goblin();
        dragon.name = "Dragon".into();
        dragon.difficulty = 10;
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([20]);
        let out = charm(&mut dice, &c, &dragon);
        assert!(out.immune && !out.success);
    }

    #[test]
    fn flee_threshold_scales_with_monster_dexterity() {
        let c = fighter(); // DEX 12 -> +6
        let m = goblin(); // dex 12 -> threshold 21
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([16]);
        let out = flee(&mut dice, &c, &m);
        assert_eq!(out.threshold, 21);
        assert!(out.success); // 22 > 21
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([15]);
        assert!(!flee(&mut dice, &c, &m).success); // 21 is not > 21
    }

    #[test]
    fn spell_resistance_reduces_damage_to_floor_zero() {
        let mut dice = Dice::seeded(0);
        dice.queue_rolls([2]);
        let mut c = fighter();
        let mut m = goblin();
        m.spell_resistance = 5;
        let mut debuffs = MonsterDebuffs::default();
        let out = apply_spell(
            &mut dice,
            &mut c,
            &mut m,
            &mut debuffs,
            SpellKind::MagicMissile,
            false,
        );
        match out {
            SpellApplied::Damage { amount, .. } => assert_eq!(amount, 0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(m.hp, 20);
    }

    #[test]
    fn summon_tiers_by_roll() {
        let mut dice = Dice::seeded(0);
        assert!(summon_companion(&mut dice, 7).is_none());
        assert_eq!(
            summon_companion(&mut dice, 8).unwrap().tier,
            CompanionTier::Low
        );
        assert_eq!(
            summon_companion(&mut dice, 12).unwrap().tier,
            CompanionTier::Mid
        );
        assert_eq!(
            summon_companion(&mut dice, 16).unwrap().tier,
            CompanionTier::High
        );
    }

    #[test]
    fn poison_ticks_down_and_stops() {
        let mut dice = Dice::seeded(0);
        let mut c = fighter();
        c.poison_turns = 1;
        dice.queue_rolls([2]);
        assert_eq!(poison_tick(&mut dice, &mut c), Some(2));
        assert_eq!(c.hp, 38);
        assert_eq!(poison_tick(&mut dice, &mut c), None);
    }

    #[test]
    fn depth_multiplier_progression() {
        assert_eq!(depth_multiplier(1), 1.0);
        assert_eq!(depth_multiplier(3), 2.0);
        assert_eq!(scale_reward(10, 3), 20);
        assert_eq!(scale_reward(15, 2), 22); // floor of 22.5
    }

    #[test]
    fn healing_amount_scales_with_constitution() {
        // CON 12 -> 6 rolls of 2d2, each in 2..=4
        let mut dice = Dice::seeded(4);
        for _ in 0..20 {
            let healed = healing_amount(&mut dice, 12);
            assert!((12..=24).contains(&healed));
        }
    }
}
