//! Trap resolution.
//!
//! A trap fires as the room is entered. The dodge check is the standard
//! 5d4 + ceil(DEX/2); on a failure, damage may be lethal (the engine then
//! runs the ordinary revival flow) and a side effect may apply.

use crate::content::{TrapEffect, TrapSpec};
use crate::dice::{Dice, CHECK_DIE};
use crate::world::{ceil_half, Attribute, Character};

/// What a sprung trap did; the engine renders this into dialogue.
#[derive(Debug, Clone)]
pub struct TrapOutcome {
    pub name: String,
    pub roll: i32,
    pub dc: i32,
    pub dodged: bool,
    pub damage: i32,
    pub effect: Option<TrapEffectOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapEffectOutcome {
    GoldLost(i32),
    Poisoned { duration: u32 },
    WeaponRusted { weapon: String },
    DexteritySapped { amount: i32 },
}

/// Resolve a trap against the character, applying damage and effects.
pub fn resolve_trap(dice: &mut Dice, character: &mut Character, trap: &TrapSpec) -> TrapOutcome {
    let roll = dice.roll(CHECK_DIE) + ceil_half(character.attr(Attribute::Dexterity));
    let mut outcome = TrapOutcome {
        name: trap.name.clone(),
        roll,
        dc: trap.dc,
        dodged: roll >= trap.dc,
        damage: 0,
        effect: None,
    };
    if outcome.dodged {
        return outcome;
    }

    if let Some(die) = trap.damage {
        outcome.damage = dice.roll(die).max(0);
        character.hp -= outcome.damage;
    }

    outcome.effect = trap.effect.as_ref().map(|effect| match effect {
        TrapEffect::GoldDust { amount } => {
            let lost = (*amount).min(character.gold);
            character.spend_gold(lost);
            TrapEffectOutcome::GoldLost(lost)
        }
        TrapEffect::Poison { duration } => {
            character.poison_turns = character.poison_turns.max(*duration);
            TrapEffectOutcome::Poisoned {
                duration: *duration,
            }
        }
        // Flavor only: corrosion threatens but never marks the blade.
        TrapEffect::RustWeapon => TrapEffectOutcome::WeaponRusted {
            weapon: character
                .equipped_weapon()
                .map(|w| w.name.clone())
                .unwrap_or_else(|| "gear".to_string()),
        },
        TrapEffect::DexDown { amount } => {
            let applied = character.attributes.adjust(Attribute::Dexterity, -amount);
            TrapEffectOutcome::DexteritySapped { amount: -applied }
        }
    });

    outcome
}
