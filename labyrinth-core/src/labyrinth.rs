//! Labyrinth room generation.
//!
//! Rooms are ephemeral: one is generated per entry and only the current
//! room lives on the engine state. Every room holds a monster; the Dragon
//! is forced at the fixed depth and for the 50th engaged monster.

use crate::content::{ContentTables, RingSpec, TrapSpec};
use crate::dice::Dice;
use crate::world::Monster;

/// Depth at which the Dragon always waits.
pub const DRAGON_DEPTH: u32 = 5;

/// The Nth engaged monster is always the Dragon.
pub const DRAGON_ENCOUNTER: u32 = 50;

/// A chest found in a freshly generated room.
#[derive(Debug, Clone)]
pub struct Chest {
    pub gold: i32,
    pub ring: Option<RingSpec>,
}

/// A generated room.
#[derive(Debug, Clone)]
pub struct Room {
    pub description: String,
    /// Opaque background descriptor passed through to scene events.
    pub background: String,
    pub monster: Option<Monster>,
    pub chest: Option<Chest>,
    pub trap: Option<TrapSpec>,
}

/// True when the upcoming encounter must be the Dragon.
pub fn dragon_forced(depth: u32, encounters_so_far: u32) -> bool {
    depth == DRAGON_DEPTH || encounters_so_far + 1 == DRAGON_ENCOUNTER
}

/// Generate the room behind the next door.
pub fn generate_room(
    dice: &mut Dice,
    tables: &ContentTables,
    depth: u32,
    encounters_so_far: u32,
) -> Room {
    let forced = dragon_forced(depth, encounters_so_far);
    let monster = if forced {
        tables.monster("Dragon").map(|spec| spec.spawn(dice))
    } else {
        tables.wandering_monster(dice).cloned().map(|spec| spec.spawn(dice))
    };

    if forced {
        return Room {
            description: "A vast scorched cavern. Gold slag pools between rib-bones the size of rafters.".into(),
            background: "dragon.png".into(),
            monster,
            chest: None,
            trap: None,
        };
    }

    let chest = if dice.chance(0.25) {
        Some(Chest {
            gold: dice.range_inclusive(10, 100),
            ring: if dice.chance(0.5) {
                tables.random_ring(dice).cloned()
            } else {
                None
            },
        })
    } else {
        None
    };

    let trap = if dice.chance(0.20) {
        tables.random_trap(dice).cloned()
    } else {
        None
    };

    let description = tables
        .dialogue
        .pick(dice, "labyrinth", "rooms", &[])
        .unwrap_or_else(|| "A damp chamber with flickering torchlight.".into());
    let background = background_for(&description);

    Room {
        description,
        background,
        monster,
        chest,
        trap,
    }
}

/// Map a room description to a background descriptor by keyword proximity.
pub fn background_for(description: &str) -> String {
    let desc = description.to_lowercase();
    let file = if desc.contains("circular") || desc.contains("chamber") {
        "rooms/circular_chamber.png"
    } else if desc.contains("rectangular") || desc.contains("hall") {
        "rooms/rectangular_hall.png"
    } else if desc.contains("hexagonal") || desc.contains("pillared") {
        "rooms/hexagonal_pillared_room.png"
    } else if desc.contains("triangular") {
        "rooms/triangular_chamber.png"
    } else if desc.contains("oval") || desc.contains("gallery") {
        "rooms/oval_gallery.png"
    } else if desc.contains("square") || desc.contains("vault") {
        "rooms/square_vault.png"
    } else {
        "labyrinth.png"
    };
    file.to_string()
}

/// Background used while fighting `monster`.
pub fn monster_background(monster: &Monster) -> String {
    let slug = monster.name.to_lowercase().replace(' ', "_");
    format!("monsters/{slug}.png")
}
