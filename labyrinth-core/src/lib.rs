//! Server-side core of the Labyrinth Adventure dungeon crawler.
//!
//! This crate provides:
//! - A deterministic, event-driven game engine (character creation, town
//!   services, labyrinth exploration, dice-based combat, revival, victory)
//! - Immutable content tables for monsters, gear, potions, spells, traps,
//!   rings, and dialogue
//! - Injected persistence: saved games, a Dragon-slayer leaderboard, and an
//!   external review submitter
//! - A session host that serializes actions per connected device
//!
//! The browser renderer and the transport are external collaborators: the
//! engine consumes action ids with optional payloads and emits an ordered
//! stream of structured UI events.
//!
//! # Quick start
//!
//! ```
//! use labyrinth_core::session::{HostConfig, SessionHost};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let host = SessionHost::new(HostConfig::in_memory());
//! let events = host.connect("device-1").await;
//! assert!(!events.is_empty());
//! let _more = host.dispatch("device-1", "main:new_game", None).await;
//! # }
//! ```

pub mod combat;
pub mod content;
pub mod dice;
pub mod engine;
pub mod events;
pub mod labyrinth;
pub mod persist;
pub mod quests;
pub mod session;
pub mod traps;
pub mod world;

// Primary public API
pub use content::ContentTables;
pub use dice::{Dice, DieSpec};
pub use engine::{GameEngine, Phase};
pub use events::{Event, HudState, MenuItem};
pub use persist::{LeaderboardStore, ReviewSubmitter, SaveStore};
pub use session::{HostConfig, SessionHost};
pub use world::{Attribute, Character, Difficulty};
