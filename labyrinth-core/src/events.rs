//! Outbound event model.
//!
//! Every phase handler returns an ordered `Vec<Event>`; the session host
//! forwards them to the transport verbatim. The engine is the only writer,
//! the renderer is a passive consumer.

use serde::{Deserialize, Serialize};

/// One entry of a choice menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// HUD snapshot delivered with `update_stats` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HudState {
    pub hp: i32,
    pub max_hp: i32,
    pub gold: i32,
    pub xp: i32,
    pub level: u32,
    pub depth: u32,
    pub summary: String,
}

/// A structured UI event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A line appended to the rolling narrative.
    Dialogue { text: String },
    /// A combat log line.
    CombatUpdate { text: String },
    /// Present a choice set; exactly one menu is active at a time.
    Menu { items: Vec<MenuItem> },
    /// Request free-text input (name entry, review text).
    Prompt { id: String, label: String },
    /// Renderer pacing hint.
    Pause,
    /// Set the active background; `None` resets it.
    Scene {
        background: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Deliver the current HUD snapshot.
    UpdateStats { state: HudState },
    /// Reset renderer state: log, choices, current scene.
    Clear,
}

impl Event {
    pub fn dialogue(text: impl Into<String>) -> Self {
        Event::Dialogue { text: text.into() }
    }

    pub fn combat(text: impl Into<String>) -> Self {
        Event::CombatUpdate { text: text.into() }
    }

    pub fn menu<I, S, L>(items: I) -> Self
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        Event::Menu {
            items: items
                .into_iter()
                .map(|(id, label)| MenuItem::new(id, label))
                .collect(),
        }
    }

    pub fn scene(background: impl Into<String>) -> Self {
        Event::Scene {
            background: Some(background.into()),
            text: None,
        }
    }

    pub fn scene_reset() -> Self {
        Event::Scene {
            background: None,
            text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = Event::dialogue("A Goblin appears!");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "dialogue");
        assert_eq!(json["text"], "A Goblin appears!");

        let menu = Event::menu([("main:new_game", "1) New Game")]);
        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json["type"], "menu");
        assert_eq!(json["items"][0]["id"], "main:new_game");
    }

    #[test]
    fn scene_reset_serializes_null_background() {
        let json = serde_json::to_value(Event::scene_reset()).unwrap();
        assert!(json["background"].is_null());
    }

    #[test]
    fn events_round_trip() {
        let ev = Event::UpdateStats {
            state: HudState {
                hp: 10,
                max_hp: 40,
                gold: 120,
                xp: 75,
                level: 2,
                depth: 3,
                summary: "Ada the Explorer".into(),
            },
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
