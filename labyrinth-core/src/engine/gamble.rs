//! The gambling den: build a wager, then guess a die exactly or call a
//! d20 range. This subgame is the one place the engine rolls a d20.

use super::GameEngine;
use crate::dice::DieSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GambleStage {
    #[default]
    Idle,
    Mode,
    Bet,
    ExactDie,
    ExactGuess,
    RangeChoose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GambleMode {
    Exact,
    Range,
}

#[derive(Debug, Clone, Default)]
pub struct GambleState {
    pub stage: GambleStage,
    pub mode: Option<GambleMode>,
    pub bet: i32,
    pub die_sides: u32,
}

impl GambleState {
    pub fn active(&self) -> bool {
        self.stage != GambleStage::Idle
    }
}

const MIN_BET: i32 = 5;

impl GameEngine {
    pub(crate) fn gamble_start(&mut self) {
        self.gamble = GambleState {
            stage: GambleStage::Mode,
            ..GambleState::default()
        };
        self.clear();
        self.scene("town_menu/gambling.png");
        self.flavor(
            "town",
            "gambler",
            &[],
            "Seth: Feeling lucky, Explorer? The dice don't care either way.",
        );
        self.say("Which mode do you want to play?");
        self.menu([
            ("gamble:mode:exact", "1) Exact guess"),
            ("gamble:mode:range", "2) Range guess"),
            ("town", "3) Back"),
        ]);
    }

    pub(crate) fn handle_gamble(&mut self, action: &str, _payload: Option<&serde_json::Value>) {
        if action == "town" {
            self.gamble = GambleState::default();
            self.clear();
            self.render_town_menu();
            return;
        }
        match self.gamble.stage {
            GambleStage::Mode => match action {
                "gamble:mode:exact" => {
                    self.gamble.mode = Some(GambleMode::Exact);
                    self.gamble_bet_menu();
                }
                "gamble:mode:range" => {
                    self.gamble.mode = Some(GambleMode::Range);
                    self.gamble_bet_menu();
                }
                _ => self.gamble_start(),
            },
            GambleStage::Bet => self.gamble_bet_action(action),
            GambleStage::ExactDie => self.gamble_exact_die_action(action),
            GambleStage::ExactGuess => self.gamble_exact_guess_action(action),
            GambleStage::RangeChoose => self.gamble_range_action(action),
            GambleStage::Idle => self.gamble_start(),
        }
    }

    fn gamble_bet_menu(&mut self) {
        self.gamble.stage = GambleStage::Bet;
        self.clear();
        self.say(format!("Current bet: {}g", self.gamble.bet));
        self.menu([
            ("gamble:bet:+5", "+5"),
            ("gamble:bet:+10", "+10"),
            ("gamble:bet:+50", "+50"),
            ("gamble:bet:+100", "+100"),
            ("gamble:bet:ok", "OK"),
            ("gamble:bet:back", "Back"),
        ]);
        self.update_stats();
    }

    fn gamble_bet_action(&mut self, action: &str) {
        let gold = self.s.character.as_ref().map(|c| c.gold).unwrap_or(0);
        match action {
            "gamble:bet:back" => self.gamble_start(),
            "gamble:bet:ok" => {
                if self.gamble.bet < MIN_BET {
                    self.say(format!("That wager won't do - minimum {MIN_BET} gold."));
                    self.gamble_bet_menu();
                } else if self.gamble.bet > gold {
                    self.say(format!(
                        "You don't have enough gold for that bet. Max: {gold}g."
                    ));
                    self.gamble_bet_menu();
                } else {
                    match self.gamble.mode {
                        Some(GambleMode::Exact) => self.gamble_exact_die_menu(),
                        _ => self.gamble_range_menu(),
                    }
                }
            }
            _ => {
                let increment = match action {
                    "gamble:bet:+5" => 5,
                    "gamble:bet:+10" => 10,
                    "gamble:bet:+50" => 50,
                    "gamble:bet:+100" => 100,
                    _ => 0,
                };
                if increment > 0 {
                    self.gamble.bet = (self.gamble.bet + increment).min(gold);
                }
                self.gamble_bet_menu();
            }
        }
    }

    fn gamble_exact_die_menu(&mut self) {
        self.gamble.stage = GambleStage::ExactDie;
        self.clear();
        self.say("Choose die:");
        self.menu([
            ("gamble:die:20", "1) D20"),
            ("gamble:die:10", "2) D10"),
            ("gamble:die:6", "3) D6"),
            ("gamble:back", "4) Back"),
        ]);
    }

    fn gamble_exact_die_action(&mut self, action: &str) {
        if action == "gamble:back" {
            self.gamble_bet_menu();
            return;
        }
        let sides = match action {
            "gamble:die:20" => 20,
            "gamble:die:10" => 10,
            "gamble:die:6" => 6,
            _ => {
                self.gamble_exact_die_menu();
                return;
            }
        };
        self.gamble.die_sides = sides;
        self.gamble.stage = GambleStage::ExactGuess;
        self.clear();
        self.say(format!("Pick a number between 1 and {sides}."));
        let mut items: Vec<(String, String)> = (1..=sides)
            .map(|n| (format!("gamble:guess:{n}"), n.to_string()))
            .collect();
        items.push(("gamble:back".to_string(), format!("{}) Back", sides + 1)));
        self.menu(items);
    }

    fn gamble_exact_guess_action(&mut self, action: &str) {
        if action == "gamble:back" {
            self.gamble_exact_die_menu();
            return;
        }
        let Some(guess) = action
            .strip_prefix("gamble:guess:")
            .and_then(|n| n.parse::<u32>().ok())
        else {
            self.gamble_exact_die_menu();
            return;
        };
        let sides = self.gamble.die_sides.max(6);
        if guess < 1 || guess > sides {
            self.say(format!("Pick a number between 1 and {sides}."));
            return;
        }
        self.say(format!("You chose {guess} on a d{sides}."));
        let roll = self.dice.roll(DieSpec::new(1, sides));
        self.say(format!("You roll: {roll}"));
        let bet = self.gamble.bet;
        let multiplier = match sides {
            20 => 11,
            10 => 6,
            _ => 3,
        };
        if roll == guess as i32 {
            let win = bet * multiplier;
            let _ = self.with_character(|c, _| c.gain_gold(win));
            self.say(format!("You win! Payout: {win}g"));
        } else {
            let _ = self.with_character(|c, _| c.spend_gold(bet));
            self.say(format!("You lose! {bet}g"));
        }
        self.gamble_finish();
    }

    fn gamble_range_menu(&mut self) {
        self.gamble.stage = GambleStage::RangeChoose;
        self.clear();
        self.say("Choose a range (d20):");
        self.menu([
            ("gamble:range:1", "1) 1-5"),
            ("gamble:range:2", "2) 6-10"),
            ("gamble:range:3", "3) 11-15"),
            ("gamble:range:4", "4) 16-20"),
            ("gamble:back", "5) Back"),
        ]);
    }

    fn gamble_range_action(&mut self, action: &str) {
        if action == "gamble:back" {
            self.gamble_bet_menu();
            return;
        }
        let range = match action {
            "gamble:range:1" => (1, 5),
            "gamble:range:2" => (6, 10),
            "gamble:range:3" => (11, 15),
            "gamble:range:4" => (16, 20),
            _ => {
                self.gamble_range_menu();
                return;
            }
        };
        self.say(format!("You chose {}-{} on a d20.", range.0, range.1));
        let roll = self.dice.roll(DieSpec::new(1, 20));
        self.say(format!("You roll: {roll}"));
        let bet = self.gamble.bet;
        if (range.0..=range.1).contains(&roll) {
            let win = bet * 2;
            let _ = self.with_character(|c, _| c.gain_gold(win));
            self.say(format!("You win! Payout: {win}g"));
        } else {
            let _ = self.with_character(|c, _| c.spend_gold(bet));
            self.say(format!("You lose! {bet}g"));
        }
        self.gamble_finish();
    }

    fn gamble_finish(&mut self) {
        self.gamble = GambleState::default();
        self.update_stats();
        self.pause();
        self.render_town_menu();
    }
}
