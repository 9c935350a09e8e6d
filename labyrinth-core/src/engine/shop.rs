//! Shop and inventory management.
//!
//! Buying pulls from the content tables' shop stock. Selling haggles from
//! half the base price, swayed by charisma and a little market variance;
//! damaged, equipped, cursed, and labyrinth-found gear stays off the table.

use super::{GameEngine, Phase};
use crate::world::{Armor, Attribute, Weapon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShopStage {
    #[default]
    Root,
    Category(ShopCategory),
    Sell,
    SellConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopCategory {
    Weapons,
    Armor,
    Potions,
    Spells,
}

impl ShopCategory {
    fn from_id(id: &str) -> Option<ShopCategory> {
        match id {
            "weapons" => Some(ShopCategory::Weapons),
            "armor" => Some(ShopCategory::Armor),
            "potions" => Some(ShopCategory::Potions),
            "spells" => Some(ShopCategory::Spells),
            _ => None,
        }
    }
}

/// What kind of inventory entry a sale refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellKind {
    Weapon,
    Armor,
    Ring,
}

#[derive(Debug, Clone, Default)]
pub struct ShopState {
    pub stage: ShopStage,
    pub pending_sale: Option<(SellKind, usize, i32)>,
}

impl GameEngine {
    pub(crate) fn shop_show_categories(&mut self) {
        self.clear();
        self.scene("town_menu/shop.png");
        self.shop.stage = ShopStage::Root;
        self.shop.pending_sale = None;
        self.say("=== Shop ===");
        if let Some(gold) = self.s.character.as_ref().map(|c| c.gold) {
            self.say(format!("Gold: {gold}g"));
        }
        self.menu([
            ("shop:weapons", "1) Weapons"),
            ("shop:armor", "2) Armor"),
            ("shop:potions", "3) Potions"),
            ("shop:spells", "4) Spells"),
            ("shop:sell", "5) Sell items"),
            ("shop:back", "6) Leave Shop"),
        ]);
        self.update_stats();
    }

    pub(crate) fn handle_shop(&mut self, action: &str) {
        match action {
            "shop:back" => match self.shop.stage {
                ShopStage::Root => {
                    self.phase = Phase::Town;
                    self.clear();
                    self.render_town_menu();
                }
                _ => self.shop_show_categories(),
            },
            "shop:continue" => match self.shop.stage {
                ShopStage::Category(cat) => self.shop_list_category(cat),
                _ => self.shop_show_categories(),
            },
            "shop:sell" | "shop:sell_continue" => self.shop_sell_menu(),
            _ => {
                if let Some(id) = action.strip_prefix("shop:buy:") {
                    self.shop_buy(id);
                } else if let Some(id) = action.strip_prefix("shop:sellsel:") {
                    self.shop_sell_selected(id);
                } else if let Some(id) = action.strip_prefix("shop:sellconfirm:") {
                    self.shop_sell_confirm(id == "yes");
                } else if let Some(cat) = action
                    .strip_prefix("shop:")
                    .and_then(ShopCategory::from_id)
                {
                    self.shop_list_category(cat);
                } else {
                    self.shop_show_categories();
                }
            }
        }
    }

    fn shop_list_category(&mut self, cat: ShopCategory) {
        self.clear();
        self.shop.stage = ShopStage::Category(cat);
        let tables = self.tables.clone();
        let gold = self.s.character.as_ref().map(|c| c.gold).unwrap_or(0);
        let (title, rows): (&str, Vec<(String, String)>) = match cat {
            ShopCategory::Weapons => (
                "=== Weapons ===",
                tables
                    .shop_weapons()
                    .iter()
                    .map(|w| {
                        (
                            format!("shop:buy:weapons:{}", w.name),
                            format!("{} ({}), {}g", w.name, w.damage_die, w.price),
                        )
                    })
                    .collect(),
            ),
            ShopCategory::Armor => (
                "=== Armor ===",
                tables
                    .shop_armors()
                    .iter()
                    .map(|a| {
                        (
                            format!("shop:buy:armor:{}", a.name),
                            format!("{} (AC {}), {}g", a.name, a.armor_class, a.price),
                        )
                    })
                    .collect(),
            ),
            ShopCategory::Potions => (
                "=== Potions ===",
                tables
                    .potions
                    .iter()
                    .filter(|p| p.price > 0)
                    .map(|p| {
                        (
                            format!("shop:buy:potions:{}", p.name),
                            format!("{} ({} uses) ({}g)", p.name, p.uses, p.price),
                        )
                    })
                    .collect(),
            ),
            ShopCategory::Spells => (
                "=== Spells ===",
                tables
                    .spells
                    .iter()
                    .filter(|s| s.price > 0)
                    .map(|s| {
                        (
                            format!("shop:buy:spells:{}", s.name),
                            format!("{} ({} uses) ({}g)", s.name, s.uses, s.price),
                        )
                    })
                    .collect(),
            ),
        };
        self.say(title);
        self.say(format!("Gold: {gold}g"));
        let mut items = vec![("shop:back".to_string(), "1) Back to main shop".to_string())];
        for (n, (id, label)) in rows.into_iter().enumerate() {
            items.push((id, format!("{}) {label}", n + 2)));
        }
        self.menu(items);
        self.update_stats();
    }

    fn shop_buy(&mut self, id: &str) {
        let Some((cat_id, name)) = id.split_once(':') else {
            self.shop_show_categories();
            return;
        };
        let Some(cat) = ShopCategory::from_id(cat_id) else {
            self.shop_show_categories();
            return;
        };
        let tables = self.tables.clone();
        // (price, apply) per category; a miss re-renders the listing.
        let purchase: Option<(i32, String)> = match cat {
            ShopCategory::Weapons => tables.weapon(name).filter(|w| !w.labyrinth_only).map(|w| {
                (
                    w.price,
                    format!("Purchased {}. Use Inventory to equip it.", w.name),
                )
            }),
            ShopCategory::Armor => tables.armor(name).filter(|a| !a.labyrinth_only).map(|a| {
                (a.price, format!("Purchased and equipped {}.", a.name))
            }),
            ShopCategory::Potions => tables
                .potion(name)
                .map(|p| (p.price, format!("Purchased {} (+{} uses).", p.name, p.uses))),
            ShopCategory::Spells => tables
                .spell(name)
                .map(|s| (s.price, format!("Purchased {} (+{} uses).", s.name, s.uses))),
        };
        let Some((price, receipt)) = purchase else {
            self.shop_list_category(cat);
            return;
        };
        let outcome = self.with_character(|c, _| {
            if c.gold < price {
                return Err(c.gold);
            }
            c.spend_gold(price);
            match cat {
                ShopCategory::Weapons => {
                    if let Some(spec) = tables.weapon(name) {
                        c.weapons.push(Weapon {
                            name: spec.name.clone(),
                            damage_die: spec.damage_die,
                            price: spec.price,
                            damaged: false,
                            labyrinth_drop: false,
                        });
                    }
                }
                ShopCategory::Armor => {
                    if let Some(spec) = tables.armor(name) {
                        c.armors.push(Armor {
                            name: spec.name.clone(),
                            armor_class: spec.armor_class,
                            price: spec.price,
                            damaged: false,
                            labyrinth_drop: false,
                        });
                        c.equipped_armor = Some(c.armors.len() - 1);
                    }
                }
                ShopCategory::Potions => {
                    if let Some(spec) = tables.potion(name) {
                        c.add_potion_uses(&spec.name, spec.uses);
                    }
                }
                ShopCategory::Spells => {
                    if let Some(spec) = tables.spell(name) {
                        c.add_spell_uses(&spec.name, spec.uses);
                    }
                }
            }
            Ok(())
        });
        match outcome {
            Some(Ok(())) => {
                self.say(receipt);
                self.say(format!("You bought {name} for {price}g."));
                self.pause_continue("shop:continue");
            }
            Some(Err(gold)) => {
                self.say("Not enough gold.");
                self.say(format!("You need {price}g but have {gold}g."));
                self.pause();
                self.menu([("shop:continue", "Continue")]);
            }
            None => self.shop_show_categories(),
        }
    }

    // ----- selling -----

    fn shop_sell_menu(&mut self) {
        self.clear();
        self.shop.stage = ShopStage::Sell;
        self.shop.pending_sale = None;
        let Some((gold, sellable)) = self.s.character.as_ref().map(|c| {
            let mut rows: Vec<(SellKind, usize, String)> = Vec::new();
            for (i, w) in c.weapons.iter().enumerate() {
                let equipped = c.equipped_weapon == Some(i);
                if !w.damaged && !equipped && !w.labyrinth_drop {
                    rows.push((SellKind::Weapon, i, w.name.clone()));
                }
            }
            for (i, a) in c.armors.iter().enumerate() {
                let equipped = c.equipped_armor == Some(i);
                if !a.damaged && !equipped && !a.labyrinth_drop {
                    rows.push((SellKind::Armor, i, a.name.clone()));
                }
            }
            for (i, r) in c.rings.iter().enumerate() {
                if !r.cursed {
                    rows.push((SellKind::Ring, i, r.name.clone()));
                }
            }
            (c.gold, rows)
        }) else {
            self.shop_show_categories();
            return;
        };
        self.say("=== Sell Items ===");
        self.say(format!("Gold: {gold}g"));
        if sellable.is_empty() {
            self.say("You have nothing that can be sold in the shop.");
            self.menu([("shop:back", "1) Back")]);
            return;
        }
        self.say("Sellable items:");
        let mut items = vec![("shop:back".to_string(), "1) Back".to_string())];
        for (n, (kind, i, name)) in sellable.into_iter().enumerate() {
            let k = match kind {
                SellKind::Weapon => "w",
                SellKind::Armor => "a",
                SellKind::Ring => "r",
            };
            items.push((format!("shop:sellsel:{k}:{i}"), format!("{}) {name}", n + 2)));
        }
        self.menu(items);
    }

    /// Haggle: half the base price, swayed by charisma (+20% at 15+, -20%
    /// at 6 or less) and +/-10% market variance. Floor, minimum 1.
    fn haggle_price(&mut self, base: i32) -> i32 {
        let cha = self
            .s
            .character
            .as_ref()
            .map(|c| c.attr(Attribute::Charisma))
            .unwrap_or(10);
        let tier = if cha >= 15 {
            1.2
        } else if cha <= 6 {
            0.8
        } else {
            1.0
        };
        let variance = self.dice.uniform(0.9, 1.1);
        ((base as f64 * 0.5 * tier * variance) as i32).max(1)
    }

    fn shop_sell_selected(&mut self, id: &str) {
        let Some((kind_id, index)) = id.split_once(':') else {
            self.shop_sell_menu();
            return;
        };
        let Ok(index) = index.parse::<usize>() else {
            self.shop_sell_menu();
            return;
        };
        let kind = match kind_id {
            "w" => SellKind::Weapon,
            "a" => SellKind::Armor,
            "r" => SellKind::Ring,
            _ => {
                self.shop_sell_menu();
                return;
            }
        };
        let base = self.s.character.as_ref().and_then(|c| match kind {
            SellKind::Weapon => c
                .weapons
                .get(index)
                .filter(|w| !w.damaged && !w.labyrinth_drop && c.equipped_weapon != Some(index))
                .map(|w| w.price),
            SellKind::Armor => c
                .armors
                .get(index)
                .filter(|a| !a.damaged && !a.labyrinth_drop && c.equipped_armor != Some(index))
                .map(|a| a.price),
            // Rings have no shop row; a nominal base value.
            SellKind::Ring => c.rings.get(index).filter(|r| !r.cursed).map(|_| 100),
        });
        let Some(base) = base else {
            self.say("That cannot be sold.");
            self.shop_sell_menu();
            return;
        };
        let offer = self.haggle_price(base);
        self.shop.stage = ShopStage::SellConfirm;
        self.shop.pending_sale = Some((kind, index, offer));
        self.say(format!("Original shop price: {base}g"));
        self.say(format!("Alright, alright - you win. {offer} gold."));
        self.menu([
            ("shop:sellconfirm:yes", "1) Confirm sale"),
            ("shop:sellconfirm:no", "2) Cancel"),
        ]);
    }

    fn shop_sell_confirm(&mut self, confirmed: bool) {
        let Some((kind, index, offer)) = self.shop.pending_sale.take() else {
            self.shop_sell_menu();
            return;
        };
        self.shop.stage = ShopStage::Sell;
        if !confirmed {
            self.say("Sale cancelled.");
            self.pause();
            self.menu([("shop:sell_continue", "Continue")]);
            return;
        }
        let sold = self.with_character(|c, _| {
            let name = match kind {
                SellKind::Weapon => {
                    if index >= c.weapons.len() {
                        return None;
                    }
                    let weapon = c.weapons.remove(index);
                    // Re-point the equipped index past the removed slot.
                    if let Some(equipped) = c.equipped_weapon {
                        if equipped > index {
                            c.equipped_weapon = Some(equipped - 1);
                        } else if equipped == index {
                            c.equipped_weapon = None;
                        }
                    }
                    weapon.name
                }
                SellKind::Armor => {
                    if index >= c.armors.len() {
                        return None;
                    }
                    let armor = c.armors.remove(index);
                    if let Some(equipped) = c.equipped_armor {
                        if equipped > index {
                            c.equipped_armor = Some(equipped - 1);
                        } else if equipped == index {
                            c.equipped_armor = None;
                        }
                    }
                    armor.name
                }
                SellKind::Ring => {
                    if index >= c.rings.len() {
                        return None;
                    }
                    c.rings.remove(index).name
                }
            };
            c.gain_gold(offer);
            Some(name)
        });
        match sold.flatten() {
            Some(name) => {
                self.say(format!("Sold {name} for {offer}g."));
                self.update_stats();
                self.pause();
                self.menu([("shop:sell_continue", "Continue")]);
            }
            None => self.shop_sell_menu(),
        }
    }

    // ----- inventory -----

    pub(crate) fn inventory_show(&mut self) {
        self.clear();
        let Some((weapon_line, armor_line)) = self.s.character.as_ref().map(|c| {
            let weapon = c
                .equipped_weapon()
                .map(|w| format!("{} ({})", w.display_name(), w.damage_die))
                .unwrap_or_else(|| "Unarmed".to_string());
            let armor = c
                .equipped_armor()
                .map(|a| format!("{} (AC {})", a.display_name(), a.armor_class))
                .unwrap_or_else(|| "None".to_string());
            (weapon, armor)
        }) else {
            self.render_town_menu();
            return;
        };
        self.say("=== Inventory ===");
        self.say(format!("Equipped weapon: {weapon_line}"));
        self.say(format!("Equipped armor: {armor_line}"));
        self.menu([
            ("inv:weapon", "1) Equip weapon"),
            ("inv:armor", "2) Equip armor"),
            ("inv:potions", "3) View potions"),
            ("inv:unequip_weapon", "4) Unequip weapon"),
            ("inv:unequip_armor", "5) Unequip armor"),
            ("inv:back", "6) Back"),
        ]);
        self.update_stats();
    }

    pub(crate) fn handle_inventory(&mut self, action: &str) {
        match action {
            "inv:back" => {
                self.phase = Phase::Town;
                self.clear();
                self.render_town_menu();
            }
            "inv:continue" | "inv:weapon:back" | "inv:armor:back" => self.inventory_show(),
            "inv:weapon" => self.inventory_weapon_list(),
            "inv:armor" => self.inventory_armor_list(),
            "inv:potions" => self.inventory_potions(),
            "inv:unequip_weapon" => {
                let name = self.with_character(|c, _| {
                    let name = c.equipped_weapon().map(|w| w.name.clone());
                    c.equipped_weapon = None;
                    name
                });
                match name.flatten() {
                    Some(name) => self.say(format!("Unequipped {name}.")),
                    None => self.say("No weapon is currently equipped."),
                }
                self.pause_continue("inv:continue");
            }
            "inv:unequip_armor" => {
                let name = self.with_character(|c, _| {
                    let name = c.equipped_armor().map(|a| a.name.clone());
                    c.equipped_armor = None;
                    name
                });
                match name.flatten() {
                    Some(name) => self.say(format!("Unequipped {name}.")),
                    None => self.say("No armor is currently equipped."),
                }
                self.pause_continue("inv:continue");
            }
            _ => {
                if let Some(i) = action.strip_prefix("inv:weapon:set:") {
                    self.inventory_equip(i, true);
                } else if let Some(i) = action.strip_prefix("inv:armor:set:") {
                    self.inventory_equip(i, false);
                } else {
                    self.inventory_show();
                }
            }
        }
    }

    fn inventory_weapon_list(&mut self) {
        self.clear();
        let rows = self
            .s
            .character
            .as_ref()
            .map(|c| {
                c.weapons
                    .iter()
                    .map(|w| format!("{} ({})", w.display_name(), w.damage_die))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if rows.is_empty() {
            self.say("You have no weapons.");
            self.inventory_show();
            return;
        }
        let mut items = vec![("inv:weapon:back".to_string(), "1) Back".to_string())];
        for (i, label) in rows.into_iter().enumerate() {
            items.push((format!("inv:weapon:set:{i}"), format!("{}) {label}", i + 2)));
        }
        self.menu(items);
    }

    fn inventory_armor_list(&mut self) {
        self.clear();
        let rows = self
            .s
            .character
            .as_ref()
            .map(|c| {
                c.armors
                    .iter()
                    .map(|a| format!("{} (AC {})", a.display_name(), a.armor_class))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if rows.is_empty() {
            self.say("You have no armor.");
            self.inventory_show();
            return;
        }
        let mut items = vec![("inv:armor:back".to_string(), "1) Back".to_string())];
        for (i, label) in rows.into_iter().enumerate() {
            items.push((format!("inv:armor:set:{i}"), format!("{}) {label}", i + 2)));
        }
        self.menu(items);
    }

    fn inventory_equip(&mut self, index: &str, weapon: bool) {
        let Ok(index) = index.parse::<usize>() else {
            self.inventory_show();
            return;
        };
        let name = self.with_character(|c, _| {
            if weapon {
                let name = c.weapons.get(index).map(|w| w.name.clone());
                if name.is_some() {
                    c.equipped_weapon = Some(index);
                }
                name
            } else {
                let name = c.armors.get(index).map(|a| a.name.clone());
                if name.is_some() {
                    c.equipped_armor = Some(index);
                }
                name
            }
        });
        match name.flatten() {
            Some(name) => {
                self.say(format!("Equipped {name}."));
                self.pause_continue("inv:continue");
            }
            None => self.inventory_show(),
        }
    }

    fn inventory_potions(&mut self) {
        self.clear();
        let Some((legacy, named)) = self.s.character.as_ref().map(|c| {
            (
                c.potions,
                c.potion_uses
                    .iter()
                    .map(|(name, uses)| format!("{name}: {uses} uses"))
                    .collect::<Vec<_>>(),
            )
        }) else {
            self.inventory_show();
            return;
        };
        if legacy == 0 && named.is_empty() {
            self.say("You have no potions.");
        } else {
            self.say("Potions:");
            if legacy > 0 {
                self.say(format!("Healing (found): {legacy}"));
            }
            for line in named {
                self.say(line);
            }
        }
        self.pause();
        self.inventory_show();
    }
}
