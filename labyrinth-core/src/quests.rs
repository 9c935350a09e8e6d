//! Side quests from the town bulletin.
//!
//! Up to three simultaneous quests; mechanically every quest completes on
//! killing its target once, the kind only varies the flavor text. Rewards
//! pay out immediately when a kill credits the quest.

use crate::content::ContentTables;
use crate::dice::Dice;
use crate::world::{Character, QuestKind, SideQuest, MAX_ACTIVE_QUESTS};

/// Whether the bulletin can post another quest for this character.
pub fn can_offer(character: &Character) -> bool {
    character.quests.len() < MAX_ACTIVE_QUESTS
}

/// Quest reward: scales with difficulty and inversely with how common the
/// target is.
pub fn reward_for(difficulty: i32, wander_chance: f64) -> i32 {
    (difficulty as f64 * 20.0 + (1.0 / wander_chance.max(0.01)) / 2.0) as i32
}

/// Fill the character's quest slots up to the cap with fresh offers,
/// avoiding monsters already targeted. Returns the newly added quests.
pub fn generate_offers(
    dice: &mut Dice,
    tables: &ContentTables,
    character: &mut Character,
) -> Vec<SideQuest> {
    let mut added = Vec::new();
    while can_offer(character) {
        let taken: Vec<&str> = character.quests.iter().map(|q| q.target.as_str()).collect();
        let candidates: Vec<_> = tables
            .quest_candidates()
            .into_iter()
            .filter(|m| !taken.contains(&m.name.as_str()))
            .collect();
        let Some(target) = dice.choose(&candidates) else {
            break;
        };
        let kind = if dice.chance(0.6) {
            QuestKind::Kill
        } else {
            QuestKind::Collect
        };
        let quest = SideQuest {
            target: target.name.clone(),
            kind,
            goal: 1,
            progress: 0,
            reward: reward_for(target.difficulty, target.wander_chance),
        };
        character.quests.push(quest.clone());
        added.push(quest);
    }
    added
}

/// Credit a kill against every active quest targeting `monster_name`.
/// Completed quests pay gold immediately and are removed; the completions
/// are returned so the engine can announce them.
pub fn credit_kill(character: &mut Character, monster_name: &str) -> Vec<SideQuest> {
    let mut completed = Vec::new();
    let mut remaining = Vec::with_capacity(character.quests.len());
    for mut quest in std::mem::take(&mut character.quests) {
        if quest.target == monster_name {
            quest.progress += 1;
        }
        if quest.progress >= quest.goal {
            completed.push(quest);
        } else {
            remaining.push(quest);
        }
    }
    character.quests = remaining;
    for quest in &completed {
        character.gain_gold(quest.reward);
        character.stats.quests_completed += 1;
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Difficulty;

    fn character() -> Character {
        Character::new("Quinn", Difficulty::Normal, "dev")
    }

    #[test]
    fn offers_fill_to_the_cap_with_distinct_targets() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(8);
        let mut c = character();
        let added = generate_offers(&mut dice, &tables, &mut c);
        assert_eq!(added.len(), MAX_ACTIVE_QUESTS);
        assert!(!can_offer(&c));
        let mut names: Vec<_> = c.quests.iter().map(|q| q.target.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), MAX_ACTIVE_QUESTS);
        // Re-asking while full adds nothing.
        assert!(generate_offers(&mut dice, &tables, &mut c).is_empty());
    }

    #[test]
    fn offers_only_target_common_monsters() {
        let tables = ContentTables::builtin();
        let mut dice = Dice::seeded(21);
        let mut c = character();
        generate_offers(&mut dice, &tables, &mut c);
        for quest in &c.quests {
            let spec = tables.monster(&quest.target).unwrap();
            assert!(spec.wander_chance > 0.02);
        }
    }

    #[test]
    fn reward_formula() {
        // difficulty 2, wander 0.16 -> 40 + 3.125 -> 43
        assert_eq!(reward_for(2, 0.16), 43);
        // Tiny wander chance clamps at 0.01.
        assert_eq!(reward_for(1, 0.0), 70);
    }

    #[test]
    fn kill_credit_pays_and_removes() {
        let mut c = character();
        c.quests.push(SideQuest {
            target: "Skeleton".into(),
            kind: QuestKind::Kill,
            goal: 1,
            progress: 0,
            reward: 40,
        });
        c.quests.push(SideQuest {
            target: "Goblin".into(),
            kind: QuestKind::Collect,
            goal: 1,
            progress: 0,
            reward: 30,
        });
        let done = credit_kill(&mut c, "Skeleton");
        assert_eq!(done.len(), 1);
        assert_eq!(c.gold, 40);
        assert_eq!(c.quests.len(), 1);
        assert_eq!(c.stats.quests_completed, 1);
        // Unrelated kills change nothing.
        assert!(credit_kill(&mut c, "Skeleton").is_empty());
    }
}
