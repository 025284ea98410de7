//! Character reconciliation.
//!
//! The character update agent only returns the entities a chapter touched.
//! Reconciliation folds that partial state into the prior full snapshot:
//! ids present in both take the generated version, ids only in the prior
//! state are kept verbatim, and new ids are appended in generated order.
//! The resulting id set is always `prior ∪ generated`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use saga_core::memory::{Character, CharacterGroup, CharacterState};

/// Merge a generated (possibly partial) character state into `prior`.
#[must_use]
pub fn reconcile(prior: &CharacterState, generated: CharacterState) -> CharacterState {
    CharacterState {
        characters: merge_by_id(&prior.characters, generated.characters, |c: &Character| {
            c.character_id.as_str()
        }),
        character_groups: merge_by_id(
            &prior.character_groups,
            generated.character_groups,
            |g: &CharacterGroup| g.group_id.as_str(),
        ),
    }
}

/// Replace-or-keep every prior entry, then append unseen generated ones.
///
/// If the generated list repeats an id, the first occurrence wins.
fn merge_by_id<T, F>(prior: &[T], generated: Vec<T>, id: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let mut fresh: HashMap<String, T> = HashMap::with_capacity(generated.len());
    let mut order: Vec<String> = Vec::new();
    for item in generated {
        let key = id(&item).to_string();
        if let Entry::Vacant(slot) = fresh.entry(key) {
            order.push(slot.key().clone());
            slot.insert(item);
        }
    }

    let mut merged: Vec<T> = Vec::with_capacity(prior.len() + order.len());
    for old in prior {
        match fresh.remove(id(old)) {
            Some(updated) => merged.push(updated),
            None => merged.push(old.clone()),
        }
    }
    merged.extend(order.into_iter().filter_map(|key| fresh.remove(&key)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{character as build, group};

    fn character(id: &str, name: &str) -> Character {
        build(id, name, &[])
    }

    fn ids(state: &CharacterState) -> Vec<&str> {
        state.characters.iter().map(|c| c.character_id.as_str()).collect()
    }

    #[test]
    fn untouched_characters_survive() {
        let prior = CharacterState {
            characters: vec![character("c1", "萧瑾宸"), character("c2", "林小月")],
            character_groups: vec![group("g1", &["c1", "c2"])],
        };
        let generated = CharacterState {
            characters: vec![character("c2", "林小月（受伤）")],
            character_groups: vec![],
        };

        let merged = reconcile(&prior, generated);
        assert_eq!(ids(&merged), vec!["c1", "c2"]);
        assert_eq!(merged.characters[0], prior.characters[0]);
        assert_eq!(merged.characters[1].identity.current_name, "林小月（受伤）");
        assert_eq!(merged.character_groups, prior.character_groups);
    }

    #[test]
    fn new_ids_are_appended_in_generated_order() {
        let prior = CharacterState {
            characters: vec![character("c1", "A")],
            character_groups: vec![],
        };
        let generated = CharacterState {
            characters: vec![character("c9", "Z"), character("c1", "A2"), character("c5", "E")],
            character_groups: vec![group("g2", &["c9"])],
        };

        let merged = reconcile(&prior, generated);
        assert_eq!(ids(&merged), vec!["c1", "c9", "c5"]);
        assert_eq!(merged.characters[0].identity.current_name, "A2");
        assert_eq!(merged.character_groups.len(), 1);
    }

    #[test]
    fn empty_generation_keeps_prior() {
        let prior = CharacterState {
            characters: vec![character("c1", "A")],
            character_groups: vec![group("g1", &["c1"])],
        };
        assert_eq!(reconcile(&prior, CharacterState::default()), prior);
    }

    #[test]
    fn duplicate_generated_id_keeps_first_occurrence() {
        let generated = CharacterState {
            characters: vec![character("c3", "first"), character("c3", "second")],
            character_groups: vec![],
        };
        let merged = reconcile(&CharacterState::default(), generated);
        assert_eq!(merged.characters.len(), 1);
        assert_eq!(merged.characters[0].identity.current_name, "first");

        let prior = CharacterState {
            characters: vec![character("c1", "old")],
            character_groups: vec![],
        };
        let generated = CharacterState {
            characters: vec![character("c1", "first"), character("c1", "second")],
            character_groups: vec![group("g1", &["c1"]), group("g1", &[])],
        };
        let merged = reconcile(&prior, generated);
        assert_eq!(ids(&merged), vec!["c1"]);
        assert_eq!(merged.characters[0].identity.current_name, "first");
        assert_eq!(merged.character_groups.len(), 1);
        assert_eq!(merged.character_groups[0].members, vec!["c1"]);
    }
}
