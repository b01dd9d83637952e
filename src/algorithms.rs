use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::BacklinkRepair;
use crate::models::{Person, PersonId};

/// Parent to children adjacency built from `parentId`, in member order.
pub fn adjacency_map(members: &[Person]) -> HashMap<PersonId, Vec<PersonId>> {
    let mut adjacency: HashMap<PersonId, Vec<PersonId>> = HashMap::with_capacity(members.len());
    for person in members {
        adjacency.entry(person.id).or_default();
    }
    for person in members {
        let Some(parent_id) = person.parent_id else {
            continue;
        };
        // Best-effort behavior: skip pointers to members that no longer exist.
        if let Some(children) = adjacency.get_mut(&parent_id) {
            children.push(person.id);
        }
    }
    adjacency
}

/// Members without a parent, plus members whose parent is not in the list.
pub fn roots(members: &[Person]) -> Vec<PersonId> {
    let ids: HashSet<PersonId> = members.iter().map(|person| person.id).collect();
    members
        .iter()
        .filter(|person| match person.parent_id {
            None => true,
            Some(parent_id) => !ids.contains(&parent_id),
        })
        .map(|person| person.id)
        .collect()
}

/// Everyone below `ancestor`, excluding `ancestor` itself.
pub fn descendants(members: &[Person], ancestor: PersonId) -> HashSet<PersonId> {
    reachable_from(ancestor, &adjacency_map(members))
}

/// True when giving `subject` the parent `proposed_parent` would make `subject` its own
/// ancestor.
pub fn would_create_cycle(
    members: &[Person],
    subject: PersonId,
    proposed_parent: PersonId,
) -> bool {
    subject == proposed_parent || descendants(members, subject).contains(&proposed_parent)
}

/// Returns a copy of `members` where every root has generation 0 and every other
/// member its parent's generation plus one. Members caught in a `parentId` cycle are
/// unreachable from any root and keep their previous value.
pub fn recalculate_generations(members: &[Person]) -> Vec<Person> {
    let adjacency = adjacency_map(members);
    let mut generations: HashMap<PersonId, u32> = HashMap::with_capacity(members.len());
    let mut queue = VecDeque::new();
    for root in roots(members) {
        generations.insert(root, 0);
        queue.push_back(root);
    }

    while let Some(person_id) = queue.pop_front() {
        let generation = generations[&person_id];
        if let Some(children) = adjacency.get(&person_id) {
            for child in children {
                if !generations.contains_key(child) {
                    generations.insert(*child, generation + 1);
                    queue.push_back(*child);
                }
            }
        }
    }

    members
        .iter()
        .map(|person| {
            let mut person = person.clone();
            if let Some(generation) = generations.get(&person.id) {
                person.generation = *generation;
            }
            person
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct BacklinkRepairOutcome {
    pub members: Vec<Person>,
    pub appended: usize,
    pub pruned: usize,
}

/// Reconciles every `children` list with the `parentId` pointers aimed at its owner, then
/// trims marriage child lists so each is a subset of `children` and no child sits in two
/// marriages of the same person.
pub fn repair_backlinks(members: &[Person], mode: BacklinkRepair) -> BacklinkRepairOutcome {
    let adjacency = adjacency_map(members);
    let mut appended = 0usize;
    let mut pruned = 0usize;

    let members = members
        .iter()
        .map(|person| {
            let mut person = person.clone();
            let actual = adjacency.get(&person.id).cloned().unwrap_or_default();
            let actual_set: HashSet<PersonId> = actual.iter().copied().collect();

            let mut seen = HashSet::with_capacity(person.children.len());
            let mut children = Vec::with_capacity(person.children.len().max(actual.len()));
            for child in &person.children {
                if !seen.insert(*child) {
                    pruned += 1;
                    continue;
                }
                if mode == BacklinkRepair::Authoritative && !actual_set.contains(child) {
                    pruned += 1;
                    continue;
                }
                children.push(*child);
            }
            for child in actual {
                if seen.insert(child) {
                    appended += 1;
                    children.push(child);
                }
            }
            person.children = children;

            let owned: HashSet<PersonId> = person.children.iter().copied().collect();
            let mut attributed = HashSet::new();
            for marriage in &mut person.marriages {
                marriage
                    .children
                    .retain(|child| owned.contains(child) && attributed.insert(*child));
            }
            person
        })
        .collect();

    BacklinkRepairOutcome {
        members,
        appended,
        pruned,
    }
}

/// Groups of members whose `parentId` chains loop back on themselves.
pub fn parent_cycles(members: &[Person]) -> Vec<Vec<PersonId>> {
    let parents: HashMap<PersonId, Option<PersonId>> = members
        .iter()
        .map(|person| (person.id, person.parent_id))
        .collect();
    let mut settled: HashSet<PersonId> = HashSet::with_capacity(members.len());
    let mut cycles = Vec::new();

    for person in members {
        if settled.contains(&person.id) {
            continue;
        }
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut cursor = Some(person.id);
        while let Some(current) = cursor {
            if settled.contains(&current) {
                break;
            }
            if !on_path.insert(current) {
                let start = path
                    .iter()
                    .position(|id| *id == current)
                    .unwrap_or_default();
                cycles.push(path[start..].to_vec());
                break;
            }
            path.push(current);
            cursor = parents.get(&current).copied().flatten();
        }
        settled.extend(path);
    }

    cycles
}

fn reachable_from(
    start: PersonId,
    adjacency: &HashMap<PersonId, Vec<PersonId>>,
) -> HashSet<PersonId> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(person_id) = queue.pop_front() {
        if let Some(children) = adjacency.get(&person_id) {
            for child in children {
                if reachable.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }
    }

    reachable.remove(&start);
    reachable
}
