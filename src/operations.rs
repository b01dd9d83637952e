//! Structural edits of the member list.
//!
//! Every function here takes the current members by reference and returns a fresh list;
//! the input is never modified, so a rejected edit has no side effects. A successful result
//! has repaired backlinks and fresh generations, and is rejected if the edit introduced any
//! invariant violation.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Serialize;

use crate::algorithms::{recalculate_generations, repair_backlinks, would_create_cycle};
use crate::config::BacklinkRepair;
use crate::error::{LibError, Result};
use crate::invariants::ensure_no_new_violations;
use crate::marriages::detect_marriage_index;
use crate::models::{Person, PersonDraft, PersonId};

/// How an edit reshapes the tree, decided by whether the person is a root before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScenario {
    /// Keeps a parent; may move to a different one.
    Ordinary,
    /// A root is placed under a new parent, which becomes the root in its place.
    RootSwap,
    /// A root stays a root and optionally relinks its children.
    RootRelink,
    /// A child is detached and becomes a root.
    Promotion,
}

impl EditScenario {
    pub fn classify(existing: &Person, draft: &PersonDraft) -> Self {
        match (existing.is_root(), draft.parent_id.is_none()) {
            (false, false) => EditScenario::Ordinary,
            (true, false) => EditScenario::RootSwap,
            (true, true) => EditScenario::RootRelink,
            (false, true) => EditScenario::Promotion,
        }
    }
}

pub fn add_person(
    members: &[Person],
    person_id: PersonId,
    draft: &PersonDraft,
    repair: BacklinkRepair,
) -> Result<Vec<Person>> {
    let mut work = Members::new(members);
    if work.contains(person_id) {
        return Err(LibError::invalid(
            "Member ID already exists in tree",
            anyhow!("duplicate person id {}", person_id),
        ));
    }
    if let Some(parent_id) = draft.parent_id {
        work.require(parent_id, "Selected parent does not exist")?;
    }

    let mut person = Person::from_draft(person_id, draft);
    person.parent_id = None;
    work.push(person);

    match draft.parent_id {
        Some(parent_id) => {
            let slot = work.marriage_slot(
                parent_id,
                draft.selected_marriage_for_child,
                draft.date_of_birth,
            );
            work.attach(person_id, parent_id, slot);
        }
        None => {
            if let Some(targets) = &draft.children_to_link {
                work.link_children(person_id, targets, false)?;
            }
        }
    }

    finalize(members, work, repair)
}

pub fn edit_person(
    members: &[Person],
    person_id: PersonId,
    draft: &PersonDraft,
    repair: BacklinkRepair,
) -> Result<Vec<Person>> {
    let mut work = Members::new(members);
    let existing = work
        .require(person_id, "Member not found")?
        .clone();

    if let Some(parent_id) = draft.parent_id {
        work.require(parent_id, "Selected parent does not exist")?;
        if existing.parent_id != Some(parent_id) && would_create_cycle(members, person_id, parent_id)
        {
            return Err(LibError::cycle(anyhow!(
                "{} cannot take {} as parent: it is their own descendant",
                person_id,
                parent_id
            )));
        }
    }

    if let Some(person) = work.get_mut(person_id) {
        person.apply_draft(draft);
    }

    match (EditScenario::classify(&existing, draft), draft.parent_id) {
        (EditScenario::Ordinary, Some(parent_id)) => {
            if existing.parent_id != Some(parent_id) {
                let slot = work.marriage_slot(
                    parent_id,
                    draft.selected_marriage_for_child,
                    draft.date_of_birth,
                );
                work.detach(person_id);
                work.attach(person_id, parent_id, slot);
            } else if draft.selected_marriage_for_child.is_some() {
                let slot = work.marriage_slot(
                    parent_id,
                    draft.selected_marriage_for_child,
                    draft.date_of_birth,
                );
                work.reassign_marriage(person_id, parent_id, slot);
            }
        }
        (EditScenario::RootSwap, Some(new_root)) => {
            let moved: Vec<PersonId> = unique(&draft.children_to_move)
                .into_iter()
                .filter(|child| *child != new_root)
                .filter(|child| {
                    work.get(*child)
                        .is_some_and(|child| child.parent_id == Some(person_id))
                })
                .collect();

            work.detach(new_root);
            let slot = work.marriage_slot(
                new_root,
                draft.selected_marriage_for_child,
                draft.date_of_birth,
            );
            work.attach(person_id, new_root, slot);
            for child in moved {
                work.detach(child);
                work.attach(child, new_root, None);
            }
        }
        (EditScenario::RootRelink, _) => {
            if let Some(targets) = &draft.children_to_link {
                work.link_children(person_id, targets, true)?;
            }
        }
        (EditScenario::Promotion, _) => {
            work.detach(person_id);
            if let Some(targets) = &draft.children_to_link {
                work.link_children(person_id, targets, false)?;
            }
        }
        (EditScenario::Ordinary | EditScenario::RootSwap, None) => {}
    }

    finalize(members, work, repair)
}

/// Removes a member. Its children become roots and every reference to it is dropped.
pub fn delete_person(
    members: &[Person],
    person_id: PersonId,
    repair: BacklinkRepair,
) -> Result<Vec<Person>> {
    if !members.iter().any(|person| person.id == person_id) {
        return Err(LibError::not_found(
            "Member not found",
            anyhow!("person {} not in tree", person_id),
        ));
    }

    let remaining: Vec<Person> = members
        .iter()
        .filter(|person| person.id != person_id)
        .cloned()
        .map(|mut person| {
            if person.parent_id == Some(person_id) {
                person.parent_id = None;
            }
            person.children.retain(|child| *child != person_id);
            for marriage in &mut person.marriages {
                marriage.children.retain(|child| *child != person_id);
            }
            person
        })
        .collect();

    finalize(members, Members::new(&remaining), repair)
}

fn finalize(original: &[Person], work: Members, repair: BacklinkRepair) -> Result<Vec<Person>> {
    let repaired = repair_backlinks(&work.into_vec(), repair);
    let members = recalculate_generations(&repaired.members);
    ensure_no_new_violations(original, &members)?;
    Ok(members)
}

fn unique(ids: &[PersonId]) -> Vec<PersonId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Working copy of the member list with an id index.
struct Members {
    list: Vec<Person>,
    positions: HashMap<PersonId, usize>,
}

impl Members {
    fn new(members: &[Person]) -> Self {
        let list = members.to_vec();
        let positions = list
            .iter()
            .enumerate()
            .map(|(idx, person)| (person.id, idx))
            .collect();
        Self { list, positions }
    }

    fn contains(&self, id: PersonId) -> bool {
        self.positions.contains_key(&id)
    }

    fn get(&self, id: PersonId) -> Option<&Person> {
        self.positions.get(&id).map(|idx| &self.list[*idx])
    }

    fn get_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.positions.get(&id).map(|idx| &mut self.list[*idx])
    }

    fn require(&self, id: PersonId, public: &'static str) -> Result<&Person> {
        self.get(id)
            .ok_or_else(|| LibError::not_found(public, anyhow!("person {} not in tree", id)))
    }

    fn push(&mut self, person: Person) {
        self.positions.insert(person.id, self.list.len());
        self.list.push(person);
    }

    /// Marriage of `parent_id` a new child is attributed to. Only parents with several
    /// marriages get an explicit slot; an out-of-range selection falls back to birth-date
    /// detection.
    fn marriage_slot(
        &self,
        parent_id: PersonId,
        selected: Option<usize>,
        date_of_birth: Option<NaiveDate>,
    ) -> Option<usize> {
        let parent = self.get(parent_id)?;
        if parent.marriages.len() < 2 {
            return None;
        }
        Some(
            selected
                .filter(|idx| *idx < parent.marriages.len())
                .unwrap_or_else(|| detect_marriage_index(&parent.marriages, date_of_birth)),
        )
    }

    /// Removes `child` from its current parent's lists and makes it a root.
    fn detach(&mut self, child: PersonId) {
        let Some(parent_id) = self.get(child).and_then(|person| person.parent_id) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent_id) {
            parent.children.retain(|id| *id != child);
            for marriage in &mut parent.marriages {
                marriage.children.retain(|id| *id != child);
            }
        }
        if let Some(person) = self.get_mut(child) {
            person.parent_id = None;
        }
    }

    fn attach(&mut self, child: PersonId, parent_id: PersonId, marriage: Option<usize>) {
        if let Some(person) = self.get_mut(child) {
            person.parent_id = Some(parent_id);
        }
        if let Some(parent) = self.get_mut(parent_id) {
            if !parent.children.contains(&child) {
                parent.children.push(child);
            }
            if let Some(marriage) = marriage.and_then(|idx| parent.marriages.get_mut(idx)) {
                if !marriage.children.contains(&child) {
                    marriage.children.push(child);
                }
            }
        }
    }

    fn reassign_marriage(&mut self, child: PersonId, parent_id: PersonId, marriage: Option<usize>) {
        let Some(slot) = marriage else {
            return;
        };
        if let Some(parent) = self.get_mut(parent_id) {
            for marriage in &mut parent.marriages {
                marriage.children.retain(|id| *id != child);
            }
            if let Some(marriage) = parent.marriages.get_mut(slot) {
                marriage.children.push(child);
            }
        }
    }

    /// Makes `targets` exactly the children of `subject`. Children previously attached but
    /// missing from `targets` become roots. With `expand_siblings`, every sibling of a newly
    /// linked child (by its current parent) is linked along with it.
    fn link_children(
        &mut self,
        subject: PersonId,
        targets: &[PersonId],
        expand_siblings: bool,
    ) -> Result<()> {
        let mut linked = unique(targets);
        linked.retain(|id| *id != subject);
        for child in &linked {
            self.require(*child, "Selected child does not exist")?;
        }

        if expand_siblings {
            let mut expanded = linked.clone();
            for child in &linked {
                let Some(original_parent) = self.get(*child).and_then(|person| person.parent_id)
                else {
                    continue;
                };
                if original_parent == subject {
                    continue;
                }
                for sibling in &self.list {
                    if sibling.parent_id == Some(original_parent)
                        && sibling.id != subject
                        && !expanded.contains(&sibling.id)
                    {
                        expanded.push(sibling.id);
                    }
                }
            }
            linked = expanded;
        }

        for child in &linked {
            if would_create_cycle(&self.list, *child, subject) {
                return Err(LibError::cycle(anyhow!(
                    "{} cannot become a child of its descendant {}",
                    child,
                    subject
                )));
            }
        }

        let keep: HashSet<PersonId> = linked.iter().copied().collect();
        let previous: Vec<PersonId> = self
            .list
            .iter()
            .filter(|person| person.parent_id == Some(subject) && !keep.contains(&person.id))
            .map(|person| person.id)
            .collect();
        for child in previous {
            self.detach(child);
        }

        for child in linked {
            if self.get(child).and_then(|person| person.parent_id) != Some(subject) {
                self.detach(child);
                self.attach(child, subject, None);
            }
        }
        Ok(())
    }

    fn into_vec(self) -> Vec<Person> {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Marriage;

    const REPAIR: BacklinkRepair = BacklinkRepair::Authoritative;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn id(n: u128) -> PersonId {
        PersonId::Uuid(Uuid::from_u128(n))
    }

    fn draft(name: &str, parent: Option<u128>) -> PersonDraft {
        let mut draft = PersonDraft::new(name);
        draft.parent_id = parent.map(id);
        draft
    }

    fn find(members: &[Person], n: u128) -> &Person {
        members
            .iter()
            .find(|p| p.id == id(n))
            .expect("member should exist")
    }

    fn add(members: &[Person], n: u128, name: &str, parent: Option<u128>) -> Vec<Person> {
        add_person(members, id(n), &draft(name, parent), REPAIR).expect("add should succeed")
    }

    /// Dorayya(1) with children X(2), Y(3); separate root NewRoot(4).
    fn dorayya_family() -> Vec<Person> {
        let members = add(&[], 1, "Dorayya", None);
        let members = add(&members, 2, "X", Some(1));
        let members = add(&members, 3, "Y", Some(1));
        add(&members, 4, "NewRoot", None)
    }

    #[test]
    fn add_root_member() {
        let members = add(&[], 1, "Alice", None);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].generation, 0);
        assert!(members[0].children.is_empty());
    }

    #[test]
    fn add_child_updates_parent() {
        let members = add(&[], 1, "Alice", None);
        let members = add(&members, 2, "Bob", Some(1));
        assert_eq!(find(&members, 2).generation, 1);
        assert_eq!(find(&members, 1).children, vec![id(2)]);
    }

    #[test]
    fn add_rejects_unknown_parent_and_duplicate_id() {
        let members = add(&[], 1, "Alice", None);
        let err = add_person(&members, id(2), &draft("Bob", Some(9)), REPAIR)
            .expect_err("unknown parent should fail");
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = add_person(&members, id(1), &draft("Again", None), REPAIR)
            .expect_err("duplicate id should fail");
        assert_eq!(err.public, "Member ID already exists in tree");
    }

    #[test]
    fn add_child_lands_in_selected_or_detected_marriage() {
        let mut parent = draft("Omar", None);
        let mut first = Marriage::new("Layla");
        first.date_of_marriage = Some(date(1990, 1, 1));
        let mut second = Marriage::new("Mona");
        second.date_of_marriage = Some(date(2000, 1, 1));
        parent.marriages = vec![first, second];
        let members = add_person(&[], id(1), &parent, REPAIR).expect("add should succeed");

        let mut chosen = draft("Sami", Some(1));
        chosen.selected_marriage_for_child = Some(0);
        chosen.date_of_birth = Some(date(2005, 1, 1));
        let members = add_person(&members, id(2), &chosen, REPAIR).expect("add should succeed");

        let mut detected = draft("Rami", Some(1));
        detected.date_of_birth = Some(date(2003, 1, 1));
        let members = add_person(&members, id(3), &detected, REPAIR).expect("add should succeed");

        let omar = find(&members, 1);
        assert_eq!(omar.marriages[0].children, vec![id(2)]);
        assert_eq!(omar.marriages[1].children, vec![id(3)]);
        assert_eq!(omar.children, vec![id(2), id(3)]);
    }

    #[test]
    fn ordinary_edit_moves_between_parents() {
        let members = add(&[], 1, "Alice", None);
        let members = add(&members, 2, "Bob", Some(1));
        let members = add(&members, 3, "Carol", Some(2));
        let members = add(&members, 4, "Dan", Some(1));

        let members = edit_person(&members, id(3), &draft("Carol", Some(4)), REPAIR)
            .expect("edit should succeed");
        assert_eq!(find(&members, 3).parent_id, Some(id(4)));
        assert!(find(&members, 2).children.is_empty());
        assert_eq!(find(&members, 4).children, vec![id(3)]);
        assert_eq!(find(&members, 3).generation, 2);
    }

    #[test]
    fn ordinary_edit_keeps_own_children() {
        let members = add(&[], 1, "Alice", None);
        let members = add(&members, 2, "Bob", Some(1));
        let members = add(&members, 3, "Carol", Some(2));
        let members = edit_person(&members, id(2), &draft("Robert", Some(1)), REPAIR)
            .expect("edit should succeed");
        let bob = find(&members, 2);
        assert_eq!(bob.full_name, "Robert");
        assert_eq!(bob.children, vec![id(3)]);
    }

    #[test]
    fn edit_rejects_cycle_without_side_effects() {
        let members = add(&[], 1, "Alice", None);
        let members = add(&members, 2, "Bob", Some(1));
        let members = add(&members, 3, "Carol", Some(2));
        let before = members.clone();

        let err = edit_person(&members, id(1), &draft("Alice", Some(3)), REPAIR)
            .expect_err("cycle should be rejected");
        assert_eq!(err.kind, ErrorKind::Integrity);
        assert_eq!(err.code, "family_cycle");
        assert_eq!(members, before);
        assert_eq!(find(&members, 1).parent_id, None);
    }

    #[test]
    fn root_swap_promotes_new_parent() {
        let members = dorayya_family();
        let mut swap = draft("Dorayya", Some(4));
        swap.children_to_move = vec![id(2)];
        let members = edit_person(&members, id(1), &swap, REPAIR).expect("swap should succeed");

        let new_root = find(&members, 4);
        assert_eq!(new_root.parent_id, None);
        assert_eq!(new_root.generation, 0);
        assert_eq!(new_root.children, vec![id(1), id(2)]);

        let dorayya = find(&members, 1);
        assert_eq!(dorayya.parent_id, Some(id(4)));
        assert_eq!(dorayya.generation, 1);
        assert_eq!(dorayya.children, vec![id(3)]);

        assert_eq!(find(&members, 2).generation, 1);
        assert_eq!(find(&members, 3).generation, 2);
    }

    #[test]
    fn root_swap_detaches_new_root_from_its_parent() {
        let members = dorayya_family();
        let members = add(&members, 5, "Elder", None);
        let members = edit_person(&members, id(4), &draft("NewRoot", Some(5)), REPAIR)
            .expect("root swap of NewRoot under Elder");
        // Elder is now root with NewRoot beneath; make Dorayya a child of NewRoot.
        let members = edit_person(&members, id(1), &draft("Dorayya", Some(4)), REPAIR)
            .expect("swap should succeed");

        assert_eq!(find(&members, 4).parent_id, None);
        assert!(find(&members, 5).children.is_empty());
        assert_eq!(find(&members, 1).children, vec![id(2), id(3)]);
        assert_eq!(find(&members, 3).generation, 2);
    }

    #[test]
    fn root_relink_pulls_sibling_groups_and_releases_dropped_children() {
        // Root A(1) with child K(2); root B(3) with children S1(4), S2(5).
        let members = add(&[], 1, "A", None);
        let members = add(&members, 2, "K", Some(1));
        let members = add(&members, 3, "B", None);
        let members = add(&members, 4, "S1", Some(3));
        let members = add(&members, 5, "S2", Some(3));

        let mut relink = draft("A", None);
        relink.children_to_link = Some(vec![id(4)]);
        let members = edit_person(&members, id(1), &relink, REPAIR).expect("relink");

        assert_eq!(find(&members, 1).children, vec![id(4), id(5)]);
        assert_eq!(find(&members, 2).parent_id, None);
        assert_eq!(find(&members, 2).generation, 0);
        assert!(find(&members, 3).children.is_empty());
        assert_eq!(find(&members, 5).generation, 1);
    }

    #[test]
    fn promotion_can_adopt_a_former_ancestor() {
        let members = add(&[], 1, "A", None);
        let members = add(&members, 2, "K", Some(1));
        let members = add(&members, 3, "G", Some(2));
        let mut promote = draft("G", None);
        promote.children_to_link = Some(vec![id(1)]);
        let members = edit_person(&members, id(3), &promote, REPAIR).expect("promotion");

        assert_eq!(find(&members, 3).generation, 0);
        assert_eq!(find(&members, 1).parent_id, Some(id(3)));
        assert_eq!(find(&members, 2).generation, 2);
        assert!(find(&members, 2).children.is_empty());
    }

    #[test]
    fn linking_self_as_child_is_ignored() {
        let members = add(&[], 1, "A", None);
        let mut relink = draft("A", None);
        relink.children_to_link = Some(vec![id(1)]);
        let members = edit_person(&members, id(1), &relink, REPAIR).expect("relink");
        assert_eq!(find(&members, 1).parent_id, None);
        assert!(find(&members, 1).children.is_empty());
    }

    #[test]
    fn promotion_links_children_without_sibling_expansion() {
        let members = add(&[], 1, "A", None);
        let members = add(&members, 2, "P", Some(1));
        let members = add(&members, 3, "B", None);
        let members = add(&members, 4, "S1", Some(3));
        let members = add(&members, 5, "S2", Some(3));

        let mut promote = draft("P", None);
        promote.children_to_link = Some(vec![id(4)]);
        let members = edit_person(&members, id(2), &promote, REPAIR).expect("promotion");

        assert_eq!(find(&members, 2).parent_id, None);
        assert!(find(&members, 1).children.is_empty());
        assert_eq!(find(&members, 2).children, vec![id(4)]);
        assert_eq!(find(&members, 3).children, vec![id(5)]);
        assert_eq!(find(&members, 4).generation, 1);
    }

    #[test]
    fn delete_orphans_children_and_clears_references() {
        let members = add(&[], 1, "Alice", None);
        let members = add(&members, 2, "Bob", Some(1));
        let members = add(&members, 3, "Carol", Some(2));
        let members = delete_person(&members, id(2), REPAIR).expect("delete");

        assert_eq!(members.len(), 2);
        assert!(find(&members, 1).children.is_empty());
        assert_eq!(find(&members, 3).parent_id, None);
        assert_eq!(find(&members, 3).generation, 0);

        let err = delete_person(&members, id(2), REPAIR).expect_err("already gone");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn accepted_reparenting_never_creates_cycles() {
        let mut members = add(&[], 1, "N1", None);
        for n in 2..=8u128 {
            members = add(&members, n, &format!("N{n}"), Some(n / 2));
        }
        for subject in 1..=8u128 {
            for parent in 1..=8u128 {
                let name = find(&members, subject).full_name.clone();
                if let Ok(next) = edit_person(&members, id(subject), &draft(&name, Some(parent)), REPAIR)
                {
                    members = next;
                    assert!(crate::algorithms::parent_cycles(&members).is_empty());
                    assert!(crate::invariants::family_invariant_violations(&members).is_empty());
                }
            }
        }
    }

    #[test]
    fn ordinary_edit_reassigns_marriage_under_same_parent() {
        let mut parent = draft("Omar", None);
        parent.marriages = vec![Marriage::new("Layla"), Marriage::new("Mona")];
        let members = add_person(&[], id(1), &parent, REPAIR).expect("add should succeed");

        let mut child = draft("Sami", Some(1));
        child.selected_marriage_for_child = Some(0);
        let members = add_person(&members, id(2), &child, REPAIR).expect("add should succeed");
        assert_eq!(find(&members, 1).marriages[0].children, vec![id(2)]);

        child.selected_marriage_for_child = Some(1);
        let members = edit_person(&members, id(2), &child, REPAIR).expect("edit should succeed");
        let omar = find(&members, 1);
        assert!(omar.marriages[0].children.is_empty());
        assert_eq!(omar.marriages[1].children, vec![id(2)]);
        assert_eq!(omar.children, vec![id(2)]);
        assert_eq!(find(&members, 2).parent_id, Some(id(1)));
    }

    #[test]
    fn edit_scenarios_hold_under_both_repair_modes() {
        for repair in [BacklinkRepair::Additive, BacklinkRepair::Authoritative] {
            let mut members = Vec::new();
            for (n, name, parent) in [
                (1, "Dorayya", None),
                (2, "X", Some(1)),
                (3, "Y", Some(1)),
                (4, "NewRoot", None),
            ] {
                members = add_person(&members, id(n), &draft(name, parent), repair)
                    .expect("add should succeed");
            }
            assert_eq!(find(&members, 1).children, vec![id(2), id(3)], "{repair:?}");

            // ordinary
            let moved = edit_person(&members, id(3), &draft("Y", Some(4)), repair)
                .expect("ordinary edit");
            assert_eq!(find(&moved, 1).children, vec![id(2)], "{repair:?}");
            assert_eq!(find(&moved, 4).children, vec![id(3)], "{repair:?}");
            assert_eq!(find(&moved, 3).generation, 1, "{repair:?}");

            // root swap
            let mut swap = draft("Dorayya", Some(4));
            swap.children_to_move = vec![id(2)];
            let swapped = edit_person(&members, id(1), &swap, repair).expect("root swap");
            assert_eq!(find(&swapped, 4).children, vec![id(1), id(2)], "{repair:?}");
            assert_eq!(find(&swapped, 1).children, vec![id(3)], "{repair:?}");
            assert_eq!(find(&swapped, 3).generation, 2, "{repair:?}");

            // root relink
            let mut relink = draft("NewRoot", None);
            relink.children_to_link = Some(vec![id(2)]);
            let relinked = edit_person(&members, id(4), &relink, repair).expect("relink");
            assert_eq!(find(&relinked, 4).children, vec![id(2), id(3)], "{repair:?}");
            assert!(find(&relinked, 1).children.is_empty(), "{repair:?}");
            assert_eq!(find(&relinked, 3).parent_id, Some(id(4)), "{repair:?}");

            // promotion
            let mut promote = draft("X", None);
            promote.children_to_link = Some(vec![id(3)]);
            let promoted = edit_person(&members, id(2), &promote, repair).expect("promotion");
            assert_eq!(find(&promoted, 2).generation, 0, "{repair:?}");
            assert_eq!(find(&promoted, 2).children, vec![id(3)], "{repair:?}");
            assert!(find(&promoted, 1).children.is_empty(), "{repair:?}");

            // cycle gate
            let err = edit_person(&members, id(1), &draft("Dorayya", Some(2)), repair)
                .expect_err("cycle should be rejected");
            assert_eq!(err.code, "family_cycle", "{repair:?}");

            // delete
            let deleted = delete_person(&members, id(1), repair).expect("delete");
            assert_eq!(deleted.len(), 3, "{repair:?}");
            assert_eq!(find(&deleted, 2).parent_id, None, "{repair:?}");
            assert_eq!(find(&deleted, 3).generation, 0, "{repair:?}");
            assert!(
                crate::invariants::family_invariant_violations(&deleted).is_empty(),
                "{repair:?}"
            );
        }
    }

    #[test]
    fn scenarios_follow_root_status_before_and_after() {
        let members = add(&[], 1, "A", None);
        let members = add(&members, 2, "B", Some(1));
        let root = find(&members, 1);
        let child = find(&members, 2);
        assert_eq!(EditScenario::classify(root, &draft("A", None)), EditScenario::RootRelink);
        assert_eq!(EditScenario::classify(root, &draft("A", Some(2))), EditScenario::RootSwap);
        assert_eq!(EditScenario::classify(child, &draft("B", Some(1))), EditScenario::Ordinary);
        assert_eq!(EditScenario::classify(child, &draft("B", None)), EditScenario::Promotion);
    }
}
