use std::collections::{HashMap, HashSet};

use crate::algorithms::{parent_cycles, recalculate_generations};
use crate::error::{LibError, Result};
use crate::models::{FamilyInvariantViolation, Person, PersonId};

pub fn family_invariant_violations(members: &[Person]) -> Vec<FamilyInvariantViolation> {
    let mut violations = Vec::new();

    let mut ids: HashSet<PersonId> = HashSet::with_capacity(members.len());
    for person in members {
        if !ids.insert(person.id) {
            violations.push(FamilyInvariantViolation::DuplicateId {
                person_id: person.id,
            });
        }
    }

    let children_by_owner: HashMap<PersonId, &Vec<PersonId>> = members
        .iter()
        .map(|person| (person.id, &person.children))
        .collect();
    for person in members {
        let Some(parent_id) = person.parent_id else {
            continue;
        };
        match children_by_owner.get(&parent_id) {
            None => violations.push(FamilyInvariantViolation::UnknownParent {
                person_id: person.id,
                parent_id,
            }),
            Some(children) if !children.contains(&person.id) => {
                violations.push(FamilyInvariantViolation::MissingBacklink {
                    parent_id,
                    child_id: person.id,
                })
            }
            Some(_) => {}
        }
    }

    for person in members {
        let mut seen = HashSet::with_capacity(person.children.len());
        for child in &person.children {
            if !seen.insert(*child) {
                violations.push(FamilyInvariantViolation::DuplicateBacklink {
                    parent_id: person.id,
                    child_id: *child,
                });
            }
        }

        let mut attributed = HashSet::new();
        for marriage in &person.marriages {
            for child in &marriage.children {
                if !seen.contains(child) {
                    violations.push(FamilyInvariantViolation::MarriageChildNotInChildren {
                        person_id: person.id,
                        marriage_id: marriage.id,
                        child_id: *child,
                    });
                } else if !attributed.insert(*child) {
                    violations.push(FamilyInvariantViolation::ChildInMultipleMarriages {
                        person_id: person.id,
                        child_id: *child,
                    });
                }
            }
        }
    }

    let cycles = parent_cycles(members);
    let cyclic: HashSet<PersonId> = cycles.iter().flatten().copied().collect();
    for person_ids in cycles {
        violations.push(FamilyInvariantViolation::CycleDetected { person_ids });
    }

    for (person, expected) in members.iter().zip(recalculate_generations(members)) {
        if cyclic.contains(&person.id) {
            continue;
        }
        if person.generation != expected.generation {
            violations.push(FamilyInvariantViolation::GenerationMismatch {
                person_id: person.id,
                expected: expected.generation,
                actual: person.generation,
            });
        }
    }

    violations
}

/// Fails with an integrity error carrying every violation when the tree is inconsistent.
pub fn ensure_family_invariants(members: &[Person]) -> Result<()> {
    let violations = family_invariant_violations(members);
    if let Some(first) = violations.first() {
        return Err(LibError::violations(
            first.error_code(),
            first.public_message(),
            violations,
        ));
    }

    Ok(())
}

/// Like [`ensure_family_invariants`], but tolerates violations already present in `before`
/// so that damaged data loaded from storage can still be edited.
pub fn ensure_no_new_violations(before: &[Person], after: &[Person]) -> Result<()> {
    let existing = family_invariant_violations(before);
    let introduced: Vec<FamilyInvariantViolation> = family_invariant_violations(after)
        .into_iter()
        .filter(|violation| !existing.contains(violation))
        .collect();
    if let Some(first) = introduced.first() {
        return Err(LibError::violations(
            first.error_code(),
            first.public_message(),
            introduced,
        ));
    }

    Ok(())
}
