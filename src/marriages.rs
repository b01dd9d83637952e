use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::derived::member_index;
use crate::models::{Marriage, Person, PersonId};

/// Index of the marriage a child born on `date_of_birth` most likely belongs to: the first
/// dated marriage whose `[dateOfMarriage, next dateOfMarriage)` interval contains the birth
/// date. Falls back to the first marriage.
pub fn detect_marriage_index(marriages: &[Marriage], date_of_birth: Option<NaiveDate>) -> usize {
    let Some(born) = date_of_birth else {
        return 0;
    };
    for (idx, marriage) in marriages.iter().enumerate() {
        let Some(start) = marriage.date_of_marriage else {
            continue;
        };
        let before_next = match marriages
            .get(idx + 1)
            .and_then(|next| next.date_of_marriage)
        {
            Some(next_start) => born < next_start,
            None => true,
        };
        if born >= start && before_next {
            return idx;
        }
    }
    0
}

/// Re-attributes a person's children to their marriages by birth date.
///
/// Marriages are ordered by `dateOfMarriage` with undated marriages last. A child belongs
/// to the first marriage in that order whose start it is not before (the earliest marriage
/// has no lower bound, an undated one accepts any date) and whose successor's start it
/// precedes (no successor, or an undated one, imposes no upper bound). Children without a
/// birth date are left unattributed. The returned marriages keep their original order so
/// indices into the list stay valid.
pub fn distribute_children(person: &Person, members: &[Person]) -> Vec<Marriage> {
    let mut marriages = person.marriages.clone();
    if marriages.len() < 2 {
        return marriages;
    }

    let mut order: Vec<usize> = (0..marriages.len()).collect();
    order.sort_by(|a, b| {
        compare_marriage_dates(
            marriages[*a].date_of_marriage,
            marriages[*b].date_of_marriage,
        )
    });

    let index = member_index(members);
    let mut buckets: Vec<Vec<PersonId>> = vec![Vec::new(); marriages.len()];
    for child_id in &person.children {
        let Some(born) = index.get(child_id).and_then(|child| child.date_of_birth) else {
            continue;
        };
        for (position, marriage_idx) in order.iter().enumerate() {
            let start = marriages[*marriage_idx].date_of_marriage;
            let after_start = position == 0 || start.is_none_or(|start| born >= start);
            let next_start = order
                .get(position + 1)
                .and_then(|next| marriages[*next].date_of_marriage);
            let before_next = next_start.is_none_or(|next_start| born < next_start);
            if after_start && before_next {
                buckets[*marriage_idx].push(*child_id);
                break;
            }
        }
    }

    for (marriage, children) in marriages.iter_mut().zip(buckets) {
        marriage.children = children;
    }
    marriages
}

fn compare_marriage_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
