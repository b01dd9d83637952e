//! Read-only views derived from a person and the member list they live in.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Marriage, MarriageId, MarriageStatus, Person, PersonId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageChildren {
    pub marriage_id: MarriageId,
    pub spouse_name: String,
    pub status: MarriageStatus,
    pub children: Vec<ChildSummary>,
}

pub fn member_index(members: &[Person]) -> HashMap<PersonId, &Person> {
    members.iter().map(|person| (person.id, person)).collect()
}

/// The person's marriages, synthesizing the legacy single-marriage record when the
/// `marriages` list has not been populated.
pub fn marriages(person: &Person) -> Cow<'_, [Marriage]> {
    if !person.marriages.is_empty() {
        return Cow::Borrowed(person.marriages.as_slice());
    }
    match person.legacy_marriage() {
        Some(marriage) => Cow::Owned(vec![marriage]),
        None => Cow::Owned(Vec::new()),
    }
}

pub fn current_spouse(person: &Person) -> Option<Marriage> {
    marriages(person)
        .iter()
        .find(|marriage| marriage.status == MarriageStatus::Current)
        .cloned()
}

pub fn children_by_marriage(person: &Person, members: &[Person]) -> Vec<MarriageChildren> {
    let index = member_index(members);
    marriages(person)
        .iter()
        .map(|marriage| MarriageChildren {
            marriage_id: marriage.id,
            spouse_name: marriage.spouse_name.clone(),
            status: marriage.status,
            children: marriage
                .children
                .iter()
                .filter_map(|child_id| index.get(child_id))
                .map(|child| ChildSummary {
                    name: child.full_name.clone(),
                    date_of_birth: child.date_of_birth,
                })
                .collect(),
        })
        .collect()
}

/// Children attributed to any marriage plus those only present in `children`, counted once.
pub fn total_children(person: &Person) -> usize {
    let mut seen: HashSet<PersonId> = person.children.iter().copied().collect();
    for marriage in marriages(person).iter() {
        seen.extend(marriage.children.iter().copied());
    }
    seen.len()
}

/// Whole calendar years from `from` to `to`; negative when `to` precedes `from`.
pub fn years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}

/// Age at `today` for the living, at death otherwise. `None` without the needed dates.
pub fn age_on(person: &Person, today: NaiveDate) -> Option<i32> {
    let born = person.date_of_birth?;
    let anchor = if person.is_living {
        today
    } else {
        person.date_of_death?
    };
    Some(years_between(born, anchor))
}

pub fn age(person: &Person) -> Option<i32> {
    age_on(person, Utc::now().date_naive())
}
