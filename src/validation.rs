use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::algorithms::descendants;
use crate::config::EngineConfig;
use crate::derived::{marriages, years_between};
use crate::error::{LibError, Result};
use crate::models::{MaritalStatus, Person, PersonDraft, PersonId};

pub const FIELD_FULL_NAME: &str = "fullName";
pub const FIELD_PARENT: &str = "parentId";
pub const FIELD_SELECTED_MARRIAGE: &str = "selectedMarriageForChild";
pub const FIELD_DATE_OF_BIRTH: &str = "dateOfBirth";
pub const FIELD_DATE_OF_DEATH: &str = "dateOfDeath";
pub const FIELD_SPOUSE_NAME: &str = "spouseName";
pub const FIELD_DATE_OF_MARRIAGE: &str = "dateOfMarriage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvisoryWarning {
    YoungParent { parent_name: String, age_at_birth: i32 },
    BornBeforeParent { parent_name: String },
    DeathBeforeBirth,
    DuplicateName { name: String },
    GenerationMismatch { expected: u32, actual: u32 },
}

impl AdvisoryWarning {
    pub fn message(&self) -> String {
        match self {
            AdvisoryWarning::YoungParent {
                parent_name,
                age_at_birth,
            } => format!("{parent_name} would have been {age_at_birth} at this child's birth"),
            AdvisoryWarning::BornBeforeParent { parent_name } => {
                format!("Birth date is before {parent_name}'s birth date")
            }
            AdvisoryWarning::DeathBeforeBirth => "Death date is before birth date".to_string(),
            AdvisoryWarning::DuplicateName { name } => {
                format!("Another member is already named {name}")
            }
            AdvisoryWarning::GenerationMismatch { expected, actual } => {
                format!("Generation {actual} does not match the parent (expected {expected})")
            }
        }
    }
}

/// Blocking checks for an add (`editing = None`) or an edit of `editing`. On failure the
/// error carries a `{field: message}` map.
pub fn validate_draft(
    draft: &PersonDraft,
    members: &[Person],
    editing: Option<PersonId>,
    config: &EngineConfig,
    today: NaiveDate,
) -> Result<()> {
    let errors = field_errors(draft, members, editing, config, today);
    if errors.is_empty() {
        return Ok(());
    }
    Err(LibError::validation(errors))
}

pub fn field_errors(
    draft: &PersonDraft,
    members: &[Person],
    editing: Option<PersonId>,
    config: &EngineConfig,
    today: NaiveDate,
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    let mut fail = |field: &str, message: String| {
        errors.entry(field.to_string()).or_insert(message);
    };

    if draft.full_name.trim().is_empty() {
        fail(FIELD_FULL_NAME, "Full name is required".to_string());
    }

    let parent = draft
        .parent_id
        .map(|parent_id| members.iter().find(|person| person.id == parent_id));
    match parent {
        Some(None) => fail(FIELD_PARENT, "Selected parent does not exist".to_string()),
        Some(Some(parent)) if Some(parent.id) == editing => {
            fail(FIELD_PARENT, "A person cannot be their own parent".to_string())
        }
        Some(Some(parent)) => {
            let parent_marriages = marriages(parent);
            let selected = draft
                .selected_marriage_for_child
                .filter(|idx| *idx < parent_marriages.len());
            if parent_marriages.len() > 1 && selected.is_none() {
                fail(
                    FIELD_SELECTED_MARRIAGE,
                    format!("Select which of {}'s marriages this child is from", parent.full_name),
                );
            }
        }
        None => {}
    }

    if let Some(born) = draft.date_of_birth {
        if born > today {
            fail(
                FIELD_DATE_OF_BIRTH,
                "Birth date cannot be in the future".to_string(),
            );
        }
    }

    if !draft.is_living {
        if let Some(died) = draft.date_of_death {
            if draft.date_of_birth.is_some_and(|born| died <= born) {
                fail(
                    FIELD_DATE_OF_DEATH,
                    "Death date must be after birth date".to_string(),
                );
            }
            if died > today {
                fail(
                    FIELD_DATE_OF_DEATH,
                    "Death date cannot be in the future".to_string(),
                );
            }
        }
    }

    if draft.is_advanced_marriage_mode() {
        for (idx, marriage) in draft.marriages.iter().enumerate() {
            if marriage.spouse_name.trim().is_empty() {
                fail(
                    &format!("marriages.{idx}.spouseName"),
                    format!("Spouse name is required for marriage {}", idx + 1),
                );
            }
        }
    } else if draft.marital_status == MaritalStatus::Married {
        let spouse = draft.spouse_name.as_deref().map(str::trim).unwrap_or_default();
        if spouse.is_empty() {
            fail(FIELD_SPOUSE_NAME, "Spouse name is required".to_string());
        }
        if let (Some(married), Some(born)) = (draft.date_of_marriage, draft.date_of_birth) {
            if married <= born {
                fail(
                    FIELD_DATE_OF_MARRIAGE,
                    "Marriage date must be after birth date".to_string(),
                );
            }
        }
    }

    if let (Some(Some(parent)), Some(born)) = (parent, draft.date_of_birth) {
        if let Some(parent_born) = parent.date_of_birth {
            if born <= parent_born {
                fail(
                    FIELD_DATE_OF_BIRTH,
                    format!("Birth date must be after {}'s birth date", parent.full_name),
                );
            } else if years_between(parent_born, born) < config.min_parent_age_years {
                fail(
                    FIELD_DATE_OF_BIRTH,
                    format!(
                        "{} must be at least {} years old at this child's birth",
                        parent.full_name, config.min_parent_age_years
                    ),
                );
            }
        }
    }

    errors
}

/// Non-blocking observations about a draft that passed (or is about to pass) validation.
pub fn advisory_warnings(
    draft: &PersonDraft,
    members: &[Person],
    editing: Option<PersonId>,
    config: &EngineConfig,
) -> Vec<AdvisoryWarning> {
    let mut warnings = Vec::new();
    let parent = draft
        .parent_id
        .and_then(|parent_id| members.iter().find(|person| person.id == parent_id));

    if let (Some(parent), Some(born)) = (parent, draft.date_of_birth) {
        if let Some(parent_born) = parent.date_of_birth {
            let age_at_birth = years_between(parent_born, born);
            if born < parent_born {
                warnings.push(AdvisoryWarning::BornBeforeParent {
                    parent_name: parent.full_name.clone(),
                });
            } else if age_at_birth < config.advisory_parent_age_years {
                warnings.push(AdvisoryWarning::YoungParent {
                    parent_name: parent.full_name.clone(),
                    age_at_birth,
                });
            }
        }
    }

    if let (Some(born), Some(died)) = (draft.date_of_birth, draft.date_of_death) {
        if !draft.is_living && died < born {
            warnings.push(AdvisoryWarning::DeathBeforeBirth);
        }
    }

    let name = draft.full_name.trim().to_lowercase();
    if !name.is_empty()
        && members.iter().any(|person| {
            Some(person.id) != editing && person.full_name.trim().to_lowercase() == name
        })
    {
        warnings.push(AdvisoryWarning::DuplicateName {
            name: draft.full_name.trim().to_string(),
        });
    }

    let current = editing.and_then(|id| members.iter().find(|person| person.id == id));
    if let (Some(current), Some(parent)) = (current, parent) {
        let expected = parent.generation + 1;
        if current.generation != expected {
            warnings.push(AdvisoryWarning::GenerationMismatch {
                expected,
                actual: current.generation,
            });
        }
    }

    warnings
}

/// Members that may be offered as a parent for `subject` (or for a new member when
/// `subject` is `None`). The subject and its descendants are never offered. Unless the
/// subject is adopted, candidates not at least `minParentAgeYears` older are dropped.
pub fn allowed_parents<'a>(
    members: &'a [Person],
    subject: Option<PersonId>,
    date_of_birth: Option<NaiveDate>,
    is_adopted: bool,
    config: &EngineConfig,
) -> Vec<&'a Person> {
    let excluded = subject
        .map(|subject| {
            let mut excluded = descendants(members, subject);
            excluded.insert(subject);
            excluded
        })
        .unwrap_or_default();

    members
        .iter()
        .filter(|candidate| !excluded.contains(&candidate.id))
        .filter(|candidate| {
            if is_adopted {
                return true;
            }
            match (candidate.date_of_birth, date_of_birth) {
                (Some(parent_born), Some(born)) => {
                    born > parent_born
                        && years_between(parent_born, born) >= config.min_parent_age_years
                }
                _ => true,
            }
        })
        .collect()
}
