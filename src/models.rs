use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Member id. New members get a UUID; documents written by earlier clients carry
/// millisecond-timestamp integers, which are kept as they are so the document round-trips.
/// An integer written as a string reads as the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum PersonId {
    Legacy(u64),
    Uuid(Uuid),
}

impl PersonId {
    pub fn new() -> Self {
        Self::Uuid(Uuid::new_v4())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<u64>() {
            return Ok(Self::Legacy(value));
        }
        Uuid::from_str(s).map(Self::Uuid)
    }
}

/// Wire form of an id before it is told apart.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for PersonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(value) => Ok(Self::Legacy(value)),
            RawId::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl From<Uuid> for PersonId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<u64> for PersonId {
    fn from(value: u64) -> Self {
        Self::Legacy(value)
    }
}

/// Marriage id, with the same legacy integer form as [`PersonId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum MarriageId {
    Legacy(u64),
    Uuid(Uuid),
}

impl MarriageId {
    pub fn new() -> Self {
        Self::Uuid(Uuid::new_v4())
    }
}

impl Default for MarriageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarriageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for MarriageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<u64>() {
            return Ok(Self::Legacy(value));
        }
        Uuid::from_str(s).map(Self::Uuid)
    }
}

impl<'de> Deserialize<'de> for MarriageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(value) => Ok(Self::Legacy(value)),
            RawId::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl From<Uuid> for MarriageId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// The marriage synthesized from a member's legacy single-marriage fields shares its id.
impl From<PersonId> for MarriageId {
    fn from(value: PersonId) -> Self {
        match value {
            PersonId::Legacy(value) => Self::Legacy(value),
            PersonId::Uuid(value) => Self::Uuid(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarriageStatus {
    #[default]
    Current,
    Divorced,
    Widowed,
}

impl From<MarriageStatus> for MaritalStatus {
    fn from(value: MarriageStatus) -> Self {
        match value {
            MarriageStatus::Current => MaritalStatus::Married,
            MarriageStatus::Divorced => MaritalStatus::Divorced,
            MarriageStatus::Widowed => MaritalStatus::Widowed,
        }
    }
}

impl MaritalStatus {
    /// Status of the union a simple-mode form describes, if any.
    pub const fn marriage_status(self) -> Option<MarriageStatus> {
        match self {
            MaritalStatus::Single => None,
            MaritalStatus::Married => Some(MarriageStatus::Current),
            MaritalStatus::Divorced => Some(MarriageStatus::Divorced),
            MaritalStatus::Widowed => Some(MarriageStatus::Widowed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marriage {
    pub id: MarriageId,
    #[serde(default)]
    pub spouse_name: String,
    #[serde(default)]
    pub status: MarriageStatus,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_marriage: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub children: Vec<PersonId>,
}

impl Marriage {
    pub fn new(spouse_name: impl Into<String>) -> Self {
        Self {
            id: MarriageId::new(),
            spouse_name: spouse_name.into(),
            status: MarriageStatus::Current,
            date_of_marriage: None,
            end_date: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub gender: Gender,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_death: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_living: bool,
    #[serde(default)]
    pub is_adopted: bool,
    #[serde(default)]
    pub parent_id: Option<PersonId>,
    #[serde(default)]
    pub children: Vec<PersonId>,
    #[serde(default)]
    pub generation: u32,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    #[serde(default)]
    pub marriages: Vec<Marriage>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub spouse_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_of_marriage: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_star: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub nicknames: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<String>,
}

impl Person {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The single marriage implied by pre-`marriages` records, when the person is married.
    pub fn legacy_marriage(&self) -> Option<Marriage> {
        if self.marital_status != MaritalStatus::Married {
            return None;
        }
        Some(Marriage {
            id: MarriageId::from(self.id),
            spouse_name: self.spouse_name.clone().unwrap_or_default(),
            status: MarriageStatus::Current,
            date_of_marriage: self.date_of_marriage,
            end_date: None,
            children: self.children.clone(),
        })
    }

    /// Expands legacy single-marriage fields into `marriages`.
    pub fn normalize_marriages(&mut self) {
        if self.marriages.is_empty() {
            if let Some(marriage) = self.legacy_marriage() {
                self.marriages.push(marriage);
            }
        }
    }

    /// Recomputes `maritalStatus`, `spouseName` and `dateOfMarriage` from `marriages`.
    pub fn sync_legacy_fields(&mut self) {
        let primary = self
            .marriages
            .iter()
            .find(|marriage| marriage.status == MarriageStatus::Current)
            .or_else(|| self.marriages.first());
        match primary {
            Some(marriage) => {
                self.marital_status = marriage.status.into();
                self.spouse_name = Some(marriage.spouse_name.clone());
                self.date_of_marriage = marriage.date_of_marriage;
            }
            None => {
                self.spouse_name = None;
                self.date_of_marriage = None;
                if self.marital_status == MaritalStatus::Married {
                    self.marital_status = MaritalStatus::Single;
                }
            }
        }
    }

    /// Builds a new member from an add-form transaction. Structural fields are left for
    /// the mutator to fill in.
    pub fn from_draft(id: PersonId, draft: &PersonDraft) -> Self {
        let mut person = Self {
            id,
            full_name: String::new(),
            gender: draft.gender,
            date_of_birth: None,
            date_of_death: None,
            is_living: true,
            is_adopted: false,
            parent_id: draft.parent_id,
            children: Vec::new(),
            generation: 0,
            marital_status: MaritalStatus::Single,
            marriages: Vec::new(),
            spouse_name: None,
            date_of_marriage: None,
            birth_star: None,
            nicknames: None,
            photo: None,
        };
        person.apply_draft(draft);
        person
    }

    /// Replaces every editable field with the draft's. `id`, `children` and `generation`
    /// are untouched; `parentId` is assigned by the mutator.
    pub fn apply_draft(&mut self, draft: &PersonDraft) {
        self.full_name = draft.full_name.trim().to_string();
        self.gender = draft.gender;
        self.date_of_birth = draft.date_of_birth;
        self.is_living = draft.is_living;
        self.date_of_death = if draft.is_living {
            None
        } else {
            draft.date_of_death
        };
        self.is_adopted = draft.is_adopted;
        self.birth_star = non_blank(draft.birth_star.as_deref());
        self.nicknames = non_blank(draft.nicknames.as_deref());
        self.photo = non_blank(draft.photo.as_deref());
        self.marital_status = draft.marital_status;

        if draft.is_advanced_marriage_mode() {
            self.marriages = draft
                .marriages
                .iter()
                .map(|marriage| Marriage {
                    spouse_name: marriage.spouse_name.trim().to_string(),
                    ..marriage.clone()
                })
                .collect();
        } else {
            self.marriages = simple_mode_marriages(&self.marriages, draft);
        }
        self.sync_legacy_fields();
    }
}

fn simple_mode_marriages(existing: &[Marriage], draft: &PersonDraft) -> Vec<Marriage> {
    let Some(status) = draft.marital_status.marriage_status() else {
        return Vec::new();
    };
    let Some(spouse_name) = non_blank(draft.spouse_name.as_deref()) else {
        return Vec::new();
    };

    let mut marriages = existing.to_vec();
    if marriages.is_empty() {
        marriages.push(Marriage::new(spouse_name.clone()));
    }
    let primary = &mut marriages[0];
    primary.spouse_name = spouse_name;
    primary.status = status;
    primary.date_of_marriage = draft.date_of_marriage;
    marriages
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

const fn default_true() -> bool {
    true
}

/// The add/edit transaction submitted by a form. Carries the editable person fields plus
/// choices that only matter while the edit is being applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDraft {
    pub full_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, deserialize_with = "optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub date_of_death: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_living: bool,
    #[serde(default)]
    pub is_adopted: bool,
    #[serde(default)]
    pub parent_id: Option<PersonId>,
    #[serde(default)]
    pub marital_status: MaritalStatus,
    #[serde(default, deserialize_with = "optional_text")]
    pub spouse_name: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub date_of_marriage: Option<NaiveDate>,
    /// Non-empty means the form is in advanced (multi-marriage) mode.
    #[serde(default)]
    pub marriages: Vec<Marriage>,
    #[serde(default, deserialize_with = "optional_text")]
    pub birth_star: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub nicknames: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub photo: Option<String>,
    /// Index into the chosen parent's marriages.
    #[serde(default)]
    pub selected_marriage_for_child: Option<usize>,
    /// Complete target child set for a member that is (or becomes) a root.
    #[serde(default)]
    pub children_to_link: Option<Vec<PersonId>>,
    /// Children of a demoted root that follow it to the new root.
    #[serde(default)]
    pub children_to_move: Vec<PersonId>,
}

impl Default for PersonDraft {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            gender: Gender::default(),
            date_of_birth: None,
            date_of_death: None,
            is_living: true,
            is_adopted: false,
            parent_id: None,
            marital_status: MaritalStatus::Single,
            spouse_name: None,
            date_of_marriage: None,
            marriages: Vec::new(),
            birth_star: None,
            nicknames: None,
            photo: None,
            selected_marriage_for_child: None,
            children_to_link: None,
            children_to_move: Vec::new(),
        }
    }
}

impl PersonDraft {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    pub fn is_advanced_marriage_mode(&self) -> bool {
        !self.marriages.is_empty()
    }

    /// Pre-fills an edit form from an existing member.
    pub fn from_person(person: &Person) -> Self {
        Self {
            full_name: person.full_name.clone(),
            gender: person.gender,
            date_of_birth: person.date_of_birth,
            date_of_death: person.date_of_death,
            is_living: person.is_living,
            is_adopted: person.is_adopted,
            parent_id: person.parent_id,
            marital_status: person.marital_status,
            spouse_name: person.spouse_name.clone(),
            date_of_marriage: person.date_of_marriage,
            marriages: if person.marriages.len() > 1 {
                person.marriages.clone()
            } else {
                Vec::new()
            },
            birth_star: person.birth_star.clone(),
            nicknames: person.nicknames.clone(),
            photo: person.photo.clone(),
            selected_marriage_for_child: None,
            children_to_link: None,
            children_to_move: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyData {
    pub surname: String,
    #[serde(default)]
    pub members: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl FamilyData {
    pub fn empty(surname: impl Into<String>) -> Self {
        Self {
            surname: surname.into(),
            members: Vec::new(),
            theme: None,
        }
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.members.iter().find(|person| person.id == id)
    }

    pub fn normalize_marriages(&mut self) {
        for person in &mut self.members {
            person.normalize_marriages();
        }
    }

    /// Copy of the tree with legacy single-marriage fields projected from `marriages`.
    pub fn to_persisted(&self) -> FamilyData {
        let mut persisted = self.clone();
        for person in &mut persisted.members {
            person.normalize_marriages();
            person.sync_legacy_fields();
        }
        persisted
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_persisted())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FamilyInvariantViolation {
    DuplicateId {
        person_id: PersonId,
    },
    UnknownParent {
        person_id: PersonId,
        parent_id: PersonId,
    },
    CycleDetected {
        person_ids: Vec<PersonId>,
    },
    MissingBacklink {
        parent_id: PersonId,
        child_id: PersonId,
    },
    DuplicateBacklink {
        parent_id: PersonId,
        child_id: PersonId,
    },
    GenerationMismatch {
        person_id: PersonId,
        expected: u32,
        actual: u32,
    },
    MarriageChildNotInChildren {
        person_id: PersonId,
        marriage_id: MarriageId,
        child_id: PersonId,
    },
    ChildInMultipleMarriages {
        person_id: PersonId,
        child_id: PersonId,
    },
}

impl FamilyInvariantViolation {
    pub const fn error_code(&self) -> &'static str {
        match self {
            FamilyInvariantViolation::DuplicateId { .. } => "family_duplicate_id",
            FamilyInvariantViolation::UnknownParent { .. } => "family_unknown_parent",
            FamilyInvariantViolation::CycleDetected { .. } => "family_cycle",
            FamilyInvariantViolation::MissingBacklink { .. } => "family_missing_backlink",
            FamilyInvariantViolation::DuplicateBacklink { .. } => "family_duplicate_backlink",
            FamilyInvariantViolation::GenerationMismatch { .. } => "family_generation_mismatch",
            FamilyInvariantViolation::MarriageChildNotInChildren { .. } => {
                "family_marriage_child_unknown"
            }
            FamilyInvariantViolation::ChildInMultipleMarriages { .. } => {
                "family_marriage_child_duplicated"
            }
        }
    }

    pub const fn public_message(&self) -> &'static str {
        match self {
            FamilyInvariantViolation::DuplicateId { .. } => "Member IDs must be unique",
            FamilyInvariantViolation::UnknownParent { .. } => {
                "Member references a parent that does not exist"
            }
            FamilyInvariantViolation::CycleDetected { .. } => {
                "A person cannot become a descendant of themselves"
            }
            FamilyInvariantViolation::MissingBacklink { .. } => {
                "Parent is missing a child in its children list"
            }
            FamilyInvariantViolation::DuplicateBacklink { .. } => {
                "Child is listed more than once under its parent"
            }
            FamilyInvariantViolation::GenerationMismatch { .. } => {
                "Generation numbers are out of date"
            }
            FamilyInvariantViolation::MarriageChildNotInChildren { .. } => {
                "Marriage lists a child that does not belong to the person"
            }
            FamilyInvariantViolation::ChildInMultipleMarriages { .. } => {
                "Child is attributed to more than one marriage"
            }
        }
    }
}

fn optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = value.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    // Accept full timestamps by keeping only the calendar date.
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|raw| !raw.trim().is_empty()))
}
