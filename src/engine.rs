//! The editing session over one family tree.
//!
//! Every mutation runs validate, mutate, record, persist in that order against an immutable
//! snapshot. Callers hold `&mut FamilyTreeEditor`, so two mutations never interleave.

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::{recalculate_generations, repair_backlinks};
use crate::config::EngineConfig;
use crate::derived;
use crate::error::{ErrorKind, LibError, Result};
use crate::history::History;
use crate::invariants::family_invariant_violations;
use crate::marriages::{detect_marriage_index, distribute_children};
use crate::models::{FamilyData, Marriage, Person, PersonDraft, PersonId};
use crate::operations::{self, EditScenario};
use crate::store::FamilyStore;
use crate::validation::{AdvisoryWarning, advisory_warnings, allowed_parents, validate_draft};

/// Whether a commit pushes the prior state onto the undo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordHistory {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub person_id: PersonId,
    pub warnings: Vec<AdvisoryWarning>,
}

/// Result of an undo or redo. An empty stack is a notice, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HistoryOutcome {
    Restored { label: String },
    NothingToUndo,
    NothingToRedo,
}

/// Serializable editor actions, for callers that drive the editor from messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum FamilyOperation {
    Add {
        #[serde(default)]
        person_id: Option<PersonId>,
        draft: PersonDraft,
    },
    Edit {
        person_id: PersonId,
        draft: PersonDraft,
    },
    Delete {
        person_id: PersonId,
    },
    Undo,
    Redo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FamilyOperationResult {
    Edited { outcome: EditOutcome },
    Deleted { person_id: PersonId },
    History { outcome: HistoryOutcome },
}

struct Checkpoint {
    data: FamilyData,
    history: History,
}

pub struct FamilyTreeEditor<S: FamilyStore> {
    data: FamilyData,
    history: History,
    store: S,
    config: EngineConfig,
    is_admin: bool,
}

impl<S: FamilyStore> FamilyTreeEditor<S> {
    /// Opens the tree held by `store`. A failed load starts an empty tree named `surname`.
    pub async fn load(
        store: S,
        surname: impl Into<String>,
        config: EngineConfig,
        is_admin: bool,
    ) -> Self {
        let data = match store.load().await {
            Ok(data) => prepare_loaded(data, &config),
            Err(err) if err.kind == ErrorKind::NotFound => {
                tracing::info!(error = %err.source, "no saved family tree, starting empty");
                FamilyData::empty(surname)
            }
            Err(err) => {
                tracing::error!(kind = ?err.kind, error = %err.source, "family tree load failed, starting empty");
                FamilyData::empty(surname)
            }
        };
        tracing::info!(
            surname = %data.surname,
            members = data.members.len(),
            "family tree loaded"
        );

        Self {
            data,
            history: History::new(config.history_capacity),
            store,
            config,
            is_admin,
        }
    }

    pub fn data(&self) -> &FamilyData {
        &self.data
    }

    pub fn members(&self) -> &[Person] {
        &self.data.members
    }

    pub fn person(&self, person_id: PersonId) -> Option<&Person> {
        self.data.person(person_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_labels(&self) -> Vec<&str> {
        self.history.labels()
    }

    /// Blocking checks for a draft. `editing` is the member being edited, `None` for an add.
    pub fn validate(&self, draft: &PersonDraft, editing: Option<PersonId>) -> Result<()> {
        validate_draft(draft, &self.data.members, editing, &self.config, today())
    }

    pub fn warnings_for(
        &self,
        draft: &PersonDraft,
        editing: Option<PersonId>,
    ) -> Vec<AdvisoryWarning> {
        advisory_warnings(draft, &self.data.members, editing, &self.config)
    }

    pub fn allowed_parents(
        &self,
        subject: Option<PersonId>,
        date_of_birth: Option<NaiveDate>,
        is_adopted: bool,
    ) -> Vec<&Person> {
        allowed_parents(
            &self.data.members,
            subject,
            date_of_birth,
            is_adopted,
            &self.config,
        )
    }

    /// Marriages to show when opening the edit form, with children re-attributed by birth
    /// date when there is more than one.
    pub fn edit_form_marriages(&self, person_id: PersonId) -> Result<Vec<Marriage>> {
        let person = self.require(person_id)?;
        let mut expanded = person.clone();
        expanded.marriages = derived::marriages(person).into_owned();
        Ok(distribute_children(&expanded, &self.data.members))
    }

    /// A draft pre-filled from an existing member. When the member's parent has several
    /// marriages, the marriage the member currently sits in is pre-selected.
    pub fn edit_form(&self, person_id: PersonId) -> Result<PersonDraft> {
        let person = self.require(person_id)?;
        let mut draft = PersonDraft::from_person(person);
        let marriages = self.edit_form_marriages(person_id)?;
        if marriages.len() > 1 {
            draft.marriages = marriages;
        }

        if let Some(parent) = person.parent_id.and_then(|id| self.data.person(id)) {
            let parent_marriages = derived::marriages(parent);
            if parent_marriages.len() > 1 {
                let slot = parent_marriages
                    .iter()
                    .position(|marriage| marriage.children.contains(&person_id))
                    .unwrap_or_else(|| detect_marriage_index(&parent_marriages, person.date_of_birth));
                draft.selected_marriage_for_child = Some(slot);
            }
        }
        Ok(draft)
    }

    pub async fn execute(&mut self, operation: FamilyOperation) -> Result<FamilyOperationResult> {
        match operation {
            FamilyOperation::Add { person_id, draft } => {
                let outcome = match person_id {
                    Some(person_id) => self.add_person_with_id(person_id, draft).await?,
                    None => self.add_person(draft).await?,
                };
                Ok(FamilyOperationResult::Edited { outcome })
            }
            FamilyOperation::Edit { person_id, draft } => {
                let outcome = self.edit_person(person_id, draft).await?;
                Ok(FamilyOperationResult::Edited { outcome })
            }
            FamilyOperation::Delete { person_id } => {
                self.delete_person(person_id).await?;
                Ok(FamilyOperationResult::Deleted { person_id })
            }
            FamilyOperation::Undo => {
                let outcome = self.undo().await?;
                Ok(FamilyOperationResult::History { outcome })
            }
            FamilyOperation::Redo => {
                let outcome = self.redo().await?;
                Ok(FamilyOperationResult::History { outcome })
            }
        }
    }

    pub async fn add_person(&mut self, draft: PersonDraft) -> Result<EditOutcome> {
        self.add_person_with_id(PersonId::new(), draft).await
    }

    /// Adds a member under a caller-chosen id, which must not already be in the tree.
    pub async fn add_person_with_id(
        &mut self,
        person_id: PersonId,
        draft: PersonDraft,
    ) -> Result<EditOutcome> {
        self.ensure_admin()?;
        self.validate(&draft, None)?;
        let warnings = self.warnings_for(&draft, None);

        let members = operations::add_person(
            &self.data.members,
            person_id,
            &draft,
            self.config.backlink_repair,
        )
        .inspect_err(|err| log_rejected("add", person_id, err))?;
        let label = format!("Added {}", draft.full_name.trim());
        self.commit_members(members, label, RecordHistory::Yes)
            .await?;

        tracing::info!(person_id = %person_id, parent_id = ?draft.parent_id, "member added");
        Ok(EditOutcome {
            person_id,
            warnings,
        })
    }

    pub async fn edit_person(
        &mut self,
        person_id: PersonId,
        draft: PersonDraft,
    ) -> Result<EditOutcome> {
        self.ensure_admin()?;
        let existing = self.require(person_id)?;
        let previous_parent = existing.parent_id;
        let scenario = EditScenario::classify(existing, &draft);
        self.validate(&draft, Some(person_id))?;
        let warnings = self.warnings_for(&draft, Some(person_id));

        let members = operations::edit_person(
            &self.data.members,
            person_id,
            &draft,
            self.config.backlink_repair,
        )
        .inspect_err(|err| log_rejected("edit", person_id, err))?;
        let label = format!("Edited {}", draft.full_name.trim());
        self.commit_members(members, label, RecordHistory::Yes)
            .await?;

        tracing::info!(
            person_id = %person_id,
            scenario = ?scenario,
            from_parent = ?previous_parent,
            to_parent = ?draft.parent_id,
            "member edited"
        );
        Ok(EditOutcome {
            person_id,
            warnings,
        })
    }

    pub async fn delete_person(&mut self, person_id: PersonId) -> Result<()> {
        self.ensure_admin()?;
        let name = self.require(person_id)?.full_name.clone();

        let members =
            operations::delete_person(&self.data.members, person_id, self.config.backlink_repair)
                .inspect_err(|err| log_rejected("delete", person_id, err))?;
        self.commit_members(members, format!("Deleted {name}"), RecordHistory::Yes)
            .await?;

        tracing::info!(person_id = %person_id, "member deleted");
        Ok(())
    }

    pub async fn undo(&mut self) -> Result<HistoryOutcome> {
        self.ensure_admin()?;
        let checkpoint = self.checkpoint();
        let Some(entry) = self.history.undo(&self.data) else {
            tracing::info!("nothing to undo");
            return Ok(HistoryOutcome::NothingToUndo);
        };
        self.commit(checkpoint, entry.snapshot, &entry.label, RecordHistory::No)
            .await?;

        tracing::info!(label = %entry.label, "undo applied");
        Ok(HistoryOutcome::Restored { label: entry.label })
    }

    pub async fn redo(&mut self) -> Result<HistoryOutcome> {
        self.ensure_admin()?;
        let checkpoint = self.checkpoint();
        let Some(entry) = self.history.redo(&self.data) else {
            tracing::info!("nothing to redo");
            return Ok(HistoryOutcome::NothingToRedo);
        };
        self.commit(checkpoint, entry.snapshot, &entry.label, RecordHistory::No)
            .await?;

        tracing::info!(label = %entry.label, "redo applied");
        Ok(HistoryOutcome::Restored { label: entry.label })
    }

    fn ensure_admin(&self) -> Result<()> {
        if self.is_admin {
            return Ok(());
        }
        Err(LibError::forbidden(
            "Only family admins can edit the tree",
            anyhow!("mutation attempted without admin capacity"),
        ))
    }

    fn require(&self, person_id: PersonId) -> Result<&Person> {
        self.data.person(person_id).ok_or_else(|| {
            LibError::not_found(
                "Member not found",
                anyhow!("person {} not in tree", person_id),
            )
        })
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            data: self.data.clone(),
            history: self.history.clone(),
        }
    }

    async fn commit_members(
        &mut self,
        members: Vec<Person>,
        label: String,
        record: RecordHistory,
    ) -> Result<()> {
        let checkpoint = self.checkpoint();
        let next = FamilyData {
            members,
            ..self.data.clone()
        };
        self.commit(checkpoint, next, &label, record).await
    }

    /// Makes `next` current, then persists it. A failed save restores `checkpoint`.
    async fn commit(
        &mut self,
        checkpoint: Checkpoint,
        next: FamilyData,
        label: &str,
        record: RecordHistory,
    ) -> Result<()> {
        let prior = std::mem::replace(&mut self.data, next);
        if record == RecordHistory::Yes {
            self.history.record(prior, label);
        }

        if let Err(err) = self.store.save(&self.data).await {
            tracing::error!(label, kind = ?err.kind, error = %err.source, "family tree save failed, reverting");
            self.data = checkpoint.data;
            self.history = checkpoint.history;
            return Err(err);
        }
        tracing::info!(label, members = self.data.members.len(), "family tree saved");
        Ok(())
    }
}

fn log_rejected(action: &'static str, person_id: PersonId, err: &LibError) {
    tracing::warn!(action, person_id = %person_id, code = err.code, error = %err.source, "member {action} rejected");
}

/// Repairs backlinks before expanding legacy marriages, so a synthesized marriage picks up
/// every child whose `parentId` points at its owner.
fn prepare_loaded(mut data: FamilyData, config: &EngineConfig) -> FamilyData {
    let repaired = repair_backlinks(&data.members, config.backlink_repair);
    if repaired.appended > 0 || repaired.pruned > 0 {
        tracing::debug!(
            appended = repaired.appended,
            pruned = repaired.pruned,
            "repaired children backlinks on load"
        );
    }
    data.members = repaired.members;
    data.normalize_marriages();
    data.members = recalculate_generations(&data.members);

    let violations = family_invariant_violations(&data.members);
    if !violations.is_empty() {
        tracing::error!(count = violations.len(), violations = ?violations, "loaded family tree is inconsistent");
    }
    data
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
