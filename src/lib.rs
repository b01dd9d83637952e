pub mod algorithms;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod history;
pub mod invariants;
pub mod marriages;
pub mod models;
pub mod operations;
pub mod store;
pub mod validation;

pub mod prelude {
    pub use crate::algorithms::{
        adjacency_map, descendants, recalculate_generations, repair_backlinks, roots,
        would_create_cycle,
    };
    pub use crate::config::{BacklinkRepair, EngineConfig};
    pub use crate::derived::{
        age, age_on, children_by_marriage, current_spouse, marriages, total_children,
    };
    pub use crate::engine::{
        EditOutcome, FamilyOperation, FamilyOperationResult, FamilyTreeEditor, HistoryOutcome,
        RecordHistory,
    };
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::history::{History, HistoryEntry};
    pub use crate::invariants::{ensure_family_invariants, family_invariant_violations};
    pub use crate::marriages::{detect_marriage_index, distribute_children};
    pub use crate::models::{
        FamilyData, FamilyInvariantViolation, Gender, MaritalStatus, Marriage, MarriageId,
        MarriageStatus, Person, PersonDraft, PersonId,
    };
    pub use crate::operations::EditScenario;
    #[cfg(feature = "fs")]
    pub use crate::store::JsonFileStore;
    pub use crate::store::{FamilyStore, MemoryFamilyStore};
    pub use crate::validation::{AdvisoryWarning, advisory_warnings, allowed_parents, validate_draft};
}
