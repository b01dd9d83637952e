use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_MIN_PARENT_AGE_YEARS: i32 = 10;
pub const DEFAULT_ADVISORY_PARENT_AGE_YEARS: i32 = 13;

/// How the cached `children` lists are reconciled with `parentId` pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BacklinkRepair {
    /// Only append missing ids; stale ids are kept.
    Additive,
    /// Rebuild `children` from `parentId`, keeping the existing order of surviving ids.
    #[default]
    Authoritative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub backlink_repair: BacklinkRepair,
    /// Blocking floor for a parent's age at the child's birth.
    pub min_parent_age_years: i32,
    /// Parents younger than this at the child's birth produce a warning.
    pub advisory_parent_age_years: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backlink_repair: BacklinkRepair::default(),
            min_parent_age_years: DEFAULT_MIN_PARENT_AGE_YEARS,
            advisory_parent_age_years: DEFAULT_ADVISORY_PARENT_AGE_YEARS,
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
