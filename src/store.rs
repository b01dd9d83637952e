//! Persistence seam. The engine hands the whole tree to a [`FamilyStore`] after every
//! committed change and reads it back once on load.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::{LibError, Result};
use crate::models::FamilyData;

#[async_trait]
pub trait FamilyStore: Send + Sync {
    async fn load(&self) -> Result<FamilyData>;

    /// Writes the complete tree. Implementations store the persisted form, with legacy
    /// single-marriage fields projected from `marriages`.
    async fn save(&self, data: &FamilyData) -> Result<()>;
}

/// Keeps the last saved document in memory.
#[derive(Debug, Default)]
pub struct MemoryFamilyStore {
    document: Mutex<Option<String>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryFamilyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: &FamilyData) -> Result<Self> {
        let store = Self::new();
        store.replace_document(Some(data.to_json()?))?;
        Ok(store)
    }

    /// Seeds the store with a raw document, as an older client may have written it.
    pub fn with_document(raw: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// Makes every following save fail until switched back.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Raw JSON of the last successful save.
    pub fn document(&self) -> Result<Option<String>> {
        let guard = self
            .document
            .lock()
            .map_err(|_| LibError::persistence("Family store unavailable", anyhow!("poisoned lock")))?;
        Ok(guard.clone())
    }

    fn replace_document(&self, document: Option<String>) -> Result<()> {
        let mut guard = self
            .document
            .lock()
            .map_err(|_| LibError::persistence("Family store unavailable", anyhow!("poisoned lock")))?;
        *guard = document;
        Ok(())
    }
}

#[async_trait]
impl FamilyStore for MemoryFamilyStore {
    async fn load(&self) -> Result<FamilyData> {
        match self.document()? {
            Some(raw) => FamilyData::from_json(&raw),
            None => Err(LibError::not_found(
                "No family tree has been saved yet",
                anyhow!("memory store is empty"),
            )),
        }
    }

    async fn save(&self, data: &FamilyData) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LibError::persistence(
                "Failed to save family tree",
                anyhow!("memory store configured to reject saves"),
            ));
        }
        self.replace_document(Some(data.to_json()?))?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(feature = "fs")]
pub use file::JsonFileStore;

#[cfg(feature = "fs")]
mod file {
    use std::path::{Path, PathBuf};

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::FamilyStore;
    use crate::error::{LibError, Result};
    use crate::models::FamilyData;

    /// One pretty-printed JSON document per family.
    #[derive(Debug, Clone)]
    pub struct JsonFileStore {
        path: PathBuf,
    }

    impl JsonFileStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    #[async_trait]
    impl FamilyStore for JsonFileStore {
        async fn load(&self) -> Result<FamilyData> {
            let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    LibError::not_found(
                        "No family tree has been saved yet",
                        anyhow!("{} does not exist", self.path.display()),
                    )
                } else {
                    LibError::persistence("Failed to read family tree", anyhow!(err))
                }
            })?;
            FamilyData::from_json(&raw)
        }

        async fn save(&self, data: &FamilyData) -> Result<()> {
            let json = data.to_json()?;
            let staging = self.path.with_extension("json.tmp");
            tokio::fs::write(&staging, json)
                .await
                .map_err(|err| LibError::persistence("Failed to save family tree", anyhow!(err)))?;
            tokio::fs::rename(&staging, &self.path)
                .await
                .map_err(|err| LibError::persistence("Failed to save family tree", anyhow!(err)))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{MaritalStatus, Marriage, Person, PersonDraft, PersonId};

    #[tokio::test]
    async fn empty_store_reports_not_found() {
        let store = MemoryFamilyStore::new();
        let err = store.load().await.expect_err("nothing saved");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn saves_persist_legacy_fields_from_marriages() {
        let store = MemoryFamilyStore::new();
        let mut person = Person::from_draft(PersonId::new(), &PersonDraft::new("Ada"));
        person.marital_status = MaritalStatus::Married;
        person.marriages = vec![Marriage::new("Charles")];
        person.spouse_name = None;
        let mut data = FamilyData::empty("Lovelace");
        data.members.push(person);

        store.save(&data).await.expect("save");
        assert_eq!(store.save_count(), 1);
        let raw = store.document().expect("lock").expect("document");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["members"][0]["spouseName"], "Charles");
    }

    #[tokio::test]
    async fn failing_store_keeps_previous_document() {
        let data = FamilyData::empty("Before");
        let store = MemoryFamilyStore::with_data(&data).expect("seed");
        store.set_fail_saves(true);

        let err = store
            .save(&FamilyData::empty("After"))
            .await
            .expect_err("save rejected");
        assert_eq!(err.kind, ErrorKind::Persistence);
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.load().await.expect("load").surname, "Before");
    }
}
