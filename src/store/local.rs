//! Local fallback store - the whole ledger as one JSON document.
//!
//! Used when the session has no access token. The document is created with both
//! professors at the default budget the first time it is read.

use super::{LedgerStore, StoreKind};
use crate::entities::{
    Budget, Category, ExpenseId, ExpenseRecord, FileRef, InlineFile, Professor, ProfessorId,
    Upload,
};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tokio::{fs, sync::Mutex, task};
use tracing::{debug, info, warn};

/// Root of the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Professors keyed by id
    pub professors: BTreeMap<ProfessorId, Professor>,
}

impl LedgerDocument {
    /// Both professors with `budget` and no expenses.
    #[must_use]
    pub fn with_budget(budget: Budget) -> Self {
        Self {
            professors: ProfessorId::ALL
                .into_iter()
                .map(|id| (id, Professor::new(id, budget)))
                .collect(),
        }
    }

    /// Mutable access to a professor, inserting a default entry if it was missing.
    pub fn professor_mut(&mut self, id: ProfessorId, budget: Budget) -> &mut Professor {
        self.professors
            .entry(id)
            .or_insert_with(|| Professor::new(id, budget))
    }
}

/// Store backed by a JSON file on disk.
///
/// Every read and write of the file, including the first-use creation, happens under
/// one lock, so a shared store never interleaves writes.
pub struct LocalStore {
    path: PathBuf,
    defaults: Budget,
    document_lock: Mutex<()>,
}

impl LocalStore {
    /// Creates a store for the document at `path`. Nothing is read until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, defaults: Budget) -> Self {
        Self {
            path: path.into(),
            defaults,
            document_lock: Mutex::new(()),
        }
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, writing the initial one if the file does not exist yet.
    pub async fn read_document(&self) -> Result<LedgerDocument> {
        let _guard = self.document_lock.lock().await;
        self.read_locked().await
    }

    /// Caller holds `document_lock`.
    async fn read_locked(&self) -> Result<LedgerDocument> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No ledger document at {}, creating the initial one.",
                    self.path.display()
                );
                let document = LedgerDocument::with_budget(self.defaults);
                self.write_locked(&document).await?;
                Ok(document)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Caller holds `document_lock`. Replaces the file through a uniquely named temp file.
    async fn write_locked(&self, document: &LedgerDocument) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).await?;

        let contents = serde_json::to_vec_pretty(document)?;
        let path = self.path.clone();
        task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&contents)?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Store {
            message: format!("Ledger document write task failed: {e}"),
        })??;

        debug!("Wrote ledger document to {}", self.path.display());
        Ok(())
    }

    /// Read path: a broken document is logged and treated as the initial state.
    async fn read_or_default(&self) -> LedgerDocument {
        self.read_document().await.unwrap_or_else(|e| {
            warn!(
                "Failed to read ledger document {}: {}",
                self.path.display(),
                e
            );
            LedgerDocument::with_budget(self.defaults)
        })
    }

    /// Read-modify-write of the document under the document lock.
    async fn modify<T: Send>(
        &self,
        change: impl FnOnce(&mut LedgerDocument) -> T + Send,
    ) -> Result<T> {
        let _guard = self.document_lock.lock().await;
        let mut document = self.read_locked().await?;
        let outcome = change(&mut document);
        self.write_locked(&document).await?;
        Ok(outcome)
    }
}

#[async_trait]
impl LedgerStore for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    async fn load_budget(&self, professor: ProfessorId) -> Result<Budget> {
        Ok(self.load_professor(professor).await?.budget())
    }

    async fn list_expenses(
        &self,
        professor: ProfessorId,
        category: Category,
    ) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .load_professor(professor)
            .await?
            .expenses
            .records(category))
    }

    async fn load_professor(&self, professor: ProfessorId) -> Result<Professor> {
        let mut document = self.read_or_default().await;
        Ok(document
            .professors
            .remove(&professor)
            .unwrap_or_else(|| Professor::new(professor, self.defaults)))
    }

    async fn append_expense(&self, professor: ProfessorId, record: &ExpenseRecord) -> Result<()> {
        let defaults = self.defaults;
        let record = record.clone();
        self.modify(move |document| {
            document
                .professor_mut(professor, defaults)
                .expenses
                .push(record);
        })
        .await
    }

    async fn delete_expense(
        &self,
        professor: ProfessorId,
        category: Category,
        id: &ExpenseId,
    ) -> Result<bool> {
        let _guard = self.document_lock.lock().await;
        let mut document = self.read_locked().await?;
        let removed = document
            .professor_mut(professor, self.defaults)
            .expenses
            .remove(category, id);
        if removed {
            self.write_locked(&document).await?;
        }
        Ok(removed)
    }

    async fn update_budget(&self, professor: ProfessorId, budget: Budget) -> Result<()> {
        let defaults = self.defaults;
        self.modify(move |document| {
            document
                .professor_mut(professor, defaults)
                .set_budget(budget);
        })
        .await
    }

    async fn store_file(&self, upload: &Upload) -> Result<FileRef> {
        Ok(FileRef::Inline(InlineFile::encode(upload)))
    }
}
