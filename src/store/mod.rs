//! Persistence layer.
//!
//! The ledger talks to one [`LedgerStore`] per session. [`RemoteStore`] maps the ledger
//! onto spreadsheet tables through a [`TableClient`]; [`LocalStore`] keeps everything in a
//! single JSON document. Read paths log failures and return empty results; write paths
//! return the error to the caller.

pub mod local;
pub mod remote;
pub mod session;
pub mod sheets;
pub mod tables;

pub use local::{LedgerDocument, LocalStore};
pub use remote::RemoteStore;
pub use session::{IdMinter, Session};
pub use sheets::{SheetsClient, TableClient};

use crate::{
    entities::{Budget, Category, ExpenseId, ExpenseRecord, FileRef, Professor, ProfessorId, Upload},
    errors::Result,
};
use async_trait::async_trait;
use std::fmt;

/// Which backend a session persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Spreadsheet tables and blob storage
    Remote,
    /// Local JSON document
    Local,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

/// Storage contract shared by the remote and local backends.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend kind, for logging.
    fn kind(&self) -> StoreKind;

    /// Budget lines of a professor. Falls back to the defaults when nothing is stored.
    async fn load_budget(&self, professor: ProfessorId) -> Result<Budget>;

    /// All records of one category for a professor.
    async fn list_expenses(
        &self,
        professor: ProfessorId,
        category: Category,
    ) -> Result<Vec<ExpenseRecord>>;

    /// Budget and every expense list of a professor.
    async fn load_professor(&self, professor: ProfessorId) -> Result<Professor>;

    /// Persists a newly added record.
    async fn append_expense(&self, professor: ProfessorId, record: &ExpenseRecord) -> Result<()>;

    /// Removes a record by id. Returns whether a record was removed.
    async fn delete_expense(
        &self,
        professor: ProfessorId,
        category: Category,
        id: &ExpenseId,
    ) -> Result<bool>;

    /// Overwrites both budget lines.
    async fn update_budget(&self, professor: ProfessorId, budget: Budget) -> Result<()>;

    /// Stores an uploaded file and returns the reference to attach.
    async fn store_file(&self, upload: &Upload) -> Result<FileRef>;
}
