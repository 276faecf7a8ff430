//! Remote store - the ledger mapped onto spreadsheet tables.
//!
//! Reads that fail are logged and return nothing, so a flaky connection shows an empty
//! history instead of an error. Writes return their error to the caller. There are no
//! retries and nothing is mirrored to the local store.

use super::{
    LedgerStore, StoreKind,
    sheets::TableClient,
    tables::{self, BUDGET_TABLE},
};
use crate::entities::{
    Budget, Category, ExpenseId, ExpenseRecord, FileRef, Professor, ProfessorId, Upload,
};
use crate::errors::Result;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Store backed by a [`TableClient`].
pub struct RemoteStore<C> {
    client: C,
    defaults: Budget,
}

impl<C: TableClient> RemoteStore<C> {
    /// Creates a store over `client`. `defaults` applies to professors with no budget row.
    pub const fn new(client: C, defaults: Budget) -> Self {
        Self { client, defaults }
    }

    /// Creates any missing table and writes the header rows.
    ///
    /// Every table is attempted; the first failure is returned once all have been tried.
    pub async fn ensure_tables(&self) -> Result<()> {
        let mut first_error = None;
        for layout in tables::all_layouts() {
            if let Err(e) = self.client.ensure_table(layout.name, layout.header).await {
                warn!("Failed to prepare table {}: {}", layout.name, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Remote tables are ready.");
                Ok(())
            }
        }
    }

    /// Read path: failures become an empty result.
    async fn read_rows(&self, table: &str, range: &str) -> Vec<Vec<String>> {
        self.client
            .read(table, range)
            .await
            .inspect(|rows| debug!("Read {} rows from {}", rows.len(), table))
            .unwrap_or_else(|e| {
                warn!("Failed to read {}!{}: {}", table, range, e);
                Vec::new()
            })
    }

    /// Writes both professors at the default budget into an empty budget table.
    async fn seed_budgets(&self) -> Result<()> {
        for professor in ProfessorId::ALL {
            self.client
                .append(
                    BUDGET_TABLE.name,
                    tables::encode_budget(professor, self.defaults),
                )
                .await?;
        }
        info!("Seeded budget table with default budgets.");
        Ok(())
    }

    async fn records(&self, professor: ProfessorId, category: Category) -> Vec<ExpenseRecord> {
        let layout = tables::layout(category);
        self.read_rows(layout.name, &layout.data_range())
            .await
            .iter()
            .filter(|row| tables::belongs_to(row, professor))
            .filter_map(|row| tables::decode_row(category, row))
            .collect()
    }
}

#[async_trait]
impl<C: TableClient> LedgerStore for RemoteStore<C> {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    async fn load_budget(&self, professor: ProfessorId) -> Result<Budget> {
        let rows = match self
            .client
            .read(BUDGET_TABLE.name, &BUDGET_TABLE.data_range())
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to read budgets: {}", e);
                return Ok(self.defaults);
            }
        };

        if rows.is_empty() {
            if let Err(e) = self.seed_budgets().await {
                warn!("Failed to seed budget table: {}", e);
            }
            return Ok(self.defaults);
        }

        Ok(rows
            .iter()
            .find(|row| tables::row_id(row) == professor.as_str())
            .map_or(self.defaults, |row| tables::decode_budget(row)))
    }

    async fn list_expenses(
        &self,
        professor: ProfessorId,
        category: Category,
    ) -> Result<Vec<ExpenseRecord>> {
        Ok(self.records(professor, category).await)
    }

    async fn load_professor(&self, professor: ProfessorId) -> Result<Professor> {
        let (budget, meeting_pre, meeting, activity_pre, activity, materials_pre, materials) = tokio::join!(
            self.load_budget(professor),
            self.records(professor, Category::MeetingPre),
            self.records(professor, Category::Meeting),
            self.records(professor, Category::ActivityPre),
            self.records(professor, Category::Activity),
            self.records(professor, Category::MaterialsPre),
            self.records(professor, Category::Materials),
        );

        let mut loaded = Professor::new(professor, budget?);
        for record in meeting_pre
            .into_iter()
            .chain(meeting)
            .chain(activity_pre)
            .chain(activity)
            .chain(materials_pre)
            .chain(materials)
        {
            loaded.expenses.push(record);
        }
        Ok(loaded)
    }

    async fn append_expense(&self, professor: ProfessorId, record: &ExpenseRecord) -> Result<()> {
        let layout = tables::layout(record.category());
        self.client
            .append(layout.name, tables::encode_row(professor, record))
            .await
            .inspect_err(|e| error!("Failed to append to {}: {}", layout.name, e))
    }

    async fn delete_expense(
        &self,
        professor: ProfessorId,
        category: Category,
        id: &ExpenseId,
    ) -> Result<bool> {
        let layout = tables::layout(category);
        let rows = self
            .client
            .read(layout.name, "A2:B")
            .await
            .inspect_err(|e| error!("Failed to look up {} in {}: {}", id, layout.name, e))?;

        let Some(index) = rows
            .iter()
            .position(|row| tables::row_id(row) == id.as_str() && tables::belongs_to(row, professor))
        else {
            return Ok(false);
        };

        // data row i sits at sheet row i + 1 below the header
        self.client
            .delete_row(layout.name, index + 1)
            .await
            .inspect_err(|e| error!("Failed to delete {} from {}: {}", id, layout.name, e))?;
        Ok(true)
    }

    async fn update_budget(&self, professor: ProfessorId, budget: Budget) -> Result<()> {
        let rows = self
            .client
            .read(BUDGET_TABLE.name, &BUDGET_TABLE.data_range())
            .await
            .inspect_err(|e| error!("Failed to read budgets: {}", e))?;

        let written = match rows
            .iter()
            .position(|row| tables::row_id(row) == professor.as_str())
        {
            Some(index) => {
                let sheet_row = index + 2;
                let cells = tables::encode_budget(professor, budget);
                self.client
                    .update(
                        BUDGET_TABLE.name,
                        &format!("C{sheet_row}:D{sheet_row}"),
                        vec![cells[2..].to_vec()],
                    )
                    .await
            }
            None => {
                self.client
                    .append(BUDGET_TABLE.name, tables::encode_budget(professor, budget))
                    .await
            }
        };
        written.inspect_err(|e| error!("Failed to write budget for {}: {}", professor, e))
    }

    async fn store_file(&self, upload: &Upload) -> Result<FileRef> {
        self.client
            .upload_file(upload)
            .await
            .map(FileRef::Remote)
            .inspect_err(|e| error!("Failed to upload {}: {}", upload.name, e))
    }
}
