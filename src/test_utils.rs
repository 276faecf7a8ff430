//! Shared test utilities for the research fund ledger.
//!
//! This module provides an in-memory table client, ready-made sessions over both
//! stores, and expense builders with sensible defaults.
#![allow(clippy::unwrap_used, clippy::panic)]

use crate::{
    config::BudgetConfig,
    entities::{
        ActivityExpense, Category, DEFAULT_BUDGET, Expense, ExpenseId, ExpenseRecord,
        MaterialsExpense, MeetingExpense, PreApplication, RemoteFile, Upload,
    },
    errors::{Error, Result},
    store::{
        LocalStore, RemoteStore, Session,
        sheets::{TableClient, cell_text},
        tables::header_range,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tempfile::TempDir;

/// Tables kept in memory. Row 0 of every table is its header.
///
/// Reads of a table that was never created fail, like a missing sheet does.
#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: Mutex<HashMap<String, Vec<Vec<String>>>>,
    uploads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_table: Mutex<Option<String>>,
}

impl MemoryTables {
    /// Makes every following read fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every following write and upload fail until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of rows in `table`, header included.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, Vec::len)
    }

    /// Copy of one row, by zero-based sheet index.
    pub fn row(&self, table: &str, index: usize) -> Vec<String> {
        self.tables.lock().unwrap()[table][index].clone()
    }

    /// Makes writes to one table fail, as if the sheet rejected them.
    pub fn fail_table(&self, table: &str) {
        *self.failing_table.lock().unwrap() = Some(table.to_string());
    }

    fn check_upload(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                status: 503,
                message: "writes disabled".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self, table: &str) -> Result<()> {
        if self.failing_table.lock().unwrap().as_deref() == Some(table) {
            return Err(Error::Remote {
                status: 503,
                message: format!("writes to {table} disabled"),
            });
        }
        self.check_upload()
    }
}

/// Splits an A1 reference like `C3` into a zero-based column and an optional zero-based row.
fn parse_cell(reference: &str) -> (usize, Option<usize>) {
    let letters: String = reference
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    let column = letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1))
        - 1;
    let row = reference[letters.len()..]
        .parse::<usize>()
        .ok()
        .map(|r| r - 1);
    (column, row)
}

#[async_trait]
impl TableClient for MemoryTables {
    async fn read(&self, table: &str, range: &str) -> Result<Vec<Vec<String>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Remote {
                status: 503,
                message: "reads disabled".to_string(),
            });
        }

        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (first_column, first_row) = parse_cell(start);
        let (last_column, _) = parse_cell(end);

        let tables = self.tables.lock().unwrap();
        let rows = tables.get(table).ok_or_else(|| Error::Remote {
            status: 400,
            message: format!("Unable to parse range: {table}!{range}"),
        })?;

        Ok(rows
            .iter()
            .skip(first_row.unwrap_or(0))
            .map(|row| {
                row.iter()
                    .skip(first_column)
                    .take(last_column + 1 - first_column)
                    .cloned()
                    .collect()
            })
            .collect())
    }

    async fn append(&self, table: &str, row: Vec<Value>) -> Result<()> {
        self.check_write(table)?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.iter().map(cell_text).collect());
        Ok(())
    }

    async fn update(&self, table: &str, range: &str, values: Vec<Vec<Value>>) -> Result<()> {
        self.check_write(table)?;
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (first_column, first_row) = parse_cell(start);
        let (last_column, last_row) = parse_cell(end);

        let width = last_column + 1 - first_column;
        let height = match (first_row, last_row) {
            (Some(first), Some(last)) => last + 1 - first,
            _ => usize::MAX,
        };
        if values.len() > height || values.iter().any(|row| row.len() > width) {
            return Err(Error::Remote {
                status: 400,
                message: format!("Requested writing within range [{table}!{range}], but tried writing outside it"),
            });
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for (offset, values) in values.iter().enumerate() {
            let index = first_row.unwrap_or(0) + offset;
            if rows.len() <= index {
                rows.resize(index + 1, Vec::new());
            }
            let row = &mut rows[index];
            for (column, value) in values.iter().enumerate() {
                let column = first_column + column;
                if row.len() <= column {
                    row.resize(column + 1, String::new());
                }
                row[column] = cell_text(value);
            }
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<()> {
        self.check_write(table)?;
        let mut tables = self.tables.lock().unwrap();
        match tables.get_mut(table) {
            Some(rows) if index < rows.len() => {
                rows.remove(index);
                Ok(())
            }
            _ => Err(Error::Remote {
                status: 400,
                message: format!("No row {index} in {table}"),
            }),
        }
    }

    async fn upload_file(&self, upload: &Upload) -> Result<RemoteFile> {
        self.check_upload()?;
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteFile::new(format!("file-{n}"), upload.name.clone()))
    }

    async fn ensure_table(&self, table: &str, header: &[&str]) -> Result<()> {
        self.check_write(table)?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default();

        let range = header_range(header.len());
        let header = header.iter().map(|title| Value::from(*title)).collect();
        self.update(table, &range, vec![header]).await
    }
}

/// What keeps a test session's backing storage alive.
#[allow(dead_code)] // held until dropped
pub enum Fixture {
    /// Directory holding the local document
    Local(TempDir),
    /// In-memory remote tables
    Remote(Arc<MemoryTables>),
}

/// Session over a local document in a fresh temporary directory.
pub fn local_session() -> Result<(TempDir, Session)> {
    let dir = tempfile::tempdir()?;
    let defaults = BudgetConfig::default().defaults()?;
    let store = LocalStore::new(dir.path().join("researchFundData.json"), defaults);
    Ok((dir, Session::with_store(Arc::new(store))))
}

/// Session over in-memory remote tables with their headers written.
pub async fn remote_session() -> Result<(Arc<MemoryTables>, Session)> {
    let tables = Arc::new(MemoryTables::default());
    let store = RemoteStore::new(Arc::clone(&tables), DEFAULT_BUDGET);
    store.ensure_tables().await?;
    Ok((tables, Session::with_store(Arc::new(store))))
}

/// One fresh session per store, for behavior both stores must share.
pub async fn both_sessions() -> Result<Vec<(Fixture, Session)>> {
    let (dir, local) = local_session()?;
    let (tables, remote) = remote_session().await?;
    Ok(vec![
        (Fixture::Local(dir), local),
        (Fixture::Remote(tables), remote),
    ])
}

/// An upload with a generic binary MIME type.
pub fn upload(name: &str, bytes: &[u8]) -> Upload {
    Upload {
        name: name.to_string(),
        mime_type: "application/octet-stream".to_string(),
        bytes: bytes.to_vec(),
    }
}

fn fixed_time() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

/// Wraps an expense as stored, with a fixed creation time.
pub fn record(id: &str, expense: Expense) -> ExpenseRecord {
    ExpenseRecord {
        id: ExpenseId::new(id),
        created_at: fixed_time(),
        expense,
    }
}

/// Creates a meeting expense with sensible defaults.
///
/// # Defaults
/// * `location`: "연구실"
/// * `content`: "연구 회의"
/// * `attendees`: "3"
/// * no files
pub fn meeting_expense(amount: f64) -> Expense {
    Expense::Meeting(MeetingExpense {
        date: "2024-03-05".to_string(),
        location: "연구실".to_string(),
        card: "법인카드".to_string(),
        payment_date: "2024-03-05".to_string(),
        meeting_location: "공학관".to_string(),
        meeting_date_time: "2024-03-05T12:00".to_string(),
        content: "연구 회의".to_string(),
        attendees: "3".to_string(),
        external_attendees: "0".to_string(),
        amount,
        files: Vec::new(),
    })
}

/// Creates an activity expense with a 10% VAT split of `total`.
pub fn activity_expense(total: f64) -> Expense {
    Expense::Activity(ActivityExpense {
        category: "도서구입".to_string(),
        description: "참고문헌".to_string(),
        card: "연구카드".to_string(),
        payment_date: "2024-03-06".to_string(),
        total_amount: total,
        taxable_amount: total / 1.1,
        vat: total - total / 1.1,
    })
}

/// Creates a materials purchase with the given unit price, quantity and submitted total.
pub fn materials_expense(unit_price: f64, quantity: f64, total: f64) -> Expense {
    Expense::Materials(MaterialsExpense {
        category: "시약".to_string(),
        description: "실험용 시약".to_string(),
        card: "연구카드".to_string(),
        payment_date: "2024-03-07".to_string(),
        usage_time: "2024-03-08".to_string(),
        unit_price,
        quantity,
        total_amount: total,
        taxable_amount: total,
        vat: 0.0,
        registration_date: "2024-03-07".to_string(),
        files: Vec::new(),
    })
}

/// Creates an empty pre-application for `category`.
///
/// Panics for categories that are not pre-applications.
pub fn pre_application(category: Category) -> Expense {
    let application = PreApplication {
        upload_date: fixed_time(),
        files: Vec::new(),
    };
    match category {
        Category::MeetingPre => Expense::MeetingPre(application),
        Category::ActivityPre => Expense::ActivityPre(application),
        Category::MaterialsPre => Expense::MaterialsPre(application),
        other => panic!("{other} is not a pre-application"),
    }
}
