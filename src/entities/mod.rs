//! Entity module - the ledger's data shapes.
//! Professors own budgets and expense lists; expenses carry file references.

pub mod expense;
pub mod file_ref;
pub mod professor;

pub use expense::{
    ActivityExpense, Category, Expense, ExpenseId, ExpenseRecord, Expenses, MaterialsExpense,
    MeetingExpense, PreApplication, Stored,
};
pub use file_ref::{FileRef, InlineFile, RemoteFile, Upload};
pub use professor::{Budget, DEFAULT_BUDGET, Professor, ProfessorId};
