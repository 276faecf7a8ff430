//! Budget ledger operations - add and delete expenses, change budgets, compute totals.
//!
//! Every function takes the session explicitly and persists through its store. Totals
//! are recomputed from the stored expenses on every call; nothing is cached.

use super::totals::Totals;
use crate::{
    entities::{
        Budget, Category, Expense, ExpenseId, ExpenseRecord, FileRef, Professor, ProfessorId,
        Upload,
    },
    errors::Result,
    store::Session,
};
use chrono::Utc;
use tracing::{error, info, warn};

/// Loads a professor with budgets and every expense list.
pub async fn load_professor(session: &Session, professor: ProfessorId) -> Result<Professor> {
    session.store().load_professor(professor).await
}

/// History of one category for a professor, oldest first.
pub async fn list_expenses(
    session: &Session,
    professor: ProfessorId,
    category: Category,
) -> Result<Vec<ExpenseRecord>> {
    session.store().list_expenses(professor, category).await
}

/// Computes the budget totals from the professor's stored expenses.
pub async fn get_totals(session: &Session, professor: ProfessorId) -> Result<Totals> {
    let loaded = load_professor(session, professor).await?;
    Ok(Totals::from_professor(&loaded))
}

/// Records a new expense and returns its id.
///
/// The category is taken from the expense variant. Amounts must be finite. A materials
/// total that differs from unit price times quantity is stored as submitted.
pub async fn add_expense(
    session: &Session,
    professor: ProfessorId,
    expense: Expense,
) -> Result<ExpenseId> {
    expense.validate()?;

    if let Expense::Materials(materials) = &expense {
        let computed = materials.computed_total();
        if (computed - materials.total_amount).abs() > f64::EPSILON {
            warn!(
                "Materials total {} differs from unit price x quantity {}",
                materials.total_amount, computed
            );
        }
    }

    let created_at = Utc::now();
    let record = ExpenseRecord {
        id: session.next_id(created_at),
        created_at,
        expense,
    };
    let category = record.category();
    let file_count = record.expense.files().len();

    session
        .store()
        .append_expense(professor, &record)
        .await
        .inspect(|()| {
            info!(
                "Added {} expense {} for {} with {} files",
                category, record.id, professor, file_count
            );
        })
        .inspect_err(|e| error!("Failed to add {} expense for {}: {}", category, professor, e))?;

    Ok(record.id)
}

/// Removes an expense by id. Returns `false` if no such expense exists.
pub async fn delete_expense(
    session: &Session,
    professor: ProfessorId,
    category: Category,
    id: &ExpenseId,
) -> Result<bool> {
    let removed = session
        .store()
        .delete_expense(professor, category, id)
        .await
        .inspect_err(|e| error!("Failed to delete {} expense {}: {}", category, id, e))?;

    if removed {
        info!("Deleted {} expense {} for {}", category, id, professor);
    } else {
        info!("No {} expense {} for {} to delete", category, id, professor);
    }
    Ok(removed)
}

/// Overwrites both budget lines. The total budget becomes their sum.
pub async fn update_budget(
    session: &Session,
    professor: ProfessorId,
    activity_budget: f64,
    materials_budget: f64,
) -> Result<()> {
    let budget = Budget::new(activity_budget, materials_budget)?;

    session
        .store()
        .update_budget(professor, budget)
        .await
        .inspect(|()| {
            info!(
                "Updated budget for {}: activity {}, materials {}",
                professor, budget.activity, budget.materials
            );
        })
        .inspect_err(|e| error!("Failed to update budget for {}: {}", professor, e))
}

/// Stores uploads with the session's store and returns the references to attach.
///
/// Uploads that fail are logged and left out.
pub async fn attach_files(session: &Session, uploads: &[Upload]) -> Vec<FileRef> {
    let mut files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match session.store().store_file(upload).await {
            Ok(file) => files.push(file),
            Err(e) => warn!("Skipping attachment {}: {}", upload.name, e),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{FileRef, MaterialsExpense, MeetingExpense};
    use crate::errors::Error;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_initial_totals() -> Result<()> {
        let (_dir, session) = local_session()?;

        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.total_budget, 10_000_000.0);
        assert_eq!(totals.total_spent, 0.0);
        assert_eq!(totals.remaining, 10_000_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_meeting_expense_scenario() -> Result<()> {
        let (_dir, session) = local_session()?;

        add_expense(&session, ProfessorId::Choi, meeting_expense(150_000.0)).await?;

        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.activity_total, 0.0);
        assert_eq!(totals.meeting_total, 150_000.0);
        assert_eq!(totals.activity_spent, 150_000.0);
        assert_eq!(totals.activity_remaining, 4_850_000.0);

        let lim = get_totals(&session, ProfessorId::Lim).await?;
        assert_eq!(lim.total_spent, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_materials_expense_scenario() -> Result<()> {
        let (_dir, session) = local_session()?;

        add_expense(
            &session,
            ProfessorId::Choi,
            materials_expense(10_000.0, 3.0, 30_000.0),
        )
        .await?;

        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.materials_spent, 30_000.0);
        assert_eq!(totals.materials_remaining, 4_970_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_submitted_materials_total_is_trusted() -> Result<()> {
        let (_dir, session) = local_session()?;

        let expense = Expense::Materials(MaterialsExpense {
            unit_price: 10_000.0,
            quantity: 3.0,
            total_amount: 25_000.0,
            ..MaterialsExpense::default()
        });
        add_expense(&session, ProfessorId::Lim, expense).await?;

        let totals = get_totals(&session, ProfessorId::Lim).await?;
        assert_eq!(totals.materials_total, 25_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_budget_scenario() -> Result<()> {
        let (_dir, session) = local_session()?;
        add_expense(&session, ProfessorId::Choi, activity_expense(1_000.0)).await?;

        update_budget(&session, ProfessorId::Choi, 6_000_000.0, 4_000_000.0).await?;

        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.total_budget, 10_000_000.0);
        assert_eq!(totals.activity_budget, 6_000_000.0);
        assert_eq!(totals.materials_budget, 4_000_000.0);
        assert_eq!(totals.activity_remaining, 5_999_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_budget_rejects_negative() -> Result<()> {
        let (_dir, session) = local_session()?;

        let result = update_budget(&session, ProfessorId::Choi, -1.0, 0.0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount }) if amount == -1.0));

        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.total_budget, 10_000_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_then_delete_restores_totals() -> Result<()> {
        for (_fixture, session) in both_sessions().await? {
            let professor = ProfessorId::Lim;
            add_expense(&session, professor, activity_expense(40_000.0)).await?;
            let before = get_totals(&session, professor).await?;

            let id = add_expense(&session, professor, meeting_expense(150_000.0)).await?;
            assert_ne!(get_totals(&session, professor).await?, before);

            assert!(delete_expense(&session, professor, Category::Meeting, &id).await?);
            assert_eq!(get_totals(&session, professor).await?, before);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_id_returns_false() -> Result<()> {
        for (_fixture, session) in both_sessions().await? {
            let professor = ProfessorId::Choi;
            add_expense(&session, professor, meeting_expense(5_000.0)).await?;
            let before = get_totals(&session, professor).await?;

            let missing = ExpenseId::new("0");
            assert!(!delete_expense(&session, professor, Category::Meeting, &missing).await?);
            assert_eq!(get_totals(&session, professor).await?, before);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_with_wrong_category_returns_false() -> Result<()> {
        let (_dir, session) = local_session()?;
        let id = add_expense(&session, ProfessorId::Choi, meeting_expense(5_000.0)).await?;

        assert!(!delete_expense(&session, ProfessorId::Choi, Category::Activity, &id).await?);
        assert_eq!(
            list_expenses(&session, ProfessorId::Choi, Category::Meeting)
                .await?
                .len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_recorded() -> Result<()> {
        let (_dir, session) = local_session()?;

        let first = add_expense(&session, ProfessorId::Choi, activity_expense(1.0)).await?;
        let second = add_expense(&session, ProfessorId::Choi, activity_expense(2.0)).await?;
        assert_ne!(first, second);

        let history = list_expenses(&session, ProfessorId::Choi, Category::Activity).await?;
        let ids: Vec<&ExpenseId> = history.iter().map(|r| &r.id).collect();
        assert_eq!(ids, vec![&first, &second]);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_finite_amount_is_not_stored() -> Result<()> {
        let (_dir, session) = local_session()?;

        let result = add_expense(&session, ProfessorId::Choi, meeting_expense(f64::NAN)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        assert!(list_expenses(&session, ProfessorId::Choi, Category::Meeting)
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_write_failure_propagates() -> Result<()> {
        let (tables, session) = remote_session().await?;
        tables.fail_writes(true);

        let result = add_expense(&session, ProfessorId::Choi, activity_expense(1.0)).await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_read_failure_shows_empty_history() -> Result<()> {
        let (tables, session) = remote_session().await?;
        add_expense(&session, ProfessorId::Choi, activity_expense(1.0)).await?;
        tables.fail_reads(true);

        assert!(list_expenses(&session, ProfessorId::Choi, Category::Activity)
            .await?
            .is_empty());
        let totals = get_totals(&session, ProfessorId::Choi).await?;
        assert_eq!(totals.total_spent, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_files_locally_inlines_uploads() -> Result<()> {
        let (_dir, session) = local_session()?;
        let files = attach_files(&session, &[upload("receipt.png", b"png")]).await;

        assert_eq!(files.len(), 1);
        assert!(matches!(&files[0], FileRef::Inline(inline) if inline.mime_type == "application/octet-stream"));

        let expense = Expense::Meeting(MeetingExpense {
            amount: 30_000.0,
            files,
            ..MeetingExpense::default()
        });
        add_expense(&session, ProfessorId::Choi, expense).await?;

        let professor = load_professor(&session, ProfessorId::Choi).await?;
        assert_eq!(professor.expenses.meeting[0].fields.files[0].name(), "receipt.png");
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_files_skips_failed_uploads() -> Result<()> {
        let (tables, session) = remote_session().await?;
        let files = attach_files(&session, &[upload("a.pdf", b"a")]).await;
        assert!(matches!(files.as_slice(), [FileRef::Remote(_)]));

        tables.fail_writes(true);
        let files = attach_files(&session, &[upload("b.pdf", b"b")]).await;
        assert!(files.is_empty());
        Ok(())
    }
}
