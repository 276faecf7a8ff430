//! Budget totals - derived spend and remaining figures for one professor.
//!
//! Meeting expenses and other activity expenses both draw from the activity budget;
//! materials purchases draw from the materials budget. Remaining figures go negative
//! when a budget line is overspent.

use crate::entities::Professor;
use serde::Serialize;

/// Figures shown on the dashboard and the professor page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Activity plus materials budget
    pub total_budget: f64,
    /// Activity plus materials spending
    pub total_spent: f64,
    /// `total_budget - total_spent`
    pub remaining: f64,

    /// Activity budget line
    pub activity_budget: f64,
    /// Meetings plus other activity spending
    pub activity_spent: f64,
    /// `activity_budget - activity_spent`
    pub activity_remaining: f64,
    /// Sum of meeting amounts
    pub meeting_total: f64,
    /// Sum of activity totals (meetings excluded)
    pub activity_total: f64,

    /// Materials budget line
    pub materials_budget: f64,
    /// Materials spending
    pub materials_spent: f64,
    /// `materials_budget - materials_spent`
    pub materials_remaining: f64,
    /// Sum of materials totals
    pub materials_total: f64,
}

impl Totals {
    /// Computes the totals from a professor's current budgets and expenses.
    #[must_use]
    pub fn from_professor(professor: &Professor) -> Self {
        let expenses = &professor.expenses;
        let meeting_total: f64 = expenses.meeting.iter().map(|e| e.fields.amount).sum();
        let activity_total: f64 = expenses.activity.iter().map(|e| e.fields.total_amount).sum();
        let materials_total: f64 = expenses
            .materials
            .iter()
            .map(|e| e.fields.total_amount)
            .sum();

        let activity_budget = professor.activity_budget;
        let materials_budget = professor.materials_budget;

        let activity_spent = meeting_total + activity_total;
        let materials_spent = materials_total;
        let total_budget = activity_budget + materials_budget;
        let total_spent = activity_spent + materials_spent;

        Self {
            total_budget,
            total_spent,
            remaining: total_budget - total_spent,
            activity_budget,
            activity_spent,
            activity_remaining: activity_budget - activity_spent,
            meeting_total,
            activity_total,
            materials_budget,
            materials_spent,
            materials_remaining: materials_budget - materials_spent,
            materials_total,
        }
    }

    /// Whether any budget line is overspent.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.activity_remaining < 0.0 || self.materials_remaining < 0.0
    }
}
