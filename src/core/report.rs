//! Dashboard report formatting.
//!
//! Turns totals into the text shown on a professor's dashboard card. Amounts are Korean
//! won, which has no minor unit, so figures are rounded to whole won for display only.

use super::totals::Totals;
use crate::entities::ProfessorId;

/// Formats an amount as won with thousands separators, e.g. `₩4,850,000` or `-₩20,000`.
#[must_use]
pub fn format_krw(amount: f64) -> String {
    // Display-only rounding; whole won fits in i64 for any realistic budget.
    #[allow(clippy::cast_possible_truncation)]
    let won = amount.round() as i64;
    let digits = won.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if won < 0 {
        format!("-₩{grouped}")
    } else {
        format!("₩{grouped}")
    }
}

/// Share of a budget line already spent, in percent. Zero budgets report 0%.
#[must_use]
pub fn spent_percent(spent: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        return 0.0;
    }

    (spent / budget) * 100.0
}

/// Text progress bar like `[████████░░] 80.0%`. Overspending fills the bar.
#[must_use]
pub fn format_progress_bar(percent: f64, bar_length: usize) -> String {
    let clamped = percent.clamp(0.0, 100.0);

    // clamped ∈ [0, 100] and bar_length is small, so the product fits in usize.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((clamped / 100.0) * bar_length as f64).round() as usize;
    let empty = bar_length.saturating_sub(filled);

    format!("[{}{}] {percent:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// The dashboard card for one professor.
#[must_use]
pub fn format_card(professor: ProfessorId, totals: &Totals) -> String {
    let status = if totals.is_over_budget() { " ⚠" } else { "" };
    let activity_bar = format_progress_bar(
        spent_percent(totals.activity_spent, totals.activity_budget),
        10,
    );
    let materials_bar = format_progress_bar(
        spent_percent(totals.materials_spent, totals.materials_budget),
        10,
    );

    format!(
        "{name} ({professor}){status}\n\
         \x20 총 예산      {total}\n\
         \x20 사용액       {spent}\n\
         \x20 잔액         {remaining}\n\
         \x20 연구활동비   {activity} {activity_bar}\n\
         \x20 연구재료비   {materials} {materials_bar}\n",
        name = professor.display_name(),
        total = format_krw(totals.total_budget),
        spent = format_krw(totals.total_spent),
        remaining = format_krw(totals.remaining),
        activity = format_krw(totals.activity_remaining),
        materials = format_krw(totals.materials_remaining),
    )
}
