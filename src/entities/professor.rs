//! Professor entity - one of the two fixed budget holders.
//!
//! Each professor has an activity budget (meetings plus other research activity)
//! and a materials budget, and owns the six expense lists.

use super::expense::Expenses;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Budget given to each professor when nothing has been stored yet.
pub const DEFAULT_BUDGET: Budget = Budget {
    activity: 5_000_000.0,
    materials: 5_000_000.0,
};

/// Identifier of a budget holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfessorId {
    /// 최준정
    Choi,
    /// 임선민
    Lim,
}

impl ProfessorId {
    /// Both professors, in display order.
    pub const ALL: [Self; 2] = [Self::Choi, Self::Lim];

    /// Stable key used in storage rows and documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Choi => "choi",
            Self::Lim => "lim",
        }
    }

    /// Name shown on the dashboard and stored in the budget table.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Choi => "최준정",
            Self::Lim => "임선민",
        }
    }
}

impl fmt::Display for ProfessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfessorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "choi" => Ok(Self::Choi),
            "lim" => Ok(Self::Lim),
            other => Err(Error::UnknownProfessor {
                id: other.to_string(),
            }),
        }
    }
}

/// The two budget lines of a professor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    /// Research activity budget (meeting and activity expenses draw from it)
    pub activity: f64,
    /// Research materials budget
    pub materials: f64,
}

impl Budget {
    /// Builds a budget, rejecting negative or non-finite values.
    pub fn new(activity: f64, materials: f64) -> Result<Self> {
        for amount in [activity, materials] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }
        Ok(Self {
            activity,
            materials,
        })
    }

    /// Sum of both budget lines.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.activity + self.materials
    }
}

impl Default for Budget {
    fn default() -> Self {
        DEFAULT_BUDGET
    }
}

/// A professor with budgets and all recorded expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    /// Fixed identifier
    pub id: ProfessorId,
    /// Display name
    pub name: String,
    /// Always `activity_budget + materials_budget`
    pub total_budget: f64,
    /// Activity budget line
    pub activity_budget: f64,
    /// Materials budget line
    pub materials_budget: f64,
    /// Expenses partitioned by category
    #[serde(default)]
    pub expenses: Expenses,
}

impl Professor {
    /// Creates a professor with no expenses.
    #[must_use]
    pub fn new(id: ProfessorId, budget: Budget) -> Self {
        Self {
            id,
            name: id.display_name().to_string(),
            total_budget: budget.total(),
            activity_budget: budget.activity,
            materials_budget: budget.materials,
            expenses: Expenses::default(),
        }
    }

    /// Current budget lines.
    #[must_use]
    pub const fn budget(&self) -> Budget {
        Budget {
            activity: self.activity_budget,
            materials: self.materials_budget,
        }
    }

    /// Overwrites both budget lines and recomputes the total.
    pub fn set_budget(&mut self, budget: Budget) {
        self.activity_budget = budget.activity;
        self.materials_budget = budget.materials;
        self.total_budget = budget.total();
    }
}
