//! Expense entities - the six expense categories and their field sets.
//!
//! Three categories are pre-application uploads that only carry files. The other
//! three are actual spending with amounts that feed the budget totals. Each stored
//! expense gets an identifier and creation timestamp when it is added.

use super::file_ref::FileRef;
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six expense kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Meeting pre-application documents
    MeetingPre,
    /// Meeting expenses
    Meeting,
    /// Research activity pre-application documents
    ActivityPre,
    /// Research activity expenses other than meetings
    Activity,
    /// Research materials pre-application documents
    MaterialsPre,
    /// Research materials purchases
    Materials,
}

impl Category {
    /// All categories in form order.
    pub const ALL: [Self; 6] = [
        Self::MeetingPre,
        Self::Meeting,
        Self::ActivityPre,
        Self::Activity,
        Self::MaterialsPre,
        Self::Materials,
    ];

    /// Key used in the local document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MeetingPre => "meetingPre",
            Self::Meeting => "meeting",
            Self::ActivityPre => "activityPre",
            Self::Activity => "activity",
            Self::MaterialsPre => "materialsPre",
            Self::Materials => "materials",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expense identifier, derived from the creation time in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(String);

impl ExpenseId {
    /// Wraps an identifier read back from storage.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-application upload: only a timestamp and the attached documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreApplication {
    /// When the documents were uploaded
    pub upload_date: DateTime<Utc>,
    /// Attached documents
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// Meeting expense, drawn from the activity budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingExpense {
    /// Date of use
    pub date: String,
    /// Where the card was used
    pub location: String,
    /// Card used
    pub card: String,
    /// Payment date
    pub payment_date: String,
    /// Where the meeting took place
    pub meeting_location: String,
    /// When the meeting took place
    pub meeting_date_time: String,
    /// What was discussed
    pub content: String,
    /// Internal attendees
    pub attendees: String,
    /// External attendees
    pub external_attendees: String,
    /// Amount spent
    pub amount: f64,
    /// Receipts and minutes
    pub files: Vec<FileRef>,
}

/// Research activity expense other than meetings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityExpense {
    /// Free-form classification label
    pub category: String,
    /// What the money was used for
    pub description: String,
    /// Card used
    pub card: String,
    /// Payment date
    pub payment_date: String,
    /// Total paid
    pub total_amount: f64,
    /// Taxable part
    pub taxable_amount: f64,
    /// Value added tax
    pub vat: f64,
}

/// Research materials purchase.
///
/// `total_amount` is taken as submitted; the form fills it from
/// [`MaterialsExpense::computed_total`] but the ledger does not recompute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialsExpense {
    /// Free-form classification label
    pub category: String,
    /// What was bought
    pub description: String,
    /// Card used
    pub card: String,
    /// Payment date
    pub payment_date: String,
    /// Usage time noted on the form
    pub usage_time: String,
    /// Price per unit
    pub unit_price: f64,
    /// Number of units
    pub quantity: f64,
    /// Total paid
    pub total_amount: f64,
    /// Taxable part
    pub taxable_amount: f64,
    /// Value added tax
    pub vat: f64,
    /// Asset registration date
    pub registration_date: String,
    /// Receipts and quotes
    pub files: Vec<FileRef>,
}

impl MaterialsExpense {
    /// Unit price times quantity.
    #[must_use]
    pub fn computed_total(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

/// An expense of any category, tagged by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Expense {
    /// Meeting pre-application
    MeetingPre(PreApplication),
    /// Meeting expense
    Meeting(MeetingExpense),
    /// Activity pre-application
    ActivityPre(PreApplication),
    /// Activity expense
    Activity(ActivityExpense),
    /// Materials pre-application
    MaterialsPre(PreApplication),
    /// Materials purchase
    Materials(MaterialsExpense),
}

impl Expense {
    /// Category this expense belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::MeetingPre(_) => Category::MeetingPre,
            Self::Meeting(_) => Category::Meeting,
            Self::ActivityPre(_) => Category::ActivityPre,
            Self::Activity(_) => Category::Activity,
            Self::MaterialsPre(_) => Category::MaterialsPre,
            Self::Materials(_) => Category::Materials,
        }
    }

    /// Attached files.
    #[must_use]
    pub fn files(&self) -> &[FileRef] {
        match self {
            Self::MeetingPre(pre) | Self::ActivityPre(pre) | Self::MaterialsPre(pre) => &pre.files,
            Self::Meeting(meeting) => &meeting.files,
            Self::Materials(materials) => &materials.files,
            Self::Activity(_) => &[],
        }
    }

    /// Rejects amounts that would poison the totals.
    pub fn validate(&self) -> Result<()> {
        let amounts = match self {
            Self::Meeting(meeting) => vec![meeting.amount],
            Self::Activity(activity) => vec![
                activity.total_amount,
                activity.taxable_amount,
                activity.vat,
            ],
            Self::Materials(materials) => vec![
                materials.unit_price,
                materials.quantity,
                materials.total_amount,
                materials.taxable_amount,
                materials.vat,
            ],
            Self::MeetingPre(_) | Self::ActivityPre(_) | Self::MaterialsPre(_) => Vec::new(),
        };

        match amounts.into_iter().find(|amount| !amount.is_finite()) {
            Some(amount) => Err(Error::InvalidAmount { amount }),
            None => Ok(()),
        }
    }
}

/// An expense together with the identity assigned when it was added.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    /// Unique identifier
    pub id: ExpenseId,
    /// When the expense was added
    pub created_at: DateTime<Utc>,
    /// The expense itself
    pub expense: Expense,
}

impl ExpenseRecord {
    /// Category of the wrapped expense.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.expense.category()
    }
}

/// Serialized form of a record inside one category list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    /// Unique identifier
    pub id: ExpenseId,
    /// When the expense was added
    pub created_at: DateTime<Utc>,
    /// Category specific fields
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Stored<T> {
    fn new(id: ExpenseId, created_at: DateTime<Utc>, fields: T) -> Self {
        Self {
            id,
            created_at,
            fields,
        }
    }
}

/// A professor's expenses, one list per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expenses {
    /// Meeting pre-applications
    pub meeting_pre: Vec<Stored<PreApplication>>,
    /// Meeting expenses
    pub meeting: Vec<Stored<MeetingExpense>>,
    /// Activity pre-applications
    pub activity_pre: Vec<Stored<PreApplication>>,
    /// Activity expenses
    pub activity: Vec<Stored<ActivityExpense>>,
    /// Materials pre-applications
    pub materials_pre: Vec<Stored<PreApplication>>,
    /// Materials purchases
    pub materials: Vec<Stored<MaterialsExpense>>,
}

/// Removes the first entry with the given id from one list.
fn remove_by_id<T>(list: &mut Vec<Stored<T>>, id: &ExpenseId) -> bool {
    list.iter()
        .position(|stored| &stored.id == id)
        .map(|index| list.remove(index))
        .is_some()
}

impl Expenses {
    /// Appends a record to the list of its category.
    pub fn push(&mut self, record: ExpenseRecord) {
        let ExpenseRecord {
            id,
            created_at,
            expense,
        } = record;
        match expense {
            Expense::MeetingPre(pre) => self.meeting_pre.push(Stored::new(id, created_at, pre)),
            Expense::Meeting(meeting) => self.meeting.push(Stored::new(id, created_at, meeting)),
            Expense::ActivityPre(pre) => self.activity_pre.push(Stored::new(id, created_at, pre)),
            Expense::Activity(activity) => {
                self.activity.push(Stored::new(id, created_at, activity));
            }
            Expense::MaterialsPre(pre) => {
                self.materials_pre.push(Stored::new(id, created_at, pre));
            }
            Expense::Materials(materials) => {
                self.materials.push(Stored::new(id, created_at, materials));
            }
        }
    }

    /// Removes the record with `id` from `category`. Returns whether anything was removed.
    pub fn remove(&mut self, category: Category, id: &ExpenseId) -> bool {
        match category {
            Category::MeetingPre => remove_by_id(&mut self.meeting_pre, id),
            Category::Meeting => remove_by_id(&mut self.meeting, id),
            Category::ActivityPre => remove_by_id(&mut self.activity_pre, id),
            Category::Activity => remove_by_id(&mut self.activity, id),
            Category::MaterialsPre => remove_by_id(&mut self.materials_pre, id),
            Category::Materials => remove_by_id(&mut self.materials, id),
        }
    }

    /// Records of one category, in insertion order.
    #[must_use]
    pub fn records(&self, category: Category) -> Vec<ExpenseRecord> {
        fn collect<T: Clone>(
            list: &[Stored<T>],
            wrap: impl Fn(T) -> Expense,
        ) -> Vec<ExpenseRecord> {
            list.iter()
                .map(|stored| ExpenseRecord {
                    id: stored.id.clone(),
                    created_at: stored.created_at,
                    expense: wrap(stored.fields.clone()),
                })
                .collect()
        }

        match category {
            Category::MeetingPre => collect(&self.meeting_pre, Expense::MeetingPre),
            Category::Meeting => collect(&self.meeting, Expense::Meeting),
            Category::ActivityPre => collect(&self.activity_pre, Expense::ActivityPre),
            Category::Activity => collect(&self.activity, Expense::Activity),
            Category::MaterialsPre => collect(&self.materials_pre, Expense::MaterialsPre),
            Category::Materials => collect(&self.materials, Expense::Materials),
        }
    }

    /// Number of records in one category.
    #[must_use]
    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::MeetingPre => self.meeting_pre.len(),
            Category::Meeting => self.meeting.len(),
            Category::ActivityPre => self.activity_pre.len(),
            Category::Activity => self.activity.len(),
            Category::MaterialsPre => self.materials_pre.len(),
            Category::Materials => self.materials.len(),
        }
    }

    /// Whether no category holds any record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Category::ALL.into_iter().all(|category| self.len(category) == 0)
    }
}
