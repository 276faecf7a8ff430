//! Spreadsheet table layouts and row codecs.
//!
//! Each expense category has its own table whose first two columns are the expense id
//! and the professor id. Budgets live in a separate four-column table. Cells are read
//! back as text; numbers that fail to parse count as zero.

use crate::entities::{
    ActivityExpense, Budget, Category, Expense, ExpenseId, ExpenseRecord, FileRef,
    MaterialsExpense, MeetingExpense, PreApplication, ProfessorId, RemoteFile,
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

/// Separator used when several files share one cell.
const FILE_SEPARATOR: &str = "\n";

/// Name and header of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Sheet title
    pub name: &'static str,
    /// Header row, one title per column
    pub header: &'static [&'static str],
}

impl TableLayout {
    /// Data rows (everything below the header) across all columns.
    #[must_use]
    pub fn data_range(&self) -> String {
        format!("A2:{}", column_letter(self.header.len()))
    }
}

/// Budget table: professor id, name, activity budget, materials budget.
pub const BUDGET_TABLE: TableLayout = TableLayout {
    name: "예산정보",
    header: &["교수ID", "교수명", "연구활동비예산", "연구재료비예산"],
};

const PRE_APPLICATION_HEADER: &[&str] =
    &["ID", "교수ID", "업로드날짜", "파일ID", "파일이름", "생성일"];

const MEETING_HEADER: &[&str] = &[
    "ID", "교수ID", "사용일", "사용처", "사용카드", "결제일", "회의장소", "회의일시", "회의내용",
    "참석자", "외부참석자", "금액", "파일ID", "파일이름", "생성일",
];

const ACTIVITY_HEADER: &[&str] = &[
    "ID", "교수ID", "구분", "사용내역", "사용카드", "결제일", "총금액", "과세금액", "부가세",
    "생성일",
];

const MATERIALS_HEADER: &[&str] = &[
    "ID", "교수ID", "구분", "사용내역", "사용카드", "결제일", "단가", "개수", "총금액",
    "과세금액", "부가세", "생성일", "등록일", "사용시간", "파일ID", "파일이름",
];

/// Table holding the expenses of `category`.
#[must_use]
pub const fn layout(category: Category) -> TableLayout {
    match category {
        Category::MeetingPre => TableLayout {
            name: "회의비사전신청",
            header: PRE_APPLICATION_HEADER,
        },
        Category::ActivityPre => TableLayout {
            name: "연구활동비사전신청",
            header: PRE_APPLICATION_HEADER,
        },
        Category::MaterialsPre => TableLayout {
            name: "연구재료비사전신청",
            header: PRE_APPLICATION_HEADER,
        },
        Category::Meeting => TableLayout {
            name: "회의비",
            header: MEETING_HEADER,
        },
        Category::Activity => TableLayout {
            name: "연구활동비",
            header: ACTIVITY_HEADER,
        },
        Category::Materials => TableLayout {
            name: "연구재료비",
            header: MATERIALS_HEADER,
        },
    }
}

/// Every table the remote store uses, budget table first.
#[must_use]
pub fn all_layouts() -> Vec<TableLayout> {
    std::iter::once(BUDGET_TABLE)
        .chain(Category::ALL.into_iter().map(layout))
        .collect()
}

/// Spreadsheet column letter for a 1-based column number.
#[must_use]
pub fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26, so the sum stays within 'A'..='Z'
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Range of a header row with `columns` titles, e.g. `A1:E1`.
#[must_use]
pub fn header_range(columns: usize) -> String {
    format!("A1:{}1", column_letter(columns))
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map_or("", |text| text.trim())
}

fn number(row: &[String], index: usize) -> f64 {
    cell(row, index)
        .replace(',', "")
        .parse()
        .ok()
        .filter(|n: &f64| n.is_finite())
        .unwrap_or(0.0)
}

fn timestamp(row: &[String], index: usize) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(cell(row, index)).map_or_else(
        |_| {
            debug!("Unparseable timestamp {:?}, using epoch", cell(row, index));
            DateTime::<Utc>::UNIX_EPOCH
        },
        |parsed| parsed.with_timezone(&Utc),
    )
}

fn text(row: &[String], index: usize) -> String {
    cell(row, index).to_string()
}

fn files(row: &[String], ids: usize, names: usize) -> Vec<FileRef> {
    let names: Vec<&str> = cell(row, names).split(FILE_SEPARATOR).collect();
    cell(row, ids)
        .split(FILE_SEPARATOR)
        .enumerate()
        .filter(|(_, id)| !id.trim().is_empty())
        .map(|(i, id)| {
            let name = names.get(i).copied().unwrap_or_default();
            FileRef::Remote(RemoteFile::new(id.trim(), name.trim()))
        })
        .collect()
}

/// File id and file name cells for a list of references.
///
/// Inline references have no remote id and are left out.
fn file_cells(files: &[FileRef]) -> (Value, Value) {
    let remote: Vec<&RemoteFile> = files
        .iter()
        .filter_map(|file| match file {
            FileRef::Remote(remote) => Some(remote),
            FileRef::Inline(inline) => {
                debug!("Skipping inline attachment {} in remote row", inline.name);
                None
            }
        })
        .collect();
    let ids: Vec<&str> = remote.iter().map(|file| file.id.as_str()).collect();
    let names: Vec<&str> = remote.iter().map(|file| file.name.as_str()).collect();
    (json!(ids.join(FILE_SEPARATOR)), json!(names.join(FILE_SEPARATOR)))
}

/// Whether a data row belongs to `professor`.
#[must_use]
pub fn belongs_to(row: &[String], professor: ProfessorId) -> bool {
    cell(row, 1) == professor.as_str()
}

/// Expense id stored in column A.
#[must_use]
pub fn row_id(row: &[String]) -> &str {
    cell(row, 0)
}

/// Encodes a record as a row of its category's table.
#[must_use]
pub fn encode_row(professor: ProfessorId, record: &ExpenseRecord) -> Vec<Value> {
    let id = json!(record.id.as_str());
    let owner = json!(professor.as_str());
    let created_at = json!(record.created_at.to_rfc3339());

    match &record.expense {
        Expense::MeetingPre(pre) | Expense::ActivityPre(pre) | Expense::MaterialsPre(pre) => {
            let (file_ids, file_names) = file_cells(&pre.files);
            vec![
                id,
                owner,
                json!(pre.upload_date.to_rfc3339()),
                file_ids,
                file_names,
                created_at,
            ]
        }
        Expense::Meeting(meeting) => {
            let (file_ids, file_names) = file_cells(&meeting.files);
            vec![
                id,
                owner,
                json!(meeting.date),
                json!(meeting.location),
                json!(meeting.card),
                json!(meeting.payment_date),
                json!(meeting.meeting_location),
                json!(meeting.meeting_date_time),
                json!(meeting.content),
                json!(meeting.attendees),
                json!(meeting.external_attendees),
                json!(meeting.amount),
                file_ids,
                file_names,
                created_at,
            ]
        }
        Expense::Activity(activity) => vec![
            id,
            owner,
            json!(activity.category),
            json!(activity.description),
            json!(activity.card),
            json!(activity.payment_date),
            json!(activity.total_amount),
            json!(activity.taxable_amount),
            json!(activity.vat),
            created_at,
        ],
        Expense::Materials(materials) => {
            let (file_ids, file_names) = file_cells(&materials.files);
            vec![
                id,
                owner,
                json!(materials.category),
                json!(materials.description),
                json!(materials.card),
                json!(materials.payment_date),
                json!(materials.unit_price),
                json!(materials.quantity),
                json!(materials.total_amount),
                json!(materials.taxable_amount),
                json!(materials.vat),
                created_at,
                json!(materials.registration_date),
                json!(materials.usage_time),
                file_ids,
                file_names,
            ]
        }
    }
}

/// Decodes a data row of `category`'s table. Rows without an id are skipped.
#[must_use]
pub fn decode_row(category: Category, row: &[String]) -> Option<ExpenseRecord> {
    let id = row_id(row);
    if id.is_empty() {
        return None;
    }

    let (expense, created_at) = match category {
        Category::MeetingPre | Category::ActivityPre | Category::MaterialsPre => {
            let pre = PreApplication {
                upload_date: timestamp(row, 2),
                files: files(row, 3, 4),
            };
            // rows written without 생성일 fall back to the upload date
            let created_at = if cell(row, 5).is_empty() {
                pre.upload_date
            } else {
                timestamp(row, 5)
            };
            let expense = match category {
                Category::MeetingPre => Expense::MeetingPre(pre),
                Category::ActivityPre => Expense::ActivityPre(pre),
                _ => Expense::MaterialsPre(pre),
            };
            (expense, created_at)
        }
        Category::Meeting => (
            Expense::Meeting(MeetingExpense {
                date: text(row, 2),
                location: text(row, 3),
                card: text(row, 4),
                payment_date: text(row, 5),
                meeting_location: text(row, 6),
                meeting_date_time: text(row, 7),
                content: text(row, 8),
                attendees: text(row, 9),
                external_attendees: text(row, 10),
                amount: number(row, 11),
                files: files(row, 12, 13),
            }),
            timestamp(row, 14),
        ),
        Category::Activity => (
            Expense::Activity(ActivityExpense {
                category: text(row, 2),
                description: text(row, 3),
                card: text(row, 4),
                payment_date: text(row, 5),
                total_amount: number(row, 6),
                taxable_amount: number(row, 7),
                vat: number(row, 8),
            }),
            timestamp(row, 9),
        ),
        Category::Materials => (
            Expense::Materials(MaterialsExpense {
                category: text(row, 2),
                description: text(row, 3),
                card: text(row, 4),
                payment_date: text(row, 5),
                unit_price: number(row, 6),
                quantity: number(row, 7),
                total_amount: number(row, 8),
                taxable_amount: number(row, 9),
                vat: number(row, 10),
                registration_date: text(row, 12),
                usage_time: text(row, 13),
                files: files(row, 14, 15),
            }),
            timestamp(row, 11),
        ),
    };

    Some(ExpenseRecord {
        id: ExpenseId::new(id),
        created_at,
        expense,
    })
}

/// Encodes a budget row.
#[must_use]
pub fn encode_budget(professor: ProfessorId, budget: Budget) -> Vec<Value> {
    vec![
        json!(professor.as_str()),
        json!(professor.display_name()),
        json!(budget.activity),
        json!(budget.materials),
    ]
}

/// Budget stored in a budget row.
#[must_use]
pub fn decode_budget(row: &[String]) -> Budget {
    Budget {
        activity: number(row, 2),
        materials: number(row, 3),
    }
}
