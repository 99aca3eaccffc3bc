use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info, warn};

use crate::aggregate::{fold_rows, FoldStats, SheetLayout};
use crate::cell::{normalized_at, Cell};
use crate::columns::{locate_columns, subject_columns};
use crate::error::IngestError;
use crate::models::Summary;

pub type Rows = Vec<Vec<Cell>>;

// Zero-based positions of the fixed anchors in the gradebook export.
const GRADE_ANCHOR: (usize, usize) = (2, 1);
const SECTION_ANCHOR: (usize, usize) = (8, 1);
const HEADER_ROW: usize = 19;
const MIN_ROWS: usize = HEADER_ROW + 2;
pub const UNKNOWN_ANCHOR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutcome {
    pub grade: String,
    pub section: String,
    pub subjects: usize,
    pub stats: FoldStats,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<SheetOutcome, IngestError>,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub files: Vec<FileOutcome>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }
}

fn anchor(rows: &[Vec<Cell>], (row, col): (usize, usize)) -> String {
    let value = rows
        .get(row)
        .map(|cells| normalized_at(cells, col))
        .unwrap_or_default();
    if value.is_empty() {
        UNKNOWN_ANCHOR.to_string()
    } else {
        value
    }
}

/// Locates the layout of one gradebook sheet without touching any state.
pub fn sheet_layout(rows: &[Vec<Cell>]) -> Result<SheetLayout, IngestError> {
    if rows.len() < MIN_ROWS {
        return Err(IngestError::malformed(format!(
            "expected at least {MIN_ROWS} rows, found {}",
            rows.len()
        )));
    }

    let header = &rows[HEADER_ROW];
    let columns = locate_columns(header, &rows[HEADER_ROW + 1])?;
    let subjects = subject_columns(header, columns);

    Ok(SheetLayout {
        grade: anchor(rows, GRADE_ANCHOR),
        section: anchor(rows, SECTION_ANCHOR),
        columns,
        subjects,
    })
}

/// Merges one sheet's row matrix into the summary. A malformed sheet
/// leaves the summary untouched.
pub fn ingest_sheet(
    rows: &[Vec<Cell>],
    summary: &mut Summary,
) -> Result<SheetOutcome, IngestError> {
    let layout = sheet_layout(rows)?;
    debug!(
        grade = %layout.grade,
        section = %layout.section,
        period_col = layout.columns.period,
        name_col = layout.columns.name,
        subjects = layout.subjects.len(),
        "located gradebook columns"
    );

    let stats = fold_rows(summary, &layout, &rows[HEADER_ROW + 1..]);
    Ok(SheetOutcome {
        grade: layout.grade,
        section: layout.section,
        subjects: layout.subjects.len(),
        stats,
    })
}

/// Reads the first worksheet of any workbook format as an anchored grid:
/// row and column zero always correspond to cell A1.
pub fn read_first_sheet(path: &Path) -> Result<Rows, IngestError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::unreadable(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::unreadable(path, "workbook has no worksheets"))?
        .map_err(|e| IngestError::unreadable(path, e))?;
    Ok(range_to_rows(&range))
}

pub fn range_to_rows(range: &Range<Data>) -> Rows {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Rows = vec![Vec::new(); row_offset];
    for cells in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(cells.iter().map(Cell::from));
        while matches!(row.last(), Some(Cell::Empty)) {
            row.pop();
        }
        rows.push(row);
    }
    rows
}

/// Reads every file concurrently, then merges the results one at a time
/// in the order the files were given. Failures are collected per file.
pub async fn ingest_files(paths: &[PathBuf], summary: &mut Summary) -> BatchOutcome {
    let reads: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| tokio::task::spawn_blocking(move || read_first_sheet(&path)))
        .collect();

    let mut outcome = BatchOutcome::default();
    for (path, read) in paths.iter().zip(reads) {
        let rows = match read.await {
            Ok(rows) => rows,
            Err(join_err) => Err(IngestError::unreadable(path, join_err)),
        };
        let result = rows.and_then(|rows| ingest_sheet(&rows, summary));

        match &result {
            Ok(sheet) => info!(
                file = %path.display(),
                grade = %sheet.grade,
                section = %sheet.section,
                rows = sheet.stats.rows_used,
                "merged gradebook"
            ),
            Err(err) => warn!(file = %path.display(), error = %err, "skipped gradebook"),
        }
        outcome.files.push(FileOutcome {
            path: path.clone(),
            result,
        });
    }
    outcome
}
