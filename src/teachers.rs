use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::cell::{normalized_at, Cell};
use crate::ingest::{read_first_sheet, Rows};
use crate::models::TeacherAssignment;

/// Builds the assignment index from `(teacher, grade, subject, section)`
/// rows. The first row is a header; rows shorter than four cells are
/// skipped.
pub fn build_assignment(rows: &[Vec<Cell>]) -> TeacherAssignment {
    let mut mapping = TeacherAssignment::default();
    for row in rows.iter().skip(1) {
        if row.len() < 4 {
            continue;
        }
        let teacher = normalized_at(row, 0);
        let grade = normalized_at(row, 1);
        let subject = normalized_at(row, 2);
        let section = normalized_at(row, 3);
        mapping.assign(&grade, &section, &subject, &teacher);
    }
    mapping
}

fn read_csv(path: &Path) -> anyhow::Result<Rows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<Cell> = record.iter().map(Cell::from).collect();
        while matches!(row.last(), Some(Cell::Empty)) {
            row.pop();
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Loads a teacher-assignment file. `.csv` files are read as text, any
/// other extension goes through the workbook reader.
pub fn load_assignment(path: &Path) -> anyhow::Result<TeacherAssignment> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let rows = if is_csv {
        read_csv(path)?
    } else {
        read_first_sheet(path)?
    };
    let mapping = build_assignment(&rows);
    info!(
        file = %path.display(),
        grades = mapping.grades.len(),
        "loaded teacher assignments"
    );
    Ok(mapping)
}
