use std::collections::BTreeSet;

use tracing::debug;

use crate::cell::{normalize, normalized_at, Cell};
use crate::columns::Columns;
use crate::models::{Mark, Period, Summary};

/// Everything the aggregator needs to know about one sheet's layout.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub grade: String,
    pub section: String,
    pub columns: Columns,
    pub subjects: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub rows_used: usize,
    pub marks_applied: usize,
}

/// Tri-state reading of a grade-entry cell: positive numbers are
/// recorded, an exact zero is not recorded, anything else is ignored.
pub fn classify(cell: Option<&Cell>) -> Option<Mark> {
    match cell? {
        Cell::Number(value) if *value > 0.0 => Some(Mark::Recorded),
        Cell::Number(value) if *value == 0.0 => Some(Mark::NotRecorded),
        Cell::Text(_) if normalize(cell) == "0" => Some(Mark::NotRecorded),
        _ => None,
    }
}

/// Carries the last non-blank name forward so continuation rows with a
/// merged or blank name cell still belong to that student.
#[derive(Debug, Clone, Default)]
pub struct StudentCursor {
    current: Option<String>,
}

impl StudentCursor {
    pub fn advance(self, name_cell: Option<&Cell>) -> Self {
        let name = normalize(name_cell);
        if name.is_empty() {
            self
        } else {
            StudentCursor {
                current: Some(name),
            }
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Folds one sheet's data rows into the summary, then recomputes the
/// percentage of every subject record the sheet touched.
pub fn fold_rows(summary: &mut Summary, layout: &SheetLayout, rows: &[Vec<Cell>]) -> FoldStats {
    let mut stats = FoldStats::default();
    let mut touched: BTreeSet<(Period, String)> = BTreeSet::new();
    let mut cursor = StudentCursor::default();
    let periods = summary.section_mut(&layout.grade, &layout.section);

    for row in rows {
        cursor = cursor.advance(row.get(layout.columns.name));
        let Some(student) = cursor.current() else {
            continue;
        };
        let Some(period) = Period::from_token(&normalized_at(row, layout.columns.period)) else {
            continue;
        };
        stats.rows_used += 1;

        let subjects = periods.entry(period).or_default();
        for (col, subject) in &layout.subjects {
            let record = subjects.entry(subject.clone()).or_default();
            touched.insert((period, subject.clone()));
            if let Some(mark) = classify(row.get(*col)) {
                record.apply(student, mark);
                stats.marks_applied += 1;
            }
        }
    }

    for (period, subject) in &touched {
        if let Some(record) = periods
            .get_mut(period)
            .and_then(|subjects| subjects.get_mut(subject))
        {
            record.recalculate();
        }
    }

    debug!(
        grade = %layout.grade,
        section = %layout.section,
        rows = stats.rows_used,
        marks = stats.marks_applied,
        "folded sheet rows"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layout() -> SheetLayout {
        SheetLayout {
            grade: "Grade7".to_string(),
            section: "1".to_string(),
            columns: Columns { period: 2, name: 3 },
            subjects: vec![(0, "Science".to_string()), (1, "English".to_string())],
        }
    }

    fn row(science: Cell, english: Cell, period: &str, name: &str) -> Vec<Cell> {
        vec![science, english, Cell::from(period), Cell::from(name)]
    }

    #[test]
    fn recorded_and_not_recorded_marks_are_counted() {
        let mut summary = Summary::default();
        let rows = vec![row(Cell::Number(1.0), Cell::Number(0.0), "first", "Ali")];
        fold_rows(&mut summary, &layout(), &rows);

        let science = summary.record("Grade7", "1", Period::First, "Science").unwrap();
        assert_eq!((science.recorded_count, science.not_recorded_count), (1, 0));
        assert_eq!(science.percentage, 100.0);

        let english = summary.record("Grade7", "1", Period::First, "English").unwrap();
        assert_eq!((english.recorded_count, english.not_recorded_count), (0, 1));
        assert_eq!(english.percentage, 0.0);
    }

    #[test]
    fn ambiguous_cells_never_contribute() {
        let mut summary = Summary::default();
        let rows = vec![
            row(Cell::Empty, Cell::text("exempt"), "first", "Ali"),
            row(Cell::Number(-1.0), Cell::Bool(true), "first", "Sara"),
        ];
        fold_rows(&mut summary, &layout(), &rows);

        for subject in ["Science", "English"] {
            let record = summary.record("Grade7", "1", Period::First, subject).unwrap();
            assert_eq!(record.total(), 0);
            assert!(record.student_list.is_empty());
            assert!(record.student_status.is_empty());
        }
    }

    #[test]
    fn classification_covers_the_whole_cell_domain() {
        assert_eq!(classify(Some(&Cell::Number(0.0))), Some(Mark::NotRecorded));
        assert_eq!(classify(Some(&Cell::text(" 0 "))), Some(Mark::NotRecorded));
        assert_eq!(classify(Some(&Cell::Number(0.5))), Some(Mark::Recorded));
        assert_eq!(classify(Some(&Cell::Number(12.0))), Some(Mark::Recorded));
        assert_eq!(classify(Some(&Cell::Number(-3.0))), None);
        assert_eq!(classify(Some(&Cell::text("1"))), None);
        assert_eq!(classify(Some(&Cell::text("absent"))), None);
        assert_eq!(classify(Some(&Cell::Bool(false))), None);
        assert_eq!(classify(Some(&Cell::Empty)), None);
        assert_eq!(classify(None), None);
    }

    #[test]
    fn blank_name_cells_continue_the_previous_student() {
        let mut summary = Summary::default();
        let rows = vec![
            row(Cell::Number(1.0), Cell::Number(1.0), "first", "Ali"),
            row(Cell::Number(0.0), Cell::Number(1.0), "second", ""),
        ];
        fold_rows(&mut summary, &layout(), &rows);

        let second = summary.record("Grade7", "1", Period::Second, "Science").unwrap();
        assert_eq!(second.student_status.get("Ali"), Some(&false));
    }

    #[test]
    fn rows_before_any_student_or_with_unknown_periods_are_skipped() {
        let mut summary = Summary::default();
        let rows = vec![
            row(Cell::Number(1.0), Cell::Number(1.0), "first", ""),
            row(Cell::Number(1.0), Cell::Number(1.0), "third", "Ali"),
        ];
        let stats = fold_rows(&mut summary, &layout(), &rows);
        assert_eq!(stats.rows_used, 0);
        assert!(summary.record("Grade7", "1", Period::First, "Science").is_none());
    }

    #[test]
    fn folding_the_same_rows_twice_keeps_counts() {
        let mut summary = Summary::default();
        let rows = vec![
            row(Cell::Number(1.0), Cell::Number(0.0), "first", "Ali"),
            row(Cell::Number(0.0), Cell::Number(0.0), "first", "Sara"),
        ];
        fold_rows(&mut summary, &layout(), &rows);
        let once = summary.clone();
        fold_rows(&mut summary, &layout(), &rows);
        assert_eq!(summary, once);
    }

    #[test]
    fn corrected_upload_flips_status_without_double_counting() {
        let mut summary = Summary::default();
        fold_rows(
            &mut summary,
            &layout(),
            &[row(Cell::Number(0.0), Cell::Empty, "first", "Ali")],
        );
        fold_rows(
            &mut summary,
            &layout(),
            &[row(Cell::Number(4.0), Cell::Empty, "first", "Ali")],
        );

        let science = summary.record("Grade7", "1", Period::First, "Science").unwrap();
        assert_eq!((science.recorded_count, science.not_recorded_count), (1, 0));
        assert_eq!(science.percentage, 100.0);
    }

    #[test]
    fn counts_always_match_student_status() {
        let mut summary = Summary::default();
        let rows = vec![
            row(Cell::Number(1.0), Cell::Number(0.0), "first", "Ali"),
            row(Cell::Number(0.0), Cell::text("x"), "first", "Sara"),
            row(Cell::Number(2.0), Cell::Number(0.0), "first", "Sara"),
            row(Cell::Empty, Cell::Number(3.0), "second", "Omar"),
        ];
        fold_rows(&mut summary, &layout(), &rows);

        for (_, _, periods) in summary.classes() {
            for subjects in periods.values() {
                for record in subjects.values() {
                    assert_eq!(record.total() as usize, record.student_status.len());
                    let listed: BTreeSet<_> = record.student_list.iter().collect();
                    let keyed: BTreeSet<_> = record.student_status.keys().collect();
                    assert_eq!(listed, keyed);
                }
            }
        }
    }
}
