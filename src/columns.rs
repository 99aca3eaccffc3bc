use crate::cell::{normalize, Cell};
use crate::error::IngestError;
use crate::models::Period;

const PERIOD_KEYWORDS: &[&str] = &["الفترة", "period"];
const NAME_KEYWORDS: &[&str] = &["الاسم", "اسم الطالب", "name", "student"];
const ADMIN_HEADERS: &[&str] = &[
    "م",
    "#",
    "no",
    "no.",
    "السلوك",
    "behavior",
    "behaviour",
    "المواظبة",
    "attendance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub period: usize,
    pub name: usize,
}

impl Columns {
    /// Header columns strictly left of both located columns.
    pub fn subject_limit(&self) -> usize {
        self.period.min(self.name)
    }
}

/// Finds the period and student-name columns of one sheet.
///
/// The first data row is sniffed for a recognized period token; the name
/// column sits immediately to its right. Failing that, header text is
/// searched for period and name keywords independently.
pub fn locate_columns(header: &[Cell], first_data_row: &[Cell]) -> Result<Columns, IngestError> {
    let sniffed = first_data_row
        .iter()
        .position(|cell| Period::from_token(&normalize(Some(cell))).is_some());
    if let Some(period) = sniffed {
        return Ok(Columns {
            period,
            name: period + 1,
        });
    }

    let period = find_header(header, PERIOD_KEYWORDS);
    let name = find_header(header, NAME_KEYWORDS);
    match (period, name) {
        (Some(period), Some(name)) => Ok(Columns { period, name }),
        (None, _) => Err(IngestError::malformed("period column not found")),
        (_, None) => Err(IngestError::malformed("student name column not found")),
    }
}

fn find_header(header: &[Cell], keywords: &[&str]) -> Option<usize> {
    header.iter().position(|cell| {
        let text = normalize(Some(cell)).to_lowercase();
        !text.is_empty() && keywords.iter().any(|keyword| text.contains(keyword))
    })
}

/// Subject columns with their normalized header, skipping blanks and the
/// administrative columns of the export.
pub fn subject_columns(header: &[Cell], columns: Columns) -> Vec<(usize, String)> {
    let name_header = normalize(header.get(columns.name)).to_lowercase();
    let period_header = normalize(header.get(columns.period)).to_lowercase();

    header
        .iter()
        .take(columns.subject_limit())
        .enumerate()
        .filter_map(|(idx, cell)| {
            let subject = normalize(Some(cell));
            let key = subject.to_lowercase();
            let excluded = subject.is_empty()
                || ADMIN_HEADERS.contains(&key.as_str())
                || key == name_header
                || key == period_header;
            (!excluded).then_some((idx, subject))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::from(*v)).collect()
    }

    #[test]
    fn period_token_in_first_data_row_wins() {
        let header = row(&["Science", "English", "Period", "Name"]);
        let data = vec![
            Cell::Number(1.0),
            Cell::Number(0.0),
            Cell::text("first"),
            Cell::text("Ali"),
        ];
        let columns = locate_columns(&header, &data).unwrap();
        assert_eq!(columns, Columns { period: 2, name: 3 });
    }

    #[test]
    fn header_keywords_are_the_fallback() {
        let header = row(&["م", "Math", "اسم الطالب", "الفترة"]);
        let data = row(&["1", "", "", ""]);
        let columns = locate_columns(&header, &data).unwrap();
        assert_eq!(columns, Columns { period: 3, name: 2 });
        assert_eq!(columns.subject_limit(), 2);
    }

    #[test]
    fn missing_name_column_is_malformed() {
        let header = row(&["Math", "Period"]);
        let err = locate_columns(&header, &row(&["", ""])).unwrap_err();
        assert!(matches!(err, IngestError::MalformedSheet { .. }));
    }

    #[test]
    fn missing_period_column_is_malformed() {
        let header = row(&["Math", "Student"]);
        let err = locate_columns(&header, &[]).unwrap_err();
        assert!(matches!(err, IngestError::MalformedSheet { .. }));
    }

    #[test]
    fn administrative_headers_are_not_subjects() {
        let header = row(&[
            "م",
            "Math",
            "",
            "السلوك",
            "Attendance",
            "Science",
            "Period",
            "Name",
        ]);
        let subjects = subject_columns(&header, Columns { period: 6, name: 7 });
        assert_eq!(
            subjects,
            vec![(1, "Math".to_string()), (5, "Science".to_string())]
        );
    }
}
