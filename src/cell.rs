use calamine::Data;

/// A worksheet cell as the ingestion layer sees it, detached from the
/// workbook reader so row fixtures can be built by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::Bool(v) => Cell::Bool(*v),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::text(value)
        }
    }
}

/// Canonical trimmed text of a cell. Non-breaking spaces become plain
/// spaces before trimming; an absent cell is the empty string.
pub fn normalize(cell: Option<&Cell>) -> String {
    let raw = match cell {
        None | Some(Cell::Empty) => return String::new(),
        Some(Cell::Number(v)) => v.to_string(),
        Some(Cell::Text(s)) => s.clone(),
        Some(Cell::Bool(b)) => b.to_string(),
    };
    raw.replace('\u{00A0}', " ").trim().to_string()
}

/// Cell at `col` of `row`, tolerating ragged rows.
pub fn cell_at(row: &[Cell], col: usize) -> Option<&Cell> {
    row.get(col)
}

pub fn normalized_at(row: &[Cell], col: usize) -> String {
    normalize(cell_at(row, col))
}
