use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::models::{LostStudent, RollupRow};

#[derive(Serialize)]
struct RollupCsvRow<'a> {
    grade: &'a str,
    section: &'a str,
    period: &'a str,
    subject: &'a str,
    student_count: u32,
    recorded_count: u32,
    not_recorded_count: u32,
    percentage: f64,
    teachers: String,
}

#[derive(Serialize)]
struct LostCsvRow<'a> {
    name: &'a str,
    grade: &'a str,
    section: &'a str,
    missing_count: usize,
    missing_subjects: String,
}

pub fn write_rollup_csv(path: &Path, rows: &[RollupRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(RollupCsvRow {
            grade: &row.grade,
            section: &row.section,
            period: row.period.label(),
            subject: &row.subject,
            student_count: row.student_count,
            recorded_count: row.recorded_count,
            not_recorded_count: row.not_recorded_count,
            percentage: row.percentage,
            teachers: row.teachers.join(", "),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_lost_csv(path: &Path, students: &[LostStudent]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for student in students {
        writer.serialize(LostCsvRow {
            name: &student.name,
            grade: &student.grade,
            section: &student.section,
            missing_count: student.missing_count,
            missing_subjects: student.missing_subjects.join(" - "),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `rollup.csv` and `lost_students.csv` into `dir`.
pub fn export_all(
    dir: &Path,
    rollup: &[RollupRow],
    lost: &[LostStudent],
) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let rollup_path = dir.join("rollup.csv");
    let lost_path = dir.join("lost_students.csv");
    write_rollup_csv(&rollup_path, rollup)?;
    write_lost_csv(&lost_path, lost)?;
    Ok((rollup_path, lost_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    #[test]
    fn export_writes_both_tables_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let rollup = vec![RollupRow {
            grade: "Grade7".to_string(),
            section: "1".to_string(),
            period: Period::Second,
            subject: "Math".to_string(),
            student_count: 4,
            recorded_count: 3,
            not_recorded_count: 1,
            percentage: 75.0,
            teachers: vec!["Huda".to_string(), "Omar".to_string()],
        }];
        let lost = vec![LostStudent {
            name: "Ali".to_string(),
            grade: "Grade7".to_string(),
            section: "1".to_string(),
            missing_count: 3,
            missing_subjects: vec!["Art (first)".to_string(), "Math (first)".to_string()],
        }];

        let (rollup_path, lost_path) = export_all(&dir.path().join("out"), &rollup, &lost).unwrap();

        let rollup_csv = std::fs::read_to_string(rollup_path).unwrap();
        let mut lines = rollup_csv.lines();
        assert_eq!(
            lines.next(),
            Some("grade,section,period,subject,student_count,recorded_count,not_recorded_count,percentage,teachers")
        );
        assert_eq!(lines.next(), Some("Grade7,1,second,Math,4,3,1,75.0,\"Huda, Omar\""));

        let lost_csv = std::fs::read_to_string(lost_path).unwrap();
        assert!(lost_csv.starts_with("name,grade,section,missing_count,missing_subjects"));
        assert!(lost_csv.contains("Ali,Grade7,1,3,Art (first) - Math (first)"));
    }
}
