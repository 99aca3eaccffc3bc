use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::analytics::{self, Heatmap};
use crate::models::{
    LostStudent, Period, PeriodScope, RollupRow, Snapshot, Summary, TeacherAssignment,
};
use crate::risk;

pub const UNASSIGNED: &str = "unassigned";

/// Completion tier used by the per-class subject tables.
pub fn completion_tier(percentage: f64) -> &'static str {
    if percentage >= 100.0 {
        "complete"
    } else if percentage >= 70.0 {
        "partial"
    } else {
        "behind"
    }
}

/// One row per grade/section/period/subject, both periods, key order.
pub fn rollup_rows(summary: &Summary, teachers: &TeacherAssignment) -> Vec<RollupRow> {
    let mut rows = Vec::new();
    for (grade, section, periods) in summary.classes() {
        for period in Period::ALL {
            let Some(records) = periods.get(&period) else {
                continue;
            };
            for (subject, record) in records {
                rows.push(RollupRow {
                    grade: grade.to_string(),
                    section: section.to_string(),
                    period,
                    subject: subject.clone(),
                    student_count: record.total(),
                    recorded_count: record.recorded_count,
                    not_recorded_count: record.not_recorded_count,
                    percentage: record.percentage,
                    teachers: teachers.teachers(grade, section, subject).to_vec(),
                });
            }
        }
    }
    rows
}

fn teacher_label(teachers: &[String]) -> String {
    if teachers.is_empty() {
        UNASSIGNED.to_string()
    } else {
        teachers.join(", ")
    }
}

/// Largest positive movements since the snapshot, best first.
pub fn top_improvements(heatmap: &Heatmap, limit: usize) -> Vec<(String, String, String, f64)> {
    let mut moves: Vec<(String, String, String, f64)> = heatmap
        .rows
        .iter()
        .flat_map(|row| {
            row.cells.iter().filter_map(move |(subject, cell)| {
                cell.trend()
                    .filter(|delta| *delta > 0.0)
                    .map(|delta| (row.grade.clone(), row.section.clone(), subject.clone(), delta))
            })
        })
        .collect();
    moves.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));
    moves.truncate(limit);
    moves
}

pub fn build_report(
    summary: &Summary,
    teachers: &TeacherAssignment,
    snapshot: Option<&Snapshot>,
    scope: PeriodScope,
    generated_at: DateTime<Utc>,
) -> String {
    let stats = analytics::rollup_stats(summary, teachers, scope);
    let heatmap = analytics::heatmap(summary, snapshot, scope);
    let lost = risk::lost_students(summary, scope);

    let mut output = String::new();

    let _ = writeln!(output, "# Grade Entry Completion Report");
    let _ = writeln!(
        output,
        "Generated {} for {}",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        scope.label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Completion: {}% ({} of {} entries recorded)",
        stats.percentage, stats.recorded, stats.total
    );
    let _ = writeln!(output, "- Students: {}", stats.student_count);
    let _ = writeln!(output, "- Subjects: {}", stats.subject_count);
    let _ = writeln!(output, "- Teachers: {}", stats.teacher_count);
    let _ = writeln!(output, "- Classes: {}", stats.class_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects by Class");

    let rows: Vec<RollupRow> = rollup_rows(summary, teachers)
        .into_iter()
        .filter(|row| scope.periods().contains(&row.period))
        .collect();
    if rows.is_empty() {
        let _ = writeln!(output, "No gradebooks ingested yet.");
    } else {
        let mut current: Option<(&str, &str, Period)> = None;
        for row in &rows {
            let key = (row.grade.as_str(), row.section.as_str(), row.period);
            if current != Some(key) {
                current = Some(key);
                let _ = writeln!(output);
                let _ = writeln!(
                    output,
                    "### {} / section {} ({} period)",
                    row.grade, row.section, row.period
                );
                let _ = writeln!(output, "| Subject | Teachers | Recorded | Percentage | Status |");
                let _ = writeln!(output, "|---|---|---|---|---|");
            }
            let _ = writeln!(
                output,
                "| {} | {} | {} / {} | {}% | {} |",
                row.subject,
                teacher_label(&row.teachers),
                row.recorded_count,
                row.student_count,
                row.percentage,
                completion_tier(row.percentage)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress Since Baseline");
    match snapshot {
        None => {
            let _ = writeln!(output, "No baseline snapshot captured yet.");
        }
        Some(snapshot) => {
            let improvements = top_improvements(&heatmap, 10);
            let _ = writeln!(
                output,
                "Baseline captured {}.",
                snapshot.captured_at.format("%Y-%m-%d %H:%M UTC")
            );
            if improvements.is_empty() {
                let _ = writeln!(output, "No subject improved since the baseline.");
            } else {
                for (grade, section, subject, delta) in improvements {
                    let _ = writeln!(output, "- {grade} / {section} {subject}: +{delta}");
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Missing Grades");
    write_lost(&mut output, &lost);

    output
}

fn write_lost(output: &mut String, lost: &[LostStudent]) {
    if lost.is_empty() {
        let _ = writeln!(
            output,
            "No students missing grades in {} or more subjects.",
            risk::LOST_THRESHOLD
        );
        return;
    }
    for student in lost {
        let _ = writeln!(
            output,
            "- {} ({} / {}): {} missing - {}",
            student.name,
            student.grade,
            student.section,
            student.missing_count,
            student.missing_subjects.join(", ")
        );
    }
}
