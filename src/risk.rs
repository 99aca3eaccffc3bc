use std::collections::HashMap;

use crate::models::{LostStudent, PeriodScope, Summary};

pub const LOST_THRESHOLD: usize = 3;

/// Students explicitly marked not-recorded in at least
/// [`LOST_THRESHOLD`] subject/period combinations within their class.
pub fn lost_students(summary: &Summary, scope: PeriodScope) -> Vec<LostStudent> {
    let mut lost = Vec::new();

    for (grade, section, periods) in summary.classes() {
        let mut order: Vec<&str> = Vec::new();
        let mut missing: HashMap<&str, Vec<String>> = HashMap::new();

        for period in scope.periods() {
            let Some(records) = periods.get(period) else {
                continue;
            };
            for (subject, record) in records {
                for student in &record.student_list {
                    if record.student_status.get(student) != Some(&false) {
                        continue;
                    }
                    let entry = missing.entry(student.as_str()).or_insert_with(|| {
                        order.push(student.as_str());
                        Vec::new()
                    });
                    entry.push(format!("{subject} ({period})"));
                }
            }
        }

        for name in order {
            let subjects = missing.remove(name).unwrap_or_default();
            if subjects.len() >= LOST_THRESHOLD {
                lost.push(LostStudent {
                    name: name.to_string(),
                    grade: grade.to_string(),
                    section: section.to_string(),
                    missing_count: subjects.len(),
                    missing_subjects: subjects,
                });
            }
        }
    }

    // Stable sort keeps encounter order between equal counts.
    lost.sort_by(|a, b| b.missing_count.cmp(&a.missing_count));
    lost
}
