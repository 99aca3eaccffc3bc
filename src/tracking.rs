use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{Period, PeriodScope, Summary};

pub const DEFAULT_STUDENTS_PER_PAGE: usize = 35;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingPage {
    pub grade: String,
    pub section: String,
    pub period: Period,
    pub subjects: Vec<String>,
    pub students: Vec<String>,
    pub page: usize,
    pub total_pages: usize,
    pub start_index: usize,
}

/// Splits every class/period into printable pages of students against
/// the class's subjects. Classes are visited in key order and, for the
/// two-period scope, the first period's pages precede the second's.
pub fn tracking_pages(
    summary: &Summary,
    scope: PeriodScope,
    per_page: usize,
) -> Vec<TrackingPage> {
    let per_page = per_page.max(1);
    let mut pages = Vec::new();

    for (grade, section, periods) in summary.classes() {
        for &period in scope.periods() {
            let Some(records) = periods.get(&period) else {
                continue;
            };
            if records.is_empty() {
                continue;
            }

            let subjects: Vec<String> = records.keys().cloned().collect();
            let students: Vec<String> = records
                .values()
                .flat_map(|record| record.student_list.iter().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let total_pages = students.len().div_ceil(per_page);
            for (idx, chunk) in students.chunks(per_page).enumerate() {
                pages.push(TrackingPage {
                    grade: grade.to_string(),
                    section: section.to_string(),
                    period,
                    subjects: subjects.clone(),
                    students: chunk.to_vec(),
                    page: idx + 1,
                    total_pages,
                    start_index: idx * per_page,
                });
            }
        }
    }
    pages
}

/// A student's status for one subject on a page: `None` when the student
/// never had a meaningful mark for it.
pub fn status(
    summary: &Summary,
    page: &TrackingPage,
    subject: &str,
    student: &str,
) -> Option<bool> {
    summary
        .record(&page.grade, &page.section, page.period, subject)?
        .student_status
        .get(student)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mark;

    fn summary_with_students(count: usize) -> Summary {
        let mut summary = Summary::default();
        let periods = summary.section_mut("Grade7", "1");
        let math = periods
            .entry(Period::First)
            .or_default()
            .entry("Math".to_string())
            .or_default();
        for i in 0..count {
            let mark = if i % 2 == 0 { Mark::Recorded } else { Mark::NotRecorded };
            math.apply(&format!("student-{i:03}"), mark);
        }
        periods
            .entry(Period::First)
            .or_default()
            .entry("Art".to_string())
            .or_default()
            .apply("zed", Mark::Recorded);
        summary
    }

    #[test]
    fn students_are_paged_in_sorted_order() {
        let summary = summary_with_students(70);
        let pages = tracking_pages(&summary, PeriodScope::Both, DEFAULT_STUDENTS_PER_PAGE);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].subjects, vec!["Art".to_string(), "Math".to_string()]);
        assert_eq!(pages[0].students[0], "student-000");
        assert_eq!(pages[1].start_index, 35);
        assert_eq!(pages[2].students, vec!["zed".to_string()]);
        assert!(pages.iter().all(|p| p.total_pages == 3));
    }

    #[test]
    fn status_distinguishes_missing_from_unreached() {
        let summary = summary_with_students(2);
        let pages = tracking_pages(&summary, PeriodScope::First, 10);
        let page = &pages[0];
        assert_eq!(status(&summary, page, "Math", "student-000"), Some(true));
        assert_eq!(status(&summary, page, "Math", "student-001"), Some(false));
        assert_eq!(status(&summary, page, "Art", "student-000"), None);
    }

    #[test]
    fn periods_outside_scope_produce_no_pages() {
        let summary = summary_with_students(5);
        assert!(tracking_pages(&summary, PeriodScope::Second, 10).is_empty());
    }
}
