use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::models::{
    completion_percentage, round_to, PeriodMap, PeriodScope, Snapshot, Summary, TeacherAssignment,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupStats {
    pub recorded: u32,
    pub not_recorded: u32,
    pub total: u32,
    pub percentage: f64,
    pub student_count: usize,
    pub subject_count: usize,
    pub teacher_count: usize,
    pub class_count: usize,
}

pub fn rollup_stats(
    summary: &Summary,
    teachers: &TeacherAssignment,
    scope: PeriodScope,
) -> RollupStats {
    let mut stats = RollupStats::default();
    let mut students: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut subjects: HashSet<&str> = HashSet::new();
    let mut teacher_names: HashSet<&str> = HashSet::new();

    for (grade, section, periods) in summary.classes() {
        stats.class_count += 1;
        for period in scope.periods() {
            let Some(records) = periods.get(period) else {
                continue;
            };
            for (subject, record) in records {
                subjects.insert(subject.as_str());
                stats.recorded += record.recorded_count;
                stats.not_recorded += record.not_recorded_count;
                for student in &record.student_list {
                    students.insert((grade, section, student.as_str()));
                }
                for teacher in teachers.teachers(grade, section, subject) {
                    teacher_names.insert(teacher.as_str());
                }
            }
        }
    }

    stats.total = stats.recorded + stats.not_recorded;
    stats.percentage = completion_percentage(stats.recorded, stats.not_recorded);
    stats.student_count = students.len();
    stats.subject_count = subjects.len();
    stats.teacher_count = teacher_names.len();
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Band {
    Complete,
    NearComplete,
    Mid,
    Low,
    Critical,
}

impl Band {
    pub fn for_percentage(percentage: f64) -> Band {
        if percentage >= 100.0 {
            Band::Complete
        } else if percentage >= 80.0 {
            Band::NearComplete
        } else if percentage >= 50.0 {
            Band::Mid
        } else if percentage >= 25.0 {
            Band::Low
        } else {
            Band::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Complete => "complete",
            Band::NearComplete => "near-complete",
            Band::Mid => "mid",
            Band::Low => "low",
            Band::Critical => "critical",
        }
    }
}

/// Signed change since the snapshot, rounded to one decimal. `None` when
/// there is no baseline or nothing moved.
pub fn trend(current: f64, previous: Option<f64>) -> Option<f64> {
    let previous = previous?;
    if current == previous {
        return None;
    }
    Some(round_to(current - previous, 1))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub current: f64,
    pub previous: Option<f64>,
}

impl HeatCell {
    pub fn band(&self) -> Band {
        Band::for_percentage(self.current)
    }

    pub fn trend(&self) -> Option<f64> {
        trend(self.current, self.previous)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatRow {
    pub grade: String,
    pub section: String,
    pub cells: BTreeMap<String, HeatCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Heatmap {
    pub subjects: Vec<String>,
    pub rows: Vec<HeatRow>,
}

/// Completion of one subject over the periods in scope. Counts are summed
/// before the percentage is derived, so a single-period scope reports the
/// record's own percentage.
fn scoped_percentage(periods: &PeriodMap, scope: PeriodScope, subject: &str) -> Option<f64> {
    let mut found = false;
    let (mut recorded, mut not_recorded) = (0, 0);
    for period in scope.periods() {
        if let Some(record) = periods.get(period).and_then(|records| records.get(subject)) {
            found = true;
            recorded += record.recorded_count;
            not_recorded += record.not_recorded_count;
        }
    }
    found.then(|| completion_percentage(recorded, not_recorded))
}

pub fn heatmap(summary: &Summary, snapshot: Option<&Snapshot>, scope: PeriodScope) -> Heatmap {
    let mut subjects: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::new();

    for (grade, section, periods) in summary.classes() {
        let baseline = snapshot
            .and_then(|s| s.summary.grades.get(grade))
            .and_then(|sections| sections.get(section));

        let mut cells = BTreeMap::new();
        let names: BTreeSet<&String> = scope
            .periods()
            .iter()
            .filter_map(|period| periods.get(period))
            .flat_map(|records| records.keys())
            .collect();
        for subject in names {
            subjects.insert(subject.clone());
            let Some(current) = scoped_percentage(periods, scope, subject) else {
                continue;
            };
            let previous = baseline.and_then(|old| scoped_percentage(old, scope, subject));
            cells.insert(subject.clone(), HeatCell { current, previous });
        }

        rows.push(HeatRow {
            grade: grade.to_string(),
            section: section.to_string(),
            cells,
        });
    }

    Heatmap {
        subjects: subjects.into_iter().collect(),
        rows,
    }
}

/// Captures the trend baseline the first time a non-empty summary is
/// observed. Returns true when a new snapshot was taken.
pub fn observe_snapshot(snapshot: &mut Option<Snapshot>, summary: &Summary) -> bool {
    if snapshot.is_some() || summary.is_empty() {
        return false;
    }
    *snapshot = Some(capture(summary));
    info!("captured trend baseline snapshot");
    true
}

/// Replaces the baseline with the current summary.
pub fn reset_snapshot(snapshot: &mut Option<Snapshot>, summary: &Summary) {
    *snapshot = Some(capture(summary));
    info!("trend baseline reset to current summary");
}

fn capture(summary: &Summary) -> Snapshot {
    Snapshot {
        captured_at: Utc::now(),
        summary: summary.clone(),
    }
}
