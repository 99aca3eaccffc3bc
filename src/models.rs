use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    First,
    Second,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::First, Period::Second];

    /// Maps a normalized period cell to a recognized period. The export
    /// writes the Arabic ordinals; English labels are accepted as well.
    pub fn from_token(token: &str) -> Option<Period> {
        match token {
            "أولى" | "الأولى" => Some(Period::First),
            "ثانية" | "الثانية" => Some(Period::Second),
            other if other.eq_ignore_ascii_case("first") => Some(Period::First),
            other if other.eq_ignore_ascii_case("second") => Some(Period::Second),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::First => "first",
            Period::Second => "second",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PeriodScope {
    First,
    Second,
    #[default]
    Both,
}

impl PeriodScope {
    pub fn periods(self) -> &'static [Period] {
        match self {
            PeriodScope::First => &[Period::First],
            PeriodScope::Second => &[Period::Second],
            PeriodScope::Both => &Period::ALL,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodScope::First => "first period",
            PeriodScope::Second => "second period",
            PeriodScope::Both => "both periods",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Recorded,
    NotRecorded,
}

impl Mark {
    pub fn is_recorded(self) -> bool {
        matches!(self, Mark::Recorded)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub recorded_count: u32,
    pub not_recorded_count: u32,
    pub percentage: f64,
    pub student_status: BTreeMap<String, bool>,
    pub student_list: Vec<String>,
}

impl SubjectRecord {
    pub fn total(&self) -> u32 {
        self.recorded_count + self.not_recorded_count
    }

    /// Applies one student's mark. A student already present only moves
    /// between the two counters when the status flips.
    pub fn apply(&mut self, student: &str, mark: Mark) {
        let recorded = mark.is_recorded();
        match self.student_status.insert(student.to_string(), recorded) {
            Some(previous) if previous == recorded => {}
            Some(previous) => {
                if previous {
                    self.recorded_count = self.recorded_count.saturating_sub(1);
                    self.not_recorded_count += 1;
                } else {
                    self.not_recorded_count = self.not_recorded_count.saturating_sub(1);
                    self.recorded_count += 1;
                }
            }
            None => {
                self.student_list.push(student.to_string());
                if recorded {
                    self.recorded_count += 1;
                } else {
                    self.not_recorded_count += 1;
                }
            }
        }
    }

    /// Re-derives both counters from `student_status`, then the
    /// percentage from the counters.
    pub fn recalculate(&mut self) {
        let recorded = self.student_status.values().filter(|r| **r).count() as u32;
        self.recorded_count = recorded;
        self.not_recorded_count = self.student_status.len() as u32 - recorded;
        self.percentage = completion_percentage(self.recorded_count, self.not_recorded_count);
    }
}

/// `recorded / (recorded + not_recorded) * 100` rounded to two decimals,
/// or 0 when nothing was counted.
pub fn completion_percentage(recorded: u32, not_recorded: u32) -> f64 {
    let total = recorded + not_recorded;
    if total == 0 {
        return 0.0;
    }
    round_to(f64::from(recorded) / f64::from(total) * 100.0, 2)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub type SubjectMap = BTreeMap<String, SubjectRecord>;
pub type PeriodMap = BTreeMap<Period, SubjectMap>;
pub type SectionMap = BTreeMap<String, PeriodMap>;

/// Cumulative grade -> section -> period -> subject state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary {
    pub grades: BTreeMap<String, SectionMap>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn section_mut(&mut self, grade: &str, section: &str) -> &mut PeriodMap {
        self.grades
            .entry(grade.to_string())
            .or_default()
            .entry(section.to_string())
            .or_default()
    }

    pub fn record(
        &self,
        grade: &str,
        section: &str,
        period: Period,
        subject: &str,
    ) -> Option<&SubjectRecord> {
        self.grades
            .get(grade)?
            .get(section)?
            .get(&period)?
            .get(subject)
    }

    /// Every observed grade/section pair with its periods, in key order.
    /// Recomputes every record, repairing counters that drifted from
    /// the per-student status in a saved summary.
    pub fn recalculate_all(&mut self) {
        for sections in self.grades.values_mut() {
            for periods in sections.values_mut() {
                for subjects in periods.values_mut() {
                    subjects.values_mut().for_each(SubjectRecord::recalculate);
                }
            }
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &str, &PeriodMap)> {
        self.grades.iter().flat_map(|(grade, sections)| {
            sections
                .iter()
                .map(move |(section, periods)| (grade.as_str(), section.as_str(), periods))
        })
    }
}

/// grade -> section -> subject -> teachers, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherAssignment {
    pub grades: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>,
}

impl TeacherAssignment {
    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn assign(&mut self, grade: &str, section: &str, subject: &str, teacher: &str) {
        self.grades
            .entry(grade.to_string())
            .or_default()
            .entry(section.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .push(teacher.to_string());
    }

    pub fn teachers(&self, grade: &str, section: &str, subject: &str) -> &[String] {
        self.grades
            .get(grade)
            .and_then(|sections| sections.get(section))
            .and_then(|subjects| subjects.get(subject))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub grade: String,
    pub section: String,
    pub period: Period,
    pub subject: String,
    pub student_count: u32,
    pub recorded_count: u32,
    pub not_recorded_count: u32,
    pub percentage: f64,
    pub teachers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LostStudent {
    pub name: String,
    pub grade: String,
    pub section: String,
    pub missing_count: usize,
    pub missing_subjects: Vec<String>,
}
