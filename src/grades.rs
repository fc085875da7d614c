use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Grade, GradeCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Week,
    Month,
    Semester,
}

impl DateRange {
    /// Earliest date still inside the range, or `None` for `All`.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::All => None,
            DateRange::Week => Some(now - Duration::days(7)),
            DateRange::Month => now.checked_sub_months(Months::new(1)),
            DateRange::Semester => now.checked_sub_months(Months::new(6)),
        }
    }
}

/// `None` on a field means "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeFilter {
    pub subject: Option<String>,
    pub category: Option<GradeCategory>,
    pub date_range: DateRange,
}

impl GradeFilter {
    pub fn is_active(&self) -> bool {
        self.subject.is_some() || self.category.is_some() || self.date_range != DateRange::All
    }

    pub fn matches(&self, grade: &Grade, now: DateTime<Utc>) -> bool {
        self.subject.as_ref().map_or(true, |s| &grade.subject == s)
            && self.category.map_or(true, |c| grade.category == c)
            && self
                .date_range
                .cutoff(now)
                .map_or(true, |cutoff| grade.date >= cutoff)
    }

    pub fn apply<'a>(&self, grades: &'a [Grade], now: DateTime<Utc>) -> Vec<&'a Grade> {
        grades.iter().filter(|g| self.matches(g, now)).collect()
    }
}

/// Distinct subjects in first-seen order.
pub fn unique_subjects(grades: &[Grade]) -> Vec<&str> {
    let mut subjects: Vec<&str> = Vec::new();
    for grade in grades {
        if !subjects.contains(&grade.subject.as_str()) {
            subjects.push(&grade.subject);
        }
    }
    subjects
}

/// Rounded mean percentage for `subject`; 0 when it has no grades.
pub fn subject_average(grades: &[&Grade], subject: &str) -> u32 {
    let (total, count) = grades
        .iter()
        .filter(|g| g.subject == subject)
        .fold((0.0, 0u32), |(sum, n), g| (sum + g.percentage, n + 1));
    if count == 0 {
        return 0;
    }
    (total / f64::from(count)).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl GradeBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            GradeBand::Excellent
        } else if percentage >= 80.0 {
            GradeBand::Good
        } else if percentage >= 70.0 {
            GradeBand::Fair
        } else {
            GradeBand::Poor
        }
    }
}
