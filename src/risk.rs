use crate::analytics::{BatchAnalytics, StudentStats};
use serde::Serialize;

/// Attendance rate (percent) below which a student needs attention.
pub const AT_RISK_THRESHOLD: f64 = 75.0;

/// A student is at risk only once at least one class has been held;
/// otherwise every rate is the 0 default and means nothing.
pub fn is_at_risk(student: &StudentStats, total_classes_held: usize) -> bool {
    total_classes_held > 0 && student.rate < AT_RISK_THRESHOLD
}

/// At-risk students, worst first (the order of `per_student`).
pub fn at_risk_students(analytics: &BatchAnalytics) -> Vec<&StudentStats> {
    analytics
        .per_student
        .iter()
        .filter(|s| is_at_risk(s, analytics.total_classes_held))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskStudent {
    pub name: String,
    pub rate: f64,
    pub absent_count: usize,
}

impl From<&StudentStats> for AtRiskStudent {
    fn from(s: &StudentStats) -> Self {
        Self {
            name: s.name.clone(),
            rate: s.rate,
            absent_count: s.absent_count,
        }
    }
}
