//! Student record submitted for exam score prediction

use crate::features::FEATURES;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One or more fields fell outside their documented range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

/// Student performance record with the 21 model features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamScoreInput {
    /// Hours studied per week (1-44)
    pub hours_studied: i64,

    /// Attendance percentage (60-100)
    pub attendance: i64,

    /// Previous exam scores (50-100)
    pub previous_scores: i64,

    /// Tutoring sessions per month (0-8)
    pub tutoring_sessions: i64,

    // One-hot flags, 0 or 1
    pub parental_involvement_low: i64,
    pub parental_involvement_medium: i64,
    pub access_to_resources_low: i64,
    pub access_to_resources_medium: i64,
    pub extracurricular_activities_yes: i64,
    pub motivation_level_low: i64,
    pub internet_access_yes: i64,
    pub family_income_low: i64,
    pub family_income_medium: i64,
    pub teacher_quality_low: i64,
    pub teacher_quality_medium: i64,
    pub peer_influence_positive: i64,
    pub learning_disabilities_yes: i64,
    pub parental_education_level_high_school: i64,
    pub parental_education_level_postgraduate: i64,
    pub distance_from_home_moderate: i64,
    pub distance_from_home_near: i64,
}

impl ExamScoreInput {
    /// The example request advertised by the service root
    pub fn example() -> Self {
        Self {
            hours_studied: 20,
            attendance: 85,
            previous_scores: 75,
            tutoring_sessions: 2,
            parental_involvement_low: 0,
            parental_involvement_medium: 1,
            access_to_resources_low: 0,
            access_to_resources_medium: 1,
            extracurricular_activities_yes: 1,
            motivation_level_low: 0,
            internet_access_yes: 1,
            family_income_low: 0,
            family_income_medium: 1,
            teacher_quality_low: 0,
            teacher_quality_medium: 1,
            peer_influence_positive: 1,
            learning_disabilities_yes: 0,
            parental_education_level_high_school: 1,
            parental_education_level_postgraduate: 0,
            distance_from_home_moderate: 1,
            distance_from_home_near: 0,
        }
    }

    /// Raw field values in model feature order
    pub fn values(&self) -> [i64; 21] {
        [
            self.hours_studied,
            self.attendance,
            self.previous_scores,
            self.tutoring_sessions,
            self.parental_involvement_low,
            self.parental_involvement_medium,
            self.access_to_resources_low,
            self.access_to_resources_medium,
            self.extracurricular_activities_yes,
            self.motivation_level_low,
            self.internet_access_yes,
            self.family_income_low,
            self.family_income_medium,
            self.teacher_quality_low,
            self.teacher_quality_medium,
            self.peer_influence_positive,
            self.learning_disabilities_yes,
            self.parental_education_level_high_school,
            self.parental_education_level_postgraduate,
            self.distance_from_home_moderate,
            self.distance_from_home_near,
        ]
    }

    /// Check every field against its documented range
    pub fn validate(&self) -> Result<(), ValidationError> {
        let violations: Vec<String> = FEATURES
            .iter()
            .zip(self.values())
            .filter(|(spec, value)| !spec.accepts(*value))
            .map(|(spec, value)| {
                format!(
                    "{} must be between {} and {} (got {})",
                    spec.name, spec.min, spec.max, value
                )
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}
