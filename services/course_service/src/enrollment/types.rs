use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Course;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Enrollment {
    pub enrollment_id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_type: EnrollmentType,
    pub progress: u8,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    #[serde(default)]
    pub completed_lesson_ids: Vec<Uuid>,
    #[serde(default)]
    pub time_spent_seconds: u64,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentType {
    Purchase,
    Subscription,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Rating must be between 1 and 5, got {0}.")]
pub struct InvalidRating(pub u8);

impl Enrollment {
    pub fn new(learner_id: Uuid, course: &Course, enrollment_type: EnrollmentType, now: DateTime<Utc>) -> Self {
        Enrollment {
            enrollment_id: Uuid::new_v4(),
            learner_id,
            course_id: course.course_id,
            enrollment_type,
            progress: 0,
            status: EnrollmentStatus::NotStarted,
            enrolled_at: now,
            last_accessed_at: now,
            completed_at: None,
            completed_lessons: 0,
            total_lessons: course.total_lessons(),
            completed_lesson_ids: Vec::new(),
            time_spent_seconds: 0,
            certificate_id: None,
            rating: None,
        }
    }

    /// Folds a repeated enrollment into this one. Progress is kept, the enrollment type follows the
    /// latest action.
    pub fn merge_reenrollment(&mut self, enrollment_type: EnrollmentType, now: DateTime<Utc>) {
        self.enrollment_type = enrollment_type;
        self.last_accessed_at = now;
    }

    pub fn rate(&mut self, rating: u8) -> Result<(), InvalidRating> {
        if !(1..=5).contains(&rating) {
            return Err(InvalidRating(rating));
        }

        self.rating = Some(rating);
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == EnrollmentStatus::Completed
    }
}
