use actix_web::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::enrollment::{Enrollment, LessonCompletion};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct MarkLessonCompleteInput {
    #[serde(default)]
    pub time_spent_seconds: u64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct MarkLessonCompleteOutput {
    pub enrollment: Enrollment,
    pub already_completed: bool,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum MarkLessonCompleteError {
    #[error("Enrollment not found.")]
    EnrollmentNotFound,

    #[error("Lesson not found in the course curriculum.")]
    LessonNotFound,

    #[error("The module of this lesson has not been released yet.")]
    LessonNotReleased,

    #[error("Only the enrolled learner can record progress.")]
    Forbidden,
}

impl OperationError for MarkLessonCompleteError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EnrollmentNotFound | Self::LessonNotFound => StatusCode::NOT_FOUND,
            Self::LessonNotReleased => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Records a completed lesson and recomputes the progress of the enrollment. Updates of a single
/// enrollment are applied one at a time, in arrival order.
#[tracing::instrument(skip(ctx))]
pub async fn mark_lesson_complete(
    ctx: &Context,
    caller: &Caller,
    enrollment_id: Uuid,
    lesson_id: Uuid,
    input: MarkLessonCompleteInput,
) -> Result<MarkLessonCompleteOutput, EndpointError<MarkLessonCompleteError>> {
    let _guard = ctx.progress_locks.lock(enrollment_id).await;

    let mut enrollment = ctx.enrollments.get_enrollment(&enrollment_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(MarkLessonCompleteError::EnrollmentNotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve enrollment.");
            EndpointError::internal()
        }
    })?;
    if enrollment.learner_id != caller.account_id {
        return Err(EndpointError::operation(MarkLessonCompleteError::Forbidden));
    }

    let course = ctx.courses.get_course(&enrollment.course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(MarkLessonCompleteError::LessonNotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;
    let module = course
        .module_of(&lesson_id)
        .ok_or_else(|| EndpointError::operation(MarkLessonCompleteError::LessonNotFound))?;

    let now = Utc::now();
    if !module.is_released(enrollment.enrolled_at, now) {
        return Err(EndpointError::operation(MarkLessonCompleteError::LessonNotReleased));
    }

    let completion = enrollment.complete_lesson(lesson_id, input.time_spent_seconds, course.total_lessons(), now);
    if course.features.certificate {
        if let Some(certificate_id) = enrollment.issue_certificate(now) {
            tracing::info!(%certificate_id, "Certificate issued.");
        }
    }

    ctx.enrollments
        .update_enrollment(&enrollment)
        .await
        .map_err(simple_err_map!("Failed to update enrollment.", EndpointError::internal()))?;

    Ok(MarkLessonCompleteOutput {
        enrollment,
        already_completed: completion == LessonCompletion::AlreadyCompleted,
    })
}
