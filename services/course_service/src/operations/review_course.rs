use actix_web::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use service_core::{EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::catalog::{Course, CourseStatus, InvalidTransition};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ReviewCourseOutput {
    pub course: Course,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum ReviewCourseError {
    #[error("Course not found.")]
    NotFound,

    #[error("Only administrators can review courses.")]
    Forbidden,

    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),
}

impl OperationError for ReviewCourseError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidState(_) => StatusCode::CONFLICT,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Publishes a course waiting for approval to the marketplace.
pub async fn approve_course(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
) -> Result<ReviewCourseOutput, EndpointError<ReviewCourseError>> {
    review(ctx, caller, course_id, CourseStatus::Active).await
}

/// Sends a course waiting for approval back to its creator as a Draft.
pub async fn reject_course(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
) -> Result<ReviewCourseOutput, EndpointError<ReviewCourseError>> {
    review(ctx, caller, course_id, CourseStatus::Draft).await
}

#[tracing::instrument(skip(ctx))]
async fn review(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
    to: CourseStatus,
) -> Result<ReviewCourseOutput, EndpointError<ReviewCourseError>> {
    if !caller.is_admin() {
        return Err(EndpointError::operation(ReviewCourseError::Forbidden));
    }

    let mut course = ctx.courses.load_course(&course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(ReviewCourseError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;
    if course.status != CourseStatus::PendingApproval {
        return Err(EndpointError::operation(ReviewCourseError::InvalidState(InvalidTransition {
            from: course.status,
            to,
        })));
    }

    course
        .transition_to(to, Utc::now())
        .map_err(|e| EndpointError::operation(ReviewCourseError::from(e)))?;
    ctx.courses
        .update_course(&course, CourseStatus::PendingApproval)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => EndpointError::operation(ReviewCourseError::NotFound),
            // Reviewed concurrently.
            RepositoryError::ConditionFailed => EndpointError::operation(ReviewCourseError::InvalidState(
                InvalidTransition {
                    from: CourseStatus::PendingApproval,
                    to,
                },
            )),
            _ => {
                tracing::error!(error = ?e, "Failed to update course.");
                EndpointError::internal()
            }
        })?;
    tracing::info!(status = ?course.status, "Course reviewed.");

    Ok(ReviewCourseOutput { course })
}
