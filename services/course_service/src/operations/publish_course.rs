use actix_web::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use service_core::{EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::catalog::{validate_course, Course, CourseStatus, InvalidTransition};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct PublishCourseOutput {
    pub course: Course,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum PublishCourseError {
    #[error("Course not found.")]
    NotFound,

    #[error("Only the course owner or an administrator can submit the course.")]
    Forbidden,

    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),
}

impl OperationError for PublishCourseError {
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

/// Submits a Draft course for review.
#[tracing::instrument(skip(ctx))]
pub async fn publish_course(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
) -> Result<PublishCourseOutput, EndpointError<PublishCourseError>> {
    let mut course = ctx.courses.load_course(&course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(PublishCourseError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;
    if !caller.manages(&course) {
        return Err(EndpointError::operation(PublishCourseError::Forbidden));
    }

    let expected = course.status;
    course
        .transition_to(CourseStatus::PendingApproval, Utc::now())
        .map_err(|e| EndpointError::operation(PublishCourseError::from(e)))?;
    validate_course(&course).map_err(|e| EndpointError::validation(e.to_string()))?;

    ctx.courses
        .update_course(&course, expected)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => EndpointError::operation(PublishCourseError::NotFound),
            RepositoryError::ConditionFailed => EndpointError::operation(PublishCourseError::InvalidState(
                InvalidTransition {
                    from: expected,
                    to: CourseStatus::PendingApproval,
                },
            )),
            _ => {
                tracing::error!(error = ?e, "Failed to update course.");
                EndpointError::internal()
            }
        })?;
    tracing::info!("Course submitted for approval.");

    Ok(PublishCourseOutput { course })
}
