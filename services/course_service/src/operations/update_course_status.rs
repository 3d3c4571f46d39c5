use actix_web::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::{EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::catalog::{Course, CourseStatus, InvalidTransition};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCourseStatusInput {
    pub status: CourseStatus,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCourseStatusOutput {
    pub course: Course,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum UpdateCourseStatusError {
    #[error("Course not found.")]
    NotFound,

    #[error("Not allowed to change the status of this course.")]
    Forbidden,

    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),
}

impl OperationError for UpdateCourseStatusError {
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

/// Deactivates, reactivates or archives a course. Submission and review have their own operations.
#[tracing::instrument(skip(ctx))]
pub async fn update_course_status(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
    input: UpdateCourseStatusInput,
) -> Result<UpdateCourseStatusOutput, EndpointError<UpdateCourseStatusError>> {
    if !matches!(
        input.status,
        CourseStatus::Active | CourseStatus::Inactive | CourseStatus::Archived
    ) {
        return Err(EndpointError::validation(
            "Status must be one of Active, Inactive or Archived.",
        ));
    }

    let mut course = ctx.courses.load_course(&course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(UpdateCourseStatusError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;
    let admin_only = course.status.requires_admin(input.status);
    if !caller.manages(&course) || (admin_only && !caller.is_admin()) {
        return Err(EndpointError::operation(UpdateCourseStatusError::Forbidden));
    }
    // Approval goes through review.
    if course.status == CourseStatus::PendingApproval && input.status == CourseStatus::Active {
        return Err(EndpointError::operation(UpdateCourseStatusError::InvalidState(
            InvalidTransition {
                from: course.status,
                to: input.status,
            },
        )));
    }

    let expected = course.status;
    course
        .transition_to(input.status, Utc::now())
        .map_err(|e| EndpointError::operation(UpdateCourseStatusError::from(e)))?;
    ctx.courses
        .update_course(&course, expected)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => EndpointError::operation(UpdateCourseStatusError::NotFound),
            RepositoryError::ConditionFailed => EndpointError::operation(UpdateCourseStatusError::InvalidState(
                InvalidTransition {
                    from: expected,
                    to: input.status,
                },
            )),
            _ => {
                tracing::error!(error = ?e, "Failed to update course.");
                EndpointError::internal()
            }
        })?;
    tracing::info!(status = ?course.status, "Course status updated.");

    Ok(UpdateCourseStatusOutput { course })
}
