use actix_web::http::StatusCode;
use serde::Serialize;
use service_core::{EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::catalog::Course;
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeCourseOutput {
    pub course: Course,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum DescribeCourseError {
    #[error("Course not found.")]
    NotFound,
}

impl OperationError for DescribeCourseError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Active courses are public. Any other status is only visible to the owner and administrators.
#[tracing::instrument(skip(ctx))]
pub async fn describe_course(
    ctx: &Context,
    caller: Option<&Caller>,
    course_id: Uuid,
) -> Result<DescribeCourseOutput, EndpointError<DescribeCourseError>> {
    let course = ctx.courses.get_course(&course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(DescribeCourseError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;

    if !course.is_listed() && !caller.map_or(false, |c| c.manages(&course)) {
        return Err(EndpointError::operation(DescribeCourseError::NotFound));
    }

    Ok(DescribeCourseOutput { course })
}

#[cfg(test)]
mod tests {
    use service_core::auth::Role;

    use super::*;
    use crate::catalog::CourseStatus;
    use crate::test_utils::{active_course, caller, memory_context};

    #[tokio::test]
    async fn active_courses_are_public() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();

        let output = describe_course(&ctx, None, course.course_id).await.unwrap();

        assert_eq!(output.course, course);
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_other_accounts() {
        let ctx = memory_context();
        let owner = caller(Role::Creator);
        let mut course = active_course(owner.account_id, 1499);
        course.status = CourseStatus::Draft;
        ctx.courses.create_course(&course).await.unwrap();

        assert!(describe_course(&ctx, Some(&owner), course.course_id).await.is_ok());
        assert!(describe_course(&ctx, Some(&caller(Role::Admin)), course.course_id)
            .await
            .is_ok());
        assert!(matches!(
            describe_course(&ctx, Some(&caller(Role::Learner)), course.course_id).await,
            Err(EndpointError::Operation(DescribeCourseError::NotFound))
        ));
        assert!(matches!(
            describe_course(&ctx, None, course.course_id).await,
            Err(EndpointError::Operation(DescribeCourseError::NotFound))
        ));
    }
}
