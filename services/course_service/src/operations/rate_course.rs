use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::enrollment::Enrollment;
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct RateCourseInput {
    pub rating: u8,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct RateCourseOutput {
    pub enrollment: Enrollment,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum RateCourseError {
    #[error("Enrollment not found.")]
    NotFound,

    #[error("Only the enrolled learner can rate the course.")]
    Forbidden,
}

impl OperationError for RateCourseError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

#[tracing::instrument(skip(ctx))]
pub async fn rate_course(
    ctx: &Context,
    caller: &Caller,
    enrollment_id: Uuid,
    input: RateCourseInput,
) -> Result<RateCourseOutput, EndpointError<RateCourseError>> {
    let _guard = ctx.progress_locks.lock(enrollment_id).await;

    let mut enrollment = ctx.enrollments.get_enrollment(&enrollment_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(RateCourseError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve enrollment.");
            EndpointError::internal()
        }
    })?;
    if enrollment.learner_id != caller.account_id {
        return Err(EndpointError::operation(RateCourseError::Forbidden));
    }

    enrollment
        .rate(input.rating)
        .map_err(|e| EndpointError::validation(e.to_string()))?;
    ctx.enrollments
        .update_enrollment(&enrollment)
        .await
        .map_err(simple_err_map!("Failed to update enrollment.", EndpointError::internal()))?;

    Ok(RateCourseOutput { enrollment })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use service_core::auth::Role;

    use super::*;
    use crate::enrollment::EnrollmentType;
    use crate::test_utils::{active_course, caller, memory_context};

    async fn enrolled(ctx: &Context, learner: &Caller) -> Enrollment {
        let course = active_course(Uuid::new_v4(), 1499);
        let enrollment = Enrollment::new(learner.account_id, &course, EnrollmentType::Purchase, Utc::now());
        ctx.enrollments.create_enrollment(&enrollment).await.unwrap();
        enrollment
    }

    #[tokio::test]
    async fn stores_rating() {
        let ctx = memory_context();
        let learner = caller(Role::Learner);
        let enrollment = enrolled(&ctx, &learner).await;

        let output = rate_course(&ctx, &learner, enrollment.enrollment_id, RateCourseInput { rating: 4 })
            .await
            .unwrap();

        assert_eq!(output.enrollment.rating, Some(4));
        let stored = ctx.enrollments.get_enrollment(&enrollment.enrollment_id).await.unwrap();
        assert_eq!(stored.rating, Some(4));
    }

    #[tokio::test]
    async fn rating_out_of_range_is_invalid() {
        let ctx = memory_context();
        let learner = caller(Role::Learner);
        let enrollment = enrolled(&ctx, &learner).await;

        let err = rate_course(&ctx, &learner, enrollment.enrollment_id, RateCourseInput { rating: 6 })
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Validation(_)));
    }

    #[tokio::test]
    async fn only_the_learner_can_rate() {
        let ctx = memory_context();
        let enrollment = enrolled(&ctx, &caller(Role::Learner)).await;

        let err = rate_course(&ctx, &caller(Role::Learner), enrollment.enrollment_id, RateCourseInput { rating: 5 })
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Operation(RateCourseError::Forbidden)));
    }
}
