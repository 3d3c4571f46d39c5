use actix_web::http::StatusCode;
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;

use super::Caller;
use crate::repository::{CourseFilter, EnrollmentFilter, PaymentFilter};
use crate::revenue::{platform_summary as rollup, PlatformSummary};
use crate::Context;

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum PlatformSummaryError {
    #[error("Only administrators can see platform analytics.")]
    Forbidden,
}

impl OperationError for PlatformSummaryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

#[tracing::instrument(skip(ctx))]
pub async fn platform_summary(
    ctx: &Context,
    caller: &Caller,
) -> Result<PlatformSummary, EndpointError<PlatformSummaryError>> {
    if !caller.is_admin() {
        return Err(EndpointError::operation(PlatformSummaryError::Forbidden));
    }

    let courses = ctx
        .courses
        .list_courses(&CourseFilter::default())
        .await
        .map_err(simple_err_map!("Failed to list courses.", EndpointError::internal()))?;
    let enrollments = ctx
        .enrollments
        .list_enrollments(&EnrollmentFilter::default())
        .await
        .map_err(simple_err_map!("Failed to list enrollments.", EndpointError::internal()))?;
    let payments = ctx
        .payments
        .list_payments(&PaymentFilter::completed())
        .await
        .map_err(simple_err_map!("Failed to list payments.", EndpointError::internal()))?;

    Ok(rollup(&courses, &enrollments, &payments))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use service_core::auth::Role;
    use uuid::Uuid;

    use super::*;
    use crate::catalog::CourseStatus;
    use crate::enrollment::{Enrollment, EnrollmentType};
    use crate::payment::PaymentStatus;
    use crate::test_utils::{active_course, caller, memory_context, payment};

    #[tokio::test]
    async fn aggregates_the_whole_platform() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        let mut draft = active_course(Uuid::new_v4(), 500);
        draft.status = CourseStatus::Draft;
        ctx.courses.create_course(&course).await.unwrap();
        ctx.courses.create_course(&draft).await.unwrap();

        let learner = Uuid::new_v4();
        let mut enrollment = Enrollment::new(learner, &course, EnrollmentType::Purchase, Utc::now());
        enrollment.rate(5).unwrap();
        ctx.enrollments.create_enrollment(&enrollment).await.unwrap();
        ctx.payments
            .create_payment(&payment(learner, &course, 1499, PaymentStatus::Completed))
            .await
            .unwrap();
        ctx.payments
            .create_payment(&payment(learner, &course, 1499, PaymentStatus::Failed))
            .await
            .unwrap();

        let summary = platform_summary(&ctx, &caller(Role::Admin)).await.unwrap();

        assert_eq!(summary.split.total_revenue, Decimal::from(1499));
        assert_eq!(
            summary.split.creator_earnings + summary.split.platform_share,
            summary.split.total_revenue
        );
        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.active_courses, 1);
        assert_eq!(summary.total_students, 1);
        assert_eq!(summary.categories.len(), 1);
    }

    #[tokio::test]
    async fn admin_only() {
        let ctx = memory_context();

        let err = platform_summary(&ctx, &caller(Role::Creator)).await.unwrap_err();

        assert!(matches!(err, EndpointError::Operation(PlatformSummaryError::Forbidden)));
    }
}
