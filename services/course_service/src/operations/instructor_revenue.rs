use actix_web::http::StatusCode;
use futures_util::future::try_join_all;
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::repository::{CourseFilter, EnrollmentFilter, PaymentFilter};
use crate::revenue::{instructor_revenue as rollup, InstructorRevenue};
use crate::Context;

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum InstructorRevenueError {
    #[error("Not allowed to see the revenue of another instructor.")]
    Forbidden,
}

impl OperationError for InstructorRevenueError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Revenue of an instructor from completed payments. An instructor without sales gets zeros.
#[tracing::instrument(skip(ctx))]
pub async fn instructor_revenue(
    ctx: &Context,
    caller: &Caller,
    instructor_id: Uuid,
) -> Result<InstructorRevenue, EndpointError<InstructorRevenueError>> {
    if instructor_id != caller.account_id && !caller.is_admin() {
        return Err(EndpointError::operation(InstructorRevenueError::Forbidden));
    }

    let courses = ctx
        .courses
        .list_courses(&CourseFilter::by_instructor(instructor_id))
        .await
        .map_err(simple_err_map!("Failed to list courses.", EndpointError::internal()))?;

    let enrollment_filters: Vec<EnrollmentFilter> = courses
        .iter()
        .map(|c| EnrollmentFilter {
            course_id: Some(c.course_id),
            ..Default::default()
        })
        .collect();

    let enrollments = try_join_all(enrollment_filters.iter().map(|f| ctx.enrollments.list_enrollments(f)))
        .await
        .map_err(simple_err_map!("Failed to list enrollments.", EndpointError::internal()))?;
    let enrollments: Vec<_> = enrollments.into_iter().flatten().collect();

    // A single listing, grouped by course in the rollup.
    let payments = if courses.is_empty() {
        Vec::new()
    } else {
        ctx.payments
            .list_payments(&PaymentFilter::completed())
            .await
            .map_err(simple_err_map!("Failed to list payments.", EndpointError::internal()))?
    };

    Ok(rollup(instructor_id, &courses, &enrollments, &payments))
}
