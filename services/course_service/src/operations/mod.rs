//! Service operations. Each operation takes the shared [`Context`](crate::Context), the
//! authenticated caller when it needs one, and its input, and returns its output or an
//! [`EndpointError`] carrying the operation specific error.

pub mod create_course;
pub mod describe_course;
pub mod enroll;
pub mod instructor_revenue;
pub mod list_active_courses;
pub mod list_instructor_courses;
pub mod list_learner_enrollments;
pub mod mark_lesson_complete;
pub mod platform_summary;
pub mod publish_course;
pub mod rate_course;
pub mod record_payment;
pub mod review_course;
pub mod update_course_status;
pub mod update_payment_status;

use chrono::{DateTime, Utc};
use service_core::auth::{Claims, Role};
use service_core::{EndpointError, OperationError};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::Course;
use crate::enrollment::{Enrollment, EnrollmentType};
use crate::repository::RepositoryError;
use crate::Context;

/// Account on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub account_id: Uuid,
    pub role: Role,
}

impl Caller {
    /// `None` if the token subject is not an account ID.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Caller {
            account_id: claims.account_id()?,
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the course or an administrator.
    pub fn manages(&self, course: &Course) -> bool {
        self.is_admin() || course.instructor_id == self.account_id
    }
}

/// Runs the derived validation rules of an input, reporting every failing field.
pub(crate) fn validate_input<E: OperationError>(input: &impl Validate) -> Result<(), EndpointError<E>> {
    input.validate().map_err(|errors| {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    let msg = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    format!("{}: {}", field, msg)
                })
            })
            .collect();
        messages.sort();

        EndpointError::validation(format!("Validation failed: {}", messages.join(", ")))
    })
}

/// Creates the enrollment of `learner_id` in `course`, or folds the request into the existing one.
/// Returns the stored enrollment and whether it was created.
pub(crate) async fn upsert_enrollment(
    ctx: &Context,
    learner_id: Uuid,
    course: &Course,
    enrollment_type: EnrollmentType,
    now: DateTime<Utc>,
) -> Result<(Enrollment, bool), RepositoryError> {
    let enrollment = Enrollment::new(learner_id, course, enrollment_type, now);
    match ctx.enrollments.create_enrollment(&enrollment).await {
        Ok(()) => return Ok((enrollment, true)),
        Err(RepositoryError::Duplicate) => {}
        Err(e) => return Err(e),
    }

    let existing = ctx
        .enrollments
        .find_enrollment(&learner_id, &course.course_id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    // Progress updates read-modify-write the same record.
    let _guard = ctx.progress_locks.lock(existing.enrollment_id).await;
    let mut existing = ctx.enrollments.get_enrollment(&existing.enrollment_id).await?;
    existing.merge_reenrollment(enrollment_type, now);
    ctx.enrollments.update_enrollment(&existing).await?;

    Ok((existing, false))
}
