use actix_web::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::{upsert_enrollment, Caller};
use crate::catalog::PricingModel;
use crate::enrollment::{Enrollment, EnrollmentType};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct EnrollInput {
    #[serde(default)]
    pub enrollment_type: Option<EnrollmentType>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct EnrollOutput {
    pub enrollment: Enrollment,
    /// `false` when an existing enrollment was updated instead.
    pub created: bool,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum EnrollError {
    #[error("Course not found.")]
    CourseNotFound,

    #[error("The course is not open for enrollment.")]
    CourseNotActive,

    #[error("The course is not offered as a subscription.")]
    SubscriptionNotOffered,
}

impl OperationError for EnrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CourseNotFound => StatusCode::NOT_FOUND,
            Self::CourseNotActive => StatusCode::CONFLICT,
            Self::SubscriptionNotOffered => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Enrolls the caller in an Active course. Enrolling again updates the existing enrollment and
/// keeps its progress.
#[tracing::instrument(skip(ctx))]
pub async fn enroll(
    ctx: &Context,
    caller: &Caller,
    course_id: Uuid,
    input: EnrollInput,
) -> Result<EnrollOutput, EndpointError<EnrollError>> {
    let course = ctx.courses.get_course(&course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(EnrollError::CourseNotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;
    if !course.is_listed() {
        return Err(EndpointError::operation(EnrollError::CourseNotActive));
    }

    let enrollment_type = input.enrollment_type.unwrap_or(EnrollmentType::Purchase);
    if enrollment_type == EnrollmentType::Subscription && course.pricing_model != PricingModel::Subscription {
        return Err(EndpointError::operation(EnrollError::SubscriptionNotOffered));
    }

    let (enrollment, created) = upsert_enrollment(ctx, caller.account_id, &course, enrollment_type, Utc::now())
        .await
        .map_err(simple_err_map!("Failed to store enrollment.", EndpointError::internal()))?;
    tracing::info!(enrollment_id = %enrollment.enrollment_id, created, "Learner enrolled.");

    Ok(EnrollOutput { enrollment, created })
}
