use actix_web::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::auth::Role;
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::{validate_input, Caller};
use crate::catalog::{
    validate_course, AccessPolicy, Course, CourseFeatures, CourseLevel, CourseModule, CourseStatus, CourseType,
    PaymentPlan, PricingModel, SubscriptionPeriod,
};
use crate::Context;

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CreateCourseInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 5000))]
    pub description: String,

    pub price: Decimal,

    pub course_type: CourseType,

    /// Derived from the price and course type when omitted.
    #[serde(default)]
    pub pricing_model: Option<PricingModel>,

    pub level: CourseLevel,

    #[validate(length(min = 1, max = 100))]
    pub category: String,

    #[serde(default)]
    pub features: Option<CourseFeatures>,

    #[serde(default)]
    pub access: Option<AccessPolicy>,

    #[serde(default)]
    pub curriculum: Vec<CourseModule>,

    #[serde(default)]
    pub payment_plan: Option<PaymentPlan>,

    #[serde(default)]
    pub subscription_period: Option<SubscriptionPeriod>,

    #[serde(default)]
    pub duration_days: Option<u32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CreateCourseOutput {
    pub course: Course,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum CreateCourseError {
    #[error("Only creators and administrators can create courses.")]
    Forbidden,
}

impl OperationError for CreateCourseError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Creates a Draft course owned by the caller. Omitted features, access policy and duration are
/// filled in from the course type.
#[tracing::instrument(skip(ctx, input), fields(title = %input.title))]
pub async fn create_course(
    ctx: &Context,
    caller: &Caller,
    input: CreateCourseInput,
) -> Result<CreateCourseOutput, EndpointError<CreateCourseError>> {
    if caller.role == Role::Learner {
        return Err(EndpointError::operation(CreateCourseError::Forbidden));
    }
    validate_input(&input)?;

    let pricing_model = input.pricing_model.unwrap_or(if input.price.is_zero() {
        PricingModel::Free
    } else {
        input.course_type.suggested_pricing_model()
    });
    let now = Utc::now();
    let course = Course {
        course_id: Uuid::new_v4(),
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        price: input.price,
        course_type: input.course_type,
        pricing_model,
        status: CourseStatus::Draft,
        instructor_id: caller.account_id,
        level: input.level,
        category: input.category.trim().to_string(),
        features: input.features.unwrap_or_else(|| input.course_type.default_features()),
        access: input.access.unwrap_or_else(|| input.course_type.default_access()),
        curriculum: input.curriculum,
        payment_plan: input.payment_plan,
        subscription_period: input.subscription_period,
        duration_days: input.duration_days.or_else(|| input.course_type.default_duration_days()),
        created_at: now,
        updated_at: now,
    };
    validate_course(&course).map_err(|e| EndpointError::validation(e.to_string()))?;

    ctx.courses
        .create_course(&course)
        .await
        .map_err(simple_err_map!("Failed to store course.", EndpointError::internal()))?;
    tracing::info!(course_id = %course.course_id, "Course created.");

    Ok(CreateCourseOutput { course })
}
