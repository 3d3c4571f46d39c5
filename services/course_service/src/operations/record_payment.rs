use actix_web::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::{upsert_enrollment, validate_input, Caller};
use crate::catalog::{Course, PricingModel};
use crate::enrollment::{Enrollment, EnrollmentType};
use crate::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct RecordPaymentInput {
    #[serde(default)]
    pub payment_id: Option<Uuid>,

    pub payer_id: Uuid,

    pub course_id: Uuid,

    pub amount: Decimal,

    /// Defaults to the platform currency, which is the only one accepted.
    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default = "pending")]
    pub status: PaymentStatus,

    pub method: PaymentMethod,

    #[validate(length(min = 1, max = 128))]
    pub transaction_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct RecordPaymentOutput {
    pub payment: Payment,

    /// Enrollment granted by a completed payment.
    pub enrollment: Option<Enrollment>,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum RecordPaymentError {
    #[error("Only administrators can record payments.")]
    Forbidden,

    #[error("Course not found.")]
    CourseNotFound,

    #[error("A payment with this ID already exists.")]
    Conflict,
}

impl OperationError for RecordPaymentError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::CourseNotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

fn pending() -> PaymentStatus {
    PaymentStatus::Pending
}

/// Enrollment type granted by paying for `course`.
fn paid_enrollment_type(course: &Course) -> EnrollmentType {
    match course.pricing_model {
        PricingModel::Subscription => EnrollmentType::Subscription,
        _ => EnrollmentType::Purchase,
    }
}

/// Gives the payer of a completed payment access to the course.
pub(crate) async fn enroll_payer(ctx: &Context, payment: &Payment, course: &Course) -> Result<Enrollment, RepositoryError> {
    let (enrollment, created) =
        upsert_enrollment(ctx, payment.payer_id, course, paid_enrollment_type(course), Utc::now()).await?;
    tracing::info!(
        payment_id = %payment.payment_id,
        enrollment_id = %enrollment.enrollment_id,
        created,
        "Payer enrolled."
    );

    Ok(enrollment)
}

/// Records a payment made outside the platform. Completed payments enroll the payer.
#[tracing::instrument(skip(ctx))]
pub async fn record_payment(
    ctx: &Context,
    caller: &Caller,
    input: RecordPaymentInput,
) -> Result<RecordPaymentOutput, EndpointError<RecordPaymentError>> {
    if !caller.is_admin() {
        return Err(EndpointError::operation(RecordPaymentError::Forbidden));
    }
    validate_input(&input)?;
    if input.amount <= Decimal::ZERO {
        return Err(EndpointError::validation("Amount must be positive."));
    }
    let currency = input
        .currency
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| ctx.currency.clone());
    if currency != ctx.currency {
        return Err(EndpointError::validation(format!(
            "Payments must be recorded in {}.",
            ctx.currency
        )));
    }

    let course = ctx.courses.get_course(&input.course_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(RecordPaymentError::CourseNotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve course.");
            EndpointError::internal()
        }
    })?;

    // A completed payment is stored as Pending until the payer is enrolled, so that a failed
    // enrollment leaves it settleable.
    let now = Utc::now();
    let payment = Payment {
        payment_id: input.payment_id.unwrap_or_else(Uuid::new_v4),
        payer_id: input.payer_id,
        course_id: course.course_id,
        amount: input.amount.round_dp(2),
        currency,
        status: PaymentStatus::Pending,
        method: input.method,
        transaction_id: input.transaction_id,
        created_at: now,
        updated_at: now,
    };
    ctx.payments.create_payment(&payment).await.map_err(|e| match e {
        RepositoryError::Duplicate => EndpointError::operation(RecordPaymentError::Conflict),
        _ => {
            tracing::error!(error = ?e, "Failed to store payment.");
            EndpointError::internal()
        }
    })?;

    let (payment, enrollment) = match input.status {
        PaymentStatus::Pending => (payment, None),
        status => {
            let enrollment = if status == PaymentStatus::Completed {
                let enrollment = enroll_payer(ctx, &payment, &course)
                    .await
                    .map_err(simple_err_map!("Failed to enroll payer.", EndpointError::internal()))?;
                Some(enrollment)
            } else {
                None
            };
            let payment = ctx
                .payments
                .update_payment_status(&payment.payment_id, PaymentStatus::Pending, status, now)
                .await
                .map_err(simple_err_map!("Failed to settle payment.", EndpointError::internal()))?;
            (payment, enrollment)
        }
    };
    tracing::info!(payment_id = %payment.payment_id, status = ?payment.status, "Payment recorded.");

    Ok(RecordPaymentOutput { payment, enrollment })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use service_core::auth::Role;

    use super::*;
    use crate::catalog::SubscriptionPeriod;
    use crate::operations::update_payment_status::{update_payment_status, UpdatePaymentStatusInput};
    use crate::repository::{EnrollmentsRepository, MemoryRepository, PaymentsRepository};
    use crate::test_utils::{active_course, caller, memory_context, BrokenEnrollments, SECRET};

    fn input(course: &Course, status: PaymentStatus) -> RecordPaymentInput {
        RecordPaymentInput {
            payment_id: None,
            payer_id: Uuid::new_v4(),
            course_id: course.course_id,
            amount: Decimal::from(1499),
            currency: None,
            status,
            method: PaymentMethod::Card,
            transaction_id: "TXN-0001".to_string(),
        }
    }

    #[tokio::test]
    async fn completed_payment_enrolls_the_payer() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();
        let input = input(&course, PaymentStatus::Completed);
        let payer = input.payer_id;

        let output = record_payment(&ctx, &caller(Role::Admin), input).await.unwrap();

        assert_eq!(output.payment.currency, "PHP");
        let enrollment = output.enrollment.unwrap();
        assert_eq!(enrollment.learner_id, payer);
        assert_eq!(enrollment.enrollment_type, EnrollmentType::Purchase);
        assert!(ctx
            .enrollments
            .find_enrollment(&payer, &course.course_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn subscription_payment_grants_subscription() {
        let ctx = memory_context();
        let mut course = active_course(Uuid::new_v4(), 499);
        course.pricing_model = PricingModel::Subscription;
        course.subscription_period = Some(SubscriptionPeriod::Monthly);
        ctx.courses.create_course(&course).await.unwrap();

        let output = record_payment(&ctx, &caller(Role::Admin), input(&course, PaymentStatus::Completed))
            .await
            .unwrap();

        assert_eq!(output.enrollment.unwrap().enrollment_type, EnrollmentType::Subscription);
    }

    #[tokio::test]
    async fn pending_payment_does_not_enroll() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();

        let output = record_payment(&ctx, &caller(Role::Admin), input(&course, PaymentStatus::Pending))
            .await
            .unwrap();

        assert!(output.enrollment.is_none());
        assert!(ctx.enrollments.list_enrollments(&Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_payments() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();
        let admin = caller(Role::Admin);

        let mut negative = input(&course, PaymentStatus::Completed);
        negative.amount = Decimal::from(-5);
        assert!(matches!(
            record_payment(&ctx, &admin, negative).await,
            Err(EndpointError::Validation(_))
        ));

        let mut foreign_currency = input(&course, PaymentStatus::Completed);
        foreign_currency.currency = Some("usd".to_string());
        assert!(matches!(
            record_payment(&ctx, &admin, foreign_currency).await,
            Err(EndpointError::Validation(_))
        ));

        assert!(matches!(
            record_payment(&ctx, &caller(Role::Creator), input(&course, PaymentStatus::Completed)).await,
            Err(EndpointError::Operation(RecordPaymentError::Forbidden))
        ));
    }

    #[tokio::test]
    async fn duplicate_payment_id_conflicts() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();
        let admin = caller(Role::Admin);
        let mut first = input(&course, PaymentStatus::Pending);
        first.payment_id = Some(Uuid::new_v4());

        record_payment(&ctx, &admin, first.clone()).await.unwrap();
        let err = record_payment(&ctx, &admin, first).await.unwrap_err();

        assert!(matches!(err, EndpointError::Operation(RecordPaymentError::Conflict)));
    }

    #[tokio::test]
    async fn failed_enrollment_leaves_the_payment_pending() {
        let repo = Arc::new(MemoryRepository::new());
        let mut ctx = Context {
            enrollments: Arc::new(BrokenEnrollments),
            ..Context::with_repository(repo.clone(), Duration::ZERO, SECRET)
        };
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();
        let mut input = input(&course, PaymentStatus::Completed);
        let payment_id = Uuid::new_v4();
        input.payment_id = Some(payment_id);
        let payer = input.payer_id;
        let admin = caller(Role::Admin);

        let err = record_payment(&ctx, &admin, input).await.unwrap_err();

        assert!(matches!(err, EndpointError::Internal));
        assert_eq!(repo.get_payment(&payment_id).await.unwrap().status, PaymentStatus::Pending);

        ctx.enrollments = repo.clone();
        let settled = update_payment_status(
            &ctx,
            &admin,
            payment_id,
            UpdatePaymentStatusInput {
                status: PaymentStatus::Completed,
            },
        )
        .await
        .unwrap();

        assert_eq!(settled.payment.status, PaymentStatus::Completed);
        assert!(repo.find_enrollment(&payer, &course.course_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_payments_are_recorded_without_enrollment() {
        let ctx = memory_context();
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();

        let output = record_payment(&ctx, &caller(Role::Admin), input(&course, PaymentStatus::Failed))
            .await
            .unwrap();

        assert_eq!(output.payment.status, PaymentStatus::Failed);
        assert!(output.enrollment.is_none());
        assert!(ctx.enrollments.list_enrollments(&Default::default()).await.unwrap().is_empty());
    }
}
