use actix_web::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::record_payment::enroll_payer;
use super::Caller;
use crate::enrollment::Enrollment;
use crate::payment::{Payment, PaymentStatus};
use crate::repository::RepositoryError;
use crate::Context;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePaymentStatusInput {
    pub status: PaymentStatus,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePaymentStatusOutput {
    pub payment: Payment,
    pub enrollment: Option<Enrollment>,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum UpdatePaymentStatusError {
    #[error("Only administrators can update payments.")]
    Forbidden,

    #[error("Payment not found.")]
    NotFound,

    #[error("The payment is already {0:?}.")]
    InvalidState(PaymentStatus),
}

impl OperationError for UpdatePaymentStatusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Settles a Pending payment as Completed or Failed. Completion enrolls the payer.
#[tracing::instrument(skip(ctx))]
pub async fn update_payment_status(
    ctx: &Context,
    caller: &Caller,
    payment_id: Uuid,
    input: UpdatePaymentStatusInput,
) -> Result<UpdatePaymentStatusOutput, EndpointError<UpdatePaymentStatusError>> {
    if !caller.is_admin() {
        return Err(EndpointError::operation(UpdatePaymentStatusError::Forbidden));
    }
    if !input.status.is_final() {
        return Err(EndpointError::validation("Status must be Completed or Failed."));
    }

    let current = ctx.payments.get_payment(&payment_id).await.map_err(|e| match e {
        RepositoryError::NotFound => EndpointError::operation(UpdatePaymentStatusError::NotFound),
        _ => {
            tracing::error!(error = ?e, "Failed to retrieve payment.");
            EndpointError::internal()
        }
    })?;
    if current.status.is_final() {
        return Err(EndpointError::operation(UpdatePaymentStatusError::InvalidState(
            current.status,
        )));
    }

    // The payer is enrolled before the payment is marked Completed. A failure in between leaves
    // it Pending, and settling it again is safe.
    let enrollment = if input.status == PaymentStatus::Completed {
        let course = ctx
            .courses
            .get_course(&current.course_id)
            .await
            .map_err(simple_err_map!("Failed to retrieve paid course.", EndpointError::internal()))?;
        let enrollment = enroll_payer(ctx, &current, &course)
            .await
            .map_err(simple_err_map!("Failed to enroll payer.", EndpointError::internal()))?;
        Some(enrollment)
    } else {
        None
    };

    let payment = ctx
        .payments
        .update_payment_status(&payment_id, PaymentStatus::Pending, input.status, Utc::now())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => EndpointError::operation(UpdatePaymentStatusError::NotFound),
            // Settled concurrently.
            RepositoryError::ConditionFailed => {
                EndpointError::operation(UpdatePaymentStatusError::InvalidState(input.status))
            }
            _ => {
                tracing::error!(error = ?e, "Failed to update payment.");
                EndpointError::internal()
            }
        })?;
    tracing::info!(status = ?payment.status, "Payment settled.");

    Ok(UpdatePaymentStatusOutput { payment, enrollment })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use service_core::auth::Role;

    use super::*;
    use crate::repository::{EnrollmentsRepository, MemoryRepository, PaymentsRepository};
    use crate::test_utils::{active_course, caller, memory_context, payment, BrokenEnrollments, SECRET};

    async fn pending(ctx: &Context) -> Payment {
        let course = active_course(Uuid::new_v4(), 1499);
        ctx.courses.create_course(&course).await.unwrap();
        let payment = payment(Uuid::new_v4(), &course, 1499, PaymentStatus::Pending);
        ctx.payments.create_payment(&payment).await.unwrap();
        payment
    }

    fn to(status: PaymentStatus) -> UpdatePaymentStatusInput {
        UpdatePaymentStatusInput { status }
    }

    #[tokio::test]
    async fn completion_enrolls_the_payer() {
        let ctx = memory_context();
        let payment = pending(&ctx).await;

        let output = update_payment_status(&ctx, &caller(Role::Admin), payment.payment_id, to(PaymentStatus::Completed))
            .await
            .unwrap();

        assert_eq!(output.payment.status, PaymentStatus::Completed);
        assert_eq!(output.enrollment.unwrap().learner_id, payment.payer_id);
    }

    #[tokio::test]
    async fn failure_does_not_enroll() {
        let ctx = memory_context();
        let payment = pending(&ctx).await;

        let output = update_payment_status(&ctx, &caller(Role::Admin), payment.payment_id, to(PaymentStatus::Failed))
            .await
            .unwrap();

        assert_eq!(output.payment.status, PaymentStatus::Failed);
        assert!(output.enrollment.is_none());
    }

    #[tokio::test]
    async fn settled_payments_are_final() {
        let ctx = memory_context();
        let payment = pending(&ctx).await;
        let admin = caller(Role::Admin);
        update_payment_status(&ctx, &admin, payment.payment_id, to(PaymentStatus::Failed))
            .await
            .unwrap();

        let err = update_payment_status(&ctx, &admin, payment.payment_id, to(PaymentStatus::Completed))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EndpointError::Operation(UpdatePaymentStatusError::InvalidState(PaymentStatus::Failed))
        ));
    }

    #[tokio::test]
    async fn cannot_move_back_to_pending() {
        let ctx = memory_context();
        let payment = pending(&ctx).await;

        let err = update_payment_status(&ctx, &caller(Role::Admin), payment.payment_id, to(PaymentStatus::Pending))
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Validation(_)));
    }

    #[tokio::test]
    async fn completion_waits_for_the_enrollment() {
        let repo = Arc::new(MemoryRepository::new());
        let mut ctx = Context {
            enrollments: Arc::new(BrokenEnrollments),
            ..Context::with_repository(repo.clone(), Duration::ZERO, SECRET)
        };
        let payment = pending(&ctx).await;
        let admin = caller(Role::Admin);

        let err = update_payment_status(&ctx, &admin, payment.payment_id, to(PaymentStatus::Completed))
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Internal));
        assert_eq!(
            repo.get_payment(&payment.payment_id).await.unwrap().status,
            PaymentStatus::Pending
        );

        ctx.enrollments = repo.clone();
        let output = update_payment_status(&ctx, &admin, payment.payment_id, to(PaymentStatus::Completed))
            .await
            .unwrap();

        assert_eq!(output.payment.status, PaymentStatus::Completed);
        assert!(repo
            .find_enrollment(&payment.payer_id, &payment.course_id)
            .await
            .unwrap()
            .is_some());
    }
}
