use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{AccessPolicy, Course, PricingModel};

#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CourseValidationError {
    #[error("{0} is required.")]
    MissingField(&'static str),

    #[error("Price cannot be negative.")]
    NegativePrice,

    #[error("A course priced at 0 must use the Free pricing model.")]
    ZeroPriceNotFree,

    #[error("A Free course must be priced at 0.")]
    FreeCourseWithPrice,

    #[error("PaymentPlan pricing requires payment plan details.")]
    MissingPaymentPlan,

    #[error("A payment plan needs at least 2 installments of a positive amount.")]
    InvalidPaymentPlan,

    #[error("Subscription pricing requires a subscription period.")]
    MissingSubscriptionPeriod,

    #[error("Limited access requires a duration of at least one day.")]
    InvalidAccessDuration,

    #[error("Lesson identifiers must be unique within a course.")]
    DuplicateLesson,
}

/// Checks the invariants every stored course must satisfy.
pub fn validate_course(course: &Course) -> Result<(), CourseValidationError> {
    use CourseValidationError::*;

    if course.title.trim().is_empty() {
        return Err(MissingField("Title"));
    }
    if course.description.trim().is_empty() {
        return Err(MissingField("Description"));
    }
    if course.category.trim().is_empty() {
        return Err(MissingField("Category"));
    }
    if course.instructor_id.is_nil() {
        return Err(MissingField("InstructorId"));
    }

    validate_pricing(course)?;

    if let AccessPolicy::Limited { duration_days: 0 } = course.access {
        return Err(InvalidAccessDuration);
    }

    let mut lesson_ids = HashSet::new();
    let all_unique = course
        .curriculum
        .iter()
        .flat_map(|m| m.lessons.iter())
        .all(|l| lesson_ids.insert(l.lesson_id));
    if !all_unique {
        return Err(DuplicateLesson);
    }

    Ok(())
}

fn validate_pricing(course: &Course) -> Result<(), CourseValidationError> {
    use CourseValidationError::*;

    if course.price < Decimal::ZERO {
        return Err(NegativePrice);
    }

    let is_free = course.pricing_model == PricingModel::Free;
    if course.price.is_zero() && !is_free {
        return Err(ZeroPriceNotFree);
    }
    if !course.price.is_zero() && is_free {
        return Err(FreeCourseWithPrice);
    }

    match course.pricing_model {
        PricingModel::PaymentPlan => {
            let plan = course.payment_plan.as_ref().ok_or(MissingPaymentPlan)?;
            if plan.installments < 2 || plan.installment_amount <= Decimal::ZERO {
                return Err(InvalidPaymentPlan);
            }
        }
        PricingModel::Subscription => {
            course.subscription_period.ok_or(MissingSubscriptionPeriod)?;
        }
        PricingModel::OneTime | PricingModel::Free => {}
    }

    Ok(())
}
