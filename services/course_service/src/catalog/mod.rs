//! Course catalog: the course entity, its validation rules, lifecycle and course type defaults.

pub mod course_type;
pub mod lifecycle;
pub mod types;
pub mod validation;

pub use lifecycle::InvalidTransition;
pub use types::{
    AccessPolicy, Course, CourseFeatures, CourseLevel, CourseModule, CourseStatus, CourseType, InstallmentFrequency,
    Lesson, PaymentPlan, PricingModel, SubscriptionPeriod,
};
pub use validation::{validate_course, CourseValidationError};
