//! Persistence traits and their implementations.
//!
//! Operations only see the traits. `MemoryRepository` backs local runs and tests,
//! `DdbRepository` stores everything in DynamoDB and `CachedCoursesRepository` puts a staleness
//! bounded cache in front of any catalog.

pub mod cached;
pub mod ddb_repository;
pub mod memory;

use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{Course, CourseStatus};
use crate::enrollment::Enrollment;
use crate::payment::{Payment, PaymentStatus};

pub use cached::CachedCoursesRepository;
pub use ddb_repository::{DdbRepository, ThreadSafeDdbClient};
pub use memory::MemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Item not found.")]
    NotFound,

    #[error("Item already exists.")]
    Duplicate,

    #[error("Item was modified concurrently or is not in the expected state.")]
    ConditionFailed,

    #[error("Malformed item: {0}")]
    Serialization(String),

    #[error(transparent)]
    Datastore(#[from] Box<dyn Error + Send + Sync>),
}

impl RepositoryError {
    pub fn datastore(err: impl Error + Send + Sync + 'static) -> Self {
        RepositoryError::Datastore(Box::new(err))
    }

    /// Whether the failure comes from the backing store being unreachable or failing, as opposed to
    /// a well defined outcome such as a missing item.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RepositoryError::Datastore(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CourseFilter {
    pub status: Option<CourseStatus>,
    pub instructor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentFilter {
    pub learner_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub course_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

impl CourseFilter {
    pub fn active() -> Self {
        CourseFilter {
            status: Some(CourseStatus::Active),
            ..Default::default()
        }
    }

    pub fn by_instructor(instructor_id: Uuid) -> Self {
        CourseFilter {
            instructor_id: Some(instructor_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, course: &Course) -> bool {
        self.status.map_or(true, |s| course.status == s)
            && self.instructor_id.map_or(true, |id| course.instructor_id == id)
    }
}

impl EnrollmentFilter {
    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        self.learner_id.map_or(true, |id| enrollment.learner_id == id)
            && self.course_id.map_or(true, |id| enrollment.course_id == id)
    }
}

impl PaymentFilter {
    pub fn completed() -> Self {
        PaymentFilter {
            status: Some(PaymentStatus::Completed),
            ..Default::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.course_id.map_or(true, |id| payment.course_id == id) && self.status.map_or(true, |s| payment.status == s)
    }
}

#[async_trait]
pub trait CoursesRepository: Send + Sync {
    /// Stores a new course. Fails with `Duplicate` if the course ID is taken.
    async fn create_course(&self, course: &Course) -> Result<(), RepositoryError>;

    async fn get_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError>;

    /// Reads a course from the backing store, skipping any cache. Status changes start here.
    async fn load_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError> {
        self.get_course(course_id).await
    }

    /// Replaces a stored course whose status is still `expected`. Fails with `NotFound` if it does
    /// not exist and with `ConditionFailed` if its status changed in the meantime.
    async fn update_course(&self, course: &Course, expected: CourseStatus) -> Result<(), RepositoryError>;

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RepositoryError>;
}

#[async_trait]
pub trait EnrollmentsRepository: Send + Sync {
    /// Stores a new enrollment. Fails with `Duplicate` if the learner is already enrolled in the
    /// course.
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;

    async fn get_enrollment(&self, enrollment_id: &Uuid) -> Result<Enrollment, RepositoryError>;

    async fn find_enrollment(&self, learner_id: &Uuid, course_id: &Uuid) -> Result<Option<Enrollment>, RepositoryError>;

    /// Replaces a stored enrollment. Last write wins.
    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;

    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, RepositoryError>;
}

#[async_trait]
pub trait PaymentsRepository: Send + Sync {
    /// Stores a new payment. Fails with `Duplicate` if the payment ID is taken.
    async fn create_payment(&self, payment: &Payment) -> Result<(), RepositoryError>;

    async fn get_payment(&self, payment_id: &Uuid) -> Result<Payment, RepositoryError>;

    /// Moves a payment from `expected` to `status` and returns the updated record. Fails with
    /// `ConditionFailed` if the payment is not in the `expected` status anymore.
    async fn update_payment_status(
        &self,
        payment_id: &Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Payment, RepositoryError>;

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, RepositoryError>;
}
