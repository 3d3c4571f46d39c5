pub mod api;
pub mod catalog;
pub mod context;
pub mod enrollment;
pub mod operations;
pub mod payment;
pub mod repository;
pub mod revenue;

pub use context::Context;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use service_core::auth::Role;
    use uuid::Uuid;

    use crate::catalog::{Course, CourseLevel, CourseModule, CourseStatus, CourseType, Lesson, PricingModel};
    use crate::enrollment::Enrollment;
    use crate::operations::Caller;
    use crate::payment::{Payment, PaymentMethod, PaymentStatus};
    use crate::repository::{EnrollmentFilter, EnrollmentsRepository, MemoryRepository, RepositoryError};
    use crate::Context;

    // base64 of "course-service-test-secret"
    pub const SECRET: &str = "Y291cnNlLXNlcnZpY2UtdGVzdC1zZWNyZXQ=";

    pub fn active_course(instructor_id: Uuid, price: i64) -> Course {
        Course::builder()
            .title("Rust for Busy People")
            .description("Ownership, borrowing and async in two weeks.")
            .price(Decimal::from(price))
            .course_type(CourseType::Sprint)
            .pricing_model(if price == 0 {
                PricingModel::Free
            } else {
                PricingModel::OneTime
            })
            .status(CourseStatus::Active)
            .instructor_id(instructor_id)
            .level(CourseLevel::Beginner)
            .category("Programming")
            .build()
    }

    pub fn course_with_lessons(lessons: usize) -> Course {
        let mut course = active_course(Uuid::new_v4(), 1499);
        course.curriculum = vec![CourseModule {
            module_id: Uuid::new_v4(),
            title: "Basics".to_string(),
            lessons: (0..lessons)
                .map(|i| Lesson {
                    lesson_id: Uuid::new_v4(),
                    title: format!("Lesson {}", i + 1),
                    duration_minutes: Some(15),
                })
                .collect(),
            release_after_days: None,
        }];
        course
    }

    pub fn payment(payer_id: Uuid, course: &Course, amount: i64, status: PaymentStatus) -> Payment {
        Payment::builder()
            .payer_id(payer_id)
            .course_id(course.course_id)
            .amount(Decimal::from(amount))
            .currency("PHP")
            .status(status)
            .method(PaymentMethod::GCash)
            .transaction_id(format!("TXN-{}", Uuid::new_v4().simple()))
            .build()
    }

    pub fn caller(role: Role) -> Caller {
        Caller {
            account_id: Uuid::new_v4(),
            role,
        }
    }

    pub fn memory_context() -> Context {
        Context::with_repository(Arc::new(MemoryRepository::new()), Duration::ZERO, SECRET)
    }

    /// A second service instance over the same tables, with its own catalog cache.
    pub fn cached_context(repository: &Arc<MemoryRepository>) -> Context {
        Context::with_repository(repository.clone(), Duration::from_secs(30), SECRET)
    }

    /// Enrollment store whose every call fails as if the database were unreachable.
    pub struct BrokenEnrollments;

    fn unavailable() -> RepositoryError {
        RepositoryError::datastore(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "enrollments table unreachable",
        ))
    }

    #[async_trait]
    impl EnrollmentsRepository for BrokenEnrollments {
        async fn create_enrollment(&self, _: &Enrollment) -> Result<(), RepositoryError> {
            Err(unavailable())
        }

        async fn get_enrollment(&self, _: &Uuid) -> Result<Enrollment, RepositoryError> {
            Err(unavailable())
        }

        async fn find_enrollment(&self, _: &Uuid, _: &Uuid) -> Result<Option<Enrollment>, RepositoryError> {
            Err(unavailable())
        }

        async fn update_enrollment(&self, _: &Enrollment) -> Result<(), RepositoryError> {
            Err(unavailable())
        }

        async fn list_enrollments(&self, _: &EnrollmentFilter) -> Result<Vec<Enrollment>, RepositoryError> {
            Err(unavailable())
        }
    }
}
