use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CourseFilter, CoursesRepository, EnrollmentFilter, EnrollmentsRepository, PaymentFilter, PaymentsRepository,
    RepositoryError,
};
use crate::catalog::{Course, CourseStatus};
use crate::enrollment::Enrollment;
use crate::payment::{Payment, PaymentStatus};

/// Process local store. Every table sits behind its own lock.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    courses: RwLock<HashMap<Uuid, Course>>,
    enrollments: RwLock<HashMap<Uuid, Enrollment>>,
    payments: RwLock<HashMap<Uuid, Payment>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoursesRepository for MemoryRepository {
    async fn create_course(&self, course: &Course) -> Result<(), RepositoryError> {
        let mut courses = self.courses.write().await;
        if courses.contains_key(&course.course_id) {
            return Err(RepositoryError::Duplicate);
        }

        courses.insert(course.course_id, course.clone());
        Ok(())
    }

    async fn get_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError> {
        self.courses
            .read()
            .await
            .get(course_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_course(&self, course: &Course, expected: CourseStatus) -> Result<(), RepositoryError> {
        let mut courses = self.courses.write().await;
        let stored = courses.get_mut(&course.course_id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::ConditionFailed);
        }

        *stored = course.clone();
        Ok(())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RepositoryError> {
        Ok(self
            .courses
            .read()
            .await
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EnrollmentsRepository for MemoryRepository {
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut enrollments = self.enrollments.write().await;
        let exists = enrollments
            .values()
            .any(|e| e.learner_id == enrollment.learner_id && e.course_id == enrollment.course_id);
        if exists || enrollments.contains_key(&enrollment.enrollment_id) {
            return Err(RepositoryError::Duplicate);
        }

        enrollments.insert(enrollment.enrollment_id, enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(&self, enrollment_id: &Uuid) -> Result<Enrollment, RepositoryError> {
        self.enrollments
            .read()
            .await
            .get(enrollment_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_enrollment(&self, learner_id: &Uuid, course_id: &Uuid) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self
            .enrollments
            .read()
            .await
            .values()
            .find(|e| &e.learner_id == learner_id && &e.course_id == course_id)
            .cloned())
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut enrollments = self.enrollments.write().await;
        let stored = enrollments
            .get_mut(&enrollment.enrollment_id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = enrollment.clone();
        Ok(())
    }

    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(self
            .enrollments
            .read()
            .await
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentsRepository for MemoryRepository {
    async fn create_payment(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.payment_id) {
            return Err(RepositoryError::Duplicate);
        }

        payments.insert(payment.payment_id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, payment_id: &Uuid) -> Result<Payment, RepositoryError> {
        self.payments
            .read()
            .await
            .get(payment_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_payment_status(
        &self,
        payment_id: &Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Payment, RepositoryError> {
        let mut payments = self.payments.write().await;
        let payment = payments.get_mut(payment_id).ok_or(RepositoryError::NotFound)?;
        if payment.status != expected {
            return Err(RepositoryError::ConditionFailed);
        }

        payment.status = status;
        payment.updated_at = at;
        Ok(payment.clone())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }
}
