use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CourseFilter, CoursesRepository, RepositoryError};
use crate::catalog::{Course, CourseStatus};

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(value: T) -> Self {
        Entry {
            value,
            stored_at: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.stored_at.elapsed() < ttl).then(|| self.value.clone())
    }
}

/// Read-through cache in front of a catalog.
///
/// Entries younger than the TTL are served without touching the store. When the store is
/// unavailable, the last known value is served regardless of its age.
pub struct CachedCoursesRepository<R: CoursesRepository + ?Sized> {
    inner: Arc<R>,
    ttl: Duration,
    courses: RwLock<HashMap<Uuid, Entry<Course>>>,
    listings: RwLock<HashMap<CourseFilter, Entry<Vec<Course>>>>,
}

impl<R: CoursesRepository + ?Sized> CachedCoursesRepository<R> {
    pub fn new(inner: Arc<R>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            courses: RwLock::new(HashMap::new()),
            listings: RwLock::new(HashMap::new()),
        }
    }

    async fn remember(&self, course: &Course) {
        self.courses.write().await.insert(course.course_id, Entry::new(course.clone()));
        self.listings.write().await.clear();
    }

    async fn forget(&self, course_id: &Uuid) {
        self.courses.write().await.remove(course_id);
        self.listings.write().await.clear();
    }
}

#[async_trait]
impl<R: CoursesRepository + ?Sized> CoursesRepository for CachedCoursesRepository<R> {
    async fn create_course(&self, course: &Course) -> Result<(), RepositoryError> {
        self.inner.create_course(course).await?;
        self.remember(course).await;
        Ok(())
    }

    async fn get_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError> {
        if let Some(course) = self.courses.read().await.get(course_id).and_then(|e| e.fresh(self.ttl)) {
            return Ok(course);
        }

        match self.inner.get_course(course_id).await {
            Ok(course) => {
                self.courses.write().await.insert(*course_id, Entry::new(course.clone()));
                Ok(course)
            }
            Err(RepositoryError::NotFound) => {
                self.courses.write().await.remove(course_id);
                Err(RepositoryError::NotFound)
            }
            Err(e) if e.is_unavailable() => match self.courses.read().await.get(course_id) {
                Some(stale) => {
                    tracing::warn!(error = %e, %course_id, "Catalog unavailable, serving cached course.");
                    Ok(stale.value.clone())
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn load_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError> {
        match self.inner.load_course(course_id).await {
            Ok(course) => {
                self.courses.write().await.insert(*course_id, Entry::new(course.clone()));
                Ok(course)
            }
            Err(RepositoryError::NotFound) => {
                self.courses.write().await.remove(course_id);
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_course(&self, course: &Course, expected: CourseStatus) -> Result<(), RepositoryError> {
        match self.inner.update_course(course, expected).await {
            Ok(()) => {
                self.remember(course).await;
                Ok(())
            }
            Err(e @ (RepositoryError::NotFound | RepositoryError::ConditionFailed)) => {
                self.forget(&course.course_id).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RepositoryError> {
        if let Some(courses) = self.listings.read().await.get(filter).and_then(|e| e.fresh(self.ttl)) {
            return Ok(courses);
        }

        match self.inner.list_courses(filter).await {
            Ok(courses) => {
                self.listings
                    .write()
                    .await
                    .insert(filter.clone(), Entry::new(courses.clone()));
                Ok(courses)
            }
            Err(e) if e.is_unavailable() => match self.listings.read().await.get(filter) {
                Some(stale) => {
                    tracing::warn!(error = %e, ?filter, "Catalog unavailable, serving cached listing.");
                    Ok(stale.value.clone())
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}
