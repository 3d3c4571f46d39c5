use std::collections::HashMap;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::{simple_err_map, EndpointError};
use uuid::Uuid;

use super::Caller;
use crate::catalog::Course;
use crate::enrollment::Enrollment;
use crate::repository::{EnrollmentFilter, RepositoryError};
use crate::Context;

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct LearnerEnrollment {
    #[serde(flatten)]
    pub enrollment: Enrollment,

    /// `None` if the course has been removed from the catalog.
    pub course_title: Option<String>,

    /// `None` for lifetime access.
    pub access_expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListLearnerEnrollmentsOutput {
    pub enrollments: Vec<LearnerEnrollment>,
}

/// Learner dashboard: the caller's enrollments, most recently accessed first.
#[tracing::instrument(skip(ctx))]
pub async fn list_learner_enrollments(
    ctx: &Context,
    caller: &Caller,
) -> Result<ListLearnerEnrollmentsOutput, EndpointError<Infallible>> {
    let mut enrollments = ctx
        .enrollments
        .list_enrollments(&EnrollmentFilter {
            learner_id: Some(caller.account_id),
            ..Default::default()
        })
        .await
        .map_err(simple_err_map!("Failed to list enrollments.", EndpointError::internal()))?;
    enrollments.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));

    let mut courses: HashMap<Uuid, Course> = HashMap::new();
    for enrollment in &enrollments {
        if courses.contains_key(&enrollment.course_id) {
            continue;
        }
        match ctx.courses.get_course(&enrollment.course_id).await {
            Ok(course) => {
                courses.insert(course.course_id, course);
            }
            Err(RepositoryError::NotFound) => {
                tracing::warn!(course_id = %enrollment.course_id, "Enrollment references a missing course.");
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to retrieve course.");
                return Err(EndpointError::internal());
            }
        }
    }

    let enrollments = enrollments
        .into_iter()
        .map(|enrollment| {
            let course = courses.get(&enrollment.course_id);
            LearnerEnrollment {
                course_title: course.map(|c| c.title.clone()),
                access_expires_at: course.and_then(|c| c.access_expires_at(enrollment.enrolled_at)),
                enrollment,
            }
        })
        .collect();

    Ok(ListLearnerEnrollmentsOutput { enrollments })
}
