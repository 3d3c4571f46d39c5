use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError, OperationError};
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use super::Caller;
use crate::catalog::Course;
use crate::repository::CourseFilter;
use crate::Context;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListInstructorCoursesInput {
    /// Defaults to the caller. Only administrators may look at another instructor.
    #[serde(default)]
    pub instructor_id: Option<Uuid>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListInstructorCoursesOutput {
    pub courses: Vec<Course>,
}

#[non_exhaustive]
#[derive(Debug, Error, AsRefStr)]
pub enum ListInstructorCoursesError {
    #[error("Not allowed to list the courses of another instructor.")]
    Forbidden,
}

impl OperationError for ListInstructorCoursesError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &str {
        self.as_ref()
    }
}

/// Every course of an instructor regardless of status, newest first.
#[tracing::instrument(skip(ctx))]
pub async fn list_instructor_courses(
    ctx: &Context,
    caller: &Caller,
    input: ListInstructorCoursesInput,
) -> Result<ListInstructorCoursesOutput, EndpointError<ListInstructorCoursesError>> {
    let instructor_id = input.instructor_id.unwrap_or(caller.account_id);
    if instructor_id != caller.account_id && !caller.is_admin() {
        return Err(EndpointError::operation(ListInstructorCoursesError::Forbidden));
    }

    let mut courses = ctx
        .courses
        .list_courses(&CourseFilter::by_instructor(instructor_id))
        .await
        .map_err(simple_err_map!("Failed to list courses.", EndpointError::internal()))?;
    courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ListInstructorCoursesOutput { courses })
}

#[cfg(test)]
mod tests {
    use service_core::auth::Role;

    use super::*;
    use crate::catalog::CourseStatus;
    use crate::test_utils::{active_course, caller, memory_context};

    #[tokio::test]
    async fn lists_own_courses_in_every_status() {
        let ctx = memory_context();
        let owner = caller(Role::Creator);
        let mut draft = active_course(owner.account_id, 500);
        draft.status = CourseStatus::Draft;
        ctx.courses.create_course(&draft).await.unwrap();
        ctx.courses
            .create_course(&active_course(owner.account_id, 900))
            .await
            .unwrap();
        ctx.courses
            .create_course(&active_course(Uuid::new_v4(), 900))
            .await
            .unwrap();

        let output = list_instructor_courses(&ctx, &owner, Default::default()).await.unwrap();

        assert_eq!(output.courses.len(), 2);
        assert!(output.courses.iter().all(|c| c.instructor_id == owner.account_id));
    }

    #[tokio::test]
    async fn only_admins_see_other_instructors() {
        let ctx = memory_context();
        let input = ListInstructorCoursesInput {
            instructor_id: Some(Uuid::new_v4()),
        };

        assert!(matches!(
            list_instructor_courses(&ctx, &caller(Role::Creator), input.clone()).await,
            Err(EndpointError::Operation(ListInstructorCoursesError::Forbidden))
        ));
        assert!(list_instructor_courses(&ctx, &caller(Role::Admin), input).await.is_ok());
    }
}
