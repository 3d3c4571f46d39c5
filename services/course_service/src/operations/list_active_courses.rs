use std::convert::Infallible;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::{simple_err_map, EndpointError};

use crate::catalog::{Course, CourseType};
use crate::repository::CourseFilter;
use crate::Context;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListActiveCoursesInput {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub min_price: Option<Decimal>,

    #[serde(default)]
    pub max_price: Option<Decimal>,

    /// Case insensitive match on title or description.
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub course_type: Option<CourseType>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListActiveCoursesOutput {
    pub courses: Vec<Course>,
}

impl ListActiveCoursesInput {
    fn matches(&self, course: &Course, search: Option<&str>) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| course.category.eq_ignore_ascii_case(c))
            && self.min_price.map_or(true, |p| course.price >= p)
            && self.max_price.map_or(true, |p| course.price <= p)
            && self.course_type.map_or(true, |t| course.course_type == t)
            && search.map_or(true, |s| {
                course.title.to_lowercase().contains(s) || course.description.to_lowercase().contains(s)
            })
    }
}

/// Public marketplace listing: Active courses only, newest first.
#[tracing::instrument(skip(ctx))]
pub async fn list_active_courses(
    ctx: &Context,
    input: ListActiveCoursesInput,
) -> Result<ListActiveCoursesOutput, EndpointError<Infallible>> {
    if let (Some(min), Some(max)) = (input.min_price, input.max_price) {
        if min > max {
            return Err(EndpointError::validation("minPrice cannot be greater than maxPrice."));
        }
    }

    let search = input
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut courses: Vec<Course> = ctx
        .courses
        .list_courses(&CourseFilter::active())
        .await
        .map_err(simple_err_map!("Failed to list courses.", EndpointError::internal()))?
        .into_iter()
        .filter(|c| c.is_listed() && input.matches(c, search.as_deref()))
        .collect();
    courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ListActiveCoursesOutput { courses })
}
