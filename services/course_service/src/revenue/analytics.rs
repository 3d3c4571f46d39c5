use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::split::RevenueSplit;
use crate::catalog::{Course, CourseStatus};
use crate::enrollment::Enrollment;
use crate::payment::Payment;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstructorRevenue {
    pub instructor_id: Uuid,
    #[serde(flatten)]
    pub split: RevenueSplit,
    pub completed_payments: usize,
    pub total_students: usize,
    pub courses: Vec<CourseRevenue>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CourseRevenue {
    pub course_id: Uuid,
    pub title: String,
    pub status: CourseStatus,
    pub revenue: Decimal,
    pub completed_payments: usize,
    pub enrollments: usize,
    pub average_rating: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlatformSummary {
    #[serde(flatten)]
    pub split: RevenueSplit,
    pub total_courses: usize,
    pub active_courses: usize,
    pub total_students: usize,
    pub total_enrollments: usize,
    pub course_ratings: Vec<CourseRating>,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CourseRating {
    pub course_id: Uuid,
    pub title: String,
    pub average_rating: Option<f64>,
    pub ratings: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub courses: usize,
    pub enrollments: usize,
    pub revenue: Decimal,
}

/// Completed payment totals and counts, keyed by course.
fn completed_revenue_by_course(payments: &[Payment]) -> HashMap<Uuid, (Decimal, usize)> {
    let mut by_course: HashMap<Uuid, (Decimal, usize)> = HashMap::new();
    for payment in payments.iter().filter(|p| p.is_completed()) {
        let entry = by_course.entry(payment.course_id).or_insert((Decimal::ZERO, 0));
        entry.0 += payment.amount;
        entry.1 += 1;
    }
    by_course
}

fn average_rating<'a>(enrollments: impl Iterator<Item = &'a Enrollment>) -> (Option<f64>, usize) {
    let ratings: Vec<u8> = enrollments.filter_map(|e| e.rating).collect();
    if ratings.is_empty() {
        return (None, 0);
    }

    let sum: u32 = ratings.iter().map(|r| *r as u32).sum();
    let avg = sum as f64 / ratings.len() as f64;
    (Some((avg * 100.0).round() / 100.0), ratings.len())
}

/// Revenue of one instructor: the sum of completed payments for the courses they own.
pub fn instructor_revenue(
    instructor_id: Uuid,
    courses: &[Course],
    enrollments: &[Enrollment],
    payments: &[Payment],
) -> InstructorRevenue {
    let owned: Vec<&Course> = courses.iter().filter(|c| c.instructor_id == instructor_id).collect();
    let owned_ids: HashSet<Uuid> = owned.iter().map(|c| c.course_id).collect();
    let revenue = completed_revenue_by_course(payments);

    let per_course: Vec<CourseRevenue> = owned
        .iter()
        .map(|course| {
            let (amount, count) = revenue.get(&course.course_id).copied().unwrap_or((Decimal::ZERO, 0));
            let course_enrollments = || enrollments.iter().filter(|e| e.course_id == course.course_id);
            let (average_rating, _) = average_rating(course_enrollments());

            CourseRevenue {
                course_id: course.course_id,
                title: course.title.clone(),
                status: course.status,
                revenue: amount,
                completed_payments: count,
                enrollments: course_enrollments().count(),
                average_rating,
            }
        })
        .collect();

    let total: Decimal = per_course.iter().map(|c| c.revenue).sum();
    let students: HashSet<Uuid> = enrollments
        .iter()
        .filter(|e| owned_ids.contains(&e.course_id))
        .map(|e| e.learner_id)
        .collect();

    InstructorRevenue {
        instructor_id,
        split: RevenueSplit::from_total(total),
        completed_payments: per_course.iter().map(|c| c.completed_payments).sum(),
        total_students: students.len(),
        courses: per_course,
    }
}

/// Platform wide rollup over every course, enrollment and payment.
pub fn platform_summary(courses: &[Course], enrollments: &[Enrollment], payments: &[Payment]) -> PlatformSummary {
    let total: Decimal = payments.iter().filter(|p| p.is_completed()).map(|p| p.amount).sum();
    let revenue = completed_revenue_by_course(payments);
    let students: HashSet<Uuid> = enrollments.iter().map(|e| e.learner_id).collect();

    let mut enrollments_by_course: HashMap<Uuid, Vec<&Enrollment>> = HashMap::new();
    for enrollment in enrollments {
        enrollments_by_course.entry(enrollment.course_id).or_default().push(enrollment);
    }

    let mut categories: BTreeMap<&str, CategoryBreakdown> = BTreeMap::new();
    let mut course_ratings = Vec::with_capacity(courses.len());
    for course in courses {
        let course_enrollments = enrollments_by_course.get(&course.course_id).map(Vec::as_slice).unwrap_or(&[]);
        let (average, ratings) = average_rating(course_enrollments.iter().copied());
        course_ratings.push(CourseRating {
            course_id: course.course_id,
            title: course.title.clone(),
            average_rating: average,
            ratings,
        });

        let category = categories
            .entry(course.category.as_str())
            .or_insert_with(|| CategoryBreakdown {
                category: course.category.clone(),
                courses: 0,
                enrollments: 0,
                revenue: Decimal::ZERO,
            });
        category.courses += 1;
        category.enrollments += course_enrollments.len();
        category.revenue += revenue.get(&course.course_id).map(|(amount, _)| *amount).unwrap_or(Decimal::ZERO);
    }

    PlatformSummary {
        split: RevenueSplit::from_total(total),
        total_courses: courses.len(),
        active_courses: courses.iter().filter(|c| c.status == CourseStatus::Active).count(),
        total_students: students.len(),
        total_enrollments: enrollments.len(),
        course_ratings,
        categories: categories.into_values().collect(),
    }
}
