use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[serde(rename_all = "PascalCase")]
pub struct Course {
    #[serde(default = "Uuid::nil")]
    #[builder(default = Uuid::new_v4())]
    pub course_id: Uuid,

    #[builder(setter(into))]
    pub title: String,

    #[builder(setter(into))]
    pub description: String,

    pub price: Decimal,

    pub course_type: CourseType,

    pub pricing_model: PricingModel,

    #[serde(default)]
    #[builder(default)]
    pub status: CourseStatus,

    pub instructor_id: Uuid,

    pub level: CourseLevel,

    #[builder(setter(into))]
    pub category: String,

    #[serde(default)]
    #[builder(default)]
    pub features: CourseFeatures,

    #[serde(default)]
    #[builder(default)]
    pub access: AccessPolicy,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub curriculum: Vec<CourseModule>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub payment_plan: Option<PaymentPlan>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub subscription_period: Option<SubscriptionPeriod>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub duration_days: Option<u32>,

    #[serde(default = "Utc::now")]
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum CourseType {
    Sprint,
    Marathon,
    Membership,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum PricingModel {
    OneTime,
    PaymentPlan,
    Subscription,
    Free,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum CourseStatus {
    Draft,
    PendingApproval,
    Active,
    Inactive,
    Archived,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CourseFeatures {
    #[serde(default)]
    pub certificate: bool,
    #[serde(default)]
    pub community: bool,
    #[serde(default)]
    pub live_sessions: bool,
    #[serde(default)]
    pub downloadable_resources: bool,
    #[serde(default)]
    pub assignments: bool,
    #[serde(default)]
    pub quizzes: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "Kind")]
pub enum AccessPolicy {
    Lifetime,
    Limited {
        #[serde(rename = "DurationDays")]
        duration_days: u32,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentPlan {
    pub installments: u32,
    pub installment_amount: Decimal,
    pub frequency: InstallmentFrequency,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallmentFrequency {
    Weekly,
    Monthly,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

/// A group of lessons. Modules with `release_after_days` are drip released: they unlock that many
/// days after the learner enrolled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CourseModule {
    #[serde(default = "Uuid::new_v4")]
    pub module_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_after_days: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Lesson {
    #[serde(default = "Uuid::new_v4")]
    pub lesson_id: Uuid,
    pub title: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Course {
    pub fn total_lessons(&self) -> u32 {
        self.curriculum.iter().map(|m| m.lessons.len() as u32).sum()
    }

    /// Module containing the given lesson, if any.
    pub fn module_of(&self, lesson_id: &Uuid) -> Option<&CourseModule> {
        self.curriculum
            .iter()
            .find(|m| m.lessons.iter().any(|l| &l.lesson_id == lesson_id))
    }

    pub fn is_listed(&self) -> bool {
        self.status == CourseStatus::Active
    }

    /// Point in time at which access granted at `enrolled_at` ends, `None` for lifetime access.
    pub fn access_expires_at(&self, enrolled_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.access {
            AccessPolicy::Lifetime => None,
            AccessPolicy::Limited { duration_days } => Some(enrolled_at + Duration::days(duration_days as i64)),
        }
    }
}

impl CourseModule {
    pub fn is_released(&self, enrolled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.release_after_days {
            None => true,
            Some(days) => now >= enrolled_at + Duration::days(days as i64),
        }
    }
}

impl Default for CourseStatus {
    fn default() -> Self {
        CourseStatus::Draft
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy::Lifetime
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lesson(title: &str) -> Lesson {
        Lesson {
            lesson_id: Uuid::new_v4(),
            title: title.to_string(),
            duration_minutes: None,
        }
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let input = json!({
            "Title": "Intro to Rust",
            "Description": "Ownership and borrowing.",
            "Price": "1499",
            "CourseType": "Sprint",
            "PricingModel": "OneTime",
            "InstructorId": Uuid::nil(),
            "Level": "Beginner",
            "Category": "Programming"
        });

        let course: Course = serde_json::from_value(input).unwrap();
        assert_eq!(course.course_id, Uuid::nil());
        assert_eq!(course.status, CourseStatus::Draft);
        assert_eq!(course.access, AccessPolicy::Lifetime);
        assert_eq!(course.features, CourseFeatures::default());
        assert_eq!(course.price, Decimal::new(1499, 0));
        assert!(course.curriculum.is_empty());
    }

    #[test]
    fn limited_access_is_tagged() {
        let access = AccessPolicy::Limited { duration_days: 30 };
        let value = serde_json::to_value(access).unwrap();
        assert_eq!(value, json!({ "Kind": "Limited", "DurationDays": 30 }));
    }

    #[test]
    fn counts_lessons_across_modules() {
        let course = Course::builder()
            .title("t")
            .description("d")
            .price(Decimal::ZERO)
            .course_type(CourseType::Custom)
            .pricing_model(PricingModel::Free)
            .instructor_id(Uuid::new_v4())
            .level(CourseLevel::AllLevels)
            .category("c")
            .curriculum(vec![
                CourseModule {
                    module_id: Uuid::new_v4(),
                    title: "one".to_string(),
                    lessons: vec![lesson("a"), lesson("b")],
                    release_after_days: None,
                },
                CourseModule {
                    module_id: Uuid::new_v4(),
                    title: "two".to_string(),
                    lessons: vec![lesson("c")],
                    release_after_days: Some(7),
                },
            ])
            .build();

        assert_eq!(course.total_lessons(), 3);
        let last = course.curriculum[1].lessons[0].lesson_id;
        assert_eq!(course.module_of(&last).map(|m| m.title.as_str()), Some("two"));
        assert!(course.module_of(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn drip_modules_unlock_after_delay() {
        let module = CourseModule {
            module_id: Uuid::new_v4(),
            title: "week two".to_string(),
            lessons: vec![],
            release_after_days: Some(7),
        };
        let enrolled_at = Utc::now();

        assert!(!module.is_released(enrolled_at, enrolled_at + Duration::days(6)));
        assert!(module.is_released(enrolled_at, enrolled_at + Duration::days(7)));
    }
}
