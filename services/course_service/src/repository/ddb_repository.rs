use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use common_macros::hash_map;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use service_core::ddb::get_item::{GetItem, GetItemInput};
use service_core::ddb::put_item::{PutItem, PutItemInput};
use service_core::ddb::query::{Query, QueryInput};
use service_core::ddb::scan::{Scan, ScanInput};
use service_core::ddb::update_item::{UpdateItem, UpdateItemInput};
use service_core::ddb::Item;
use uuid::Uuid;

use super::{
    CourseFilter, CoursesRepository, EnrollmentFilter, EnrollmentsRepository, PaymentFilter, PaymentsRepository,
    RepositoryError,
};
use crate::catalog::{Course, CourseStatus};
use crate::enrollment::Enrollment;
use crate::payment::{Payment, PaymentStatus};

const ENROLLMENT_ID_INDEX: &str = "EnrollmentIdIndex";
const LEARNER_ID_INDEX: &str = "LearnerIdIndex";

pub trait ThreadSafeDdbClient: PutItem + GetItem + Query + Scan + UpdateItem + Send + Sync {}
impl<T: PutItem + GetItem + Query + Scan + UpdateItem + Send + Sync> ThreadSafeDdbClient for T {}

/// DynamoDB backed repository.
///
/// Tables:
/// - courses: partition key `CourseId`.
/// - enrollments: partition key `CourseId`, sort key `LearnerId`, with the `EnrollmentIdIndex`
///   and `LearnerIdIndex` global secondary indexes projecting all attributes.
/// - payments: partition key `PaymentId`.
pub struct DdbRepository<T: ThreadSafeDdbClient> {
    ddb: T,
    courses_table_name: String,
    enrollments_table_name: String,
    payments_table_name: String,
}

impl<T: ThreadSafeDdbClient> DdbRepository<T> {
    pub fn new(
        ddb: T,
        courses_table_name: impl Into<String>,
        enrollments_table_name: impl Into<String>,
        payments_table_name: impl Into<String>,
    ) -> Self {
        Self {
            ddb,
            courses_table_name: courses_table_name.into(),
            enrollments_table_name: enrollments_table_name.into(),
            payments_table_name: payments_table_name.into(),
        }
    }

    fn course_key(course_id: &Uuid) -> Item {
        hash_map! {
            "CourseId".to_string() => AttributeValue::S(course_id.to_string()),
        }
    }

    fn enrollment_key(course_id: &Uuid, learner_id: &Uuid) -> Item {
        hash_map! {
            "CourseId".to_string() => AttributeValue::S(course_id.to_string()),
            "LearnerId".to_string() => AttributeValue::S(learner_id.to_string()),
        }
    }

    fn payment_key(payment_id: &Uuid) -> Item {
        hash_map! {
            "PaymentId".to_string() => AttributeValue::S(payment_id.to_string()),
        }
    }

    /// Writes an item under the given condition, mapping a failed condition to `on_condition_failed`.
    async fn put<V: Serialize + Sync>(
        &self,
        table_name: &str,
        value: &V,
        condition: &str,
        on_condition_failed: RepositoryError,
    ) -> Result<(), RepositoryError> {
        let input = PutItemInput::builder()
            .table_name(table_name)
            .item(to_item(value)?)
            .condition_expression(condition)
            .build();
        self.put_item(input, on_condition_failed).await
    }

    /// Writes an item only if its stored `Status` equals `expected`.
    async fn put_if_status<V: Serialize + Sync>(
        &self,
        table_name: &str,
        value: &V,
        expected: &str,
    ) -> Result<(), RepositoryError> {
        let input = PutItemInput::builder()
            .table_name(table_name)
            .item(to_item(value)?)
            .condition_expression("#status = :expected")
            .expression_attribute_names(hash_map! {
                "#status".to_string() => "Status".to_string(),
            })
            .expression_attribute_values(hash_map! {
                ":expected".to_string() => AttributeValue::S(expected.to_string()),
            })
            .build();
        self.put_item(input, RepositoryError::ConditionFailed).await
    }

    async fn put_item(&self, input: PutItemInput, on_condition_failed: RepositoryError) -> Result<(), RepositoryError> {
        let table_name = input.table_name.clone();

        match self.ddb.put_item(input).await {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().map_or(false, |se| se.is_conditional_check_failed_exception()) => {
                Err(on_condition_failed)
            }
            Err(e) => {
                tracing::error!(error = ?e, table = %table_name, "Failed to write item to DynamoDB.");
                Err(RepositoryError::datastore(e))
            }
        }
    }

    async fn get<V: DeserializeOwned>(&self, table_name: &str, key: Item) -> Result<V, RepositoryError> {
        let input = GetItemInput::builder()
            .table_name(table_name)
            .key(key)
            .consistent_read(true)
            .build();
        let output = self.ddb.get_item(input).await.map_err(|e| {
            tracing::error!(error = ?e, table = table_name, "Failed to get item from DynamoDB.");
            RepositoryError::datastore(e)
        })?;

        match output.item {
            None => Err(RepositoryError::NotFound),
            Some(item) => from_item(item),
        }
    }

    /// Runs a scan to completion, following `LastEvaluatedKey`.
    async fn scan_all<V: DeserializeOwned>(
        &self,
        table_name: &str,
        filter_expression: Option<String>,
        expression_attribute_names: Option<HashMap<String, String>>,
        expression_attribute_values: Option<Item>,
    ) -> Result<Vec<V>, RepositoryError> {
        let mut values = Vec::new();
        let mut start_key = None;

        loop {
            let input = ScanInput::builder()
                .table_name(table_name)
                .exclusive_start_key(start_key.take())
                .filter_expression(filter_expression.clone())
                .expression_attribute_names(expression_attribute_names.clone())
                .expression_attribute_values(expression_attribute_values.clone())
                .build();
            let output = self.ddb.scan(input).await.map_err(|e| {
                tracing::error!(error = ?e, table = table_name, "DynamoDB scan failed.");
                RepositoryError::datastore(e)
            })?;

            for item in output.items.unwrap_or_default() {
                values.push(from_item(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => return Ok(values),
            }
        }
    }

    /// Runs a query to completion, following `LastEvaluatedKey`.
    async fn query_all<V: DeserializeOwned>(
        &self,
        table_name: &str,
        index_name: Option<&str>,
        key_condition_expression: &str,
        expression_attribute_values: Item,
        projection_expression: Option<&str>,
        limit: Option<i32>,
    ) -> Result<Vec<V>, RepositoryError> {
        let mut values = Vec::new();
        let mut start_key = None;

        loop {
            let input = QueryInput::builder()
                .table_name(table_name)
                .index_name(index_name.map(str::to_string))
                .limit(limit)
                .exclusive_start_key(start_key.take())
                .key_condition_expression(key_condition_expression)
                .projection_expression(projection_expression.map(str::to_string))
                .expression_attribute_values(expression_attribute_values.clone())
                .build();
            let output = self.ddb.query(input).await.map_err(|e| {
                tracing::error!(error = ?e, table = table_name, "DynamoDB query failed.");
                RepositoryError::datastore(e)
            })?;

            for item in output.items.unwrap_or_default() {
                values.push(from_item(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() && limit.map_or(true, |l| (values.len() as i32) < l) => {
                    start_key = Some(key)
                }
                _ => return Ok(values),
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnrollmentKey {
    course_id: Uuid,
    learner_id: Uuid,
}

fn to_item<V: Serialize>(value: &V) -> Result<Item, RepositoryError> {
    serde_dynamo::to_item(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn from_item<V: DeserializeOwned>(item: Item) -> Result<V, RepositoryError> {
    serde_dynamo::from_item(item).map_err(|e| {
        tracing::error!(error = ?e, "Invalid record in DynamoDB.");
        RepositoryError::Serialization(e.to_string())
    })
}

#[async_trait]
impl<T: ThreadSafeDdbClient> CoursesRepository for DdbRepository<T> {
    async fn create_course(&self, course: &Course) -> Result<(), RepositoryError> {
        self.put(
            &self.courses_table_name,
            course,
            "attribute_not_exists(CourseId)",
            RepositoryError::Duplicate,
        )
        .await
    }

    async fn get_course(&self, course_id: &Uuid) -> Result<Course, RepositoryError> {
        self.get(&self.courses_table_name, Self::course_key(course_id)).await
    }

    async fn update_course(&self, course: &Course, expected: CourseStatus) -> Result<(), RepositoryError> {
        match self
            .put_if_status(&self.courses_table_name, course, expected.as_ref())
            .await
        {
            Err(RepositoryError::ConditionFailed) => {
                // The condition also fails for missing items.
                self.get_course(&course.course_id).await?;
                Err(RepositoryError::ConditionFailed)
            }
            result => result,
        }
    }

    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RepositoryError> {
        let mut conditions = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        if let Some(status) = filter.status {
            conditions.push("#status = :status");
            names.insert("#status".to_string(), "Status".to_string());
            values.insert(":status".to_string(), AttributeValue::S(status.as_ref().to_string()));
        }
        if let Some(instructor_id) = filter.instructor_id {
            conditions.push("InstructorId = :instructor_id");
            values.insert(":instructor_id".to_string(), AttributeValue::S(instructor_id.to_string()));
        }

        let courses: Vec<Course> = self
            .scan_all(
                &self.courses_table_name,
                (!conditions.is_empty()).then(|| conditions.join(" AND ")),
                (!names.is_empty()).then(|| names),
                (!values.is_empty()).then(|| values),
            )
            .await?;

        Ok(courses.into_iter().filter(|c| filter.matches(c)).collect())
    }
}

#[async_trait]
impl<T: ThreadSafeDdbClient> EnrollmentsRepository for DdbRepository<T> {
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        self.put(
            &self.enrollments_table_name,
            enrollment,
            "attribute_not_exists(CourseId) and attribute_not_exists(LearnerId)",
            RepositoryError::Duplicate,
        )
        .await
    }

    /// Resolves the table key through the index, then reads the record itself. The index is only
    /// eventually consistent, the table read is not.
    async fn get_enrollment(&self, enrollment_id: &Uuid) -> Result<Enrollment, RepositoryError> {
        let values = hash_map! {
            ":EnrollmentId".to_string() => AttributeValue::S(enrollment_id.to_string()),
        };
        let mut keys: Vec<EnrollmentKey> = self
            .query_all(
                &self.enrollments_table_name,
                Some(ENROLLMENT_ID_INDEX),
                "EnrollmentId = :EnrollmentId",
                values,
                Some("CourseId, LearnerId"),
                Some(1),
            )
            .await?;
        let key = keys.pop().ok_or(RepositoryError::NotFound)?;

        self.get(
            &self.enrollments_table_name,
            Self::enrollment_key(&key.course_id, &key.learner_id),
        )
        .await
    }

    async fn find_enrollment(&self, learner_id: &Uuid, course_id: &Uuid) -> Result<Option<Enrollment>, RepositoryError> {
        match self
            .get(&self.enrollments_table_name, Self::enrollment_key(course_id, learner_id))
            .await
        {
            Ok(enrollment) => Ok(Some(enrollment)),
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        self.put(
            &self.enrollments_table_name,
            enrollment,
            "attribute_exists(CourseId) and attribute_exists(LearnerId)",
            RepositoryError::NotFound,
        )
        .await
    }

    async fn list_enrollments(&self, filter: &EnrollmentFilter) -> Result<Vec<Enrollment>, RepositoryError> {
        let enrollments: Vec<Enrollment> = match (filter.course_id, filter.learner_id) {
            (Some(course_id), _) => {
                let values = hash_map! {
                    ":CourseId".to_string() => AttributeValue::S(course_id.to_string()),
                };
                self.query_all(&self.enrollments_table_name, None, "CourseId = :CourseId", values, None, None)
                    .await?
            }
            (None, Some(learner_id)) => {
                let values = hash_map! {
                    ":LearnerId".to_string() => AttributeValue::S(learner_id.to_string()),
                };
                self.query_all(
                    &self.enrollments_table_name,
                    Some(LEARNER_ID_INDEX),
                    "LearnerId = :LearnerId",
                    values,
                    None,
                    None,
                )
                .await?
            }
            (None, None) => self.scan_all(&self.enrollments_table_name, None, None, None).await?,
        };

        Ok(enrollments.into_iter().filter(|e| filter.matches(e)).collect())
    }
}

#[async_trait]
impl<T: ThreadSafeDdbClient> PaymentsRepository for DdbRepository<T> {
    async fn create_payment(&self, payment: &Payment) -> Result<(), RepositoryError> {
        self.put(
            &self.payments_table_name,
            payment,
            "attribute_not_exists(PaymentId)",
            RepositoryError::Duplicate,
        )
        .await
    }

    async fn get_payment(&self, payment_id: &Uuid) -> Result<Payment, RepositoryError> {
        self.get(&self.payments_table_name, Self::payment_key(payment_id)).await
    }

    async fn update_payment_status(
        &self,
        payment_id: &Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Payment, RepositoryError> {
        let input = UpdateItemInput::builder()
            .table_name(self.payments_table_name.as_str())
            .key(Self::payment_key(payment_id))
            .update_expression("SET #status = :status, UpdatedAt = :updated_at")
            .condition_expression("#status = :expected")
            .expression_attribute_names(hash_map! {
                "#status".to_string() => "Status".to_string(),
            })
            .expression_attribute_values(hash_map! {
                ":status".to_string() => AttributeValue::S(status.as_ref().to_string()),
                ":expected".to_string() => AttributeValue::S(expected.as_ref().to_string()),
                ":updated_at".to_string() => AttributeValue::S(at.to_rfc3339()),
            })
            .build();

        match self.ddb.update_item(input).await {
            Ok(output) => from_item(output.attributes.ok_or_else(|| {
                RepositoryError::Serialization("Malformed reply: missing attributes".to_string())
            })?),
            Err(e) if e.as_service_error().map_or(false, |se| se.is_conditional_check_failed_exception()) => {
                // The condition also fails for missing items.
                self.get_payment(payment_id).await?;
                Err(RepositoryError::ConditionFailed)
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to update payment in DynamoDB.");
                Err(RepositoryError::datastore(e))
            }
        }
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, RepositoryError> {
        let mut conditions = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        if let Some(course_id) = filter.course_id {
            conditions.push("CourseId = :course_id");
            values.insert(":course_id".to_string(), AttributeValue::S(course_id.to_string()));
        }
        if let Some(status) = filter.status {
            conditions.push("#status = :status");
            names.insert("#status".to_string(), "Status".to_string());
            values.insert(":status".to_string(), AttributeValue::S(status.as_ref().to_string()));
        }

        let payments: Vec<Payment> = self
            .scan_all(
                &self.payments_table_name,
                (!conditions.is_empty()).then(|| conditions.join(" AND ")),
                (!names.is_empty()).then(|| names),
                (!values.is_empty()).then(|| values),
            )
            .await?;

        Ok(payments.into_iter().filter(|p| filter.matches(p)).collect())
    }
}
