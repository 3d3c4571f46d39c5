use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::query::{QueryError, QueryOutput};
use typed_builder::TypedBuilder;

use super::adapter::Adapter;
use super::Item;

/// One page of a key condition query, on a table or on one of its indexes.
#[derive(Debug, Clone, TypedBuilder)]
pub struct QueryInput {
    #[builder(setter(into))]
    pub table_name: String,

    #[builder(default)]
    pub index_name: Option<String>,

    #[builder(default)]
    pub limit: Option<i32>,

    /// `LastEvaluatedKey` of the previous page.
    #[builder(default)]
    pub exclusive_start_key: Option<Item>,

    #[builder(setter(into))]
    pub key_condition_expression: String,

    #[builder(default)]
    pub projection_expression: Option<String>,

    pub expression_attribute_values: Item,
}

#[async_trait]
pub trait Query {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, SdkError<QueryError>>;
}

#[async_trait]
impl Query for Adapter {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, SdkError<QueryError>> {
        self.raw
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_limit(input.limit)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_values(Some(input.expression_attribute_values))
            .key_condition_expression(input.key_condition_expression)
            .send()
            .await
    }
}
