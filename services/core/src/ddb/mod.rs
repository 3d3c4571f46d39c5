pub mod adapter;
pub mod get_item;
pub mod put_item;
pub mod query;
pub mod scan;
pub mod update_item;

pub use adapter::Adapter;

/// A single DynamoDB item.
pub type Item = std::collections::HashMap<String, aws_sdk_dynamodb::types::AttributeValue>;
