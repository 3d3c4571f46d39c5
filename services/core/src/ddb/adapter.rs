use aws_sdk_dynamodb::Client;

/// DynamoDB client implementing the per-operation traits of this module. Repositories are generic
/// over those traits so tests can swap in an in-memory table.
#[derive(Debug, Clone)]
pub struct Adapter {
    pub(crate) raw: Client,
}

impl From<Client> for Adapter {
    fn from(raw: Client) -> Self {
        Adapter { raw }
    }
}
