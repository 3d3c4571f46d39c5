use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    #[builder(default = Uuid::new_v4())]
    pub payment_id: Uuid,

    pub payer_id: Uuid,

    pub course_id: Uuid,

    pub amount: Decimal,

    #[builder(setter(into))]
    pub currency: String,

    pub status: PaymentStatus,

    pub method: PaymentMethod,

    #[builder(setter(into))]
    pub transaction_id: String,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Card,
    GCash,
    PayPal,
    BankTransfer,
    Other,
}

impl PaymentStatus {
    /// Completed and Failed payments are final.
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Payment {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}
