//! Payment records, the only authoritative source of revenue.

pub mod types;

pub use types::{Payment, PaymentMethod, PaymentStatus};
