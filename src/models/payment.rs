use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Uzcard,
    Click,
    Payme,
}

text_enum!(PaymentMethod, "payment method", {
    Uzcard => "uzcard",
    Click => "click",
    Payme => "payme",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Exam,
    Subscription,
}

text_enum!(PaymentType, "payment type", {
    Exam => "exam",
    Subscription => "subscription",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub card_last4: Option<String>,
    pub card_expiry: Option<String>,
    pub transaction_id: String,
    #[sqlx(try_from = "String")]
    pub payment_type: PaymentType,
    /// Set once an exam payment has paid for a session.
    pub consumed_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_exam_credit(&self) -> bool {
        self.payment_type == PaymentType::Exam
            && self.status == PaymentStatus::Completed
            && self.consumed_session_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricingSettings {
    pub exam_price: Decimal,
    pub subscription_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl PricingSettings {
    pub fn price_for(&self, payment_type: PaymentType) -> Decimal {
        match payment_type {
            PaymentType::Exam => self.exam_price,
            PaymentType::Subscription => self.subscription_price,
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            exam_price: Decimal::new(1999900, 2),
            subscription_price: Decimal::new(4999900, 2),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_revenue: Decimal,
    pub exam_count: i64,
    pub subscription_count: i64,
}
