use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::payment::{Payment, PaymentMethod, PaymentSummary, PaymentType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[validate(length(min = 16, max = 23))]
    pub card_number: Option<String>,
    #[validate(length(min = 4, max = 7))]
    pub card_expiry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub payment: Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePricingRequest {
    pub exam_price: Decimal,
    pub subscription_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsOverview {
    pub summary: PaymentSummary,
    pub payments: Vec<Payment>,
}
