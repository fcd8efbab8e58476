use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::dto::payment_dto::{CheckoutRequest, PaymentsOverview, UpdatePricingRequest};
use crate::error::{Error, Result};
use crate::models::payment::{Payment, PaymentMethod, PaymentStatus, PaymentType, PricingSettings};
use crate::models::user::SubscriptionTier;
use crate::services::audit_service::AuditService;
use crate::utils::token::transaction_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub card_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Approved,
    Declined(String),
}

/// Provider boundary. Real uzcard/click/payme protocols live behind this.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome>;
}

/// Digits of a card number with spaces removed, when exactly 16 remain.
pub fn card_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| *c != ' ').collect();
    (digits.len() == 16 && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

/// Approves every well-formed request. Uzcard needs a card number and pauses
/// for `delay` on positive amounts to imitate processing.
#[derive(Debug, Clone)]
pub struct StubGateway {
    delay: Duration,
}

impl StubGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        match request.method {
            PaymentMethod::Uzcard => {
                if request.card_number.as_deref().and_then(card_digits).is_none() {
                    return Ok(CaptureOutcome::Declined(
                        "Card number must have 16 digits".to_string(),
                    ));
                }
                if request.amount > Decimal::ZERO {
                    tokio::time::sleep(self.delay).await;
                }
                Ok(CaptureOutcome::Approved)
            }
            PaymentMethod::Click | PaymentMethod::Payme => Ok(CaptureOutcome::Approved),
        }
    }
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn ExamStore>,
    gateway: Arc<dyn PaymentGateway>,
    audit: AuditService,
}

impl PaymentService {
    pub fn new(store: Arc<dyn ExamStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            audit: AuditService::new(store.clone()),
            store,
            gateway,
        }
    }

    /// Charges the current price for `req.payment_type`. A completed exam
    /// payment becomes an exam credit; a completed subscription upgrades the
    /// user to premium. Declines are stored as failed payments.
    pub async fn checkout(&self, user_id: Uuid, req: CheckoutRequest) -> Result<Payment> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(Error::NotFound("User not found".to_string()));
        }
        let pricing = self.store.get_pricing().await?;
        let amount = pricing.price_for(req.payment_type);
        let now = Utc::now();

        let card = match req.payment_method {
            PaymentMethod::Uzcard => req.card_number.as_deref().and_then(card_digits),
            _ => None,
        };
        let free = amount <= Decimal::ZERO;
        let payment = self
            .store
            .insert_payment(&Payment {
                id: Uuid::new_v4(),
                user_id,
                payment_method: req.payment_method,
                amount,
                status: if free {
                    PaymentStatus::Completed
                } else {
                    PaymentStatus::Processing
                },
                card_last4: card.as_ref().map(|d| d[12..].to_string()),
                card_expiry: card.as_ref().and(req.card_expiry.clone()),
                transaction_id: transaction_id(now),
                payment_type: req.payment_type,
                consumed_session_id: None,
                created_at: now,
                completed_at: free.then_some(now),
            })
            .await?;

        let payment = if free {
            payment
        } else {
            let outcome = self
                .gateway
                .capture(&CaptureRequest {
                    method: req.payment_method,
                    amount,
                    card_number: req.card_number.clone(),
                })
                .await?;
            match outcome {
                CaptureOutcome::Approved => self
                    .store
                    .set_payment_status(payment.id, PaymentStatus::Completed, Some(Utc::now()))
                    .await?
                    .ok_or_else(|| Error::NotFound("Payment not found".to_string()))?,
                CaptureOutcome::Declined(reason) => {
                    self.store
                        .set_payment_status(payment.id, PaymentStatus::Failed, None)
                        .await?;
                    tracing::warn!(payment_id = %payment.id, %reason, "payment declined");
                    self.audit
                        .record(
                            Some(user_id),
                            "payment.failed",
                            "payment",
                            payment.id,
                            Some(json!({ "reason": reason })),
                        )
                        .await;
                    return Err(Error::BadRequest(format!("Payment declined: {reason}")));
                }
            }
        };

        if payment.payment_type == PaymentType::Subscription {
            self.store
                .set_subscription(user_id, SubscriptionTier::Premium)
                .await?;
        }
        tracing::info!(
            payment_id = %payment.id,
            transaction_id = %payment.transaction_id,
            method = %payment.payment_method,
            payment_type = %payment.payment_type,
            amount = %payment.amount,
            "payment completed"
        );
        self.audit
            .record(
                Some(user_id),
                "payment.completed",
                "payment",
                payment.id,
                Some(json!({
                    "transaction_id": payment.transaction_id,
                    "payment_type": payment.payment_type,
                    "amount": payment.amount.to_string(),
                })),
            )
            .await;
        Ok(payment)
    }

    pub async fn pricing(&self) -> Result<PricingSettings> {
        self.store.get_pricing().await
    }

    pub async fn update_pricing(
        &self,
        admin_id: Option<Uuid>,
        req: UpdatePricingRequest,
    ) -> Result<PricingSettings> {
        if req.exam_price < Decimal::ZERO || req.subscription_price < Decimal::ZERO {
            return Err(Error::BadRequest("Prices cannot be negative".to_string()));
        }
        let updated = self
            .store
            .update_pricing(req.exam_price, req.subscription_price)
            .await?;
        self.audit
            .record(
                admin_id,
                "pricing.updated",
                "pricing_settings",
                Uuid::nil(),
                Some(json!({
                    "exam_price": updated.exam_price.to_string(),
                    "subscription_price": updated.subscription_price.to_string(),
                })),
            )
            .await;
        Ok(updated)
    }

    pub async fn overview(&self, limit: i64) -> Result<PaymentsOverview> {
        Ok(PaymentsOverview {
            summary: self.store.payment_summary().await?,
            payments: self.store.list_payments(limit.clamp(1, 500)).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_store::InMemoryExamStore;
    use crate::models::user::User;

    async fn seeded() -> (Arc<InMemoryExamStore>, Uuid) {
        let store = Arc::new(InMemoryExamStore::new());
        let user = store
            .insert_user(&User::new("dilnoza", "dilnoza@satly.uz", SubscriptionTier::Free))
            .await
            .unwrap();
        (store, user.id)
    }

    fn checkout(method: PaymentMethod, payment_type: PaymentType, card: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            payment_method: method,
            payment_type,
            card_number: card.map(str::to_string),
            card_expiry: card.map(|_| "12/28".to_string()),
        }
    }

    #[test]
    fn card_digits_ignores_spaces() {
        assert_eq!(
            card_digits("8600 1234 5678 9012").as_deref(),
            Some("8600123456789012")
        );
        assert!(card_digits("8600 1234").is_none());
        assert!(card_digits("8600-1234-5678-9012").is_none());
    }

    #[tokio::test]
    async fn stub_declines_short_uzcard_numbers() {
        let gateway = StubGateway::new(Duration::from_millis(0));
        let outcome = gateway
            .capture(&CaptureRequest {
                method: PaymentMethod::Uzcard,
                amount: Decimal::new(100, 0),
                card_number: Some("1234".to_string()),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::Declined(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stub_uzcard_waits_for_processing_delay() {
        let gateway = StubGateway::new(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        let outcome = gateway
            .capture(&CaptureRequest {
                method: PaymentMethod::Uzcard,
                amount: Decimal::new(1999900, 2),
                card_number: Some("8600 1234 5678 9012".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::Approved);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn approved_exam_payment_becomes_credit() {
        let (store, user) = seeded().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_capture()
            .times(1)
            .returning(|_| Ok(CaptureOutcome::Approved));
        let payments = PaymentService::new(store.clone(), Arc::new(gateway));

        let payment = payments
            .checkout(user, checkout(PaymentMethod::Uzcard, PaymentType::Exam, Some("8600 1234 5678 9012")))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.card_last4.as_deref(), Some("9012"));
        assert_eq!(payment.amount, Decimal::new(1999900, 2));
        let credit = store.find_exam_credit(user).await.unwrap().unwrap();
        assert_eq!(credit.id, payment.id);
        assert_eq!(store.audit_entries().len(), 1);
    }

    #[tokio::test]
    async fn subscription_grants_premium() {
        let (store, user) = seeded().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_capture()
            .returning(|_| Ok(CaptureOutcome::Approved));
        let payments = PaymentService::new(store.clone(), Arc::new(gateway));

        payments
            .checkout(user, checkout(PaymentMethod::Payme, PaymentType::Subscription, None))
            .await
            .unwrap();
        let user = store.get_user(user).await.unwrap().unwrap();
        assert_eq!(user.subscription, SubscriptionTier::Premium);
        assert!(store.find_exam_credit(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn declined_capture_is_stored_as_failed() {
        let (store, user) = seeded().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_capture()
            .returning(|_| Ok(CaptureOutcome::Declined("insufficient funds".to_string())));
        let payments = PaymentService::new(store.clone(), Arc::new(gateway));

        let err = payments
            .checkout(user, checkout(PaymentMethod::Click, PaymentType::Exam, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        let overview = payments.overview(10).await.unwrap();
        assert_eq!(overview.payments[0].status, PaymentStatus::Failed);
        assert_eq!(overview.summary.exam_count, 0);
    }

    #[tokio::test]
    async fn free_price_skips_the_gateway() {
        let (store, user) = seeded().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_capture().never();
        let payments = PaymentService::new(store.clone(), Arc::new(gateway));
        payments
            .update_pricing(None, UpdatePricingRequest {
                exam_price: Decimal::ZERO,
                subscription_price: Decimal::new(4999900, 2),
            })
            .await
            .unwrap();

        let payment = payments
            .checkout(user, checkout(PaymentMethod::Click, PaymentType::Exam, None))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.completed_at.is_some());
    }
}
