//! Card payment port. The processor integration lives outside this crate; the in-memory gateway
//! backs the API service, the demo and the tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::money::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresCapture,
    Captured,
    Refunded,
    PartiallyRefunded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Cents,
    pub refunded: Cents,
    pub description: String,
    pub status: IntentStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment intent {0} not found")]
    UnknownIntent(String),
    #[error("refund of {requested} exceeds the {available} still refundable")]
    RefundTooLarge { requested: Cents, available: Cents },
    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

pub trait PaymentGateway: Send + Sync {
    fn create_intent(&self, amount: Cents, description: &str)
        -> Result<PaymentIntent, PaymentError>;
    fn capture(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError>;
    /// Returns the processor's refund id.
    fn refund(&self, intent_id: &str, amount: Cents) -> Result<String, PaymentError>;
}

static INTENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REFUND_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Default, Clone)]
pub struct InMemoryPaymentGateway {
    intents: Arc<Mutex<BTreeMap<String, PaymentIntent>>>,
    declining: Arc<AtomicBool>,
}

impl InMemoryPaymentGateway {
    pub fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.intents
            .lock()
            .ok()
            .and_then(|guard| guard.get(id).cloned())
    }

    /// Decline every new intent, as a processor does for a failed card.
    pub fn set_declining(&self, declining: bool) {
        self.declining.store(declining, Ordering::Relaxed);
    }

    fn with_intent<T>(
        &self,
        id: &str,
        apply: impl FnOnce(&mut PaymentIntent) -> Result<T, PaymentError>,
    ) -> Result<T, PaymentError> {
        let mut guard = self
            .intents
            .lock()
            .map_err(|_| PaymentError::Unavailable("gateway lock poisoned".to_string()))?;
        let intent = guard
            .get_mut(id)
            .ok_or_else(|| PaymentError::UnknownIntent(id.to_string()))?;
        apply(intent)
    }
}

impl PaymentGateway for InMemoryPaymentGateway {
    fn create_intent(
        &self,
        amount: Cents,
        description: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.declining.load(Ordering::Relaxed) {
            return Err(PaymentError::Declined("card declined".to_string()));
        }
        if !amount.is_positive() {
            return Err(PaymentError::Declined(format!("invalid amount {amount}")));
        }
        let id = format!("pi_{:06}", INTENT_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        let intent = PaymentIntent {
            id: id.clone(),
            amount,
            refunded: Cents::ZERO,
            description: description.to_string(),
            status: IntentStatus::RequiresCapture,
        };
        self.intents
            .lock()
            .map_err(|_| PaymentError::Unavailable("gateway lock poisoned".to_string()))?
            .insert(id, intent.clone());
        Ok(intent)
    }

    fn capture(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError> {
        self.with_intent(intent_id, |intent| {
            intent.status = IntentStatus::Captured;
            Ok(intent.clone())
        })
    }

    fn refund(&self, intent_id: &str, amount: Cents) -> Result<String, PaymentError> {
        self.with_intent(intent_id, |intent| {
            let available = intent.amount - intent.refunded;
            if amount > available || !amount.is_positive() {
                return Err(PaymentError::RefundTooLarge {
                    requested: amount,
                    available,
                });
            }
            intent.refunded += amount;
            intent.status = if intent.refunded == intent.amount {
                IntentStatus::Refunded
            } else {
                IntentStatus::PartiallyRefunded
            };
            Ok(format!(
                "re_{:06}",
                REFUND_SEQUENCE.fetch_add(1, Ordering::Relaxed)
            ))
        })
    }
}
