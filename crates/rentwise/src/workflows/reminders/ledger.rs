use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::RepositoryError;
use crate::workflows::billing::InvoiceId;

use super::schedule::ReminderKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub invoice_id: InvoiceId,
    pub kind: ReminderKind,
    pub sent_at: DateTime<Utc>,
    pub message_id: String,
}

/// Record of reminders already delivered, keyed by invoice and [`ReminderKind::key`].
pub trait ReminderLedger: Send + Sync {
    fn reminder_sent(&self, invoice: &InvoiceId, kind: ReminderKind)
        -> Result<bool, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the same reminder was already recorded.
    fn record_reminder(&self, record: ReminderRecord) -> Result<(), RepositoryError>;
    fn reminders_for_invoice(
        &self,
        invoice: &InvoiceId,
    ) -> Result<Vec<ReminderRecord>, RepositoryError>;
}
