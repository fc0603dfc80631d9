use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::PortfolioRepository;
use crate::store::RepositoryError;
use crate::workflows::billing::{BillingError, BillingService};

use super::ledger::{ReminderLedger, ReminderRecord};
use super::schedule::ReminderSchedule;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Emails tenants about rent invoices coming due or overdue, at most once per reminder kind.
pub struct RentReminderService {
    billing: Arc<BillingService>,
    portfolio: Arc<dyn PortfolioRepository>,
    ledger: Arc<dyn ReminderLedger>,
    notifier: Notifier,
    schedule: ReminderSchedule,
    running: Mutex<()>,
}

impl RentReminderService {
    pub fn new(
        billing: Arc<BillingService>,
        portfolio: Arc<dyn PortfolioRepository>,
        ledger: Arc<dyn ReminderLedger>,
        mailer: Arc<dyn Mailer>,
        schedule: ReminderSchedule,
    ) -> Self {
        Self {
            billing,
            portfolio,
            ledger,
            notifier: Notifier::new(mailer),
            schedule,
            running: Mutex::new(()),
        }
    }

    pub fn schedule(&self) -> &ReminderSchedule {
        &self.schedule
    }

    /// Send every reminder due on `today`.
    ///
    /// A reminder whose email fails is left unrecorded so the next run retries it.
    pub fn run(
        &self,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<ReminderRunSummary, ReminderError> {
        let _guard = self
            .running
            .lock()
            .map_err(|_| RepositoryError::Unavailable("reminder run lock poisoned".to_string()))?;

        let mut summary = ReminderRunSummary::default();
        for invoice in self.billing.open_invoices()? {
            if invoice.period.is_none() || !invoice.balance().is_positive() {
                continue;
            }
            let Some(kind) = self.schedule.kind_for(invoice.due_date, today) else {
                continue;
            };
            if self.ledger.reminder_sent(&invoice.id, kind)? {
                summary.skipped += 1;
                continue;
            }
            let Some(tenant) = self.portfolio.tenant(&invoice.tenant_id)? else {
                warn!(
                    invoice = %invoice.number,
                    tenant_id = %invoice.tenant_id,
                    "reminder tenant missing"
                );
                summary.failed += 1;
                continue;
            };

            let message = templates::rent_reminder(
                &tenant.email,
                &tenant.full_name,
                &invoice.number,
                invoice.balance(),
                invoice.due_date,
                &kind.timing(),
            );
            match self.notifier.try_deliver(&message) {
                Ok(message_id) => {
                    match self.ledger.record_reminder(ReminderRecord {
                        invoice_id: invoice.id.clone(),
                        kind,
                        sent_at: at,
                        message_id,
                    }) {
                        Ok(()) => summary.sent += 1,
                        Err(RepositoryError::Conflict) => summary.skipped += 1,
                        Err(err) => return Err(err.into()),
                    }
                }
                Err(err) => {
                    warn!(
                        invoice = %invoice.number,
                        reminder = %kind.key(),
                        error = %err,
                        "rent reminder not delivered"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            %today,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "rent reminder run finished"
        );
        Ok(summary)
    }

    /// Run reminders on a fixed interval until the task is aborted.
    pub fn spawn(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval = ?every, "starting rent reminder loop");
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let now = Utc::now();
                match self.run(now.date_naive(), now) {
                    Ok(summary) if summary.sent == 0 && summary.failed == 0 => {
                        debug!("no rent reminders due");
                    }
                    Ok(_) => {}
                    Err(err) => error!(error = %err, "rent reminder run failed"),
                }
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::money::Cents;
    use crate::notifications::InMemoryMailer;
    use crate::portfolio::{Landlord, LandlordId, Tenant, TenantId};
    use crate::store::InMemoryStore;
    use crate::workflows::billing::{LineItem, LineItemKind, NewInvoice};
    use crate::workflows::leasing::agreement::fixtures::new_lease;
    use crate::workflows::leasing::jurisdiction::ClauseRegistry;
    use crate::workflows::leasing::{LeaseAgreement, LeaseRepository, LeaseStatus};

    struct Harness {
        billing: Arc<BillingService>,
        mailer: InMemoryMailer,
        service: RentReminderService,
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).expect("date")
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::default());
        store
            .insert_landlord(Landlord {
                id: LandlordId("ll-fixture".to_string()),
                name: "Dana Ortiz".to_string(),
                email: "dana@example.com".to_string(),
                company_name: None,
            })
            .expect("landlord");
        store
            .insert_tenant(Tenant {
                id: TenantId("ten-a".to_string()),
                full_name: "Avery Chen".to_string(),
                email: "avery@example.com".to_string(),
                phone: None,
            })
            .expect("tenant");
        let mut lease = LeaseAgreement::create(new_lease(), "dana@example.com", at());
        lease.status = LeaseStatus::Executed;
        lease.rent_due_day = 10;
        store.insert_lease(lease).expect("lease");

        let mailer = InMemoryMailer::default();
        let billing = Arc::new(BillingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(ClauseRegistry::standard()),
            Arc::new(mailer.clone()),
        ));
        let service = RentReminderService::new(
            billing.clone(),
            store.clone(),
            store,
            Arc::new(mailer.clone()),
            ReminderSchedule::default(),
        );
        Harness {
            billing,
            mailer,
            service,
        }
    }

    fn reminders(mailer: &InMemoryMailer) -> Vec<String> {
        mailer
            .outbox()
            .into_iter()
            .filter(|message| message.tag == "reminder.rent")
            .map(|message| message.subject)
            .collect()
    }

    #[test]
    fn reminders_are_sent_once_per_kind() {
        let h = harness();
        h.billing
            .generate_rent_invoices(date(1), date(1), at())
            .expect("rent run");

        let summary = h.service.run(date(7), at()).expect("run");
        assert_eq!(summary, ReminderRunSummary { sent: 1, skipped: 0, failed: 0 });
        let again = h.service.run(date(7), at()).expect("rerun");
        assert_eq!(again, ReminderRunSummary { sent: 0, skipped: 1, failed: 0 });

        h.service.run(date(10), at()).expect("due");
        h.service.run(date(11), at()).expect("overdue");
        assert_eq!(
            reminders(&h.mailer),
            vec![
                "Rent reminder: $1,200.00 is due in 3 days".to_string(),
                "Rent reminder: $1,200.00 is due today".to_string(),
                "Rent reminder: $1,200.00 was due yesterday".to_string(),
            ]
        );
    }

    #[test]
    fn failed_email_is_retried_on_the_next_run() {
        let h = harness();
        h.billing
            .generate_rent_invoices(date(1), date(1), at())
            .expect("rent run");
        h.mailer.set_failing(true);
        let failed = h.service.run(date(10), at()).expect("run");
        assert_eq!(failed.failed, 1);

        h.mailer.set_failing(false);
        let retried = h.service.run(date(10), at()).expect("retry");
        assert_eq!(retried.sent, 1);
    }

    #[test]
    fn paid_and_non_rent_invoices_are_ignored() {
        let h = harness();
        let rent = h
            .billing
            .generate_rent_invoices(date(1), date(1), at())
            .expect("rent run");
        h.billing
            .record_payment(&rent[0].id, Cents::from_dollars(1_200), at(), "ach", None)
            .expect("paid");
        let draft = h
            .billing
            .create_draft(NewInvoice {
                landlord_id: LandlordId("ll-fixture".to_string()),
                tenant_id: TenantId("ten-a".to_string()),
                lease_id: None,
                issue_date: date(1),
                due_date: date(10),
                tax_rate_bps: 0,
                line_items: vec![LineItem::single(
                    LineItemKind::Utility,
                    "Water",
                    Cents::from_dollars(30),
                )],
            })
            .expect("draft");
        h.billing.issue(&draft.id, at()).expect("issued");

        let summary = h.service.run(date(10), at()).expect("run");
        assert_eq!(summary, ReminderRunSummary::default());
    }
}
