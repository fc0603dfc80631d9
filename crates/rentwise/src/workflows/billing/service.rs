use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use tracing::{info, warn};

use crate::money::Cents;
use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::{LandlordId, PortfolioRepository, TenantId};
use crate::store::RepositoryError;
use crate::workflows::leasing::jurisdiction::{ClauseRegistry, LeaseContext};
use crate::workflows::leasing::{LeaseAgreement, LeaseId, LeaseRepository, LeaseStatus};

use super::domain::{
    Invoice, InvoiceId, InvoiceStatus, LineItem, LineItemKind, NewInvoice, Payment,
};
use super::repository::InvoiceRepository;

static INVOICE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Highest tax rate accepted on an invoice (100%).
const MAX_TAX_BPS: u32 = 10_000;

/// Largest subtotal a single invoice may carry.
const MAX_INVOICE_AMOUNT: Cents = Cents::from_dollars(1_000_000_000);

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(first_of_month: NaiveDate) -> NaiveDate {
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first_of_month)
}

/// Rent due date inside a month, clamped to the month's last day.
fn due_date_in(first_of_month: NaiveDate, due_day: u8) -> NaiveDate {
    let last = month_end(first_of_month);
    let day = u32::from(due_day.max(1)).min(last.day());
    first_of_month.with_day(day).unwrap_or(last)
}

/// Rent owed for a month, prorated by day when the lease starts or ends inside it.
fn rent_for_month(lease: &LeaseAgreement, first_of_month: NaiveDate) -> (Cents, Option<String>) {
    let last = month_end(first_of_month);
    let from = lease.start_date.max(first_of_month);
    let to = lease.end_date.map_or(last, |end| end.min(last));
    let days_in_month = i64::from(last.day());
    let covered = (to - from).num_days() + 1;
    if covered >= days_in_month {
        return (lease.monthly_rent, None);
    }
    let covered = covered.max(0);
    let amount = (i128::from(lease.monthly_rent.value()) * i128::from(covered) * 2
        + i128::from(days_in_month))
        / (i128::from(days_in_month) * 2);
    (
        Cents(amount as i64),
        Some(format!("prorated {covered}/{days_in_month} days")),
    )
}

/// Invoices, payments, the monthly rent run and late fees.
pub struct BillingService {
    invoices: Arc<dyn InvoiceRepository>,
    leases: Arc<dyn LeaseRepository>,
    portfolio: Arc<dyn PortfolioRepository>,
    registry: Arc<ClauseRegistry>,
    notifier: Notifier,
    rent_run: Mutex<()>,
    // Held across every invoice read-modify-write.
    invoice_lock: Mutex<()>,
}

impl BillingService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        leases: Arc<dyn LeaseRepository>,
        portfolio: Arc<dyn PortfolioRepository>,
        registry: Arc<ClauseRegistry>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            invoices,
            leases,
            portfolio,
            registry,
            notifier: Notifier::new(mailer),
            rent_run: Mutex::new(()),
            invoice_lock: Mutex::new(()),
        }
    }

    fn lock_invoices(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.invoice_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("invoice lock poisoned".to_string()))
    }

    pub fn invoice(&self, id: &InvoiceId) -> Result<Invoice, BillingError> {
        self.invoices
            .invoice(id)?
            .ok_or_else(|| BillingError::NotFound(id.clone()))
    }

    pub fn invoices_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.invoices.invoices_for_landlord(landlord)?)
    }

    /// Issued invoices that still carry a balance.
    pub fn open_invoices(&self) -> Result<Vec<Invoice>, BillingError> {
        let mut open = self.invoices.invoices_with_status(InvoiceStatus::Issued)?;
        open.extend(self.invoices.invoices_with_status(InvoiceStatus::PartiallyPaid)?);
        open.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(open)
    }

    pub fn create_draft(&self, request: NewInvoice) -> Result<Invoice, BillingError> {
        if request.due_date < request.issue_date {
            return Err(BillingError::Validation(
                "due date cannot precede the issue date".to_string(),
            ));
        }
        if request.tax_rate_bps > MAX_TAX_BPS {
            return Err(BillingError::Validation(format!(
                "tax rate {} bps exceeds 100%",
                request.tax_rate_bps
            )));
        }
        validate_items(&request.line_items)?;
        if self.portfolio.landlord(&request.landlord_id)?.is_none() {
            return Err(BillingError::LandlordNotFound(request.landlord_id));
        }
        if self.portfolio.tenant(&request.tenant_id)?.is_none() {
            return Err(BillingError::TenantNotFound(request.tenant_id));
        }
        if let Some(lease_id) = &request.lease_id {
            let lease = self
                .leases
                .lease(lease_id)?
                .ok_or_else(|| BillingError::LeaseNotFound(lease_id.clone()))?;
            if lease.landlord_id != request.landlord_id {
                return Err(BillingError::Validation(format!(
                    "lease {lease_id} belongs to another landlord"
                )));
            }
        }
        self.insert_draft(request, None)
    }

    pub fn add_line_item(&self, id: &InvoiceId, item: LineItem) -> Result<Invoice, BillingError> {
        let _guard = self.lock_invoices()?;
        let mut invoice = self.invoice(id)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::NotDraft {
                id: invoice.id,
                status: invoice.status,
            });
        }
        invoice.line_items.push(item);
        validate_items(&invoice.line_items)?;
        self.invoices.update_invoice(invoice.clone())?;
        Ok(invoice)
    }

    /// Finalize a draft and email it to the tenant.
    pub fn issue(&self, id: &InvoiceId, at: DateTime<Utc>) -> Result<Invoice, BillingError> {
        let _guard = self.lock_invoices()?;
        let mut invoice = self.invoice(id)?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(BillingError::InvalidTransition {
                id: invoice.id,
                from: invoice.status,
                to: InvoiceStatus::Issued,
            });
        }
        if !invoice.total().is_positive() {
            return Err(BillingError::Validation(format!(
                "invoice {} has nothing to bill",
                invoice.number
            )));
        }
        invoice.status = InvoiceStatus::Issued;
        self.invoices.update_invoice(invoice.clone())?;

        match self.portfolio.tenant(&invoice.tenant_id)? {
            Some(tenant) => {
                self.notifier.deliver(&templates::invoice_issued(
                    &tenant.email,
                    &tenant.full_name,
                    &invoice.number,
                    invoice.total(),
                    invoice.due_date,
                ));
            }
            None => warn!(
                invoice = %invoice.number,
                tenant_id = %invoice.tenant_id,
                "invoice tenant missing"
            ),
        }
        info!(
            invoice = %invoice.number,
            total = %invoice.total(),
            due = %invoice.due_date,
            issued_at = %at,
            "invoice issued"
        );
        Ok(invoice)
    }

    pub fn record_payment(
        &self,
        id: &InvoiceId,
        amount: Cents,
        received_at: DateTime<Utc>,
        method: &str,
        reference: Option<String>,
    ) -> Result<Invoice, BillingError> {
        let _guard = self.lock_invoices()?;
        let mut invoice = self.invoice(id)?;
        if !invoice.status.is_open() {
            return Err(BillingError::InvalidTransition {
                id: invoice.id,
                from: invoice.status,
                to: InvoiceStatus::Paid,
            });
        }
        if !amount.is_positive() {
            return Err(BillingError::Validation(
                "payment amount must be greater than zero".to_string(),
            ));
        }
        let balance = invoice.balance();
        if amount > balance {
            return Err(BillingError::Overpayment { amount, balance });
        }
        invoice.payments.push(Payment {
            amount,
            received_at,
            method: method.trim().to_string(),
            reference,
        });
        invoice.status = if invoice.balance().is_positive() {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Paid
        };
        self.invoices.update_invoice(invoice.clone())?;
        info!(
            invoice = %invoice.number,
            amount = %amount,
            status = invoice.status.label(),
            "payment recorded"
        );
        Ok(invoice)
    }

    pub fn void(&self, id: &InvoiceId) -> Result<Invoice, BillingError> {
        let _guard = self.lock_invoices()?;
        let mut invoice = self.invoice(id)?;
        let voidable = matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Issued)
            && invoice.payments.is_empty();
        if !voidable {
            return Err(BillingError::InvalidTransition {
                id: invoice.id,
                from: invoice.status,
                to: InvoiceStatus::Void,
            });
        }
        invoice.status = InvoiceStatus::Void;
        self.invoices.update_invoice(invoice.clone())?;
        info!(invoice = %invoice.number, "invoice voided");
        Ok(invoice)
    }

    /// Issue one rent invoice per executed lease for the month containing `period`.
    ///
    /// Running the same month twice creates nothing new.
    pub fn generate_rent_invoices(
        &self,
        period: NaiveDate,
        today: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, BillingError> {
        let period = month_start(period);
        let _guard = self
            .rent_run
            .lock()
            .map_err(|_| RepositoryError::Unavailable("rent run lock poisoned".to_string()))?;

        let mut created = Vec::new();
        for lease in self.leases.leases_with_status(LeaseStatus::Executed)? {
            if !lease.covers_month(period) {
                continue;
            }
            let already_billed = self
                .invoices
                .invoices_for_lease(&lease.id)?
                .iter()
                .any(|invoice| {
                    invoice.period == Some(period) && invoice.status != InvoiceStatus::Void
                });
            if already_billed {
                continue;
            }
            let Some(tenant_id) = lease.tenant_ids.first().cloned() else {
                warn!(lease_id = %lease.id, "executed lease has no tenants to bill");
                continue;
            };

            let (amount, proration) = rent_for_month(&lease, period);
            let mut description = format!("Rent for {}", period.format("%B %Y"));
            if let Some(proration) = proration {
                description = format!("{description} ({proration})");
            }
            let draft = self.insert_draft(
                NewInvoice {
                    landlord_id: lease.landlord_id.clone(),
                    tenant_id,
                    lease_id: Some(lease.id.clone()),
                    issue_date: today,
                    due_date: due_date_in(period, lease.rent_due_day).max(today),
                    tax_rate_bps: 0,
                    line_items: vec![LineItem::single(LineItemKind::Rent, description, amount)],
                },
                Some(period),
            )?;
            created.push(self.issue(&draft.id, at)?);
        }
        info!(period = %period, created = created.len(), "rent invoices generated");
        Ok(created)
    }

    /// Add the lease's late fee to overdue rent invoices past their grace period.
    ///
    /// The fee is reduced to the statutory cap for the property's jurisdiction, and an invoice
    /// never carries more than one late fee.
    pub fn apply_late_fees(&self, today: NaiveDate) -> Result<Vec<Invoice>, BillingError> {
        let _guard = self.lock_invoices()?;
        let mut charged = Vec::new();
        for mut invoice in self.open_invoices()? {
            if invoice.period.is_none() || invoice.has_item(LineItemKind::LateFee) {
                continue;
            }
            let Some(lease_id) = invoice.lease_id.clone() else {
                continue;
            };
            let Some(lease) = self.leases.lease(&lease_id)? else {
                continue;
            };
            let Some(fee) = lease.late_fee else {
                continue;
            };
            let grace_ends = invoice
                .due_date
                .checked_add_days(Days::new(u64::from(fee.grace_days)))
                .unwrap_or(invoice.due_date);
            if today <= grace_ends {
                continue;
            }

            let mut amount = fee.amount;
            if let Some(context) = self.lease_context(&lease)? {
                if let Some(cap) = self.registry.late_fee_cap_for(&context) {
                    let max = cap.max_fee(lease.monthly_rent);
                    if amount > max {
                        warn!(
                            invoice = %invoice.number,
                            requested = %amount,
                            cap = %max,
                            "late fee reduced to statutory cap"
                        );
                        amount = max;
                    }
                }
            }
            if !amount.is_positive() {
                continue;
            }

            invoice.line_items.push(LineItem::single(
                LineItemKind::LateFee,
                format!("Late fee ({} days past due)", (today - invoice.due_date).num_days()),
                amount,
            ));
            self.invoices.update_invoice(invoice.clone())?;
            info!(invoice = %invoice.number, fee = %amount, "late fee applied");
            charged.push(invoice);
        }
        Ok(charged)
    }

    fn lease_context(&self, lease: &LeaseAgreement) -> Result<Option<LeaseContext>, BillingError> {
        let Some(property) = self.portfolio.property(&lease.property_id)? else {
            return Ok(None);
        };
        Ok(Some(LeaseContext {
            state: property.address.state,
            city: property.address.city,
            year_built: property.year_built,
            flood_zone: property.flood_zone,
            shared_utilities: property.shared_utilities,
            pets_allowed: false,
            tenant_count: lease.tenant_ids.len(),
            monthly_rent: lease.monthly_rent,
            security_deposit: lease.security_deposit,
        }))
    }

    fn insert_draft(
        &self,
        request: NewInvoice,
        period: Option<NaiveDate>,
    ) -> Result<Invoice, BillingError> {
        let sequence = INVOICE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let invoice = self.invoices.insert_invoice(Invoice {
            id: InvoiceId(format!("inv-{sequence:06}")),
            number: format!("INV-{sequence:06}"),
            landlord_id: request.landlord_id,
            tenant_id: request.tenant_id,
            lease_id: request.lease_id,
            issue_date: request.issue_date,
            due_date: request.due_date,
            line_items: request.line_items,
            tax_rate_bps: request.tax_rate_bps,
            status: InvoiceStatus::Draft,
            payments: Vec::new(),
            period,
        })?;
        Ok(invoice)
    }
}

fn validate_items(items: &[LineItem]) -> Result<(), BillingError> {
    let mut subtotal = Cents::ZERO;
    for item in items {
        validate_item(item)?;
        subtotal = subtotal
            .checked_add(item.amount())
            .filter(|subtotal| *subtotal <= MAX_INVOICE_AMOUNT)
            .ok_or_else(|| {
                BillingError::Validation(format!(
                    "invoice subtotal exceeds the {MAX_INVOICE_AMOUNT} limit"
                ))
            })?;
    }
    Ok(())
}

fn validate_item(item: &LineItem) -> Result<(), BillingError> {
    if item.quantity == 0 {
        return Err(BillingError::Validation(
            "line item quantity must be at least 1".to_string(),
        ));
    }
    if !item.unit_price.is_positive() {
        return Err(BillingError::Validation(format!(
            "line item '{}' must have a positive price",
            item.description
        )));
    }
    let within_limit = item
        .unit_price
        .checked_times(item.quantity)
        .is_some_and(|amount| amount <= MAX_INVOICE_AMOUNT);
    if !within_limit {
        return Err(BillingError::Validation(format!(
            "line item '{}' exceeds the {MAX_INVOICE_AMOUNT} limit",
            item.description
        )));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("invoice {0} not found")]
    NotFound(InvoiceId),
    #[error("landlord {0} not found")]
    LandlordNotFound(LandlordId),
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),
    #[error("lease {0} not found")]
    LeaseNotFound(LeaseId),
    #[error("invoice {id} is {} and can no longer be edited", status.label())]
    NotDraft { id: InvoiceId, status: InvoiceStatus },
    #[error("invoice {id} cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition {
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
    },
    #[error("payment of {amount} exceeds the outstanding balance of {balance}")]
    Overpayment { amount: Cents, balance: Cents },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
