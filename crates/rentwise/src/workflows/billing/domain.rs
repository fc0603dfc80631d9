use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{LandlordId, TenantId};
use crate::workflows::leasing::LeaseId;

string_id!(InvoiceId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Rent,
    Deposit,
    LateFee,
    Utility,
    Repair,
    Other,
}

impl LineItemKind {
    pub const fn label(self) -> &'static str {
        match self {
            LineItemKind::Rent => "rent",
            LineItemKind::Deposit => "deposit",
            LineItemKind::LateFee => "late_fee",
            LineItemKind::Utility => "utility",
            LineItemKind::Repair => "repair",
            LineItemKind::Other => "other",
        }
    }

    /// Residential rent and security deposits are exempt from sales tax.
    pub const fn is_taxable(self) -> bool {
        !matches!(self, LineItemKind::Rent | LineItemKind::Deposit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub description: String,
    #[serde(default = "one")]
    pub quantity: u32,
    pub unit_price: Cents,
}

fn one() -> u32 {
    1
}

impl LineItem {
    pub fn single(kind: LineItemKind, description: impl Into<String>, amount: Cents) -> Self {
        Self {
            kind,
            description: description.into(),
            quantity: 1,
            unit_price: amount,
        }
    }

    pub fn amount(&self) -> Cents {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }

    /// Issued and still carrying a balance.
    pub const fn is_open(self) -> bool {
        matches!(self, InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Cents,
    pub received_at: DateTime<Utc>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub landlord_id: LandlordId,
    pub tenant_id: TenantId,
    pub lease_id: Option<LeaseId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub tax_rate_bps: u32,
    pub status: InvoiceStatus,
    pub payments: Vec<Payment>,
    /// First day of the rent month for generated rent invoices.
    pub period: Option<NaiveDate>,
}

impl Invoice {
    pub fn subtotal(&self) -> Cents {
        self.line_items.iter().map(LineItem::amount).sum()
    }

    pub fn tax(&self) -> Cents {
        let taxable: Cents = self
            .line_items
            .iter()
            .filter(|item| item.kind.is_taxable())
            .map(LineItem::amount)
            .sum();
        taxable.basis_points_rounded(self.tax_rate_bps)
    }

    pub fn total(&self) -> Cents {
        self.subtotal() + self.tax()
    }

    pub fn paid(&self) -> Cents {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    pub fn balance(&self) -> Cents {
        self.total() - self.paid()
    }

    pub fn has_item(&self, kind: LineItemKind) -> bool {
        self.line_items.iter().any(|item| item.kind == kind)
    }

    /// Amount billed for one kind of line item, before tax.
    pub fn billed(&self, kind: LineItemKind) -> Cents {
        self.line_items
            .iter()
            .filter(|item| item.kind == kind)
            .map(LineItem::amount)
            .sum()
    }
}

/// Serialized view carrying the computed totals next to the stored invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub subtotal: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub balance: Cents,
}

impl From<Invoice> for InvoiceView {
    fn from(invoice: Invoice) -> Self {
        Self {
            subtotal: invoice.subtotal(),
            tax: invoice.tax(),
            total: invoice.total(),
            balance: invoice.balance(),
            invoice,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub landlord_id: LandlordId,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub lease_id: Option<LeaseId>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub tax_rate_bps: u32,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(items: Vec<LineItem>, bps: u32) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).expect("date");
        Invoice {
            id: InvoiceId("inv-test".to_string()),
            number: "INV-TEST".to_string(),
            landlord_id: LandlordId("ll-fixture".to_string()),
            tenant_id: TenantId("ten-a".to_string()),
            lease_id: None,
            issue_date: date,
            due_date: date,
            line_items: items,
            tax_rate_bps: bps,
            status: InvoiceStatus::Draft,
            payments: Vec::new(),
            period: None,
        }
    }

    #[test]
    fn tax_applies_only_to_taxable_items() {
        let invoice = invoice(
            vec![
                LineItem::single(LineItemKind::Rent, "July rent", Cents::from_dollars(1_500)),
                LineItem {
                    kind: LineItemKind::Utility,
                    description: "Water".to_string(),
                    quantity: 3,
                    unit_price: Cents(1_999),
                },
            ],
            825,
        );
        assert_eq!(invoice.subtotal(), Cents(155_997));
        // 5997 * 8.25% = 494.75 -> 495
        assert_eq!(invoice.tax(), Cents(495));
        assert_eq!(invoice.total(), Cents(156_492));
    }

    #[test]
    fn balance_subtracts_payments() {
        let mut invoice = invoice(
            vec![LineItem::single(
                LineItemKind::Repair,
                "Broken blind",
                Cents::from_dollars(40),
            )],
            0,
        );
        invoice.payments.push(Payment {
            amount: Cents::from_dollars(15),
            received_at: Utc::now(),
            method: "card".to_string(),
            reference: None,
        });
        assert_eq!(invoice.balance(), Cents::from_dollars(25));
    }
}
