//! Invoicing: drafts, tax, payments, the monthly rent run and late fees.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Invoice, InvoiceId, InvoiceStatus, InvoiceView, LineItem, LineItemKind, NewInvoice, Payment,
};
pub use repository::InvoiceRepository;
pub use router::billing_router;
pub use service::{month_start, BillingError, BillingService};
