use crate::portfolio::LandlordId;
use crate::store::RepositoryError;
use crate::workflows::leasing::LeaseId;

use super::domain::{Invoice, InvoiceId, InvoiceStatus};

pub trait InvoiceRepository: Send + Sync {
    fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepositoryError>;
    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError>;
    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError>;
    fn invoices_for_landlord(&self, landlord: &LandlordId) -> Result<Vec<Invoice>, RepositoryError>;
    fn invoices_for_lease(&self, lease: &LeaseId) -> Result<Vec<Invoice>, RepositoryError>;
    fn invoices_with_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, RepositoryError>;
}
