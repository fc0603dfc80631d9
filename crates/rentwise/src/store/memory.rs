use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::portfolio::{
    Landlord, LandlordId, PortfolioRepository, Property, PropertyId, Tenant, TenantId, Unit,
    UnitId, UnitStatus,
};
use crate::workflows::applications::{ApplicationId, ApplicationRepository, RentalApplication};
use crate::workflows::billing::{Invoice, InvoiceId, InvoiceRepository, InvoiceStatus};
use crate::workflows::leasing::{
    DocumentId, DocumentRepository, LeaseAgreement, LeaseId, LeaseRepository, LeaseStatus,
    LegalDocument, SignatureRepository, SignatureRequest, SignatureRequestId,
};
use crate::workflows::maintenance::{
    MaintenanceRepository, MaintenanceTicket, TicketId, TicketStatus,
};
use crate::workflows::marketplace::{
    AvailabilityWindow, Booking, BookingId, Contractor, ContractorId, MarketplaceRepository,
};
use crate::workflows::reminders::{ReminderKind, ReminderLedger, ReminderRecord};
use crate::workflows::team::{TeamMember, TeamRepository};

use super::RepositoryError;

/// One keyed collection. Listings come back in key order.
struct Table<K, V> {
    rows: Mutex<BTreeMap<K, V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Table<K, V> {
    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<K, V>>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn insert(&self, key: K, value: V) -> Result<V, RepositoryError> {
        let mut rows = self.rows()?;
        if rows.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        rows.insert(key, value.clone());
        Ok(value)
    }

    fn upsert(&self, key: K, value: V) -> Result<V, RepositoryError> {
        self.rows()?.insert(key, value.clone());
        Ok(value)
    }

    fn replace(&self, key: K, value: V) -> Result<(), RepositoryError> {
        let mut rows = self.rows()?;
        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = value;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn modify(&self, key: &K, apply: impl FnOnce(&mut V)) -> Result<V, RepositoryError> {
        let mut rows = self.rows()?;
        let row = rows.get_mut(key).ok_or(RepositoryError::NotFound)?;
        apply(row);
        Ok(row.clone())
    }

    fn get(&self, key: &K) -> Result<Option<V>, RepositoryError> {
        Ok(self.rows()?.get(key).cloned())
    }

    fn contains(&self, key: &K) -> Result<bool, RepositoryError> {
        Ok(self.rows()?.contains_key(key))
    }

    fn select(&self, keep: impl Fn(&V) -> bool) -> Result<Vec<V>, RepositoryError> {
        Ok(self.rows()?.values().filter(|row| keep(row)).cloned().collect())
    }
}

/// Process-local adapter for every repository seam in the crate.
#[derive(Default)]
pub struct InMemoryStore {
    landlords: Table<LandlordId, Landlord>,
    properties: Table<PropertyId, Property>,
    units: Table<UnitId, Unit>,
    tenants: Table<TenantId, Tenant>,
    documents: Table<DocumentId, LegalDocument>,
    leases: Table<LeaseId, LeaseAgreement>,
    signatures: Table<SignatureRequestId, SignatureRequest>,
    applications: Table<ApplicationId, RentalApplication>,
    contractors: Table<ContractorId, Contractor>,
    availability: Table<(ContractorId, DateTime<Utc>, DateTime<Utc>), AvailabilityWindow>,
    bookings: Table<BookingId, Booking>,
    tickets: Table<TicketId, MaintenanceTicket>,
    invoices: Table<InvoiceId, Invoice>,
    reminders: Table<(InvoiceId, String), ReminderRecord>,
    members: Table<(LandlordId, String), TeamMember>,
}

impl PortfolioRepository for InMemoryStore {
    fn insert_landlord(&self, landlord: Landlord) -> Result<Landlord, RepositoryError> {
        self.landlords.insert(landlord.id.clone(), landlord)
    }

    fn landlord(&self, id: &LandlordId) -> Result<Option<Landlord>, RepositoryError> {
        self.landlords.get(id)
    }

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        self.properties.insert(property.id.clone(), property)
    }

    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        self.properties.get(id)
    }

    fn properties_for_landlord(&self, id: &LandlordId) -> Result<Vec<Property>, RepositoryError> {
        self.properties.select(|property| &property.landlord_id == id)
    }

    fn set_default_lease_document(
        &self,
        id: &PropertyId,
        document: Option<DocumentId>,
    ) -> Result<Property, RepositoryError> {
        self.properties
            .modify(id, |property| property.default_lease_document = document)
    }

    fn insert_unit(&self, unit: Unit) -> Result<Unit, RepositoryError> {
        self.units.insert(unit.id.clone(), unit)
    }

    fn unit(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError> {
        self.units.get(id)
    }

    fn units_for_property(&self, id: &PropertyId) -> Result<Vec<Unit>, RepositoryError> {
        self.units.select(|unit| &unit.property_id == id)
    }

    fn update_unit_status(
        &self,
        id: &UnitId,
        status: UnitStatus,
    ) -> Result<Unit, RepositoryError> {
        self.units.modify(id, |unit| unit.status = status)
    }

    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError> {
        self.tenants.insert(tenant.id.clone(), tenant)
    }

    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        self.tenants.get(id)
    }
}

impl DocumentRepository for InMemoryStore {
    fn insert_document(&self, document: LegalDocument) -> Result<LegalDocument, RepositoryError> {
        self.documents.insert(document.id.clone(), document)
    }

    fn document(&self, id: &DocumentId) -> Result<Option<LegalDocument>, RepositoryError> {
        self.documents.get(id)
    }

    fn documents_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<LegalDocument>, RepositoryError> {
        self.documents
            .select(|document| &document.landlord_id == landlord)
    }
}

impl LeaseRepository for InMemoryStore {
    fn insert_lease(&self, lease: LeaseAgreement) -> Result<LeaseAgreement, RepositoryError> {
        self.leases.insert(lease.id.clone(), lease)
    }

    fn update_lease(&self, lease: LeaseAgreement) -> Result<(), RepositoryError> {
        self.leases.replace(lease.id.clone(), lease)
    }

    fn lease(&self, id: &LeaseId) -> Result<Option<LeaseAgreement>, RepositoryError> {
        self.leases.get(id)
    }

    fn leases_with_status(
        &self,
        status: LeaseStatus,
    ) -> Result<Vec<LeaseAgreement>, RepositoryError> {
        self.leases.select(|lease| lease.status == status)
    }

    fn leases_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<LeaseAgreement>, RepositoryError> {
        self.leases.select(|lease| &lease.landlord_id == landlord)
    }
}

impl SignatureRepository for InMemoryStore {
    fn insert_signature_request(
        &self,
        request: SignatureRequest,
    ) -> Result<SignatureRequest, RepositoryError> {
        self.signatures.insert(request.id.clone(), request)
    }

    fn update_signature_request(&self, request: SignatureRequest) -> Result<(), RepositoryError> {
        self.signatures.replace(request.id.clone(), request)
    }

    fn signature_request(
        &self,
        id: &SignatureRequestId,
    ) -> Result<Option<SignatureRequest>, RepositoryError> {
        self.signatures.get(id)
    }

    fn signature_requests_for_lease(
        &self,
        lease: &LeaseId,
    ) -> Result<Vec<SignatureRequest>, RepositoryError> {
        self.signatures.select(|request| &request.lease_id == lease)
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: RentalApplication,
    ) -> Result<RentalApplication, RepositoryError> {
        self.applications
            .insert(application.id.clone(), application)
    }

    fn update_application(&self, application: RentalApplication) -> Result<(), RepositoryError> {
        self.applications
            .replace(application.id.clone(), application)
    }

    fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<RentalApplication>, RepositoryError> {
        self.applications.get(id)
    }

    fn applications_for_unit(
        &self,
        unit: &UnitId,
    ) -> Result<Vec<RentalApplication>, RepositoryError> {
        self.applications
            .select(|application| &application.unit_id == unit)
    }
}

impl MarketplaceRepository for InMemoryStore {
    fn insert_contractor(&self, contractor: Contractor) -> Result<Contractor, RepositoryError> {
        self.contractors.insert(contractor.id.clone(), contractor)
    }

    fn contractor(&self, id: &ContractorId) -> Result<Option<Contractor>, RepositoryError> {
        self.contractors.get(id)
    }

    fn contractors(&self) -> Result<Vec<Contractor>, RepositoryError> {
        self.contractors.select(|_| true)
    }

    fn insert_availability(&self, window: AvailabilityWindow) -> Result<(), RepositoryError> {
        if !self.contractors.contains(&window.contractor_id)? {
            return Err(RepositoryError::NotFound);
        }
        let key = (
            window.contractor_id.clone(),
            window.starts_at,
            window.ends_at,
        );
        self.availability.upsert(key, window)?;
        Ok(())
    }

    fn availability_for(
        &self,
        contractor: &ContractorId,
    ) -> Result<Vec<AvailabilityWindow>, RepositoryError> {
        self.availability
            .select(|window| &window.contractor_id == contractor)
    }

    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        self.bookings.insert(booking.id.clone(), booking)
    }

    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError> {
        self.bookings.replace(booking.id.clone(), booking)
    }

    fn booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.bookings.get(id)
    }

    fn bookings_for_contractor(
        &self,
        contractor: &ContractorId,
    ) -> Result<Vec<Booking>, RepositoryError> {
        self.bookings
            .select(|booking| &booking.contractor_id == contractor)
    }

    fn bookings_for_landlord(&self, landlord: &LandlordId) -> Result<Vec<Booking>, RepositoryError> {
        self.bookings.select(|booking| &booking.landlord_id == landlord)
    }
}

impl MaintenanceRepository for InMemoryStore {
    fn insert_ticket(
        &self,
        ticket: MaintenanceTicket,
    ) -> Result<MaintenanceTicket, RepositoryError> {
        self.tickets.insert(ticket.id.clone(), ticket)
    }

    fn update_ticket(&self, ticket: MaintenanceTicket) -> Result<(), RepositoryError> {
        self.tickets.replace(ticket.id.clone(), ticket)
    }

    fn ticket(&self, id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError> {
        self.tickets.get(id)
    }

    fn tickets_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<MaintenanceTicket>, RepositoryError> {
        self.tickets.select(|ticket| &ticket.landlord_id == landlord)
    }

    fn tickets_with_status(
        &self,
        status: TicketStatus,
    ) -> Result<Vec<MaintenanceTicket>, RepositoryError> {
        self.tickets.select(|ticket| ticket.status == status)
    }
}

impl InvoiceRepository for InMemoryStore {
    fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepositoryError> {
        self.invoices.insert(invoice.id.clone(), invoice)
    }

    fn update_invoice(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        self.invoices.replace(invoice.id.clone(), invoice)
    }

    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        self.invoices.get(id)
    }

    fn invoices_for_landlord(&self, landlord: &LandlordId) -> Result<Vec<Invoice>, RepositoryError> {
        self.invoices.select(|invoice| &invoice.landlord_id == landlord)
    }

    fn invoices_for_lease(&self, lease: &LeaseId) -> Result<Vec<Invoice>, RepositoryError> {
        self.invoices
            .select(|invoice| invoice.lease_id.as_ref() == Some(lease))
    }

    fn invoices_with_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, RepositoryError> {
        self.invoices.select(|invoice| invoice.status == status)
    }
}

impl ReminderLedger for InMemoryStore {
    fn reminder_sent(
        &self,
        invoice: &InvoiceId,
        kind: ReminderKind,
    ) -> Result<bool, RepositoryError> {
        self.reminders.contains(&(invoice.clone(), kind.key()))
    }

    fn record_reminder(&self, record: ReminderRecord) -> Result<(), RepositoryError> {
        let key = (record.invoice_id.clone(), record.kind.key());
        self.reminders.insert(key, record)?;
        Ok(())
    }

    fn reminders_for_invoice(
        &self,
        invoice: &InvoiceId,
    ) -> Result<Vec<ReminderRecord>, RepositoryError> {
        self.reminders.select(|record| &record.invoice_id == invoice)
    }
}

impl TeamRepository for InMemoryStore {
    fn upsert_member(&self, member: TeamMember) -> Result<TeamMember, RepositoryError> {
        let key = (member.account.clone(), member.email.clone());
        self.members.upsert(key, member)
    }

    fn member(
        &self,
        account: &LandlordId,
        email: &str,
    ) -> Result<Option<TeamMember>, RepositoryError> {
        self.members.get(&(account.clone(), email.to_string()))
    }

    fn members_for_account(
        &self,
        account: &LandlordId,
    ) -> Result<Vec<TeamMember>, RepositoryError> {
        self.members.select(|member| &member.account == account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Cents;

    fn unit(id: &str, property: &str) -> Unit {
        Unit {
            id: UnitId(id.to_string()),
            property_id: PropertyId(property.to_string()),
            label: id.to_uppercase(),
            bedrooms: 2,
            bathrooms: 1.5,
            market_rent: Cents::from_dollars(1_400),
            status: UnitStatus::Vacant,
        }
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = InMemoryStore::default();
        store.insert_unit(unit("unit-a", "prop-1")).expect("first insert");
        assert_eq!(
            store.insert_unit(unit("unit-a", "prop-1")),
            Err(RepositoryError::Conflict)
        );
    }

    #[test]
    fn listings_are_filtered_and_ordered_by_id() {
        let store = InMemoryStore::default();
        store.insert_unit(unit("unit-c", "prop-1")).expect("unit c");
        store.insert_unit(unit("unit-a", "prop-1")).expect("unit a");
        store.insert_unit(unit("unit-b", "prop-2")).expect("unit b");

        let ids: Vec<String> = store
            .units_for_property(&PropertyId("prop-1".to_string()))
            .expect("units")
            .into_iter()
            .map(|unit| unit.id.0)
            .collect();
        assert_eq!(ids, vec!["unit-a", "unit-c"]);
    }

    #[test]
    fn status_updates_require_an_existing_unit() {
        let store = InMemoryStore::default();
        store.insert_unit(unit("unit-a", "prop-1")).expect("unit");
        let updated = store
            .update_unit_status(&UnitId("unit-a".to_string()), UnitStatus::Reserved)
            .expect("updated");
        assert_eq!(updated.status, UnitStatus::Reserved);
        assert_eq!(
            store.update_unit_status(&UnitId("unit-z".to_string()), UnitStatus::Occupied),
            Err(RepositoryError::NotFound)
        );
    }
}
