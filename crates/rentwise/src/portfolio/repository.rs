use crate::store::RepositoryError;
use crate::workflows::leasing::document::DocumentId;

use super::domain::{
    Landlord, LandlordId, Property, PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};

/// Storage abstraction for landlords, their properties and units, and tenants.
pub trait PortfolioRepository: Send + Sync {
    fn insert_landlord(&self, landlord: Landlord) -> Result<Landlord, RepositoryError>;
    fn landlord(&self, id: &LandlordId) -> Result<Option<Landlord>, RepositoryError>;

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn properties_for_landlord(&self, id: &LandlordId) -> Result<Vec<Property>, RepositoryError>;
    fn set_default_lease_document(
        &self,
        id: &PropertyId,
        document: Option<DocumentId>,
    ) -> Result<Property, RepositoryError>;

    fn insert_unit(&self, unit: Unit) -> Result<Unit, RepositoryError>;
    fn unit(&self, id: &UnitId) -> Result<Option<Unit>, RepositoryError>;
    fn units_for_property(&self, id: &PropertyId) -> Result<Vec<Unit>, RepositoryError>;
    fn update_unit_status(&self, id: &UnitId, status: UnitStatus)
        -> Result<Unit, RepositoryError>;

    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError>;
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
}
