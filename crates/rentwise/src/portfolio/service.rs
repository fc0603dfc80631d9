use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::store::RepositoryError;
use crate::workflows::leasing::document::{DocumentId, DocumentRepository};

use super::domain::{
    Landlord, LandlordId, NewLandlord, NewProperty, NewTenant, NewUnit, Property, PropertyId,
    Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use super::repository::PortfolioRepository;

static LANDLORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PROPERTY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static UNIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TENANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

fn require_text(field: &str, value: &str) -> Result<(), PortfolioError> {
    if value.trim().is_empty() {
        return Err(PortfolioError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), PortfolioError> {
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(PortfolioError::Validation(format!(
            "'{value}' is not a valid email address"
        ))),
    }
}

/// Registers landlords, properties, units and tenants and keeps their relationships consistent.
pub struct PortfolioService {
    repository: Arc<dyn PortfolioRepository>,
    documents: Arc<dyn DocumentRepository>,
}

impl PortfolioService {
    pub fn new(
        repository: Arc<dyn PortfolioRepository>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            repository,
            documents,
        }
    }

    pub fn register_landlord(&self, request: NewLandlord) -> Result<Landlord, PortfolioError> {
        require_text("name", &request.name)?;
        require_email(&request.email)?;

        let landlord = Landlord {
            id: LandlordId(next_id(&LANDLORD_SEQUENCE, "ll")),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            company_name: request.company_name.filter(|name| !name.trim().is_empty()),
        };
        let stored = self.repository.insert_landlord(landlord)?;
        info!(landlord_id = %stored.id.0, "landlord registered");
        Ok(stored)
    }

    pub fn add_property(&self, request: NewProperty) -> Result<Property, PortfolioError> {
        require_text("name", &request.name)?;
        require_text("address.line1", &request.address.line1)?;
        require_text("address.city", &request.address.city)?;
        self.landlord(&request.landlord_id)?;

        let property = Property {
            id: PropertyId(next_id(&PROPERTY_SEQUENCE, "prop")),
            landlord_id: request.landlord_id,
            name: request.name.trim().to_string(),
            address: request.address,
            year_built: request.year_built,
            flood_zone: request.flood_zone,
            shared_utilities: request.shared_utilities,
            default_lease_document: None,
        };
        let stored = self.repository.insert_property(property)?;
        info!(property_id = %stored.id.0, landlord_id = %stored.landlord_id.0, "property added");
        Ok(stored)
    }

    pub fn add_unit(&self, request: NewUnit) -> Result<Unit, PortfolioError> {
        require_text("label", &request.label)?;
        if !request.market_rent.is_positive() {
            return Err(PortfolioError::Validation(
                "market rent must be greater than zero".to_string(),
            ));
        }
        self.property(&request.property_id)?;

        let unit = Unit {
            id: UnitId(next_id(&UNIT_SEQUENCE, "unit")),
            property_id: request.property_id,
            label: request.label.trim().to_string(),
            bedrooms: request.bedrooms,
            bathrooms: request.bathrooms,
            market_rent: request.market_rent,
            status: UnitStatus::Vacant,
        };
        Ok(self.repository.insert_unit(unit)?)
    }

    pub fn add_tenant(&self, request: NewTenant) -> Result<Tenant, PortfolioError> {
        require_text("full_name", &request.full_name)?;
        require_email(&request.email)?;

        let tenant = Tenant {
            id: TenantId(next_id(&TENANT_SEQUENCE, "ten")),
            full_name: request.full_name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone,
        };
        Ok(self.repository.insert_tenant(tenant)?)
    }

    pub fn landlord(&self, id: &LandlordId) -> Result<Landlord, PortfolioError> {
        self.repository
            .landlord(id)?
            .ok_or_else(|| PortfolioError::LandlordNotFound(id.clone()))
    }

    pub fn property(&self, id: &PropertyId) -> Result<Property, PortfolioError> {
        self.repository
            .property(id)?
            .ok_or_else(|| PortfolioError::PropertyNotFound(id.clone()))
    }

    pub fn unit(&self, id: &UnitId) -> Result<Unit, PortfolioError> {
        self.repository
            .unit(id)?
            .ok_or_else(|| PortfolioError::UnitNotFound(id.clone()))
    }

    pub fn tenant(&self, id: &TenantId) -> Result<Tenant, PortfolioError> {
        self.repository
            .tenant(id)?
            .ok_or_else(|| PortfolioError::TenantNotFound(id.clone()))
    }

    pub fn units_for_property(&self, id: &PropertyId) -> Result<Vec<Unit>, PortfolioError> {
        self.property(id)?;
        Ok(self.repository.units_for_property(id)?)
    }

    /// Take a vacant unit off the market or put an offline unit back on it.
    pub fn set_availability(&self, id: &UnitId, available: bool) -> Result<Unit, PortfolioError> {
        let unit = self.unit(id)?;
        let next = match (unit.status, available) {
            (UnitStatus::Vacant, true) | (UnitStatus::Offline, false) => return Ok(unit),
            (UnitStatus::Vacant, false) => UnitStatus::Offline,
            (UnitStatus::Offline, true) => UnitStatus::Vacant,
            (status, _) => return Err(PortfolioError::UnitInUse { unit: id.clone(), status }),
        };
        Ok(self.repository.update_unit_status(id, next)?)
    }

    /// Make an uploaded or generated document the default lease for a property.
    pub fn assign_default_lease(
        &self,
        property_id: &PropertyId,
        document_id: &DocumentId,
    ) -> Result<Property, PortfolioError> {
        let property = self.property(property_id)?;
        let document = self
            .documents
            .document(document_id)?
            .ok_or_else(|| PortfolioError::DocumentNotFound(document_id.clone()))?;

        if document.landlord_id != property.landlord_id {
            return Err(PortfolioError::DocumentOwnership {
                document: document_id.clone(),
                landlord: property.landlord_id,
            });
        }

        let updated = self
            .repository
            .set_default_lease_document(property_id, Some(document_id.clone()))?;
        info!(property_id = %property_id.0, document_id = %document_id.0, "default lease assigned");
        Ok(updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("{0}")]
    Validation(String),
    #[error("landlord {0} not found")]
    LandlordNotFound(LandlordId),
    #[error("property {0} not found")]
    PropertyNotFound(PropertyId),
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("document {document} does not belong to landlord {landlord}")]
    DocumentOwnership {
        document: DocumentId,
        landlord: LandlordId,
    },
    #[error("unit {unit} is {}", status.label())]
    UnitInUse { unit: UnitId, status: UnitStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::money::Cents;
    use crate::portfolio::domain::Address;
    use crate::store::InMemoryStore;
    use crate::workflows::leasing::document::{DocumentKind, LegalDocument};

    fn service() -> (PortfolioService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        (PortfolioService::new(store.clone(), store.clone()), store)
    }

    fn seed_property(service: &PortfolioService) -> Property {
        let landlord = service
            .register_landlord(NewLandlord {
                name: "Dana Ortiz".to_string(),
                email: "dana@example.com".to_string(),
                company_name: None,
            })
            .expect("landlord");
        service
            .add_property(NewProperty {
                landlord_id: landlord.id,
                name: "Maple Court".to_string(),
                address: Address {
                    line1: "14 Maple Ct".to_string(),
                    line2: None,
                    city: "Des Moines".to_string(),
                    state: "IA".parse().expect("state"),
                    postal_code: "50309".to_string(),
                },
                year_built: Some(1985),
                flood_zone: false,
                shared_utilities: false,
            })
            .expect("property")
    }

    fn document(landlord: &LandlordId) -> LegalDocument {
        LegalDocument {
            id: DocumentId(format!("doc-test-{}", landlord.0)),
            landlord_id: landlord.clone(),
            title: "House lease".to_string(),
            kind: DocumentKind::Uploaded,
            storage_key: "memory://lease.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            digest: "00".repeat(32),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn units_start_vacant_and_require_known_property() {
        let (service, _) = service();
        let property = seed_property(&service);
        let unit = service
            .add_unit(NewUnit {
                property_id: property.id.clone(),
                label: "2B".to_string(),
                bedrooms: 2,
                bathrooms: 1.0,
                market_rent: Cents::from_dollars(1_250),
            })
            .expect("unit");
        assert_eq!(unit.status, UnitStatus::Vacant);

        let missing = service.add_unit(NewUnit {
            property_id: PropertyId("prop-missing".to_string()),
            label: "1A".to_string(),
            bedrooms: 1,
            bathrooms: 1.0,
            market_rent: Cents::from_dollars(900),
        });
        assert!(matches!(missing, Err(PortfolioError::PropertyNotFound(_))));
    }

    #[test]
    fn default_lease_must_belong_to_property_landlord() {
        let (service, store) = service();
        let property = seed_property(&service);
        let stranger = LandlordId("ll-stranger".to_string());

        let foreign = document(&stranger);
        store.insert_document(foreign.clone()).expect("insert");
        let result = service.assign_default_lease(&property.id, &foreign.id);
        assert!(matches!(
            result,
            Err(PortfolioError::DocumentOwnership { .. })
        ));

        let own = document(&property.landlord_id);
        store.insert_document(own.clone()).expect("insert");
        let updated = service
            .assign_default_lease(&property.id, &own.id)
            .expect("assigned");
        assert_eq!(updated.default_lease_document, Some(own.id));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let (service, _) = service();
        let result = service.add_tenant(NewTenant {
            full_name: "Sam Lee".to_string(),
            email: "sam-at-example".to_string(),
            phone: None,
        });
        assert!(matches!(result, Err(PortfolioError::Validation(_))));
    }
}
