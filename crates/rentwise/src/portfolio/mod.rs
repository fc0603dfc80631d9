//! Landlords, properties, units and tenants.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Address, Landlord, LandlordId, NewLandlord, NewProperty, NewTenant, NewUnit, Property,
    PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
pub use repository::PortfolioRepository;
pub use router::portfolio_router;
pub use service::{PortfolioError, PortfolioService};
