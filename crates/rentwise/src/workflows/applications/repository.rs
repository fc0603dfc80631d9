use crate::portfolio::UnitId;
use crate::store::RepositoryError;

use super::domain::{ApplicationId, RentalApplication};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(
        &self,
        application: RentalApplication,
    ) -> Result<RentalApplication, RepositoryError>;
    fn update_application(&self, application: RentalApplication) -> Result<(), RepositoryError>;
    fn application(&self, id: &ApplicationId)
        -> Result<Option<RentalApplication>, RepositoryError>;
    fn applications_for_unit(&self, unit: &UnitId)
        -> Result<Vec<RentalApplication>, RepositoryError>;
}
