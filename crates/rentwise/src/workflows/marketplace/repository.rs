use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::domain::{AvailabilityWindow, Booking, BookingId, Contractor, ContractorId};

pub trait MarketplaceRepository: Send + Sync {
    fn insert_contractor(&self, contractor: Contractor) -> Result<Contractor, RepositoryError>;
    fn contractor(&self, id: &ContractorId) -> Result<Option<Contractor>, RepositoryError>;
    fn contractors(&self) -> Result<Vec<Contractor>, RepositoryError>;

    fn insert_availability(&self, window: AvailabilityWindow) -> Result<(), RepositoryError>;
    fn availability_for(
        &self,
        contractor: &ContractorId,
    ) -> Result<Vec<AvailabilityWindow>, RepositoryError>;

    fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn update_booking(&self, booking: Booking) -> Result<(), RepositoryError>;
    fn booking(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn bookings_for_contractor(
        &self,
        contractor: &ContractorId,
    ) -> Result<Vec<Booking>, RepositoryError>;
    fn bookings_for_landlord(&self, landlord: &LandlordId) -> Result<Vec<Booking>, RepositoryError>;
}
