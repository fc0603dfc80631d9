use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::domain::{MaintenanceTicket, TicketId, TicketStatus};

pub trait MaintenanceRepository: Send + Sync {
    fn insert_ticket(&self, ticket: MaintenanceTicket)
        -> Result<MaintenanceTicket, RepositoryError>;
    fn update_ticket(&self, ticket: MaintenanceTicket) -> Result<(), RepositoryError>;
    fn ticket(&self, id: &TicketId) -> Result<Option<MaintenanceTicket>, RepositoryError>;
    fn tickets_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<MaintenanceTicket>, RepositoryError>;
    fn tickets_with_status(
        &self,
        status: TicketStatus,
    ) -> Result<Vec<MaintenanceTicket>, RepositoryError>;
}
