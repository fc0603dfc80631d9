use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::domain::TeamMember;

pub trait TeamRepository: Send + Sync {
    /// Inserts or replaces the member keyed by account and email.
    fn upsert_member(&self, member: TeamMember) -> Result<TeamMember, RepositoryError>;
    fn member(&self, account: &LandlordId, email: &str)
        -> Result<Option<TeamMember>, RepositoryError>;
    fn members_for_account(&self, account: &LandlordId)
        -> Result<Vec<TeamMember>, RepositoryError>;
}
