use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::{Landlord, LandlordId, PortfolioRepository};
use crate::store::RepositoryError;

use super::domain::{normalize_email, MemberStatus, Permission, TeamMember, TeamRole};
use super::repository::TeamRepository;

/// Account membership and role-based permission checks.
///
/// The landlord's own email is the account's first Owner; it is added to the roster the first
/// time the account is touched.
pub struct TeamService {
    members: Arc<dyn TeamRepository>,
    portfolio: Arc<dyn PortfolioRepository>,
    notifier: Notifier,
}

impl TeamService {
    pub fn new(
        members: Arc<dyn TeamRepository>,
        portfolio: Arc<dyn PortfolioRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            members,
            portfolio,
            notifier: Notifier::new(mailer),
        }
    }

    pub fn members(&self, account: &LandlordId) -> Result<Vec<TeamMember>, TeamError> {
        self.roster(account)?;
        Ok(self.members.members_for_account(account)?)
    }

    /// The active member behind `email`, if their role grants `permission`.
    pub fn authorize(
        &self,
        account: &LandlordId,
        email: &str,
        permission: Permission,
    ) -> Result<TeamMember, TeamError> {
        self.roster(account)?;
        let email = normalize_email(email);
        match self.members.member(account, &email)? {
            Some(member)
                if member.status == MemberStatus::Active && member.role.allows(permission) =>
            {
                Ok(member)
            }
            _ => Err(TeamError::Forbidden { email, permission }),
        }
    }

    pub fn invite(
        &self,
        account: &LandlordId,
        actor: &str,
        email: &str,
        role: TeamRole,
        at: DateTime<Utc>,
    ) -> Result<TeamMember, TeamError> {
        let landlord = self.roster(account)?;
        let inviter = self.authorize(account, actor, Permission::ManageTeam)?;
        let email = normalize_email(email);
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(TeamError::Validation(format!(
                    "'{email}' is not a valid email address"
                )))
            }
        }
        if let Some(existing) = self.members.member(account, &email)? {
            if existing.status != MemberStatus::Removed {
                return Err(TeamError::AlreadyMember {
                    email,
                    status: existing.status,
                });
            }
        }

        let member = self.members.upsert_member(TeamMember {
            account: account.clone(),
            email,
            role,
            status: MemberStatus::Invited,
            invited_by: Some(inviter.email.clone()),
            invited_at: at,
            joined_at: None,
        })?;
        self.notifier.deliver(&templates::team_invitation(
            &member.email,
            landlord.display_name(),
            role.label(),
            &inviter.email,
        ));
        info!(
            account = %account,
            email = %member.email,
            role = role.label(),
            "team member invited"
        );
        Ok(member)
    }

    pub fn accept(
        &self,
        account: &LandlordId,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<TeamMember, TeamError> {
        let mut member = self.existing(account, email)?;
        if member.status != MemberStatus::Invited {
            return Err(TeamError::NotInvited {
                email: member.email,
                status: member.status,
            });
        }
        member.status = MemberStatus::Active;
        member.joined_at = Some(at);
        let member = self.members.upsert_member(member)?;
        info!(account = %account, email = %member.email, "team invitation accepted");
        Ok(member)
    }

    pub fn change_role(
        &self,
        account: &LandlordId,
        actor: &str,
        email: &str,
        role: TeamRole,
    ) -> Result<TeamMember, TeamError> {
        self.authorize(account, actor, Permission::ManageTeam)?;
        let mut member = self.existing(account, email)?;
        if member.status == MemberStatus::Removed {
            return Err(TeamError::NotFound(member.email));
        }
        if role != TeamRole::Owner {
            self.ensure_other_owner(account, &member)?;
        }
        let previous = member.role;
        member.role = role;
        let member = self.members.upsert_member(member)?;
        info!(
            account = %account,
            email = %member.email,
            from = previous.label(),
            to = role.label(),
            "team role changed"
        );
        Ok(member)
    }

    pub fn remove(
        &self,
        account: &LandlordId,
        actor: &str,
        email: &str,
    ) -> Result<TeamMember, TeamError> {
        self.authorize(account, actor, Permission::ManageTeam)?;
        let mut member = self.existing(account, email)?;
        if member.status == MemberStatus::Removed {
            return Ok(member);
        }
        self.ensure_other_owner(account, &member)?;
        member.status = MemberStatus::Removed;
        let member = self.members.upsert_member(member)?;
        info!(account = %account, email = %member.email, "team member removed");
        Ok(member)
    }

    fn existing(&self, account: &LandlordId, email: &str) -> Result<TeamMember, TeamError> {
        let email = normalize_email(email);
        self.members
            .member(account, &email)?
            .ok_or(TeamError::NotFound(email))
    }

    /// Demoting or removing `member` must leave another active Owner behind.
    fn ensure_other_owner(
        &self,
        account: &LandlordId,
        member: &TeamMember,
    ) -> Result<(), TeamError> {
        if !member.is_active_owner() {
            return Ok(());
        }
        let others = self
            .members
            .members_for_account(account)?
            .into_iter()
            .filter(|other| other.email != member.email && other.is_active_owner())
            .count();
        if others == 0 {
            return Err(TeamError::LastOwner(member.email.clone()));
        }
        Ok(())
    }

    fn roster(&self, account: &LandlordId) -> Result<Landlord, TeamError> {
        let landlord = self
            .portfolio
            .landlord(account)?
            .ok_or_else(|| TeamError::AccountNotFound(account.clone()))?;
        if self.members.members_for_account(account)?.is_empty() {
            self.members.upsert_member(TeamMember {
                account: account.clone(),
                email: normalize_email(&landlord.email),
                role: TeamRole::Owner,
                status: MemberStatus::Active,
                invited_by: None,
                invited_at: Utc::now(),
                joined_at: Some(Utc::now()),
            })?;
        }
        Ok(landlord)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("account {0} not found")]
    AccountNotFound(LandlordId),
    #[error("{0} is not a member of this account")]
    NotFound(String),
    #[error("{email} lacks the {} permission", permission.label())]
    Forbidden { email: String, permission: Permission },
    #[error("{email} is already {}", status.label())]
    AlreadyMember { email: String, status: MemberStatus },
    #[error("{email} has no pending invitation (currently {})", status.label())]
    NotInvited { email: String, status: MemberStatus },
    #[error("{0} is the account's last active owner")]
    LastOwner(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
