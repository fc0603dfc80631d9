use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::portfolio::LandlordId;

/// Capabilities granted by a team role.
///
/// `ManageTeam` guards the team routes and `ViewReports` guards the financial report. The rest
/// are checked by the embedding application through `TeamService::authorize`; the portfolio,
/// application and billing routes are not account-scoped and do not check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageProperties,
    ApproveApplications,
    ManageBilling,
    ViewReports,
    ManageTeam,
}

impl Permission {
    pub const fn label(self) -> &'static str {
        match self {
            Permission::ManageProperties => "manage_properties",
            Permission::ApproveApplications => "approve_applications",
            Permission::ManageBilling => "manage_billing",
            Permission::ViewReports => "view_reports",
            Permission::ManageTeam => "manage_team",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Owner,
    Manager,
    Accountant,
    Viewer,
}

impl TeamRole {
    pub const fn label(self) -> &'static str {
        match self {
            TeamRole::Owner => "owner",
            TeamRole::Manager => "manager",
            TeamRole::Accountant => "accountant",
            TeamRole::Viewer => "viewer",
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            TeamRole::Owner => &[
                ManageProperties,
                ApproveApplications,
                ManageBilling,
                ViewReports,
                ManageTeam,
            ],
            TeamRole::Manager => &[ManageProperties, ApproveApplications, ViewReports],
            TeamRole::Accountant => &[ManageBilling, ViewReports],
            TeamRole::Viewer => &[ViewReports],
        }
    }

    pub fn allows(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Invited,
    Active,
    Removed,
}

impl MemberStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MemberStatus::Invited => "invited",
            MemberStatus::Active => "active",
            MemberStatus::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub account: LandlordId,
    /// Lower-cased; unique within an account.
    pub email: String,
    pub role: TeamRole,
    pub status: MemberStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl TeamMember {
    pub fn is_active_owner(&self) -> bool {
        self.status == MemberStatus::Active && self.role == TeamRole::Owner
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
