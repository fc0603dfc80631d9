use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{PropertyId, TenantId, UnitId};
use crate::workflows::leasing::builder::LateFee;
use crate::workflows::leasing::LeaseId;

use super::screening::ScreeningReport;

string_id!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

/// Applicant-provided request to lease a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub unit_id: UnitId,
    pub applicant: TenantId,
    #[serde(default)]
    pub co_applicants: Vec<TenantId>,
    pub desired_move_in: NaiveDate,
    /// Combined gross monthly income of everyone on the application.
    pub monthly_income: Cents,
    #[serde(default)]
    pub credit_score: Option<u16>,
    #[serde(default)]
    pub prior_evictions: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalApplication {
    pub id: ApplicationId,
    pub unit_id: UnitId,
    pub property_id: PropertyId,
    pub applicant: TenantId,
    pub co_applicants: Vec<TenantId>,
    pub desired_move_in: NaiveDate,
    pub monthly_income: Cents,
    pub credit_score: Option<u16>,
    pub prior_evictions: u8,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_note: Option<String>,
    pub lease_id: Option<LeaseId>,
    pub screening: ScreeningReport,
}

impl RentalApplication {
    /// Applicant first, then co-applicants in submission order.
    pub fn household(&self) -> Vec<TenantId> {
        std::iter::once(self.applicant.clone())
            .chain(self.co_applicants.iter().cloned())
            .collect()
    }
}

/// Landlord-chosen terms for the lease created on approval. Omitted values fall back to the
/// unit's market rent, a one-month deposit, the desired move-in date and a twelve month term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(default)]
    pub monthly_rent: Option<Cents>,
    #[serde(default)]
    pub security_deposit: Option<Cents>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub month_to_month: bool,
    #[serde(default)]
    pub rent_due_day: Option<u8>,
    #[serde(default)]
    pub late_fee: Option<LateFee>,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub utilities_included: Vec<String>,
    #[serde(default)]
    pub additional_terms: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}
