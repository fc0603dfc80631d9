use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{LandlordId, PropertyId, TenantId, UnitId};
use crate::store::RepositoryError;
use crate::workflows::applications::ApplicationId;

use super::audit::AuditTrail;
use super::builder::LateFee;
use super::document::DocumentId;

string_id!(LeaseId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Draft,
    AwaitingSignatures,
    PartiallySigned,
    Executed,
    Declined,
    Voided,
}

use LeaseStatus::{AwaitingSignatures, Declined, Draft, Executed, PartiallySigned, Voided};

const ALLOWED_TRANSITIONS: [(LeaseStatus, LeaseStatus); 8] = [
    (Draft, AwaitingSignatures),
    (Draft, Voided),
    (AwaitingSignatures, PartiallySigned),
    (AwaitingSignatures, Declined),
    (AwaitingSignatures, Voided),
    (PartiallySigned, Executed),
    (PartiallySigned, Declined),
    (PartiallySigned, Voided),
];

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Draft => "draft",
            AwaitingSignatures => "awaiting_signatures",
            PartiallySigned => "partially_signed",
            Executed => "executed",
            Declined => "declined",
            Voided => "voided",
        }
    }

    pub fn can_transition_to(self, next: LeaseStatus) -> bool {
        ALLOWED_TRANSITIONS.contains(&(self, next))
    }

    /// Executed, declined and voided leases accept no further transitions.
    pub fn is_final(self) -> bool {
        !ALLOWED_TRANSITIONS.iter().any(|(from, _)| *from == self)
    }

    /// Signatures are only collected while the lease is out for signature.
    pub fn accepts_signatures(self) -> bool {
        matches!(self, AwaitingSignatures | PartiallySigned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseStateError {
    #[error("lease cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition { from: LeaseStatus, to: LeaseStatus },
}

/// Input for a new lease agreement; the id, status and audit trail are assigned on creation.
#[derive(Debug, Clone)]
pub struct NewLeaseAgreement {
    pub application_id: Option<ApplicationId>,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub tenant_ids: Vec<TenantId>,
    pub document_id: DocumentId,
    pub document_digest: String,
    pub addendum_document_id: Option<DocumentId>,
    pub monthly_rent: Cents,
    pub security_deposit: Cents,
    pub rent_due_day: u8,
    pub late_fee: Option<LateFee>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseAgreement {
    pub id: LeaseId,
    pub application_id: Option<ApplicationId>,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub tenant_ids: Vec<TenantId>,
    pub document_id: DocumentId,
    pub document_digest: String,
    pub addendum_document_id: Option<DocumentId>,
    pub monthly_rent: Cents,
    pub security_deposit: Cents,
    pub rent_due_day: u8,
    pub late_fee: Option<LateFee>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: LeaseStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub audit: AuditTrail,
}

static LEASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lease_id() -> LeaseId {
    let id = LEASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeaseId(format!("lease-{id:06}"))
}

impl LeaseAgreement {
    pub fn create(input: NewLeaseAgreement, actor: &str, at: DateTime<Utc>) -> Self {
        let id = next_lease_id();
        let mut audit = AuditTrail::new();
        audit.record(
            at,
            actor,
            "lease.created",
            format!(
                "{} for unit {} with document {} ({})",
                id, input.unit_id, input.document_id, input.document_digest
            ),
        );

        Self {
            id,
            application_id: input.application_id,
            landlord_id: input.landlord_id,
            property_id: input.property_id,
            unit_id: input.unit_id,
            tenant_ids: input.tenant_ids,
            document_id: input.document_id,
            document_digest: input.document_digest,
            addendum_document_id: input.addendum_document_id,
            monthly_rent: input.monthly_rent,
            security_deposit: input.security_deposit,
            rent_due_day: input.rent_due_day,
            late_fee: input.late_fee,
            start_date: input.start_date,
            end_date: input.end_date,
            status: LeaseStatus::Draft,
            created_at: at,
            executed_at: None,
            audit,
        }
    }

    /// Move the lease to `next`, recording the change in the audit trail.
    pub fn transition(
        &mut self,
        next: LeaseStatus,
        actor: &str,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LeaseStateError> {
        if !self.status.can_transition_to(next) {
            return Err(LeaseStateError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let action = format!("lease.{}", next.label());
        self.audit.record(at, actor, action, detail);
        self.status = next;
        if next == Executed {
            self.executed_at = Some(at);
        }
        Ok(())
    }

    /// Whether the lease covers any day of the month starting at `first_of_month`.
    pub fn covers_month(&self, first_of_month: NaiveDate) -> bool {
        let month_end = first_of_month
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(first_of_month);
        self.start_date <= month_end && self.end_date.map_or(true, |end| end >= first_of_month)
    }
}

pub trait LeaseRepository: Send + Sync {
    fn insert_lease(&self, lease: LeaseAgreement) -> Result<LeaseAgreement, RepositoryError>;
    fn update_lease(&self, lease: LeaseAgreement) -> Result<(), RepositoryError>;
    fn lease(&self, id: &LeaseId) -> Result<Option<LeaseAgreement>, RepositoryError>;
    fn leases_with_status(&self, status: LeaseStatus)
        -> Result<Vec<LeaseAgreement>, RepositoryError>;
    fn leases_for_landlord(
        &self,
        landlord: &LandlordId,
    ) -> Result<Vec<LeaseAgreement>, RepositoryError>;
}
