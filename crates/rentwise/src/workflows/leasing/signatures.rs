use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LeasingConfig;
use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::{LandlordId, PortfolioRepository, TenantId, UnitStatus};
use crate::store::RepositoryError;

use super::agreement::{LeaseAgreement, LeaseId, LeaseRepository, LeaseStateError, LeaseStatus};
use super::audit::AuditTrail;

string_id!(SignatureRequestId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum SignerRole {
    Tenant(TenantId),
    Landlord(LandlordId),
}

impl SignerRole {
    pub fn is_tenant(&self) -> bool {
        matches!(self, SignerRole::Tenant(_))
    }

    pub const fn label(&self) -> &'static str {
        match self {
            SignerRole::Tenant(_) => "tenant",
            SignerRole::Landlord(_) => "landlord",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Viewed,
    Signed,
    Declined,
    Voided,
}

impl SignatureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SignatureStatus::Pending => "pending",
            SignatureStatus::Viewed => "viewed",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Declined => "declined",
            SignatureStatus::Voided => "voided",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, SignatureStatus::Pending | SignatureStatus::Viewed)
    }
}

/// Per-party record tracking whether the lease document has been signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub id: SignatureRequestId,
    pub lease_id: LeaseId,
    pub role: SignerRole,
    pub signer_name: String,
    pub signer_email: String,
    pub status: SignatureStatus,
    pub sent_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_name: Option<String>,
    pub decline_reason: Option<String>,
}

static SIGNATURE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> SignatureRequestId {
    let id = SIGNATURE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SignatureRequestId(format!("sig-{id:06}"))
}

impl SignatureRequest {
    fn new(
        lease_id: &LeaseId,
        role: SignerRole,
        signer_name: &str,
        signer_email: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_request_id(),
            lease_id: lease_id.clone(),
            role,
            signer_name: signer_name.to_string(),
            signer_email: signer_email.to_string(),
            status: SignatureStatus::Pending,
            sent_at: at,
            viewed_at: None,
            signed_at: None,
            signed_name: None,
            decline_reason: None,
        }
    }
}

pub trait SignatureRepository: Send + Sync {
    fn insert_signature_request(
        &self,
        request: SignatureRequest,
    ) -> Result<SignatureRequest, RepositoryError>;
    fn update_signature_request(&self, request: SignatureRequest) -> Result<(), RepositoryError>;
    fn signature_request(
        &self,
        id: &SignatureRequestId,
    ) -> Result<Option<SignatureRequest>, RepositoryError>;
    fn signature_requests_for_lease(
        &self,
        lease: &LeaseId,
    ) -> Result<Vec<SignatureRequest>, RepositoryError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SigningOutcome {
    pub request: SignatureRequest,
    pub lease_status: LeaseStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("lease {0} not found")]
    LeaseNotFound(LeaseId),
    #[error("signature request {0} not found")]
    RequestNotFound(SignatureRequestId),
    #[error(transparent)]
    Lease(#[from] LeaseStateError),
    #[error("lease {lease} is {} and is not collecting signatures", status.label())]
    LeaseClosed { lease: LeaseId, status: LeaseStatus },
    #[error("signature request {request} is already {}", status.label())]
    RequestClosed {
        request: SignatureRequestId,
        status: SignatureStatus,
    },
    #[error("the presented document does not match the lease document")]
    DocumentMismatch,
    #[error("the landlord can only countersign after every tenant has signed")]
    CountersignatureTooEarly,
    #[error("a signed name is required")]
    MissingSignature,
    #[error("lease party {0} not found")]
    PartyNotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Drives a lease through the signature state machine.
pub struct SigningService {
    leases: Arc<dyn LeaseRepository>,
    signatures: Arc<dyn SignatureRepository>,
    portfolio: Arc<dyn PortfolioRepository>,
    notifier: Notifier,
    config: LeasingConfig,
}

impl SigningService {
    pub fn new(
        leases: Arc<dyn LeaseRepository>,
        signatures: Arc<dyn SignatureRepository>,
        portfolio: Arc<dyn PortfolioRepository>,
        mailer: Arc<dyn Mailer>,
        config: LeasingConfig,
    ) -> Self {
        Self {
            leases,
            signatures,
            portfolio,
            notifier: Notifier::new(mailer),
            config,
        }
    }

    pub fn lease(&self, id: &LeaseId) -> Result<LeaseAgreement, SigningError> {
        self.leases
            .lease(id)?
            .ok_or_else(|| SigningError::LeaseNotFound(id.clone()))
    }

    pub fn request(&self, id: &SignatureRequestId) -> Result<SignatureRequest, SigningError> {
        self.signatures
            .signature_request(id)?
            .ok_or_else(|| SigningError::RequestNotFound(id.clone()))
    }

    pub fn requests_for_lease(&self, id: &LeaseId) -> Result<Vec<SignatureRequest>, SigningError> {
        Ok(self.signatures.signature_requests_for_lease(id)?)
    }

    pub fn audit_trail(&self, id: &LeaseId) -> Result<AuditTrail, SigningError> {
        Ok(self.lease(id)?.audit)
    }

    /// Emails that could not be delivered since the service started.
    pub fn notification_failures(&self) -> u64 {
        self.notifier.failures()
    }

    fn premises(&self, lease: &LeaseAgreement) -> Result<String, SigningError> {
        let unit = self
            .portfolio
            .unit(&lease.unit_id)?
            .ok_or_else(|| SigningError::PartyNotFound(lease.unit_id.to_string()))?;
        let property = self
            .portfolio
            .property(&lease.property_id)?
            .ok_or_else(|| SigningError::PartyNotFound(lease.property_id.to_string()))?;
        Ok(format!("Unit {} at {}", unit.label, property.name))
    }

    fn release_unit(&self, lease: &LeaseAgreement) -> Result<(), SigningError> {
        self.portfolio
            .update_unit_status(&lease.unit_id, UnitStatus::Vacant)?;
        Ok(())
    }

    /// Void every request still waiting on a signer.
    fn close_open_requests(
        &self,
        lease: &LeaseId,
        except: Option<&SignatureRequestId>,
    ) -> Result<Vec<SignatureRequest>, SigningError> {
        let mut closed = Vec::new();
        for mut request in self.signatures.signature_requests_for_lease(lease)? {
            if !request.status.is_open() || Some(&request.id) == except {
                continue;
            }
            request.status = SignatureStatus::Voided;
            self.signatures.update_signature_request(request.clone())?;
            closed.push(request);
        }
        Ok(closed)
    }

    /// Draft -> AwaitingSignatures: one request per tenant plus the landlord's countersignature.
    pub fn send_for_signature(
        &self,
        lease_id: &LeaseId,
        at: DateTime<Utc>,
    ) -> Result<Vec<SignatureRequest>, SigningError> {
        let mut lease = self.lease(lease_id)?;
        if !lease.status.can_transition_to(LeaseStatus::AwaitingSignatures) {
            return Err(LeaseStateError::InvalidTransition {
                from: lease.status,
                to: LeaseStatus::AwaitingSignatures,
            }
            .into());
        }

        let landlord = self
            .portfolio
            .landlord(&lease.landlord_id)?
            .ok_or_else(|| SigningError::PartyNotFound(lease.landlord_id.to_string()))?;
        let mut requests = Vec::with_capacity(lease.tenant_ids.len() + 1);
        for tenant_id in &lease.tenant_ids {
            let tenant = self
                .portfolio
                .tenant(tenant_id)?
                .ok_or_else(|| SigningError::PartyNotFound(tenant_id.to_string()))?;
            requests.push(SignatureRequest::new(
                &lease.id,
                SignerRole::Tenant(tenant.id.clone()),
                &tenant.full_name,
                &tenant.email,
                at,
            ));
        }
        requests.push(SignatureRequest::new(
            &lease.id,
            SignerRole::Landlord(landlord.id.clone()),
            landlord.display_name(),
            &landlord.email,
            at,
        ));

        let premises = self.premises(&lease)?;
        lease.transition(
            LeaseStatus::AwaitingSignatures,
            &landlord.email,
            format!("{} signature requests sent", requests.len()),
            at,
        )?;
        for request in &requests {
            self.signatures.insert_signature_request(request.clone())?;
        }
        self.leases.update_lease(lease)?;

        for request in requests.iter().filter(|request| request.role.is_tenant()) {
            self.notifier.deliver(&templates::signature_requested(
                &request.signer_email,
                &request.signer_name,
                &premises,
                &self.config.signing_link(request.id.as_str()),
            ));
        }

        info!(lease_id = %lease_id, requests = requests.len(), "lease sent for signature");
        Ok(requests)
    }

    /// Pending -> Viewed. Viewing again is a no-op.
    pub fn record_view(
        &self,
        request_id: &SignatureRequestId,
        at: DateTime<Utc>,
    ) -> Result<SignatureRequest, SigningError> {
        let mut request = self.request(request_id)?;
        match request.status {
            SignatureStatus::Viewed => return Ok(request),
            SignatureStatus::Pending => {}
            status => {
                return Err(SigningError::RequestClosed {
                    request: request.id,
                    status,
                })
            }
        }

        let mut lease = self.lease(&request.lease_id)?;
        if !lease.status.accepts_signatures() {
            return Err(SigningError::LeaseClosed {
                lease: lease.id,
                status: lease.status,
            });
        }

        request.status = SignatureStatus::Viewed;
        request.viewed_at = Some(at);
        lease.audit.record(
            at,
            request.signer_email.as_str(),
            "signature.viewed",
            format!("{} opened by {}", request.id, request.role.label()),
        );
        self.signatures.update_signature_request(request.clone())?;
        self.leases.update_lease(lease)?;
        Ok(request)
    }

    /// Record a signature. The presented digest must match the lease document, and the landlord
    /// signs last.
    pub fn sign(
        &self,
        request_id: &SignatureRequestId,
        signed_name: &str,
        presented_digest: &str,
        at: DateTime<Utc>,
    ) -> Result<SigningOutcome, SigningError> {
        let mut request = self.request(request_id)?;
        if !request.status.is_open() {
            return Err(SigningError::RequestClosed {
                request: request.id,
                status: request.status,
            });
        }
        let mut lease = self.lease(&request.lease_id)?;
        if !lease.status.accepts_signatures() {
            return Err(SigningError::LeaseClosed {
                lease: lease.id,
                status: lease.status,
            });
        }

        let signed_name = signed_name.trim();
        if signed_name.is_empty() {
            return Err(SigningError::MissingSignature);
        }
        if !lease
            .document_digest
            .eq_ignore_ascii_case(presented_digest.trim())
        {
            return Err(SigningError::DocumentMismatch);
        }

        let siblings: Vec<SignatureRequest> = self
            .signatures
            .signature_requests_for_lease(&lease.id)?
            .into_iter()
            .filter(|other| other.id != request.id)
            .collect();
        let tenants_pending = siblings
            .iter()
            .any(|other| other.role.is_tenant() && other.status != SignatureStatus::Signed);
        if !request.role.is_tenant() && tenants_pending {
            return Err(SigningError::CountersignatureTooEarly);
        }

        request.status = SignatureStatus::Signed;
        request.signed_at = Some(at);
        request.signed_name = Some(signed_name.to_string());
        lease.audit.record(
            at,
            request.signer_email.as_str(),
            "signature.signed",
            format!(
                "{} signed by {} as {}",
                request.id,
                request.role.label(),
                signed_name
            ),
        );

        let everyone_signed = siblings
            .iter()
            .all(|other| other.status == SignatureStatus::Signed);
        if everyone_signed {
            lease.transition(
                LeaseStatus::Executed,
                &request.signer_email,
                "all parties signed",
                at,
            )?;
        } else if lease.status == LeaseStatus::AwaitingSignatures {
            let collected = siblings
                .iter()
                .filter(|other| other.status == SignatureStatus::Signed)
                .count()
                + 1;
            lease.transition(
                LeaseStatus::PartiallySigned,
                &request.signer_email,
                format!("{collected} of {} signatures collected", siblings.len() + 1),
                at,
            )?;
        }

        self.signatures.update_signature_request(request.clone())?;
        self.leases.update_lease(lease.clone())?;

        let premises = self.premises(&lease)?;
        if everyone_signed {
            self.portfolio
                .update_unit_status(&lease.unit_id, UnitStatus::Occupied)?;
            for party in siblings.iter().chain(std::iter::once(&request)) {
                self.notifier.deliver(&templates::lease_executed(
                    &party.signer_email,
                    &party.signer_name,
                    &premises,
                    lease.start_date,
                ));
            }
            info!(lease_id = %lease.id, unit_id = %lease.unit_id, "lease executed");
        } else if request.role.is_tenant() && !tenants_pending {
            if let Some(landlord) = siblings.iter().find(|other| !other.role.is_tenant()) {
                self.notifier.deliver(&templates::countersignature_requested(
                    &landlord.signer_email,
                    &landlord.signer_name,
                    &premises,
                    &self.config.signing_link(landlord.id.as_str()),
                ));
            }
        }

        Ok(SigningOutcome {
            request,
            lease_status: lease.status,
        })
    }

    /// A signer refuses: the lease is declined, the other requests are voided and the unit is
    /// released.
    pub fn decline(
        &self,
        request_id: &SignatureRequestId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<LeaseAgreement, SigningError> {
        let mut request = self.request(request_id)?;
        if !request.status.is_open() {
            return Err(SigningError::RequestClosed {
                request: request.id,
                status: request.status,
            });
        }
        let mut lease = self.lease(&request.lease_id)?;
        let reason = match reason.trim() {
            "" => "no reason given",
            reason => reason,
        };

        lease.transition(
            LeaseStatus::Declined,
            &request.signer_email,
            format!("{} declined: {}", request.id, reason),
            at,
        )?;
        request.status = SignatureStatus::Declined;
        request.decline_reason = Some(reason.to_string());
        self.signatures.update_signature_request(request.clone())?;
        self.close_open_requests(&lease.id, Some(&request.id))?;
        self.leases.update_lease(lease.clone())?;
        self.release_unit(&lease)?;

        let premises = self.premises(&lease)?;
        if let Some(landlord) = self.portfolio.landlord(&lease.landlord_id)? {
            self.notifier.deliver(&templates::lease_declined(
                &landlord.email,
                landlord.display_name(),
                &premises,
                &request.signer_name,
                reason,
            ));
        }
        info!(lease_id = %lease.id, request_id = %request.id, "lease declined");
        Ok(lease)
    }

    /// Landlord withdraws a lease that has not been executed.
    pub fn void(
        &self,
        lease_id: &LeaseId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<LeaseAgreement, SigningError> {
        let mut lease = self.lease(lease_id)?;
        let landlord = self
            .portfolio
            .landlord(&lease.landlord_id)?
            .ok_or_else(|| SigningError::PartyNotFound(lease.landlord_id.to_string()))?;
        let reason = match reason.trim() {
            "" => "voided by landlord",
            reason => reason,
        };

        lease.transition(LeaseStatus::Voided, &landlord.email, reason, at)?;
        let closed = self.close_open_requests(&lease.id, None)?;
        self.leases.update_lease(lease.clone())?;
        self.release_unit(&lease)?;

        let premises = self.premises(&lease)?;
        for request in closed.iter().filter(|request| request.role.is_tenant()) {
            self.notifier.deliver(&templates::lease_voided(
                &request.signer_email,
                &request.signer_name,
                &premises,
                reason,
            ));
        }
        info!(lease_id = %lease.id, "lease voided");
        Ok(lease)
    }
}
