use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::{
    Landlord, PortfolioRepository, Property, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use crate::store::RepositoryError;
use crate::workflows::leasing::agreement::{
    LeaseAgreement, LeaseId, LeaseRepository, NewLeaseAgreement,
};
use crate::workflows::leasing::builder::LeaseTerms;
use crate::workflows::leasing::document::{DocumentError, DocumentKind, LeaseDocumentService};
use crate::workflows::leasing::signatures::{SignatureRequest, SigningError, SigningService};

use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationSubmission, ApprovalRequest, RentalApplication,
};
use super::repository::ApplicationRepository;
use super::screening::{Screener, ScreeningCriteria, ScreeningInput};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Result of approving an application: the lease that was created and sent for signature.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub application: RentalApplication,
    pub lease: LeaseAgreement,
    pub signature_requests: Vec<SignatureRequest>,
}

/// Records loaded for an approval.
struct ApprovalParties {
    unit: Unit,
    property: Property,
    landlord: Landlord,
    tenants: Vec<Tenant>,
}

/// Intake, screening and the approval pipeline that turns an application into a lease out for
/// signature.
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    portfolio: Arc<dyn PortfolioRepository>,
    leases: Arc<dyn LeaseRepository>,
    documents: Arc<LeaseDocumentService>,
    signing: Arc<SigningService>,
    notifier: Notifier,
    screener: Screener,
    // Held from the vacancy check until the unit is reserved and the application recorded.
    approval_lock: Mutex<()>,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        portfolio: Arc<dyn PortfolioRepository>,
        leases: Arc<dyn LeaseRepository>,
        documents: Arc<LeaseDocumentService>,
        signing: Arc<SigningService>,
        mailer: Arc<dyn Mailer>,
        criteria: ScreeningCriteria,
    ) -> Self {
        Self {
            applications,
            portfolio,
            leases,
            documents,
            signing,
            notifier: Notifier::new(mailer),
            screener: Screener::new(criteria),
            approval_lock: Mutex::new(()),
        }
    }

    fn lock_approvals(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.approval_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("approval lock poisoned".to_string()))
    }

    pub fn notification_failures(&self) -> u64 {
        self.notifier.failures()
    }

    fn unit(&self, id: &UnitId) -> Result<Unit, ApplicationError> {
        self.portfolio
            .unit(id)?
            .ok_or_else(|| ApplicationError::UnitNotFound(id.clone()))
    }

    fn tenant(&self, id: &TenantId) -> Result<Tenant, ApplicationError> {
        self.portfolio
            .tenant(id)?
            .ok_or_else(|| ApplicationError::TenantNotFound(id.clone()))
    }

    /// Submit a new application for a vacant unit.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
        at: DateTime<Utc>,
    ) -> Result<RentalApplication, ApplicationError> {
        let unit = self.unit(&submission.unit_id)?;
        if unit.status != UnitStatus::Vacant {
            return Err(ApplicationError::UnitUnavailable {
                unit: unit.id,
                status: unit.status,
            });
        }
        if !submission.monthly_income.is_positive() {
            return Err(ApplicationError::Validation(
                "monthly income must be greater than zero".to_string(),
            ));
        }
        if submission.co_applicants.contains(&submission.applicant) {
            return Err(ApplicationError::Validation(
                "the applicant cannot also be listed as a co-applicant".to_string(),
            ));
        }
        self.tenant(&submission.applicant)?;
        for co_applicant in &submission.co_applicants {
            self.tenant(co_applicant)?;
        }

        let screening = self.screener.screen(&ScreeningInput {
            monthly_rent: unit.market_rent,
            monthly_income: submission.monthly_income,
            credit_score: submission.credit_score,
            prior_evictions: submission.prior_evictions,
        });

        let application = RentalApplication {
            id: next_application_id(),
            unit_id: unit.id,
            property_id: unit.property_id,
            applicant: submission.applicant,
            co_applicants: submission.co_applicants,
            desired_move_in: submission.desired_move_in,
            monthly_income: submission.monthly_income,
            credit_score: submission.credit_score,
            prior_evictions: submission.prior_evictions,
            status: ApplicationStatus::Pending,
            submitted_at: at,
            decided_at: None,
            decision_note: None,
            lease_id: None,
            screening,
        };
        let stored = self.applications.insert_application(application)?;
        info!(
            application_id = %stored.id,
            unit_id = %stored.unit_id,
            recommendation = %stored.screening.recommendation.summary(),
            "rental application submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<RentalApplication, ApplicationError> {
        self.applications
            .application(id)?
            .ok_or_else(|| ApplicationError::NotFound(id.clone()))
    }

    pub fn pending_for_unit(
        &self,
        unit: &UnitId,
    ) -> Result<Vec<RentalApplication>, ApplicationError> {
        let mut pending: Vec<RentalApplication> = self
            .applications
            .applications_for_unit(unit)?
            .into_iter()
            .filter(|application| application.status == ApplicationStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(pending)
    }

    fn require_pending(
        application: &RentalApplication,
        to: ApplicationStatus,
    ) -> Result<(), ApplicationError> {
        if application.status != ApplicationStatus::Pending {
            return Err(ApplicationError::InvalidTransition {
                id: application.id.clone(),
                from: application.status,
                to,
            });
        }
        Ok(())
    }

    fn load_parties(
        &self,
        application: &RentalApplication,
    ) -> Result<ApprovalParties, ApplicationError> {
        let unit = self.unit(&application.unit_id)?;
        let property = self
            .portfolio
            .property(&unit.property_id)?
            .ok_or_else(|| ApplicationError::PartyNotFound(unit.property_id.to_string()))?;
        let landlord = self
            .portfolio
            .landlord(&property.landlord_id)?
            .ok_or_else(|| ApplicationError::PartyNotFound(property.landlord_id.to_string()))?;
        let tenants = application
            .household()
            .iter()
            .map(|id| self.tenant(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ApprovalParties {
            unit,
            property,
            landlord,
            tenants,
        })
    }

    fn existing_outcome(
        &self,
        application: RentalApplication,
    ) -> Result<ApprovalOutcome, ApplicationError> {
        let lease_id = application.lease_id.clone().ok_or_else(|| {
            ApplicationError::PartyNotFound(format!("lease for {}", application.id))
        })?;
        let lease = self.signing.lease(&lease_id)?;
        let signature_requests = self.signing.requests_for_lease(&lease_id)?;
        Ok(ApprovalOutcome {
            application,
            lease,
            signature_requests,
        })
    }

    /// Approve an application: reserve the unit, generate the lease and send it for signature.
    /// Approving an already-approved application returns the original outcome.
    ///
    /// A failure after the unit is reserved voids any lease created so far and releases the unit.
    pub fn approve(
        &self,
        id: &ApplicationId,
        request: ApprovalRequest,
        at: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, ApplicationError> {
        let _guard = self.lock_approvals()?;
        let mut application = self.get(id)?;
        if application.status == ApplicationStatus::Approved {
            return self.existing_outcome(application);
        }
        Self::require_pending(&application, ApplicationStatus::Approved)?;

        let parties = self.load_parties(&application)?;
        if parties.unit.status != UnitStatus::Vacant {
            return Err(ApplicationError::UnitUnavailable {
                unit: parties.unit.id,
                status: parties.unit.status,
            });
        }
        self.portfolio
            .update_unit_status(&parties.unit.id, UnitStatus::Reserved)?;

        let note = request.note.clone().filter(|note| !note.trim().is_empty());
        let (lease, signature_requests) =
            match self.issue_lease(&application, &parties, request, at) {
                Ok(issued) => issued,
                Err((lease_id, err)) => {
                    self.roll_back(&parties.unit.id, lease_id.as_ref(), at);
                    return Err(err);
                }
            };

        application.status = ApplicationStatus::Approved;
        application.decided_at = Some(at);
        application.decision_note = note;
        application.lease_id = Some(lease.id.clone());
        if let Err(err) = self.applications.update_application(application.clone()) {
            self.roll_back(&parties.unit.id, Some(&lease.id), at);
            return Err(err.into());
        }

        let premises = format!("Unit {} at {}", parties.unit.label, parties.property.name);
        for tenant in &parties.tenants {
            self.notifier.deliver(&templates::application_approved(
                &tenant.email,
                &tenant.full_name,
                &premises,
                lease.start_date,
            ));
        }
        let applicant_name = parties
            .tenants
            .first()
            .map(|tenant| tenant.full_name.as_str())
            .unwrap_or_default();
        self.notifier.deliver(&templates::application_approved_landlord(
            &parties.landlord.email,
            parties.landlord.display_name(),
            applicant_name,
            &premises,
        ));

        info!(
            application_id = %application.id,
            lease_id = %lease.id,
            unit_id = %parties.unit.id,
            "application approved"
        );
        Ok(ApprovalOutcome {
            application,
            lease,
            signature_requests,
        })
    }

    /// Generate the lease document, store the agreement and send it for signature.
    ///
    /// On failure the id of any lease already stored is returned with the error.
    fn issue_lease(
        &self,
        application: &RentalApplication,
        parties: &ApprovalParties,
        request: ApprovalRequest,
        at: DateTime<Utc>,
    ) -> Result<(LeaseAgreement, Vec<SignatureRequest>), (Option<LeaseId>, ApplicationError)> {
        let monthly_rent = request.monthly_rent.unwrap_or(parties.unit.market_rent);
        let start_date = request.start_date.unwrap_or(application.desired_move_in);
        let end_date = if request.month_to_month {
            None
        } else {
            match request.end_date {
                Some(end) => Some(end),
                None => start_date
                    .checked_add_months(Months::new(12))
                    .and_then(|date| date.pred_opt()),
            }
        };
        let terms = LeaseTerms {
            landlord: parties.landlord.clone(),
            property: parties.property.clone(),
            unit: parties.unit.clone(),
            tenants: parties.tenants.clone(),
            start_date,
            end_date,
            monthly_rent,
            security_deposit: request.security_deposit.unwrap_or(monthly_rent),
            rent_due_day: request.rent_due_day.unwrap_or(1),
            late_fee: request.late_fee,
            pets_allowed: request.pets_allowed,
            utilities_included: request.utilities_included,
            additional_terms: request.additional_terms,
        };

        let uploaded_template = match &parties.property.default_lease_document {
            Some(document_id) => self
                .documents
                .document(document_id)
                .map_err(before_lease)?
                .filter(|document| document.kind == DocumentKind::Uploaded),
            None => None,
        };
        let (document_id, document_digest, addendum_document_id) = match uploaded_template {
            Some(template) => {
                let addendum = self
                    .documents
                    .generate_addendum(&terms, at)
                    .map_err(before_lease)?;
                (template.id, template.digest, Some(addendum.document.id))
            }
            None => {
                let generated = self
                    .documents
                    .generate(&terms, at)
                    .map_err(before_lease)?;
                (generated.document.id, generated.document.digest, None)
            }
        };

        let lease = LeaseAgreement::create(
            NewLeaseAgreement {
                application_id: Some(application.id.clone()),
                landlord_id: parties.landlord.id.clone(),
                property_id: parties.property.id.clone(),
                unit_id: parties.unit.id.clone(),
                tenant_ids: application.household(),
                document_id,
                document_digest,
                addendum_document_id,
                monthly_rent: terms.monthly_rent,
                security_deposit: terms.security_deposit,
                rent_due_day: terms.rent_due_day,
                late_fee: terms.late_fee,
                start_date: terms.start_date,
                end_date: terms.end_date,
            },
            &parties.landlord.email,
            at,
        );
        let lease = self
            .leases
            .insert_lease(lease)
            .map_err(before_lease)?;
        let stored = |err: ApplicationError| (Some(lease.id.clone()), err);
        let signature_requests = self
            .signing
            .send_for_signature(&lease.id, at)
            .map_err(|err| stored(err.into()))?;
        let lease = self
            .signing
            .lease(&lease.id)
            .map_err(|err| stored(err.into()))?;
        Ok((lease, signature_requests))
    }

    /// Undo a partial approval. Failures here are logged; the original error is what the caller
    /// sees.
    fn roll_back(&self, unit: &UnitId, lease: Option<&LeaseId>, at: DateTime<Utc>) {
        if let Some(lease_id) = lease {
            match self
                .signing
                .void(lease_id, "approval could not be completed", at)
            {
                Ok(_) => return,
                Err(err) => warn!(lease_id = %lease_id, error = %err, "could not void lease"),
            }
        }
        if let Err(err) = self.portfolio.update_unit_status(unit, UnitStatus::Vacant) {
            warn!(unit_id = %unit, error = %err, "could not release reserved unit");
        }
    }

    /// Reject a pending application and send the adverse-action notice.
    pub fn reject(
        &self,
        id: &ApplicationId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<RentalApplication, ApplicationError> {
        let mut application = self.get(id)?;
        Self::require_pending(&application, ApplicationStatus::Rejected)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApplicationError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }

        let applicant = self.tenant(&application.applicant)?;
        let unit = self.unit(&application.unit_id)?;
        application.status = ApplicationStatus::Rejected;
        application.decided_at = Some(at);
        application.decision_note = Some(reason.to_string());
        self.applications.update_application(application.clone())?;

        self.notifier.deliver(&templates::application_rejected(
            &applicant.email,
            &applicant.full_name,
            &format!("Unit {}", unit.label),
            reason,
        ));
        info!(application_id = %application.id, "application rejected");
        Ok(application)
    }

    pub fn withdraw(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<RentalApplication, ApplicationError> {
        let mut application = self.get(id)?;
        Self::require_pending(&application, ApplicationStatus::Withdrawn)?;
        application.status = ApplicationStatus::Withdrawn;
        application.decided_at = Some(at);
        self.applications.update_application(application.clone())?;
        info!(application_id = %application.id, "application withdrawn");
        Ok(application)
    }
}

/// Error from a step that ran before any lease was stored.
fn before_lease(err: impl Into<ApplicationError>) -> (Option<LeaseId>, ApplicationError) {
    (None, err.into())
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),
    #[error("unit {unit} is {} and cannot take a new lease", status.label())]
    UnitUnavailable { unit: UnitId, status: UnitStatus },
    #[error("application {id} cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition {
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("{0}")]
    Validation(String),
    #[error("record {0} referenced by the application is missing")]
    PartyNotFound(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
