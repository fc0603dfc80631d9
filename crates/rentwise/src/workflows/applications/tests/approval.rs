use chrono::{Duration, NaiveDate};

use super::common::*;
use crate::money::Cents;
use crate::portfolio::{PortfolioRepository, UnitStatus};
use crate::workflows::applications::{ApplicationError, ApplicationStatus, ApprovalRequest};
use crate::workflows::leasing::agreement::{LeaseRepository, LeaseStatus};
use crate::workflows::leasing::builder::LeaseBuildError;
use crate::workflows::leasing::document::DocumentError;
use crate::workflows::leasing::jurisdiction::JurisdictionError;
use crate::workflows::leasing::signatures::SignatureStatus;

fn unit_status(world: &World) -> UnitStatus {
    world
        .store
        .unit(&world.unit.id)
        .expect("lookup")
        .expect("unit")
        .status
}

#[test]
fn approval_generates_lease_and_reserves_unit() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    assert_eq!(application.status, ApplicationStatus::Pending);

    let approved_at = submitted_at() + Duration::days(1);
    let outcome = world
        .service
        .approve(&application.id, ApprovalRequest::default(), approved_at)
        .expect("approved");

    assert_eq!(outcome.application.status, ApplicationStatus::Approved);
    assert_eq!(outcome.application.lease_id, Some(outcome.lease.id.clone()));
    assert_eq!(outcome.lease.status, LeaseStatus::AwaitingSignatures);
    assert_eq!(outcome.lease.monthly_rent, Cents::from_dollars(1_500));
    assert_eq!(outcome.lease.security_deposit, Cents::from_dollars(1_500));
    assert_eq!(
        outcome.lease.end_date,
        NaiveDate::from_ymd_opt(2025, 6, 30)
    );
    assert_eq!(outcome.lease.tenant_ids.len(), 2);
    assert!(outcome.lease.addendum_document_id.is_none());
    assert_eq!(outcome.signature_requests.len(), 3);
    assert_eq!(unit_status(&world), UnitStatus::Reserved);
    assert_eq!(world.objects.len(), 1);

    let tags: Vec<&str> = world
        .mailer
        .sent_to("avery@example.com")
        .iter()
        .map(|message| message.tag)
        .collect();
    assert_eq!(
        tags,
        vec!["lease.signature_requested", "application.approved"]
    );
    assert_eq!(
        world.mailer.sent_to("dana@example.com")[0].tag,
        "application.approved_landlord"
    );
}

#[test]
fn approving_twice_returns_the_original_lease() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let first = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");
    let second = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved again");

    assert_eq!(first.lease.id, second.lease.id);
    assert_eq!(second.signature_requests.len(), 3);
    assert_eq!(world.objects.len(), 1);
    assert_eq!(
        world
            .store
            .leases_for_landlord(&world.property.landlord_id)
            .expect("leases")
            .len(),
        1
    );
}

#[test]
fn uploaded_default_lease_gets_a_disclosure_addendum() {
    let world = world();
    let template = world
        .documents
        .register_upload(
            &world.property.landlord_id,
            "Ortiz standard lease",
            b"%PDF-1.7 landlord lease",
            "application/pdf",
            submitted_at(),
        )
        .expect("uploaded");
    world
        .portfolio
        .assign_default_lease(&world.property.id, &template.id)
        .expect("assigned");

    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let outcome = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");

    assert_eq!(outcome.lease.document_id, template.id);
    assert_eq!(outcome.lease.document_digest, template.digest);
    let addendum_id = outcome
        .lease
        .addendum_document_id
        .clone()
        .expect("addendum generated");
    let addendum = world
        .documents
        .document(&addendum_id)
        .expect("lookup")
        .expect("addendum stored");
    assert!(addendum.title.starts_with("Lease Disclosure Addendum"));
    assert_eq!(world.objects.len(), 2);
}

#[test]
fn competing_application_cannot_be_approved_once_unit_is_reserved() {
    let world = world();
    let first = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("first");
    let mut other = submission(&world);
    other.applicant = world.co_applicant.id.clone();
    other.co_applicants.clear();
    let second = world
        .service
        .submit(other, submitted_at() + Duration::hours(1))
        .expect("second");

    assert_eq!(
        world
            .service
            .pending_for_unit(&world.unit.id)
            .expect("pending")
            .len(),
        2
    );

    world
        .service
        .approve(&first.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");
    assert!(matches!(
        world
            .service
            .approve(&second.id, ApprovalRequest::default(), submitted_at()),
        Err(ApplicationError::UnitUnavailable {
            status: UnitStatus::Reserved,
            ..
        })
    ));
    assert_eq!(
        world.service.get(&second.id).expect("second").status,
        ApplicationStatus::Pending
    );
}

#[test]
fn deposit_over_state_cap_blocks_approval() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let request = ApprovalRequest {
        security_deposit: Some(Cents::from_dollars(3_000)),
        ..ApprovalRequest::default()
    };

    match world.service.approve(&application.id, request, submitted_at()) {
        Err(ApplicationError::Document(DocumentError::Build(LeaseBuildError::Jurisdiction(
            JurisdictionError::DepositCapExceeded { max, .. },
        )))) => assert_eq!(max, Cents::from_dollars(2_250)),
        other => panic!("expected deposit cap error, got {other:?}"),
    }
    assert_eq!(unit_status(&world), UnitStatus::Vacant);
    assert!(world.objects.is_empty());
    assert_eq!(
        world.service.get(&application.id).expect("app").status,
        ApplicationStatus::Pending
    );
}

#[test]
fn rejection_sends_adverse_action_notice() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");

    assert!(matches!(
        world.service.reject(&application.id, "  ", submitted_at()),
        Err(ApplicationError::Validation(_))
    ));
    let rejected = world
        .service
        .reject(&application.id, "insufficient verified income", submitted_at())
        .expect("rejected");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);

    let notice = &world.mailer.sent_to("avery@example.com")[0];
    assert_eq!(notice.tag, "application.rejected");
    assert!(notice.text_body.contains("insufficient verified income"));

    assert!(matches!(
        world
            .service
            .approve(&application.id, ApprovalRequest::default(), submitted_at()),
        Err(ApplicationError::InvalidTransition {
            from: ApplicationStatus::Rejected,
            to: ApplicationStatus::Approved,
            ..
        })
    ));
}

#[test]
fn withdrawn_application_is_closed() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    world
        .service
        .withdraw(&application.id, submitted_at())
        .expect("withdrawn");

    assert!(world
        .service
        .pending_for_unit(&world.unit.id)
        .expect("pending")
        .is_empty());
    assert!(matches!(
        world.service.reject(&application.id, "late", submitted_at()),
        Err(ApplicationError::InvalidTransition { .. })
    ));
}

#[test]
fn submission_requires_vacant_unit_and_known_tenants() {
    let world = world();
    world
        .portfolio
        .set_availability(&world.unit.id, false)
        .expect("offline");
    assert!(matches!(
        world.service.submit(submission(&world), submitted_at()),
        Err(ApplicationError::UnitUnavailable {
            status: UnitStatus::Offline,
            ..
        })
    ));

    world
        .portfolio
        .set_availability(&world.unit.id, true)
        .expect("vacant");
    let mut unknown = submission(&world);
    unknown.co_applicants = vec![crate::portfolio::TenantId("ten-missing".to_string())];
    assert!(matches!(
        world.service.submit(unknown, submitted_at()),
        Err(ApplicationError::TenantNotFound(_))
    ));

    let mut broke = submission(&world);
    broke.monthly_income = Cents::ZERO;
    assert!(matches!(
        world.service.submit(broke, submitted_at()),
        Err(ApplicationError::Validation(_))
    ));
}

#[test]
fn signing_the_approved_lease_occupies_the_unit() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let outcome = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");

    let digest = outcome.lease.document_digest.clone();
    let (tenants, landlord): (Vec<_>, Vec<_>) = outcome
        .signature_requests
        .iter()
        .partition(|request| request.role.is_tenant());
    for request in tenants {
        world
            .signing
            .sign(&request.id, &request.signer_name, &digest, submitted_at())
            .expect("tenant signs");
    }
    let done = world
        .signing
        .sign(&landlord[0].id, "Dana Ortiz", &digest, submitted_at())
        .expect("landlord countersigns");

    assert_eq!(done.lease_status, LeaseStatus::Executed);
    assert_eq!(done.request.status, SignatureStatus::Signed);
    assert_eq!(unit_status(&world), UnitStatus::Occupied);
    let lease = world.signing.lease(&outcome.lease.id).expect("lease");
    assert!(lease.audit.verify().is_ok());
}

#[test]
fn declined_lease_releases_the_unit_but_keeps_approval() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let outcome = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");

    world
        .signing
        .decline(&outcome.signature_requests[0].id, "moving elsewhere", submitted_at())
        .expect("declined");
    assert_eq!(unit_status(&world), UnitStatus::Vacant);
    assert_eq!(
        world.service.get(&application.id).expect("app").status,
        ApplicationStatus::Approved
    );
}

#[test]
fn mail_outage_does_not_block_approval() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    world.mailer.set_failing(true);

    let outcome = world
        .service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("approved");
    assert_eq!(outcome.application.status, ApplicationStatus::Approved);
    assert_eq!(world.service.notification_failures(), 3);
    assert_eq!(world.signing.notification_failures(), 2);
}
