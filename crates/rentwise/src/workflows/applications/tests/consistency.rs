use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration as StdDuration;

use super::common::*;
use crate::notifications::InMemoryMailer;
use crate::portfolio::{PortfolioRepository, UnitId, UnitStatus};
use crate::store::{InMemoryStore, RepositoryError};
use crate::workflows::applications::{
    ApplicationError, ApplicationId, ApplicationRepository, ApplicationService, ApplicationStatus,
    ApprovalRequest, RentalApplication,
};
use crate::workflows::leasing::agreement::{LeaseRepository, LeaseStatus};
use crate::workflows::leasing::document::{
    DocumentStore, HtmlDocumentRenderer, InMemoryDocumentStore, LeaseDocumentService, StoreError,
};
use crate::workflows::leasing::jurisdiction::ClauseRegistry;

/// Object store that takes a while to accept each upload.
struct SlowDocuments(InMemoryDocumentStore);

impl DocumentStore for SlowDocuments {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
        thread::sleep(StdDuration::from_millis(200));
        self.0.put(key, bytes, content_type)
    }
}

/// Application table whose updates can be switched off.
struct FlakyApplications {
    store: Arc<InMemoryStore>,
    failing: AtomicBool,
}

impl ApplicationRepository for FlakyApplications {
    fn insert_application(
        &self,
        application: RentalApplication,
    ) -> Result<RentalApplication, RepositoryError> {
        self.store.insert_application(application)
    }

    fn update_application(&self, application: RentalApplication) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("applications table offline".to_string()));
        }
        self.store.update_application(application)
    }

    fn application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<RentalApplication>, RepositoryError> {
        self.store.application(id)
    }

    fn applications_for_unit(
        &self,
        unit: &UnitId,
    ) -> Result<Vec<RentalApplication>, RepositoryError> {
        self.store.applications_for_unit(unit)
    }
}

fn service_over(
    world: &World,
    applications: Arc<dyn ApplicationRepository>,
    objects: Arc<dyn DocumentStore>,
) -> Arc<ApplicationService> {
    let documents = Arc::new(LeaseDocumentService::new(
        Arc::new(ClauseRegistry::standard()),
        Arc::new(HtmlDocumentRenderer),
        objects,
        world.store.clone(),
    ));
    Arc::new(ApplicationService::new(
        applications,
        world.store.clone(),
        world.store.clone(),
        documents,
        world.signing.clone(),
        Arc::new(InMemoryMailer::default()),
        criteria(),
    ))
}

fn unit_status(world: &World) -> UnitStatus {
    world
        .store
        .unit(&world.unit.id)
        .expect("lookup")
        .expect("unit")
        .status
}

#[test]
fn competing_approvals_racing_for_one_unit_create_a_single_lease() {
    let world = world();
    let first = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("first submitted");
    let mut solo = submission(&world);
    solo.applicant = world.co_applicant.id.clone();
    solo.co_applicants.clear();
    let second = world
        .service
        .submit(solo, submitted_at())
        .expect("second submitted");

    let service = service_over(
        &world,
        world.store.clone(),
        Arc::new(SlowDocuments(InMemoryDocumentStore::default())),
    );
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [first.id.clone(), second.id.clone()]
        .into_iter()
        .map(|id| {
            let service = service.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                service.approve(&id, ApprovalRequest::default(), submitted_at())
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("approval thread"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().any(|result| matches!(
        result,
        Err(ApplicationError::UnitUnavailable {
            status: UnitStatus::Reserved,
            ..
        })
    )));
    let out_for_signature = world
        .store
        .leases_with_status(LeaseStatus::AwaitingSignatures)
        .expect("leases");
    assert_eq!(out_for_signature.len(), 1);
    assert_eq!(unit_status(&world), UnitStatus::Reserved);
}

#[test]
fn the_same_application_approved_twice_at_once_yields_one_lease() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let service = service_over(
        &world,
        world.store.clone(),
        Arc::new(SlowDocuments(InMemoryDocumentStore::default())),
    );

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = service.clone();
            let barrier = barrier.clone();
            let id = application.id.clone();
            thread::spawn(move || {
                barrier.wait();
                service.approve(&id, ApprovalRequest::default(), submitted_at())
            })
        })
        .collect();
    let lease_ids: Vec<_> = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .expect("approval thread")
                .expect("approved")
                .lease
                .id
        })
        .collect();

    assert_eq!(lease_ids[0], lease_ids[1]);
    assert_eq!(
        world
            .store
            .leases_with_status(LeaseStatus::AwaitingSignatures)
            .expect("leases")
            .len(),
        1
    );
}

#[test]
fn failed_approval_voids_the_lease_and_releases_the_unit() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let applications = Arc::new(FlakyApplications {
        store: world.store.clone(),
        failing: AtomicBool::new(true),
    });
    let service = service_over(
        &world,
        applications.clone(),
        Arc::new(InMemoryDocumentStore::default()),
    );

    match service.approve(&application.id, ApprovalRequest::default(), submitted_at()) {
        Err(ApplicationError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected the application write to fail, got {other:?}"),
    }
    assert_eq!(unit_status(&world), UnitStatus::Vacant);
    assert_eq!(
        world.service.get(&application.id).expect("app").status,
        ApplicationStatus::Pending
    );
    let voided = world
        .store
        .leases_with_status(LeaseStatus::Voided)
        .expect("leases");
    assert_eq!(voided.len(), 1);
    assert!(world
        .store
        .leases_with_status(LeaseStatus::AwaitingSignatures)
        .expect("leases")
        .is_empty());
    assert!(world
        .mailer
        .sent_to("avery@example.com")
        .iter()
        .any(|message| message.tag == "lease.voided"));

    applications.failing.store(false, Ordering::Relaxed);
    let outcome = service
        .approve(&application.id, ApprovalRequest::default(), submitted_at())
        .expect("retry succeeds");
    assert_ne!(outcome.lease.id, voided[0].id);
    assert_eq!(outcome.application.status, ApplicationStatus::Approved);
    assert_eq!(unit_status(&world), UnitStatus::Reserved);
}
