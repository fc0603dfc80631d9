use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::LeasingConfig;
use crate::money::Cents;
use crate::notifications::InMemoryMailer;
use crate::portfolio::{
    Address, NewLandlord, NewProperty, NewTenant, NewUnit, PortfolioService, Property, Tenant,
    Unit,
};
use crate::store::InMemoryStore;
use crate::workflows::applications::{
    ApplicationService, ApplicationSubmission, ScreeningCriteria,
};
use crate::workflows::leasing::document::{
    HtmlDocumentRenderer, InMemoryDocumentStore, LeaseDocumentService,
};
use crate::workflows::leasing::jurisdiction::ClauseRegistry;
use crate::workflows::leasing::signatures::SigningService;

pub(super) struct World {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) mailer: InMemoryMailer,
    pub(super) objects: InMemoryDocumentStore,
    pub(super) portfolio: Arc<PortfolioService>,
    pub(super) documents: Arc<LeaseDocumentService>,
    pub(super) signing: Arc<SigningService>,
    pub(super) service: Arc<ApplicationService>,
    pub(super) property: Property,
    pub(super) unit: Unit,
    pub(super) applicant: Tenant,
    pub(super) co_applicant: Tenant,
}

pub(super) fn submitted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 15, 0, 0).unwrap()
}

pub(super) fn criteria() -> ScreeningCriteria {
    ScreeningCriteria {
        max_rent_to_income: 0.33,
        min_credit_score: Some(620),
        max_evictions: 0,
    }
}

pub(super) fn world() -> World {
    let store = Arc::new(InMemoryStore::default());
    let mailer = InMemoryMailer::default();
    let objects = InMemoryDocumentStore::default();
    let portfolio = Arc::new(PortfolioService::new(store.clone(), store.clone()));
    let documents = Arc::new(LeaseDocumentService::new(
        Arc::new(ClauseRegistry::standard()),
        Arc::new(HtmlDocumentRenderer),
        Arc::new(objects.clone()),
        store.clone(),
    ));
    let signing = Arc::new(SigningService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(mailer.clone()),
        LeasingConfig::default(),
    ));
    let service = Arc::new(ApplicationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        documents.clone(),
        signing.clone(),
        Arc::new(mailer.clone()),
        criteria(),
    ));

    let landlord = portfolio
        .register_landlord(NewLandlord {
            name: "Dana Ortiz".to_string(),
            email: "dana@example.com".to_string(),
            company_name: Some("Ortiz Rentals LLC".to_string()),
        })
        .expect("landlord");
    let property = portfolio
        .add_property(NewProperty {
            landlord_id: landlord.id,
            name: "Maple Court".to_string(),
            address: Address {
                line1: "14 Maple Ct".to_string(),
                line2: None,
                city: "Hoboken".to_string(),
                state: "NJ".parse().expect("state"),
                postal_code: "07030".to_string(),
            },
            year_built: Some(1965),
            flood_zone: true,
            shared_utilities: false,
        })
        .expect("property");
    let unit = portfolio
        .add_unit(NewUnit {
            property_id: property.id.clone(),
            label: "2B".to_string(),
            bedrooms: 2,
            bathrooms: 1.0,
            market_rent: Cents::from_dollars(1_500),
        })
        .expect("unit");
    let applicant = portfolio
        .add_tenant(NewTenant {
            full_name: "Avery Chen".to_string(),
            email: "avery@example.com".to_string(),
            phone: None,
        })
        .expect("applicant");
    let co_applicant = portfolio
        .add_tenant(NewTenant {
            full_name: "Blake Rivera".to_string(),
            email: "blake@example.com".to_string(),
            phone: Some("555-0102".to_string()),
        })
        .expect("co-applicant");

    World {
        store,
        mailer,
        objects,
        portfolio,
        documents,
        signing,
        service,
        property,
        unit,
        applicant,
        co_applicant,
    }
}

pub(super) fn submission(world: &World) -> ApplicationSubmission {
    ApplicationSubmission {
        unit_id: world.unit.id.clone(),
        applicant: world.applicant.id.clone(),
        co_applicants: vec![world.co_applicant.id.clone()],
        desired_move_in: NaiveDate::from_ymd_opt(2024, 7, 1).expect("date"),
        monthly_income: Cents::from_dollars(6_000),
        credit_score: Some(705),
        prior_evictions: 0,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
