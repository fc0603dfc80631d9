//! Contractor bookings with deposits and refunds, and maintenance tickets that hire them.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use rentwise::money::Cents;
    use rentwise::notifications::InMemoryMailer;
    use rentwise::portfolio::{
        Address, Landlord, NewLandlord, NewProperty, NewUnit, PortfolioService, Property, Unit,
    };
    use rentwise::store::InMemoryStore;
    use rentwise::workflows::maintenance::MaintenanceService;
    use rentwise::workflows::marketplace::{
        BookingService, CancellationPolicy, Contractor, DepositPolicy, InMemoryPaymentGateway,
        NewContractor,
    };

    pub struct Harness {
        pub mailer: InMemoryMailer,
        pub payments: InMemoryPaymentGateway,
        pub bookings: Arc<BookingService>,
        pub maintenance: Arc<MaintenanceService>,
        pub landlord: Landlord,
        pub property: Property,
        pub unit: Unit,
    }

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, hour, 0, 0).unwrap()
    }

    pub fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let mailer = InMemoryMailer::default();
        let payments = InMemoryPaymentGateway::default();

        let portfolio = PortfolioService::new(store.clone(), store.clone());
        let bookings = Arc::new(BookingService::new(
            store.clone(),
            Arc::new(payments.clone()),
            Arc::new(mailer.clone()),
        ));
        let maintenance = Arc::new(MaintenanceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(mailer.clone()),
        ));

        let landlord = portfolio
            .register_landlord(NewLandlord {
                name: "Sam Reyes".to_string(),
                email: "sam@example.com".to_string(),
                company_name: None,
            })
            .unwrap();
        let property = portfolio
            .add_property(NewProperty {
                landlord_id: landlord.id.clone(),
                name: "Harbor Flats".to_string(),
                address: Address {
                    line1: "9 Wharf St".to_string(),
                    line2: None,
                    city: "Portland".to_string(),
                    state: "OR".parse().unwrap(),
                    postal_code: "97201".to_string(),
                },
                year_built: Some(1998),
                flood_zone: false,
                shared_utilities: false,
            })
            .unwrap();
        let unit = portfolio
            .add_unit(NewUnit {
                property_id: property.id.clone(),
                label: "4".to_string(),
                bedrooms: 1,
                bathrooms: 1.0,
                market_rent: Cents::from_dollars(1_350),
            })
            .unwrap();

        Harness {
            mailer,
            payments,
            bookings,
            maintenance,
            landlord,
            property,
            unit,
        }
    }

    pub fn plumber(h: &Harness, policy: CancellationPolicy) -> Contractor {
        let contractor = h
            .bookings
            .register_contractor(NewContractor {
                name: "Reliable Plumbing".to_string(),
                email: "dispatch@reliable.example".to_string(),
                trade: "plumbing".to_string(),
                hourly_rate: Cents::from_dollars(95),
                instant_booking: true,
                deposit_policy: DepositPolicy::PercentOfEstimate(25),
                cancellation_policy: policy,
            })
            .unwrap();
        h.bookings
            .add_availability(&contractor.id, at(1, 0), at(31, 0))
            .unwrap();
        contractor
    }
}

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use common::{at, harness, plumber};
use rentwise::money::Cents;
use rentwise::workflows::maintenance::{
    maintenance_router, MaintenanceError, NewTicket, Priority, TicketStatus,
};
use rentwise::workflows::marketplace::{
    marketplace_router, BookingError, BookingRequest, BookingStatus, CancellationPolicy,
    CancelledBy, ContractorId, IntentStatus,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn request_for(h: &common::Harness, contractor: &str, day: u32) -> BookingRequest {
    BookingRequest {
        contractor_id: ContractorId(contractor.to_string()),
        landlord_id: h.landlord.id.clone(),
        property_id: h.property.id.clone(),
        customer_email: h.landlord.email.clone(),
        starts_at: at(day, 13),
        ends_at: at(day, 15),
    }
}

#[test]
fn deposit_is_captured_and_partially_refunded_on_late_cancellation() {
    let h = harness();
    let contractor = plumber(&h, CancellationPolicy::Moderate);

    let booking = h
        .bookings
        .book_instant(request_for(&h, contractor.id.as_str(), 12), at(5, 9))
        .expect("slot is free");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.estimate, Cents::from_dollars(190));
    assert_eq!(booking.deposit, Cents(4_750));
    let intent_id = booking.payment_intent_id.clone().expect("deposit charged");
    assert_eq!(
        h.payments.intent(&intent_id).expect("intent stored").status,
        IntentStatus::Captured
    );

    match h
        .bookings
        .book_instant(request_for(&h, contractor.id.as_str(), 12), at(5, 10))
    {
        Err(BookingError::SlotTaken(existing)) => assert_eq!(existing, booking.id),
        other => panic!("expected the slot to be taken, got {other:?}"),
    }

    let cancelled = h
        .bookings
        .cancel(&booking.id, CancelledBy::Customer, at(10, 13))
        .expect("confirmed booking cancels");
    let refund = cancelled.refund.expect("refund recorded");
    assert_eq!(refund.percent, 50);
    assert_eq!(refund.amount, Cents(2_375));
    let intent = h.payments.intent(&intent_id).expect("intent stored");
    assert_eq!(intent.refunded, Cents(2_375));
    assert_eq!(intent.status, IntentStatus::PartiallyRefunded);
    assert!(h
        .mailer
        .sent_to("sam@example.com")
        .iter()
        .any(|message| message.tag == "booking.cancelled"));

    let rebooked = h
        .bookings
        .book_instant(request_for(&h, contractor.id.as_str(), 12), at(10, 14))
        .expect("cancelled slot is free again");
    let cancelled = h
        .bookings
        .cancel(&rebooked.id, CancelledBy::Contractor, at(12, 12))
        .expect("contractor cancels");
    assert_eq!(cancelled.refund.map(|refund| refund.percent), Some(100));
}

#[test]
fn ticket_runs_from_intake_to_close_with_a_booked_visit() {
    let h = harness();
    let contractor = plumber(&h, CancellationPolicy::Flexible);
    let opened_at = at(5, 9);

    let ticket = h
        .maintenance
        .open(
            NewTicket {
                property_id: h.property.id.clone(),
                unit_id: Some(h.unit.id.clone()),
                title: "Kitchen sink leaking".to_string(),
                description: "Water under the cabinet".to_string(),
                priority: Priority::High,
            },
            opened_at,
        )
        .expect("ticket opens");
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.due_by, opened_at + Duration::hours(72));
    assert!(h.maintenance.overdue(opened_at + Duration::hours(71)).unwrap().is_empty());

    let booking = h
        .bookings
        .book_instant(request_for(&h, contractor.id.as_str(), 6), opened_at)
        .expect("visit booked");
    let assigned = h
        .maintenance
        .assign(&ticket.id, &contractor.id, Some(booking.id.clone()), opened_at)
        .expect("contractor assigned");
    assert_eq!(assigned.status, TicketStatus::Assigned);
    assert_eq!(assigned.booking_id, Some(booking.id.clone()));
    assert!(h
        .mailer
        .sent_to("dispatch@reliable.example")
        .iter()
        .any(|message| message.tag == "maintenance.assigned"));

    h.maintenance.start(&ticket.id, at(6, 13)).expect("work starts");
    let late = opened_at + Duration::hours(73);
    let overdue = h.maintenance.overdue(late).unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, ticket.id);

    h.bookings.complete(&booking.id, at(6, 15)).expect("visit done");
    let resolved = h
        .maintenance
        .resolve(
            &ticket.id,
            booking.estimate,
            Some("Replaced trap".to_string()),
            at(6, 15),
        )
        .expect("ticket resolves");
    assert_eq!(resolved.cost, Some(Cents::from_dollars(190)));
    assert!(h.maintenance.overdue(late).unwrap().is_empty());

    let closed = h.maintenance.close(&ticket.id, at(7, 9)).expect("ticket closes");
    assert_eq!(closed.status, TicketStatus::Closed);
    let statuses: Vec<_> = closed.history.iter().map(|event| event.status).collect();
    assert_eq!(
        statuses,
        vec![
            TicketStatus::Open,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ]
    );

    match h.maintenance.reopen(&ticket.id, "still dripping", at(8, 9)) {
        Err(MaintenanceError::InvalidTransition { from, .. }) => {
            assert_eq!(from, TicketStatus::Closed)
        }
        other => panic!("closed tickets stay closed, got {other:?}"),
    }
}

async fn send(router: Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn booking_and_ticket_endpoints_share_one_store() {
    let h = harness();
    let app = marketplace_router(h.bookings.clone())
        .merge(maintenance_router(h.maintenance.clone()));

    let (status, contractor) = send(
        app.clone(),
        Method::POST,
        "/api/v1/contractors",
        json!({
            "name": "Bright Electric",
            "email": "jobs@bright.example",
            "trade": "electrical",
            "hourly_rate": 12_000,
            "instant_booking": true,
            "deposit_policy": { "kind": "flat", "value": 5_000 },
            "cancellation_policy": "flexible"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let contractor_id = contractor["id"].as_str().unwrap().to_string();

    let start = Utc::now() + Duration::days(5);
    let (status, _) = send(
        app.clone(),
        Method::POST,
        &format!("/api/v1/contractors/{contractor_id}/availability"),
        json!({ "starts_at": start - Duration::days(1), "ends_at": start + Duration::days(1) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let slot = json!({
        "contractor_id": contractor_id,
        "landlord_id": h.landlord.id,
        "property_id": h.property.id,
        "customer_email": h.landlord.email,
        "starts_at": start,
        "ends_at": start + Duration::hours(1)
    });
    let (status, booking) =
        send(app.clone(), Method::POST, "/api/v1/bookings", slot.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["deposit"], 5_000);
    assert_eq!(booking["estimate"], 12_000);

    let (status, _) = send(app.clone(), Method::POST, "/api/v1/bookings", slot).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, ticket) = send(
        app.clone(),
        Method::POST,
        "/api/v1/maintenance/tickets",
        json!({
            "property_id": h.property.id,
            "title": "Breaker keeps tripping",
            "priority": "emergency"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");

    let (status, body) = send(
        app.clone(),
        Method::POST,
        &format!("/api/v1/bookings/{}/cancel", booking["id"].as_str().unwrap()),
        json!({ "cancelled_by": "customer" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["refund"]["percent"], 100);

    let (status, body) = send(
        app,
        Method::GET,
        "/api/v1/maintenance/tickets/mt-missing",
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("mt-missing"));
}
