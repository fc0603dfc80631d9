use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::money::Cents;
use crate::notifications::{templates, Mailer, Notifier};
use crate::portfolio::{PortfolioRepository, PropertyId, UnitId};
use crate::store::RepositoryError;
use crate::workflows::marketplace::{
    BookingId, BookingStatus, ContractorId, MarketplaceRepository,
};

use super::domain::{MaintenanceTicket, NewTicket, TicketEvent, TicketId, TicketStatus};
use super::repository::MaintenanceRepository;

static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Maintenance tickets from intake through contractor assignment to close-out.
pub struct MaintenanceService {
    tickets: Arc<dyn MaintenanceRepository>,
    portfolio: Arc<dyn PortfolioRepository>,
    marketplace: Arc<dyn MarketplaceRepository>,
    notifier: Notifier,
}

impl MaintenanceService {
    pub fn new(
        tickets: Arc<dyn MaintenanceRepository>,
        portfolio: Arc<dyn PortfolioRepository>,
        marketplace: Arc<dyn MarketplaceRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            tickets,
            portfolio,
            marketplace,
            notifier: Notifier::new(mailer),
        }
    }

    pub fn open(
        &self,
        request: NewTicket,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        if request.title.trim().is_empty() {
            return Err(MaintenanceError::Validation("title is required".to_string()));
        }
        let property = self
            .portfolio
            .property(&request.property_id)?
            .ok_or_else(|| MaintenanceError::PropertyNotFound(request.property_id.clone()))?;
        if let Some(unit_id) = &request.unit_id {
            let unit = self
                .portfolio
                .unit(unit_id)?
                .ok_or_else(|| MaintenanceError::UnitNotFound(unit_id.clone()))?;
            if unit.property_id != property.id {
                return Err(MaintenanceError::Validation(format!(
                    "unit {unit_id} does not belong to property {}",
                    property.id
                )));
            }
        }

        let id = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let ticket = self.tickets.insert_ticket(MaintenanceTicket {
            id: TicketId(format!("mt-{id:06}")),
            landlord_id: property.landlord_id,
            property_id: property.id,
            unit_id: request.unit_id,
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            priority: request.priority,
            status: TicketStatus::Open,
            assigned_contractor: None,
            booking_id: None,
            opened_at: at,
            due_by: at + request.priority.sla(),
            resolved_at: None,
            cost: None,
            history: vec![TicketEvent {
                at,
                status: TicketStatus::Open,
                note: None,
            }],
        })?;
        info!(
            ticket_id = %ticket.id,
            priority = ticket.priority.label(),
            due_by = %ticket.due_by,
            "maintenance ticket opened"
        );
        Ok(ticket)
    }

    pub fn ticket(&self, id: &TicketId) -> Result<MaintenanceTicket, MaintenanceError> {
        self.tickets
            .ticket(id)?
            .ok_or_else(|| MaintenanceError::NotFound(id.clone()))
    }

    /// Assign (or reassign) a contractor, optionally linking the marketplace booking for the visit.
    pub fn assign(
        &self,
        id: &TicketId,
        contractor_id: &ContractorId,
        booking_id: Option<BookingId>,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        let mut ticket = self.ticket(id)?;
        let contractor = self
            .marketplace
            .contractor(contractor_id)?
            .ok_or_else(|| MaintenanceError::ContractorNotFound(contractor_id.clone()))?;
        if let Some(booking_id) = &booking_id {
            let booking = self
                .marketplace
                .booking(booking_id)?
                .ok_or_else(|| MaintenanceError::BookingNotFound(booking_id.clone()))?;
            if booking.contractor_id != contractor.id
                || booking.property_id != ticket.property_id
                || booking.status == BookingStatus::Cancelled
            {
                return Err(MaintenanceError::Validation(format!(
                    "booking {booking_id} is not an active booking with {} at this property",
                    contractor.name
                )));
            }
        }

        Self::advance(
            &mut ticket,
            TicketStatus::Assigned,
            Some(format!("assigned to {}", contractor.name)),
            at,
        )?;
        ticket.assigned_contractor = Some(contractor.id.clone());
        ticket.booking_id = booking_id;
        self.tickets.update_ticket(ticket.clone())?;

        let location = match self.portfolio.property(&ticket.property_id)? {
            Some(property) => property.address.one_line(),
            None => ticket.property_id.to_string(),
        };
        self.notifier.deliver(&templates::maintenance_assigned(
            &contractor.email,
            &contractor.name,
            &ticket.title,
            &location,
            ticket.due_by,
        ));
        info!(
            ticket_id = %ticket.id,
            contractor_id = %contractor.id,
            "maintenance ticket assigned"
        );
        Ok(ticket)
    }

    pub fn start(
        &self,
        id: &TicketId,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        let mut ticket = self.ticket(id)?;
        Self::advance(&mut ticket, TicketStatus::InProgress, None, at)?;
        self.tickets.update_ticket(ticket.clone())?;
        Ok(ticket)
    }

    pub fn resolve(
        &self,
        id: &TicketId,
        cost: Cents,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        if cost.value() < 0 {
            return Err(MaintenanceError::Validation(
                "cost cannot be negative".to_string(),
            ));
        }
        let mut ticket = self.ticket(id)?;
        Self::advance(&mut ticket, TicketStatus::Resolved, note, at)?;
        ticket.resolved_at = Some(at);
        ticket.cost = Some(cost);
        self.tickets.update_ticket(ticket.clone())?;
        if at > ticket.due_by {
            warn!(ticket_id = %ticket.id, due_by = %ticket.due_by, "ticket resolved after its SLA");
        }
        info!(ticket_id = %ticket.id, cost = %cost, "maintenance ticket resolved");
        Ok(ticket)
    }

    pub fn reopen(
        &self,
        id: &TicketId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        let mut ticket = self.ticket(id)?;
        if ticket.status != TicketStatus::Resolved {
            return Err(MaintenanceError::InvalidTransition {
                id: ticket.id,
                from: ticket.status,
                to: TicketStatus::InProgress,
            });
        }
        Self::advance(&mut ticket, TicketStatus::InProgress, Some(reason.to_string()), at)?;
        ticket.resolved_at = None;
        ticket.cost = None;
        self.tickets.update_ticket(ticket.clone())?;
        info!(ticket_id = %ticket.id, "maintenance ticket reopened");
        Ok(ticket)
    }

    pub fn close(
        &self,
        id: &TicketId,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        let mut ticket = self.ticket(id)?;
        Self::advance(&mut ticket, TicketStatus::Closed, None, at)?;
        self.tickets.update_ticket(ticket.clone())?;
        Ok(ticket)
    }

    pub fn cancel(
        &self,
        id: &TicketId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<MaintenanceTicket, MaintenanceError> {
        let mut ticket = self.ticket(id)?;
        Self::advance(&mut ticket, TicketStatus::Cancelled, Some(reason.to_string()), at)?;
        self.tickets.update_ticket(ticket.clone())?;
        info!(ticket_id = %ticket.id, "maintenance ticket cancelled");
        Ok(ticket)
    }

    /// Active tickets past their SLA, most overdue first.
    pub fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<MaintenanceTicket>, MaintenanceError> {
        let mut overdue = Vec::new();
        for status in [TicketStatus::Open, TicketStatus::Assigned, TicketStatus::InProgress] {
            overdue.extend(
                self.tickets
                    .tickets_with_status(status)?
                    .into_iter()
                    .filter(|ticket| ticket.is_overdue(now)),
            );
        }
        overdue.sort_by(|a, b| a.due_by.cmp(&b.due_by).then_with(|| a.id.cmp(&b.id)));
        Ok(overdue)
    }

    fn advance(
        ticket: &mut MaintenanceTicket,
        next: TicketStatus,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), MaintenanceError> {
        if !ticket.status.can_transition_to(next) {
            return Err(MaintenanceError::InvalidTransition {
                id: ticket.id.clone(),
                from: ticket.status,
                to: next,
            });
        }
        ticket.status = next;
        ticket.history.push(TicketEvent {
            at,
            status: next,
            note,
        });
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("ticket {0} not found")]
    NotFound(TicketId),
    #[error("property {0} not found")]
    PropertyNotFound(PropertyId),
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    #[error("contractor {0} not found")]
    ContractorNotFound(ContractorId),
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),
    #[error("ticket {id} cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition {
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::notifications::InMemoryMailer;
    use crate::portfolio::{Address, Landlord, LandlordId, Property, Unit, UnitStatus};
    use crate::store::InMemoryStore;
    use crate::workflows::marketplace::{CancellationPolicy, Contractor, DepositPolicy};
    use crate::workflows::maintenance::domain::Priority;

    struct Harness {
        service: MaintenanceService,
        mailer: InMemoryMailer,
        contractor: ContractorId,
    }

    fn opened_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap()
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::default());
        store
            .insert_landlord(Landlord {
                id: LandlordId("ll-fixture".to_string()),
                name: "Dana Ortiz".to_string(),
                email: "dana@example.com".to_string(),
                company_name: None,
            })
            .expect("landlord");
        store
            .insert_property(Property {
                id: PropertyId("prop-fixture".to_string()),
                landlord_id: LandlordId("ll-fixture".to_string()),
                name: "Cedar Flats".to_string(),
                address: Address {
                    line1: "12 Cedar St".to_string(),
                    line2: None,
                    city: "Austin".to_string(),
                    state: "TX".parse().expect("state"),
                    postal_code: "78701".to_string(),
                },
                year_built: Some(1998),
                flood_zone: false,
                shared_utilities: false,
                default_lease_document: None,
            })
            .expect("property");
        store
            .insert_unit(Unit {
                id: UnitId("unit-fixture".to_string()),
                property_id: PropertyId("prop-fixture".to_string()),
                label: "1A".to_string(),
                bedrooms: 1,
                bathrooms: 1.0,
                market_rent: Cents::from_dollars(1_100),
                status: UnitStatus::Occupied,
            })
            .expect("unit");
        store
            .insert_contractor(Contractor {
                id: ContractorId("ctr-fixture".to_string()),
                name: "Reliable Plumbing".to_string(),
                email: "dispatch@reliable.example".to_string(),
                trade: "plumbing".to_string(),
                hourly_rate: Cents::from_dollars(80),
                instant_booking: true,
                deposit_policy: DepositPolicy::None,
                cancellation_policy: CancellationPolicy::Flexible,
            })
            .expect("contractor");

        let mailer = InMemoryMailer::default();
        let service = MaintenanceService::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(mailer.clone()),
        );
        Harness {
            service,
            mailer,
            contractor: ContractorId("ctr-fixture".to_string()),
        }
    }

    fn leak(priority: Priority) -> NewTicket {
        NewTicket {
            property_id: PropertyId("prop-fixture".to_string()),
            unit_id: Some(UnitId("unit-fixture".to_string())),
            title: "Kitchen sink leaking".to_string(),
            description: "Water pooling under the cabinet".to_string(),
            priority,
        }
    }

    #[test]
    fn ticket_lifecycle_records_history() {
        let h = harness();
        let ticket = h.service.open(leak(Priority::High), opened_at()).expect("opened");
        assert_eq!(ticket.due_by, opened_at() + Duration::hours(72));
        assert_eq!(ticket.landlord_id.as_str(), "ll-fixture");

        h.service
            .assign(&ticket.id, &h.contractor, None, opened_at() + Duration::hours(1))
            .expect("assigned");
        assert_eq!(
            h.mailer.sent_to("dispatch@reliable.example")[0].tag,
            "maintenance.assigned"
        );
        h.service
            .start(&ticket.id, opened_at() + Duration::hours(5))
            .expect("started");
        let resolved = h
            .service
            .resolve(
                &ticket.id,
                Cents::from_dollars(185),
                Some("replaced trap".to_string()),
                opened_at() + Duration::hours(8),
            )
            .expect("resolved");
        assert_eq!(resolved.cost, Some(Cents::from_dollars(185)));

        let reopened = h
            .service
            .reopen(&ticket.id, "still dripping", opened_at() + Duration::hours(30))
            .expect("reopened");
        assert_eq!(reopened.status, TicketStatus::InProgress);
        assert_eq!(reopened.cost, None);

        h.service
            .resolve(
                &ticket.id,
                Cents::from_dollars(240),
                None,
                opened_at() + Duration::hours(40),
            )
            .expect("resolved again");
        let closed = h
            .service
            .close(&ticket.id, opened_at() + Duration::hours(41))
            .expect("closed");
        let statuses: Vec<_> = closed.history.iter().map(|event| event.status).collect();
        assert_eq!(
            statuses,
            vec![
                TicketStatus::Open,
                TicketStatus::Assigned,
                TicketStatus::InProgress,
                TicketStatus::Resolved,
                TicketStatus::InProgress,
                TicketStatus::Resolved,
                TicketStatus::Closed,
            ]
        );
    }

    #[test]
    fn in_progress_work_cannot_be_cancelled() {
        let h = harness();
        let ticket = h.service.open(leak(Priority::Normal), opened_at()).expect("opened");
        h.service
            .assign(&ticket.id, &h.contractor, None, opened_at())
            .expect("assigned");
        h.service.start(&ticket.id, opened_at()).expect("started");
        assert!(matches!(
            h.service.cancel(&ticket.id, "duplicate", opened_at()),
            Err(MaintenanceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn overdue_lists_active_tickets_past_sla() {
        let h = harness();
        let emergency = h
            .service
            .open(leak(Priority::Emergency), opened_at())
            .expect("opened");
        let low = h.service.open(leak(Priority::Low), opened_at()).expect("opened");
        let cancelled = h
            .service
            .open(leak(Priority::Emergency), opened_at())
            .expect("opened");
        h.service
            .cancel(&cancelled.id, "tenant fixed it", opened_at())
            .expect("cancelled");

        let overdue = h.service.overdue(opened_at() + Duration::days(2)).expect("overdue");
        let ids: Vec<_> = overdue.iter().map(|ticket| ticket.id.clone()).collect();
        assert_eq!(ids, vec![emergency.id]);

        let later = h.service.overdue(opened_at() + Duration::days(15)).expect("overdue");
        assert!(later.iter().any(|ticket| ticket.id == low.id));
    }

    #[test]
    fn unknown_property_and_contractor_are_reported() {
        let h = harness();
        let mut request = leak(Priority::Low);
        request.property_id = PropertyId("prop-missing".to_string());
        assert!(matches!(
            h.service.open(request, opened_at()),
            Err(MaintenanceError::PropertyNotFound(_))
        ));

        let ticket = h.service.open(leak(Priority::Low), opened_at()).expect("opened");
        assert!(matches!(
            h.service.assign(
                &ticket.id,
                &ContractorId("ctr-missing".to_string()),
                None,
                opened_at()
            ),
            Err(MaintenanceError::ContractorNotFound(_))
        ));
    }
}
