//! Maintenance tickets with priority SLAs and contractor assignment.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{MaintenanceTicket, NewTicket, Priority, TicketEvent, TicketId, TicketStatus};
pub use repository::MaintenanceRepository;
pub use router::maintenance_router;
pub use service::{MaintenanceError, MaintenanceService};
