use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{LandlordId, PropertyId, UnitId};
use crate::workflows::marketplace::{BookingId, ContractorId};

string_id!(TicketId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Emergency,
    High,
    Normal,
    Low,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Time allowed between opening a ticket and resolving it.
    pub fn sla(self) -> Duration {
        match self {
            Priority::Emergency => Duration::hours(24),
            Priority::High => Duration::hours(72),
            Priority::Normal => Duration::days(7),
            Priority::Low => Duration::days(14),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Cancelled,
}

use TicketStatus::{Assigned, Cancelled, Closed, InProgress, Open, Resolved};

const ALLOWED_TRANSITIONS: [(TicketStatus, TicketStatus); 8] = [
    (Open, Assigned),
    (Open, Cancelled),
    (Assigned, Assigned),
    (Assigned, InProgress),
    (Assigned, Cancelled),
    (InProgress, Resolved),
    (Resolved, InProgress),
    (Resolved, Closed),
];

impl TicketStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Open => "open",
            Assigned => "assigned",
            InProgress => "in_progress",
            Resolved => "resolved",
            Closed => "closed",
            Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        ALLOWED_TRANSITIONS.contains(&(self, next))
    }

    /// Work is still outstanding and counts against the SLA.
    pub fn is_active(self) -> bool {
        matches!(self, Open | Assigned | InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEvent {
    pub at: DateTime<Utc>,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceTicket {
    pub id: TicketId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: Option<UnitId>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub assigned_contractor: Option<ContractorId>,
    pub booking_id: Option<BookingId>,
    pub opened_at: DateTime<Utc>,
    pub due_by: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub cost: Option<Cents>,
    pub history: Vec<TicketEvent>,
}

impl MaintenanceTicket {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && now > self.due_by
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub property_id: PropertyId,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
}
