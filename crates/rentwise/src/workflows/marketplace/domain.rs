use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{LandlordId, PropertyId};

string_id!(ContractorId);
string_id!(BookingId);

/// Up-front charge taken when a slot is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DepositPolicy {
    None,
    Flat(Cents),
    PercentOfEstimate(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
}

impl CancellationPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            CancellationPolicy::Flexible => "flexible",
            CancellationPolicy::Moderate => "moderate",
            CancellationPolicy::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: ContractorId,
    pub name: String,
    pub email: String,
    pub trade: String,
    pub hourly_rate: Cents,
    pub instant_booking: bool,
    pub deposit_policy: DepositPolicy,
    pub cancellation_policy: CancellationPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContractor {
    pub name: String,
    pub email: String,
    pub trade: String,
    pub hourly_rate: Cents,
    #[serde(default)]
    pub instant_booking: bool,
    pub deposit_policy: DepositPolicy,
    pub cancellation_policy: CancellationPolicy,
}

/// Time range in which a contractor accepts instant bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub contractor_id: ContractorId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn contains(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at <= starts_at && ends_at <= self.ends_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Customer,
    Contractor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub cancelled_by: CancelledBy,
    pub percent: u8,
    pub amount: Cents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub contractor_id: ContractorId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub customer_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub estimate: Cents,
    pub deposit: Cents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refund: Option<RefundRecord>,
}

impl Booking {
    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub contractor_id: ContractorId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub customer_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
