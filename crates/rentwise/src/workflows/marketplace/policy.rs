//! Deposit and refund arithmetic for instant bookings.

use chrono::{DateTime, Utc};

use crate::money::Cents;

use super::domain::{CancellationPolicy, CancelledBy, DepositPolicy};

const HOUR_SECONDS: i64 = 3_600;

/// Labor estimate for a slot, billed per started quarter hour.
pub fn estimate(hourly_rate: Cents, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Cents {
    let minutes = (ends_at - starts_at).num_minutes().max(0);
    let quarters = (minutes + 14) / 15;
    Cents((hourly_rate.value() * quarters + 3) / 4)
}

pub fn deposit(policy: DepositPolicy, estimate: Cents) -> Cents {
    match policy {
        DepositPolicy::None => Cents::ZERO,
        DepositPolicy::Flat(amount) => amount,
        DepositPolicy::PercentOfEstimate(pct) => estimate.percent(pct.min(100)),
    }
}

/// Share of the deposit returned when a booking is cancelled at `now`.
pub fn refund_percent(
    policy: CancellationPolicy,
    cancelled_by: CancelledBy,
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u8 {
    if cancelled_by == CancelledBy::Contractor {
        return 100;
    }
    if starts_at <= now {
        return 0;
    }
    let notice = (starts_at - now).num_seconds();
    let hours = |count: i64| count * HOUR_SECONDS;
    match policy {
        CancellationPolicy::Flexible if notice >= hours(24) => 100,
        CancellationPolicy::Flexible => 50,
        CancellationPolicy::Moderate if notice >= hours(72) => 100,
        CancellationPolicy::Moderate if notice >= hours(24) => 50,
        CancellationPolicy::Moderate => 0,
        CancellationPolicy::Strict if notice >= hours(168) => 50,
        CancellationPolicy::Strict => 0,
    }
}
