use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::notifications::{templates, Mailer, Notifier};
use crate::store::RepositoryError;

use super::domain::{
    AvailabilityWindow, Booking, BookingId, BookingRequest, BookingStatus, CancelledBy, Contractor,
    ContractorId, NewContractor, RefundRecord,
};
use super::payments::{PaymentError, PaymentGateway};
use super::policy;
use super::repository::MarketplaceRepository;

static CONTRACTOR_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Contractor directory plus instant booking, cancellation refunds and completion.
pub struct BookingService {
    repository: Arc<dyn MarketplaceRepository>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    // Held across every status check and the write that follows it.
    booking_lock: Mutex<()>,
}

impl BookingService {
    pub fn new(
        repository: Arc<dyn MarketplaceRepository>,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repository,
            payments,
            notifier: Notifier::new(mailer),
            booking_lock: Mutex::new(()),
        }
    }

    fn lock_bookings(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.booking_lock
            .lock()
            .map_err(|_| RepositoryError::Unavailable("booking lock poisoned".to_string()))
    }

    pub fn register_contractor(&self, request: NewContractor) -> Result<Contractor, BookingError> {
        if request.name.trim().is_empty() || request.trade.trim().is_empty() {
            return Err(BookingError::Validation(
                "contractor name and trade are required".to_string(),
            ));
        }
        if !request.hourly_rate.is_positive() {
            return Err(BookingError::Validation(
                "hourly rate must be greater than zero".to_string(),
            ));
        }
        let id = CONTRACTOR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let contractor = self.repository.insert_contractor(Contractor {
            id: ContractorId(format!("ctr-{id:06}")),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            trade: request.trade.trim().to_string(),
            hourly_rate: request.hourly_rate,
            instant_booking: request.instant_booking,
            deposit_policy: request.deposit_policy,
            cancellation_policy: request.cancellation_policy,
        })?;
        info!(contractor_id = %contractor.id, trade = %contractor.trade, "contractor registered");
        Ok(contractor)
    }

    pub fn contractor(&self, id: &ContractorId) -> Result<Contractor, BookingError> {
        self.repository
            .contractor(id)?
            .ok_or_else(|| BookingError::ContractorNotFound(id.clone()))
    }

    pub fn contractors(&self) -> Result<Vec<Contractor>, BookingError> {
        Ok(self.repository.contractors()?)
    }

    pub fn add_availability(
        &self,
        contractor_id: &ContractorId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<AvailabilityWindow, BookingError> {
        self.contractor(contractor_id)?;
        if ends_at <= starts_at {
            return Err(BookingError::InvalidSlot(
                "availability must end after it starts".to_string(),
            ));
        }
        let window = AvailabilityWindow {
            contractor_id: contractor_id.clone(),
            starts_at,
            ends_at,
        };
        self.repository.insert_availability(window.clone())?;
        Ok(window)
    }

    pub fn booking(&self, id: &BookingId) -> Result<Booking, BookingError> {
        self.repository
            .booking(id)?
            .ok_or_else(|| BookingError::NotFound(id.clone()))
    }

    /// Reserve a slot immediately, charging the contractor's deposit.
    pub fn book_instant(
        &self,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let contractor = self.contractor(&request.contractor_id)?;
        if !contractor.instant_booking {
            return Err(BookingError::InstantBookingDisabled(contractor.id));
        }
        if request.ends_at <= request.starts_at {
            return Err(BookingError::InvalidSlot(
                "booking must end after it starts".to_string(),
            ));
        }
        if request.starts_at <= now {
            return Err(BookingError::InvalidSlot(
                "booking must start in the future".to_string(),
            ));
        }
        if request.customer_email.trim().is_empty() {
            return Err(BookingError::Validation(
                "customer email is required".to_string(),
            ));
        }

        let _guard = self.lock_bookings()?;

        let available = self
            .repository
            .availability_for(&contractor.id)?
            .iter()
            .any(|window| window.contains(request.starts_at, request.ends_at));
        if !available {
            return Err(BookingError::OutsideAvailability);
        }
        if let Some(existing) = self
            .repository
            .bookings_for_contractor(&contractor.id)?
            .into_iter()
            .find(|booking| {
                booking.status == BookingStatus::Confirmed
                    && booking.overlaps(request.starts_at, request.ends_at)
            })
        {
            return Err(BookingError::SlotTaken(existing.id));
        }

        let estimate = policy::estimate(contractor.hourly_rate, request.starts_at, request.ends_at);
        let deposit = policy::deposit(contractor.deposit_policy, estimate);
        let id = BookingId(format!(
            "bkg-{:06}",
            BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        let payment_intent_id = if deposit.is_positive() {
            let intent = self
                .payments
                .create_intent(deposit, &format!("Deposit for {id} with {}", contractor.name))?;
            Some(self.payments.capture(&intent.id)?.id)
        } else {
            None
        };

        let booking = self.repository.insert_booking(Booking {
            id,
            contractor_id: contractor.id.clone(),
            landlord_id: request.landlord_id,
            property_id: request.property_id,
            customer_email: request.customer_email.trim().to_string(),
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            estimate,
            deposit,
            payment_intent_id,
            status: BookingStatus::Confirmed,
            created_at: now,
            cancelled_at: None,
            completed_at: None,
            refund: None,
        })?;

        self.notifier.deliver(&templates::booking_confirmed(
            &booking.customer_email,
            &contractor.name,
            booking.starts_at,
            booking.deposit,
        ));
        info!(
            booking_id = %booking.id,
            contractor_id = %contractor.id,
            deposit = %booking.deposit,
            "instant booking confirmed"
        );
        Ok(booking)
    }

    /// Cancel a confirmed booking and refund the deposit share the policy allows.
    pub fn cancel(
        &self,
        id: &BookingId,
        cancelled_by: CancelledBy,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let _guard = self.lock_bookings()?;
        let mut booking = self.booking(id)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                id: booking.id,
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }
        let contractor = self.contractor(&booking.contractor_id)?;
        let percent = policy::refund_percent(
            contractor.cancellation_policy,
            cancelled_by,
            booking.starts_at,
            now,
        );
        let amount = booking.deposit.percent(percent);
        let refund_id = match (&booking.payment_intent_id, amount.is_positive()) {
            (Some(intent_id), true) => Some(self.payments.refund(intent_id, amount)?),
            _ => None,
        };

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(now);
        booking.refund = Some(RefundRecord {
            cancelled_by,
            percent,
            amount,
            refund_id,
        });
        self.repository.update_booking(booking.clone())?;

        self.notifier.deliver(&templates::booking_cancelled(
            &booking.customer_email,
            &contractor.name,
            booking.starts_at,
            amount,
        ));
        if percent < 100 && booking.deposit.is_positive() {
            warn!(
                booking_id = %booking.id,
                policy = contractor.cancellation_policy.label(),
                percent,
                "late cancellation kept part of the deposit"
            );
        }
        info!(booking_id = %booking.id, refund = %amount, "booking cancelled");
        Ok(booking)
    }

    /// Mark a booking done once its slot has started.
    pub fn complete(&self, id: &BookingId, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        let _guard = self.lock_bookings()?;
        let mut booking = self.booking(id)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                id: booking.id,
                from: booking.status,
                to: BookingStatus::Completed,
            });
        }
        if now < booking.starts_at {
            return Err(BookingError::NotStarted(booking.id));
        }
        booking.status = BookingStatus::Completed;
        booking.completed_at = Some(now);
        self.repository.update_booking(booking.clone())?;
        info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("contractor {0} not found")]
    ContractorNotFound(ContractorId),
    #[error("booking {0} not found")]
    NotFound(BookingId),
    #[error("contractor {0} does not accept instant bookings")]
    InstantBookingDisabled(ContractorId),
    #[error("{0}")]
    InvalidSlot(String),
    #[error("requested time is outside the contractor's availability")]
    OutsideAvailability,
    #[error("requested time overlaps booking {0}")]
    SlotTaken(BookingId),
    #[error("booking {id} cannot move from {} to {}", from.label(), to.label())]
    InvalidTransition {
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("booking {0} has not started yet")]
    NotStarted(BookingId),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
