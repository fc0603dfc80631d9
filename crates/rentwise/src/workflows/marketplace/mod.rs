//! Contractor marketplace: instant booking against published availability with a deposit taken
//! through the payment gateway and policy-driven refunds on cancellation.

pub mod domain;
pub mod payments;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AvailabilityWindow, Booking, BookingId, BookingRequest, BookingStatus, CancellationPolicy,
    CancelledBy, Contractor, ContractorId, DepositPolicy, NewContractor, RefundRecord,
};
pub use payments::{
    InMemoryPaymentGateway, IntentStatus, PaymentError, PaymentGateway, PaymentIntent,
};
pub use repository::MarketplaceRepository;
pub use router::marketplace_router;
pub use service::{BookingError, BookingService};
