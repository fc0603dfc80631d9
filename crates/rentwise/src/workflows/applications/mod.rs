//! Rental applications: intake, advisory screening and the approval pipeline that generates the
//! lease and sends it for signature.

pub mod domain;
pub mod repository;
pub mod router;
pub mod screening;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationStatus, ApplicationSubmission, ApprovalRequest, RentalApplication,
};
pub use repository::ApplicationRepository;
pub use router::application_router;
pub use screening::{
    Recommendation, ScoreComponent, Screener, ScreeningCriteria, ScreeningFactor, ScreeningInput,
    ScreeningReport,
};
pub use service::{ApplicationError, ApplicationService, ApprovalOutcome};
