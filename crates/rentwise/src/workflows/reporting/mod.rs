//! Landlord financial reporting with CSV export.

pub mod financial;
pub mod router;

pub use financial::{
    FinancialFigures, FinancialReport, PropertyFinancials, ReportError, ReportingService,
};
pub use router::{reporting_router, ReportingState};
