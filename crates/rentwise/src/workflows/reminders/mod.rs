//! Scheduled rent reminders for issued rent invoices.

pub mod ledger;
pub mod router;
pub mod schedule;
pub mod service;

pub use ledger::{ReminderLedger, ReminderRecord};
pub use router::reminder_router;
pub use schedule::{ReminderKind, ReminderSchedule};
pub use service::{ReminderError, ReminderRunSummary, RentReminderService};
