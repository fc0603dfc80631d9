pub mod applications;
pub mod billing;
pub mod leasing;
pub mod maintenance;
pub mod marketplace;
pub mod reminders;
pub mod reporting;
pub mod team;
