use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ReminderConfig;

/// Which reminder, if any, a rent invoice earns on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReminderKind {
    Upcoming { days: u16 },
    DueToday,
    Overdue { days: u16 },
}

impl ReminderKind {
    /// Ledger key; one reminder of each key per invoice.
    pub fn key(self) -> String {
        match self {
            ReminderKind::Upcoming { days } => format!("upcoming-{days}"),
            ReminderKind::DueToday => "due".to_string(),
            ReminderKind::Overdue { days } => format!("overdue-{days}"),
        }
    }

    pub fn timing(self) -> String {
        match self {
            ReminderKind::Upcoming { days: 1 } => "is due tomorrow".to_string(),
            ReminderKind::Upcoming { days } => format!("is due in {days} days"),
            ReminderKind::DueToday => "is due today".to_string(),
            ReminderKind::Overdue { days: 1 } => "was due yesterday".to_string(),
            ReminderKind::Overdue { days } => format!("was due {days} days ago"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSchedule {
    pub days_before: Vec<u16>,
    pub on_due_date: bool,
    pub overdue_days: Vec<u16>,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            days_before: vec![3],
            on_due_date: true,
            overdue_days: vec![1, 5],
        }
    }
}

impl From<&ReminderConfig> for ReminderSchedule {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            days_before: config.days_before.clone(),
            on_due_date: true,
            overdue_days: config.overdue_days.clone(),
        }
    }
}

impl ReminderSchedule {
    pub fn kind_for(&self, due: NaiveDate, today: NaiveDate) -> Option<ReminderKind> {
        let until_due = (due - today).num_days();
        match until_due {
            0 => self.on_due_date.then_some(ReminderKind::DueToday),
            days if days > 0 => {
                let days = u16::try_from(days).ok()?;
                self.days_before
                    .contains(&days)
                    .then_some(ReminderKind::Upcoming { days })
            }
            days => {
                let days = u16::try_from(-days).ok()?;
                self.overdue_days
                    .contains(&days)
                    .then_some(ReminderKind::Overdue { days })
            }
        }
    }
}
