use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rentwise::config::AppConfig;
use rentwise::notifications::Mailer;
use rentwise::portfolio::PortfolioService;
use rentwise::store::InMemoryStore;
use rentwise::workflows::applications::{ApplicationService, ScreeningCriteria};
use rentwise::workflows::billing::BillingService;
use rentwise::workflows::leasing::jurisdiction::ClauseRegistry;
use rentwise::workflows::leasing::router::LeasingState;
use rentwise::workflows::leasing::{
    HtmlDocumentRenderer, InMemoryDocumentStore, LeaseDocumentService, SigningService,
};
use rentwise::workflows::maintenance::MaintenanceService;
use rentwise::workflows::marketplace::{BookingService, InMemoryPaymentGateway};
use rentwise::workflows::reminders::{ReminderSchedule, RentReminderService};
use rentwise::workflows::reporting::{ReportingService, ReportingState};
use rentwise::workflows::team::TeamService;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service wired against one in-process store.
#[derive(Clone)]
pub(crate) struct Platform {
    pub(crate) portfolio: Arc<PortfolioService>,
    pub(crate) documents: Arc<LeaseDocumentService>,
    pub(crate) signing: Arc<SigningService>,
    pub(crate) applications: Arc<ApplicationService>,
    pub(crate) bookings: Arc<BookingService>,
    pub(crate) maintenance: Arc<MaintenanceService>,
    pub(crate) billing: Arc<BillingService>,
    pub(crate) reminders: Arc<RentReminderService>,
    pub(crate) reporting: Arc<ReportingService>,
    pub(crate) team: Arc<TeamService>,
}

impl Platform {
    pub(crate) fn in_memory(config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let registry = Arc::new(ClauseRegistry::standard());

        let portfolio = Arc::new(PortfolioService::new(store.clone(), store.clone()));
        let documents = Arc::new(LeaseDocumentService::new(
            registry.clone(),
            Arc::new(HtmlDocumentRenderer),
            Arc::new(InMemoryDocumentStore::default()),
            store.clone(),
        ));
        let signing = Arc::new(SigningService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            mailer.clone(),
            config.leasing.clone(),
        ));
        let applications = Arc::new(ApplicationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            documents.clone(),
            signing.clone(),
            mailer.clone(),
            ScreeningCriteria::default(),
        ));
        let bookings = Arc::new(BookingService::new(
            store.clone(),
            Arc::new(InMemoryPaymentGateway::default()),
            mailer.clone(),
        ));
        let maintenance = Arc::new(MaintenanceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            mailer.clone(),
        ));
        let billing = Arc::new(BillingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            registry,
            mailer.clone(),
        ));
        let reminders = Arc::new(RentReminderService::new(
            billing.clone(),
            store.clone(),
            store.clone(),
            mailer.clone(),
            ReminderSchedule::from(&config.reminders),
        ));
        let reporting = Arc::new(ReportingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let team = Arc::new(TeamService::new(store.clone(), store.clone(), mailer));

        Self {
            portfolio,
            documents,
            signing,
            applications,
            bookings,
            maintenance,
            billing,
            reminders,
            reporting,
            team,
        }
    }

    pub(crate) fn leasing_state(&self) -> LeasingState {
        LeasingState {
            documents: self.documents.clone(),
            signing: self.signing.clone(),
            portfolio: self.portfolio.clone(),
        }
    }

    pub(crate) fn reporting_state(&self) -> ReportingState {
        ReportingState {
            reports: self.reporting.clone(),
            team: self.team.clone(),
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
