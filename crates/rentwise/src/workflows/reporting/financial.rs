use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::money::Cents;
use crate::portfolio::{LandlordId, PortfolioRepository, PropertyId, UnitStatus};
use crate::store::RepositoryError;
use crate::workflows::billing::{InvoiceRepository, InvoiceStatus, LineItemKind};
use crate::workflows::leasing::LeaseRepository;
use crate::workflows::maintenance::{MaintenanceRepository, TicketStatus};
use crate::workflows::marketplace::{BookingStatus, MarketplaceRepository};

/// Money and occupancy figures for one property or the whole portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialFigures {
    pub rent_billed: Cents,
    pub collected: Cents,
    pub outstanding: Cents,
    pub expenses: Cents,
    pub net_operating_income: Cents,
    pub occupied_units: usize,
    pub total_units: usize,
}

impl FinancialFigures {
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        self.occupied_units as f64 / self.total_units as f64
    }

    fn absorb(&mut self, other: &FinancialFigures) {
        self.rent_billed += other.rent_billed;
        self.collected += other.collected;
        self.outstanding += other.outstanding;
        self.expenses += other.expenses;
        self.net_operating_income += other.net_operating_income;
        self.occupied_units += other.occupied_units;
        self.total_units += other.total_units;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyFinancials {
    /// `None` for invoices not tied to a lease.
    pub property_id: Option<PropertyId>,
    pub property_name: String,
    #[serde(flatten)]
    pub figures: FinancialFigures,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub landlord_id: LandlordId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub properties: Vec<PropertyFinancials>,
    pub totals: FinancialFigures,
    pub occupancy_rate: f64,
}

const CSV_HEADER: [&str; 10] = [
    "property_id",
    "property",
    "rent_billed",
    "collected",
    "outstanding",
    "expenses",
    "net_operating_income",
    "occupied_units",
    "total_units",
    "occupancy_pct",
];

fn dollars(amount: Cents) -> String {
    let sign = if amount.value() < 0 { "-" } else { "" };
    let abs = amount.value().unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn csv_row(id: &str, name: &str, figures: &FinancialFigures) -> Vec<String> {
    vec![
        id.to_string(),
        name.to_string(),
        dollars(figures.rent_billed),
        dollars(figures.collected),
        dollars(figures.outstanding),
        dollars(figures.expenses),
        dollars(figures.net_operating_income),
        figures.occupied_units.to_string(),
        figures.total_units.to_string(),
        format!("{:.1}", figures.occupancy_rate() * 100.0),
    ]
}

impl FinancialReport {
    /// One row per property followed by a `TOTAL` row.
    pub fn to_csv(&self) -> Result<String, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for row in &self.properties {
            let id = row
                .property_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or_default();
            writer.write_record(csv_row(id, &row.property_name, &row.figures))?;
        }
        writer.write_record(csv_row("TOTAL", "All properties", &self.totals))?;
        let bytes = writer
            .into_inner()
            .map_err(|err| ReportError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| ReportError::Export(err.to_string()))
    }
}

/// Builds financial reports from billing, maintenance and marketplace records.
pub struct ReportingService {
    portfolio: Arc<dyn PortfolioRepository>,
    leases: Arc<dyn LeaseRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    tickets: Arc<dyn MaintenanceRepository>,
    marketplace: Arc<dyn MarketplaceRepository>,
}

impl ReportingService {
    pub fn new(
        portfolio: Arc<dyn PortfolioRepository>,
        leases: Arc<dyn LeaseRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        tickets: Arc<dyn MaintenanceRepository>,
        marketplace: Arc<dyn MarketplaceRepository>,
    ) -> Self {
        Self {
            portfolio,
            leases,
            invoices,
            tickets,
            marketplace,
        }
    }

    /// Figures for `from..=to`; unit occupancy reflects the current unit status.
    pub fn financial_report(
        &self,
        landlord_id: &LandlordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<FinancialReport, ReportError> {
        if to < from {
            return Err(ReportError::InvalidRange { from, to });
        }
        self.portfolio
            .landlord(landlord_id)?
            .ok_or_else(|| ReportError::LandlordNotFound(landlord_id.clone()))?;
        let in_range = |date: NaiveDate| from <= date && date <= to;

        let mut rows: BTreeMap<Option<PropertyId>, PropertyFinancials> = BTreeMap::new();
        for property in self.portfolio.properties_for_landlord(landlord_id)? {
            let units = self.portfolio.units_for_property(&property.id)?;
            let figures = FinancialFigures {
                occupied_units: units
                    .iter()
                    .filter(|unit| unit.status == UnitStatus::Occupied)
                    .count(),
                total_units: units.len(),
                ..FinancialFigures::default()
            };
            rows.insert(
                Some(property.id.clone()),
                PropertyFinancials {
                    property_id: Some(property.id),
                    property_name: property.name,
                    figures,
                    occupancy_rate: 0.0,
                },
            );
        }

        let lease_properties: BTreeMap<_, _> = self
            .leases
            .leases_for_landlord(landlord_id)?
            .into_iter()
            .map(|lease| (lease.id, lease.property_id))
            .collect();

        for invoice in self.invoices.invoices_for_landlord(landlord_id)? {
            if matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Void) {
                continue;
            }
            let property = invoice
                .lease_id
                .as_ref()
                .and_then(|lease| lease_properties.get(lease).cloned());
            let row = rows.entry(property.clone()).or_insert_with(|| PropertyFinancials {
                property_id: property,
                property_name: "Unassigned".to_string(),
                figures: FinancialFigures::default(),
                occupancy_rate: 0.0,
            });
            if in_range(invoice.period.unwrap_or(invoice.issue_date)) {
                row.figures.rent_billed += invoice.billed(LineItemKind::Rent);
            }
            row.figures.collected += invoice
                .payments
                .iter()
                .filter(|payment| in_range(payment.received_at.date_naive()))
                .map(|payment| payment.amount)
                .sum::<Cents>();
            if invoice.status.is_open() && invoice.issue_date <= to {
                row.figures.outstanding += invoice.balance();
            }
        }

        for ticket in self.tickets.tickets_for_landlord(landlord_id)? {
            let resolved = matches!(ticket.status, TicketStatus::Resolved | TicketStatus::Closed);
            let (Some(resolved_at), Some(cost)) = (ticket.resolved_at, ticket.cost) else {
                continue;
            };
            if resolved && in_range(resolved_at.date_naive()) {
                if let Some(row) = rows.get_mut(&Some(ticket.property_id)) {
                    row.figures.expenses += cost;
                }
            }
        }

        for booking in self.marketplace.bookings_for_landlord(landlord_id)? {
            let Some(completed_at) = booking.completed_at else {
                continue;
            };
            if booking.status == BookingStatus::Completed && in_range(completed_at.date_naive()) {
                if let Some(row) = rows.get_mut(&Some(booking.property_id)) {
                    row.figures.expenses += booking.estimate;
                }
            }
        }

        let mut totals = FinancialFigures::default();
        let mut properties = Vec::with_capacity(rows.len());
        // Unassigned (`None`) sorts first in the map; list it last.
        let mut unassigned = None;
        for (key, mut row) in rows {
            row.figures.net_operating_income = row.figures.collected - row.figures.expenses;
            row.occupancy_rate = row.figures.occupancy_rate();
            totals.absorb(&row.figures);
            if key.is_none() {
                unassigned = Some(row);
            } else {
                properties.push(row);
            }
        }
        properties.extend(unassigned);

        info!(
            landlord_id = %landlord_id,
            %from,
            %to,
            properties = properties.len(),
            noi = %totals.net_operating_income,
            "financial report built"
        );
        Ok(FinancialReport {
            landlord_id: landlord_id.clone(),
            from,
            to,
            properties,
            occupancy_rate: totals.occupancy_rate(),
            totals,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("landlord {0} not found")]
    LandlordNotFound(LandlordId),
    #[error("report range ends ({to}) before it starts ({from})")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
