use crate::infra::{parse_date, Platform};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use rentwise::config::AppConfig;
use rentwise::error::AppError;
use rentwise::money::Cents;
use rentwise::notifications::InMemoryMailer;
use rentwise::portfolio::{
    Address, Landlord, LandlordId, NewLandlord, NewProperty, NewTenant, NewUnit, Property,
    PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use rentwise::workflows::applications::{ApplicationSubmission, ApprovalRequest};
use rentwise::workflows::billing::month_start;
use rentwise::workflows::leasing::jurisdiction::ClauseRegistry;
use rentwise::workflows::leasing::render::render_html;
use rentwise::workflows::leasing::{LateFee, LeaseBuilder, LeaseTerms};
use rentwise::workflows::maintenance::{NewTicket, Priority};
use rentwise::workflows::marketplace::{
    BookingRequest, CancellationPolicy, CancelledBy, DepositPolicy, NewContractor,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Lease start date (YYYY-MM-DD). Defaults to the first of next month.
    #[arg(long, value_parser = parse_date)]
    pub(crate) move_in: Option<NaiveDate>,
    /// Two-letter state for the demo property.
    #[arg(long, default_value = "NY")]
    pub(crate) state: String,
    /// Monthly rent in whole dollars.
    #[arg(long, default_value_t = 1_500)]
    pub(crate) rent: i64,
    /// Print the financial report as CSV instead of a summary.
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LeasePreviewArgs {
    /// Two-letter state whose clauses apply
    #[arg(long)]
    pub(crate) state: String,
    /// City of the premises; some cities add local disclosures
    #[arg(long, default_value = "Springfield")]
    pub(crate) city: String,
    /// Monthly rent in whole dollars
    #[arg(long, default_value_t = 1_500)]
    pub(crate) rent: i64,
    /// Security deposit in whole dollars (defaults to one month of rent)
    #[arg(long)]
    pub(crate) deposit: Option<i64>,
    /// Year the building was constructed
    #[arg(long)]
    pub(crate) year_built: Option<u16>,
    /// Premises sit in a flood zone
    #[arg(long)]
    pub(crate) flood_zone: bool,
    /// Pets are allowed
    #[arg(long)]
    pub(crate) pets: bool,
    /// Number of tenants signing
    #[arg(long, default_value_t = 1)]
    pub(crate) tenants: u8,
    /// Lease start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Print the section outline and disclosures instead of HTML
    #[arg(long)]
    pub(crate) outline: bool,
}

pub(crate) fn run_lease_states() -> Result<(), AppError> {
    let states: Vec<String> = ClauseRegistry::covered_states()
        .into_iter()
        .map(|state| state.to_string())
        .collect();
    println!("{} states with dedicated clause sets:", states.len());
    println!("{}", states.join(", "));
    Ok(())
}

pub(crate) fn run_lease_preview(args: LeasePreviewArgs) -> Result<(), AppError> {
    let start = args.start.unwrap_or_else(|| Local::now().date_naive());
    let rent = Cents::from_dollars(args.rent);
    let deposit = args.deposit.map(Cents::from_dollars).unwrap_or(rent);
    let state = args.state.parse().map_err(AppError::workflow)?;

    let landlord = Landlord {
        id: LandlordId("ll-preview".to_string()),
        name: "Sample Landlord".to_string(),
        email: "landlord@example.com".to_string(),
        company_name: None,
    };
    let property = Property {
        id: PropertyId("prop-preview".to_string()),
        landlord_id: landlord.id.clone(),
        name: "Sample Property".to_string(),
        address: Address {
            line1: "100 Main St".to_string(),
            line2: None,
            city: args.city,
            state,
            postal_code: "00000".to_string(),
        },
        year_built: args.year_built,
        flood_zone: args.flood_zone,
        shared_utilities: false,
        default_lease_document: None,
    };
    let unit = Unit {
        id: UnitId("unit-preview".to_string()),
        property_id: property.id.clone(),
        label: "1A".to_string(),
        bedrooms: 2,
        bathrooms: 1.0,
        market_rent: rent,
        status: UnitStatus::Vacant,
    };
    let tenants = (1..=args.tenants.max(1))
        .map(|n| Tenant {
            id: TenantId(format!("ten-preview-{n}")),
            full_name: format!("Tenant {n}"),
            email: format!("tenant{n}@example.com"),
            phone: None,
        })
        .collect();
    let terms = LeaseTerms {
        landlord,
        property,
        unit,
        tenants,
        start_date: start,
        end_date: start
            .checked_add_months(chrono::Months::new(12))
            .and_then(|date| date.pred_opt()),
        monthly_rent: rent,
        security_deposit: deposit,
        rent_due_day: 1,
        late_fee: None,
        pets_allowed: args.pets,
        utilities_included: Vec::new(),
        additional_terms: Vec::new(),
    };

    let registry = ClauseRegistry::standard();
    let draft = LeaseBuilder::new(&registry)
        .build(&terms, start)
        .map_err(AppError::workflow)?;

    if !args.outline {
        println!("{}", render_html(&draft).map_err(AppError::workflow)?);
        return Ok(());
    }

    println!("{} ({})", draft.title, draft.state);
    for (index, section) in draft.sections.iter().enumerate() {
        println!("{:>2}. {}", index + 1, section.heading);
    }
    if draft.disclosures.is_empty() {
        println!("No jurisdiction disclosures apply.");
    } else {
        println!("Disclosures:");
        for disclosure in &draft.disclosures {
            let citation = disclosure
                .citation
                .as_deref()
                .map(|citation| format!(" [{citation}]"))
                .unwrap_or_default();
            println!("  - {}{}", disclosure.title, citation);
        }
    }
    Ok(())
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let naive = date.and_hms_opt(hour, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&naive)
}

fn next_month_start(today: NaiveDate) -> NaiveDate {
    month_start(today)
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(today)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let move_in = args
        .move_in
        .unwrap_or_else(|| next_month_start(Local::now().date_naive()));
    let rent = Cents::from_dollars(args.rent);
    let submitted = move_in - Duration::days(21);

    let mut config = AppConfig::load()?;
    config.reminders.interval_secs = 0;
    let mailer = InMemoryMailer::default();
    let platform = Platform::in_memory(&config, Arc::new(mailer.clone()));

    println!("Rentwise demo: one unit from application to month-end report");

    let landlord = platform
        .portfolio
        .register_landlord(NewLandlord {
            name: "Dana Ortiz".to_string(),
            email: "dana@example.com".to_string(),
            company_name: Some("Ortiz Rentals LLC".to_string()),
        })
        .map_err(AppError::workflow)?;
    let property = platform
        .portfolio
        .add_property(NewProperty {
            landlord_id: landlord.id.clone(),
            name: "Maple Court".to_string(),
            address: Address {
                line1: "14 Maple Ct".to_string(),
                line2: None,
                city: "Albany".to_string(),
                state: args.state.parse().map_err(AppError::workflow)?,
                postal_code: "12207".to_string(),
            },
            year_built: Some(1962),
            flood_zone: false,
            shared_utilities: false,
        })
        .map_err(AppError::workflow)?;
    let unit = platform
        .portfolio
        .add_unit(NewUnit {
            property_id: property.id.clone(),
            label: "2B".to_string(),
            bedrooms: 2,
            bathrooms: 1.0,
            market_rent: rent,
        })
        .map_err(AppError::workflow)?;
    let applicant = platform
        .portfolio
        .add_tenant(NewTenant {
            full_name: "Avery Chen".to_string(),
            email: "avery@example.com".to_string(),
            phone: None,
        })
        .map_err(AppError::workflow)?;
    println!(
        "\nPortfolio: {} | {} unit {} at {}/month",
        landlord.display_name(),
        property.address.one_line(),
        unit.label,
        rent
    );

    let application = platform
        .applications
        .submit(
            ApplicationSubmission {
                unit_id: unit.id.clone(),
                applicant: applicant.id.clone(),
                co_applicants: Vec::new(),
                desired_move_in: move_in,
                monthly_income: rent.times(4),
                credit_score: Some(728),
                prior_evictions: 0,
            },
            at(submitted, 10),
        )
        .map_err(AppError::workflow)?;
    println!(
        "Application {} screened: {} (score {}, rent-to-income {:.0}%)",
        application.id,
        application.screening.recommendation.summary(),
        application.screening.total_score,
        application.screening.rent_to_income * 100.0
    );

    let outcome = platform
        .applications
        .approve(
            &application.id,
            ApprovalRequest {
                late_fee: Some(LateFee {
                    grace_days: 5,
                    amount: Cents::from_dollars(50),
                }),
                ..ApprovalRequest::default()
            },
            at(submitted + Duration::days(1), 9),
        )
        .map_err(AppError::workflow)?;
    let lease = outcome.lease;
    println!(
        "Approved: lease {} generated and sent to {} signers",
        lease.id,
        outcome.signature_requests.len()
    );

    let (tenant_requests, landlord_requests): (Vec<_>, Vec<_>) = outcome
        .signature_requests
        .into_iter()
        .partition(|request| request.role.is_tenant());
    let signed_at = at(submitted + Duration::days(2), 18);
    for request in tenant_requests.iter().chain(landlord_requests.iter()) {
        let signed = platform
            .signing
            .sign(
                &request.id,
                &request.signer_name,
                &lease.document_digest,
                signed_at,
            )
            .map_err(AppError::workflow)?;
        println!(
            "  {} signed as {} -> lease {}",
            request.signer_name,
            request.role.label(),
            signed.lease_status.label()
        );
    }
    let unit = platform
        .portfolio
        .unit(&unit.id)
        .map_err(AppError::workflow)?;
    println!("Unit {} is now {}", unit.label, unit.status.label());

    let invoices = platform
        .billing
        .generate_rent_invoices(move_in, move_in, at(move_in, 6))
        .map_err(AppError::workflow)?;
    let Some(invoice) = invoices.first() else {
        return Err(AppError::workflow("rent run produced no invoice"));
    };
    println!(
        "\nRent run for {}: invoice {} for {} due {}",
        move_in.format("%B %Y"),
        invoice.number,
        invoice.total(),
        invoice.due_date
    );

    for offset in [-3_i64, 0, 1] {
        let today = invoice.due_date + Duration::days(offset);
        let summary = platform
            .reminders
            .run(today, at(today, 8))
            .map_err(AppError::workflow)?;
        println!(
            "Reminder run {today}: {} sent, {} skipped, {} failed",
            summary.sent, summary.skipped, summary.failed
        );
    }

    let late_day = invoice.due_date + Duration::days(6);
    let charged = platform
        .billing
        .apply_late_fees(late_day)
        .map_err(AppError::workflow)?;
    for invoice in &charged {
        println!(
            "Late fee applied to {} on {late_day}: balance now {}",
            invoice.number,
            invoice.balance()
        );
    }
    let invoice = platform
        .billing
        .invoice(&invoice.id)
        .map_err(AppError::workflow)?;
    let paid = platform
        .billing
        .record_payment(
            &invoice.id,
            invoice.balance(),
            at(late_day, 14),
            "ach",
            Some("ACH-4471".to_string()),
        )
        .map_err(AppError::workflow)?;
    println!(
        "Payment of {} received: invoice {}",
        paid.paid(),
        paid.status.label()
    );

    let contractor = platform
        .bookings
        .register_contractor(NewContractor {
            name: "Reliable Plumbing".to_string(),
            email: "dispatch@reliableplumbing.example".to_string(),
            trade: "plumbing".to_string(),
            hourly_rate: Cents::from_dollars(95),
            instant_booking: true,
            deposit_policy: DepositPolicy::PercentOfEstimate(25),
            cancellation_policy: CancellationPolicy::Moderate,
        })
        .map_err(AppError::workflow)?;
    let reported = move_in + Duration::days(12);
    platform
        .bookings
        .add_availability(
            &contractor.id,
            at(reported, 0),
            at(reported + Duration::days(7), 0),
        )
        .map_err(AppError::workflow)?;
    let tentative = platform
        .bookings
        .book_instant(
            BookingRequest {
                contractor_id: contractor.id.clone(),
                landlord_id: landlord.id.clone(),
                property_id: property.id.clone(),
                customer_email: landlord.email.clone(),
                starts_at: at(reported + Duration::days(3), 9),
                ends_at: at(reported + Duration::days(3), 11),
            },
            at(reported, 8),
        )
        .map_err(AppError::workflow)?;
    let cancelled = platform
        .bookings
        .cancel(&tentative.id, CancelledBy::Customer, at(reported + Duration::days(1), 8))
        .map_err(AppError::workflow)?;
    if let Some(refund) = &cancelled.refund {
        println!(
            "\nCancelled booking {} ({} policy): {}% of the {} deposit refunded",
            cancelled.id,
            contractor.cancellation_policy.label(),
            refund.percent,
            cancelled.deposit
        );
    }
    let ticket = platform
        .maintenance
        .open(
            NewTicket {
                property_id: property.id.clone(),
                unit_id: Some(unit.id.clone()),
                title: "Kitchen sink leaking".to_string(),
                description: "Water pooling under the cabinet".to_string(),
                priority: Priority::High,
            },
            at(reported, 9),
        )
        .map_err(AppError::workflow)?;
    let booking = platform
        .bookings
        .book_instant(
            BookingRequest {
                contractor_id: contractor.id.clone(),
                landlord_id: landlord.id.clone(),
                property_id: property.id.clone(),
                customer_email: landlord.email.clone(),
                starts_at: at(reported + Duration::days(1), 13),
                ends_at: at(reported + Duration::days(1), 15),
            },
            at(reported, 10),
        )
        .map_err(AppError::workflow)?;
    println!(
        "Ticket {} ({}) due by {}; booked {} for {} with {} deposit",
        ticket.id,
        ticket.priority.label(),
        ticket.due_by.format("%Y-%m-%d %H:%M"),
        contractor.name,
        booking.estimate,
        booking.deposit
    );
    let visit = reported + Duration::days(1);
    platform
        .maintenance
        .assign(
            &ticket.id,
            &contractor.id,
            Some(booking.id.clone()),
            at(reported, 10),
        )
        .map_err(AppError::workflow)?;
    platform
        .maintenance
        .start(&ticket.id, at(visit, 13))
        .map_err(AppError::workflow)?;
    platform
        .bookings
        .complete(&booking.id, at(visit, 15))
        .map_err(AppError::workflow)?;
    let resolved = platform
        .maintenance
        .resolve(
            &ticket.id,
            booking.estimate,
            Some("Replaced trap and supply line".to_string()),
            at(visit, 15),
        )
        .map_err(AppError::workflow)?;
    println!(
        "Ticket {} {} at a cost of {}",
        resolved.id,
        resolved.status.label(),
        booking.estimate
    );

    let period_end = month_start(move_in)
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(move_in);
    let report = platform
        .reporting
        .financial_report(&landlord.id, month_start(move_in), period_end)
        .map_err(AppError::workflow)?;
    if args.csv {
        println!("\n{}", report.to_csv().map_err(AppError::workflow)?);
    } else {
        let totals = &report.totals;
        println!(
            "\nFinancial report {} to {} ({} days)",
            report.from,
            report.to,
            period_end.day()
        );
        println!(
            "- Rent billed {} | collected {} | outstanding {}",
            totals.rent_billed, totals.collected, totals.outstanding
        );
        println!(
            "- Expenses {} | net operating income {}",
            totals.expenses, totals.net_operating_income
        );
        println!(
            "- Occupancy {:.0}% ({} of {} units)",
            report.occupancy_rate * 100.0,
            totals.occupied_units,
            totals.total_units
        );
    }

    let mut by_tag: BTreeMap<&str, usize> = BTreeMap::new();
    for message in mailer.outbox() {
        *by_tag.entry(message.tag).or_default() += 1;
    }
    println!("\nEmails queued:");
    for (tag, count) in by_tag {
        println!("  - {tag}: {count}");
    }

    Ok(())
}
