use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::portfolio::{Landlord, Property, Tenant, Unit};

use super::jurisdiction::{
    ClauseRegistry, Disclosure, JurisdictionError, LeaseContext, StateCode,
};

/// Charge applied when rent arrives after the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFee {
    pub grace_days: u8,
    pub amount: Cents,
}

/// Everything needed to assemble a residential lease.
#[derive(Debug, Clone)]
pub struct LeaseTerms {
    pub landlord: Landlord,
    pub property: Property,
    pub unit: Unit,
    pub tenants: Vec<Tenant>,
    pub start_date: NaiveDate,
    /// `None` for a month-to-month tenancy.
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Cents,
    pub security_deposit: Cents,
    pub rent_due_day: u8,
    pub late_fee: Option<LateFee>,
    pub pets_allowed: bool,
    pub utilities_included: Vec<String>,
    pub additional_terms: Vec<String>,
}

impl LeaseTerms {
    pub fn context(&self) -> LeaseContext {
        LeaseContext {
            state: self.property.address.state.clone(),
            city: self.property.address.city.clone(),
            year_built: self.property.year_built,
            flood_zone: self.property.flood_zone,
            shared_utilities: self.property.shared_utilities,
            pets_allowed: self.pets_allowed,
            tenant_count: self.tenants.len(),
            monthly_rent: self.monthly_rent,
            security_deposit: self.security_deposit,
        }
    }

    pub fn premises(&self) -> String {
        format!(
            "Unit {}, {}, {}",
            self.unit.label,
            self.property.name,
            self.property.address.one_line()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Landlord,
    Tenant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Party {
    pub role: PartyRole,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Parties,
    Premises,
    Term,
    Rent,
    SecurityDeposit,
    LateCharges,
    Utilities,
    Pets,
    JointAndSeveral,
    AdditionalTerms,
    Disclosures,
    Signatures,
}

impl SectionKind {
    pub const fn heading(self) -> &'static str {
        match self {
            SectionKind::Parties => "Parties",
            SectionKind::Premises => "Premises",
            SectionKind::Term => "Term",
            SectionKind::Rent => "Rent",
            SectionKind::SecurityDeposit => "Security Deposit",
            SectionKind::LateCharges => "Late Charges",
            SectionKind::Utilities => "Utilities",
            SectionKind::Pets => "Pets",
            SectionKind::JointAndSeveral => "Joint and Several Liability",
            SectionKind::AdditionalTerms => "Additional Terms",
            SectionKind::Disclosures => "Disclosures",
            SectionKind::Signatures => "Signatures",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseSection {
    pub kind: SectionKind,
    pub heading: &'static str,
    pub paragraphs: Vec<String>,
}

impl LeaseSection {
    fn new(kind: SectionKind, paragraphs: Vec<String>) -> Self {
        Self {
            kind,
            heading: kind.heading(),
            paragraphs,
        }
    }
}

/// Assembled lease content, independent of the output format.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseDraft {
    pub title: String,
    pub state: StateCode,
    pub parties: Vec<Party>,
    pub sections: Vec<LeaseSection>,
    pub disclosures: Vec<Disclosure>,
    pub joint_and_several: bool,
    pub generated_on: NaiveDate,
}

impl LeaseDraft {
    pub fn section(&self, kind: SectionKind) -> Option<&LeaseSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    pub fn headings(&self) -> Vec<&'static str> {
        self.sections.iter().map(|section| section.heading).collect()
    }

    pub fn acknowledgements_required(&self) -> usize {
        self.disclosures
            .iter()
            .filter(|disclosure| disclosure.acknowledgement_required)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseBuildError {
    #[error("a lease needs at least one tenant")]
    NoTenants,
    #[error("lease end date {end} must be after the start date {start}")]
    InvalidTerm { start: NaiveDate, end: NaiveDate },
    #[error("monthly rent must be greater than zero")]
    ZeroRent,
    #[error("security deposit cannot be negative")]
    NegativeDeposit,
    #[error("rent due day {0} must be between 1 and 28")]
    InvalidDueDay(u8),
    #[error("unit {unit} does not belong to property {property}")]
    UnitMismatch { unit: String, property: String },
    #[error("property {property} is not owned by landlord {landlord}")]
    LandlordMismatch { property: String, landlord: String },
    #[error(transparent)]
    Jurisdiction(#[from] JurisdictionError),
}

fn ordinal(day: u8) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

/// Validates lease terms and assembles the lease body with jurisdiction disclosures.
pub struct LeaseBuilder<'a> {
    registry: &'a ClauseRegistry,
}

impl<'a> LeaseBuilder<'a> {
    pub fn new(registry: &'a ClauseRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, terms: &LeaseTerms) -> Result<LeaseContext, LeaseBuildError> {
        if terms.tenants.is_empty() {
            return Err(LeaseBuildError::NoTenants);
        }
        if let Some(end) = terms.end_date {
            if end <= terms.start_date {
                return Err(LeaseBuildError::InvalidTerm {
                    start: terms.start_date,
                    end,
                });
            }
        }
        if !terms.monthly_rent.is_positive() {
            return Err(LeaseBuildError::ZeroRent);
        }
        if terms.security_deposit < Cents::ZERO {
            return Err(LeaseBuildError::NegativeDeposit);
        }
        if !(1..=28).contains(&terms.rent_due_day) {
            return Err(LeaseBuildError::InvalidDueDay(terms.rent_due_day));
        }
        if terms.unit.property_id != terms.property.id {
            return Err(LeaseBuildError::UnitMismatch {
                unit: terms.unit.id.to_string(),
                property: terms.property.id.to_string(),
            });
        }
        if terms.property.landlord_id != terms.landlord.id {
            return Err(LeaseBuildError::LandlordMismatch {
                property: terms.property.id.to_string(),
                landlord: terms.landlord.id.to_string(),
            });
        }

        let ctx = terms.context();
        self.registry.check_deposit(&ctx)?;
        if let Some(late_fee) = terms.late_fee {
            self.registry.check_late_fee(&ctx, late_fee.amount)?;
        }
        Ok(ctx)
    }

    /// Full residential lease with the disclosures embedded.
    pub fn build(
        &self,
        terms: &LeaseTerms,
        generated_on: NaiveDate,
    ) -> Result<LeaseDraft, LeaseBuildError> {
        let ctx = self.validate(terms)?;
        let disclosures = self.registry.disclosures_for(&ctx);
        let joint_and_several = terms.tenants.len() > 1;

        let mut sections = vec![
            LeaseSection::new(SectionKind::Parties, vec![parties_paragraph(terms, generated_on)]),
            LeaseSection::new(SectionKind::Premises, vec![premises_paragraph(terms)]),
            LeaseSection::new(SectionKind::Term, vec![term_paragraph(terms)]),
            LeaseSection::new(SectionKind::Rent, rent_paragraphs(terms)),
            LeaseSection::new(
                SectionKind::SecurityDeposit,
                vec![self.deposit_paragraph(terms, &ctx)],
            ),
        ];

        if let Some(late_fee) = terms.late_fee {
            sections.push(LeaseSection::new(
                SectionKind::LateCharges,
                vec![format!(
                    "If rent is not received within {} days after the due date, Tenant shall pay a late charge of {}. Landlord will not charge more than one late fee for any single month of rent.",
                    late_fee.grace_days, late_fee.amount
                )],
            ));
        }

        sections.push(LeaseSection::new(
            SectionKind::Utilities,
            utilities_paragraphs(terms),
        ));
        sections.push(LeaseSection::new(SectionKind::Pets, vec![pets_paragraph(terms)]));

        if joint_and_several {
            sections.push(LeaseSection::new(
                SectionKind::JointAndSeveral,
                vec!["Each Tenant is jointly and severally liable for every obligation under this lease, including the full amount of rent and any damages, regardless of any arrangement among the Tenants. Notice given to or by any one Tenant is notice to or by all Tenants.".to_string()],
            ));
        }

        let additional: Vec<String> = terms
            .additional_terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect();
        if !additional.is_empty() {
            sections.push(LeaseSection::new(SectionKind::AdditionalTerms, additional));
        }

        sections.push(LeaseSection::new(
            SectionKind::Disclosures,
            vec![disclosure_intro(&ctx)],
        ));
        sections.push(LeaseSection::new(
            SectionKind::Signatures,
            vec![signature_paragraph()],
        ));

        Ok(LeaseDraft {
            title: format!("Residential Lease Agreement - {}", terms.premises()),
            state: ctx.state,
            parties: parties(terms),
            sections,
            disclosures,
            joint_and_several,
            generated_on,
        })
    }

    /// Disclosure addendum attached to a landlord-supplied lease document.
    pub fn build_addendum(
        &self,
        terms: &LeaseTerms,
        generated_on: NaiveDate,
    ) -> Result<LeaseDraft, LeaseBuildError> {
        let ctx = self.validate(terms)?;
        let disclosures = self.registry.disclosures_for(&ctx);

        let sections = vec![
            LeaseSection::new(
                SectionKind::Parties,
                vec![format!(
                    "This addendum is made on {} and forms part of the lease between {} (\"Landlord\") and {} for the premises described below. Where this addendum conflicts with the lease, this addendum controls.",
                    long_date(generated_on),
                    terms.landlord.display_name(),
                    join_names(&tenant_names(terms)),
                )],
            ),
            LeaseSection::new(SectionKind::Premises, vec![premises_paragraph(terms)]),
            LeaseSection::new(SectionKind::Disclosures, vec![disclosure_intro(&ctx)]),
            LeaseSection::new(SectionKind::Signatures, vec![signature_paragraph()]),
        ];

        Ok(LeaseDraft {
            title: format!("Lease Disclosure Addendum - {}", terms.premises()),
            state: ctx.state,
            parties: parties(terms),
            sections,
            disclosures,
            joint_and_several: terms.tenants.len() > 1,
            generated_on,
        })
    }

    fn deposit_paragraph(&self, terms: &LeaseTerms, ctx: &LeaseContext) -> String {
        if terms.security_deposit == Cents::ZERO {
            return "No security deposit is required for this tenancy.".to_string();
        }
        let rules = self.registry.deposit_rules_for(ctx);
        format!(
            "Tenant shall pay a security deposit of {} before taking possession. Landlord will return the deposit, less lawful deductions itemized in writing, within {} days after the tenancy ends as described in the Security Deposit disclosure.",
            terms.security_deposit, rules.return_days
        )
    }
}

fn tenant_names(terms: &LeaseTerms) -> Vec<&str> {
    terms
        .tenants
        .iter()
        .map(|tenant| tenant.full_name.as_str())
        .collect()
}

fn parties(terms: &LeaseTerms) -> Vec<Party> {
    let mut parties = vec![Party {
        role: PartyRole::Landlord,
        name: terms.landlord.display_name().to_string(),
        email: terms.landlord.email.clone(),
    }];
    parties.extend(terms.tenants.iter().map(|tenant| Party {
        role: PartyRole::Tenant,
        name: tenant.full_name.clone(),
        email: tenant.email.clone(),
    }));
    parties
}

fn parties_paragraph(terms: &LeaseTerms, generated_on: NaiveDate) -> String {
    let tenants = tenant_names(terms);
    let tenant_label = if tenants.len() > 1 {
        "(each a \"Tenant\" and together the \"Tenants\")"
    } else {
        "(\"Tenant\")"
    };
    format!(
        "This Residential Lease Agreement is made on {} between {} (\"Landlord\") and {} {}.",
        long_date(generated_on),
        terms.landlord.display_name(),
        join_names(&tenants),
        tenant_label
    )
}

fn premises_paragraph(terms: &LeaseTerms) -> String {
    format!(
        "Landlord leases to Tenant the dwelling known as {} (the \"Premises\"), with {} bedroom(s) and {} bathroom(s), together with shared use of common areas.",
        terms.premises(),
        terms.unit.bedrooms,
        terms.unit.bathrooms
    )
}

fn term_paragraph(terms: &LeaseTerms) -> String {
    match terms.end_date {
        Some(end) => format!(
            "The lease term begins on {} and ends on {}.",
            long_date(terms.start_date),
            long_date(end)
        ),
        None => format!(
            "The tenancy begins on {} and continues from month to month until either party ends it with the written notice required by {} law.",
            long_date(terms.start_date),
            terms.property.address.state
        ),
    }
}

fn rent_paragraphs(terms: &LeaseTerms) -> Vec<String> {
    vec![
        format!(
            "Tenant shall pay monthly rent of {}, due in advance on the {} day of each month.",
            terms.monthly_rent,
            ordinal(terms.rent_due_day)
        ),
        "Rent is paid through the Landlord's online payment portal or by any other method Landlord accepts in writing.".to_string(),
    ]
}

fn utilities_paragraphs(terms: &LeaseTerms) -> Vec<String> {
    let included: Vec<&str> = terms
        .utilities_included
        .iter()
        .map(|utility| utility.trim())
        .filter(|utility| !utility.is_empty())
        .collect();
    let mut paragraphs = vec![if included.is_empty() {
        "Tenant is responsible for all utilities and services to the Premises.".to_string()
    } else {
        format!(
            "Landlord will provide {}. Tenant is responsible for all other utilities and services.",
            join_names(&included)
        )
    }];
    if terms.property.shared_utilities {
        paragraphs.push("Some utility meters serve areas outside the Premises; shared charges are allocated as stated in the disclosures below.".to_string());
    }
    paragraphs
}

fn pets_paragraph(terms: &LeaseTerms) -> String {
    if terms.pets_allowed {
        "Pets are permitted with Landlord's prior written approval of each animal. Tenant is responsible for any damage caused by a pet.".to_string()
    } else {
        "No pets are permitted on the Premises. Assistance animals are not pets and are permitted as a reasonable accommodation.".to_string()
    }
}

fn disclosure_intro(ctx: &LeaseContext) -> String {
    format!(
        "Landlord makes the following disclosures required by federal law and the laws of {}. Each Tenant must initial every disclosure marked for acknowledgement.",
        ctx.state
    )
}

fn signature_paragraph() -> String {
    "By signing below, the parties agree to every term of this lease. Electronic signatures have the same force as handwritten signatures.".to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::money::Cents;
    use crate::portfolio::{
        Address, Landlord, LandlordId, Property, PropertyId, Tenant, TenantId, Unit, UnitId,
        UnitStatus,
    };

    use super::{LateFee, LeaseTerms};

    pub(crate) fn tenant(id: &str, name: &str) -> Tenant {
        Tenant {
            id: TenantId(id.to_string()),
            full_name: name.to_string(),
            email: format!("{}@example.com", id),
            phone: None,
        }
    }

    pub(crate) fn terms(state: &str, city: &str) -> LeaseTerms {
        let landlord = Landlord {
            id: LandlordId("ll-fixture".to_string()),
            name: "Dana Ortiz".to_string(),
            email: "dana@example.com".to_string(),
            company_name: Some("Ortiz Rentals LLC".to_string()),
        };
        let property = Property {
            id: PropertyId("prop-fixture".to_string()),
            landlord_id: landlord.id.clone(),
            name: "Maple Court".to_string(),
            address: Address {
                line1: "14 Maple Ct".to_string(),
                line2: None,
                city: city.to_string(),
                state: state.parse().expect("state"),
                postal_code: "00000".to_string(),
            },
            year_built: Some(1992),
            flood_zone: false,
            shared_utilities: false,
            default_lease_document: None,
        };
        let unit = Unit {
            id: UnitId("unit-fixture".to_string()),
            property_id: property.id.clone(),
            label: "2B".to_string(),
            bedrooms: 2,
            bathrooms: 1.5,
            market_rent: Cents::from_dollars(1_200),
            status: UnitStatus::Vacant,
        };

        LeaseTerms {
            landlord,
            property,
            unit,
            tenants: vec![tenant("ten-a", "Avery Chen")],
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 31),
            monthly_rent: Cents::from_dollars(1_200),
            security_deposit: Cents::from_dollars(1_200),
            rent_due_day: 1,
            late_fee: Some(LateFee {
                grace_days: 5,
                amount: Cents::from_dollars(50),
            }),
            pets_allowed: false,
            utilities_included: vec!["water".to_string(), "trash removal".to_string()],
            additional_terms: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{tenant, terms};
    use super::*;

    fn generated_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).expect("date")
    }

    #[test]
    fn sections_follow_lease_order() {
        let registry = ClauseRegistry::standard();
        let mut terms = terms("IA", "Des Moines");
        terms.tenants.push(tenant("ten-b", "Blake Chen"));
        terms.additional_terms = vec!["Tenant maintains the lawn.".to_string()];

        let draft = LeaseBuilder::new(&registry)
            .build(&terms, generated_on())
            .expect("draft");

        assert_eq!(
            draft.headings(),
            vec![
                "Parties",
                "Premises",
                "Term",
                "Rent",
                "Security Deposit",
                "Late Charges",
                "Utilities",
                "Pets",
                "Joint and Several Liability",
                "Additional Terms",
                "Disclosures",
                "Signatures",
            ]
        );
        assert!(draft.joint_and_several);
        assert_eq!(draft.parties.len(), 3);
    }

    #[test]
    fn optional_sections_are_omitted() {
        let registry = ClauseRegistry::standard();
        let mut terms = terms("TX", "Austin");
        terms.late_fee = None;

        let draft = LeaseBuilder::new(&registry)
            .build(&terms, generated_on())
            .expect("draft");

        assert!(draft.section(SectionKind::LateCharges).is_none());
        assert!(draft.section(SectionKind::JointAndSeveral).is_none());
        assert!(draft.section(SectionKind::AdditionalTerms).is_none());
        assert!(!draft.joint_and_several);
    }

    #[test]
    fn month_to_month_term_language() {
        let registry = ClauseRegistry::standard();
        let mut terms = terms("WA", "Spokane");
        terms.end_date = None;

        let draft = LeaseBuilder::new(&registry)
            .build(&terms, generated_on())
            .expect("draft");
        let term = draft.section(SectionKind::Term).expect("term");
        assert!(term.paragraphs[0].contains("month to month"));
        assert!(term.paragraphs[0].contains("June 1, 2024"));
    }

    #[test]
    fn rent_due_day_is_ordinal() {
        let registry = ClauseRegistry::standard();
        let mut terms = terms("OH", "Columbus");
        terms.rent_due_day = 3;
        let draft = LeaseBuilder::new(&registry)
            .build(&terms, generated_on())
            .expect("draft");
        let rent = draft.section(SectionKind::Rent).expect("rent");
        assert!(rent.paragraphs[0].contains("3rd day"));
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn validation_errors() {
        let registry = ClauseRegistry::standard();
        let builder = LeaseBuilder::new(&registry);

        let mut no_tenants = terms("OH", "Columbus");
        no_tenants.tenants.clear();
        assert_eq!(
            builder.build(&no_tenants, generated_on()).unwrap_err(),
            LeaseBuildError::NoTenants
        );

        let mut bad_term = terms("OH", "Columbus");
        bad_term.end_date = Some(bad_term.start_date);
        assert!(matches!(
            builder.build(&bad_term, generated_on()),
            Err(LeaseBuildError::InvalidTerm { .. })
        ));

        let mut zero_rent = terms("OH", "Columbus");
        zero_rent.monthly_rent = Cents::ZERO;
        assert_eq!(
            builder.build(&zero_rent, generated_on()).unwrap_err(),
            LeaseBuildError::ZeroRent
        );

        let mut due_day = terms("OH", "Columbus");
        due_day.rent_due_day = 29;
        assert_eq!(
            builder.build(&due_day, generated_on()).unwrap_err(),
            LeaseBuildError::InvalidDueDay(29)
        );

        let mut mismatch = terms("OH", "Columbus");
        mismatch.unit.property_id = crate::portfolio::PropertyId("prop-other".to_string());
        assert!(matches!(
            builder.build(&mismatch, generated_on()),
            Err(LeaseBuildError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn jurisdiction_caps_block_the_lease() {
        let registry = ClauseRegistry::standard();
        let builder = LeaseBuilder::new(&registry);

        let mut deposit = terms("MA", "Boston");
        deposit.security_deposit = Cents::from_dollars(2_400);
        assert!(matches!(
            builder.build(&deposit, generated_on()),
            Err(LeaseBuildError::Jurisdiction(
                JurisdictionError::DepositCapExceeded { .. }
            ))
        ));

        let mut late_fee = terms("IA", "Ames");
        late_fee.late_fee = Some(LateFee {
            grace_days: 3,
            amount: Cents::from_dollars(150),
        });
        assert!(matches!(
            builder.build(&late_fee, generated_on()),
            Err(LeaseBuildError::Jurisdiction(
                JurisdictionError::LateFeeCapExceeded { .. }
            ))
        ));
    }

    #[test]
    fn addendum_carries_disclosures_only() {
        let registry = ClauseRegistry::standard();
        let draft = LeaseBuilder::new(&registry)
            .build_addendum(&terms("CA", "Oakland"), generated_on())
            .expect("addendum");
        assert_eq!(
            draft.headings(),
            vec!["Parties", "Premises", "Disclosures", "Signatures"]
        );
        assert!(draft.title.starts_with("Lease Disclosure Addendum"));
        assert!(draft
            .disclosures
            .iter()
            .any(|disclosure| disclosure.key == "ca_megans_law"));
    }
}
