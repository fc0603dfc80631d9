use super::{
    ClauseSet, ClauseTemplate, DepositRules, Disclosure, DisclosureCondition, LateFeeCap, Layer,
    LeaseContext,
};

/// Municipal ordinance layered on top of a state rule set.
#[derive(Debug, Clone)]
pub struct LocalRuleSet {
    pub state: &'static str,
    pub city: &'static str,
    pub name: &'static str,
    pub deposit: Option<DepositRules>,
    pub late_fee_cap: Option<LateFeeCap>,
    pub clauses: Vec<ClauseTemplate>,
}

impl ClauseSet for LocalRuleSet {
    fn name(&self) -> &str {
        self.name
    }

    fn layer(&self) -> Layer {
        Layer::Local
    }

    fn applies_to(&self, ctx: &LeaseContext) -> bool {
        ctx.state.as_str() == self.state && ctx.city.trim().eq_ignore_ascii_case(self.city)
    }

    fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
        self.clauses
            .iter()
            .filter(|clause| clause.condition.holds(ctx))
            .map(|clause| clause.render(ctx, Layer::Local, self.deposit.as_ref()))
            .collect()
    }

    fn deposit_rules(&self) -> Option<DepositRules> {
        self.deposit
    }

    fn late_fee_cap(&self) -> Option<LateFeeCap> {
        self.late_fee_cap
    }
}

pub(crate) fn standard_local_rules() -> Vec<LocalRuleSet> {
    vec![
        LocalRuleSet {
            state: "IL",
            city: "Chicago",
            name: "Chicago Residential Landlord and Tenant Ordinance",
            deposit: Some(DepositRules {
                cap_months: None,
                return_days: 45,
            }),
            late_fee_cap: None,
            clauses: vec![
                ClauseTemplate {
                    key: "chicago_rlto_summary",
                    title: "Residential Landlord and Tenant Ordinance Summary",
                    body: "A copy of the City of Chicago Residential Landlord and Tenant Ordinance summary, as published by the Commissioner of Housing, is attached to this lease.",
                    citation: Some("Chicago Mun. Code 5-12-170"),
                    acknowledgement_required: true,
                    condition: DisclosureCondition::Always,
                },
                ClauseTemplate {
                    key: "deposit_return",
                    title: "Security Deposit",
                    body: "Tenant has paid a security deposit of {deposit}. Landlord will hold the deposit in a federally insured account in Illinois, pay interest as required by ordinance, and return the deposit with any itemized deductions within {return_days} days after Tenant vacates.",
                    citation: Some("Chicago Mun. Code 5-12-080"),
                    acknowledgement_required: false,
                    condition: DisclosureCondition::Always,
                },
                ClauseTemplate {
                    key: "chicago_bed_bugs",
                    title: "Bed Bug Brochure",
                    body: "Tenant acknowledges receipt of the City of Chicago bed bug information brochure.",
                    citation: Some("Chicago Mun. Code 7-28-860"),
                    acknowledgement_required: false,
                    condition: DisclosureCondition::Always,
                },
            ],
        },
        LocalRuleSet {
            state: "NY",
            city: "New York",
            name: "New York City Housing Maintenance Code",
            deposit: None,
            late_fee_cap: None,
            clauses: vec![
                ClauseTemplate {
                    key: "nyc_bedbug_history",
                    title: "Bedbug Infestation History",
                    body: "Landlord discloses the bedbug infestation history of the premises and the building for the previous year on the form prescribed by the Division of Housing and Community Renewal.",
                    citation: Some("NYC Admin. Code 27-2018.1"),
                    acknowledgement_required: true,
                    condition: DisclosureCondition::Always,
                },
                ClauseTemplate {
                    key: "nyc_window_guards",
                    title: "Window Guards Required",
                    body: "Landlord is required by law to install window guards in the premises if a child ten years of age or younger lives in the apartment. Tenant must notify Landlord in writing if such a child lives or will live in the apartment.",
                    citation: Some("NYC Health Code 131.15"),
                    acknowledgement_required: true,
                    condition: DisclosureCondition::Always,
                },
                ClauseTemplate {
                    key: "nyc_lead_paint",
                    title: "Lead-Based Paint Annual Notice",
                    body: "Landlord must inspect the apartment for peeling paint and lead-based paint hazards at least once a year if a child under six resides in the apartment. Tenant must return the annual notice indicating whether such a child resides there.",
                    citation: Some("NYC Admin. Code 27-2056.4"),
                    acknowledgement_required: true,
                    condition: DisclosureCondition::BuiltBefore(1960),
                },
            ],
        },
    ]
}
