use super::{ClauseSet, ClauseTemplate, Disclosure, DisclosureCondition, LeaseContext, Layer};

const FEDERAL_CLAUSES: [ClauseTemplate; 2] = [
    ClauseTemplate {
        key: "fair_housing",
        title: "Equal Housing Opportunity",
        body: "Landlord does not discriminate on the basis of race, color, religion, sex, national origin, familial status, or disability in the rental of this dwelling, and will consider reasonable accommodation and modification requests made by or on behalf of Tenant.",
        citation: Some("42 U.S.C. 3601-3619"),
        acknowledgement_required: false,
        condition: DisclosureCondition::Always,
    },
    ClauseTemplate {
        key: "lead_based_paint",
        title: "Disclosure of Information on Lead-Based Paint and Lead-Based Paint Hazards",
        body: "Housing built before 1978 may contain lead-based paint. Lead from paint, paint chips, and dust can pose health hazards if not managed properly. Lead exposure is especially harmful to young children and pregnant women. Before renting pre-1978 housing, Landlord must disclose the presence of known lead-based paint and lead-based paint hazards in the dwelling, and Tenant must receive the federally approved pamphlet \"Protect Your Family From Lead in Your Home\". Landlord has no reports or records pertaining to lead-based paint hazards in the housing other than those provided with this lease.",
        citation: Some("42 U.S.C. 4852d; 24 CFR Part 35; 40 CFR Part 745"),
        acknowledgement_required: true,
        condition: DisclosureCondition::BuiltBefore(1978),
    },
];

/// Notices required for every residential lease in the United States.
#[derive(Debug, Default, Clone, Copy)]
pub struct FederalClauses;

impl ClauseSet for FederalClauses {
    fn name(&self) -> &str {
        "United States"
    }

    fn layer(&self) -> Layer {
        Layer::Federal
    }

    fn applies_to(&self, _ctx: &LeaseContext) -> bool {
        true
    }

    fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
        FEDERAL_CLAUSES
            .iter()
            .filter(|clause| clause.condition.holds(ctx))
            .map(|clause| clause.render(ctx, Layer::Federal, None))
            .collect()
    }
}
