use crate::money::Cents;

use super::{
    fill_placeholders, ClauseSet, ClauseTemplate, DepositRules, Disclosure, DisclosureCondition,
    LateFeeCap, Layer, LeaseContext, StateCode,
};

use DisclosureCondition::{Always, BuiltBefore, FloodZone, SharedUtilities};

const DEPOSIT_RETURN_BODY: &str = "Tenant has paid a security deposit of {deposit}. Landlord will return the deposit, less any lawful deductions itemized in writing, within {return_days} days after the tenancy ends and Tenant surrenders possession and provides a forwarding address.";

/// Data-driven clause set for one state.
#[derive(Debug, Clone)]
pub struct StateRuleSet {
    pub state: &'static str,
    pub name: &'static str,
    pub deposit: DepositRules,
    pub late_fee_cap: Option<LateFeeCap>,
    pub deposit_citation: &'static str,
    pub clauses: Vec<ClauseTemplate>,
}

impl StateRuleSet {
    fn deposit_disclosure(&self, ctx: &LeaseContext) -> Disclosure {
        let mut body = fill_placeholders(DEPOSIT_RETURN_BODY, ctx, Some(&self.deposit));
        if let Some(max) = self.deposit.max_deposit(ctx.monthly_rent) {
            body.push_str(&format!(
                " {} law limits the deposit for this tenancy to {}.",
                self.name, max
            ));
        }

        Disclosure {
            key: "deposit_return".to_string(),
            title: "Security Deposit".to_string(),
            body,
            citation: Some(self.deposit_citation.to_string()),
            acknowledgement_required: false,
            layer: Layer::State,
        }
    }
}

impl ClauseSet for StateRuleSet {
    fn name(&self) -> &str {
        self.name
    }

    fn layer(&self) -> Layer {
        Layer::State
    }

    fn applies_to(&self, ctx: &LeaseContext) -> bool {
        ctx.state.as_str() == self.state
    }

    fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
        let mut disclosures = vec![self.deposit_disclosure(ctx)];
        disclosures.extend(
            self.clauses
                .iter()
                .filter(|clause| clause.condition.holds(ctx))
                .map(|clause| clause.render(ctx, Layer::State, Some(&self.deposit))),
        );
        disclosures
    }

    fn deposit_rules(&self) -> Option<DepositRules> {
        Some(self.deposit)
    }

    fn late_fee_cap(&self) -> Option<LateFeeCap> {
        self.late_fee_cap
    }
}

/// Fallback used for states without a dedicated rule set.
#[derive(Debug, Clone)]
pub struct GenericStateRules;

impl ClauseSet for GenericStateRules {
    fn name(&self) -> &str {
        "State law"
    }

    fn layer(&self) -> Layer {
        Layer::State
    }

    fn applies_to(&self, _ctx: &LeaseContext) -> bool {
        true
    }

    fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
        let rules = DepositRules {
            cap_months: None,
            return_days: 30,
        };
        let mut body = fill_placeholders(DEPOSIT_RETURN_BODY, ctx, Some(&rules));
        body.push_str(&format!(
            " Where the laws of {} require a shorter period, the shorter period applies.",
            ctx.state
        ));
        vec![Disclosure {
            key: "deposit_return".to_string(),
            title: "Security Deposit".to_string(),
            body,
            citation: None,
            acknowledgement_required: false,
            layer: Layer::State,
        }]
    }

    fn deposit_rules(&self) -> Option<DepositRules> {
        Some(DepositRules {
            cap_months: None,
            return_days: 30,
        })
    }
}

pub(crate) fn standard_state_rules() -> Vec<StateRuleSet> {
    vec![
        StateRuleSet {
            state: "CA",
            name: "California",
            deposit: DepositRules {
                cap_months: Some(1.0),
                return_days: 21,
            },
            late_fee_cap: None,
            deposit_citation: "Cal. Civ. Code 1950.5",
            clauses: vec![
                ClauseTemplate {
                    key: "ca_megans_law",
                    title: "Registered Sex Offender Database",
                    body: "Notice: Pursuant to Section 290.46 of the Penal Code, information about specified registered sex offenders is made available to the public via an Internet Web site maintained by the Department of Justice at www.meganslaw.ca.gov.",
                    citation: Some("Cal. Civ. Code 2079.10a"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ca_bed_bugs",
                    title: "Bed Bug Information",
                    body: "Landlord has provided the statutory bed bug information sheet. Tenant agrees to promptly report any suspected bed bug infestation and to cooperate with inspection and treatment.",
                    citation: Some("Cal. Civ. Code 1954.603"),
                    acknowledgement_required: true,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ca_flood_hazard",
                    title: "Flood Hazard Disclosure",
                    body: "The premises {flood_status}. Information about hazards, including flood hazards, is available from the Governor's Office of Emergency Services. Landlord's insurance does not cover the loss of Tenant's personal possessions; Tenant should consider renter's and flood insurance.",
                    citation: Some("Cal. Gov. Code 8589.45"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ca_shared_utilities",
                    title: "Shared Utility Meters",
                    body: "Gas or electric service to the premises also serves areas outside the premises. The parties agree in writing on the allocation of those charges as described in the utilities section of this lease.",
                    citation: Some("Cal. Civ. Code 1940.9"),
                    acknowledgement_required: true,
                    condition: SharedUtilities,
                },
            ],
        },
        StateRuleSet {
            state: "CO",
            name: "Colorado",
            deposit: DepositRules {
                cap_months: Some(2.0),
                return_days: 30,
            },
            late_fee_cap: Some(LateFeeCap::GreaterOf {
                flat: Cents::from_dollars(50),
                bps: 500,
            }),
            deposit_citation: "C.R.S. 38-12-102.5; 38-12-103",
            clauses: vec![ClauseTemplate {
                key: "co_radon",
                title: "Radon Disclosure",
                body: "Radon is a naturally occurring radioactive gas that can accumulate in buildings in Colorado. Landlord discloses any radon testing, results, and mitigation known to Landlord for the premises, and Tenant acknowledges receipt of the state radon information.",
                citation: Some("C.R.S. 38-12-803"),
                acknowledgement_required: true,
                condition: Always,
            }],
        },
        StateRuleSet {
            state: "FL",
            name: "Florida",
            deposit: DepositRules {
                cap_months: None,
                return_days: 15,
            },
            late_fee_cap: None,
            deposit_citation: "Fla. Stat. 83.49",
            clauses: vec![
                ClauseTemplate {
                    key: "fl_radon",
                    title: "Radon Gas",
                    body: "RADON GAS: Radon is a naturally occurring radioactive gas that, when it has accumulated in a building in sufficient quantities, may present health risks to persons who are exposed to it over time. Levels of radon that exceed federal and state guidelines have been found in buildings in Florida. Additional information regarding radon and radon testing may be obtained from your county health department.",
                    citation: Some("Fla. Stat. 404.056(5)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "fl_deposit_claims",
                    title: "Security Deposit Claims",
                    body: "Your lease requires payment of certain deposits. The landlord may transfer advance rents to the landlord's account as they are due and without notice. When you move out, you must give the landlord your new address so that the landlord can send you notices regarding your deposit. The landlord must mail you notice, within 30 days after you move out, of the landlord's intent to impose a claim against the deposit.",
                    citation: Some("Fla. Stat. 83.49(2)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
            ],
        },
        StateRuleSet {
            state: "GA",
            name: "Georgia",
            deposit: DepositRules {
                cap_months: None,
                return_days: 30,
            },
            late_fee_cap: None,
            deposit_citation: "O.C.G.A. 44-7-34",
            clauses: vec![
                ClauseTemplate {
                    key: "ga_flooding",
                    title: "Flooding Disclosure",
                    body: "The living space or attachments of the premises have been damaged by flooding at least three times within the five years preceding this lease, or the premises lie within a designated flood zone.",
                    citation: Some("O.C.G.A. 44-7-20"),
                    acknowledgement_required: true,
                    condition: FloodZone,
                },
                ClauseTemplate {
                    key: "ga_move_in_inspection",
                    title: "Move-In Inspection List",
                    body: "Before accepting a security deposit, Landlord presents Tenant with a comprehensive list of existing damage. Tenant may inspect the premises to verify the accuracy of the list and sign it.",
                    citation: Some("O.C.G.A. 44-7-33"),
                    acknowledgement_required: true,
                    condition: Always,
                },
            ],
        },
        StateRuleSet {
            state: "IA",
            name: "Iowa",
            deposit: DepositRules {
                cap_months: Some(2.0),
                return_days: 30,
            },
            late_fee_cap: Some(LateFeeCap::Tiered {
                threshold: Cents::from_dollars(700),
                at_or_below: Cents::from_dollars(60),
                above: Cents::from_dollars(100),
            }),
            deposit_citation: "Iowa Code 562A.12",
            clauses: vec![
                ClauseTemplate {
                    key: "ia_owner_manager",
                    title: "Owner and Manager Disclosure",
                    body: "The names and addresses of the person authorized to manage the premises and of the owner or agent authorized to receive notices and demands are set out in the parties section of this lease.",
                    citation: Some("Iowa Code 562A.13(1)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ia_shared_utilities",
                    title: "Shared Utility Service",
                    body: "Utility service to the premises is shared with other units. Landlord has disclosed in writing the formula used to allocate shared utility costs among the units.",
                    citation: Some("Iowa Code 562A.13(6)"),
                    acknowledgement_required: true,
                    condition: SharedUtilities,
                },
            ],
        },
        StateRuleSet {
            state: "IL",
            name: "Illinois",
            deposit: DepositRules {
                cap_months: None,
                return_days: 45,
            },
            late_fee_cap: None,
            deposit_citation: "765 ILCS 710/1",
            clauses: vec![ClauseTemplate {
                key: "il_radon",
                title: "Radon Hazard",
                body: "Landlord discloses any known radon hazard in the premises. Tenant may test the premises for radon and report results exceeding the guidance level to Landlord.",
                citation: Some("420 ILCS 46/25"),
                acknowledgement_required: false,
                condition: Always,
            }],
        },
        StateRuleSet {
            state: "MA",
            name: "Massachusetts",
            deposit: DepositRules {
                cap_months: Some(1.0),
                return_days: 30,
            },
            late_fee_cap: None,
            deposit_citation: "M.G.L. c.186 s.15B",
            clauses: vec![
                ClauseTemplate {
                    key: "ma_statement_of_condition",
                    title: "Statement of Condition",
                    body: "Landlord will provide a separate written statement of the present condition of the premises within ten days after the start of the tenancy or receipt of the deposit. Tenant may add comments and return a signed copy within fifteen days.",
                    citation: Some("M.G.L. c.186 s.15B(2)(c)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ma_lead_law",
                    title: "Tenant Lead Law Notification",
                    body: "Under the Massachusetts Lead Law, the owner of a home built before 1978 where a child under six lives must have it deleaded. Tenant acknowledges receipt of the Tenant Lead Law Notification and Tenant Certification form.",
                    citation: Some("M.G.L. c.111 s.197A"),
                    acknowledgement_required: true,
                    condition: BuiltBefore(1978),
                },
            ],
        },
        StateRuleSet {
            state: "NJ",
            name: "New Jersey",
            deposit: DepositRules {
                cap_months: Some(1.5),
                return_days: 30,
            },
            late_fee_cap: None,
            deposit_citation: "N.J.S.A. 46:8-21.2",
            clauses: vec![
                ClauseTemplate {
                    key: "nj_truth_in_renting",
                    title: "Truth in Renting",
                    body: "Tenant acknowledges receipt of the current Truth in Renting statement published by the New Jersey Department of Community Affairs.",
                    citation: Some("N.J.S.A. 46:8-46"),
                    acknowledgement_required: true,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "nj_flood_zone",
                    title: "Flood Risk Notice",
                    body: "The premises {flood_status}. Flood insurance may be available to renters through the National Flood Insurance Program to cover contents.",
                    citation: Some("N.J.S.A. 46:8-50"),
                    acknowledgement_required: true,
                    condition: Always,
                },
            ],
        },
        StateRuleSet {
            state: "NY",
            name: "New York",
            deposit: DepositRules {
                cap_months: Some(1.0),
                return_days: 14,
            },
            late_fee_cap: Some(LateFeeCap::LesserOf {
                flat: Cents::from_dollars(50),
                bps: 500,
            }),
            deposit_citation: "N.Y. Gen. Oblig. Law 7-108",
            clauses: vec![
                ClauseTemplate {
                    key: "ny_sprinkler",
                    title: "Sprinkler System Disclosure",
                    body: "Landlord discloses in bold type whether the premises are served by a maintained and operative sprinkler system, and if so, the date of its last maintenance and inspection.",
                    citation: Some("N.Y. Real Prop. Law 231-a"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "ny_flood_history",
                    title: "Flood History and Risk",
                    body: "The premises {flood_status}. Renter's insurance policies generally do not cover flood losses; Tenant may obtain flood insurance through the National Flood Insurance Program.",
                    citation: Some("N.Y. Real Prop. Law 231-b"),
                    acknowledgement_required: true,
                    condition: Always,
                },
            ],
        },
        StateRuleSet {
            state: "OR",
            name: "Oregon",
            deposit: DepositRules {
                cap_months: None,
                return_days: 31,
            },
            late_fee_cap: Some(LateFeeCap::Percent { bps: 500 }),
            deposit_citation: "ORS 90.300",
            clauses: vec![
                ClauseTemplate {
                    key: "or_smoking_policy",
                    title: "Smoking Policy",
                    body: "Smoking, including vaping, is prohibited inside the dwelling unit and in all common areas of the premises.",
                    citation: Some("ORS 90.220(2)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "or_flood_zone",
                    title: "Flood Zone Notice",
                    body: "The dwelling unit is located within the 100-year floodplain. Tenant should consider flood insurance for personal property.",
                    citation: Some("ORS 90.228"),
                    acknowledgement_required: true,
                    condition: FloodZone,
                },
            ],
        },
        StateRuleSet {
            state: "TX",
            name: "Texas",
            deposit: DepositRules {
                cap_months: None,
                return_days: 30,
            },
            late_fee_cap: Some(LateFeeCap::Percent { bps: 1_200 }),
            deposit_citation: "Tex. Prop. Code 92.103",
            clauses: vec![
                ClauseTemplate {
                    key: "tx_flood_disclosure",
                    title: "Flood Disclosure Notice",
                    body: "Landlord discloses that the dwelling {flood_status}. Most tenant insurance policies do not cover damages or loss incurred in a flood. Tenant should seek insurance coverage that would cover losses caused by a flood.",
                    citation: Some("Tex. Prop. Code 92.0135"),
                    acknowledgement_required: true,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "tx_repair_remedies",
                    title: "Tenant Remedies for Repairs",
                    body: "Tenant may have special statutory rights to terminate the lease early in certain situations involving family violence, military deployment or transfer, and has remedies if Landlord fails to make repairs that materially affect the physical health or safety of an ordinary tenant.",
                    citation: Some("Tex. Prop. Code 92.056(g)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
            ],
        },
        StateRuleSet {
            state: "WA",
            name: "Washington",
            deposit: DepositRules {
                cap_months: None,
                return_days: 30,
            },
            late_fee_cap: None,
            deposit_citation: "RCW 59.18.280",
            clauses: vec![
                ClauseTemplate {
                    key: "wa_mold",
                    title: "Mold Information",
                    body: "Landlord has provided information on the health hazards associated with exposure to indoor mold and how to control mold growth, as published by the Department of Health.",
                    citation: Some("RCW 59.18.060"),
                    acknowledgement_required: true,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "wa_fire_safety",
                    title: "Fire Safety and Protection",
                    body: "Landlord discloses whether the building has a smoke detection device, a fire sprinkler system, a fire alarm system, a smoking policy, an emergency notification plan, and an emergency relocation and evacuation plan.",
                    citation: Some("RCW 59.18.060(12)"),
                    acknowledgement_required: false,
                    condition: Always,
                },
                ClauseTemplate {
                    key: "wa_condition_checklist",
                    title: "Condition Checklist",
                    body: "No deposit may be collected unless the lease is in writing and a written checklist describing the condition and cleanliness of the premises is signed and dated by both parties.",
                    citation: Some("RCW 59.18.260"),
                    acknowledgement_required: true,
                    condition: Always,
                },
            ],
        },
    ]
}

pub(crate) fn covered_states() -> Vec<StateCode> {
    standard_state_rules()
        .iter()
        .filter_map(|rules| rules.state.parse().ok())
        .collect()
}
