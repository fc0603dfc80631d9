use tracing::debug;

use crate::money::Cents;

use super::federal::FederalClauses;
use super::local::standard_local_rules;
use super::states::{covered_states, standard_state_rules, GenericStateRules};
use super::{
    ClauseSet, DepositRules, Disclosure, JurisdictionError, LateFeeCap, Layer, LeaseContext,
    StateCode,
};

/// Ordered collection of clause sets consulted when assembling a lease.
pub struct ClauseRegistry {
    sets: Vec<Box<dyn ClauseSet>>,
    fallback: Box<dyn ClauseSet>,
}

impl ClauseRegistry {
    /// Registry with no clause sets other than the generic state fallback.
    pub fn empty() -> Self {
        Self {
            sets: Vec::new(),
            fallback: Box::new(GenericStateRules),
        }
    }

    /// Federal notices, every bundled state rule set and the bundled city ordinances.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(FederalClauses);
        for rules in standard_state_rules() {
            registry.register(rules);
        }
        for rules in standard_local_rules() {
            registry.register(rules);
        }
        registry
    }

    pub fn register(&mut self, set: impl ClauseSet + 'static) {
        self.sets.push(Box::new(set));
    }

    /// States that have a dedicated rule set in the standard registry.
    pub fn covered_states() -> Vec<StateCode> {
        covered_states()
    }

    /// Applicable clause sets, least specific first.
    fn applicable<'a>(&'a self, ctx: &LeaseContext) -> Vec<&'a dyn ClauseSet> {
        let mut sets: Vec<&dyn ClauseSet> = self
            .sets
            .iter()
            .map(|set| set.as_ref())
            .filter(|set| set.applies_to(ctx))
            .collect();

        if !sets.iter().any(|set| set.layer() == Layer::State) {
            debug!(state = %ctx.state, "no dedicated state rules; using generic fallback");
            sets.push(self.fallback.as_ref());
        }

        sets.sort_by_key(|set| set.layer());
        sets
    }

    /// Disclosures for the lease in layer order. A later layer replaces an earlier
    /// disclosure with the same key.
    pub fn disclosures_for(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
        let mut merged: Vec<Disclosure> = Vec::new();
        for set in self.applicable(ctx) {
            for disclosure in set.disclosures(ctx) {
                merged.retain(|existing| existing.key != disclosure.key);
                merged.push(disclosure);
            }
        }
        merged
    }

    /// Deposit rules from the most specific layer that defines them.
    pub fn deposit_rules_for(&self, ctx: &LeaseContext) -> DepositRules {
        self.applicable(ctx)
            .iter()
            .rev()
            .find_map(|set| set.deposit_rules())
            .unwrap_or(DepositRules {
                cap_months: None,
                return_days: 30,
            })
    }

    /// Late-fee cap from the most specific layer that defines one.
    pub fn late_fee_cap_for(&self, ctx: &LeaseContext) -> Option<LateFeeCap> {
        self.applicable(ctx)
            .iter()
            .rev()
            .find_map(|set| set.late_fee_cap())
    }

    pub fn check_deposit(&self, ctx: &LeaseContext) -> Result<(), JurisdictionError> {
        let rules = self.deposit_rules_for(ctx);
        match rules.max_deposit(ctx.monthly_rent) {
            Some(max) if ctx.security_deposit > max => Err(JurisdictionError::DepositCapExceeded {
                state: ctx.state.clone(),
                max,
                found: ctx.security_deposit,
            }),
            _ => Ok(()),
        }
    }

    pub fn check_late_fee(&self, ctx: &LeaseContext, fee: Cents) -> Result<(), JurisdictionError> {
        let Some(cap) = self.late_fee_cap_for(ctx) else {
            return Ok(());
        };
        let max = cap.max_fee(ctx.monthly_rent);
        if fee > max {
            return Err(JurisdictionError::LateFeeCapExceeded {
                state: ctx.state.clone(),
                max,
                found: fee,
            });
        }
        Ok(())
    }
}

impl Default for ClauseRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{context, ClauseTemplate, DisclosureCondition};
    use super::*;

    fn keys(disclosures: &[Disclosure]) -> Vec<&str> {
        disclosures.iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn disclosures_are_ordered_by_layer() {
        let registry = ClauseRegistry::standard();
        let mut ctx = context("NY");
        ctx.city = "New York".to_string();

        let disclosures = registry.disclosures_for(&ctx);
        let layers: Vec<Layer> = disclosures.iter().map(|d| d.layer).collect();
        let mut sorted = layers.clone();
        sorted.sort();
        assert_eq!(layers, sorted);
        assert_eq!(disclosures[0].key, "fair_housing");
        assert!(keys(&disclosures).contains(&"nyc_window_guards"));
    }

    #[test]
    fn local_layer_overrides_state_clause_with_same_key() {
        let registry = ClauseRegistry::standard();
        let mut ctx = context("IL");
        ctx.city = "Chicago".to_string();

        let disclosures = registry.disclosures_for(&ctx);
        let deposits: Vec<&Disclosure> = disclosures
            .iter()
            .filter(|d| d.key == "deposit_return")
            .collect();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].layer, Layer::Local);
        assert_eq!(registry.deposit_rules_for(&ctx).return_days, 45);
    }

    #[test]
    fn uncovered_state_falls_back_to_generic_rules() {
        let registry = ClauseRegistry::standard();
        let ctx = context("OH");
        let disclosures = registry.disclosures_for(&ctx);
        assert_eq!(keys(&disclosures), vec!["fair_housing", "deposit_return"]);
        assert!(registry.check_deposit(&ctx).is_ok());
    }

    #[test]
    fn deposit_cap_enforced() {
        let registry = ClauseRegistry::standard();
        let mut ctx = context("CA");
        ctx.security_deposit = Cents::from_dollars(1_501);

        match registry.check_deposit(&ctx) {
            Err(JurisdictionError::DepositCapExceeded { max, found, .. }) => {
                assert_eq!(max, Cents::from_dollars(1_500));
                assert_eq!(found, Cents::from_dollars(1_501));
            }
            other => panic!("expected cap violation, got {other:?}"),
        }

        ctx.security_deposit = Cents::from_dollars(1_500);
        assert!(registry.check_deposit(&ctx).is_ok());
    }

    #[test]
    fn late_fee_cap_enforced_only_where_defined() {
        let registry = ClauseRegistry::standard();
        let ny = context("NY");
        assert!(registry.check_late_fee(&ny, Cents::from_dollars(50)).is_ok());
        assert!(matches!(
            registry.check_late_fee(&ny, Cents::from_dollars(51)),
            Err(JurisdictionError::LateFeeCapExceeded { .. })
        ));

        let oh = context("OH");
        assert!(registry
            .check_late_fee(&oh, Cents::from_dollars(500))
            .is_ok());
    }

    #[test]
    fn registered_sets_participate() {
        struct PetAddendum;

        impl ClauseSet for PetAddendum {
            fn name(&self) -> &str {
                "Pet addendum"
            }
            fn layer(&self) -> Layer {
                Layer::Local
            }
            fn applies_to(&self, _ctx: &LeaseContext) -> bool {
                true
            }
            fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure> {
                let template = ClauseTemplate {
                    key: "pet_policy",
                    title: "Pets",
                    body: "Pets are permitted in {state}.",
                    citation: None,
                    acknowledgement_required: false,
                    condition: DisclosureCondition::PetsAllowed,
                };
                template
                    .condition
                    .holds(ctx)
                    .then(|| template.render(ctx, Layer::Local, None))
                    .into_iter()
                    .collect()
            }
        }

        let mut registry = ClauseRegistry::empty();
        registry.register(PetAddendum);
        let mut ctx = context("WA");
        ctx.pets_allowed = true;

        let disclosures = registry.disclosures_for(&ctx);
        assert_eq!(keys(&disclosures), vec!["deposit_return", "pet_policy"]);
        assert_eq!(disclosures[1].body, "Pets are permitted in WA.");
    }
}
