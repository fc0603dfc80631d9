//! Jurisdiction-aware lease clauses.
//!
//! Clause sets are layered from the most general to the most specific:
//! 1. Federal - baseline notices (Fair Housing, lead-based paint)
//! 2. State - statutory disclosures, deposit caps and late-fee caps
//! 3. Local - municipal ordinances (Chicago RLTO, New York City notices)
//!
//! A more specific layer replaces a disclosure with the same key from an earlier layer.

mod federal;
mod local;
mod registry;
mod states;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::money::Cents;

pub use federal::FederalClauses;
pub use local::LocalRuleSet;
pub use registry::ClauseRegistry;
pub use states::{GenericStateRules, StateRuleSet};

const STATE_CODES: [&str; 51] = [
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH", "NJ",
    "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VA", "VT", "WA",
    "WI", "WV", "WY",
];

/// Two-letter USPS code for one of the 50 states or the District of Columbia.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateCode(String);

impl StateCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StateCode {
    type Err = JurisdictionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        if STATE_CODES.contains(&normalized.as_str()) {
            Ok(Self(normalized))
        } else {
            Err(JurisdictionError::UnknownState(raw.to_string()))
        }
    }
}

impl TryFrom<String> for StateCode {
    type Error = JurisdictionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StateCode> for String {
    fn from(value: StateCode) -> Self {
        value.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facts about a lease that clause rules are allowed to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseContext {
    pub state: StateCode,
    pub city: String,
    pub year_built: Option<u16>,
    pub flood_zone: bool,
    pub shared_utilities: bool,
    pub pets_allowed: bool,
    pub tenant_count: usize,
    pub monthly_rent: Cents,
    pub security_deposit: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Federal,
    State,
    Local,
}

impl Layer {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Federal => "Federal",
            Self::State => "State",
            Self::Local => "Local",
        }
    }
}

/// A filled-in legal notice ready to be placed in a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub key: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    pub acknowledgement_required: bool,
    pub layer: Layer,
}

/// When a clause template applies. Unknown construction years are treated as old buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureCondition {
    Always,
    BuiltBefore(u16),
    FloodZone,
    SharedUtilities,
    PetsAllowed,
    MultipleTenants,
}

impl DisclosureCondition {
    pub fn holds(self, ctx: &LeaseContext) -> bool {
        match self {
            Self::Always => true,
            Self::BuiltBefore(year) => ctx.year_built.map_or(true, |built| built < year),
            Self::FloodZone => ctx.flood_zone,
            Self::SharedUtilities => ctx.shared_utilities,
            Self::PetsAllowed => ctx.pets_allowed,
            Self::MultipleTenants => ctx.tenant_count > 1,
        }
    }
}

/// Static clause text with `{placeholder}` slots filled from the lease context.
#[derive(Debug, Clone, Copy)]
pub struct ClauseTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub body: &'static str,
    pub citation: Option<&'static str>,
    pub acknowledgement_required: bool,
    pub condition: DisclosureCondition,
}

impl ClauseTemplate {
    pub(crate) fn render(
        &self,
        ctx: &LeaseContext,
        layer: Layer,
        deposit: Option<&DepositRules>,
    ) -> Disclosure {
        Disclosure {
            key: self.key.to_string(),
            title: self.title.to_string(),
            body: fill_placeholders(self.body, ctx, deposit),
            citation: self.citation.map(str::to_string),
            acknowledgement_required: self.acknowledgement_required,
            layer,
        }
    }
}

pub(crate) fn fill_placeholders(
    body: &str,
    ctx: &LeaseContext,
    deposit: Option<&DepositRules>,
) -> String {
    let flood_status = if ctx.flood_zone {
        "is located in a special flood hazard area"
    } else {
        "is not known by the landlord to be located in a special flood hazard area"
    };
    let return_days = deposit
        .map(|rules| rules.return_days.to_string())
        .unwrap_or_else(|| "30".to_string());

    body.replace("{state}", ctx.state.as_str())
        .replace("{rent}", &ctx.monthly_rent.to_string())
        .replace("{deposit}", &ctx.security_deposit.to_string())
        .replace("{return_days}", &return_days)
        .replace("{flood_status}", flood_status)
}

/// Security deposit limits for a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositRules {
    /// Maximum deposit expressed in months of rent; `None` means no statutory cap.
    pub cap_months: Option<f64>,
    pub return_days: u16,
}

impl DepositRules {
    pub fn max_deposit(&self, monthly_rent: Cents) -> Option<Cents> {
        self.cap_months.map(|months| monthly_rent.scale_ceil(months))
    }
}

/// Statutory ceiling on a single late charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateFeeCap {
    Percent { bps: u32 },
    LesserOf { flat: Cents, bps: u32 },
    GreaterOf { flat: Cents, bps: u32 },
    Tiered {
        threshold: Cents,
        at_or_below: Cents,
        above: Cents,
    },
}

impl LateFeeCap {
    pub fn max_fee(self, monthly_rent: Cents) -> Cents {
        match self {
            Self::Percent { bps } => monthly_rent.basis_points_rounded(bps),
            Self::LesserOf { flat, bps } => flat.min(monthly_rent.basis_points_rounded(bps)),
            Self::GreaterOf { flat, bps } => flat.max(monthly_rent.basis_points_rounded(bps)),
            Self::Tiered {
                threshold,
                at_or_below,
                above,
            } => {
                if monthly_rent <= threshold {
                    at_or_below
                } else {
                    above
                }
            }
        }
    }
}

/// A pluggable group of clauses for one jurisdiction layer.
pub trait ClauseSet: Send + Sync {
    fn name(&self) -> &str;
    fn layer(&self) -> Layer;
    fn applies_to(&self, ctx: &LeaseContext) -> bool;
    fn disclosures(&self, ctx: &LeaseContext) -> Vec<Disclosure>;

    fn deposit_rules(&self) -> Option<DepositRules> {
        None
    }

    fn late_fee_cap(&self) -> Option<LateFeeCap> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JurisdictionError {
    #[error("'{0}' is not a recognized US state code")]
    UnknownState(String),
    #[error("security deposit exceeds the {state} cap (allowed <= {max}, found {found})")]
    DepositCapExceeded {
        state: StateCode,
        max: Cents,
        found: Cents,
    },
    #[error("late fee exceeds the {state} cap (allowed <= {max}, found {found})")]
    LateFeeCapExceeded {
        state: StateCode,
        max: Cents,
        found: Cents,
    },
}

#[cfg(test)]
pub(crate) fn context(state: &str) -> LeaseContext {
    LeaseContext {
        state: state.parse().expect("valid state"),
        city: "Springfield".to_string(),
        year_built: Some(1998),
        flood_zone: false,
        shared_utilities: false,
        pets_allowed: false,
        tenant_count: 1,
        monthly_rent: Cents::from_dollars(1_500),
        security_deposit: Cents::from_dollars(1_500),
    }
}
