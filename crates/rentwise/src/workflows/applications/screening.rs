//! Advisory applicant screening. The report is stored with the application; landlords make the
//! final decision.

use serde::{Deserialize, Serialize};

use crate::money::Cents;

/// Rubric thresholds applied uniformly to every applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    /// Highest acceptable share of monthly income spent on rent.
    pub max_rent_to_income: f32,
    pub min_credit_score: Option<u16>,
    pub max_evictions: u8,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            max_rent_to_income: 0.33,
            min_credit_score: Some(620),
            max_evictions: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningFactor {
    RentToIncome,
    CreditScore,
    RentalHistory,
}

/// Discrete contribution to a screening score, kept for adverse-action notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScreeningFactor,
    pub score: i16,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Recommend,
    Conditional { actions: Vec<String> },
    Decline { reasons: Vec<String> },
}

impl Recommendation {
    pub fn summary(&self) -> String {
        match self {
            Recommendation::Recommend => "meets screening criteria".to_string(),
            Recommendation::Conditional { actions } => {
                format!("conditional: {}", actions.join(", "))
            }
            Recommendation::Decline { reasons } => format!("below criteria: {}", reasons.join("; ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub recommendation: Recommendation,
    pub total_score: i16,
    pub rent_to_income: f32,
    pub components: Vec<ScoreComponent>,
}

/// Facts screened for one application.
#[derive(Debug, Clone, Copy)]
pub struct ScreeningInput {
    pub monthly_rent: Cents,
    pub monthly_income: Cents,
    pub credit_score: Option<u16>,
    pub prior_evictions: u8,
}

/// Stateless evaluator that applies the criteria to an applicant.
#[derive(Debug, Clone, Default)]
pub struct Screener {
    criteria: ScreeningCriteria,
}

impl Screener {
    pub fn new(criteria: ScreeningCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &ScreeningCriteria {
        &self.criteria
    }

    pub fn screen(&self, input: &ScreeningInput) -> ScreeningReport {
        let criteria = &self.criteria;
        let mut components = Vec::new();
        let mut reasons = Vec::new();
        let mut actions = Vec::new();

        let rent_to_income = if input.monthly_income.is_positive() {
            input.monthly_rent.value() as f32 / input.monthly_income.value() as f32
        } else {
            f32::INFINITY
        };
        if rent_to_income <= criteria.max_rent_to_income {
            components.push(ScoreComponent {
                factor: ScreeningFactor::RentToIncome,
                score: 30,
                notes: format!(
                    "rent-to-income ratio {rent_to_income:.2} within {:.2}",
                    criteria.max_rent_to_income
                ),
            });
        } else {
            components.push(ScoreComponent {
                factor: ScreeningFactor::RentToIncome,
                score: -40,
                notes: format!(
                    "ratio {rent_to_income:.2} exceeds {:.2}",
                    criteria.max_rent_to_income
                ),
            });
            reasons.push(format!(
                "rent is {:.0}% of income (limit {:.0}%)",
                rent_to_income * 100.0,
                criteria.max_rent_to_income * 100.0
            ));
        }

        if let Some(min_credit) = criteria.min_credit_score {
            match input.credit_score {
                Some(score) if score >= min_credit => components.push(ScoreComponent {
                    factor: ScreeningFactor::CreditScore,
                    score: 20,
                    notes: format!("credit score {score} meets minimum {min_credit}"),
                }),
                Some(score) => {
                    components.push(ScoreComponent {
                        factor: ScreeningFactor::CreditScore,
                        score: -25,
                        notes: format!("credit score {score} below minimum {min_credit}"),
                    });
                    reasons.push(format!("credit score {score} below {min_credit}"));
                }
                None => {
                    components.push(ScoreComponent {
                        factor: ScreeningFactor::CreditScore,
                        score: -10,
                        notes: "missing credit history".to_string(),
                    });
                    actions.push("provide a guarantor or additional references".to_string());
                }
            }
        }

        let evictions = input.prior_evictions;
        if evictions == 0 {
            components.push(ScoreComponent {
                factor: ScreeningFactor::RentalHistory,
                score: 10,
                notes: "no prior evictions".to_string(),
            });
        } else if evictions <= criteria.max_evictions {
            components.push(ScoreComponent {
                factor: ScreeningFactor::RentalHistory,
                score: -10,
                notes: format!("{evictions} eviction(s) within policy"),
            });
        } else {
            components.push(ScoreComponent {
                factor: ScreeningFactor::RentalHistory,
                score: -25,
                notes: format!("{evictions} eviction(s) exceeds allowance"),
            });
            reasons.push(format!("{evictions} prior eviction(s)"));
        }

        let total_score = components.iter().map(|component| component.score).sum();
        let recommendation = if !reasons.is_empty() {
            Recommendation::Decline { reasons }
        } else if !actions.is_empty() {
            Recommendation::Conditional { actions }
        } else {
            Recommendation::Recommend
        };

        ScreeningReport {
            recommendation,
            total_score,
            rent_to_income,
            components,
        }
    }
}
