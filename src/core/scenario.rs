use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::benefits::{CppInputs, OasInputs};
use super::tax::Province;
use super::types::{Compounding, DividendType, Rate, RateOverrides};
use crate::error::{ProjectionError, Result};

pub const MIN_PROJECTION_YEARS: u32 = 1;
pub const MAX_PROJECTION_YEARS: u32 = 60;

/// Share of the blended return treated as price growth; the rest is yield.
pub const BLENDED_GROWTH_SHARE: f64 = 0.70;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStrategy {
    #[default]
    RrspFirst,
    TfsaFirst,
    Balanced,
    /// Currently draws exactly like `Balanced`.
    TaxOptimized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionScenario {
    pub id: String,
    pub name: String,
    pub assumptions: Assumptions,
    pub config: ProjectionConfig,
    pub life_events: Vec<LifeEvent>,
}

impl Default for ProjectionScenario {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            assumptions: Assumptions::default(),
            config: ProjectionConfig::default(),
            life_events: Vec::new(),
        }
    }
}

impl ProjectionScenario {
    pub fn validate(&self) -> Result<()> {
        let years = self.config.projection_years;
        if !(MIN_PROJECTION_YEARS..=MAX_PROJECTION_YEARS).contains(&years) {
            return Err(ProjectionError::scenario(
                "projectionYears",
                format!(
                    "must be between {MIN_PROJECTION_YEARS} and {MAX_PROJECTION_YEARS}, got {years}"
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionConfig {
    pub projection_years: u32,
    pub start_date: NaiveDate,
    pub compounding: Compounding,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            projection_years: 30,
            start_date: today.with_day(1).unwrap_or(today),
            compounding: Compounding::default(),
        }
    }
}

impl ProjectionConfig {
    pub fn clamped_years(years: u32) -> u32 {
        years.clamp(MIN_PROJECTION_YEARS, MAX_PROJECTION_YEARS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assumptions {
    pub inflation_rate: Rate,
    /// Blended total return, split 70/30 into growth and yield when no
    /// more specific rate applies.
    pub investment_return_rate: Rate,
    pub growth_rate: Option<Rate>,
    pub dividend_yield: Option<Rate>,
    pub dividend_type: DividendType,
    pub real_estate_appreciation_rate: Rate,
    pub province: Province,
    pub income: IncomeConfig,
    pub retirement: RetirementConfig,
    pub cpp: CppConfig,
    pub oas: OasConfig,
    pub resp: Option<RespConfig>,
    pub contribution_room: Option<ContributionRoom>,
    pub account_overrides: BTreeMap<String, RateOverrides>,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            inflation_rate: Rate::from_decimal(0.02),
            investment_return_rate: Rate::from_decimal(0.06),
            growth_rate: None,
            dividend_yield: None,
            dividend_type: DividendType::CanadianEligible,
            real_estate_appreciation_rate: Rate::ZERO,
            province: Province::ON,
            income: IncomeConfig::default(),
            retirement: RetirementConfig::default(),
            cpp: CppConfig::default(),
            oas: OasConfig::default(),
            resp: None,
            contribution_room: None,
            account_overrides: BTreeMap::new(),
        }
    }
}

impl Assumptions {
    pub fn blended_growth(&self) -> Rate {
        self.investment_return_rate.scale(BLENDED_GROWTH_SHARE)
    }

    pub fn blended_yield(&self) -> Rate {
        self.investment_return_rate.scale(1.0 - BLENDED_GROWTH_SHARE)
    }

    pub fn account_override(&self, account_id: &str) -> Option<&RateOverrides> {
        self.account_overrides.get(account_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonIncome {
    pub current_age: u32,
    pub annual_income: Option<f64>,
    pub salary_growth: Rate,
}

impl Default for PersonIncome {
    fn default() -> Self {
        Self {
            current_age: 35,
            annual_income: None,
            salary_growth: Rate::from_decimal(0.02),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeConfig {
    pub person1: PersonIncome,
    pub person2: Option<PersonIncome>,
}

impl IncomeConfig {
    pub fn people(&self) -> impl Iterator<Item = &PersonIncome> {
        std::iter::once(&self.person1).chain(self.person2.as_ref())
    }

    pub fn person_count(&self) -> usize {
        if self.person2.is_some() { 2 } else { 1 }
    }

    /// Monthly household income from stated salaries, when any are given.
    pub fn stated_monthly_income(&self) -> Option<f64> {
        let stated: Vec<f64> = self
            .people()
            .filter_map(|p| p.annual_income)
            .filter(|v| v.is_finite())
            .collect();
        if stated.is_empty() {
            None
        } else {
            Some(stated.iter().map(|v| v.max(0.0)).sum::<f64>() / 12.0)
        }
    }

    /// Income-weighted salary growth, falling back to person 1's rate.
    pub fn household_salary_growth(&self) -> Rate {
        let weighted: Vec<(f64, f64)> = self
            .people()
            .filter_map(|p| {
                p.annual_income
                    .filter(|v| *v > 0.0)
                    .map(|income| (income, p.salary_growth.as_decimal()))
            })
            .collect();
        let total: f64 = weighted.iter().map(|(income, _)| income).sum();
        if total <= 0.0 {
            return self.person1.salary_growth;
        }
        Rate::from_decimal(weighted.iter().map(|(i, g)| i * g).sum::<f64>() / total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetirementConfig {
    pub target_retirement_age: u32,
    /// Share of pre-retirement expenses still spent in retirement.
    pub expense_ratio: f64,
    pub withdrawal_rate: Rate,
    pub withdrawal_strategy: WithdrawalStrategy,
    pub healthcare_monthly: f64,
    pub long_term_care_monthly: f64,
    pub long_term_care_start_age: Option<u32>,
}

impl Default for RetirementConfig {
    fn default() -> Self {
        Self {
            target_retirement_age: 65,
            expense_ratio: 0.70,
            withdrawal_rate: Rate::from_decimal(0.04),
            withdrawal_strategy: WithdrawalStrategy::RrspFirst,
            healthcare_monthly: 0.0,
            long_term_care_monthly: 0.0,
            long_term_care_start_age: None,
        }
    }
}

impl RetirementConfig {
    pub fn add_on_expenses(&self, age: f64) -> f64 {
        let long_term_care = match self.long_term_care_start_age {
            Some(start) if age < start as f64 => 0.0,
            _ => self.long_term_care_monthly.max(0.0),
        };
        self.healthcare_monthly.max(0.0) + long_term_care
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CppConfig {
    pub person1: CppInputs,
    pub person2: Option<CppInputs>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OasConfig {
    pub person1: OasInputs,
    pub person2: Option<OasInputs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RespConfig {
    pub annual_contribution: f64,
    pub cesg_match_rate: Rate,
    pub cesg_annual_limit: f64,
    pub education_start_year: Option<i32>,
    pub annual_education_cost: Option<f64>,
    pub education_years: u32,
}

impl Default for RespConfig {
    fn default() -> Self {
        Self {
            annual_contribution: 0.0,
            cesg_match_rate: Rate::from_decimal(0.20),
            cesg_annual_limit: 500.0,
            education_start_year: None,
            annual_education_cost: None,
            education_years: 4,
        }
    }
}

impl RespConfig {
    pub fn monthly_contribution(&self) -> f64 {
        self.annual_contribution.max(0.0) / 12.0
    }

    pub fn in_education_window(&self, year: i32) -> bool {
        match self.education_start_year {
            Some(start) => {
                let years = i32::try_from(self.education_years).unwrap_or(i32::MAX);
                year >= start && year < start.saturating_add(years)
            }
            None => false,
        }
    }

    pub fn monthly_education_cost(&self) -> f64 {
        self.annual_education_cost.unwrap_or(0.0).max(0.0) / 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionRoom {
    pub tfsa_room: f64,
    pub rrsp_room: f64,
    pub tfsa_annual_limit: f64,
    pub rrsp_annual_limit: f64,
    /// Share of the prior year's earned income added to RRSP room.
    pub rrsp_earned_income_rate: Rate,
}

impl Default for ContributionRoom {
    fn default() -> Self {
        Self {
            tfsa_room: 0.0,
            rrsp_room: 0.0,
            tfsa_annual_limit: 7_000.0,
            rrsp_annual_limit: 31_560.0,
            rrsp_earned_income_rate: Rate::from_decimal(0.18),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeEventKind {
    Income,
    Expense,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFrequency {
    #[default]
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub kind: LifeEventKind,
    #[serde(default)]
    pub frequency: EventFrequency,
    pub amount: f64,
}

impl LifeEvent {
    /// Whether the event contributes in the month `(year, month)`.
    pub fn is_active(&self, year: i32, month: u32) -> bool {
        let trigger = (self.year, self.month);
        match self.frequency {
            EventFrequency::OneTime => trigger == (year, month),
            EventFrequency::Recurring => (year, month) >= trigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_out_of_range_years() {
        let mut scenario = ProjectionScenario::default();
        scenario.config.projection_years = 0;
        assert!(matches!(
            scenario.validate(),
            Err(ProjectionError::InvalidScenarioConfig { .. })
        ));
        scenario.config.projection_years = 61;
        assert!(scenario.validate().is_err());
        scenario.config.projection_years = 60;
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
          "id": "s1",
          "assumptions": {
            "inflationRate": 0.03,
            "province": "BC",
            "retirement": { "withdrawalStrategy": "tfsa_first" },
            "income": { "person2": { "currentAge": 40 } }
          },
          "config": { "projectionYears": 12, "startDate": "2025-01-01" }
        }"#;
        let scenario: ProjectionScenario = serde_json::from_str(json).expect("valid scenario");
        assert_eq!(scenario.id, "s1");
        assert_eq!(scenario.assumptions.inflation_rate, Rate::from_decimal(0.03));
        assert_eq!(scenario.assumptions.province, Province::BC);
        assert_eq!(
            scenario.assumptions.retirement.withdrawal_strategy,
            WithdrawalStrategy::TfsaFirst
        );
        assert_eq!(scenario.assumptions.retirement.target_retirement_age, 65);
        assert_eq!(scenario.assumptions.income.person2.map(|p| p.current_age), Some(40));
        assert_eq!(scenario.config.projection_years, 12);
        assert_eq!(scenario.config.compounding, Compounding::EffectiveAnnual);
    }

    #[test]
    fn stated_income_overrides_and_weights_growth() {
        let income = IncomeConfig {
            person1: PersonIncome {
                current_age: 40,
                annual_income: Some(90_000.0),
                salary_growth: Rate::from_decimal(0.03),
            },
            person2: Some(PersonIncome {
                current_age: 38,
                annual_income: Some(30_000.0),
                salary_growth: Rate::from_decimal(0.01),
            }),
        };
        assert_eq!(income.stated_monthly_income(), Some(10_000.0));
        let growth = income.household_salary_growth().as_decimal();
        assert!((growth - 0.025).abs() < 1e-12);
        assert_eq!(income.person_count(), 2);
    }

    #[test]
    fn unstated_income_falls_back_to_person1_growth() {
        let income = IncomeConfig::default();
        assert_eq!(income.stated_monthly_income(), None);
        assert_eq!(
            income.household_salary_growth(),
            income.person1.salary_growth
        );
    }

    #[test]
    fn one_time_and_recurring_events_fire_from_trigger() {
        let mut event = LifeEvent {
            id: "e".into(),
            name: "bonus".into(),
            year: 2026,
            month: 3,
            kind: LifeEventKind::Income,
            frequency: EventFrequency::OneTime,
            amount: 1_000.0,
        };
        assert!(!event.is_active(2026, 2));
        assert!(event.is_active(2026, 3));
        assert!(!event.is_active(2026, 4));

        event.frequency = EventFrequency::Recurring;
        assert!(!event.is_active(2025, 12));
        assert!(event.is_active(2026, 3));
        assert!(event.is_active(2030, 1));
    }

    #[test]
    fn education_window_spans_configured_years() {
        let resp = RespConfig {
            education_start_year: Some(2030),
            ..RespConfig::default()
        };
        assert!(!resp.in_education_window(2029));
        assert!(resp.in_education_window(2030));
        assert!(resp.in_education_window(2033));
        assert!(!resp.in_education_window(2034));
    }

    #[test]
    fn huge_education_years_saturate() {
        let resp: RespConfig = serde_json::from_str(
            r#"{ "educationStartYear": 2030, "educationYears": 4294967295 }"#,
        )
        .expect("json should parse");
        assert!(!resp.in_education_window(2029));
        assert!(resp.in_education_window(2030));
        assert!(resp.in_education_window(i32::MAX - 1));
    }

    #[test]
    fn long_term_care_starts_at_configured_age() {
        let retirement = RetirementConfig {
            healthcare_monthly: 200.0,
            long_term_care_monthly: 1_000.0,
            long_term_care_start_age: Some(80),
            ..RetirementConfig::default()
        };
        assert_eq!(retirement.add_on_expenses(70.0), 200.0);
        assert_eq!(retirement.add_on_expenses(80.0), 1_200.0);
    }
}
