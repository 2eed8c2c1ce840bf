use serde::{Deserialize, Serialize};

/// Maximum monthly CPP retirement pension at 65 (2024).
pub const CPP_MAX_MONTHLY: f64 = 1_364.60;
/// Maximum monthly OAS pension at 65 (2024).
pub const OAS_MAX_MONTHLY: f64 = 713.34;
pub const OAS_DEFAULT_CLAWBACK_THRESHOLD: f64 = 90_997.0;

const CPP_MAX_MULTIPLIER: f64 = 1.42;
const OAS_MAX_MULTIPLIER: f64 = 1.36;
const CPP_DROPOUT_YEARS: u32 = 8;
const CPP_FULL_CONTRIBUTION_YEARS: f64 = 32.0;
const OAS_FULL_RESIDENCY_YEARS: f64 = 40.0;
const STANDARD_START_AGE: u32 = 65;
const EARLIEST_START_AGE: u32 = 60;
const MAX_DEFERRAL_MONTHS: u32 = 60;
const EARLY_REDUCTION_PER_MONTH: f64 = 0.006;
const CPP_DEFERRAL_INCREASE_PER_MONTH: f64 = 0.007;
const OAS_DEFERRAL_INCREASE_PER_MONTH: f64 = 0.006;
const OAS_CLAWBACK_RATE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CppInputs {
    pub years_of_contributions: u32,
    /// Share of the maximum pensionable earnings, 0..=1.
    pub average_contribution_level: f64,
    pub start_age: u32,
    pub manual_monthly_benefit: Option<f64>,
}

impl Default for CppInputs {
    fn default() -> Self {
        Self {
            years_of_contributions: 35,
            average_contribution_level: 0.7,
            start_age: STANDARD_START_AGE,
            manual_monthly_benefit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OasInputs {
    pub years_in_canada: u32,
    pub start_age: u32,
    pub manual_monthly_benefit: Option<f64>,
    pub clawback_threshold: f64,
}

impl Default for OasInputs {
    fn default() -> Self {
        Self {
            years_in_canada: 40,
            start_age: STANDARD_START_AGE,
            manual_monthly_benefit: None,
            clawback_threshold: OAS_DEFAULT_CLAWBACK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OasBenefit {
    pub gross_monthly: f64,
    pub clawback_monthly: f64,
    pub net_monthly: f64,
}

/// Multiplier for taking a benefit at `start_age` instead of 65.
fn age_adjustment(start_age: u32, deferral_increase_per_month: f64) -> f64 {
    let start_age = start_age.clamp(EARLIEST_START_AGE, STANDARD_START_AGE + 5);
    if start_age < STANDARD_START_AGE {
        let months_early = (STANDARD_START_AGE - start_age) * 12;
        1.0 - EARLY_REDUCTION_PER_MONTH * months_early as f64
    } else {
        let months_late = ((start_age - STANDARD_START_AGE) * 12).min(MAX_DEFERRAL_MONTHS);
        1.0 + deferral_increase_per_month * months_late as f64
    }
}

pub fn cpp_monthly_benefit(inputs: &CppInputs) -> f64 {
    if let Some(manual) = inputs.manual_monthly_benefit {
        if manual > 0.0 {
            return manual;
        }
    }

    let level = if inputs.average_contribution_level.is_finite() {
        inputs.average_contribution_level.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let adjusted_years = inputs.years_of_contributions.saturating_sub(CPP_DROPOUT_YEARS) as f64;
    let earnings_ratio = ((adjusted_years / CPP_FULL_CONTRIBUTION_YEARS) * level).min(1.0);
    let base = CPP_MAX_MONTHLY * earnings_ratio;

    let adjusted = base * age_adjustment(inputs.start_age, CPP_DEFERRAL_INCREASE_PER_MONTH);
    adjusted.clamp(0.0, CPP_MAX_MONTHLY * CPP_MAX_MULTIPLIER)
}

/// OAS for one person given that person's current annual income.
///
/// A manual benefit replaces the residency and age calculation; the
/// clawback still applies to it.
pub fn oas_monthly_benefit(inputs: &OasInputs, annual_income: f64) -> OasBenefit {
    let gross_monthly = match inputs.manual_monthly_benefit {
        Some(manual) if manual > 0.0 => manual,
        _ => {
            let residency = (inputs.years_in_canada as f64 / OAS_FULL_RESIDENCY_YEARS).min(1.0);
            OAS_MAX_MONTHLY
                * residency
                * age_adjustment(inputs.start_age, OAS_DEFERRAL_INCREASE_PER_MONTH)
        }
    };

    let clawback_monthly = oas_clawback_monthly(annual_income, inputs.clawback_threshold);
    let net_monthly =
        (gross_monthly - clawback_monthly).clamp(0.0, OAS_MAX_MONTHLY * OAS_MAX_MULTIPLIER);

    OasBenefit {
        gross_monthly,
        clawback_monthly,
        net_monthly,
    }
}

pub fn oas_clawback_monthly(annual_income: f64, threshold: f64) -> f64 {
    if !annual_income.is_finite() || annual_income <= threshold {
        return 0.0;
    }
    (annual_income - threshold) * OAS_CLAWBACK_RATE / 12.0
}
