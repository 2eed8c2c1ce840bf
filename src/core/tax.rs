use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;

pub const CAPITAL_GAINS_INCLUSION_RATE: f64 = 0.50;
pub const ELIGIBLE_DIVIDEND_GROSS_UP: f64 = 1.38;
pub const FEDERAL_ELIGIBLE_DIVIDEND_CREDIT: f64 = 0.150198;
pub const NON_ELIGIBLE_DIVIDEND_FACTOR: f64 = 0.90;

// Quebec eligible dividends use a flat simplification instead of brackets.
pub const QUEBEC_DIVIDEND_GROSS_UP: f64 = 1.15;
pub const QUEBEC_DIVIDEND_TOP_RATE: f64 = 0.5331;
pub const QUEBEC_DIVIDEND_CREDIT_RATE: f64 = 0.267198;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Province {
    AB,
    BC,
    MB,
    NB,
    NL,
    NS,
    NT,
    NU,
    #[default]
    ON,
    PE,
    QC,
    SK,
    YT,
}

impl Province {
    pub const ALL: [Province; 13] = [
        Province::AB,
        Province::BC,
        Province::MB,
        Province::NB,
        Province::NL,
        Province::NS,
        Province::NT,
        Province::NU,
        Province::ON,
        Province::PE,
        Province::QC,
        Province::SK,
        Province::YT,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Province::AB => "AB",
            Province::BC => "BC",
            Province::MB => "MB",
            Province::NB => "NB",
            Province::NL => "NL",
            Province::NS => "NS",
            Province::NT => "NT",
            Province::NU => "NU",
            Province::ON => "ON",
            Province::PE => "PE",
            Province::QC => "QC",
            Province::SK => "SK",
            Province::YT => "YT",
        }
    }

    fn brackets(self) -> &'static [TaxBracket] {
        match self {
            Province::AB => AB_BRACKETS,
            Province::BC => BC_BRACKETS,
            Province::MB => MB_BRACKETS,
            Province::NB => NB_BRACKETS,
            Province::NL => NL_BRACKETS,
            Province::NS => NS_BRACKETS,
            Province::NT => NT_BRACKETS,
            Province::NU => NU_BRACKETS,
            Province::ON => ON_BRACKETS,
            Province::PE => PE_BRACKETS,
            Province::QC => QC_BRACKETS,
            Province::SK => SK_BRACKETS,
            Province::YT => YT_BRACKETS,
        }
    }

    /// Provincial eligible-dividend credit as a share of the grossed-up amount.
    fn eligible_dividend_credit(self) -> f64 {
        match self {
            Province::AB => 0.0812,
            Province::BC => 0.12,
            Province::MB => 0.08,
            Province::NB => 0.14,
            Province::NL => 0.063,
            Province::NS => 0.0885,
            Province::NT => 0.115,
            Province::NU => 0.0551,
            Province::ON => 0.10,
            Province::PE => 0.105,
            Province::QC => 0.117,
            Province::SK => 0.11,
            Province::YT => 0.1202,
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Province {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Province::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| ProjectionError::scenario("province", format!("unknown code '{code}'")))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TaxBracket {
    pub min: f64,
    pub max: Option<f64>,
    pub rate: f64,
}

const fn bracket(min: f64, max: f64, rate: f64) -> TaxBracket {
    TaxBracket {
        min,
        max: Some(max),
        rate,
    }
}

const fn top(min: f64, rate: f64) -> TaxBracket {
    TaxBracket {
        min,
        max: None,
        rate,
    }
}

// 2024 tax year.
const FEDERAL_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 55_867.0, 0.15),
    bracket(55_867.0, 111_733.0, 0.205),
    bracket(111_733.0, 173_205.0, 0.26),
    bracket(173_205.0, 246_752.0, 0.29),
    top(246_752.0, 0.33),
];

const AB_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 148_269.0, 0.10),
    bracket(148_269.0, 177_922.0, 0.12),
    bracket(177_922.0, 237_230.0, 0.13),
    bracket(237_230.0, 355_845.0, 0.14),
    top(355_845.0, 0.15),
];

const BC_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 47_937.0, 0.0506),
    bracket(47_937.0, 95_875.0, 0.077),
    bracket(95_875.0, 110_076.0, 0.105),
    bracket(110_076.0, 133_664.0, 0.1229),
    bracket(133_664.0, 181_232.0, 0.147),
    bracket(181_232.0, 252_752.0, 0.168),
    top(252_752.0, 0.205),
];

const MB_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 47_000.0, 0.108),
    bracket(47_000.0, 100_000.0, 0.1275),
    top(100_000.0, 0.174),
];

const NB_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 49_958.0, 0.094),
    bracket(49_958.0, 99_916.0, 0.14),
    bracket(99_916.0, 185_064.0, 0.16),
    top(185_064.0, 0.195),
];

const NL_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 43_198.0, 0.087),
    bracket(43_198.0, 86_395.0, 0.145),
    bracket(86_395.0, 154_244.0, 0.158),
    bracket(154_244.0, 215_943.0, 0.178),
    bracket(215_943.0, 275_870.0, 0.198),
    bracket(275_870.0, 551_739.0, 0.208),
    bracket(551_739.0, 1_103_478.0, 0.213),
    top(1_103_478.0, 0.218),
];

const NS_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 29_590.0, 0.0879),
    bracket(29_590.0, 59_180.0, 0.1495),
    bracket(59_180.0, 93_000.0, 0.1667),
    bracket(93_000.0, 150_000.0, 0.175),
    top(150_000.0, 0.21),
];

const NT_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 50_597.0, 0.059),
    bracket(50_597.0, 101_198.0, 0.086),
    bracket(101_198.0, 164_525.0, 0.122),
    top(164_525.0, 0.1405),
];

const NU_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 53_268.0, 0.04),
    bracket(53_268.0, 106_537.0, 0.07),
    bracket(106_537.0, 173_205.0, 0.09),
    top(173_205.0, 0.115),
];

const ON_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 51_446.0, 0.0505),
    bracket(51_446.0, 102_894.0, 0.0915),
    bracket(102_894.0, 150_000.0, 0.1116),
    bracket(150_000.0, 220_000.0, 0.1216),
    top(220_000.0, 0.1316),
];

const PE_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 32_656.0, 0.0965),
    bracket(32_656.0, 64_313.0, 0.1363),
    bracket(64_313.0, 105_000.0, 0.1665),
    bracket(105_000.0, 140_000.0, 0.18),
    top(140_000.0, 0.1875),
];

const QC_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 51_780.0, 0.14),
    bracket(51_780.0, 103_545.0, 0.19),
    bracket(103_545.0, 126_000.0, 0.24),
    top(126_000.0, 0.2575),
];

const SK_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 52_057.0, 0.105),
    bracket(52_057.0, 148_734.0, 0.125),
    top(148_734.0, 0.145),
];

const YT_BRACKETS: &[TaxBracket] = &[
    bracket(0.0, 55_867.0, 0.064),
    bracket(55_867.0, 111_733.0, 0.09),
    bracket(111_733.0, 173_205.0, 0.109),
    bracket(173_205.0, 500_000.0, 0.128),
    top(500_000.0, 0.15),
];

fn bracket_rate(brackets: &[TaxBracket], income: f64) -> f64 {
    let income = income.max(0.0);
    brackets
        .iter()
        .find(|b| income >= b.min && b.max.is_none_or(|max| income <= max))
        .or(brackets.last())
        .map(|b| b.rate)
        .unwrap_or(0.0)
}

fn progressive_tax(brackets: &[TaxBracket], income: f64) -> f64 {
    let mut remaining = income.max(0.0);
    let mut tax = 0.0;
    for b in brackets {
        if remaining <= 0.0 {
            break;
        }
        let width = b.max.map_or(f64::INFINITY, |max| max - b.min);
        let taxed = remaining.min(width);
        tax += taxed * b.rate;
        remaining -= taxed;
    }
    tax
}

/// Combined federal + provincial marginal rate as a decimal fraction.
pub fn marginal_tax_rate(income: f64, province: Province) -> f64 {
    bracket_rate(FEDERAL_BRACKETS, income) + bracket_rate(province.brackets(), income)
}

/// Total federal + provincial income tax on `income`.
pub fn income_tax(income: f64, province: Province) -> f64 {
    progressive_tax(FEDERAL_BRACKETS, income) + progressive_tax(province.brackets(), income)
}

pub fn average_tax_rate(income: f64, province: Province) -> f64 {
    if income <= 0.0 {
        return 0.0;
    }
    income_tax(income, province) / income
}

/// Tax on a realized capital gain stacked on top of `other_income`.
pub fn capital_gains_tax(gain: f64, other_income: f64, province: Province) -> f64 {
    if gain <= 0.0 {
        return 0.0;
    }
    let included = gain * CAPITAL_GAINS_INCLUSION_RATE;
    let rate = marginal_tax_rate(other_income.max(0.0) + included, province);
    (included * rate).max(0.0)
}

pub fn eligible_dividend_tax(dividend: f64, other_income: f64, province: Province) -> f64 {
    if dividend <= 0.0 {
        return 0.0;
    }
    if province == Province::QC {
        let grossed_up = dividend * QUEBEC_DIVIDEND_GROSS_UP;
        return (grossed_up * (QUEBEC_DIVIDEND_TOP_RATE - QUEBEC_DIVIDEND_CREDIT_RATE)).max(0.0);
    }

    let grossed_up = dividend * ELIGIBLE_DIVIDEND_GROSS_UP;
    let rate = marginal_tax_rate(other_income.max(0.0) + grossed_up, province);
    let gross_tax = grossed_up * rate;
    let credits = grossed_up * (FEDERAL_ELIGIBLE_DIVIDEND_CREDIT + province.eligible_dividend_credit());
    (gross_tax - credits).max(0.0)
}

pub fn foreign_dividend_tax(dividend: f64, other_income: f64, province: Province) -> f64 {
    if dividend <= 0.0 {
        return 0.0;
    }
    let rate = marginal_tax_rate(other_income.max(0.0) + dividend, province);
    (dividend * rate).max(0.0)
}

/// Approximated as a fixed share of the foreign-dividend tax.
pub fn non_eligible_dividend_tax(dividend: f64, other_income: f64, province: Province) -> f64 {
    foreign_dividend_tax(dividend, other_income, province) * NON_ELIGIBLE_DIVIDEND_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn every_province_has_a_top_bracket_without_max() {
        for province in Province::ALL {
            let brackets = province.brackets();
            assert!(brackets.last().is_some_and(|b| b.max.is_none()), "{province}");
            for pair in brackets.windows(2) {
                assert_eq!(pair[0].max, Some(pair[1].min), "{province} gap");
            }
        }
    }

    #[test]
    fn marginal_rate_sums_federal_and_provincial_brackets() {
        assert_approx(marginal_tax_rate(40_000.0, Province::ON), 0.15 + 0.0505);
        assert_approx(marginal_tax_rate(80_000.0, Province::ON), 0.205 + 0.0915);
        assert_approx(marginal_tax_rate(1_000_000.0, Province::AB), 0.33 + 0.15);
    }

    #[test]
    fn marginal_rate_uses_lower_bracket_on_boundary() {
        assert_approx(marginal_tax_rate(55_867.0, Province::YT), 0.15 + 0.064);
    }

    #[test]
    fn average_rate_integrates_progressively() {
        let income = 60_000.0;
        let federal = 55_867.0 * 0.15 + (60_000.0 - 55_867.0) * 0.205;
        let provincial = 51_446.0 * 0.0505 + (60_000.0 - 51_446.0) * 0.0915;
        assert_approx(income_tax(income, Province::ON), federal + provincial);
        assert_approx(
            average_tax_rate(income, Province::ON),
            (federal + provincial) / income,
        );
        assert!(average_tax_rate(income, Province::ON) < marginal_tax_rate(income, Province::ON));
    }

    #[test]
    fn average_rate_is_zero_without_income() {
        assert_approx(average_tax_rate(0.0, Province::BC), 0.0);
        assert_approx(average_tax_rate(-5.0, Province::BC), 0.0);
    }

    #[test]
    fn capital_gains_tax_halves_the_gain_before_marginal_rate() {
        let tax = capital_gains_tax(1_000.0, 40_000.0, Province::ON);
        assert_approx(tax, 500.0 * (0.15 + 0.0505));
        assert_approx(capital_gains_tax(-1_000.0, 40_000.0, Province::ON), 0.0);
    }

    #[test]
    fn eligible_dividends_get_gross_up_and_credits() {
        let dividend = 1_000.0;
        let grossed = 1_380.0;
        let expected =
            grossed * (0.15 + 0.0505) - grossed * (FEDERAL_ELIGIBLE_DIVIDEND_CREDIT + 0.10);
        let tax = eligible_dividend_tax(dividend, 20_000.0, Province::ON);
        assert_approx(tax, expected.max(0.0));
        assert!(tax >= 0.0);
    }

    #[test]
    fn eligible_dividends_at_high_income_pay_positive_tax() {
        let tax = eligible_dividend_tax(1_000.0, 300_000.0, Province::ON);
        assert!(tax > 0.0);
        assert!(tax < foreign_dividend_tax(1_000.0, 300_000.0, Province::ON));
    }

    #[test]
    fn quebec_dividends_use_flat_simplification() {
        let tax = eligible_dividend_tax(1_000.0, 50_000.0, Province::QC);
        assert_approx(
            tax,
            1_150.0 * (QUEBEC_DIVIDEND_TOP_RATE - QUEBEC_DIVIDEND_CREDIT_RATE),
        );
        assert_approx(
            eligible_dividend_tax(1_000.0, 500_000.0, Province::QC),
            tax,
        );
    }

    #[test]
    fn non_eligible_dividends_are_ninety_percent_of_foreign() {
        let foreign = foreign_dividend_tax(2_000.0, 70_000.0, Province::BC);
        assert_approx(
            non_eligible_dividend_tax(2_000.0, 70_000.0, Province::BC),
            foreign * 0.9,
        );
    }

    #[test]
    fn province_codes_parse_case_insensitively_and_reject_unknown() {
        assert_eq!("qc".parse::<Province>().unwrap(), Province::QC);
        assert_eq!(" ON ".parse::<Province>().unwrap(), Province::ON);
        let err = "ZZ".parse::<Province>().expect_err("unknown province");
        assert!(matches!(err, ProjectionError::InvalidScenarioConfig { .. }));
    }

    #[test]
    fn province_serde_uses_upper_case_codes() {
        let json = serde_json::to_string(&Province::NL).unwrap();
        assert_eq!(json, "\"NL\"");
        assert!(serde_json::from_str::<Province>("\"XX\"").is_err());
    }
}
