use serde::Serialize;

use super::scenario::Assumptions;
use super::tax::{
    Province, capital_gains_tax, eligible_dividend_tax, foreign_dividend_tax,
    non_eligible_dividend_tax,
};
use super::types::{Account, AccountType, Compounding, DividendType, Holding, Rate, RateOverrides};

/// Annual rates above this magnitude are reported as suspicious.
pub const UNUSUAL_ANNUAL_RATE: f64 = 0.50;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRates {
    pub growth: Rate,
    pub dividend_yield: Rate,
    pub dividend_type: DividendType,
}

impl ResolvedRates {
    pub fn is_unusual(&self) -> bool {
        self.growth.as_decimal().abs() > UNUSUAL_ANNUAL_RATE
            || self.dividend_yield.as_decimal().abs() > UNUSUAL_ANNUAL_RATE
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturn {
    pub gross_growth: f64,
    pub gross_dividends: f64,
    pub after_tax_growth: f64,
    pub after_tax_dividends: f64,
    pub after_tax_total: f64,
    pub tax_paid: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TaxContext {
    pub province: Province,
    pub annual_income: f64,
}

fn pick<T: Copy>(
    holding: Option<&RateOverrides>,
    scenario: Option<&RateOverrides>,
    stored: Option<&RateOverrides>,
    field: impl Fn(&RateOverrides) -> Option<T>,
) -> Option<T> {
    holding
        .and_then(&field)
        .or_else(|| scenario.and_then(&field))
        .or_else(|| stored.and_then(&field))
}

fn resolve_with(
    holding: Option<&RateOverrides>,
    account: &Account,
    assumptions: &Assumptions,
) -> ResolvedRates {
    let scenario = assumptions.account_override(&account.id);
    let stored = account.rate_overrides.as_ref();

    let growth = pick(holding, scenario, stored, |o| o.growth_rate)
        .or(assumptions.growth_rate)
        .unwrap_or_else(|| assumptions.blended_growth());
    let dividend_yield = pick(holding, scenario, stored, |o| o.dividend_yield)
        .or(assumptions.dividend_yield)
        .unwrap_or_else(|| assumptions.blended_yield());
    let dividend_type =
        pick(holding, scenario, stored, |o| o.dividend_type).unwrap_or(assumptions.dividend_type);

    ResolvedRates {
        growth,
        dividend_yield,
        dividend_type,
    }
}

pub fn resolve_holding_rates(
    holding: &Holding,
    account: &Account,
    assumptions: &Assumptions,
) -> ResolvedRates {
    resolve_with(holding.rate_overrides.as_ref(), account, assumptions)
}

/// Effective annual rates for an account.
///
/// Each component falls through holding override, scenario per-account
/// override, the account's stored override, the scenario's global rate and
/// finally the 70/30 split of the blended return. Accounts with priced
/// holdings take the value-weighted average; the dividend type follows the
/// largest holding.
pub fn resolve_account_rates(account: &Account, assumptions: &Assumptions) -> ResolvedRates {
    let total_value: f64 = account.holdings.iter().map(Holding::market_value).sum();
    if account.holdings.is_empty() || total_value <= 0.0 {
        return resolve_with(None, account, assumptions);
    }

    let mut growth = 0.0;
    let mut dividend_yield = 0.0;
    let mut largest: Option<(f64, DividendType)> = None;
    for holding in &account.holdings {
        let weight = holding.market_value() / total_value;
        let rates = resolve_holding_rates(holding, account, assumptions);
        growth += rates.growth.as_decimal() * weight;
        dividend_yield += rates.dividend_yield.as_decimal() * weight;
        if largest.is_none_or(|(value, _)| holding.market_value() > value) {
            largest = Some((holding.market_value(), rates.dividend_type));
        }
    }

    ResolvedRates {
        growth: Rate::from_decimal(growth),
        dividend_yield: Rate::from_decimal(dividend_yield),
        dividend_type: largest
            .map(|(_, t)| t)
            .unwrap_or(assumptions.dividend_type),
    }
}

pub fn dividend_tax(
    dividend_type: DividendType,
    dividend: f64,
    ctx: &TaxContext,
) -> f64 {
    match dividend_type {
        DividendType::CanadianEligible => {
            eligible_dividend_tax(dividend, ctx.annual_income, ctx.province)
        }
        DividendType::CanadianNonEligible => {
            non_eligible_dividend_tax(dividend, ctx.annual_income, ctx.province)
        }
        DividendType::Foreign => foreign_dividend_tax(dividend, ctx.annual_income, ctx.province),
        DividendType::None => 0.0,
    }
}

pub fn monthly_return(
    balance: f64,
    account_type: AccountType,
    rates: &ResolvedRates,
    ctx: &TaxContext,
    compounding: Compounding,
) -> MonthlyReturn {
    if balance <= 0.0 {
        return MonthlyReturn::default();
    }

    let gross_growth = balance * rates.growth.monthly(compounding);
    let gross_dividends = balance * rates.dividend_yield.monthly(compounding);

    let (growth_tax, dividend_tax) = if account_type.is_registered() {
        (0.0, 0.0)
    } else {
        (
            capital_gains_tax(gross_growth, ctx.annual_income, ctx.province),
            dividend_tax(rates.dividend_type, gross_dividends, ctx),
        )
    };

    let after_tax_growth = gross_growth - growth_tax;
    let after_tax_dividends = gross_dividends - dividend_tax;
    MonthlyReturn {
        gross_growth,
        gross_dividends,
        after_tax_growth,
        after_tax_dividends,
        after_tax_total: after_tax_growth + after_tax_dividends,
        tax_paid: growth_tax + dividend_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn ctx() -> TaxContext {
        TaxContext {
            province: Province::ON,
            annual_income: 60_000.0,
        }
    }

    fn overrides(growth: f64, dividend_yield: f64) -> RateOverrides {
        RateOverrides {
            growth_rate: Some(Rate::from_decimal(growth)),
            dividend_yield: Some(Rate::from_decimal(dividend_yield)),
            dividend_type: None,
        }
    }

    #[test]
    fn blended_rate_splits_seventy_thirty() {
        let assumptions = Assumptions {
            investment_return_rate: Rate::from_decimal(0.10),
            ..Assumptions::default()
        };
        let account = Account::new("tfsa", AccountType::Tfsa, 1_000.0);
        let rates = resolve_account_rates(&account, &assumptions);
        assert_approx(rates.growth.as_decimal(), 0.07);
        assert_approx(rates.dividend_yield.as_decimal(), 0.03);
    }

    #[test]
    fn precedence_runs_from_holding_to_global() {
        let mut assumptions = Assumptions {
            growth_rate: Some(Rate::from_decimal(0.05)),
            ..Assumptions::default()
        };
        let mut account = Account::new("acct", AccountType::NonRegistered, 1_000.0);
        assert_approx(
            resolve_account_rates(&account, &assumptions).growth.as_decimal(),
            0.05,
        );

        account.rate_overrides = Some(overrides(0.04, 0.01));
        assert_approx(
            resolve_account_rates(&account, &assumptions).growth.as_decimal(),
            0.04,
        );

        assumptions
            .account_overrides
            .insert("acct".to_string(), overrides(0.03, 0.01));
        assert_approx(
            resolve_account_rates(&account, &assumptions).growth.as_decimal(),
            0.03,
        );

        let mut holding = Holding::new("XEQT", 10.0, 30.0);
        holding.rate_overrides = Some(overrides(0.08, 0.02));
        account.holdings.push(holding);
        assert_approx(
            resolve_account_rates(&account, &assumptions).growth.as_decimal(),
            0.08,
        );
    }

    #[test]
    fn components_resolve_independently() {
        let assumptions = Assumptions {
            investment_return_rate: Rate::from_decimal(0.10),
            ..Assumptions::default()
        };
        let mut account = Account::new("acct", AccountType::NonRegistered, 1_000.0);
        account.rate_overrides = Some(RateOverrides {
            growth_rate: Some(Rate::from_decimal(0.02)),
            dividend_yield: None,
            dividend_type: Some(DividendType::Foreign),
        });
        let rates = resolve_account_rates(&account, &assumptions);
        assert_approx(rates.growth.as_decimal(), 0.02);
        assert_approx(rates.dividend_yield.as_decimal(), 0.03);
        assert_eq!(rates.dividend_type, DividendType::Foreign);
    }

    #[test]
    fn holdings_are_value_weighted() {
        let assumptions = Assumptions::default();
        let mut account = Account::new("acct", AccountType::Rrsp, 4_000.0);
        let mut bonds = Holding::new("ZAG", 100.0, 10.0);
        bonds.rate_overrides = Some(RateOverrides {
            dividend_type: Some(DividendType::Foreign),
            ..overrides(0.02, 0.03)
        });
        let mut stocks = Holding::new("XEQT", 100.0, 30.0);
        stocks.rate_overrides = Some(overrides(0.06, 0.02));
        account.holdings = vec![bonds, stocks];

        let rates = resolve_account_rates(&account, &assumptions);
        assert_approx(rates.growth.as_decimal(), 0.25 * 0.02 + 0.75 * 0.06);
        assert_approx(rates.dividend_yield.as_decimal(), 0.25 * 0.03 + 0.75 * 0.02);
        assert_eq!(rates.dividend_type, assumptions.dividend_type);
    }

    #[test]
    fn cash_holding_uses_account_chain() {
        let assumptions = Assumptions {
            growth_rate: Some(Rate::from_decimal(0.01)),
            dividend_yield: Some(Rate::ZERO),
            ..Assumptions::default()
        };
        let mut account = Account::new("acct", AccountType::Tfsa, 500.0);
        account.holdings.push(Holding::new("CASH", 500.0, 7.0));
        let rates = resolve_account_rates(&account, &assumptions);
        assert_approx(rates.growth.as_decimal(), 0.01);
    }

    #[test]
    fn registered_accounts_are_sheltered() {
        let rates = ResolvedRates {
            growth: Rate::from_decimal(0.06),
            dividend_yield: Rate::from_decimal(0.03),
            dividend_type: DividendType::Foreign,
        };
        for account_type in [
            AccountType::Tfsa,
            AccountType::Rrsp,
            AccountType::Dcpp,
            AccountType::Resp,
        ] {
            let r = monthly_return(10_000.0, account_type, &rates, &ctx(), Compounding::NominalMonthly);
            assert_approx(r.tax_paid, 0.0);
            assert_approx(r.after_tax_total, r.gross_growth + r.gross_dividends);
            assert_approx(r.gross_growth, 50.0);
            assert_approx(r.gross_dividends, 25.0);
        }
    }

    #[test]
    fn non_registered_growth_pays_capital_gains_tax() {
        let rates = ResolvedRates {
            growth: Rate::from_decimal(0.06),
            dividend_yield: Rate::ZERO,
            dividend_type: DividendType::None,
        };
        let r = monthly_return(
            10_000.0,
            AccountType::NonRegistered,
            &rates,
            &ctx(),
            Compounding::NominalMonthly,
        );
        let expected_tax = capital_gains_tax(50.0, 60_000.0, Province::ON);
        assert_approx(r.tax_paid, expected_tax);
        assert!(r.after_tax_growth < r.gross_growth);
        assert_approx(r.after_tax_dividends, 0.0);
    }

    #[test]
    fn dividend_type_selects_tax_function() {
        let base = ResolvedRates {
            growth: Rate::ZERO,
            dividend_yield: Rate::from_decimal(0.12),
            dividend_type: DividendType::Foreign,
        };
        let foreign = monthly_return(
            10_000.0,
            AccountType::NonRegistered,
            &base,
            &ctx(),
            Compounding::NominalMonthly,
        );
        let non_eligible = monthly_return(
            10_000.0,
            AccountType::NonRegistered,
            &ResolvedRates {
                dividend_type: DividendType::CanadianNonEligible,
                ..base
            },
            &ctx(),
            Compounding::NominalMonthly,
        );
        let none = monthly_return(
            10_000.0,
            AccountType::NonRegistered,
            &ResolvedRates {
                dividend_type: DividendType::None,
                ..base
            },
            &ctx(),
            Compounding::NominalMonthly,
        );
        assert_approx(non_eligible.tax_paid, foreign.tax_paid * 0.9);
        assert_approx(none.tax_paid, 0.0);
        assert!(foreign.tax_paid > 0.0);
    }

    #[test]
    fn effective_compounding_reaches_annual_rate_in_twelve_months() {
        let rates = ResolvedRates {
            growth: Rate::from_decimal(0.05),
            dividend_yield: Rate::ZERO,
            dividend_type: DividendType::None,
        };
        let mut balance = 10_000.0;
        for _ in 0..12 {
            balance += monthly_return(balance, AccountType::Tfsa, &rates, &ctx(), Compounding::EffectiveAnnual)
                .after_tax_total;
        }
        assert!((balance - 10_500.0).abs() < 1e-6);
    }

    #[test]
    fn unusual_rates_are_flagged() {
        let rates = ResolvedRates {
            growth: Rate::from_percent(55.0),
            dividend_yield: Rate::ZERO,
            dividend_type: DividendType::None,
        };
        assert!(rates.is_unusual());
        assert!(
            !ResolvedRates {
                growth: Rate::from_decimal(0.08),
                ..rates
            }
            .is_unusual()
        );
    }

    #[test]
    fn empty_balance_earns_nothing() {
        let rates = ResolvedRates {
            growth: Rate::from_decimal(0.05),
            dividend_yield: Rate::from_decimal(0.02),
            dividend_type: DividendType::Foreign,
        };
        let r = monthly_return(0.0, AccountType::NonRegistered, &rates, &ctx(), Compounding::EffectiveAnnual);
        assert_eq!(r, MonthlyReturn::default());
    }
}
