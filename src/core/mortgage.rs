use tracing::debug;

use super::scenario::Assumptions;
use super::types::{Account, MortgageVsInvestComparison, Recommendation};
use crate::error::{ProjectionError, Result};

/// Longest prepayment horizon simulated, in months.
pub const MAX_PAYOFF_MONTHS: u32 = 600;
/// Net worth gap, as a share of the original balance, needed to pick a side.
pub const DECISION_THRESHOLD_SHARE: f64 = 0.10;
const PAID_OFF_BALANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct AmortizationStep {
    balance: f64,
    interest: f64,
}

fn amortize(balance: f64, monthly_rate: f64, payment: f64) -> AmortizationStep {
    let interest = balance * monthly_rate;
    let principal = (payment - interest).clamp(0.0, balance);
    AmortizationStep {
        balance: balance - principal,
        interest,
    }
}

/// Compares prepaying `mortgage` with `monthly_surplus` against investing
/// the surplus at the scenario's blended return over the same horizon.
pub fn compare_mortgage_vs_invest(
    mortgage: &Account,
    monthly_surplus: f64,
    assumptions: &Assumptions,
) -> Result<MortgageVsInvestComparison> {
    let payment = mortgage
        .monthly_payment
        .filter(|p| p.is_finite())
        .ok_or_else(|| ProjectionError::input("monthlyPayment", "mortgage has no monthly payment"))?;
    let rate = mortgage
        .interest_rate
        .filter(|r| r.points().is_finite())
        .ok_or_else(|| ProjectionError::input("interestRate", "mortgage has no interest rate"))?;
    if !monthly_surplus.is_finite() || monthly_surplus < 0.0 {
        return Err(ProjectionError::input(
            "monthlySurplus",
            format!("must be a non-negative amount, got {monthly_surplus}"),
        ));
    }

    let original_balance = mortgage.balance.max(0.0);
    let mortgage_monthly = rate.to_rate().as_decimal() / 12.0;
    let invest_rate = assumptions.investment_return_rate;
    let invest_monthly = invest_rate.as_decimal() / 12.0;

    let mut prepay_balance = original_balance;
    let mut prepay_interest_paid = 0.0;
    let mut months_to_payoff = 0;
    while prepay_balance > PAID_OFF_BALANCE && months_to_payoff < MAX_PAYOFF_MONTHS {
        let step = amortize(prepay_balance, mortgage_monthly, payment + monthly_surplus);
        prepay_balance = step.balance;
        prepay_interest_paid += step.interest;
        months_to_payoff += 1;
    }
    let paid_off = prepay_balance <= PAID_OFF_BALANCE;
    if !paid_off {
        debug!(
            remaining = prepay_balance,
            "mortgage not paid off within {MAX_PAYOFF_MONTHS} months of prepayment"
        );
    }

    let mut investment_balance = 0.0;
    let mut remaining_mortgage_balance = original_balance;
    let mut invest_interest_paid = 0.0;
    for _ in 0..months_to_payoff {
        investment_balance = investment_balance * (1.0 + invest_monthly) + monthly_surplus;
        let step = amortize(remaining_mortgage_balance, mortgage_monthly, payment);
        remaining_mortgage_balance = step.balance;
        invest_interest_paid += step.interest;
    }

    let prepay_net_worth = if paid_off { 0.0 } else { -prepay_balance };
    let invest_net_worth = investment_balance - remaining_mortgage_balance;
    let net_worth_difference = invest_net_worth - prepay_net_worth;
    let decision_threshold = original_balance * DECISION_THRESHOLD_SHARE;

    let recommendation = if net_worth_difference > decision_threshold {
        Recommendation::Invest
    } else if -net_worth_difference > decision_threshold {
        Recommendation::Mortgage
    } else {
        Recommendation::Hybrid
    };

    let verdict = match recommendation {
        Recommendation::Invest => "investing the surplus comes out ahead",
        Recommendation::Mortgage => "prepaying the mortgage comes out ahead",
        Recommendation::Hybrid => "the two paths end within the decision threshold, so split the surplus",
    };
    let rationale = format!(
        "Mortgage rate {:.2}% vs expected investment return {:.2}%: after {months_to_payoff} months {verdict} \
         (difference {net_worth_difference:.0}, threshold {decision_threshold:.0}).",
        rate.points(),
        invest_rate.as_percent(),
    );

    Ok(MortgageVsInvestComparison {
        recommendation,
        months_to_payoff,
        paid_off,
        prepay_net_worth,
        invest_net_worth,
        investment_balance,
        remaining_mortgage_balance,
        prepay_interest_paid,
        invest_interest_paid,
        net_worth_difference,
        decision_threshold,
        rationale,
    })
}
