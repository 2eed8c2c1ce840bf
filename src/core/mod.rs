mod benefits;
mod cashflow;
mod engine;
mod mortgage;
mod returns;
mod scenario;
mod tax;
mod types;

pub use benefits::{
    CPP_MAX_MONTHLY, CppInputs, OAS_DEFAULT_CLAWBACK_THRESHOLD, OAS_MAX_MONTHLY, OasBenefit,
    OasInputs, cpp_monthly_benefit, oas_clawback_monthly, oas_monthly_benefit,
};
pub use cashflow::{MonthlyAverages, average_monthly_cashflow};
pub use engine::project_net_worth;
pub use mortgage::{DECISION_THRESHOLD_SHARE, MAX_PAYOFF_MONTHS, compare_mortgage_vs_invest};
pub use returns::{
    MonthlyReturn, ResolvedRates, TaxContext, UNUSUAL_ANNUAL_RATE, monthly_return,
    resolve_account_rates, resolve_holding_rates,
};
pub use scenario::{
    Assumptions, BLENDED_GROWTH_SHARE, ContributionRoom, CppConfig, EventFrequency, IncomeConfig,
    LifeEvent, LifeEventKind, MAX_PROJECTION_YEARS, MIN_PROJECTION_YEARS, OasConfig, PersonIncome,
    ProjectionConfig, ProjectionScenario, RespConfig, RetirementConfig, WithdrawalStrategy,
};
pub use tax::{
    CAPITAL_GAINS_INCLUSION_RATE, Province, TaxBracket, average_tax_rate, capital_gains_tax,
    eligible_dividend_tax, foreign_dividend_tax, income_tax, marginal_tax_rate,
    non_eligible_dividend_tax,
};
pub use types::{
    Account, AccountBalance, AccountKind, AccountType, CASH_TICKER, Compounding, DividendType,
    Holding, MortgageVsInvestComparison, PercentagePoints, ProjectionMonth, ProjectionResult,
    ProjectionSummary, ProjectionYear, Rate, RateOverrides, Recommendation, Transaction,
    TransactionKind,
};
