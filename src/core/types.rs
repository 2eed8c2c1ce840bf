use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CASH_TICKER: &str = "CASH";

/// Annual rate as a decimal fraction (`0.05` is 5%).
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(f64);

impl Rate {
    pub const ZERO: Rate = Rate(0.0);

    pub const fn from_decimal(value: f64) -> Self {
        Self(value)
    }

    pub fn from_percent(points: f64) -> Self {
        Self(points / 100.0)
    }

    pub fn as_decimal(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }

    pub fn scale(self, factor: f64) -> Self {
        Self(self.0 * factor)
    }

    /// Monthly rate for this annual rate under the given convention.
    pub fn monthly(self, compounding: Compounding) -> f64 {
        match compounding {
            Compounding::NominalMonthly => self.0 / 12.0,
            Compounding::EffectiveAnnual => {
                if self.0 <= -1.0 {
                    -1.0
                } else {
                    (1.0 + self.0).powf(1.0 / 12.0) - 1.0
                }
            }
        }
    }
}

/// Rate quoted in percentage points (`5.0` is 5%), the unit lenders use.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PercentagePoints(f64);

impl PercentagePoints {
    pub const fn new(points: f64) -> Self {
        Self(points)
    }

    pub fn points(self) -> f64 {
        self.0
    }

    pub fn to_rate(self) -> Rate {
        Rate::from_percent(self.0)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// `(1 + r)^(1/12) - 1`; twelve months compound to exactly `r`.
    #[default]
    EffectiveAnnual,
    /// `r / 12`.
    NominalMonthly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Asset,
    Liability,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Chequing,
    Tfsa,
    Rrsp,
    Dcpp,
    Resp,
    NonRegistered,
    PrimaryHome,
    RentalProperty,
    Mortgage,
    Loan,
    CreditCard,
}

impl AccountType {
    pub fn is_investment(self) -> bool {
        matches!(
            self,
            AccountType::Tfsa
                | AccountType::Rrsp
                | AccountType::Dcpp
                | AccountType::Resp
                | AccountType::NonRegistered
        )
    }

    pub fn is_registered(self) -> bool {
        matches!(
            self,
            AccountType::Tfsa | AccountType::Rrsp | AccountType::Dcpp | AccountType::Resp
        )
    }

    pub fn is_cash(self) -> bool {
        matches!(self, AccountType::Cash | AccountType::Chequing)
    }

    pub fn is_real_estate(self) -> bool {
        matches!(self, AccountType::PrimaryHome | AccountType::RentalProperty)
    }

    pub fn is_rrsp_pool(self) -> bool {
        matches!(self, AccountType::Rrsp | AccountType::Dcpp)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendType {
    #[default]
    CanadianEligible,
    CanadianNonEligible,
    Foreign,
    None,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateOverrides {
    pub growth_rate: Option<Rate>,
    pub dividend_yield: Option<Rate>,
    pub dividend_type: Option<DividendType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub ticker: String,
    pub shares: f64,
    pub current_price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_overrides: Option<RateOverrides>,
}

impl Holding {
    pub fn new(ticker: &str, shares: f64, current_price: f64) -> Self {
        let mut holding = Self {
            ticker: ticker.to_string(),
            shares: shares.max(0.0),
            current_price: 0.0,
            currency: default_currency(),
            rate_overrides: None,
        };
        holding.current_price = if holding.is_cash() {
            1.0
        } else {
            current_price.max(0.0)
        };
        holding
    }

    pub fn is_cash(&self) -> bool {
        self.ticker.eq_ignore_ascii_case(CASH_TICKER)
    }

    /// Price used for valuation; cash is always worth 1.0 per unit.
    pub fn price(&self) -> f64 {
        if self.is_cash() {
            1.0
        } else {
            self.current_price.max(0.0)
        }
    }

    pub fn set_price(&mut self, price: f64) {
        if self.is_cash() {
            self.current_price = 1.0;
        } else if price.is_finite() {
            self.current_price = price.max(0.0);
        }
    }

    pub fn market_value(&self) -> f64 {
        self.shares.max(0.0) * self.price()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: AccountKind,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<PercentagePoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_remaining_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holdings: Vec<Holding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_overrides: Option<RateOverrides>,
}

impl Account {
    pub fn new(id: &str, account_type: AccountType, balance: f64) -> Self {
        let kind = match account_type {
            AccountType::Mortgage | AccountType::Loan | AccountType::CreditCard => {
                AccountKind::Liability
            }
            _ => AccountKind::Asset,
        };
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            account_type,
            balance,
            currency: default_currency(),
            interest_rate: None,
            monthly_payment: None,
            term_remaining_months: None,
            holdings: Vec::new(),
            rate_overrides: None,
        }
    }

    pub fn is_liability(&self) -> bool {
        self.kind == AccountKind::Liability
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: TransactionKind,
}

pub(crate) fn default_currency() -> String {
    "CAD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: String,
    pub kind: AccountKind,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionMonth {
    pub date: NaiveDate,
    pub month_index: u32,
    pub age: f64,
    pub is_retired: bool,
    pub cash_balance: f64,
    pub registered_balance: f64,
    pub non_registered_balance: f64,
    pub real_estate_balance: f64,
    pub other_assets_balance: f64,
    pub mortgage_balance: f64,
    pub other_debt_balance: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
    pub net_worth_change: f64,
    pub income: f64,
    pub cpp_income: f64,
    pub oas_income: f64,
    pub withdrawal_income: f64,
    pub expenses: f64,
    pub savings: f64,
    pub savings_rate: f64,
    pub investment_growth: f64,
    pub investment_dividends: f64,
    pub investment_tax: f64,
    pub debt_payment: f64,
    pub debt_principal: f64,
    pub debt_interest: f64,
    pub account_balances: Vec<AccountBalance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionYear {
    pub year: i32,
    pub start_net_worth: f64,
    pub end_net_worth: f64,
    pub net_worth_change: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_savings: f64,
    pub average_savings_rate: f64,
    pub investment_growth: f64,
    pub investment_dividends: f64,
    pub investment_tax: f64,
    pub debt_payments: f64,
    pub debt_principal: f64,
    pub debt_interest: f64,
    pub ending_assets: f64,
    pub ending_liabilities: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub starting_net_worth: f64,
    pub ending_net_worth: f64,
    pub total_growth: f64,
    /// CAGR in percent.
    pub average_annual_growth: f64,
    pub peak_net_worth: f64,
    pub peak_year: i32,
    pub debt_free_date: Option<NaiveDate>,
    pub retirement_date: Option<NaiveDate>,
    pub total_investment_tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub scenario_id: String,
    pub months: Vec<ProjectionMonth>,
    pub years: Vec<ProjectionYear>,
    pub summary: ProjectionSummary,
    pub warnings: Vec<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Invest,
    Mortgage,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MortgageVsInvestComparison {
    pub recommendation: Recommendation,
    pub months_to_payoff: u32,
    pub paid_off: bool,
    pub prepay_net_worth: f64,
    pub invest_net_worth: f64,
    pub investment_balance: f64,
    pub remaining_mortgage_balance: f64,
    pub prepay_interest_paid: f64,
    pub invest_interest_paid: f64,
    pub net_worth_difference: f64,
    pub decision_threshold: f64,
    pub rationale: String,
}
