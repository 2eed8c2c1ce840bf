use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, warn};

use super::benefits::{OasInputs, cpp_monthly_benefit, oas_monthly_benefit};
use super::cashflow::average_monthly_cashflow;
use super::returns::{ResolvedRates, TaxContext, UNUSUAL_ANNUAL_RATE, monthly_return, resolve_account_rates};
use super::scenario::{
    Assumptions, ContributionRoom, LifeEvent, LifeEventKind, ProjectionScenario,
    WithdrawalStrategy,
};
use super::types::{
    Account, AccountBalance, AccountKind, AccountType, Compounding, PercentagePoints,
    ProjectionMonth, ProjectionResult, ProjectionSummary, ProjectionYear, Transaction,
};
use crate::error::{ProjectionError, Result};

const DEBT_FREE_THRESHOLD: f64 = 0.01;
const INVESTMENT_SHARE: f64 = 0.70;
const EPS: f64 = 1e-9;

type AccountFilter = fn(&AccountState) -> bool;

const DRAWDOWN_ORDER: [AccountFilter; 4] = [
    AccountState::is_cash,
    AccountState::is_non_registered,
    AccountState::is_tfsa,
    AccountState::is_rrsp_pool,
];

#[derive(Debug, Clone)]
struct AccountState {
    id: String,
    kind: AccountKind,
    account_type: AccountType,
    balance: f64,
    rates: Option<ResolvedRates>,
    interest_rate: Option<PercentagePoints>,
    monthly_payment: Option<f64>,
    term_remaining_months: Option<u32>,
}

impl AccountState {
    fn new(account: &Account, assumptions: &Assumptions) -> Self {
        let mut balance = if account.balance.is_finite() {
            account.balance
        } else {
            0.0
        };
        if account.is_liability() && balance < 0.0 {
            debug!(account = %account.id, balance, "negative liability balance clamped to zero");
            balance = 0.0;
        }
        let rates = (!account.is_liability() && account.account_type.is_investment())
            .then(|| resolve_account_rates(account, assumptions));

        Self {
            id: account.id.clone(),
            kind: account.kind,
            account_type: account.account_type,
            balance,
            rates,
            interest_rate: account.interest_rate,
            monthly_payment: account.monthly_payment,
            term_remaining_months: account.term_remaining_months,
        }
    }

    fn is_asset(&self) -> bool {
        self.kind == AccountKind::Asset
    }

    fn is_cash(&self) -> bool {
        self.is_asset() && self.account_type.is_cash()
    }

    fn is_investment(&self) -> bool {
        self.is_asset() && self.account_type.is_investment()
    }

    fn is_non_registered(&self) -> bool {
        self.is_asset() && self.account_type == AccountType::NonRegistered
    }

    fn is_tfsa(&self) -> bool {
        self.is_asset() && self.account_type == AccountType::Tfsa
    }

    fn is_rrsp_pool(&self) -> bool {
        self.is_asset() && self.account_type.is_rrsp_pool()
    }

    fn is_resp(&self) -> bool {
        self.is_asset() && self.account_type == AccountType::Resp
    }

    fn is_withdrawal_source(&self) -> bool {
        self.is_tfsa() || self.is_rrsp_pool()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BalanceTotals {
    cash: f64,
    registered: f64,
    non_registered: f64,
    real_estate: f64,
    other_assets: f64,
    mortgage: f64,
    other_debt: f64,
}

impl BalanceTotals {
    fn assets(&self) -> f64 {
        self.cash + self.registered + self.non_registered + self.real_estate + self.other_assets
    }

    fn liabilities(&self) -> f64 {
        self.mortgage + self.other_debt
    }

    fn net_worth(&self) -> f64 {
        self.assets() - self.liabilities()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthFlows {
    income: f64,
    cpp_income: f64,
    oas_income: f64,
    withdrawal_income: f64,
    expenses: f64,
    savings: f64,
    investment_growth: f64,
    investment_dividends: f64,
    investment_tax: f64,
    debt_payment: f64,
    debt_principal: f64,
    debt_interest: f64,
}

#[derive(Debug, Clone)]
struct Household {
    accounts: Vec<AccountState>,
}

impl Household {
    fn new(accounts: &[Account], assumptions: &Assumptions) -> Self {
        Self {
            accounts: accounts
                .iter()
                .map(|account| AccountState::new(account, assumptions))
                .collect(),
        }
    }

    fn indices(&self, filter: AccountFilter) -> Vec<usize> {
        self.accounts
            .iter()
            .enumerate()
            .filter(|(_, account)| filter(account))
            .map(|(index, _)| index)
            .collect()
    }

    fn positive_total(&self, indices: &[usize]) -> f64 {
        indices
            .iter()
            .map(|&i| self.accounts[i].balance.max(0.0))
            .sum()
    }

    fn total(&self, filter: AccountFilter) -> f64 {
        self.positive_total(&self.indices(filter))
    }

    fn weights(&self, indices: &[usize]) -> Vec<f64> {
        let total = self.positive_total(indices);
        if total <= EPS {
            let even = 1.0 / indices.len() as f64;
            return vec![even; indices.len()];
        }
        indices
            .iter()
            .map(|&i| self.accounts[i].balance.max(0.0) / total)
            .collect()
    }

    fn credit_weighted(&mut self, indices: &[usize], amount: f64) {
        if indices.is_empty() || amount <= 0.0 {
            return;
        }
        for (&i, weight) in indices.iter().zip(self.weights(indices)) {
            self.accounts[i].balance += amount * weight;
        }
    }

    fn credit_evenly(&mut self, indices: &[usize], amount: f64) {
        if indices.is_empty() || amount <= 0.0 {
            return;
        }
        let share = amount / indices.len() as f64;
        for &i in indices {
            self.accounts[i].balance += share;
        }
    }

    fn debit_proportional(&mut self, indices: &[usize], amount: f64) -> f64 {
        let total = self.positive_total(indices);
        if amount <= 0.0 || total <= EPS {
            return 0.0;
        }
        let taken = amount.min(total);
        for &i in indices {
            let account = &mut self.accounts[i];
            let available = account.balance.max(0.0);
            account.balance = (account.balance - taken * available / total).max(0.0);
        }
        taken
    }

    fn debit_in_order(&mut self, indices: &[usize], amount: f64) -> f64 {
        let mut remaining = amount.max(0.0);
        for &i in indices {
            if remaining <= EPS {
                break;
            }
            let account = &mut self.accounts[i];
            let take = remaining.min(account.balance.max(0.0));
            account.balance -= take;
            remaining -= take;
        }
        amount.max(0.0) - remaining
    }

    fn apply_returns(
        &mut self,
        assumptions: &Assumptions,
        ctx: &TaxContext,
        compounding: Compounding,
        flows: &mut MonthFlows,
    ) {
        let appreciation = assumptions.real_estate_appreciation_rate.monthly(compounding);
        for account in self.accounts.iter_mut().filter(|a| a.is_asset()) {
            if let Some(rates) = account.rates {
                let r = monthly_return(account.balance, account.account_type, &rates, ctx, compounding);
                account.balance += r.after_tax_total;
                flows.investment_growth += r.gross_growth;
                flows.investment_dividends += r.gross_dividends;
                flows.investment_tax += r.tax_paid;
            } else if account.account_type.is_real_estate() {
                account.balance += account.balance.max(0.0) * appreciation;
            } else if account.account_type.is_cash() {
                if let Some(rate) = account.interest_rate {
                    let monthly = rate.to_rate().as_decimal() / 12.0;
                    account.balance += account.balance.max(0.0) * monthly;
                }
            }
        }
    }

    // Over-room contributions stay put when there is nowhere to overflow.
    fn route_savings(&mut self, amount: f64, room: &mut Option<RoomState>) {
        let invest = self.indices(AccountState::is_investment);
        let cash = self.indices(AccountState::is_cash);
        if invest.is_empty() && cash.is_empty() {
            debug!(amount, "no account can receive savings");
            return;
        }

        let invest_amount = match (invest.is_empty(), cash.is_empty()) {
            (true, _) => 0.0,
            (false, true) => amount,
            (false, false) => amount * INVESTMENT_SHARE,
        };
        let mut cash_amount = amount - invest_amount;

        let mut over_room: Vec<(usize, f64)> = Vec::new();
        if !invest.is_empty() {
            for (&i, weight) in invest.iter().zip(self.weights(&invest)) {
                let mut contribution = invest_amount * weight;
                if let Some(remaining) = room
                    .as_mut()
                    .and_then(|r| r.remaining_mut(self.accounts[i].account_type))
                {
                    let allowed = contribution.min(remaining.max(0.0));
                    if contribution - allowed > EPS {
                        over_room.push((i, contribution - allowed));
                    }
                    *remaining -= allowed;
                    contribution = allowed;
                }
                self.accounts[i].balance += contribution;
            }
        }

        let overflow: f64 = over_room.iter().map(|(_, excess)| excess).sum();
        if overflow > EPS {
            let non_registered = self.indices(AccountState::is_non_registered);
            if !non_registered.is_empty() {
                self.credit_weighted(&non_registered, overflow);
            } else if !cash.is_empty() {
                cash_amount += overflow;
            } else {
                debug!(overflow, "contribution room exhausted with nowhere to overflow");
                for (i, excess) in over_room {
                    self.accounts[i].balance += excess;
                }
            }
        }

        self.credit_evenly(&cash, cash_amount);
    }

    fn cover_deficit(&mut self, deficit: f64) -> f64 {
        let mut remaining = deficit;
        for filter in DRAWDOWN_ORDER {
            if remaining <= EPS {
                break;
            }
            let indices = self.indices(filter);
            remaining -= self.debit_in_order(&indices, remaining);
        }
        remaining.max(0.0)
    }

    fn withdraw_by_strategy(&mut self, amount: f64, strategy: WithdrawalStrategy) -> f64 {
        let rrsp = self.indices(AccountState::is_rrsp_pool);
        let tfsa = self.indices(AccountState::is_tfsa);
        match strategy {
            WithdrawalStrategy::RrspFirst => {
                let taken = self.debit_proportional(&rrsp, amount);
                taken + self.debit_proportional(&tfsa, amount - taken)
            }
            WithdrawalStrategy::TfsaFirst => {
                let taken = self.debit_proportional(&tfsa, amount);
                taken + self.debit_proportional(&rrsp, amount - taken)
            }
            WithdrawalStrategy::Balanced | WithdrawalStrategy::TaxOptimized => {
                let pool = self.indices(AccountState::is_withdrawal_source);
                self.debit_proportional(&pool, amount)
            }
        }
    }

    fn amortize_debts(&mut self, flows: &mut MonthFlows) {
        for account in self.accounts.iter_mut() {
            if account.is_asset() || account.balance <= 0.0 {
                continue;
            }
            let (Some(payment), Some(rate)) = (account.monthly_payment, account.interest_rate) else {
                continue;
            };
            let interest = account.balance * rate.to_rate().as_decimal() / 12.0;
            let principal = (payment - interest).clamp(0.0, account.balance);
            account.balance -= principal;
            if let Some(term) = account.term_remaining_months.as_mut() {
                *term = term.saturating_sub(1);
            }
            flows.debt_payment += interest + principal;
            flows.debt_principal += principal;
            flows.debt_interest += interest;
        }
    }

    fn totals(&self) -> BalanceTotals {
        let mut totals = BalanceTotals::default();
        for account in &self.accounts {
            let balance = account.balance;
            match (account.kind, account.account_type) {
                (AccountKind::Liability, AccountType::Mortgage) => totals.mortgage += balance,
                (AccountKind::Liability, _) => totals.other_debt += balance,
                (_, t) if t.is_cash() => totals.cash += balance,
                (_, AccountType::NonRegistered) => totals.non_registered += balance,
                (_, t) if t.is_registered() => totals.registered += balance,
                (_, t) if t.is_real_estate() => totals.real_estate += balance,
                _ => totals.other_assets += balance,
            }
        }
        totals
    }

    fn balances(&self) -> Vec<AccountBalance> {
        self.accounts
            .iter()
            .map(|account| AccountBalance {
                account_id: account.id.clone(),
                kind: account.kind,
                balance: account.balance,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct RoomState {
    tfsa: f64,
    rrsp: f64,
    limits: ContributionRoom,
}

impl RoomState {
    fn new(limits: ContributionRoom) -> Self {
        Self {
            tfsa: limits.tfsa_room.max(0.0),
            rrsp: limits.rrsp_room.max(0.0),
            limits,
        }
    }

    fn grow(&mut self, prior_year_earned_income: f64) {
        self.tfsa += self.limits.tfsa_annual_limit.max(0.0);
        let earned = prior_year_earned_income * self.limits.rrsp_earned_income_rate.as_decimal();
        self.rrsp += earned.min(self.limits.rrsp_annual_limit).max(0.0);
    }

    fn remaining_mut(&mut self, account_type: AccountType) -> Option<&mut f64> {
        match account_type {
            AccountType::Tfsa => Some(&mut self.tfsa),
            AccountType::Rrsp | AccountType::Dcpp => Some(&mut self.rrsp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Person {
    current_age: f64,
    cpp_monthly: f64,
    cpp_start_age: f64,
    oas: OasInputs,
}

impl Person {
    fn age_at(&self, years_elapsed: f64) -> f64 {
        self.current_age + years_elapsed
    }
}

fn household_people(assumptions: &Assumptions) -> Vec<Person> {
    let income = &assumptions.income;
    let mut people = vec![Person {
        current_age: income.person1.current_age as f64,
        cpp_monthly: cpp_monthly_benefit(&assumptions.cpp.person1),
        cpp_start_age: assumptions.cpp.person1.start_age as f64,
        oas: assumptions.oas.person1,
    }];
    if let Some(person2) = income.person2 {
        let cpp = assumptions.cpp.person2.unwrap_or_default();
        people.push(Person {
            current_age: person2.current_age as f64,
            cpp_monthly: cpp_monthly_benefit(&cpp),
            cpp_start_age: cpp.start_age as f64,
            oas: assumptions.oas.person2.unwrap_or_default(),
        });
    }
    people
}

fn growth_factor(rate: f64, years: f64) -> f64 {
    (1.0 + rate).max(0.0).powf(years)
}

struct Simulation<'a> {
    assumptions: &'a Assumptions,
    life_events: &'a [LifeEvent],
    compounding: Compounding,
    start: NaiveDate,
    base_income: f64,
    base_expenses: f64,
    salary_growth: f64,
    people: Vec<Person>,
    room: Option<RoomState>,
    retired: bool,
    earned_this_year: f64,
    grant_year: i32,
    grant_used: f64,
    previous_net_worth: Option<f64>,
}

impl Simulation<'_> {
    fn step(&mut self, tick: u32, household: &mut Household) -> Result<ProjectionMonth> {
        let date = self
            .start
            .checked_add_months(Months::new(tick))
            .ok_or_else(|| {
                ProjectionError::scenario("startDate", "projection runs past the supported calendar")
            })?;
        let years_elapsed = tick as f64 / 12.0;
        let age = self.people[0].age_at(years_elapsed);
        let retirement = self.assumptions.retirement;
        self.retired = self.retired || age >= retirement.target_retirement_age as f64;

        if tick > 0 && date.month() == 1 {
            let earned = std::mem::take(&mut self.earned_this_year);
            if let Some(room) = self.room.as_mut() {
                room.grow(earned);
            }
        }
        if date.year() != self.grant_year {
            self.grant_year = date.year();
            self.grant_used = 0.0;
        }

        let inflation = growth_factor(self.assumptions.inflation_rate.as_decimal(), years_elapsed);
        let mut flows = MonthFlows::default();
        let mut planned_withdrawal = 0.0;
        if self.retired {
            planned_withdrawal = household.total(AccountState::is_withdrawal_source)
                * retirement.withdrawal_rate.as_decimal().max(0.0)
                / 12.0;
            let (cpp, oas) = self.benefits(years_elapsed, planned_withdrawal);
            flows.cpp_income = cpp;
            flows.oas_income = oas;
            flows.withdrawal_income = planned_withdrawal;
            flows.income = cpp + oas + planned_withdrawal;
            flows.expenses = self.base_expenses * retirement.expense_ratio.max(0.0) * inflation
                + retirement.add_on_expenses(age);
        } else {
            let salary = self.base_income * growth_factor(self.salary_growth, years_elapsed);
            self.earned_this_year += salary;
            flows.income = salary;
            flows.expenses = self.base_expenses * inflation;
        }

        let earners = self.assumptions.income.person_count() as f64;
        let ctx = TaxContext {
            province: self.assumptions.province,
            annual_income: flows.income * 12.0 / earners,
        };

        for event in self
            .life_events
            .iter()
            .filter(|e| e.is_active(date.year(), date.month()))
        {
            let amount = if event.amount.is_finite() {
                event.amount.max(0.0)
            } else {
                0.0
            };
            match event.kind {
                LifeEventKind::Income => flows.income += amount,
                LifeEventKind::Expense => flows.expenses += amount,
            }
        }

        household.apply_returns(self.assumptions, &ctx, self.compounding, &mut flows);

        let (resp_contribution, education_withdrawal) = self.apply_resp(date, household, &mut flows);
        flows.savings = flows.income - flows.expenses;
        let available = flows.savings - resp_contribution + education_withdrawal;
        if available > 0.0 {
            household.route_savings(available, &mut self.room);
        } else if available < 0.0 {
            let unfunded = household.cover_deficit(-available);
            if unfunded > EPS {
                debug!(%date, unfunded, "monthly deficit exceeds liquid balances");
            }
        }

        if planned_withdrawal > 0.0 {
            let taken =
                household.withdraw_by_strategy(planned_withdrawal, retirement.withdrawal_strategy);
            let shortfall = planned_withdrawal - taken;
            if shortfall > EPS {
                let cash = household.indices(AccountState::is_cash);
                let from_cash = household.debit_in_order(&cash, shortfall);
                debug!(%date, shortfall, from_cash, "retirement withdrawal short of pool balance");
            }
        }

        household.amortize_debts(&mut flows);

        let totals = household.totals();
        let net_worth = totals.net_worth();
        let net_worth_change = self.previous_net_worth.map_or(0.0, |prev| net_worth - prev);
        self.previous_net_worth = Some(net_worth);

        Ok(ProjectionMonth {
            date,
            month_index: tick,
            age,
            is_retired: self.retired,
            cash_balance: totals.cash,
            registered_balance: totals.registered,
            non_registered_balance: totals.non_registered,
            real_estate_balance: totals.real_estate,
            other_assets_balance: totals.other_assets,
            mortgage_balance: totals.mortgage,
            other_debt_balance: totals.other_debt,
            total_assets: totals.assets(),
            total_liabilities: totals.liabilities(),
            net_worth,
            net_worth_change,
            income: flows.income,
            cpp_income: flows.cpp_income,
            oas_income: flows.oas_income,
            withdrawal_income: flows.withdrawal_income,
            expenses: flows.expenses,
            savings: flows.savings,
            savings_rate: if flows.income > 0.0 {
                flows.savings / flows.income * 100.0
            } else {
                0.0
            },
            investment_growth: flows.investment_growth,
            investment_dividends: flows.investment_dividends,
            investment_tax: flows.investment_tax,
            debt_payment: flows.debt_payment,
            debt_principal: flows.debt_principal,
            debt_interest: flows.debt_interest,
            account_balances: household.balances(),
        })
    }

    // OAS clawback is tested on annualized CPP plus a share of the withdrawal.
    fn benefits(&self, years_elapsed: f64, planned_withdrawal: f64) -> (f64, f64) {
        let withdrawal_share = planned_withdrawal / self.people.len() as f64;
        self.people
            .iter()
            .fold((0.0, 0.0), |(cpp_total, oas_total), person| {
                let age = person.age_at(years_elapsed);
                let cpp = if age >= person.cpp_start_age {
                    person.cpp_monthly
                } else {
                    0.0
                };
                let oas = if age >= person.oas.start_age as f64 {
                    let estimated_income = (cpp + withdrawal_share) * 12.0;
                    oas_monthly_benefit(&person.oas, estimated_income).net_monthly
                } else {
                    0.0
                };
                (cpp_total + cpp, oas_total + oas)
            })
    }

    fn apply_resp(
        &mut self,
        date: NaiveDate,
        household: &mut Household,
        flows: &mut MonthFlows,
    ) -> (f64, f64) {
        let Some(resp) = self.assumptions.resp else {
            return (0.0, 0.0);
        };
        let resp_accounts = household.indices(AccountState::is_resp);

        let mut contribution = 0.0;
        if !self.retired && resp.annual_contribution > 0.0 {
            if resp_accounts.is_empty() {
                debug!("RESP contribution configured without an RESP account");
            } else {
                contribution = resp.monthly_contribution();
                let grant = (contribution * resp.cesg_match_rate.as_decimal().max(0.0))
                    .min((resp.cesg_annual_limit - self.grant_used).max(0.0));
                self.grant_used += grant;
                household.credit_weighted(&resp_accounts, contribution + grant);
            }
        }

        let mut withdrawal = 0.0;
        if resp.in_education_window(date.year()) {
            let cost = resp.monthly_education_cost();
            if cost > 0.0 {
                withdrawal = household.debit_proportional(&resp_accounts, cost);
                flows.expenses += cost;
            }
        }
        (contribution, withdrawal)
    }
}

fn rate_warnings(household: &Household, assumptions: &Assumptions) -> Vec<String> {
    let mut warnings = Vec::new();
    for account in &household.accounts {
        if let Some(rates) = account.rates.filter(ResolvedRates::is_unusual) {
            warnings.push(format!(
                "account {}: growth {:.1}% / dividend yield {:.1}% per year is unusually large",
                account.id,
                rates.growth.as_percent(),
                rates.dividend_yield.as_percent()
            ));
        }
    }
    for (label, rate) in [
        ("inflation", assumptions.inflation_rate),
        ("real estate appreciation", assumptions.real_estate_appreciation_rate),
    ] {
        if rate.as_decimal().abs() > UNUSUAL_ANNUAL_RATE {
            warnings.push(format!(
                "{label} rate of {:.1}% per year is unusually large",
                rate.as_percent()
            ));
        }
    }
    for message in &warnings {
        warn!("{message}");
    }
    warnings
}

pub fn project_net_worth(
    accounts: &[Account],
    transactions: &[Transaction],
    scenario: &ProjectionScenario,
) -> Result<ProjectionResult> {
    scenario.validate()?;
    let assumptions = &scenario.assumptions;
    let config = scenario.config;
    let start = config.start_date.with_day(1).unwrap_or(config.start_date);

    let mut household = Household::new(accounts, assumptions);
    let warnings = rate_warnings(&household, assumptions);
    if assumptions.retirement.withdrawal_strategy == WithdrawalStrategy::TaxOptimized {
        debug!("tax_optimized withdrawals are drawn the same way as balanced");
    }

    let averages = average_monthly_cashflow(transactions);
    let base_income = assumptions
        .income
        .stated_monthly_income()
        .unwrap_or(averages.income)
        .max(0.0);

    let starting_net_worth = household.totals().net_worth();
    let mut simulation = Simulation {
        assumptions,
        life_events: &scenario.life_events,
        compounding: config.compounding,
        start,
        base_income,
        base_expenses: averages.expenses.max(0.0),
        salary_growth: assumptions.income.household_salary_growth().as_decimal(),
        people: household_people(assumptions),
        room: assumptions.contribution_room.map(RoomState::new),
        retired: false,
        earned_this_year: 0.0,
        grant_year: start.year(),
        grant_used: 0.0,
        previous_net_worth: None,
    };

    let tick_count = config.projection_years * 12;
    let mut months = Vec::with_capacity(tick_count as usize);
    for tick in 0..tick_count {
        months.push(simulation.step(tick, &mut household)?);
    }

    let years = yearly_rollup(&months);
    let summary = summarize(&months, starting_net_worth, config.projection_years);
    debug!(
        scenario = %scenario.id,
        months = months.len(),
        ending_net_worth = summary.ending_net_worth,
        "projection complete"
    );

    Ok(ProjectionResult {
        scenario_id: scenario.id.clone(),
        months,
        years,
        summary,
        warnings,
    })
}

fn yearly_rollup(months: &[ProjectionMonth]) -> Vec<ProjectionYear> {
    let mut years: Vec<ProjectionYear> = Vec::new();
    for month in months {
        let year = month.date.year();
        if years.last().is_none_or(|entry| entry.year != year) {
            years.push(ProjectionYear {
                year,
                start_net_worth: month.net_worth,
                end_net_worth: month.net_worth,
                net_worth_change: 0.0,
                total_income: 0.0,
                total_expenses: 0.0,
                total_savings: 0.0,
                average_savings_rate: 0.0,
                investment_growth: 0.0,
                investment_dividends: 0.0,
                investment_tax: 0.0,
                debt_payments: 0.0,
                debt_principal: 0.0,
                debt_interest: 0.0,
                ending_assets: 0.0,
                ending_liabilities: 0.0,
            });
        }
        let Some(entry) = years.last_mut() else {
            continue;
        };
        entry.end_net_worth = month.net_worth;
        entry.net_worth_change = entry.end_net_worth - entry.start_net_worth;
        entry.total_income += month.income;
        entry.total_expenses += month.expenses;
        entry.total_savings += month.savings;
        entry.investment_growth += month.investment_growth;
        entry.investment_dividends += month.investment_dividends;
        entry.investment_tax += month.investment_tax;
        entry.debt_payments += month.debt_payment;
        entry.debt_principal += month.debt_principal;
        entry.debt_interest += month.debt_interest;
        entry.ending_assets = month.total_assets;
        entry.ending_liabilities = month.total_liabilities;
    }
    for year in &mut years {
        year.average_savings_rate = if year.total_income > 0.0 {
            year.total_savings / year.total_income * 100.0
        } else {
            0.0
        };
    }
    years
}

fn summarize(
    months: &[ProjectionMonth],
    starting_net_worth: f64,
    projection_years: u32,
) -> ProjectionSummary {
    let ending_net_worth = months.last().map_or(starting_net_worth, |m| m.net_worth);
    let average_annual_growth = if starting_net_worth > 0.0 && ending_net_worth > 0.0 {
        ((ending_net_worth / starting_net_worth).powf(1.0 / projection_years as f64) - 1.0) * 100.0
    } else {
        debug!(starting_net_worth, ending_net_worth, "CAGR undefined, reporting zero");
        0.0
    };

    let mut peak_net_worth = f64::NEG_INFINITY;
    let mut peak_year = months.first().map_or(0, |m| m.date.year());
    for month in months {
        if month.net_worth > peak_net_worth {
            peak_net_worth = month.net_worth;
            peak_year = month.date.year();
        }
    }
    if months.is_empty() {
        peak_net_worth = starting_net_worth;
    }

    ProjectionSummary {
        starting_net_worth,
        ending_net_worth,
        total_growth: ending_net_worth - starting_net_worth,
        average_annual_growth,
        peak_net_worth,
        peak_year,
        debt_free_date: months
            .iter()
            .find(|m| m.total_liabilities <= DEBT_FREE_THRESHOLD)
            .map(|m| m.date),
        retirement_date: months.iter().find(|m| m.is_retired).map(|m| m.date),
        total_investment_tax: months.iter().map(|m| m.investment_tax).sum(),
    }
}
