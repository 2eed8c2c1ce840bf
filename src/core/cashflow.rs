use chrono::Datelike;
use serde::Serialize;

use super::types::{Transaction, TransactionKind};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAverages {
    pub income: f64,
    pub expenses: f64,
}

/// Average monthly income and expenses over the calendar months spanned by
/// the income and expense transactions, quiet months included. Transfers
/// are ignored and expenses count by magnitude.
pub fn average_monthly_cashflow(transactions: &[Transaction]) -> MonthlyAverages {
    let mut span: Option<(i32, i32)> = None;
    let mut income = 0.0;
    let mut expenses = 0.0;

    for tx in transactions {
        if !tx.amount.is_finite() {
            continue;
        }
        match tx.kind {
            TransactionKind::Income => income += tx.amount.abs(),
            TransactionKind::Expense => expenses += tx.amount.abs(),
            TransactionKind::Transfer => continue,
        }
        let month = month_ordinal(tx.date.year(), tx.date.month());
        span = Some(match span {
            Some((first, last)) => (first.min(month), last.max(month)),
            None => (month, month),
        });
    }

    let Some((first, last)) = span else {
        return MonthlyAverages::default();
    };

    let month_count = f64::from(last - first + 1);
    MonthlyAverages {
        income: income / month_count,
        expenses: expenses / month_count,
    }
}

fn month_ordinal(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}
