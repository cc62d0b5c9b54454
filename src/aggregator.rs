//! Financial data aggregator
//!
//! Computes summary statistics over a user's transactions within a
//! trailing N-day window. Pure function of the persisted rows: nothing
//! here is cached or written back.

use crate::models::{
    CategoryTotal, FinancialWindow, NormalizedTransaction, TransactionKind, TransactionRecord,
};
use crate::store::TransactionStore;
use crate::Result;
use chrono::{Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Default lookback when the caller does not specify one
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Categories reported in the default ranking
const TOP_CATEGORY_COUNT: usize = 5;

#[derive(Clone)]
pub struct FinancialAggregator {
    store: Arc<dyn TransactionStore>,
}

impl FinancialAggregator {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Compute the financial window for the trailing `days` days.
    ///
    /// An empty window is not an error: totals come back zero and the
    /// ranking, weekday map and transaction list come back empty.
    pub async fn window(&self, user_id: Uuid, days: u32) -> Result<FinancialWindow> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days));

        let transactions = self.store.fetch_window(user_id, start, end).await?;

        debug!(
            %user_id,
            days,
            transaction_count = transactions.len(),
            "Computed aggregation window"
        );

        Ok(summarize(&transactions, days))
    }
}

/// Aggregate fetched rows into a window summary.
fn summarize(transactions: &[TransactionRecord], days: u32) -> FinancialWindow {
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Income)
        .map(|t| t.amount)
        .sum();
    let total_expense: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
        .map(|t| t.amount)
        .sum();

    FinancialWindow {
        period: format!("{} ngày gần nhất", days),
        days,
        total_income,
        total_expense,
        net_balance: total_income - total_expense,
        transaction_count: transactions.len(),
        top_expense_categories: rank_expense_categories(transactions),
        weekday_expenses: weekday_expense_totals(transactions),
        transactions: transactions.iter().map(normalize).collect(),
    }
}

/// Group expense amounts by category name, sort descending by summed
/// amount and truncate to the reporting cap.
///
/// Grouping keeps first-encountered order so the stable sort preserves it
/// for tied amounts.
fn rank_expense_categories(transactions: &[TransactionRecord]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for t in transactions {
        if t.kind != TransactionKind::Expense {
            continue;
        }
        match index_by_name.get(t.category.as_str()) {
            Some(&i) => totals[i].amount += t.amount,
            None => {
                index_by_name.insert(t.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: t.category.clone(),
                    amount: t.amount,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
    totals.truncate(TOP_CATEGORY_COUNT);
    totals
}

/// Sum expense amounts per full English weekday name.
fn weekday_expense_totals(transactions: &[TransactionRecord]) -> HashMap<String, f64> {
    let mut totals: HashMap<String, f64> = HashMap::new();

    for t in transactions {
        if t.kind == TransactionKind::Expense {
            let day_name = t.date.format("%A").to_string();
            *totals.entry(day_name).or_insert(0.0) += t.amount;
        }
    }

    totals
}

fn normalize(t: &TransactionRecord) -> NormalizedTransaction {
    NormalizedTransaction {
        date: t.date.format("%Y-%m-%d").to_string(),
        amount: t.amount,
        kind: t.kind,
        description: t.description.clone(),
        category: t.category.clone(),
        notes: t.notes.clone(),
    }
}
